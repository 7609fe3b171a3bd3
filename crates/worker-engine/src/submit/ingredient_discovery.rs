//! Ingredient persist (spec §4.4 "Ingredient persist"). Upserts by name; an
//! existing ingredient is left untouched since a name-only search result
//! carries no additional fields to fill.

use coordinator_client::{Compare, CoordinatorClient, FindOptions};
use worker_core::cursor::IngredientDiscoveryCursor;
use worker_core::model::Job;

use crate::batch::HandlerOutput;
use crate::entities::Ingredient;
use crate::handlers::ingredient_discovery::IngredientOutcome;
use crate::submit::{finish, write_join_records, BatchSummary};

const INGREDIENTS: &str = "ingredients";

pub async fn submit(
    client: &CoordinatorClient,
    job: &Job,
    output: HandlerOutput<IngredientOutcome, IngredientDiscoveryCursor>,
) -> anyhow::Result<()> {
    write_join_records(client, job.job_type, &job.id, &output.results).await?;

    let mut success = 0u64;
    let mut errors = 0u64;
    for item in &output.results {
        match &item.outcome {
            Ok(outcome) => match persist_one(client, outcome).await {
                Ok(()) => success += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "ingredient persist failed");
                    errors += 1;
                }
            },
            Err(_) => errors += 1,
        }
    }

    let scope_exhausted = output.next_cursor.is_complete();
    finish(
        client,
        job,
        BatchSummary {
            success_count: success,
            error_count: errors,
            next_cursor: output.next_cursor,
            scope_exhausted,
        },
    )
    .await
}

async fn persist_one(client: &CoordinatorClient, outcome: &IngredientOutcome) -> anyhow::Result<()> {
    for name in &outcome.names {
        upsert_by_name(client, name).await?;
    }
    Ok(())
}

async fn upsert_by_name(client: &CoordinatorClient, name: &str) -> anyhow::Result<()> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("name", name.to_string())),
        limit: Some(1),
        sort: None,
    };
    let existing = client.find::<Ingredient>(INGREDIENTS, &opts).await?;
    if !existing.docs.is_empty() {
        return Ok(());
    }
    let payload = serde_json::json!({ "name": name });
    let _: Ingredient = client.create(INGREDIENTS, &payload, None).await?;
    Ok(())
}
