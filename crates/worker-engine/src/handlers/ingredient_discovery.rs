//! Ingredient-discovery handler (spec §4.3/§4.2). A term that reports
//! `subdivide_into` gets replaced by its sub-terms, re-enqueued at the head
//! of `termQueue` (never silently dropped).

use crate::batch::{Batch, HandlerOutput, ItemResult};
use crate::builders::ingredient_discovery::IngredientItem;
use crate::drivers::IngredientDriver;
use crate::heartbeat::Heartbeat;
use worker_core::cursor::IngredientDiscoveryCursor;

pub struct IngredientOutcome {
    pub names: Vec<String>,
}

pub async fn handle(
    batch: Batch<IngredientItem>,
    driver: &dyn IngredientDriver,
    heartbeat: &Heartbeat<'_>,
) -> HandlerOutput<IngredientOutcome, IngredientDiscoveryCursor> {
    let mut results = Vec::with_capacity(batch.items.len());
    let mut next_cursor = IngredientDiscoveryCursor::default();

    for (index, item) in batch.items.into_iter().enumerate() {
        let mut cursor = item.cursor.clone();
        let outcome = match driver.search(&item.term, item.page).await {
            Ok(page) => {
                if !page.subdivide_into.is_empty() {
                    cursor.subdivide(page.subdivide_into);
                    cursor.current_term.clear();
                } else if page.has_more_pages {
                    cursor.current_page += 1;
                    cursor.total_pages_for_term = cursor.total_pages_for_term.max(cursor.current_page);
                } else {
                    cursor.current_term.clear();
                }
                Ok(IngredientOutcome { names: page.names })
            }
            Err(err) => {
                tracing::warn!(term = %item.term, page = item.page, error = %err, "ingredient search failed");
                Err(format!("{err:#}"))
            }
        };
        next_cursor = cursor;
        results.push(ItemResult {
            input_index: index,
            outcome,
        });
        heartbeat.beat().await;
    }

    HandlerOutput {
        results,
        next_cursor,
        scope_exhausted: false,
    }
}
