//! Ingredient-discovery work builder (spec §4.2 "Ingredient-discovery").
//! Terms may recursively subdivide; the handler is responsible for enqueuing
//! sub-terms, the builder only pops the next term off the queue once the
//! current one is exhausted.

use coordinator_client::CoordinatorClient;
use serde::Deserialize;
use worker_core::cursor::{parse_cursor, IngredientDiscoveryCursor};
use worker_core::model::Job;

use crate::batch::{Batch, BuildOutcome};
use crate::builders::{complete_with_no_batch, ensure_started, fail_job};

#[derive(Debug, Clone, Deserialize, Default)]
struct IngredientConfig {
    #[serde(rename = "seedTerms", default)]
    seed_terms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IngredientItem {
    pub term: String,
    pub page: u32,
    pub cursor: IngredientDiscoveryCursor,
}

pub async fn build(client: &CoordinatorClient, job: Job) -> anyhow::Result<BuildOutcome<IngredientItem>> {
    let config: IngredientConfig = serde_json::from_value(job.config.clone()).unwrap_or_default();
    let initial = initial_cursor(&config.seed_terms);

    let job = ensure_started(client, job, config.seed_terms.len() as u64, &initial).await?;
    let mut cursor: IngredientDiscoveryCursor = parse_cursor(&job.progress);

    if cursor.current_term.is_empty() {
        if let Some(next) = cursor.term_queue.pop_front() {
            cursor.current_term = next;
            cursor.current_page = 1;
            cursor.total_pages_for_term = 0;
        }
    }

    if is_impossible_cursor(&cursor) {
        fail_job(
            client,
            &job,
            &format!(
                "cursor page {} exceeds total_pages_for_term {} for term {:?}",
                cursor.current_page, cursor.total_pages_for_term, cursor.current_term
            ),
        )
        .await?;
        anyhow::bail!("job {} has an impossible ingredient-discovery cursor, marked failed", job.id);
    }

    if cursor.is_complete() {
        complete_with_no_batch(client, &job).await?;
        return Ok(BuildOutcome::Completed);
    }

    Ok(BuildOutcome::Batch(Batch::new(
        job.id,
        vec![IngredientItem {
            term: cursor.current_term.clone(),
            page: cursor.current_page,
            cursor,
        }],
    )))
}

/// A cursor claiming to be past the last page of its own term is impossible
/// once `total_pages_for_term` is known (spec §7 "Job-fatal: ... impossible
/// cursor") — `0` means "not yet discovered" and is never a violation.
fn is_impossible_cursor(cursor: &IngredientDiscoveryCursor) -> bool {
    cursor.total_pages_for_term != 0 && cursor.current_page > cursor.total_pages_for_term
}

fn initial_cursor(seed_terms: &[String]) -> IngredientDiscoveryCursor {
    let mut queue: std::collections::VecDeque<String> = seed_terms.iter().cloned().collect();
    let current_term = queue.pop_front().unwrap_or_default();
    IngredientDiscoveryCursor {
        current_term,
        current_page: 1,
        total_pages_for_term: 0,
        term_queue: queue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_cursor_pulls_first_seed_term_into_current() {
        let cursor = initial_cursor(&["meat".to_string(), "dairy".to_string()]);
        assert_eq!(cursor.current_term, "meat");
        assert_eq!(cursor.term_queue, std::collections::VecDeque::from(["dairy".to_string()]));
    }

    #[test]
    fn impossible_cursor_detects_page_past_known_total() {
        let mut cursor = initial_cursor(&["meat".to_string()]);
        cursor.total_pages_for_term = 3;
        cursor.current_page = 4;
        assert!(is_impossible_cursor(&cursor));
    }

    #[test]
    fn unknown_total_pages_is_never_impossible() {
        let cursor = initial_cursor(&["meat".to_string()]);
        assert!(!is_impossible_cursor(&cursor));
    }

    #[test]
    fn cursor_within_known_total_is_not_impossible() {
        let mut cursor = initial_cursor(&["meat".to_string()]);
        cursor.total_pages_for_term = 3;
        cursor.current_page = 2;
        assert!(!is_impossible_cursor(&cursor));
    }
}
