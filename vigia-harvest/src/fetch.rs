//! Bounded-concurrency detail fetching.
//!
//! One task per listing entry, gated by a counting semaphore so at most
//! `concurrency` requests are in flight. Each fetch is wrapped by the retry
//! coordinator; a failure on one entry never aborts the others. The
//! orchestrator drains the join set's completion queue, so no shared
//! collection is appended to concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use vigia_core::{flatten, record_id, FetchFailure, Record, RecordRef};

use crate::client::CatalogClient;
use crate::config::HarvestConfig;
use crate::retry::with_retry;

/// Fetch full details for every listing entry.
///
/// Returns the flattened successes and the entries whose retries were
/// exhausted. Every submitted entry lands in exactly one of the two vectors;
/// output order is completion order and carries no meaning.
pub async fn fetch_details<C>(
    client: Arc<C>,
    refs: Vec<RecordRef>,
    config: &HarvestConfig,
) -> (Vec<Record>, Vec<FetchFailure>)
where
    C: CatalogClient + 'static,
{
    let total = refs.len();
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let max_retries = config.max_retries;
    let base_delay = config.base_delay;

    let mut tasks: JoinSet<Result<Record, FetchFailure>> = JoinSet::new();
    let mut pending: HashMap<tokio::task::Id, RecordRef> = HashMap::new();

    for reference in refs {
        let permit_fut = Arc::clone(&semaphore).acquire_owned();
        let client = Arc::clone(&client);
        let task_ref = reference.clone();

        let handle = tasks.spawn(async move {
            let _permit = permit_fut
                .await
                .map_err(|closed| FetchFailure::new(&task_ref, closed))?;

            let result = with_retry(
                || client.fetch_detail(&task_ref.slug),
                max_retries,
                base_delay,
            )
            .await;

            match result {
                Ok(payload) => build_record(&task_ref, &payload),
                Err(err) => Err(FetchFailure::new(&task_ref, err)),
            }
        });
        pending.insert(handle.id(), reference);
    }

    let mut successes = Vec::new();
    let mut failures = Vec::new();

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, Ok(record))) => {
                pending.remove(&id);
                successes.push(record);
            }
            Ok((id, Err(failure))) => {
                pending.remove(&id);
                tracing::warn!(
                    id = failure.id,
                    slug = %failure.slug,
                    error = %failure.error,
                    "detail fetch failed"
                );
                failures.push(failure);
            }
            Err(join_err) => {
                // The submitted entry must still be accounted for.
                if let Some(reference) = pending.remove(&join_err.id()) {
                    tracing::error!(id = reference.id, error = %join_err, "fetch task aborted");
                    failures.push(FetchFailure::new(&reference, join_err));
                }
            }
        }
        tracing::debug!(
            done = successes.len() + failures.len(),
            total,
            "detail progress"
        );
    }

    (successes, failures)
}

/// Flatten a detail payload and key it by id.
///
/// The listing id fills in when the payload omits one; a non-integer id in
/// the payload is a permanent failure.
fn build_record(reference: &RecordRef, payload: &Value) -> Result<Record, FetchFailure> {
    let mut record = flatten(payload);
    if !record.contains_key("id") {
        record.insert("id".to_string(), Value::from(reference.id));
    }
    match record_id(&record) {
        Ok(_) => Ok(record),
        Err(err) => Err(FetchFailure::new(reference, err)),
    }
}
