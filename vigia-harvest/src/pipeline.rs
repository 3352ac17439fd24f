//! Run orchestration: list, fetch with residual retries, diff, persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use vigia_core::{
    run_timestamp, FetchFailure, MembershipKind, RecordRef, RunSummary, Snapshot,
};

use crate::audit;
use crate::client::CatalogClient;
use crate::config::HarvestConfig;
use crate::diff::diff;
use crate::error::HarvestError;
use crate::fetch::fetch_details;
use crate::paginate::list_all;
use crate::snapshot;

/// On-disk layout of one harvester data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Current snapshot, JSONL, overwritten each run.
    pub snapshot: PathBuf,
    /// Unresolved fetch failures, JSONL, overwritten each run.
    pub errors: PathBuf,
    /// Field-modification log, CSV, append-only across runs.
    pub modifications: PathBuf,
    /// Membership log, CSV, append-only across runs.
    pub memberships: PathBuf,
}

impl DataPaths {
    /// The canonical filenames, rooted at `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            snapshot: dir.join("tramites.jsonl"),
            errors: dir.join("errores.jsonl"),
            modifications: dir.join("modificaciones.csv"),
            memberships: dir.join("adiciones.csv"),
        }
    }
}

/// Run the harvester once.
///
/// Sequence: list references → fetch details (with residual-retry passes
/// over the failure set) → diff against the previous snapshot, if one
/// exists → persist current snapshot, unresolved errors, and audit events.
///
/// Per-record failures never abort the run; listing, prior-snapshot, and
/// persistence failures do.
pub async fn run<C>(
    client: Arc<C>,
    config: &HarvestConfig,
    paths: &DataPaths,
) -> Result<RunSummary, HarvestError>
where
    C: CatalogClient + 'static,
{
    let refs = list_all(client.as_ref(), config.page_size, config.page_attempt_cap).await?;
    tracing::info!(count = refs.len(), "listing complete");

    let timestamp = run_timestamp(Utc::now());

    let (mut records, mut failures) = fetch_details(Arc::clone(&client), refs, config).await;

    // Whole-batch retry over whatever is still failing, coarser than the
    // per-request retries inside the fetcher. Remaining failures are
    // persisted, never dropped.
    let mut pass = 0u32;
    while !failures.is_empty() && pass < config.residual_passes {
        pass += 1;
        tracing::info!(pass, remaining = failures.len(), "residual retry pass");
        let retry_refs: Vec<RecordRef> = failures.iter().map(FetchFailure::to_ref).collect();
        let (recovered, still_failing) =
            fetch_details(Arc::clone(&client), retry_refs, config).await;
        records.extend(recovered);
        failures = still_failing;
    }

    let current = Snapshot::from_records(records)?;
    let previous = snapshot::load(&paths.snapshot)?;

    let mut summary = RunSummary {
        fetched: current.len(),
        errored: failures.len(),
        ..RunSummary::default()
    };

    match previous {
        Some(previous) => {
            let result = diff(&previous, &current, &timestamp);
            summary.modified = result.modifications.len();
            summary.appeared = result
                .memberships
                .iter()
                .filter(|m| m.kind == MembershipKind::Appeared)
                .count();
            summary.disappeared = result.memberships.len() - summary.appeared;

            audit::append_modifications(&paths.modifications, &result.modifications)?;
            audit::append_memberships(&paths.memberships, &result.memberships)?;
        }
        None => {
            tracing::info!("no previous snapshot, skipping diff (first run)");
        }
    }

    snapshot::save(&paths.snapshot, &current)?;
    snapshot::save_errors(&paths.errors, &failures)?;

    tracing::info!(
        fetched = summary.fetched,
        errored = summary.errored,
        appeared = summary.appeared,
        disappeared = summary.disappeared,
        modified = summary.modified,
        "run complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_paths_use_canonical_filenames() {
        let paths = DataPaths::in_dir(Path::new("/data"));
        assert_eq!(paths.snapshot, Path::new("/data/tramites.jsonl"));
        assert_eq!(paths.errors, Path::new("/data/errores.jsonl"));
        assert_eq!(paths.modifications, Path::new("/data/modificaciones.csv"));
        assert_eq!(paths.memberships, Path::new("/data/adiciones.csv"));
    }
}
