//! Sequential walk of the paginated listing endpoint.
//!
//! Pages are fetched one at a time (each depends on the server-reported
//! running total) and a failing page is retried in place rather than
//! aborting the listing: losing partial pages is worse than stalling.

use std::time::Duration;

use vigia_core::{ListingPage, RecordRef};

use crate::client::CatalogClient;
use crate::error::HarvestError;

const PAGE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Collect the full current set of listing entries.
///
/// Requests page 1, 2, … until the accumulated count reaches the
/// server-reported total, preserving page and intra-page order.
/// `page_attempt_cap` bounds retries per page; `None` retries indefinitely.
pub async fn list_all<C>(
    client: &C,
    page_size: u32,
    page_attempt_cap: Option<u32>,
) -> Result<Vec<RecordRef>, HarvestError>
where
    C: CatalogClient + ?Sized,
{
    let mut refs: Vec<RecordRef> = Vec::new();
    let mut page: u32 = 1;

    loop {
        let listing = fetch_page(client, page, page_size, page_attempt_cap).await?;
        let got = listing.rows.len();
        refs.extend(listing.rows);
        tracing::info!(
            page,
            collected = refs.len(),
            total = listing.total,
            "listed page"
        );

        if refs.len() as u64 >= listing.total {
            return Ok(refs);
        }
        if got == 0 {
            // The server says more rows exist but returned an empty page;
            // the catalog shrank mid-crawl. Stop with what we have.
            tracing::warn!(
                page,
                collected = refs.len(),
                total = listing.total,
                "empty page before reported total, stopping listing"
            );
            return Ok(refs);
        }
        page += 1;
    }
}

async fn fetch_page<C>(
    client: &C,
    page: u32,
    page_size: u32,
    attempt_cap: Option<u32>,
) -> Result<ListingPage, HarvestError>
where
    C: CatalogClient + ?Sized,
{
    let mut attempts = 0u32;
    loop {
        match client.list_page(page, page_size).await {
            Ok(listing) => return Ok(listing),
            Err(err) => {
                attempts += 1;
                if let Some(cap) = attempt_cap {
                    if attempts >= cap {
                        return Err(HarvestError::ListingExhausted {
                            page,
                            attempts,
                            source: Box::new(err),
                        });
                    }
                }
                tracing::warn!(page, attempts, error = %err, "listing page failed, retrying");
                tokio::time::sleep(PAGE_RETRY_DELAY).await;
            }
        }
    }
}
