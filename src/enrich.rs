// src/enrich.rs

use crate::config::TrackingSection;
use crate::store::ManifestStore;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome counts for one enrichment pass.
#[derive(Debug, Default, PartialEq)]
pub struct EnrichSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Fetch and store the SLA value for every record still pending one.
///
/// Records are processed strictly sequentially, and each successful
/// lookup commits on its own, so partial progress survives a later
/// failure. A failed lookup is logged and skipped; the record stays
/// pending and is retried naturally on the next pass. Only a store
/// write failure aborts the pass.
pub async fn run_pass(
    store: &ManifestStore,
    tracking: &TrackingSection,
) -> Result<EnrichSummary, Box<dyn std::error::Error>> {
    let pending = store.pending_connotes()?;
    info!(count = pending.len(), "Records awaiting SLA");

    let client = Client::new();
    let mut summary = EnrichSummary::default();

    for connote in &pending {
        let span = tracing::info_span!("sla", connote = %connote);
        let _guard = span.enter();

        match fetch_sla(&client, tracking, connote).await {
            Ok(sla) => {
                store.set_sla(connote, sla)?;
                summary.succeeded += 1;
            }
            Err(e) => {
                warn!(error = %e, "SLA lookup failed, will retry next pass");
                summary.failed += 1;
            }
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Enrichment pass complete"
    );
    Ok(summary)
}

/// Query the tracking endpoint for one connote and scrape the SLA value
/// out of the response body.
async fn fetch_sla(
    client: &Client,
    tracking: &TrackingSection,
    connote: &str,
) -> Result<i64, Box<dyn std::error::Error>> {
    let id = URL_SAFE.encode(connote.as_bytes());
    let url = format!("{}?id={}", tracking.base_url, id);

    let response = client
        .get(&url)
        .timeout(Duration::from_secs(tracking.timeout_secs))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(format!("tracking endpoint returned {status}").into());
    }

    let body = response.text().await?;
    parse_sla(&body).ok_or_else(|| format!("no SLA marker in response ({} bytes)", body.len()).into())
}

/// Scrape `SLA : <digits> hari` out of a tracking-page body.
pub fn parse_sla(body: &str) -> Option<i64> {
    let re = Regex::new(r"SLA\s*:\s*(\d+)\s*hari").ok()?;
    re.captures(body).and_then(|cap| cap[1].parse::<i64>().ok())
}
