//! Bulk contact enrichment (FullEnrich API).
//!
//! Profiles are submitted in batches. Each batch answers with an
//! enrichment id that is polled until results show up. Every submitted
//! contact carries the index of its row in the lead table, and results are
//! written back to that row.

use crate::config::EnrichSettings;
use crate::results::LeadRow;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Only canonical personal profile URLs are worth paying for
pub const PROFILE_PREFIX: &str = "https://www.linkedin.com/in/";

const ENRICH_FIELDS: [&str; 3] = ["contact.profile", "contact.emails", "contact.phones"];

const BATCH_NAME: &str = "Jobup Contact Enrichment";

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("rate limited by the enrichment API (429), try later")]
    RateLimited,

    #[error("enrichment API accepted the batch without an enrichment id")]
    MissingEnrichmentId,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
pub struct BulkRequest {
    pub name: String,
    pub datas: Vec<ContactRequest>,
}

#[derive(Debug, Serialize)]
pub struct ContactRequest {
    pub linkedin_url: String,
    pub enrich_fields: Vec<String>,
    pub custom: Correlation,
}

/// Round-trips through the API untouched; `row` is the lead table index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Correlation {
    #[serde(default)]
    pub row: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    enrichment_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BulkResults {
    #[serde(default)]
    datas: Vec<EnrichedContact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrichedContact {
    #[serde(default)]
    pub custom: Option<Correlation>,
    #[serde(default)]
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub most_probable_email: Option<String>,
    #[serde(default)]
    pub most_probable_phone: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<CompanyInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub name: Option<String>,
}

impl EnrichedContact {
    /// Row this result belongs to, if the token is a valid index
    pub fn row(&self) -> Option<usize> {
        self.custom.as_ref()?.row.as_deref()?.trim().parse().ok()
    }
}

/// Rows worth enriching, as (row index, profile URL)
pub fn profile_targets(rows: &[LeadRow]) -> Vec<(usize, String)> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let url = row.profile_linkedin.as_deref()?.trim();
            url.starts_with(PROFILE_PREFIX)
                .then(|| (index, url.to_string()))
        })
        .collect()
}

/// Request body for one batch of (row index, profile URL) pairs
pub fn bulk_request(batch: &[(usize, String)]) -> BulkRequest {
    BulkRequest {
        name: BATCH_NAME.to_string(),
        datas: batch
            .iter()
            .map(|(row, url)| ContactRequest {
                linkedin_url: url.clone(),
                enrich_fields: ENRICH_FIELDS.iter().map(|f| f.to_string()).collect(),
                custom: Correlation {
                    row: Some(row.to_string()),
                },
            })
            .collect(),
    }
}

/// Write results into the rows they point to. Results with a missing or
/// out-of-range row token are skipped. Returns how many rows were updated.
pub fn apply(rows: &mut [LeadRow], results: &[EnrichedContact]) -> usize {
    let mut updated = 0;

    for result in results {
        let Some(row) = result.row().and_then(|index| rows.get_mut(index)) else {
            ::log::debug!("Skipping enrichment result without a valid row: {:?}", result.custom);
            continue;
        };

        let contact = result.contact.clone().unwrap_or_default();
        let profile = contact.profile.unwrap_or_default();
        let position = profile.position.unwrap_or_default();
        let company = position.company.unwrap_or_default();

        row.email = non_blank(contact.most_probable_email);
        row.enriched_phone = non_blank(contact.most_probable_phone);
        row.first_name = non_blank(profile.firstname);
        row.last_name = non_blank(profile.lastname);
        row.headline = non_blank(profile.headline);
        row.position = non_blank(position.title);
        row.enriched_company = non_blank(company.name);
        updated += 1;
    }
    updated
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Client for the bulk enrichment endpoints
pub struct EnrichClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    poll_sleep: Duration,
    poll_max_tries: u32,
}

impl EnrichClient {
    pub fn new(settings: &EnrichSettings, api_key: String) -> Result<Self, EnrichError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            poll_sleep: Duration::from_secs(settings.poll_sleep_secs),
            poll_max_tries: settings.poll_max_tries,
        })
    }

    fn bulk_url(&self) -> String {
        format!("{}/contact/enrich/bulk", self.api_base)
    }

    /// Submit one batch, returning its enrichment id
    pub async fn submit(&self, request: &BulkRequest) -> Result<String, EnrichError> {
        let resp = self
            .http
            .post(self.bulk_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EnrichError::RateLimited);
        }
        let body: SubmitResponse = resp.error_for_status()?.json().await?;

        body.enrichment_id
            .filter(|id| !id.is_empty())
            .ok_or(EnrichError::MissingEnrichmentId)
    }

    /// Poll a batch until it has results. Gives up with an empty list
    /// after the configured number of tries.
    pub async fn poll(&self, enrichment_id: &str) -> Result<Vec<EnrichedContact>, EnrichError> {
        let url = format!("{}/{}", self.bulk_url(), enrichment_id);

        for attempt in 1..=self.poll_max_tries {
            tokio::time::sleep(self.poll_sleep).await;

            let resp = self.http.get(&url).bearer_auth(&self.api_key).send().await?;
            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                ::log::warn!("Rate limited while polling {}, backing off", enrichment_id);
                tokio::time::sleep(self.poll_sleep * 2).await;
                continue;
            }

            let bytes = resp.error_for_status()?.bytes().await?;
            let results: BulkResults = if bytes.is_empty() {
                BulkResults::default()
            } else {
                serde_json::from_slice(&bytes)?
            };

            if !results.datas.is_empty() {
                ::log::info!(
                    "Batch {} ready after {} polls ({} results)",
                    enrichment_id,
                    attempt,
                    results.datas.len()
                );
                return Ok(results.datas);
            }
            ::log::debug!("Batch {} not ready (poll {})", enrichment_id, attempt);
        }

        ::log::warn!(
            "Batch {} gave no results after {} polls",
            enrichment_id,
            self.poll_max_tries
        );
        Ok(Vec::new())
    }
}
