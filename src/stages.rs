//! Bodies of the five pipeline stages.
//!
//! Each stage reads what the previous one exported, does its own lookups
//! and writes a new table. Per-row lookup failures are logged and leave the
//! cell empty; only setup problems (missing input, no browser, no API key)
//! fail the stage.

use crate::config::{AppConfig, DotEnv, EnvSource, enrichment_api_key, mail_credentials};
use crate::crawlers::{self, BrowserSession};
use crate::enrich::{self, EnrichClient};
use crate::export;
use crate::mail::{ImapMailbox, MailFilter, MailMessage, Mailbox, Maildir};
use crate::parsers::offers;
use crate::results::{JobDetails, LeadRow, columns};
use crate::utils::polite_delay;
use std::error::Error;
use std::path::Path;

type StageResult = Result<(), Box<dyn Error>>;

/// Stage 1: fetch the current stable ChromeDriver
pub async fn update_driver(config: &AppConfig) -> StageResult {
    crate::driver::update(&config.driver_dir).await?;
    Ok(())
}

/// Stage 2: job alerts to an offer table with page details
pub async fn read_mail(config: &AppConfig) -> StageResult {
    let mut mailbox = open_mailbox(config)?;
    let filter = MailFilter::new(&config.sender, &config.subject_keywords);

    let mut handled = Vec::new();
    let mut rows = Vec::new();
    for raw in mailbox.unread()? {
        let message = match MailMessage::parse(&raw.bytes) {
            Ok(message) => message,
            Err(e) => {
                ::log::warn!("Skipping unreadable message {}: {}", raw.id, e);
                continue;
            }
        };
        if !filter.accepts(&message) {
            ::log::debug!("Ignoring message '{}' from {}", message.subject, message.from);
            continue;
        }

        let found = message
            .body
            .as_deref()
            .map(|body| offers::extract_offers(body, &config.job_url_prefix))
            .unwrap_or_default();
        ::log::info!("{} offers in '{}'", found.len(), message.subject);

        rows.extend(
            found
                .into_iter()
                .map(|offer| LeadRow::from_offer(offer, JobDetails::default())),
        );
        handled.push(raw);
    }

    let mut rows = export::dedup_by_url(rows);
    if rows.is_empty() {
        ::log::info!("No offers found, no content exported");
    } else {
        let session = BrowserSession::connect(config, "fr-FR").await?;
        for (i, row) in rows.iter_mut().enumerate() {
            if i > 0 {
                polite_delay(&config.delay).await;
            }
            ::log::info!("[{}] {}", i + 1, row.offer_url);
            let details =
                crawlers::jobup::visit_offer(&session, &row.offer_url, &config.debug_dir).await;
            row.set_details(details);
        }
        session.close().await;
        export::write_rows(&config.exports.offers, &rows)?;
    }

    for raw in &handled {
        if let Err(e) = mailbox.mark_seen(raw) {
            ::log::warn!("Failed to mark {} as seen: {}", raw.id, e);
        }
    }
    mailbox.close();
    Ok(())
}

/// The IMAP account when one is configured, the local Maildir otherwise
fn open_mailbox(config: &AppConfig) -> Result<Box<dyn Mailbox>, Box<dyn Error>> {
    match &config.imap {
        Some(settings) => {
            let dotenv = DotEnv::load(".env")?;
            let credentials = mail_credentials(&[&EnvSource, &dotenv])?;
            Ok(Box::new(ImapMailbox::connect(settings, &credentials)?))
        }
        None => Ok(Box::new(Maildir::open(&config.mail_dir)?)),
    }
}

/// Stage 3: LinkedIn company page for every scraped company name
pub async fn find_companies(config: &AppConfig) -> StageResult {
    let mut rows = read_input(&config.exports.offers)?;

    let session = BrowserSession::connect(config, "en-US").await?;
    for (i, row) in rows.iter_mut().enumerate() {
        let Some(name) = row.search_name().map(str::to_string) else {
            continue;
        };
        if i > 0 {
            polite_delay(&config.delay).await;
        }
        row.company_linkedin = crawlers::search::find_company_page(&session, &name).await;
    }
    session.close().await;

    export::write_rows(&config.exports.companies, &rows)
}

/// Stage 4: LinkedIn profile of a company's leader
pub async fn find_profiles(config: &AppConfig) -> StageResult {
    let mut rows = read_input(&config.exports.companies)?;

    let session = BrowserSession::connect(config, "en-US").await?;
    for (i, row) in rows.iter_mut().enumerate() {
        let Some(name) = row.search_name().map(str::to_string) else {
            continue;
        };
        if i > 0 {
            polite_delay(&config.delay).await;
        }
        row.profile_linkedin = crawlers::search::find_ceo_profile(&session, &name).await;
    }
    session.close().await;

    export::write_rows(&config.exports.profiles, &rows)
}

/// Stage 5: contact details for every canonical profile URL
pub async fn enrich(config: &AppConfig) -> StageResult {
    let dotenv = DotEnv::load(".env")?;
    let api_key = enrichment_api_key(config, &dotenv)?;

    let mut rows = export::read_rows(&config.exports.profiles)?;
    let targets = enrich::profile_targets(&rows);
    if targets.is_empty() {
        ::log::info!("No valid LinkedIn /in/ profile to enrich");
        return Ok(());
    }

    let client = EnrichClient::new(&config.enrich, api_key)?;
    let batches: Vec<_> = targets.chunks(config.enrich.batch_size.max(1)).collect();

    let mut results = Vec::new();
    for (i, batch) in batches.iter().enumerate() {
        ::log::info!("Batch {}/{} ({} profiles)", i + 1, batches.len(), batch.len());

        let enrichment_id = match client.submit(&enrich::bulk_request(batch)).await {
            Ok(id) => id,
            Err(e) => {
                ::log::error!("Batch {} not submitted: {}", i + 1, e);
                continue;
            }
        };
        match client.poll(&enrichment_id).await {
            Ok(found) => results.extend(found),
            Err(e) => ::log::error!("Batch {} results unavailable: {}", i + 1, e),
        }
    }

    if results.is_empty() {
        ::log::warn!("No enrichment results, nothing exported");
        return Ok(());
    }

    let updated = enrich::apply(&mut rows, &results);
    ::log::info!("Enriched {} of {} rows", updated, rows.len());
    export::write_rows(&config.exports.enriched, &rows)
}

/// Lead table from an earlier stage; it must carry scraped company names
fn read_input(path: &Path) -> Result<Vec<LeadRow>, Box<dyn Error>> {
    export::require_column(path, columns::SCRAPED_COMPANY)?;
    export::read_rows(path)
}
