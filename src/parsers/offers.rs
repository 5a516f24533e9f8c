use crate::parsers::text::{clean_transport_artifacts, non_blank_lines};
use crate::results::OfferRecord;

/// URL prefix of jobup.ch offer pages
pub const JOBUP_URL_PREFIX: &str = "https://www.jobup.ch";

/// Extracts jobup.ch offers from a decoded alert email body
pub fn extract_jobup_offers(body: &str) -> Vec<OfferRecord> {
    extract_offers(body, JOBUP_URL_PREFIX)
}

/// Extracts offers laid out as three consecutive non-blank lines:
///
/// ```text
/// <title>
/// <url starting with url_prefix>
/// <company>, <location>
/// ```
///
/// The window slides one line at a time, so a match does not consume its
/// lines. Results are in body order and are not deduplicated.
pub fn extract_offers(body: &str, url_prefix: &str) -> Vec<OfferRecord> {
    let clean = clean_transport_artifacts(body);
    let lines = non_blank_lines(&clean);

    let offers = lines
        .windows(3)
        .filter_map(|window| parse_window(window, url_prefix))
        .collect::<Vec<_>>();

    ::log::debug!(
        "Found {} offers in {} non-blank lines",
        offers.len(),
        lines.len()
    );
    offers
}

fn parse_window(window: &[&str], url_prefix: &str) -> Option<OfferRecord> {
    let [title, url, company_line] = window else {
        return None;
    };
    if !url.starts_with(url_prefix) {
        return None;
    }
    let (company, location) = company_line.split_once(',')?;

    Some(OfferRecord {
        title: title.to_string(),
        company: company.trim().to_string(),
        location: location.trim().to_string(),
        url: url.to_string(),
    })
}
