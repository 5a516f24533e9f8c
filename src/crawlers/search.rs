//! LinkedIn lookups through DuckDuckGo result pages.

use crate::crawlers::webdriver::BrowserSession;
use crate::links;
use crate::parsers::html;
use std::time::Duration;
use url::Url;

const SEARCH_URL: &str = "https://duckduckgo.com/";
const RESULTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Anchors worth reading on a company search result page
pub const COMPANY_RESULT_LINKS: &str =
    "a[href*='linkedin.com/company'], a[href*='duckduckgo.com/l/?uddg='], a[href^='/l/?uddg=']";

/// Anchors worth reading on a profile search result page
pub const PROFILE_RESULT_LINKS: &str =
    "[data-testid='result-title-a'], a[href*='duckduckgo.com/l/?uddg='], a[href^='/l/?uddg=']";

pub fn company_query(name: &str) -> String {
    format!("site:linkedin.com/company {}", name.trim())
}

/// People at the top of a company, by the titles they usually carry
pub fn ceo_query(company: &str) -> String {
    format!(
        "site:linkedin.com/in (\"CEO\" OR \"Chief Executive\" OR \"Founder\" OR \"Managing Director\") \"{}\"",
        company.trim()
    )
}

pub fn search_url(query: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(SEARCH_URL, &[("q", query)])
}

/// Run a search and return the `href` of every anchor matching `selector`
pub async fn search_links(
    session: &BrowserSession,
    query: &str,
    selector: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let url = search_url(query)?;
    session.open(url.as_str(), selector, RESULTS_TIMEOUT).await?;
    let source = session.source().await?;
    Ok(absolute_links(&url, html::links(&source, selector)))
}

/// Resolve relative and protocol-relative `href`s against the page URL,
/// the way a browser reports them
pub fn absolute_links(base: &Url, hrefs: Vec<String>) -> Vec<String> {
    hrefs
        .into_iter()
        .map(|href| match base.join(href.trim()) {
            Ok(url) => url.to_string(),
            Err(_) => href,
        })
        .collect()
}

/// LinkedIn company page for `name`, normalized
pub async fn find_company_page(session: &BrowserSession, name: &str) -> Option<String> {
    let query = company_query(name);
    lookup(session, &query, COMPANY_RESULT_LINKS, "linkedin.com/company").await
}

/// LinkedIn profile of someone leading `company`, normalized
pub async fn find_ceo_profile(session: &BrowserSession, company: &str) -> Option<String> {
    let query = ceo_query(company);
    lookup(session, &query, PROFILE_RESULT_LINKS, "linkedin.com/in").await
}

async fn lookup(
    session: &BrowserSession,
    query: &str,
    selector: &str,
    target: &str,
) -> Option<String> {
    let hrefs = match search_links(session, query, selector).await {
        Ok(hrefs) => hrefs,
        Err(e) => {
            ::log::warn!("Search failed for '{}': {}", query, e);
            return None;
        }
    };

    let found = links::find_first_url(&hrefs, target);
    match &found {
        Some(url) => ::log::info!("{} -> {}", query, url),
        None => ::log::info!("No {} result for '{}'", target, query),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_query() {
        assert_eq!(company_query(" Acme SA "), "site:linkedin.com/company Acme SA");
    }

    #[test]
    fn test_ceo_query() {
        assert_eq!(
            ceo_query("Acme SA"),
            r#"site:linkedin.com/in ("CEO" OR "Chief Executive" OR "Founder" OR "Managing Director") "Acme SA""#
        );
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = search_url(&company_query("Acme & Co")).unwrap();
        assert_eq!(url.host_str(), Some("duckduckgo.com"));
        let q = url
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned());
        assert_eq!(q.as_deref(), Some("site:linkedin.com/company Acme & Co"));
    }

    #[test]
    fn test_relative_redirects_are_resolved() {
        let page = r#"<html><body>
            <a href="/l/?uddg=https%3A%2F%2Fwww.linkedin.com%2Fin%2Fjane-doe%3Ftrk%3Dx&rut=1">Jane Doe</a>
        </body></html>"#;
        let base = search_url(&ceo_query("Acme")).unwrap();
        let hrefs = absolute_links(&base, html::links(page, PROFILE_RESULT_LINKS));
        assert_eq!(hrefs.len(), 1);
        assert!(hrefs[0].starts_with("https://duckduckgo.com/l/?uddg="));

        assert_eq!(
            links::find_first_url(&hrefs, "linkedin.com/in").as_deref(),
            Some("https://www.linkedin.com/in/jane-doe")
        );
    }

    #[test]
    fn test_absolute_links_keep_absolute_urls() {
        let base = Url::parse("https://duckduckgo.com/?q=x").unwrap();
        let hrefs = vec![
            "https://www.linkedin.com/company/acme".to_string(),
            "//duckduckgo.com/l/?uddg=x".to_string(),
        ];
        assert_eq!(
            absolute_links(&base, hrefs),
            vec![
                "https://www.linkedin.com/company/acme".to_string(),
                "https://duckduckgo.com/l/?uddg=x".to_string(),
            ]
        );
    }

    #[test]
    fn test_result_page_to_company_url() {
        let page = r#"<html><body>
            <a href="https://example.com/acme">Acme</a>
            <a href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fch.linkedin.com%2Fcompany%2Facme%2F%3Ftrk%3Dx&rut=abc">Acme | LinkedIn</a>
            <a href="https://www.linkedin.com/company/other">Other</a>
        </body></html>"#;
        let hrefs = html::links(page, COMPANY_RESULT_LINKS);
        assert_eq!(hrefs.len(), 2);

        assert_eq!(
            links::find_first_url(&hrefs, "linkedin.com/company").as_deref(),
            Some("https://www.linkedin.com/company/acme/")
        );
    }
}
