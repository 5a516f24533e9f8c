use crate::parsers::html::{element_text, first_attr, first_text};
use crate::results::JobDetails;
use crate::strategy::Prioritized;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Phone numbers as printed in Swiss job ads: +41 22 123 45 67, 022/123.45.67, ...
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\(?\d[\d\s()./-]{7,}\d").expect("Phone pattern should be valid")
});

/// Extracts company, contact name and phone from a rendered job page.
///
/// Every field goes through its own ordered list of lookups and keeps the
/// first one that finds something; a field nobody finds stays `None`.
pub fn extract_details(html: &str) -> JobDetails {
    let doc = Html::parse_document(html);

    JobDetails {
        contact: contact_strategies().first(&doc),
        phone: phone_strategies().first(&doc),
        company: company_strategies().first(&doc),
    }
}

fn company_strategies() -> Prioritized<'static, Html, String> {
    Prioritized::new("company")
        .then("data-cy company-name", |doc| {
            first_text(doc, "[data-cy='company-name']")
        })
        .then("company-information heading", |doc| {
            first_text(doc, "[data-cy='company-information'] h2")
        })
        .then("company profile link", |doc| {
            first_text(doc, "a[href*='/fr/entreprise/']")
        })
        .then("company block link", |doc| {
            first_text(doc, "div[class*='company'] a[href*='/entreprise/']")
        })
        .then("open graph meta", |doc| {
            ["meta[property='og:site_name']", "meta[property='og:title']"]
                .into_iter()
                .filter_map(|sel| first_attr(doc, sel, "content"))
                .find(|value| value.chars().count() > 2)
        })
}

fn contact_strategies() -> Prioritized<'static, Html, String> {
    Prioritized::new("contact")
        .then("data-cy contact-name", |doc| {
            first_text(doc, "[data-cy='vacancy-contact-name']")
        })
        .then("contact block name", |doc| {
            first_text(doc, "[data-cy='vacancy-contact'] [data-cy='name']")
        })
        .then("contact section name", |doc| {
            first_text(doc, "section[id*='contact'] [class*='name']")
        })
        .then("any section name", |doc| first_text(doc, "section [class*='name']"))
}

fn phone_strategies() -> Prioritized<'static, Html, String> {
    Prioritized::new("phone")
        .then("tel link text", |doc| first_text_of_first(doc, "a[href^='tel:']"))
        .then("tel link href", |doc| {
            first_attr(doc, "a[href^='tel:']", "href")
                .map(|href| href.trim_start_matches("tel:").trim().to_string())
                .filter(|number| !number.is_empty())
        })
        .then("contact section text", |doc| {
            let text = first_text(doc, "[data-cy='vacancy-contact']")
                .or_else(|| first_text(doc, "section[id*='contact']"))?;
            find_phone(&text)
        })
}

/// Text of the first match only; an empty first match is a miss
fn first_text_of_first(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// First phone-looking sequence with a plausible digit count
pub fn find_phone(text: &str) -> Option<String> {
    PHONE_REGEX
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| {
            let digits = candidate.chars().filter(|c| c.is_ascii_digit()).count();
            (9..=13).contains(&digits)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_page() {
        let html = r#"<html><body>
            <a data-cy="company-name" href="/fr/entreprise/acme">  Acme   SA </a>
            <section data-cy="vacancy-contact">
              <span data-cy="vacancy-contact-name">Marie Dupont</span>
              <a href="tel:+41221234567">+41 22 123 45 67</a>
            </section>
        </body></html>"#;
        let details = extract_details(html);
        assert_eq!(details.company.as_deref(), Some("Acme SA"));
        assert_eq!(details.contact.as_deref(), Some("Marie Dupont"));
        assert_eq!(details.phone.as_deref(), Some("+41 22 123 45 67"));
    }

    #[test]
    fn test_fallbacks() {
        let html = r#"<html><head>
            <meta property="og:site_name" content="ch">
            <meta property="og:title" content="Beta Sàrl - Developer">
        </head><body>
            <section id="contact-box">
              <div class="person-name"> Jean Muller </div>
              <a href="tel:0221234567"></a>
            </section>
        </body></html>"#;
        let details = extract_details(html);
        assert_eq!(details.company.as_deref(), Some("Beta Sàrl - Developer"));
        assert_eq!(details.contact.as_deref(), Some("Jean Muller"));
        assert_eq!(details.phone.as_deref(), Some("0221234567"));
    }

    #[test]
    fn test_phone_from_contact_text() {
        let html = r#"<html><body>
            <div data-cy="vacancy-contact">Appelez le 022 123 45 67 dès 8h</div>
        </body></html>"#;
        assert_eq!(
            extract_details(html).phone.as_deref(),
            Some("022 123 45 67")
        );
    }

    #[test]
    fn test_empty_page() {
        let details = extract_details("<html><body><p>Nothing here</p></body></html>");
        assert!(details.is_empty());
    }

    #[test]
    fn test_find_phone_digit_bounds() {
        assert_eq!(find_phone("ref 2024-01-01"), None);
        assert_eq!(
            find_phone("tel. +41 (0)22 123.45.67").as_deref(),
            Some("+41 (0)22 123.45.67")
        );
    }
}
