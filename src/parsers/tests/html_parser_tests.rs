use crate::parsers::offers::extract_jobup_offers;
use crate::parsers::{BodyFormat, body_text, html};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_text_one_node_per_line() {
        let page = "<html><body><p>Hello, <b>world</b>!</p><div>  Second  </div></body></html>";
        assert_eq!(html::to_text(page), "Hello,\nworld\n!\nSecond");
    }

    #[test]
    fn test_links_with_selector() {
        let page = r#"<html><body>
            <a href="https://example.com">Example</a>
            <a data-testid="result-title-a" href="https://linkedin.com/in/a">A</a>
            <a href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.linkedin.com%2Fin%2Fb">B</a>
            <a>No href</a>
        </body></html>"#;

        assert_eq!(html::links(page, "a").len(), 3);
        assert_eq!(
            html::links(
                page,
                "[data-testid='result-title-a'], a[href*='duckduckgo.com/l/?uddg=']"
            ),
            vec![
                "https://linkedin.com/in/a".to_string(),
                "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.linkedin.com%2Fin%2Fb".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_selector_yields_nothing() {
        assert!(html::links("<a href='x'>x</a>", "a[").is_empty());
    }

    #[test]
    fn test_body_format_from_mime() {
        let types = [
            ("text/plain", BodyFormat::Plain),
            ("TEXT/HTML", BodyFormat::Html),
            ("image/png", BodyFormat::Other),
            ("multipart/alternative", BodyFormat::Other),
        ];
        for (mime, expected) in types {
            assert_eq!(BodyFormat::from_mime(mime), expected, "mime {}", mime);
        }
        assert!(BodyFormat::Plain.preference() < BodyFormat::Html.preference());
        assert_eq!(BodyFormat::Other.preference(), None);
    }

    #[test]
    fn test_html_alert_body_feeds_offer_parser() {
        let page = r#"<html><body><table>
            <tr><td><a href="https://www.jobup.ch/fr/job/1">Dev Backend</a></td></tr>
            <tr><td>https://www.jobup.ch/fr/job/1</td></tr>
            <tr><td>Acme SA, Geneva</td></tr>
        </table></body></html>"#;
        let text = body_text(page, BodyFormat::Html).unwrap_or_default();
        let offers = extract_jobup_offers(&text);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].title, "Dev Backend");
        assert_eq!(offers[0].location, "Geneva");
        assert_eq!(body_text("ignored", BodyFormat::Other), None);
    }
}
