use url::Url;

/// Canonical host every LinkedIn URL is rewritten to
pub const LINKEDIN_HOST: &str = "www.linkedin.com";

/// Host fragment that identifies a DuckDuckGo redirect link
const DUCKDUCKGO_HOST: &str = "duckduckgo.com";

/// Query parameter carrying the destination of a DuckDuckGo redirect
const REDIRECT_PARAM: &str = "uddg";

/// Canonicalizes a URL: `https` scheme, LinkedIn hosts collapsed to
/// `www.linkedin.com`, query and fragment dropped, path kept as-is.
///
/// `None` is passed through, blank input comes back trimmed, and malformed
/// input is rebuilt on a best-effort basis instead of failing.
pub fn normalize_linkedin_url(input: Option<&str>) -> Option<String> {
    let raw = input?.trim();
    if raw.is_empty() {
        return Some(String::new());
    }

    let with_scheme = if split_scheme(raw).is_some() {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    if let Some(canonical) = parse_canonical(&with_scheme) {
        return Some(canonical);
    }

    // The rebuilt string may parse where the input did not: `file:///x`
    // becomes `https:///x`, which has host `x`
    let rebuilt = rebuild_without_query(&with_scheme);
    Some(parse_canonical(&rebuilt).unwrap_or(rebuilt))
}

/// `https://<authority><path>` for URLs that parse and carry a host
fn parse_canonical(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?;

    let authority = if host.contains("linkedin.com") {
        LINKEDIN_HOST.to_string()
    } else {
        // 443 disappears once the scheme is https
        match url.port() {
            Some(port) if port != 443 => format!("{}:{}", host, port),
            _ => host.to_string(),
        }
    };

    Some(format!("https://{}{}", authority, url.path()))
}

/// Splits `scheme://rest` when the part before the first `://` is a valid
/// scheme (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`)
fn split_scheme(url: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

/// Fallback for strings without a usable host: swap the scheme and cut
/// everything from the first `?` or `#`.
fn rebuild_without_query(url: &str) -> String {
    let rest = split_scheme(url).map_or(url, |(_, rest)| rest);
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    format!("https://{}", &rest[..end])
}

/// Extracts the real destination from a search-engine redirect link.
///
/// DuckDuckGo `/l/?uddg=...` links yield their decoded `uddg` parameter;
/// anything else is assumed to already be a direct URL and is returned
/// trimmed. Blank input yields `None`.
pub fn resolve_redirect(href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() {
        return None;
    }

    // Scraped anchors are often protocol-relative
    let parsed = if href.starts_with("//") {
        Url::parse(&format!("https:{}", href))
    } else {
        Url::parse(href)
    };

    if let Ok(url) = parsed {
        let is_redirect = url
            .host_str()
            .is_some_and(|host| host.to_ascii_lowercase().contains(DUCKDUCKGO_HOST));
        if is_redirect {
            // form_urlencoded turns `+` into a space before percent-decoding
            if let Some((_, target)) = url.query_pairs().find(|(key, _)| key == REDIRECT_PARAM) {
                return Some(target.into_owned());
            }
        }
    }

    Some(href.to_string())
}

/// Returns the first candidate whose resolved URL contains `target`
/// (case-insensitive), normalized. Later candidates are not looked at once
/// a match is found.
pub fn find_first_url<I, S>(candidates: I, target: &str) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let needle = target.to_lowercase();

    candidates.into_iter().find_map(|candidate| {
        let resolved = resolve_redirect(Some(candidate.as_ref()))?;
        if resolved.is_empty() || !resolved.to_lowercase().contains(&needle) {
            return None;
        }
        ::log::debug!("Matched '{}' with {}", target, resolved);
        normalize_linkedin_url(Some(&resolved))
    })
}
