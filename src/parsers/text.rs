//! Plain-text helpers shared by the mail and page parsers.

/// Removes quoted-printable leftovers that survive a partial decode:
/// `=\n` soft line breaks and the escaped `=3D`. A `=` before `\r\n` is
/// kept, since decoded CRLF bodies end real lines that way.
pub fn clean_transport_artifacts(text: &str) -> String {
    text.replace("=\n", "").replace("=3D", "=")
}

/// Splits text into trimmed lines, dropping blank ones, order preserved
pub fn non_blank_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Collapses every run of whitespace into a single space
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}
