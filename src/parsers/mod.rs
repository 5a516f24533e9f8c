pub mod html;
pub mod jobup;
pub mod offers;
pub mod text;

#[cfg(test)]
mod tests;

/// Format of a mail body part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// text/plain
    Plain,
    /// text/html
    Html,
    /// Anything else (attachments, images, ...)
    Other,
}

impl BodyFormat {
    /// Determines the body format from a MIME type such as `text/plain`
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "text/plain" => BodyFormat::Plain,
            "text/html" => BodyFormat::Html,
            other => {
                ::log::trace!("Ignoring body part of type {}", other);
                BodyFormat::Other
            }
        }
    }

    /// Plain text wins over HTML when a message carries both
    pub fn preference(&self) -> Option<u8> {
        match self {
            BodyFormat::Plain => Some(0),
            BodyFormat::Html => Some(1),
            BodyFormat::Other => None,
        }
    }
}

/// Turns a decoded body part into text the offer parser can scan
pub fn body_text(content: &str, format: BodyFormat) -> Option<String> {
    match format {
        BodyFormat::Plain => Some(content.to_string()),
        BodyFormat::Html => Some(html::to_text(content)),
        BodyFormat::Other => None,
    }
}
