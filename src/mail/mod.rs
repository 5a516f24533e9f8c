//! Mail collaborator: job alerts read from an IMAP account or a local
//! Maildir.
//!
//! Both sources hand out unread messages and flag the handled ones as seen,
//! so the next run does not read them again.

pub mod server;

pub use server::ImapMailbox;

use crate::parsers::{self, BodyFormat};
use mailparse::{MailHeaderMap, ParsedMail};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Which messages count as job alerts
#[derive(Debug, Clone)]
pub struct MailFilter {
    sender: String,
    subject_keywords: Vec<String>,
}

impl MailFilter {
    pub fn new(sender: &str, subject_keywords: &[String]) -> Self {
        Self {
            sender: sender.to_lowercase(),
            subject_keywords: subject_keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Sender must contain the configured address, subject one of the keywords
    pub fn accepts(&self, message: &MailMessage) -> bool {
        let from = sender_address(&message.from).to_lowercase();
        let subject = message.subject.to_lowercase();

        from.contains(&self.sender) && self.subject_keywords.iter().any(|k| subject.contains(k))
    }
}

/// The parts of a message the pipeline cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub subject: String,
    /// Plain-text body, or the HTML body rendered to text
    pub body: Option<String>,
}

impl MailMessage {
    /// Parse raw RFC 822 bytes
    pub fn parse(raw: &[u8]) -> Result<Self, mailparse::MailParseError> {
        let parsed = mailparse::parse_mail(raw)?;

        Ok(Self {
            from: parsed.headers.get_first_value("From").unwrap_or_default(),
            subject: parsed
                .headers
                .get_first_value("Subject")
                .unwrap_or_default()
                .trim()
                .to_string(),
            body: best_body(&parsed),
        })
    }
}

/// Plain text first, HTML as a fallback, from anywhere in the MIME tree
fn best_body(parsed: &ParsedMail<'_>) -> Option<String> {
    let mut parts = Vec::new();
    collect_leaves(parsed, &mut parts);

    let (format, part) = parts
        .into_iter()
        .filter_map(|part| {
            let format = BodyFormat::from_mime(&part.ctype.mimetype);
            format.preference().map(|rank| (rank, format, part))
        })
        .min_by_key(|(rank, _, _)| *rank)
        .map(|(_, format, part)| (format, part))?;

    match part.get_body() {
        Ok(content) => parsers::body_text(&content, format),
        Err(e) => {
            ::log::warn!("Failed to decode {} body: {}", part.ctype.mimetype, e);
            None
        }
    }
}

fn collect_leaves<'a>(part: &'a ParsedMail<'a>, leaves: &mut Vec<&'a ParsedMail<'a>>) {
    if part.subparts.is_empty() {
        leaves.push(part);
    } else {
        for sub in &part.subparts {
            collect_leaves(sub, leaves);
        }
    }
}

/// Address part of a `From` header: `Name <addr>` gives `addr`
pub fn sender_address(from: &str) -> &str {
    match (from.rfind('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => from[start + 1..end].trim(),
        _ => from.trim(),
    }
}

/// Where a raw message came from, used to flag it afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageId {
    File(PathBuf),
    Uid(u32),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::File(path) => write!(f, "{}", path.display()),
            MessageId::Uid(uid) => write!(f, "UID {}", uid),
        }
    }
}

/// An unread message, not parsed yet
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: MessageId,
    pub bytes: Vec<u8>,
}

/// A source of job-alert messages
pub trait Mailbox {
    /// Messages not flagged as seen yet
    fn unread(&mut self) -> Result<Vec<RawMessage>, Box<dyn Error>>;

    /// Flag a message handed out by `unread` as seen
    fn mark_seen(&mut self, message: &RawMessage) -> Result<(), Box<dyn Error>>;

    /// Release the source once the stage is done with it
    fn close(&mut self) {}
}

/// Local mailbox holding the alerts.
///
/// Messages waiting under `new/` are unread; marking one seen moves it to
/// `cur/` with the `S` flag. A plain directory of `.eml` files is read
/// as-is and left untouched.
#[derive(Debug, Clone)]
pub struct Maildir {
    root: PathBuf,
}

impl Maildir {
    /// Open a mailbox; the directory has to exist
    pub fn open<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mail directory {} does not exist", root.display()),
            ));
        }
        Ok(Self { root })
    }

    fn new_dir(&self) -> PathBuf {
        self.root.join("new")
    }

    fn cur_dir(&self) -> PathBuf {
        self.root.join("cur")
    }
}

impl Mailbox for Maildir {
    /// Unread messages, sorted by file name
    fn unread(&mut self) -> Result<Vec<RawMessage>, Box<dyn Error>> {
        let dir = if self.new_dir().is_dir() {
            self.new_dir()
        } else {
            self.root.clone()
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if entry.file_type()?.is_file() && !hidden {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut messages = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(&path)?;
            messages.push(RawMessage {
                id: MessageId::File(path),
                bytes,
            });
        }
        ::log::info!("{} unread messages in {}", messages.len(), dir.display());
        Ok(messages)
    }

    /// Only files from `new/` move; anything else stays where it is
    fn mark_seen(&mut self, message: &RawMessage) -> Result<(), Box<dyn Error>> {
        let MessageId::File(path) = &message.id else {
            return Ok(());
        };
        if path.parent() != Some(self.new_dir().as_path()) {
            return Ok(());
        }
        let Some(name) = path.file_name() else {
            return Ok(());
        };

        fs::create_dir_all(self.cur_dir())?;
        let mut seen_name = name.to_os_string();
        seen_name.push(":2,S");
        fs::rename(path, self.cur_dir().join(seen_name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN_ALERT: &str = "From: jobup.ch <noreply@jobup.ch>\r\n\
Subject: Your job alert: 2 new jobs\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Dev Backend\r\n\
https://www.jobup.ch/fr/job/123?utm=3Dmail\r\n\
Acme SA, Gen=C3=A8ve\r\n";

    const HTML_ALERT: &str = "From: noreply@jobup.ch\r\n\
Subject: Nouvelles offres d'emploi\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: image/png\r\n\
\r\n\
xxxx\r\n\
--b1\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<html><body><p>Dev</p><p>https://www.jobup.ch/fr/job/1</p><p>Acme SA, Bern</p></body></html>\r\n\
--b1--\r\n";

    fn filter() -> MailFilter {
        let keywords = ["job alert", "offres d'emploi"].map(String::from);
        MailFilter::new("noreply@jobup.ch", &keywords)
    }

    #[test]
    fn test_parse_plain_alert() {
        let message = MailMessage::parse(PLAIN_ALERT.as_bytes()).unwrap();
        assert_eq!(message.subject, "Your job alert: 2 new jobs");
        let body = message.body.clone().unwrap();
        assert!(body.contains("https://www.jobup.ch/fr/job/123?utm=mail"));
        assert!(body.contains("Acme SA, Genève"));
        assert!(filter().accepts(&message));
    }

    #[test]
    fn test_parse_html_alert() {
        let message = MailMessage::parse(HTML_ALERT.as_bytes()).unwrap();
        assert_eq!(
            message.body.as_deref(),
            Some("Dev\nhttps://www.jobup.ch/fr/job/1\nAcme SA, Bern")
        );
        assert!(filter().accepts(&message));
    }

    #[test]
    fn test_filter_rejects() {
        let other_sender = MailMessage {
            from: "Someone <news@example.com>".to_string(),
            subject: "Job alert".to_string(),
            body: None,
        };
        assert!(!filter().accepts(&other_sender));

        let other_subject = MailMessage {
            from: "noreply@jobup.ch".to_string(),
            subject: "Your invoice".to_string(),
            body: None,
        };
        assert!(!filter().accepts(&other_subject));
    }

    #[test]
    fn test_sender_address() {
        assert_eq!(sender_address("Jobup <noreply@jobup.ch>"), "noreply@jobup.ch");
        assert_eq!(sender_address(" noreply@jobup.ch "), "noreply@jobup.ch");
        assert_eq!(sender_address(""), "");
    }

    #[test]
    fn test_maildir_unread_and_mark_seen() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("new")).unwrap();
        fs::write(dir.path().join("new/2.eml"), PLAIN_ALERT).unwrap();
        fs::write(dir.path().join("new/1.eml"), HTML_ALERT).unwrap();
        fs::write(dir.path().join("new/.hidden"), "x").unwrap();

        let mut maildir = Maildir::open(dir.path()).unwrap();
        let unread = maildir.unread().unwrap();
        assert_eq!(unread.len(), 2);
        assert_eq!(unread[0].id, MessageId::File(dir.path().join("new/1.eml")));

        maildir.mark_seen(&unread[0]).unwrap();
        assert!(dir.path().join("cur/1.eml:2,S").is_file());
        assert_eq!(maildir.unread().unwrap().len(), 1);
    }

    #[test]
    fn test_flat_directory_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("alert.eml"), PLAIN_ALERT).unwrap();

        let mut maildir = Maildir::open(dir.path()).unwrap();
        let unread = maildir.unread().unwrap();
        assert_eq!(unread.len(), 1);
        maildir.mark_seen(&unread[0]).unwrap();
        assert!(dir.path().join("alert.eml").is_file());
    }

    #[test]
    fn test_uid_messages_are_not_moved() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("new")).unwrap();
        let mut maildir = Maildir::open(dir.path()).unwrap();

        let message = RawMessage {
            id: MessageId::Uid(7),
            bytes: Vec::new(),
        };
        maildir.mark_seen(&message).unwrap();
        assert!(!dir.path().join("cur").exists());
        assert_eq!(message.id.to_string(), "UID 7");
    }

    #[test]
    fn test_missing_mail_dir() {
        assert!(Maildir::open("/nonexistent/mail").is_err());
    }
}
