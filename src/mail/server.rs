//! Job alerts straight from an IMAP account.
//!
//! Messages are fetched with `BODY.PEEK[]` so fetching alone leaves them
//! unread; only the ones the stage handled get the `\Seen` flag.

use super::{Mailbox, MessageId, RawMessage};
use crate::config::{ImapSettings, MailCredentials};
use native_tls::{TlsConnector, TlsStream};
use std::error::Error;
use std::net::TcpStream;

/// A logged-in IMAP session on the alert folder
pub struct ImapMailbox {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl ImapMailbox {
    /// Connect over TLS, log in and select the configured folder
    pub fn connect(
        settings: &ImapSettings,
        credentials: &MailCredentials,
    ) -> Result<Self, Box<dyn Error>> {
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect(
            (settings.host.as_str(), settings.port),
            &settings.host,
            &tls,
        )?;

        let mut session = client
            .login(&credentials.user, &credentials.password)
            .map_err(|(e, _)| e)?;
        session.select(&settings.folder)?;

        ::log::info!(
            "Logged in to {} as {}, folder {}",
            settings.host,
            credentials.user,
            settings.folder
        );
        Ok(Self { session })
    }

}

impl Mailbox for ImapMailbox {
    fn unread(&mut self) -> Result<Vec<RawMessage>, Box<dyn Error>> {
        let mut uids: Vec<u32> = self.session.uid_search("UNSEEN")?.into_iter().collect();
        uids.sort_unstable();
        ::log::info!("{} unread messages on the server", uids.len());
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let fetches = self.session.uid_fetch(uid_set(&uids), "BODY.PEEK[]")?;
        let mut messages: Vec<RawMessage> = fetches
            .iter()
            .filter_map(|fetch| {
                Some(RawMessage {
                    id: MessageId::Uid(fetch.uid?),
                    bytes: fetch.body()?.to_vec(),
                })
            })
            .collect();
        messages.sort_by_key(|message| match message.id {
            MessageId::Uid(uid) => uid,
            MessageId::File(_) => 0,
        });
        Ok(messages)
    }

    fn mark_seen(&mut self, message: &RawMessage) -> Result<(), Box<dyn Error>> {
        let MessageId::Uid(uid) = message.id else {
            return Ok(());
        };
        self.session.uid_store(uid.to_string(), "+FLAGS (\\Seen)")?;
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.session.logout() {
            ::log::warn!("IMAP logout failed: {}", e);
        }
    }
}

/// Comma-separated UID set for a fetch command
pub fn uid_set(uids: &[u32]) -> String {
    uids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_set() {
        assert_eq!(uid_set(&[3, 17, 42]), "3,17,42");
        assert_eq!(uid_set(&[9]), "9");
        assert_eq!(uid_set(&[]), "");
    }
}
