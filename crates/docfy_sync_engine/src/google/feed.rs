//! The GData v3 contacts feed, JSON flavour.

use crate::error::{SyncError, SyncResult};
use docfy_model::Contact;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FeedResponse {
    feed: Feed,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$t", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GdName {
    #[serde(rename = "gd$fullName")]
    full_name: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct GdEmail {
    address: String,
    #[serde(default)]
    primary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GdPhoneNumber {
    #[serde(rename = "$t", default)]
    number: String,
    #[serde(default)]
    primary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    id: TextNode,
    #[serde(default)]
    title: Option<TextNode>,
    #[serde(rename = "gd$name", default)]
    name: Option<GdName>,
    #[serde(rename = "gd$email", default)]
    emails: Vec<GdEmail>,
    #[serde(rename = "gd$phoneNumber", default)]
    phone_numbers: Vec<GdPhoneNumber>,
    #[serde(rename = "gd$deleted", default)]
    deleted: Option<serde_json::Value>,
}

/// One page of the contacts feed.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct FeedPage {
    pub contacts: Vec<Contact>,
    pub deleted: Vec<Contact>,
    /// Entries on the page, live and deleted.
    pub entries: usize,
}

/// Returns the last path segment of a GData entry id.
pub(crate) fn remote_id_from_entry_id(entry_id: &str) -> String {
    entry_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(entry_id)
        .to_string()
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_primary(flag: &Option<String>) -> bool {
    flag.as_deref() == Some("true")
}

impl FeedEntry {
    fn into_contact(self) -> Contact {
        let mut contact = Contact::new(remote_id_from_entry_id(&self.id.text));

        contact.name = self
            .name
            .and_then(|n| n.full_name)
            .and_then(|n| non_empty(&n.text))
            .or_else(|| self.title.and_then(|t| non_empty(&t.text)));

        contact.email = self
            .emails
            .iter()
            .find(|e| is_primary(&e.primary))
            .or_else(|| self.emails.first())
            .and_then(|e| non_empty(&e.address));

        contact.phone_number = self
            .phone_numbers
            .iter()
            .find(|p| is_primary(&p.primary))
            .or_else(|| self.phone_numbers.first())
            .and_then(|p| non_empty(&p.number));

        contact
    }
}

/// Parses one `alt=json` feed page.
pub(crate) fn parse_page(body: &str) -> SyncResult<FeedPage> {
    let response: FeedResponse = serde_json::from_str(body)
        .map_err(|e| SyncError::Protocol(format!("invalid contacts feed: {e}")))?;

    let mut page = FeedPage {
        entries: response.feed.entry.len(),
        ..FeedPage::default()
    };
    for entry in response.feed.entry {
        if entry.deleted.is_some() {
            page.deleted.push(entry.into_contact());
        } else {
            page.contacts.push(entry.into_contact());
        }
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
      "version": "1.0",
      "feed": {
        "id": {"$t": "main@x.com"},
        "entry": [
          {
            "id": {"$t": "http://www.google.com/m8/feeds/contacts/main%40x.com/base/1a2b"},
            "title": {"$t": "Ana Souza"},
            "gd$name": {"gd$fullName": {"$t": "Ana Souza"}},
            "gd$email": [
              {"rel": "http://schemas.google.com/g/2005#work", "address": "ana@work.com"},
              {"rel": "http://schemas.google.com/g/2005#home", "address": "ana@home.com", "primary": "true"}
            ],
            "gd$phoneNumber": [{"$t": "+55 19 5555-0001"}]
          },
          {
            "id": {"$t": "http://www.google.com/m8/feeds/contacts/main%40x.com/base/3c4d"},
            "title": {"$t": ""},
            "gd$deleted": {}
          }
        ]
      }
    }"#;

    #[test]
    fn splits_live_and_deleted_entries() {
        let page = parse_page(PAGE).unwrap();
        assert_eq!(page.entries, 2);
        assert_eq!(page.contacts.len(), 1);
        assert_eq!(page.deleted.len(), 1);
        assert_eq!(page.deleted[0].id, "3c4d");
        assert!(page.deleted[0].name.is_none());
    }

    #[test]
    fn maps_contact_fields() {
        let page = parse_page(PAGE).unwrap();
        let ana = &page.contacts[0];
        assert_eq!(ana.id, "1a2b");
        assert_eq!(ana.name.as_deref(), Some("Ana Souza"));
        assert_eq!(ana.email.as_deref(), Some("ana@home.com"));
        assert_eq!(ana.phone_number.as_deref(), Some("+55 19 5555-0001"));
    }

    #[test]
    fn empty_feed_has_no_entries() {
        let page = parse_page(r#"{"feed": {"id": {"$t": "x"}}}"#).unwrap();
        assert_eq!(page, FeedPage::default());
    }

    #[test]
    fn garbage_is_protocol_error() {
        assert!(matches!(parse_page("<html>"), Err(SyncError::Protocol(_))));
    }

    #[test]
    fn remote_id_is_last_segment() {
        assert_eq!(
            remote_id_from_entry_id("http://www.google.com/m8/feeds/contacts/a/base/xyz"),
            "xyz"
        );
        assert_eq!(remote_id_from_entry_id("plain"), "plain");
    }
}
