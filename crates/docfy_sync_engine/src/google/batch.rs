//! Atom batch documents for the contacts API.
//!
//! Requests carry one `<entry>` per item with `batch:id` set to the item's
//! index; responses are matched back by that index.

use super::feed::remote_id_from_entry_id;
use crate::error::{SyncError, SyncResult};
use docfy_model::{BatchItem, BatchOperation, BatchResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::Cursor;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const GD_NS: &str = "http://schemas.google.com/g/2005";
const GCONTACT_NS: &str = "http://schemas.google.com/contact/2008";
const BATCH_NS: &str = "http://schemas.google.com/gdata/batch";
const CONTACT_KIND: &str = "http://schemas.google.com/contact/2008#contact";

fn xml_error(err: impl std::fmt::Display) -> SyncError {
    SyncError::Protocol(format!("batch xml: {err}"))
}

fn operation_type(operation: BatchOperation) -> &'static str {
    match operation {
        BatchOperation::Create => "insert",
        BatchOperation::Update => "update",
        BatchOperation::Delete => "delete",
    }
}

struct AtomWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl AtomWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new(Cursor::new(Vec::new())),
        }
    }

    fn event(&mut self, event: Event<'_>) -> SyncResult<()> {
        self.inner.write_event(event).map_err(xml_error)
    }

    fn text_element(&mut self, name: &str, text: &str) -> SyncResult<()> {
        self.event(Event::Start(BytesStart::new(name)))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> SyncResult<String> {
        String::from_utf8(self.inner.into_inner().into_inner()).map_err(xml_error)
    }
}

/// Serializes one batch request.
///
/// Updates and deletes address the entry `<contacts_url>/<remote id>` and
/// force the write with `gd:etag="*"`.
pub(crate) fn build_request(
    contacts_url: &str,
    items: &[BatchItem],
    operation: BatchOperation,
) -> SyncResult<String> {
    let contacts_url = contacts_url.trim_end_matches('/');
    let mut w = AtomWriter::new();
    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut feed = BytesStart::new("feed");
    feed.push_attribute(("xmlns", ATOM_NS));
    feed.push_attribute(("xmlns:gContact", GCONTACT_NS));
    feed.push_attribute(("xmlns:gd", GD_NS));
    feed.push_attribute(("xmlns:batch", BATCH_NS));
    w.event(Event::Start(feed))?;

    for (index, item) in items.iter().enumerate() {
        let mut entry = BytesStart::new("entry");
        if operation != BatchOperation::Create {
            entry.push_attribute(("gd:etag", "*"));
        }
        w.event(Event::Start(entry))?;

        w.text_element("batch:id", &index.to_string())?;
        let mut op = BytesStart::new("batch:operation");
        op.push_attribute(("type", operation_type(operation)));
        w.event(Event::Empty(op))?;

        if let Some(remote_id) = &item.remote_id {
            w.text_element("id", &format!("{contacts_url}/{remote_id}"))?;
        }

        let mut category = BytesStart::new("category");
        category.push_attribute(("scheme", "http://schemas.google.com/g/2005#kind"));
        category.push_attribute(("term", CONTACT_KIND));
        w.event(Event::Empty(category))?;

        let contact = &item.contact;
        if let Some(name) = &contact.name {
            w.event(Event::Start(BytesStart::new("gd:name")))?;
            w.text_element("gd:fullName", name)?;
            w.event(Event::End(BytesEnd::new("gd:name")))?;
        }
        if let Some(email) = &contact.email {
            let mut element = BytesStart::new("gd:email");
            element.push_attribute(("rel", "http://schemas.google.com/g/2005#other"));
            element.push_attribute(("address", email.as_str()));
            element.push_attribute(("primary", "true"));
            w.event(Event::Empty(element))?;
        }
        if let Some(phone) = &contact.phone_number {
            let mut element = BytesStart::new("gd:phoneNumber");
            element.push_attribute(("rel", "http://schemas.google.com/g/2005#other"));
            element.push_attribute(("primary", "true"));
            w.event(Event::Start(element))?;
            w.event(Event::Text(BytesText::new(phone)))?;
            w.event(Event::End(BytesEnd::new("gd:phoneNumber")))?;
        }

        w.event(Event::End(BytesEnd::new("entry")))?;
    }

    w.event(Event::End(BytesEnd::new("feed")))?;
    w.finish()
}

#[derive(Debug, Default)]
struct ResponseEntry {
    index: Option<usize>,
    status: Option<u16>,
    id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    BatchId,
    EntryId,
}

fn parse_entries(xml: &str) -> SyncResult<Vec<ResponseEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<ResponseEntry> = None;
    let mut target: Option<TextTarget> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"entry" => current = Some(ResponseEntry::default()),
                b"batch:id" if current.is_some() => target = Some(TextTarget::BatchId),
                b"id" if current.is_some() => target = Some(TextTarget::EntryId),
                b"batch:status" => {
                    if let Some(entry) = current.as_mut() {
                        entry.status = status_code(&e)?;
                    }
                }
                _ => target = None,
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"batch:status" => {
                    if let Some(entry) = current.as_mut() {
                        entry.status = status_code(&e)?;
                    }
                }
                b"batch:interrupted" => {
                    return Err(SyncError::Protocol("batch was interrupted".to_string()));
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let (Some(entry), Some(kind)) = (current.as_mut(), target.take()) {
                    let text = t.unescape().map_err(xml_error)?.trim().to_string();
                    match kind {
                        TextTarget::BatchId => entry.index = text.parse().ok(),
                        TextTarget::EntryId => entry.id = Some(text),
                    }
                }
            }
            Ok(Event::End(e)) => {
                target = None;
                if e.name().as_ref() == b"entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(entries)
}

fn status_code(element: &BytesStart<'_>) -> SyncResult<Option<u16>> {
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == b"code" {
            let value = attr.unescape_value().map_err(xml_error)?;
            return Ok(value.trim().parse().ok());
        }
    }
    Ok(None)
}

/// Parses a batch response into one result per request item, in order.
///
/// Items the response does not mention come back with status 500.
pub(crate) fn parse_response(
    xml: &str,
    items: &[BatchItem],
    operation: BatchOperation,
) -> SyncResult<Vec<BatchResult>> {
    let mut by_index: HashMap<usize, ResponseEntry> = HashMap::new();
    for entry in parse_entries(xml)? {
        if let Some(index) = entry.index {
            by_index.insert(index, entry);
        }
    }

    let results = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let contact_id = item.contact.id.clone();
            let Some(entry) = by_index.remove(&index) else {
                return BatchResult::new(contact_id, None, 500);
            };
            let status = entry.status.unwrap_or(500);
            let remote_id = match operation {
                BatchOperation::Create => entry.id.as_deref().map(remote_id_from_entry_id),
                BatchOperation::Update | BatchOperation::Delete => item.remote_id.clone(),
            };
            BatchResult::new(contact_id, remote_id, status)
        })
        .collect();
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfy_model::Contact;

    const BASE: &str = "https://www.google.com/m8/feeds/contacts/default/full";

    #[test]
    fn create_request_has_no_etag_or_id() {
        let items = vec![BatchItem::create(
            Contact::new("1")
                .with_name("Ana & Bia")
                .with_email("ana@x.com")
                .with_phone_number("555-0101"),
        )];
        let xml = build_request(BASE, &items, BatchOperation::Create).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"<batch:operation type="insert"/>"#));
        assert!(xml.contains("<batch:id>0</batch:id>"));
        assert!(xml.contains("<gd:fullName>Ana &amp; Bia</gd:fullName>"));
        assert!(xml.contains(r#"address="ana@x.com""#));
        assert!(xml.contains(">555-0101</gd:phoneNumber>"));
        assert!(!xml.contains("gd:etag"));
        assert!(!xml.contains("<id>"));
    }

    #[test]
    fn delete_request_targets_remote_entry() {
        let items = vec![
            BatchItem::targeting("rem-5", Contact::new("5")),
            BatchItem::targeting("rem-6", Contact::new("6")),
        ];
        let xml = build_request(BASE, &items, BatchOperation::Delete).unwrap();

        assert!(xml.contains(r#"<entry gd:etag="*">"#));
        assert!(xml.contains(r#"<batch:operation type="delete"/>"#));
        assert!(xml.contains(&format!("<id>{BASE}/rem-5</id>")));
        assert!(xml.contains("<batch:id>1</batch:id>"));
    }

    #[test]
    fn parses_create_response_by_batch_id() {
        let items = vec![
            BatchItem::create(Contact::new("1")),
            BatchItem::create(Contact::new("2")),
            BatchItem::create(Contact::new("3")),
        ];
        let response = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:batch="http://schemas.google.com/gdata/batch">
  <id>https://www.google.com/m8/feeds/contacts/a%40x.com/full/batch/1</id>
  <entry>
    <batch:id>1</batch:id>
    <batch:operation type="insert"/>
    <batch:status code="409" reason="Conflict"/>
  </entry>
  <entry>
    <id>http://www.google.com/m8/feeds/contacts/a%40x.com/base/7f3e</id>
    <batch:id>0</batch:id>
    <batch:operation type="insert"/>
    <batch:status code="201" reason="Created"/>
  </entry>
</feed>"#;

        let results = parse_response(response, &items, BatchOperation::Create).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].contact_id, "1");
        assert_eq!(results[0].status, 201);
        assert_eq!(results[0].remote_id.as_deref(), Some("7f3e"));
        assert_eq!(results[1].status, 409);
        assert!(results[1].remote_id.is_none());
        assert_eq!(results[2].status, 500);
    }

    #[test]
    fn update_results_keep_target_id() {
        let items = vec![BatchItem::targeting("rem-1", Contact::new("1"))];
        let response = r#"<feed><entry><batch:id>0</batch:id><batch:status code="200"/></entry></feed>"#;

        let results = parse_response(response, &items, BatchOperation::Update).unwrap();
        assert!(results[0].is_success());
        assert_eq!(results[0].remote_id.as_deref(), Some("rem-1"));
    }

    #[test]
    fn interrupted_batch_is_protocol_error() {
        let response = r#"<feed><batch:interrupted reason="bad" success="0" failures="1" parsed="1"/></feed>"#;
        let result = parse_response(response, &[], BatchOperation::Create);
        assert!(matches!(result, Err(SyncError::Protocol(_))));
    }
}
