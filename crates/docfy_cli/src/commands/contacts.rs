//! Contacts command implementation.

use crate::app::Server;
use docfy_model::Contact;
use docfy_storage::ContactStore;

/// Lists local contacts.
pub async fn run(server: &Server, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let contacts = ContactStore::find_all(server.store().as_ref()).await?;
    print!("{}", render(&contacts, format)?);
    Ok(())
}

/// Renders contacts as `text` or `json`.
pub fn render(contacts: &[Contact], format: &str) -> Result<String, Box<dyn std::error::Error>> {
    if format == "json" {
        return Ok(format!("{}\n", serde_json::to_string_pretty(contacts)?));
    }

    let mut out = String::new();
    for contact in contacts {
        out.push_str(&format!(
            "{:<24} {:<28} {:<32} {:<16} boxes={}\n",
            contact.id,
            contact.name.as_deref().unwrap_or("-"),
            contact.email.as_deref().unwrap_or("-"),
            contact.phone_number.as_deref().unwrap_or("-"),
            contact.other_ids.len()
        ));
    }
    out.push_str(&format!("{} contacts\n", contacts.len()));
    Ok(out)
}
