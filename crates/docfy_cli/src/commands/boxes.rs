//! Boxes command implementation.

use crate::app::Server;
use docfy_model::ContactBox;
use docfy_storage::ContactBoxRegistry;
use serde::Serialize;

/// One registered box, without its credentials.
#[derive(Debug, Serialize)]
pub struct BoxRow {
    /// Account email.
    pub email: String,
    /// Watermark, RFC 3339.
    pub last_check: Option<String>,
    /// Whether a refresh token is stored.
    pub refreshable: bool,
}

impl From<&ContactBox> for BoxRow {
    fn from(contact_box: &ContactBox) -> Self {
        Self {
            email: contact_box.email.clone(),
            last_check: contact_box.last_check.map(|t| t.to_rfc3339()),
            refreshable: contact_box.tokens.refresh_token.is_some(),
        }
    }
}

/// Lists registered boxes.
pub async fn run(server: &Server, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let boxes = ContactBoxRegistry::find_all(server.store().as_ref()).await?;
    let main = server.watcher().reconciler().config().main_email.clone();
    print!("{}", render(&boxes, main.as_deref(), format)?);
    Ok(())
}

/// Renders boxes as `text` or `json`.
pub fn render(
    boxes: &[ContactBox],
    main_email: Option<&str>,
    format: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let rows: Vec<BoxRow> = boxes.iter().map(BoxRow::from).collect();
    if format == "json" {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&rows)?));
    }

    if rows.is_empty() {
        return Ok("No contact boxes registered.\n".to_string());
    }
    let mut out = String::new();
    for row in rows {
        let marker = if main_email == Some(row.email.as_str()) {
            " (main)"
        } else {
            ""
        };
        out.push_str(&format!(
            "{}{}\n  last check: {}\n  refreshable: {}\n",
            row.email,
            marker,
            row.last_check.as_deref().unwrap_or("never"),
            row.refreshable
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfy_testkit::contact_box;

    #[test]
    fn text_marks_main_box() {
        let boxes = vec![contact_box("main@x.com"), contact_box("a@x.com")];
        let text = render(&boxes, Some("main@x.com"), "text").unwrap();

        assert!(text.contains("main@x.com (main)"));
        assert!(text.contains("last check: never"));
        assert!(!text.contains("a@x.com (main)"));
    }

    #[test]
    fn json_omits_tokens() {
        let boxes = vec![contact_box("a@x.com")];
        let json = render(&boxes, None, "json").unwrap();

        assert!(json.contains("\"email\": \"a@x.com\""));
        assert!(!json.contains("token-"));
    }

    #[test]
    fn empty_registry() {
        assert_eq!(render(&[], None, "text").unwrap(), "No contact boxes registered.\n");
    }
}
