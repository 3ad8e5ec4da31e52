//! Consent flow commands: print the consent URL, redeem a code.

use crate::app::Server;

/// Prints the Google consent URL.
pub fn url(server: &Server) {
    println!("{}", server.google_login().body.consent_url);
}

/// Redeems an authorization code and registers the account's box.
pub async fn register(server: &Server, code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reply = server.google_callback(Some(code)).await?;
    println!("{}", reply.body);
    Ok(())
}
