//! User administration.

use crate::app::Server;
use docfy_server::Credentials;

/// Creates an API user.
pub async fn add(
    server: &Server,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    server
        .register(Credentials::new(username, password))
        .await?;
    println!("User {} created.", username.to_lowercase());
    Ok(())
}
