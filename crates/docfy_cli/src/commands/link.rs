//! Link command implementation.

use crate::app::Server;

/// Stamps a box's existing record ids onto stored contacts.
pub async fn run(server: &Server, box_email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reply = server.link_box(box_email).await?;
    println!(
        "{} stored contacts linked to {}",
        reply.body.linked, reply.body.box_email
    );
    Ok(())
}
