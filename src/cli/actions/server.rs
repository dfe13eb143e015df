use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::fonkodo::new;
use anyhow::Result;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            ttl_seconds,
        } => {
            // Fail early on an unparseable connection string
            let dsn = Url::parse(&dsn)?;

            new(port, dsn.to_string(), ttl_seconds, globals).await?;
        }
    }

    Ok(())
}
