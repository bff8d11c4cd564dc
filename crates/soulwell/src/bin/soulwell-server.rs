//! Runs a Soulwell server.
//!
//! `SOULWELL_CONFIG` names an optional JSON config file and
//! `SOULWELL_BIND` overrides its listen address. Log filtering follows
//! `RUST_LOG` and defaults to `info`.

use soulwell::prelude::*;

#[tokio::main]
async fn main() -> Result<(), SoulwellError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = match std::env::var("SOULWELL_CONFIG") {
        Ok(path) => {
            tracing::info!(%path, "loading config");
            ServerConfig::load(&path)?
        }
        Err(_) => ServerConfig::default(),
    };
    if let Ok(bind) = std::env::var("SOULWELL_BIND") {
        config.bind = bind;
    }

    let server = SoulwellServer::builder().config(config).build().await?;
    server.run().await
}
