//! # remote_register
//!
//! Registers every version of a subject from a running Confluent-compatible
//! schema registry and prints the resulting cache.
//!
//! Run with:
//! ```sh
//! REGISTRY_URL=http://localhost:8081 cargo run --bin remote_register -- orders.created
//! ```

use anyhow::{Context, Result};
use avrosync_core::{json_decoder, Version};
use avrosync_observability::{init_tracing, LogConfig};
use avrosync_registry::{Registry, RegistryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(&LogConfig {
        honor_env: true,
        ..LogConfig::default()
    })?;

    let subject = std::env::args()
        .nth(1)
        .context("usage: remote_register <subject>")?;
    let url = std::env::var("REGISTRY_URL").unwrap_or_else(|_| "http://localhost:8081".into());

    let registry = Registry::connect(&RegistryConfig::new(&url))?;
    registry
        .register(&subject, Version::All, Some(json_decoder::<serde_json::Value>()))
        .await
        .with_context(|| format!("registering {subject} from {url}"))?;

    let latest = registry.with_latest_schema(&subject)?;
    info!(subject = %subject, version = latest.version(), id = latest.id(), "latest version");
    println!("{}", registry.cache().render_table());
    println!("{}", latest.schema());
    Ok(())
}
