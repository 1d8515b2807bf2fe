//! First-Party Sets Tool
//!
//! Runs one startup cycle of the sets handler: loads the previous mapping,
//! combines the configured sources, reports the sites whose data would be
//! cleared, persists the new mapping and prints it as JSON on stdout.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `FPS_STORAGE_DIR`: Directory holding `persisted_first_party_sets.json` (optional)
//! - `FPS_PUBLIC_SETS`: Path to the public sets record stream (optional)
//! - `FPS_FLAG`: Comma-separated override set, owner first (optional)
//! - `FPS_POLICY`: Path to an enterprise policy JSON document (optional)
//! - `FPS_ENABLED`: Set to `false` to publish an empty store (default: true)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! FPS_STORAGE_DIR=/tmp/fps FPS_FLAG=https://a.test,https://b.test cargo run --bin fps_tool
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use first_party_sets::{
    parse_enterprise_policy, FirstPartySetsHandler, HandlerConfig, Site, SiteDataClearer,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fps_tool=info,first_party_sets=info".into());

    // Logs go to stderr so stdout carries only the published sets.
    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Reports the sites a browser would clear instead of clearing anything.
struct LoggingClearer;

#[async_trait]
impl SiteDataClearer for LoggingClearer {
    async fn clear_sites(&self, sites: BTreeSet<Site>) {
        info!(site_count = sites.len(), "sites to clear");
        for site in &sites {
            info!(site = %site, "clear site data");
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

async fn load_policy(path: &str) -> Result<first_party_sets::ParsedPolicySetLists, Box<dyn std::error::Error>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let document: serde_json::Value = serde_json::from_str(&contents)?;
    match parse_enterprise_policy(&document) {
        Ok(policy) => Ok(policy),
        Err(e) => {
            error!(
                path = path,
                error = %e,
                set_type = e.set_type.key(),
                index = e.index,
                "enterprise policy rejected"
            );
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting fps_tool");

    let storage_dir = non_empty_env("FPS_STORAGE_DIR").map(PathBuf::from);
    let public_sets = non_empty_env("FPS_PUBLIC_SETS");
    let flag_value = std::env::var("FPS_FLAG").unwrap_or_default();

    let mut config = HandlerConfig::from_env();
    if public_sets.is_some() {
        config.embedder_provides_public_sets = true;
    }
    if let Some(path) = non_empty_env("FPS_POLICY") {
        let policy = load_policy(&path).await?;
        info!(
            replacements = policy.replacements.len(),
            additions = policy.additions.len(),
            "enterprise policy loaded"
        );
        config = config.with_policy(policy);
    }

    let handler = FirstPartySetsHandler::new(config, Arc::new(LoggingClearer));
    handler.init(storage_dir, &flag_value)?;

    if let Some(path) = public_sets {
        handler.load_public_sets_file(path).await;
    }

    let sets = handler.wait_for_sets().await?;
    handler.wait_until_persisted().await;

    info!(
        site_count = sets.len(),
        fingerprint = %sets.fingerprint()?,
        "fps_tool complete"
    );
    println!("{}", serde_json::to_string_pretty(sets.as_ref())?);

    Ok(())
}
