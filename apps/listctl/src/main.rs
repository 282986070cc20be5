use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use client_core::{
    config::normalize_base_url, load_settings, ApiClient, FetchOutcome, HttpPageFetcher,
    ListController,
};
use serde_json::{json, Value};
use shared::domain::{Filters, Resource};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(about = "List devices, fields, collection sessions or raw data from the monitoring API")]
struct Args {
    /// One of: devices, fields, collection-sessions, raw-data
    resource: Resource,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    page_size: Option<u32>,
    /// Repeatable `key=value` filter; scalar JSON values (`true`, `12`) keep their type.
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, Value)>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
}

fn parse_filter(raw: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected key=value, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("filter key must not be empty in '{raw}'"));
    }
    let value = match serde_json::from_str::<Value>(value.trim()) {
        Ok(parsed @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => parsed,
        _ => Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(base_url) = &args.base_url {
        settings.api_base_url = normalize_base_url(base_url);
    }
    if let Some(token) = args.token {
        settings.token = Some(token);
    }
    if let Some(page_size) = args.page_size {
        settings.page_size = page_size;
    }
    if args.page == 0 {
        bail!("--page must be 1 or greater");
    }

    let filters: Filters = args.filters.into_iter().collect();
    for key in filters.keys() {
        if !args.resource.known_filters().contains(&key.as_str()) {
            warn!(resource = %args.resource, "filter '{key}' is not recognized by this endpoint");
        }
    }

    let client = Arc::new(ApiClient::from_settings(&settings)?);
    let options = settings
        .list_options()
        .with_auto_fetch(false)
        .with_default_filters(filters)
        .on_error(|err| {
            if err.requires_reauth() {
                warn!("api token rejected; set API_TOKEN or pass --token");
            }
        });
    let controller = ListController::new(HttpPageFetcher::new(client, args.resource), options);

    let outcome = controller.fetch_data(Some(args.page), None).await;
    let state = controller.snapshot();
    if outcome != FetchOutcome::Applied {
        let message = state
            .error
            .unwrap_or_else(|| "request was not applied".to_string());
        bail!("failed to list {}: {message}", args.resource);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "resource": args.resource,
            "page": state.current_page,
            "page_size": state.page_size,
            "total": state.total,
            "total_pages": state.total_pages(),
            "items": state.data,
        }))?
    );

    Ok(())
}
