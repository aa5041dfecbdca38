// This is the entry point of the account gate bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Reddit API, settings)
// - `bot/` = Reddit-specific adapters (trigger dispatch, polling)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the submission poller

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a handful of mod.rs files that all look the same.
#[path = "bot/bot_layer.rs"]
mod bot;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::bot::poller::{PollerConfig, SubmissionPoller};
use crate::core::moderation::AccountGateService;
use crate::infra::reddit::{RedditApiClient, RedditCredentials};
use crate::infra::settings::JsonSettingsStore;
use anyhow::Context;
use std::time::Duration;

const DEFAULT_SETTINGS_PATH: &str = "gate_settings.json";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const LISTING_PAGE_SIZE: u32 = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let credentials = RedditCredentials {
        client_id: required_env("REDDIT_CLIENT_ID")?,
        client_secret: required_env("REDDIT_CLIENT_SECRET")?,
        username: required_env("REDDIT_USERNAME")?,
        password: required_env("REDDIT_PASSWORD")?,
        user_agent: std::env::var("REDDIT_USER_AGENT").unwrap_or_else(|_| {
            format!("account-gate-bot/{}", env!("CARGO_PKG_VERSION"))
        }),
    };
    let subreddit = required_env("SUBREDDIT")?;
    let settings_path = std::env::var("GATE_SETTINGS_PATH")
        .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let poll_interval = std::env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Wire the gate service to the real Reddit client and the JSON settings
    // file. The poller keeps its own handle on the client for listing reads.

    let client = RedditApiClient::new(credentials)?;
    let settings_store = JsonSettingsStore::new(&settings_path);
    let service = AccountGateService::new(client.clone(), settings_store);

    tracing::info!(
        subreddit = %subreddit,
        settings_path = %settings_path,
        poll_interval,
        "Account gate bot starting"
    );

    let poller = SubmissionPoller::new(
        client,
        service,
        PollerConfig {
            subreddit,
            interval: Duration::from_secs(poll_interval),
            page_size: LISTING_PAGE_SIZE,
        },
    );

    poller.run().await;

    Ok(())
}

fn required_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("Missing {} environment variable", key))
}
