//! Watch a remote JSON object and print every change.
//!
//! Run with: cargo run --example watch_remote -- http://localhost:3000/status '{"state":null}'
//!
//! The second argument is the baseline; only its keys are watched. Polling stops after
//! 30 polls or on the first key-compatibility failure.

use pollwatch_http::{to_snapshot, ApiClient, ClientConfig, Watcher};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: watch_remote <url> [baseline-json]"))?;
    let baseline: Value = match args.next() {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::json!({}),
    };

    let config = ClientConfig {
        request_timeout_ms: 5_000,
        ..Default::default()
    };
    let mut api = ApiClient::with_config(url, config);
    api.set_header("Accept", "application/json");

    let watcher = Watcher::new(api);
    let options = watcher.default_options().limit(30);
    let id = watcher.watch_with(
        to_snapshot(&baseline)?,
        |snapshot| println!("changed: {}", Value::Object(snapshot.clone())),
        options,
    );

    println!("Watching {} as {}", watcher.api().url(), id);
    let exit = watcher.wait(id).await?;
    println!("Stopped: {exit:?}");

    Ok(())
}
