//! Writes generated entities through the lock-aware client over in-memory
//! collaborators and reports how the write was split.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use cachelock_client::memory::{MemoryCache, MemoryStore};
use cachelock_client::telemetry::init_tracing;
use cachelock_client::{Client, ClientConfig, WriteContext};
use cachelock_core::{Key, Value};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "put-demo", about = "Batched lock-aware write over in-memory backends")]
struct Args {
    /// Number of entities to write.
    #[arg(long, env = "CACHELOCK_ENTITIES", default_value_t = 1200)]
    entities: usize,

    /// Keys accepted per store call.
    #[arg(long, env = "CACHELOCK_STORE_LIMIT", default_value_t = 500)]
    store_limit: usize,

    /// Optional JSON client config file.
    #[arg(long, env = "CACHELOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "CACHELOCK_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let config = match &args.config {
        Some(path) => ClientConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ClientConfig::default(),
    };

    let store = Arc::new(MemoryStore::new().with_limit(args.store_limit));
    let cache = Arc::new(MemoryCache::new());
    let client = Client::builder(store.clone(), cache.clone())
        .config(config)
        .build()?;

    let keys: Vec<Key> = (0..args.entities)
        .map(|i| Key::named("DemoEntity", format!("entity-{i}")))
        .collect();
    let values: Vec<Value> = (0..args.entities)
        .map(|i| Value::from(serde_json::json!({ "seq": i, "label": format!("entity-{i}") })))
        .collect();

    let started = Instant::now();
    let written = client.put_multi(&WriteContext::new(), &keys, &values).await?;
    let elapsed = started.elapsed();

    tracing::info!(
        written = written.len(),
        store_calls = store.call_sizes().len(),
        batch_size = client.batch_size(),
        locks_left = cache.len(),
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "demo write complete"
    );
    Ok(())
}
