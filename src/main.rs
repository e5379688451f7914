//! Disk Store - command-line access to a store directory
//!
//! Opens the store configured by the `DISK_STORE_*` environment variables
//! and runs a single command against it.

use std::env;

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use disk_store::{DiskStore, StoreConfig};

const USAGE: &str = "usage: disk_store <keys | get KEY | set KEY VALUE [TTL] | del KEY | reset | cleancache | stats>";

/// A single invocation of the tool.
#[derive(Debug, PartialEq)]
enum Command {
    Keys,
    Get { key: String },
    Set { key: String, value: Value, ttl: Option<i64> },
    Del { key: String },
    Reset,
    CleanCache,
    Stats,
}

impl Command {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            ["keys"] => Command::Keys,
            ["get", key] => Command::Get { key: key.to_string() },
            ["set", key, value] => Command::Set {
                key: key.to_string(),
                value: parse_value(value),
                ttl: None,
            },
            ["set", key, value, ttl] => Command::Set {
                key: key.to_string(),
                value: parse_value(value),
                ttl: Some(ttl.parse().with_context(|| format!("invalid TTL {:?}", ttl))?),
            },
            ["del", key] => Command::Del { key: key.to_string() },
            ["reset"] => Command::Reset,
            ["cleancache"] => Command::CleanCache,
            ["stats"] => Command::Stats,
            _ => bail!(USAGE),
        };
        Ok(command)
    }
}

/// JSON when the argument parses as JSON, a plain string otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "disk_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = StoreConfig::from_env();
    info!(
        "Configuration loaded: path={}, ttl={}s, max_size={}, compress={}",
        config.path.display(),
        config.ttl,
        config.max_size,
        config.compress
    );

    let mut store = DiskStore::open(config)
        .await
        .context("failed to open store")?;

    match command {
        Command::Keys => {
            let mut keys = store.keys();
            keys.sort();
            for key in keys {
                println!("{}", key);
            }
        }
        Command::Get { key } => match store.get::<Value>(&key).await? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Command::Set { key, value, ttl } => {
            if !store.is_cacheable_value(&value) {
                bail!("refusing to cache a null value for {:?}", key);
            }
            store.set(&key, value, ttl).await?;
            println!("OK");
        }
        Command::Del { key } => {
            store.del(&key).await?;
            println!("OK");
        }
        Command::Reset => {
            store.reset(None).await?;
            println!("OK");
        }
        Command::CleanCache => {
            store.clean_cache().await?;
            println!("OK");
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_set_with_ttl() {
        let command = Command::parse(&args(&["set", "k", "{\"a\":1}", "-1"])).unwrap();
        assert_eq!(
            command,
            Command::Set {
                key: "k".to_string(),
                value: serde_json::json!({"a": 1}),
                ttl: Some(-1),
            }
        );
    }

    #[test]
    fn test_parse_plain_string_value() {
        let command = Command::parse(&args(&["set", "k", "hello world"])).unwrap();
        assert_eq!(
            command,
            Command::Set {
                key: "k".to_string(),
                value: Value::String("hello world".to_string()),
                ttl: None,
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(Command::parse(&args(&[])).is_err());
        assert!(Command::parse(&args(&["get"])).is_err());
        assert!(Command::parse(&args(&["set", "k", "v", "soon"])).is_err());
        assert_eq!(Command::parse(&args(&["cleancache"])).unwrap(), Command::CleanCache);
    }
}
