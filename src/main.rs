use std::env;
use std::process::ExitCode;

use serde::Serialize;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

use trading_bots_storage::config::Config;
use trading_bots_storage::{BotStorage, Fields, FileBotStorage};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

const USAGE: &str = "usage: trading-bots-storage [--config=<path>] <command>

commands:
  list                          list registered bots
  show <id>                     show identity, config and state of a bot
  active <exchange> <pair>      show the running bot for an exchange and pair
  put <json>                    register a bot from a JSON object
  delete <id>                   delete a bot
  set-status <id> <status>      replace the status of a bot
  set-state <id> <json>         merge a JSON object into the bot state
  set-config <id> <json>        merge a JSON object into the bot config";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

fn command_args() -> Vec<String> {
    env::args()
        .skip(1)
        .filter(|arg| !arg.starts_with("--config="))
        .collect()
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses a CLI argument as a JSON object.
fn parse_fields(raw: &str) -> Result<Fields, String> {
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn run(storage: &FileBotStorage, args: &[String]) -> Result<(), String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["list"] => {
            let bots = storage.get_bots_list().await.map_err(|e| e.to_string())?;
            print_json(&bots)
        }
        ["show", id] => {
            let record = storage.get_bot_by_id(id).await.map_err(|e| e.to_string())?;
            print_json(&record)
        }
        ["active", exchange, pair] => {
            let record = storage
                .get_active_bot_by_exchange_and_pair(exchange, pair)
                .await
                .map_err(|e| e.to_string())?;
            print_json(&record)
        }
        ["put", payload] => {
            let payload = parse_fields(payload)?;
            let id = storage.put_bot(&payload).await.map_err(|e| e.to_string())?;
            info!(bot_id = %id, "Bot registered");
            Ok(())
        }
        ["delete", id] => {
            storage.delete_bot(id).await.map_err(|e| e.to_string())?;
            info!(bot_id = %id, "Bot deleted");
            Ok(())
        }
        ["set-status", id, status] => {
            storage
                .update_bot_status(id, status)
                .await
                .map_err(|e| e.to_string())?;
            info!(bot_id = %id, status = %status, "Bot status updated");
            Ok(())
        }
        ["set-state", id, patch] => {
            let patch = parse_fields(patch)?;
            storage
                .update_bot_state(id, &patch)
                .await
                .map_err(|e| e.to_string())
        }
        ["set-config", id, patch] => {
            let patch = parse_fields(patch)?;
            storage
                .update_bot_config(id, &patch)
                .await
                .map_err(|e| e.to_string())
        }
        _ => Err(USAGE.to_string()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = parse_config_path();
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.app.log_level.as_deref());

    let storage = match FileBotStorage::create(&config.storage.dir).await {
        Ok(storage) => storage,
        Err(e) => {
            error!(error = %e, dir = %config.storage.dir, "Failed to open bot storage");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&storage, &command_args()).await;
    let _ = storage.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(app = %config.app.name, "{}", e);
            ExitCode::FAILURE
        }
    }
}
