//! # Route Service Entry Point
//!
//! ## Usage
//! ```bash
//! # Platform config dir, platform data dir
//! route-service
//!
//! # Explicit config file
//! route-service --config ./route-service.toml
//!
//! # Throwaway database
//! REPARTO_DB_PATH=./reparto_dev.db route-service < requests.jsonl
//! ```

use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Reparto Route Service");
                println!();
                println!("Usage: route-service [OPTIONS] < requests.jsonl");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                println!();
                println!("Environment:");
                println!("  REPARTO_DB_PATH, REPARTO_MAX_CONNECTIONS, REPARTO_BUSY_TIMEOUT_MS,");
                println!("  REPARTO_RETRY_MAX_ATTEMPTS, REPARTO_RETRY_INITIAL_BACKOFF_MS, RUST_LOG");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    route_service::run(config_path).await
}
