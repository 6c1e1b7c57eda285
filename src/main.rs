//! Shaktris session runner (default binary).
//!
//! Hosts one game session and serves the line-delimited JSON protocol over TCP,
//! or over stdin/stdout with `--stdio`. `--config <file>` loads a JSON game
//! configuration; otherwise `SHAKTRIS_*` environment variables apply.

use std::sync::Arc;

use anyhow::{Context, Result};

use shaktris::adapter::{run_server, serve_lines, HostOptions, ServerConfig, SessionHost};
use shaktris::core::GameConfig;

struct Args {
    stdio: bool,
    config_path: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        stdio: false,
        config_path: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--stdio" => args.stdio = true,
            "--config" => {
                args.config_path = Some(it.next().context("--config needs a file path")?);
            }
            other => anyhow::bail!("unknown argument {:?}", other),
        }
    }
    Ok(args)
}

fn load_config(path: Option<&str>) -> Result<GameConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path))?;
            GameConfig::from_json_str(&raw)?
        }
        None => GameConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let config = load_config(args.config_path.as_deref())?;
    log::info!(
        "board {}x{}, row clear threshold {}",
        config.board_width,
        config.board_height,
        config.row_clear_threshold
    );

    let host = Arc::new(SessionHost::new(config, HostOptions::from_env())?);

    let result = if args.stdio {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        serve_lines(stdin, tokio::io::stdout(), Arc::clone(&host)).await
    } else {
        run_server(ServerConfig::from_env(), Arc::clone(&host), None).await
    };

    host.shutdown().await;
    result
}
