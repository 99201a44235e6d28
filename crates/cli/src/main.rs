use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use council_stream::{ConnectionController, StreamConfig};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

use render::Printer;

const COUNCIL_DIR: &str = ".council";
const CONFIG_FILE: &str = "config.toml";

#[derive(Parser)]
#[command(name = "council-watch")]
#[command(about = "Follow a live council session from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration to .council/config.toml
    Init,
    /// Stream a session until it completes or gives up
    Watch {
        session_id: String,

        #[arg(long)]
        base_url: Option<String>,

        /// Open authorization URLs in the browser
        #[arg(long)]
        open_browser: bool,

        /// Manual reconnect rounds once automatic retries are exhausted
        #[arg(long, default_value_t = 0)]
        retry_rounds: u32,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct WatchConfig {
    #[serde(default)]
    stream: StreamConfig,
    #[serde(default)]
    display: DisplayConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct DisplayConfig {
    timestamps: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { timestamps: true }
    }
}

impl WatchConfig {
    async fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(COUNCIL_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    async fn write(&self, dir: &Path) -> Result<()> {
        let council_dir = dir.join(COUNCIL_DIR);
        tokio::fs::create_dir_all(&council_dir).await?;
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(council_dir.join(CONFIG_FILE), content).await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init => init(&cwd).await,
        Commands::Watch {
            session_id,
            base_url,
            open_browser,
            retry_rounds,
            json,
        } => {
            let mut config = WatchConfig::load(&cwd).await?;
            if let Some(base_url) = base_url {
                config.stream.base_url = base_url;
            }
            init_tracing();
            watch(&session_id, config, open_browser, retry_rounds, json).await
        }
        Commands::Config => {
            let config = WatchConfig::load(&cwd).await?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn init(cwd: &Path) -> Result<()> {
    let config_path = cwd.join(COUNCIL_DIR).join(CONFIG_FILE);
    if config_path.exists() {
        println!("Configuration already exists at {}", config_path.display());
        return Ok(());
    }

    WatchConfig::default()
        .write(cwd)
        .await
        .context("Failed to write configuration")?;
    println!("Wrote {}", config_path.display());
    Ok(())
}

async fn watch(
    session_id: &str,
    config: WatchConfig,
    open_browser: bool,
    mut retry_rounds: u32,
    json: bool,
) -> Result<()> {
    config
        .stream
        .validate()
        .context("Invalid stream configuration")?;

    tracing::info!(
        session_id = %session_id,
        url = %config.stream.session_url(session_id),
        "Watching session"
    );

    let mut controller = ConnectionController::new(config.stream.clone());
    let mut rx = controller.subscribe();
    let mut printer = Printer::new(config.display.timestamps);

    controller.start(session_id);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();

                let rendered = printer.render(&snapshot);
                for line in &rendered.lines {
                    println!("{}", line);
                }
                if let Some(request) = rendered.new_authorization {
                    if open_browser {
                        if let Err(e) = open::that(&request.authorization_url) {
                            tracing::warn!("Failed to open browser: {}", e);
                        }
                    }
                }

                if snapshot.is_terminal() {
                    if !controller.store().is_completed() && retry_rounds > 0 {
                        retry_rounds -= 1;
                        tracing::info!(remaining = retry_rounds, "Retrying session stream");
                        controller.reconnect();
                        continue;
                    }
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Interrupted");
                controller.stop();
                break;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "council_stream=info,council_watch=info".into()),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = WatchConfig::load(temp_dir.path()).await.unwrap();
        assert_eq!(config, WatchConfig::default());
        assert!(config.display.timestamps);
    }

    #[tokio::test]
    async fn test_config_write_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = WatchConfig::default();
        config.stream.base_url = "https://council.example".to_string();
        config.stream.max_attempts = 3;
        config.write(temp_dir.path()).await.unwrap();

        let loaded = WatchConfig::load(temp_dir.path()).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_partial_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(COUNCIL_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(CONFIG_FILE),
            "[stream]\nbase_url = \"http://10.0.0.2:8000\"\n",
        )
        .unwrap();

        let loaded = WatchConfig::load(temp_dir.path()).await.unwrap();
        assert_eq!(loaded.stream.base_url, "http://10.0.0.2:8000");
        assert_eq!(loaded.stream.max_attempts, 5);
        assert!(loaded.display.timestamps);
    }

    #[tokio::test]
    async fn test_invalid_config_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(COUNCIL_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILE), "[stream\n").unwrap();

        assert!(WatchConfig::load(temp_dir.path()).await.is_err());
    }
}
