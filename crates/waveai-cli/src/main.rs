use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use waveai_core::{CandidateCredentials, Persona, ReqwestTransport};
use waveai_gateway::GatewayServer;

mod config;

use config::WaveConfig;

#[derive(Parser)]
#[command(name = "waveai")]
#[command(version)]
#[command(about = "WaveAI — persona assistants with LLM provider fallback")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve,

    /// Send a one-shot message to an assistant
    Ask {
        /// The message to send
        message: String,

        /// Assistant to answer (alex, lina, marco, sofia, kai)
        #[arg(short, long, default_value = "kai")]
        agent: String,

        /// Extra credential for this request, as alias=secret (repeatable)
        #[arg(short, long = "key", value_parser = parse_key)]
        keys: Vec<(String, String)>,

        /// Print the full resolution as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize config directory and default config
    Init,

    /// Show current configuration (keys masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; stdout is reserved for answers
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Serve => cmd_serve(&cli.config).await,
        Commands::Ask {
            message,
            agent,
            keys,
            json,
        } => cmd_ask(&cli.config, &message, &agent, keys, json).await,
    }
}

fn parse_key(s: &str) -> Result<(String, String), String> {
    let (alias, secret) = s
        .split_once('=')
        .ok_or_else(|| format!("expected alias=secret, got '{}'", s))?;
    let alias = alias.trim();
    if alias.is_empty() {
        return Err("credential alias must not be empty".to_string());
    }
    Ok((alias.to_string(), secret.to_string()))
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config::default_config_path();
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("WaveAI initialized at {}", config_dir.display());
    println!(
        "Export OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY or edit {}.",
        config_path.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = WaveConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = WaveConfig::load(config_path)?;
    let bind = cfg.bind_addr()?;

    let transport = Arc::new(ReqwestTransport::new()?);
    let resolver = Arc::new(cfg.build_resolver(transport.clone()));
    let providers: Vec<String> = resolver.providers().map(|k| k.to_string()).collect();
    info!("Provider order: {}", providers.join(" → "));
    for kind in resolver.providers() {
        if !resolver.has_server_credential(kind) {
            info!("No default key for {}, callers must supply one", kind);
        }
    }

    let server = GatewayServer::new(bind, resolver, transport)
        .with_openai_base_url(cfg.openai_base_url());

    tokio::select! {
        result = server.run() => result?,
        _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }
    Ok(())
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    message: &str,
    agent: &str,
    keys: Vec<(String, String)>,
    json: bool,
) -> Result<()> {
    let cfg = WaveConfig::load(config_path)?;

    if Persona::parse(agent).is_none() {
        warn!("Unknown agent '{}', answering as {}", agent, Persona::default());
    }

    let transport = Arc::new(ReqwestTransport::new()?);
    let resolver = cfg.build_resolver(transport);
    let credentials: CandidateCredentials = keys.into_iter().collect::<IndexMap<_, _>>();

    let resolution = resolver.resolve(message, agent, &credentials).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        println!("{}", resolution.labelled_text());
        let attempted: Vec<String> =
            resolution.attempted.iter().map(|k| k.to_string()).collect();
        eprintln!(
            "[{} via {}, attempted: {}]",
            resolution.persona,
            resolution.provider_used,
            if attempted.is_empty() {
                "none".to_string()
            } else {
                attempted.join(", ")
            }
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(
            parse_key("openai_key=sk-abc=def").unwrap(),
            ("openai_key".to_string(), "sk-abc=def".to_string())
        );
        assert!(parse_key("no-separator").is_err());
        assert!(parse_key("=secret").is_err());
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from([
            "waveai",
            "ask",
            "bonjour",
            "--agent",
            "lina",
            "--key",
            "gpt=sk-1",
            "-k",
            "claude=sk-ant-2",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask { message, agent, keys, json } => {
                assert_eq!(message, "bonjour");
                assert_eq!(agent, "lina");
                assert_eq!(keys.len(), 2);
                assert_eq!(keys[1].0, "claude");
                assert!(!json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli =
            Cli::try_parse_from(["waveai", "serve", "--debug", "--config", "/tmp/w.toml"])
                .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/w.toml")));
        assert!(matches!(cli.command, Commands::Serve));
    }
}
