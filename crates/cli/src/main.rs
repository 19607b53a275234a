use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use orchestrator::collaborators::simulated::generate_server_keys;
use orchestrator::{missing_key_files, OrchestratorConfig, KEY_FILES};
use serde::{Deserialize, Serialize};
use server::{create_router, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_FILE: &str = "demo.toml";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5002;

#[derive(Parser)]
#[command(name = "kemtls-demo")]
#[command(about = "Live post-quantum OIDC + KEMTLS demonstration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ./demo.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo server (default)
    Serve(ServeArgs),
    /// Check that key files exist and the port is free
    Check,
    /// Write simulated server key files
    GenerateKeys {
        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
struct ServeArgs {
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    keys_dir: Option<PathBuf>,

    /// Disable presentation delays between demo steps
    #[arg(long)]
    no_pacing: bool,

    /// Built frontend to serve alongside the API
    #[arg(long)]
    app_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DemoConfig {
    server: ServerConfig,
    #[serde(flatten)]
    orchestrator: OrchestratorConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: String,
    port: u16,
    app_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            app_dir: None,
        }
    }
}

impl DemoConfig {
    /// Command-line flags win over the config file.
    fn apply(&mut self, args: &ServeArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(dir) = &args.keys_dir {
            self.orchestrator.keys.dir = dir.clone();
        }
        if let Some(dir) = &args.app_dir {
            self.server.app_dir = Some(dir.clone());
        }
        if args.no_pacing {
            self.orchestrator.pacing.scale = 0.0;
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Load the config file. An explicitly given file must exist; the default
/// one is optional.
async fn load_config(explicit: Option<&Path>) -> Result<DemoConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(CONFIG_FILE);
            if !path.exists() {
                return Ok(DemoConfig::default());
            }
            path
        }
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Some(Commands::Serve(args)) => {
            config.apply(&args);
            serve(config).await
        }
        Some(Commands::Check) => {
            config.apply(&cli.serve);
            check(&config).await
        }
        Some(Commands::GenerateKeys { force }) => {
            config.apply(&cli.serve);
            generate_keys(&config, force).await
        }
        None => {
            config.apply(&cli.serve);
            serve(config).await
        }
    }
}

async fn serve(config: DemoConfig) -> Result<()> {
    init_tracing();

    let missing = missing_key_files(&config.orchestrator.keys.dir);
    if !missing.is_empty() {
        tracing::warn!(
            keys_dir = %config.orchestrator.keys.dir.display(),
            missing = missing.len(),
            "Server keys not found; runs will fail until `kemtls-demo generate-keys` is run"
        );
    }

    let address = config.address();
    let mut state = AppState::new(config.orchestrator);
    if let Some(app_dir) = config.server.app_dir {
        state = state.with_app_dir(app_dir);
    }
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    let local = listener.local_addr()?;

    println!();
    println!("KEMTLS Demo Server");
    println!("════════════════════════════════════════");
    println!();
    println!("  WebSocket:   ws://localhost:{}/ws", local.port());
    println!("  Health:      http://localhost:{}/health", local.port());
    println!("  OpenAPI:     http://localhost:{}/api/openapi.json", local.port());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    tracing::info!(address = %local, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn check(config: &DemoConfig) -> Result<()> {
    let keys_dir = &config.orchestrator.keys.dir;
    let missing = missing_key_files(keys_dir);

    println!();
    println!("Keys ({}):", keys_dir.display());
    for name in KEY_FILES {
        let path = keys_dir.join(name);
        let mark = if missing.contains(&path) { "✗" } else { "✓" };
        println!("  {} {}", mark, name);
    }

    let address = config.address();
    println!();
    match tokio::net::TcpListener::bind(&address).await {
        Ok(_) => println!("Port: ✓ {} is available", address),
        Err(e) => println!("Port: ⚠ {} is not available ({})", address, e),
    }
    println!();

    if !missing.is_empty() {
        bail!(
            "{} key file(s) missing; run `kemtls-demo generate-keys`",
            missing.len()
        );
    }

    println!("Ready to run the demo.");
    Ok(())
}

async fn generate_keys(config: &DemoConfig, force: bool) -> Result<()> {
    let keys_dir = &config.orchestrator.keys.dir;
    let existing = KEY_FILES.len() - missing_key_files(keys_dir).len();
    if existing > 0 && !force {
        bail!(
            "{} already contains key files; pass --force to overwrite",
            keys_dir.display()
        );
    }

    generate_server_keys()
        .write(keys_dir)
        .await
        .with_context(|| format!("Failed to write keys to {}", keys_dir.display()))?;

    println!("Wrote simulated server keys to {}", keys_dir.display());
    println!("These are hash-based placeholders, not post-quantum key pairs.");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kemtls_demo=info,server=info,orchestrator=info,websocket=info,tower_http=info"
                    .into()
            }),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config: DemoConfig = toml::from_str("").unwrap();
        assert_eq!(config.address(), "0.0.0.0:5002");
        assert_eq!(config.orchestrator.keys.dir, PathBuf::from("keys"));
        assert_eq!(config.orchestrator.pacing.scale, 1.0);
    }

    #[test]
    fn test_config_sections() {
        let config: DemoConfig = toml::from_str(
            r#"
            [server]
            port = 6000

            [keys]
            dir = "/srv/keys"

            [benchmarks]
            timeout_secs = 10.0
            iterations = 5

            [benchmarks.protocol]
            program = "./bench"
            args = ["--out", "{output}"]

            [pacing]
            scale = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.address(), "0.0.0.0:6000");
        assert_eq!(config.orchestrator.keys.dir, PathBuf::from("/srv/keys"));
        assert_eq!(config.orchestrator.benchmarks.iterations, 5);
        assert_eq!(config.orchestrator.benchmarks.protocol.program, "./bench");
        assert_eq!(config.orchestrator.benchmarks.end_to_end.program, "python3");
        assert_eq!(config.orchestrator.pacing.scale, 0.25);
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = DemoConfig::default();
        config.apply(&ServeArgs {
            port: Some(7000),
            host: Some("127.0.0.1".to_string()),
            keys_dir: Some(PathBuf::from("other-keys")),
            no_pacing: true,
            app_dir: None,
        });

        assert_eq!(config.address(), "127.0.0.1:7000");
        assert_eq!(config.orchestrator.keys.dir, PathBuf::from("other-keys"));
        assert_eq!(config.orchestrator.pacing.scale, 0.0);
    }

    #[tokio::test]
    async fn test_explicit_config_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.toml");
        let result = load_config(Some(path.as_path())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_generate_keys_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = DemoConfig::default();
        config.orchestrator.keys.dir = temp_dir.path().join("keys");

        generate_keys(&config, false).await.unwrap();
        assert!(missing_key_files(&config.orchestrator.keys.dir).is_empty());

        assert!(generate_keys(&config, false).await.is_err());
        generate_keys(&config, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_fails_without_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = DemoConfig::default();
        config.orchestrator.keys.dir = temp_dir.path().join("keys");
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;

        assert!(check(&config).await.is_err());

        generate_keys(&config, false).await.unwrap();
        check(&config).await.unwrap();
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["kemtls-demo", "generate-keys", "--force"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::GenerateKeys { force: true })));

        let cli = Cli::try_parse_from(["kemtls-demo", "--port", "9000", "--no-pacing"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.port, Some(9000));
        assert!(cli.serve.no_pacing);
    }
}
