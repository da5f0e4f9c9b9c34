use std::path::PathBuf;

use anyhow::{Context as _, Result};
use carelink_federation::{FederationConfig, FederationHub};
use carelink_protocol::{ContextType, ProviderType};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod handler;

use handler::FederationHandler;

#[derive(Parser)]
#[command(name = "carelink")]
#[command(about = "Federate clinical context between providers and AI models", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ~/.carelink/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `carelink_federation=debug`
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show engine counters
    Status,

    /// List registered providers
    Providers(ProvidersArgs),

    /// Request context from one provider
    Context(ContextArgs),

    /// Aggregate a patient's context and transform it for an AI model
    Patient(PatientArgs),

    /// Replicate context from one provider to another
    Sync(SyncArgs),

    /// Push contexts from a JSON file into a provider
    Update(UpdateArgs),
}

#[derive(Args)]
struct ProvidersArgs {
    /// Only list providers of this type
    #[arg(long = "type")]
    provider_type: Option<ProviderType>,
}

#[derive(Args)]
struct ContextArgs {
    /// Provider id
    provider: String,

    /// Context types, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    types: Vec<ContextType>,

    /// Restrict to one patient
    #[arg(long)]
    patient: Option<String>,

    /// Adapter-specific filter as key=value; repeatable
    #[arg(long = "filter")]
    filters: Vec<String>,
}

#[derive(Args)]
struct PatientArgs {
    /// Patient id
    patient: String,

    /// Output format: clinical-summary, fhir-bundle or hl7-message
    #[arg(long, default_value = "clinical-summary")]
    format: String,

    /// Fail if any provider fails instead of skipping it
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct SyncArgs {
    /// Source provider id
    source: String,

    /// Target provider id
    target: String,

    /// Context types, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    types: Vec<ContextType>,
}

#[derive(Args)]
struct UpdateArgs {
    /// Provider id
    provider: String,

    /// JSON file holding an array of contexts
    #[arg(long)]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_ref()).await?;
    let hub = FederationHub::new(config).await?;
    let handler = FederationHandler::new(hub);

    let output = match cli.command {
        Commands::Status => handler.status().await?,
        Commands::Providers(args) => handler.providers(args.provider_type).await?,
        Commands::Context(args) => {
            let filters = handler::build_filters(args.patient, &args.filters)?;
            handler.context(&args.provider, &args.types, filters).await?
        }
        Commands::Patient(args) => {
            handler
                .patient(&args.patient, &args.format, args.strict)
                .await?
        }
        Commands::Sync(args) => handler.sync(&args.source, &args.target, &args.types).await?,
        Commands::Update(args) => {
            let raw = tokio::fs::read_to_string(&args.file)
                .await
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            handler.update(&args.provider, &raw).await?
        }
    };

    println!("{output}");
    Ok(())
}

async fn load_config(explicit: Option<&PathBuf>) -> Result<FederationConfig> {
    if let Some(path) = explicit {
        return FederationConfig::load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()));
    }

    let default_path = dirs::home_dir().map(|home| home.join(".carelink").join("config.toml"));
    match default_path {
        Some(path) if path.exists() => {
            debug!("Loading configuration from {}", path.display());
            FederationConfig::load(&path)
                .await
                .with_context(|| format!("failed to load {}", path.display()))
        }
        _ => Ok(FederationConfig::default()),
    }
}
