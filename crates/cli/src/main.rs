//! wsmeta
//!
//! Downloads the WSDL/XSD/Policy metadata of a service, or re-reads local
//! metadata files, and saves it as a self-consistent set of files.
//!
//! ## Usage
//!
//! ```bash
//! # Everything reachable from a service endpoint
//! wsmeta fetch https://host/Orders.svc --out ./metadata
//!
//! # Re-save local files under namespace-based names
//! wsmeta fetch 'contracts/*.wsdl' 'contracts/*.xsd' --out ./metadata
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG=info` to follow the traversal.

mod providers;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use providers::{AcceptInvalidCertificates, FixedCertificate, FixedCredentials};
use std::path::PathBuf;
use std::sync::Arc;
use wsmeta_loader::{DocumentGraphLoader, EntryPoint, ResolverConfig};
use wsmeta_location::{parse_location, CanonicalLocation};
use wsmeta_saver::{NamingStrategy, SaveOptions};
use wsmeta_transport::{
    CancellationSignal, ClientCertificate, EndpointResolver, NetworkCredential,
};

#[derive(Parser)]
#[command(name = "wsmeta", version, about = "Download and save web service metadata")]
struct Cli {
    /// Configuration file (TOML); defaults to $WSMETA_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a service address or local files and save the documents
    Fetch(FetchArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Service address, or one or more local file glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output directory
    #[arg(long, short)]
    out: PathBuf,

    /// File naming; overrides the configuration
    #[arg(long, value_enum)]
    naming: Option<Naming>,

    /// User name sent when the service asks for credentials
    #[arg(long)]
    user: Option<String>,

    #[arg(long, requires = "user")]
    password: Option<String>,

    /// PEM file with a client certificate and its private key
    #[arg(long)]
    client_cert: Option<PathBuf>,

    /// Accept invalid server certificates
    #[arg(long)]
    insecure: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Naming {
    Namespace,
    SourceFile,
}

impl From<Naming> for NamingStrategy {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::Namespace => Self::ByNamespace,
            Naming::SourceFile => Self::BySourceFileName,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = ResolverConfig::discover(cli.config.as_deref())
        .context("failed to read configuration")?;

    match cli.command {
        Command::Fetch(args) => fetch(args, config).await,
    }
}

async fn fetch(args: FetchArgs, config: ResolverConfig) -> Result<()> {
    let entry = entry_point(&args.inputs)?;
    let resolver = build_resolver(&args, &config)?;

    let cancellation = resolver.cancellation().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, cancelling");
            cancellation.cancel();
        }
    });

    let loader = DocumentGraphLoader::from_config(&config, resolver);
    let outcome = loader
        .load(entry)
        .await
        .with_context(|| format!("failed to load metadata from {}", args.inputs.join(" ")))?;
    for error in &outcome.errors {
        log::warn!("{error}");
    }
    log::info!("loaded {} documents", outcome.graph.len());

    let options = SaveOptions {
        naming: args.naming.map_or(config.naming, Into::into),
        ..SaveOptions::default()
    };
    let plan = wsmeta_saver::plan(&outcome.graph, &args.out, &options);
    for warning in &plan.warnings {
        log::warn!("{warning}");
    }
    let written = plan
        .write()
        .with_context(|| format!("failed to save metadata to {}", args.out.display()))?;

    for path in &written {
        println!("{}", path.display());
    }
    if let Some(root) = plan.root_path() {
        eprintln!("root document: {}", root.display());
    }
    Ok(())
}

/// A single input that parses as a URL is a service address; anything else
/// is a list of file patterns.
fn entry_point(inputs: &[String]) -> Result<EntryPoint> {
    let remote: Vec<&String> = inputs
        .iter()
        .filter(|input| matches!(parse_location(input), Some(CanonicalLocation::Url(_))))
        .collect();
    match (remote.as_slice(), inputs.len()) {
        ([], _) => Ok(EntryPoint::Files(inputs.to_vec())),
        ([address], 1) => Ok(EntryPoint::Uri((*address).clone())),
        _ => bail!("a service address cannot be combined with other inputs"),
    }
}

fn build_resolver(args: &FetchArgs, config: &ResolverConfig) -> Result<EndpointResolver> {
    let mut resolver = config
        .endpoint_resolver()
        .context("failed to initialise the HTTP client")?
        .with_cancellation(CancellationSignal::new());

    if let Some(user) = &args.user {
        let credential = NetworkCredential::new(user, args.password.clone().unwrap_or_default());
        resolver = resolver.with_credentials(Arc::new(FixedCredentials(credential)));
    }
    if let Some(path) = &args.client_cert {
        let pem = std::fs::read(path)
            .with_context(|| format!("failed to read client certificate {}", path.display()))?;
        resolver =
            resolver.with_client_certificates(Arc::new(FixedCertificate(ClientCertificate { pem })));
    }
    if args.insecure {
        log::warn!("server certificate validation is disabled");
        resolver = resolver.with_server_certificate_validation(Arc::new(AcceptInvalidCertificates));
    }
    Ok(resolver)
}
