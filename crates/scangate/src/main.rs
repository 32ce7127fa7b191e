//! ScanGate - authenticated gateway for launching scans and exporting their reports.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use scangate_common::{Language, Timestamp};
use scangate_gateway::tls::load_server_config;
use scangate_gateway::{
    bind, router, run_foreground, shutdown_signal, AppState, GatewayConfig, GatewaySettings,
    StartupError,
};
use scangate_report::{
    resolve_report_by_numeric_id, ExportFormat, JsonFileLogStore, LogQuery, ReportExporter,
};
use scangate_scan_config::{ConfigAssembler, ScanDefaults};
use scangate_supervisor::{CommandEngine, JobSupervisor, SupervisorOptions};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scangate")]
#[command(
    author,
    version,
    about = "Authenticated HTTP gateway that launches scan jobs and exports their reports"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "SCANGATE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve(ServeArgs),

    /// Export recorded events from a log store snapshot
    Export {
        /// Log store snapshot file
        #[arg(long, env = "SCANGATE_STORE")]
        store: PathBuf,

        /// Export every event of this host
        #[arg(long, conflicts_with = "report_id")]
        host: Option<String>,

        /// Export every event of the scan run behind this report id
        #[arg(long)]
        report_id: Option<i64>,

        /// Output format (json, csv, html)
        #[arg(long, default_value = "json")]
        format: String,

        /// Output file; defaults to the generated report filename
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address
    #[arg(long, env = "SCANGATE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bind port
    #[arg(long, env = "SCANGATE_PORT", default_value = "5000")]
    port: u16,

    /// Debug mode (implies verbose logging)
    #[arg(long, env = "SCANGATE_DEBUG")]
    debug: bool,

    /// API key; a random key is generated when omitted
    #[arg(long, env = "SCANGATE_API_KEY")]
    api_key: Option<String>,

    /// Only accept clients listed with --allowed-ip
    #[arg(long, env = "SCANGATE_ALLOW_LIST")]
    allow_list: bool,

    /// Client address allowed when the allow-list is enabled (repeatable)
    #[arg(long = "allowed-ip", env = "SCANGATE_ALLOWED_IPS", value_delimiter = ',')]
    allowed_ips: Vec<String>,

    /// Write an access log line per request
    #[arg(long, env = "SCANGATE_ACCESS_LOG")]
    access_log: bool,

    /// Access log file
    #[arg(long, env = "SCANGATE_ACCESS_LOG_FILE", default_value = "scangate_access.log")]
    access_log_file: PathBuf,

    /// TLS certificate (PEM); requires --key
    #[arg(long, env = "SCANGATE_TLS_CERT")]
    cert: Option<PathBuf>,

    /// TLS private key (PEM); requires --cert
    #[arg(long, env = "SCANGATE_TLS_KEY")]
    key: Option<PathBuf>,

    /// Language of client-facing messages (en, de)
    #[arg(long, env = "SCANGATE_LANGUAGE", default_value = "en")]
    language: Language,

    /// Scan engine executable, started once per job
    #[arg(long, env = "SCANGATE_ENGINE", default_value = "scangate-engine")]
    engine: PathBuf,

    /// Extra argument passed to the scan engine (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// YAML file overlaying the default scan configuration
    #[arg(long, env = "SCANGATE_SCAN_DEFAULTS")]
    scan_defaults: Option<PathBuf>,

    /// Log store snapshot file
    #[arg(long, env = "SCANGATE_STORE", default_value = "scangate_logs.json")]
    store: PathBuf,

    /// Directory with static UI files
    #[arg(long, env = "SCANGATE_WEB_ROOT")]
    web_root: Option<PathBuf>,

    /// Directory that report filenames are relative to
    #[arg(long, env = "SCANGATE_RESULTS_ROOT", default_value = ".")]
    results_root: PathBuf,

    /// Reap interval in milliseconds
    #[arg(long, default_value = "300")]
    reap_interval_ms: u64,

    /// Reap intervals to wait for jobs on shutdown
    #[arg(long, default_value = "20")]
    shutdown_polls: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = cli.verbose || matches!(&cli.command, Commands::Serve(args) if args.debug);
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(cli.log_json.then(|| fmt::layer().json().with_target(false)))
        .with((!cli.log_json).then(|| fmt::layer().with_target(false)))
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve(args) => serve(args).await,

        Commands::Export {
            store,
            host,
            report_id,
            format,
            out,
        } => {
            let format: ExportFormat = format.parse()?;
            let query = LogQuery::new(Arc::new(JsonFileLogStore::new(&store)));
            let exporter = ReportExporter::new()?;

            let (title, records, stamp) = match (report_id, host) {
                (Some(id), _) => {
                    let resolved = resolve_report_by_numeric_id(&query, id).await?;
                    let stamp = resolved.stamp();
                    (format!("report {}", id), resolved.records, stamp)
                }
                (None, Some(host)) => {
                    let records = query.by_host(&host).await?;
                    (host, records, Timestamp::now())
                }
                (None, None) => anyhow::bail!("either --host or --report-id is required"),
            };

            let artifact = exporter.export(format, &title, &records, &stamp)?;
            let path = out.unwrap_or_else(|| PathBuf::from(&artifact.filename));
            std::fs::write(&path, &artifact.payload)
                .with_context(|| format!("Failed to write {:?}", path))?;

            info!("Exported {} records to {:?}", records.len(), path);
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let api_key = args
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .unwrap_or_else(generate_api_key);

    let config = GatewayConfig::from_settings(GatewaySettings {
        host: args.host,
        port: args.port,
        debug: args.debug,
        api_key,
        allow_list_enabled: args.allow_list,
        allowed_ips: args.allowed_ips,
        access_log_enabled: args.access_log,
        access_log_file: args.access_log_file,
        tls_cert: args.cert,
        tls_key: args.key,
        language: args.language,
        web_root: args.web_root,
        results_root: args.results_root,
    })
    .unwrap_or_else(|err| fatal(err));

    let tls = config
        .policy
        .tls()
        .map(|paths| load_server_config(paths).unwrap_or_else(|err| fatal(err)));

    let defaults = match &args.scan_defaults {
        Some(path) => ScanDefaults::from_yaml_file(path).unwrap_or_else(|err| {
            fatal(StartupError::new("ERR_SCAN_DEFAULTS", err.to_string()))
        }),
        None => ScanDefaults::default(),
    };

    let listener = bind(config.bind_addr).await.unwrap_or_else(|err| fatal(err));

    let engine = CommandEngine::new(&args.engine).with_args(args.engine_args);
    let supervisor = JobSupervisor::start(
        Arc::new(engine),
        SupervisorOptions {
            reap_interval: Duration::from_millis(args.reap_interval_ms),
            shutdown_polls: args.shutdown_polls,
            ..SupervisorOptions::default()
        },
    );

    let logs = LogQuery::new(Arc::new(JsonFileLogStore::new(&args.store)));
    let state = AppState::new(
        config.clone(),
        ConfigAssembler::new(Arc::new(defaults)),
        supervisor.clone(),
        logs,
    )
    .unwrap_or_else(|err| fatal(err));

    info!(
        addr = %config.bind_addr,
        scheme = config.scheme(),
        store = %args.store.display(),
        "ScanGate listening"
    );
    info!("API key: {}", config.policy.api_key());

    run_foreground(listener, router(state), tls, supervisor, shutdown_signal()).await?;
    Ok(())
}

fn generate_api_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn fatal(err: impl Display) -> ! {
    eprintln!("STARTUP_ERROR {}", err);
    std::process::exit(1);
}
