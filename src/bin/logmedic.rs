use clap::{Parser, Subcommand};
use logmedic::config::{LoggingConfig, Settings};
use logmedic::pipeline::{Outcome, Pipeline};
use logmedic::router::Router;
use logmedic::store::LokiClient;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "logmedic", version, about = "Anomaly reports and remediation hints from Loki logs")]
struct Cli {
    /// Settings file (defaults to $LOGMEDIC_CONFIG, then ./logmedic.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Loki base URL, overrides the settings file
    #[arg(long, global = true)]
    loki_url: Option<String>,

    /// Fetch timeout in seconds, overrides the settings file
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a time window and print the incident report
    Report {
        /// Natural-language window, e.g. "last 2 hours"
        #[arg(default_value = "last 1 hour")]
        time_range: String,

        /// Only analyze lines matching this (case-insensitive) pattern
        #[arg(long)]
        pattern: Option<String>,

        /// Emit the structured report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the raw lines of a time window
    Logs {
        #[arg(default_value = "last 1 hour")]
        time_range: String,
    },

    /// Ask a free-form question, e.g. "any problems in the last 2 hours?"
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

fn init_tracing(cfg: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.level));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cfg.json {
        fmt.json().init();
    } else {
        fmt.init();
    }
}

fn outcome_json(outcome: &Outcome) -> serde_json::Value {
    match outcome {
        Outcome::Reported { report, solution, related, text } => serde_json::json!({
            "state": outcome.state(),
            "report": report,
            "solution": solution,
            "related": related,
            "text": text,
        }),
        Outcome::NoLogs { window, text } => serde_json::json!({
            "state": outcome.state(),
            "window": window,
            "text": text,
        }),
        Outcome::Failed { error, text } => serde_json::json!({
            "state": outcome.state(),
            "error": error.to_string(),
            "text": text,
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, skipped) = match &cli.config {
        Some(path) => (Settings::load(path)?, Vec::new()),
        None => Settings::load_or_default(),
    };
    if let Some(url) = cli.loki_url {
        settings.store.url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.store.timeout_secs = secs;
    }
    init_tracing(&settings.logging);
    for reason in &skipped {
        tracing::warn!("{}", reason);
    }

    let store = LokiClient::from_config(&settings.store)?;
    let pipeline = Pipeline::new(store, &settings);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Report { time_range, pattern, json } => {
            let outcome = pipeline.run_cancellable(&time_range, pattern.as_deref(), &cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
            } else {
                println!("{}", outcome.text());
            }
        }
        Commands::Logs { time_range } => {
            println!("{}", pipeline.log_summary_cancellable(&time_range, &cancel).await?);
        }
        Commands::Ask { query } => {
            let router = Router::new(pipeline);
            println!("{}", router.route_cancellable(&query.join(" "), &cancel).await?);
        }
    }
    Ok(())
}
