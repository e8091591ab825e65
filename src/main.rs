//! Log Sentinel - tail a log file and mail alerts about what it says.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use log_sentinel::config::{ConfigError, ConfigLoader, MailerKind, SentinelConfig};
use log_sentinel::listeners::{ErrorBurstListener, InactivityListener};
use log_sentinel::monitor::Monitor;
use log_sentinel::notify::{ConsoleMailer, Mailer, SmtpMailer};
use log_sentinel::watcher::{follow, LineTailer, WatcherError};

#[derive(Parser)]
#[command(
    name = "log-sentinel",
    about = "Tail a log file and mail alerts on error bursts and prolonged silence",
    version
)]
struct Cli {
    /// Log file to monitor.
    file: Option<PathBuf>,

    /// Config file (default: ./.log-sentinel.toml, then the user config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print alerts to stdout instead of mailing them.
    #[arg(long)]
    console: bool,

    /// Process the existing file content instead of only new lines.
    #[arg(long)]
    from_start: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(thiserror::Error, Debug)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_mailer(config: &SentinelConfig) -> Arc<dyn Mailer> {
    match config.mailer.kind {
        MailerKind::Smtp => Arc::new(SmtpMailer::new(&config.mailer.smtp)),
        MailerKind::Console => Arc::new(ConsoleMailer::new()),
    }
}

async fn run(cli: Cli, path: PathBuf) -> Result<(), RunError> {
    let loader = cli
        .config
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = loader.load()?;
    if cli.console {
        config.mailer.kind = MailerKind::Console;
    }
    if cli.from_start {
        config.tail.from_start = true;
    }

    let service = config.service_name_for(&path);
    if config.recipients.is_empty() && config.mailer.kind == MailerKind::Smtp {
        tracing::warn!("No recipients configured, alerts cannot be delivered");
    }

    let monitor = Monitor::from_config(&config, service.clone(), build_mailer(&config));
    let notifier = monitor.notifier().clone();
    monitor.add_observer(Arc::new(ErrorBurstListener::from_config(
        notifier.clone(),
        &config.error_burst,
    )));

    let inactivity = config.inactivity.enabled.then(|| {
        let listener = Arc::new(InactivityListener::from_config(
            notifier,
            service.clone(),
            &config.inactivity,
        ));
        monitor.add_observer(listener.clone());
        listener.start();
        listener
    });

    let mut tailer = if config.tail.from_start {
        LineTailer::new(path.clone())
    } else {
        LineTailer::at_end(path.clone()).await?
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    tracing::info!(path = %path.display(), service = %service, "Beginning to monitor");
    let result = follow(&mut tailer, &monitor, config.tail.poll_interval(), cancel).await;

    if let Some(listener) = inactivity {
        listener.stop();
    }
    result.map_err(RunError::from)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(path) = cli.file.clone() else {
        eprintln!(
            "No log file given, nothing to monitor.\n\n{}",
            Cli::command().render_usage()
        );
        return ExitCode::from(1);
    };

    match run(cli, path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Monitoring stopped");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
