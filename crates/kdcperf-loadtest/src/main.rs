//! # kdcperf CLI
//!
//! Benchmarks and stress-tests a KDC's AS_REQ handling.
//!
//! ## Usage
//!
//! ```bash
//! # Password authentication
//! kdcperf -s krbtgt/EXAMPLE.COM@EXAMPLE.COM -i 1000 -p 20 -c alice@EXAMPLE.COM -P secret
//!
//! # Keytab authentication, every attempt logged
//! kdcperf -s krbtgt/EXAMPLE.COM@EXAMPLE.COM -i 500 -p 10 -c host/web01@EXAMPLE.COM -k /etc/krb5.keytab -V
//!
//! # Settings from a file, JSON summary written alongside the report
//! kdcperf --config kdcperf.toml -o results.json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use kdcperf_core::BenchError;
use kdcperf_loadtest::{KinitAuthenticator, LoadTestConfig, LoadTestRunner};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[cfg_attr(test, derive(Debug))]
#[command(name = "kdcperf")]
#[command(version, disable_version_flag = true)]
#[command(about = "Performance benchmarking and stress testing of Kerberos KDC AS_REQ handling", long_about = None)]
struct Cli {
    /// Keytab holding keys for the client principal
    #[arg(short = 'k', long, env = "KTNAME")]
    keytab: Option<PathBuf>,

    /// Client principal
    #[arg(short = 'c', long)]
    client: Option<String>,

    /// CSV file containing records of the form client,password
    #[arg(short = 'C', long)]
    csv: Option<PathBuf>,

    /// Password for the client principal
    #[arg(short = 'P', long)]
    password: Option<String>,

    /// Service principal to request credentials for
    #[arg(short = 's', long)]
    service: Option<String>,

    /// Total number of requests
    #[arg(short = 'i', long)]
    iterations: Option<usize>,

    /// Number of concurrent workers
    #[arg(short = 'p', long)]
    parallelism: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Job queue capacity (defaults to the iteration count)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Kerberos client program
    #[arg(long)]
    kinit: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the summary as JSON to this file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Suppress output and only provide summary
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Show each request as it completes
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Print version
    #[arg(long, action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

impl Cli {
    /// Merge flags over the optional config file
    fn into_config(self) -> anyhow::Result<LoadTestConfig> {
        let mut config = match &self.config {
            Some(path) => LoadTestConfig::from_toml_file(path)?,
            None => LoadTestConfig::default(),
        };

        if let Some(service) = self.service {
            config.target_service = service;
        }
        if self.iterations.is_some() {
            config.iterations = self.iterations;
        }
        if self.parallelism.is_some() {
            config.parallelism = self.parallelism;
        }
        if self.timeout.is_some() {
            config.call_timeout_ms = self.timeout;
        }
        if self.queue_capacity.is_some() {
            config.queue_capacity = self.queue_capacity;
        }
        if let Some(kinit) = self.kinit {
            config.kinit_program = kinit;
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        config.verbose |= self.verbose;
        config.quiet |= self.quiet;

        let creds = &mut config.credentials;
        if self.client.is_some() {
            creds.client = self.client;
        }
        if self.password.is_some() {
            creds.password = self.password;
        }
        if self.keytab.is_some() {
            creds.keytab = self.keytab;
        }
        if self.csv.is_some() {
            creds.csv = self.csv;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup tracing
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli).await {
        let code = err
            .downcast_ref::<BenchError>()
            .map(BenchError::exit_code)
            .unwrap_or(1);
        eprintln!("kdcperf: {:#}", err);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;
    config.validate()?;
    let rotator = config.build_rotator()?;

    let authenticator = KinitAuthenticator::new(config.kinit_program.clone());
    let mut runner = LoadTestRunner::new(config.clone(), authenticator);

    let progress = if config.quiet || config.verbose {
        None
    } else {
        let pb = ProgressBar::new(config.iterations()? as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40}] {pos}/{len} {per_sec} {elapsed_precise}")
                .context("invalid progress template")?
                .progress_chars("=> "),
        );
        runner = runner.with_progress(pb.clone());
        Some(pb)
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            let _ = shutdown_tx.send(());
        }
    });

    let summary = runner.run_with_shutdown(rotator, shutdown_rx).await?;
    if let Some(pb) = progress {
        pb.finish();
    }

    summary.print_report();

    if let Some(path) = &config.output {
        let json = serde_json::to_string_pretty(&summary).context("cannot serialize summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write summary to '{}'", path.display()))?;
        info!("Results saved to {}", path.display());
    }

    Ok(())
}
