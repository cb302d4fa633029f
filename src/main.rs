mod admin;
mod aggregate;
mod alerts;
mod cli;
mod config;
mod directory;
mod fault;
mod history;
mod model;
mod report;
mod resolve;
mod runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

use crate::alerts::SmtpMailer;
use crate::cli::Cli;
use crate::config::ConfigSource;
use crate::directory::{Directory, FileDirectory};
use crate::history::HistoryStore;

/// Install the tracing subscriber: stdout plus a timestamped run log in the
/// output directory. Falls back to stdout only when the log file cannot be
/// created.
fn init_logging(output_dir: &Path, stamp: &str) -> Option<PathBuf> {
	let log_path = output_dir.join(format!("dns-audit-{}.log", stamp));
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	let (writer, opened) = match std::fs::File::create(&log_path) {
		Ok(file) => (
			BoxMakeWriter::new(std::io::stdout.and(Arc::new(file))),
			Some(log_path),
		),
		Err(_) => (BoxMakeWriter::new(std::io::stdout), None),
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(writer)
		.with_ansi(false)
		.init();

	opened
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	let run_started = Utc::now();
	let stamp = report::run_stamp(run_started);

	let (mut cfg, config_source) = config::load_or_init(&cli.config);
	if let Some(dir) = &cli.output_dir {
		cfg.output_dir = dir.clone();
	}

	std::fs::create_dir_all(&cfg.output_dir)
		.with_context(|| format!("cannot create output directory {}", cfg.output_dir.display()))?;

	let log_path = init_logging(&cfg.output_dir, &stamp);
	match &config_source {
		ConfigSource::File => info!("configuration loaded from {}", cli.config.display()),
		ConfigSource::DefaultsWritten => {
			info!("no configuration found, wrote defaults to {}", cli.config.display())
		}
		ConfigSource::DefaultsFallback(reason) => {
			warn!("{}; continuing with defaults", reason)
		}
	}
	if log_path.is_none() {
		warn!("could not create run log file, logging to stdout only");
	}

	// Discovery: failures here mean zero servers, not a dead run
	let dir_service = FileDirectory::new(&cli.servers);
	let servers = dir_service.domain_controllers().await;
	let domain = dir_service
		.root_domain()
		.await
		.unwrap_or_else(|| "unknown domain".to_string());
	info!("discovered {} domain controller(s) in {}", servers.len(), domain);

	// Probe fleet
	let timeout = Duration::from_secs(cfg.query_timeout_secs);
	let resolver = Arc::new(resolve::HickoryResolver::new(&cfg.custom_dns_servers, timeout));
	let admin = Arc::new(admin::HttpAdmin::new(cli.admin_port, timeout)?);
	let results = runner::run_probes(&servers, resolver, admin, &cfg).await;

	// Aggregate, evaluate alerts, fold advisories into the warning count
	let mut summary = aggregate::aggregate(&results, servers.len(), run_started);
	let alert_report = alerts::evaluate(&results, &summary, &cfg);
	summary.attach_alerts(alert_report.messages, alert_report.advisory_count);
	info!(
		"run complete: {} critical, {} warnings, {} alert(s)",
		summary.critical_issues,
		summary.warnings,
		summary.alert_messages.len(),
	);

	// Persist history (best effort), then dispatch alerts (best effort)
	if cfg.history_enabled {
		let store = HistoryStore::new(
			&cfg.output_dir.join("history.json"),
			cfg.history_retention_days,
		);
		let series = store.append_and_prune(summary.clone(), run_started);
		info!("history updated: {} entries within the retention window", series.len());
	}
	if !cli.no_alerts {
		alerts::dispatch(&SmtpMailer, &cfg, &summary.alert_messages).await;
	}

	// The reports are the run's purpose: failure here fails the process
	let (md_path, html_path) =
		report::write_reports(&cfg.output_dir, &domain, &summary, &results, cfg.stale_record_days)?;
	info!("reports written: {} and {}", md_path.display(), html_path.display());

	report::print_summary_table(&summary, &results);

	Ok(())
}
