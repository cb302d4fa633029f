use std::path::PathBuf;

use clap::Parser;

/// DNS health audit across a fleet of domain controllers
#[derive(Parser, Debug)]
#[command(name = "dns-fleet-audit")]
#[command(about = "Audit DNS health across domain controllers and emit HTML/Markdown reports")]
pub struct Cli {
	/// Configuration file (created with defaults when absent)
	#[arg(short = 'c', long = "config", default_value = "dns-audit.json")]
	pub config: PathBuf,

	/// Server-list file exported from the directory service
	#[arg(short = 's', long = "servers", default_value = "servers.json")]
	pub servers: PathBuf,

	/// Override the configured output directory
	#[arg(short = 'o', long = "output-dir")]
	pub output_dir: Option<PathBuf>,

	/// Management agent port on each domain controller
	#[arg(long = "admin-port", default_value = "8053")]
	pub admin_port: u16,

	/// Skip alert dispatch even if the configuration enables it
	#[arg(long = "no-alerts")]
	pub no_alerts: bool,
}
