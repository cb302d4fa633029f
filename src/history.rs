use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::warn;

use crate::aggregate::AggregateSummary;

/// Bounded, time-windowed series of per-run summaries, persisted as a JSON
/// document. A read failure loses history, never availability.
pub struct HistoryStore {
	path: PathBuf,
	retention_days: i64,
}

/// Drop entries older than the retention cutoff. Idempotent: pruning an
/// already-pruned series changes nothing.
pub fn prune(
	entries: Vec<AggregateSummary>,
	retention_days: i64,
	now: DateTime<Utc>,
) -> Vec<AggregateSummary> {
	let cutoff = now - ChronoDuration::days(retention_days);
	entries.into_iter().filter(|e| e.timestamp >= cutoff).collect()
}

impl HistoryStore {
	pub fn new(path: &Path, retention_days: i64) -> Self {
		HistoryStore { path: path.to_path_buf(), retention_days }
	}

	/// Load the persisted series. Missing or corrupt files fall back to an
	/// empty series.
	pub fn load(&self) -> Vec<AggregateSummary> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(c) => c,
			Err(_) => return Vec::new(),
		};
		match serde_json::from_str(&content) {
			Ok(entries) => entries,
			Err(e) => {
				warn!("history file {} is corrupt, starting fresh: {}", self.path.display(), e);
				Vec::new()
			}
		}
	}

	/// Append one run's summary, prune entries outside the retention window
	/// and rewrite the whole file (temp file + rename, so a crash mid-write
	/// never leaves a half-written series). Returns the updated series.
	pub fn append_and_prune(
		&self,
		summary: AggregateSummary,
		now: DateTime<Utc>,
	) -> Vec<AggregateSummary> {
		let mut entries = self.load();
		entries.push(summary);
		entries.sort_by_key(|e| e.timestamp);
		let entries = prune(entries, self.retention_days, now);

		if let Err(e) = self.write(&entries) {
			warn!("could not persist history to {}: {}", self.path.display(), e);
		}
		entries
	}

	fn write(&self, entries: &[AggregateSummary]) -> anyhow::Result<()> {
		let body = serde_json::to_string_pretty(entries)?;
		let tmp = self.path.with_extension("json.tmp");
		std::fs::write(&tmp, body)?;
		std::fs::rename(&tmp, &self.path)?;
		Ok(())
	}
}
