use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::model::Server;

/// Directory-service collaborator: enumerates the domain controllers to
/// audit and names the root domain. Failures surface as zero servers, never
/// as a run abort.
#[async_trait]
pub trait Directory: Send + Sync {
	async fn domain_controllers(&self) -> Vec<Server>;
	async fn root_domain(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct ServerListFile {
	#[serde(default)]
	domain: Option<String>,
	#[serde(default)]
	servers: Vec<Server>,
}

/// Directory backed by a JSON server-list file exported from the directory
/// service:
///
/// ```json
/// {
///   "domain": "corp.example.com",
///   "servers": [
///     { "name": "DC1", "fqdn": "dc1.corp.example.com", "os": "..." }
///   ]
/// }
/// ```
pub struct FileDirectory {
	path: PathBuf,
}

impl FileDirectory {
	pub fn new(path: &Path) -> Self {
		FileDirectory { path: path.to_path_buf() }
	}

	fn load(&self) -> Option<ServerListFile> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(c) => c,
			Err(e) => {
				warn!("could not read server list {}: {}", self.path.display(), e);
				return None;
			}
		};
		match serde_json::from_str(&content) {
			Ok(list) => Some(list),
			Err(e) => {
				warn!("server list {} is not valid: {}", self.path.display(), e);
				None
			}
		}
	}
}

#[async_trait]
impl Directory for FileDirectory {
	async fn domain_controllers(&self) -> Vec<Server> {
		self.load().map(|l| l.servers).unwrap_or_default()
	}

	async fn root_domain(&self) -> Option<String> {
		self.load().and_then(|l| l.domain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_reads_servers_and_domain() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("servers.json");
		std::fs::write(
			&path,
			r#"{
				"domain": "corp.example.com",
				"servers": [
					{"name": "DC1", "fqdn": "dc1.corp.example.com", "os": "Windows Server 2022"},
					{"name": "DC2", "fqdn": "dc2.corp.example.com"}
				]
			}"#,
		)
		.unwrap();

		let d = FileDirectory::new(&path);
		let servers = d.domain_controllers().await;
		assert_eq!(servers.len(), 2);
		assert_eq!(servers[0].name, "DC1");
		assert_eq!(servers[1].os, None);
		assert_eq!(d.root_domain().await.as_deref(), Some("corp.example.com"));
	}

	#[tokio::test]
	async fn test_missing_file_is_zero_servers() {
		let d = FileDirectory::new(Path::new("/nonexistent/servers.json"));
		assert!(d.domain_controllers().await.is_empty());
		assert!(d.root_domain().await.is_none());
	}

	#[tokio::test]
	async fn test_corrupt_file_is_zero_servers() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("servers.json");
		std::fs::write(&path, "not json at all").unwrap();
		let d = FileDirectory::new(&path);
		assert!(d.domain_controllers().await.is_empty());
	}
}
