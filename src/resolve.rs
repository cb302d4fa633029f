use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;

use crate::fault::ProbeFailure;
use crate::model::Resolved;

/// Name-resolution collaborator: one timed, timeout-guarded lookup.
#[async_trait]
pub trait NameResolver: Send + Sync {
	async fn resolve(&self, host: &str) -> Result<Resolved, ProbeFailure>;
}

/// Resolver backed by hickory. Uses the configured custom DNS servers when
/// any are set, otherwise the library defaults.
pub struct HickoryResolver {
	resolver: TokioResolver,
	timeout: Duration,
}

impl HickoryResolver {
	pub fn new(custom_servers: &[IpAddr], timeout: Duration) -> Self {
		let config = if custom_servers.is_empty() {
			ResolverConfig::default()
		} else {
			let group = NameServerConfigGroup::from_ips_clear(custom_servers, 53, true);
			ResolverConfig::from_parts(None, vec![], group)
		};
		let resolver = TokioResolver::builder_with_config(
			config,
			TokioConnectionProvider::default(),
		)
		.build();
		HickoryResolver { resolver, timeout }
	}
}

#[async_trait]
impl NameResolver for HickoryResolver {
	async fn resolve(&self, host: &str) -> Result<Resolved, ProbeFailure> {
		let start = Instant::now();
		let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup_ip(host))
			.await
			.map_err(|_| {
				ProbeFailure::Unreachable(format!(
					"resolution of {} timed out after {} ms",
					host,
					self.timeout.as_millis(),
				))
			})?;
		let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

		match lookup {
			Ok(response) => {
				let addresses: Vec<IpAddr> = response.iter().collect();
				if addresses.is_empty() {
					return Err(ProbeFailure::NoData);
				}
				Ok(Resolved { addresses, elapsed_ms })
			}
			Err(e) => Err(ProbeFailure::Other(format!("resolution of {} failed: {}", host, e))),
		}
	}
}
