use thiserror::Error;

/// Classified failure of a single remote probe call.
///
/// Every remote collaborator returns one of these instead of raw transport
/// errors, so the core can switch on the class rather than matching on
/// error text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
	/// The target could not be reached at the transport level
	/// (connection refused, network timeout, name resolution of the
	/// management endpoint itself).
	#[error("server unreachable: {0}")]
	Unreachable(String),

	/// The target answered but refused the request for lack of privilege.
	#[error("access denied: {0}")]
	AccessDenied(String),

	/// The DNS service on the target is not running.
	#[error("DNS service not running")]
	NotRunning,

	/// The probe completed but the target had nothing to report.
	/// Not an error; callers map this to an empty payload.
	#[error("no data returned")]
	NoData,

	/// Anything the collaborator could not classify.
	#[error("{0}")]
	Other(String),
}

impl ProbeFailure {
	/// Remediation hint for the failure classes an operator can act on.
	pub fn remediation_hint(&self) -> Option<&'static str> {
		match self {
			ProbeFailure::Unreachable(_) => Some(
				"Check network connectivity and firewall rules between the \
				 monitor and the target; the management port must be reachable.",
			),
			ProbeFailure::AccessDenied(_) => Some(
				"Verify the monitoring account has permission to query the \
				 DNS service and event log on the target.",
			),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hint_for_unreachable() {
		let f = ProbeFailure::Unreachable("connect refused".into());
		assert!(f.remediation_hint().unwrap().contains("firewall"));
	}

	#[test]
	fn test_hint_for_access_denied() {
		let f = ProbeFailure::AccessDenied("403".into());
		assert!(f.remediation_hint().unwrap().contains("permission"));
	}

	#[test]
	fn test_no_hint_for_no_data() {
		assert!(ProbeFailure::NoData.remediation_hint().is_none());
		assert!(ProbeFailure::NotRunning.remediation_hint().is_none());
	}

	#[test]
	fn test_display_text() {
		let f = ProbeFailure::Unreachable("timed out after 5s".into());
		assert_eq!(f.to_string(), "server unreachable: timed out after 5s");
	}
}
