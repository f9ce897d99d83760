//! Fetch policies and cache configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule deciding whether a store snapshot may stand in for a network request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
	/// Always request from the network and ignore store data.
	#[default]
	NetworkOnly,
	/// Render store data immediately when available, and still request.
	StoreAndNetwork,
	/// Render store data when available and skip the request; otherwise request.
	StoreOrNetwork,
}

impl FetchPolicy {
	/// Returns whether the policy allows rendering from the store.
	pub fn reads_store(self) -> bool {
		matches!(self, Self::StoreAndNetwork | Self::StoreOrNetwork)
	}

	/// Returns the policy's wire name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::NetworkOnly => "network-only",
			Self::StoreAndNetwork => "store-and-network",
			Self::StoreOrNetwork => "store-or-network",
		}
	}
}

impl fmt::Display for FetchPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown fetch policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown fetch policy: {0}")]
pub struct UnknownFetchPolicy(pub String);

impl FromStr for FetchPolicy {
	type Err = UnknownFetchPolicy;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"network-only" => Ok(Self::NetworkOnly),
			"store-and-network" => Ok(Self::StoreAndNetwork),
			"store-or-network" => Ok(Self::StoreOrNetwork),
			other => Err(UnknownFetchPolicy(other.to_string())),
		}
	}
}

/// Per-request cache hints forwarded to the environment with each execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
	/// Ask the network layer to bypass any response cache.
	pub force: bool,
	/// Polling interval in milliseconds for live queries.
	pub poll: Option<u64>,
	/// Free-form metadata for custom network layers.
	pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl CacheConfig {
	/// Cache config that forces a network round trip.
	pub fn force() -> Self {
		Self {
			force: true,
			..Self::default()
		}
	}
}
