//! Chain connection parameters.
//!
//! A [`ChainConnection`] carries everything needed to reach one dual-stack
//! node over its Ethereum-compatible RPC: the endpoint coordinates, the EVM
//! chain id, the sender key and the precompile address the caller intends to
//! talk to. Connections are plain values; clients and signers are constructed
//! from them at the point of use and never cached across invocations.

use crate::secret_string::SecretString;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Default node host for locally launched test networks.
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";

/// Connection parameters for a single chain endpoint.
///
/// The private key never appears in Debug output or serialized forms;
/// see [`SecretString`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConnection {
	/// Human-readable network name, used only for logging.
	pub network_name: String,
	/// Node host, usually a loopback address for launched test networks.
	#[serde(default = "default_rpc_host")]
	pub rpc_host: String,
	/// Port of the Ethereum-compatible JSON-RPC endpoint.
	pub rpc_port: u16,
	/// EVM chain id used when binding the signer.
	pub chain_id: u64,
	/// Hex-encoded private key of the transaction sender.
	pub sender_private_key: SecretString,
	/// Address of the precompiled contract this connection targets.
	pub precompile_address: Address,
}

fn default_rpc_host() -> String {
	DEFAULT_RPC_HOST.to_string()
}

impl ChainConnection {
	/// The HTTP URL of the node's Ethereum-compatible RPC endpoint.
	pub fn rpc_url(&self) -> String {
		format!("http://{}:{}", self.rpc_host, self.rpc_port)
	}

	/// Returns a copy of this connection retargeted at another precompile.
	///
	/// Used by the runner to derive per-action-family connections from one
	/// configured endpoint.
	pub fn with_precompile(&self, precompile_address: Address) -> Self {
		Self {
			precompile_address,
			..self.clone()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	fn connection() -> ChainConnection {
		ChainConnection {
			network_name: "devnet".to_string(),
			rpc_host: DEFAULT_RPC_HOST.to_string(),
			rpc_port: 9933,
			chain_id: 688,
			sender_private_key: SecretString::from("0x01"),
			precompile_address: address!("0000000000000000000000000000000000000401"),
		}
	}

	#[test]
	fn test_rpc_url_uses_host_and_port() {
		assert_eq!(connection().rpc_url(), "http://127.0.0.1:9933");
	}

	#[test]
	fn test_with_precompile_keeps_endpoint() {
		let base = connection();
		let did = base.with_precompile(address!("0000000000000000000000000000000000000402"));
		assert_eq!(did.rpc_port, base.rpc_port);
		assert_eq!(did.chain_id, base.chain_id);
		assert_ne!(did.precompile_address, base.precompile_address);
	}

	#[test]
	fn test_debug_redacts_private_key() {
		let debug = format!("{:?}", connection());
		assert!(!debug.contains("0x01"));
		assert!(debug.contains("REDACTED"));
	}
}
