//! EVM client request and receipt types.
//!
//! These are the records exchanged with the EVM transaction client seam:
//! read/dry-run requests, signed submission requests, and the hash/receipt
//! pair that comes back once a transaction lands in a block.

use alloy_primitives::Address;
use crate::utils::with_0x_prefix;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes to stay agnostic of the node's
/// hash width.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// Hex rendering with a `0x` prefix, for logs and RPC params.
	pub fn to_hex(&self) -> String {
		with_0x_prefix(&hex::encode(&self.0))
	}
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a
/// block, including its success status and block number.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// An `eth_call`-style read request.
///
/// Used both for contract reads and for dry-running a transaction before
/// submission. All gas fields are optional; nodes fill defaults for reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
	/// Caller address the node should simulate the call from.
	pub from: Address,
	/// Target contract address.
	pub to: Address,
	/// ABI- or SCALE-encoded call data.
	pub input: Vec<u8>,
	pub gas_limit: Option<u64>,
	pub gas_price: Option<u128>,
	pub nonce: Option<u64>,
}

/// A signed transaction submission request.
///
/// The sender is implied by the client's bound signer. When `nonce` is
/// `None` the client resolves the next account nonce itself; callers that
/// need explicit sequencing (the dispatch bridge) pass `Some`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
	/// Target contract address.
	pub to: Address,
	/// ABI- or SCALE-encoded call data.
	pub input: Vec<u8>,
	pub gas_limit: u64,
	pub gas_price: Option<u128>,
	pub nonce: Option<u64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transaction_hash_to_hex() {
		let hash = TransactionHash(vec![0xab, 0x01, 0xff]);
		assert_eq!(hash.to_hex(), "0xab01ff");
	}
}
