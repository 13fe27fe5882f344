//! Dispatch bridge types.
//!
//! A native runtime call travels through the bridge as opaque [`CallBytes`]:
//! the bridge never inspects or re-encodes them, it only wraps them in an
//! Ethereum-style transaction addressed to the dispatch precompile. The
//! request/outcome pair records exactly what was sent and what came back.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::evm::TransactionReceipt;
use crate::utils::with_0x_prefix;

/// An encoded native runtime call, opaque to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallBytes(pub Vec<u8>);

impl CallBytes {
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Hex rendering with a `0x` prefix, the wire form of the `data` field.
	pub fn to_hex(&self) -> String {
		with_0x_prefix(&hex::encode(&self.0))
	}
}

impl From<Vec<u8>> for CallBytes {
	fn from(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}
}

/// Position of one dispatchable call in the runtime: the pallet index and
/// the call index within that pallet.
///
/// Index assignment is a per-runtime metadata fact, so these always come
/// from configuration rather than constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallIndex {
	pub pallet: u8,
	pub call: u8,
}

/// Call indices for every native call the encoder knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallIndices {
	pub balances_transfer: CallIndex,
	pub did_create: CallIndex,
}

/// A fully resolved dispatch transaction, ready for dry run and submission.
///
/// The nonce is resolved from the chain before this record is built, so the
/// same value is used for both the dry run and the signed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
	/// The dispatch precompile the call bytes are addressed to.
	pub precompile_address: Address,
	/// The encoded native call being delivered.
	pub call_bytes: CallBytes,
	pub gas_limit: u64,
	pub gas_price: u128,
	/// Sender account nonce at the time the request was built.
	pub nonce: u64,
}

/// Result of the pre-submission dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DryRunResult {
	/// The node simulated the call without an execution error.
	Success {
		/// Raw return data from the simulation, usually empty for dispatches.
		return_data: Vec<u8>,
	},
	/// The caller explicitly chose to submit without a dry run.
	Skipped,
	/// The node rejected the simulated call.
	Failure { reason: String },
}

impl DryRunResult {
	pub fn is_success(&self) -> bool {
		matches!(self, DryRunResult::Success { .. })
	}
}

/// Terminal outcome of one dispatch.
///
/// The bridge never retries; a returned outcome (or error) is the end of the
/// attempt. The receipt is present whenever a transaction was submitted and
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
	/// The request exactly as it went out.
	pub request: DispatchRequest,
	/// What the dry run said, or `Skipped`.
	pub dry_run: DryRunResult,
	/// Receipt of the included transaction.
	pub receipt: Option<TransactionReceipt>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_call_bytes_hex() {
		let bytes = CallBytes(vec![0x0a, 0x00, 0x00]);
		assert_eq!(bytes.to_hex(), "0x0a0000");
		assert_eq!(bytes.len(), 3);
		assert!(!bytes.is_empty());
	}

	#[test]
	fn test_dry_run_success_flag() {
		assert!(DryRunResult::Success {
			return_data: vec![]
		}
		.is_success());
		assert!(!DryRunResult::Skipped.is_success());
		assert!(!DryRunResult::Failure {
			reason: "reverted".to_string()
		}
		.is_success());
	}
}
