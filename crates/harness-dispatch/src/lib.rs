//! Dispatch bridge module for the precompile dispatch harness.
//!
//! The bridge delivers an encoded native call to the chain's dispatch
//! precompile through an Ethereum-style transaction: resolve the sender
//! nonce, dry-run the call, submit the signed transaction, await its
//! receipt. It never asserts business effects; callers verify those from
//! native-state reads taken around the dispatch.

use harness_evm::{EvmConnector, EvmError};
use harness_types::{
	CallBytes, CallRequest, ChainConnection, DispatchOutcome, DispatchRequest, DryRunResult,
	SubmitRequest,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod encoder;

pub use encoder::{CallEncoder, EncodeError, NativeCall, ScaleCallEncoder};

/// Errors that can occur during a dispatch.
///
/// Dry-run and submission failures are distinct on purpose: the first
/// means the call itself is invalid, the second that the chain contended
/// (a consumed nonce, lost connectivity) after the call validated.
#[derive(Debug, Error)]
pub enum DispatchError {
	/// The precompile rejected the call before any state change.
	#[error("Dry run failed: {reason}")]
	DryRunFailed { reason: String },
	/// Signing or submission failed after a successful dry run.
	#[error("Submission failed: {reason}")]
	SubmissionFailed { reason: String },
	/// The receipt did not arrive within the configured bound.
	#[error("Timed out after {waited:?} waiting for receipt")]
	ReceiptTimeout { waited: Duration },
	/// A read (connect, nonce lookup) failed before anything was sent.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// The native call could not be encoded.
	#[error("Encoding error: {0}")]
	Encode(#[from] EncodeError),
}

/// Service orchestrating dispatches through the precompile.
///
/// The service holds no per-connection state; every dispatch connects a
/// fresh client from the given [`ChainConnection`]. Concurrent dispatches
/// from the same sender are not serialized here — both read the nonce
/// fresh and the loser of the race surfaces
/// [`DispatchError::SubmissionFailed`] for its caller to retry.
pub struct DispatchService {
	connector: Arc<dyn EvmConnector>,
	receipt_timeout: Duration,
}

impl DispatchService {
	pub fn new(connector: Arc<dyn EvmConnector>, receipt_timeout: Duration) -> Self {
		Self {
			connector,
			receipt_timeout,
		}
	}

	/// Dispatches a native call: dry run, then submit, then await receipt.
	///
	/// A failed dry run is terminal; the transaction is never submitted.
	/// Skipping the dry run is only possible through the separately named
	/// [`dispatch_unchecked`](Self::dispatch_unchecked).
	pub async fn dispatch(
		&self,
		connection: &ChainConnection,
		call_bytes: &CallBytes,
		gas_limit: u64,
		gas_price: u128,
	) -> Result<DispatchOutcome, DispatchError> {
		self.dispatch_inner(connection, call_bytes, gas_limit, gas_price, false)
			.await
	}

	/// Dispatches without the pre-submission dry run.
	///
	/// The outcome records [`DryRunResult::Skipped`] so the explicit
	/// choice stays visible downstream.
	pub async fn dispatch_unchecked(
		&self,
		connection: &ChainConnection,
		call_bytes: &CallBytes,
		gas_limit: u64,
		gas_price: u128,
	) -> Result<DispatchOutcome, DispatchError> {
		self.dispatch_inner(connection, call_bytes, gas_limit, gas_price, true)
			.await
	}

	/// Dry-runs a dispatch without ever submitting.
	pub async fn dry_run(
		&self,
		connection: &ChainConnection,
		call_bytes: &CallBytes,
		gas_limit: u64,
		gas_price: u128,
	) -> Result<DryRunResult, DispatchError> {
		let evm = self
			.connector
			.connect(connection)
			.await
			.map_err(|e| DispatchError::Rpc(e.to_string()))?;
		let sender = evm.sender();
		let nonce = evm
			.transaction_count(sender)
			.await
			.map_err(|e| DispatchError::Rpc(e.to_string()))?;
		let request = DispatchRequest {
			precompile_address: connection.precompile_address,
			call_bytes: call_bytes.clone(),
			gas_limit,
			gas_price,
			nonce,
		};
		self.run_dry_run(&*evm, sender, &request).await
	}

	async fn dispatch_inner(
		&self,
		connection: &ChainConnection,
		call_bytes: &CallBytes,
		gas_limit: u64,
		gas_price: u128,
		skip_dry_run: bool,
	) -> Result<DispatchOutcome, DispatchError> {
		let evm = self
			.connector
			.connect(connection)
			.await
			.map_err(|e| DispatchError::Rpc(e.to_string()))?;
		let sender = evm.sender();

		// The nonce is resolved before the dry-run request is built, so
		// the same value goes into both the simulation and the signed
		// transaction.
		let nonce = evm
			.transaction_count(sender)
			.await
			.map_err(|e| DispatchError::Rpc(e.to_string()))?;

		let request = DispatchRequest {
			precompile_address: connection.precompile_address,
			call_bytes: call_bytes.clone(),
			gas_limit,
			gas_price,
			nonce,
		};

		let dry_run = if skip_dry_run {
			tracing::debug!(sender = %sender, nonce, "Skipping dry run by caller choice");
			DryRunResult::Skipped
		} else {
			let result = self.run_dry_run(&*evm, sender, &request).await?;
			if let DryRunResult::Failure { reason } = result {
				return Err(DispatchError::DryRunFailed { reason });
			}
			result
		};

		let submit = SubmitRequest {
			to: request.precompile_address,
			input: request.call_bytes.0.clone(),
			gas_limit: request.gas_limit,
			gas_price: Some(request.gas_price),
			nonce: Some(request.nonce),
		};

		let hash = evm.submit(&submit).await.map_err(|e| {
			DispatchError::SubmissionFailed {
				reason: e.to_string(),
			}
		})?;

		let receipt = match evm.wait_for_receipt(&hash, self.receipt_timeout).await {
			Ok(receipt) => receipt,
			Err(EvmError::Timeout(waited)) => {
				return Err(DispatchError::ReceiptTimeout { waited })
			},
			Err(e) => return Err(DispatchError::Rpc(e.to_string())),
		};

		tracing::info!(
			tx_hash = %receipt.hash.to_hex(),
			block = receipt.block_number,
			success = receipt.success,
			nonce = request.nonce,
			"Dispatch included"
		);

		Ok(DispatchOutcome {
			request,
			dry_run,
			receipt: Some(receipt),
		})
	}

	async fn run_dry_run(
		&self,
		evm: &dyn harness_evm::EvmInterface,
		sender: harness_types::Address,
		request: &DispatchRequest,
	) -> Result<DryRunResult, DispatchError> {
		let call = CallRequest {
			from: sender,
			to: request.precompile_address,
			input: request.call_bytes.0.clone(),
			gas_limit: Some(request.gas_limit),
			gas_price: Some(request.gas_price),
			nonce: Some(request.nonce),
		};

		match evm.call(&call).await {
			Ok(return_data) => {
				tracing::debug!(sender = %sender, nonce = request.nonce, "Dry run passed");
				Ok(DryRunResult::Success { return_data })
			},
			Err(EvmError::Execution(reason)) => Ok(DryRunResult::Failure { reason }),
			Err(e) => Err(DispatchError::Rpc(e.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use harness_evm::implementations::mock::MockConnector;
	use harness_types::SecretString;

	fn connection() -> ChainConnection {
		ChainConnection {
			network_name: "mock".to_string(),
			rpc_host: "127.0.0.1".to_string(),
			rpc_port: 9933,
			chain_id: 688,
			sender_private_key: SecretString::from("0x01"),
			precompile_address: alloy_primitives::address!(
				"0000000000000000000000000000000000000401"
			),
		}
	}

	fn service(connector: &MockConnector) -> DispatchService {
		DispatchService::new(Arc::new(connector.clone()), Duration::from_secs(120))
	}

	fn call_bytes() -> CallBytes {
		CallBytes(vec![0x0a, 0x00, 0x00])
	}

	#[tokio::test]
	async fn test_sequential_dispatches_advance_nonce() {
		let connector = MockConnector::new();
		let service = service(&connector);

		let first = service
			.dispatch(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await
			.unwrap();
		let second = service
			.dispatch(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await
			.unwrap();

		assert_eq!(first.request.nonce, 0);
		assert_eq!(second.request.nonce, 1);
		assert!(first.dry_run.is_success());
		assert_ne!(
			first.receipt.as_ref().unwrap().hash,
			second.receipt.as_ref().unwrap().hash
		);
	}

	#[tokio::test]
	async fn test_dry_run_failure_blocks_submission() {
		let connector = MockConnector::new();
		connector.script_dry_run_failure("execution reverted: bad call bytes");
		let service = service(&connector);

		let err = service
			.dispatch(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await
			.unwrap_err();

		assert!(matches!(err, DispatchError::DryRunFailed { .. }));
		assert!(connector.submissions().is_empty());
	}

	#[tokio::test]
	async fn test_unchecked_skips_dry_run() {
		let connector = MockConnector::new();
		// Even a failing dry run must not matter on the unchecked path.
		connector.script_dry_run_failure("execution reverted");
		let service = service(&connector);

		let outcome = service
			.dispatch_unchecked(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await
			.unwrap();

		assert_eq!(outcome.dry_run, DryRunResult::Skipped);
		assert!(outcome.receipt.is_some());
		assert_eq!(connector.submissions().len(), 1);
	}

	#[tokio::test]
	async fn test_dry_run_only_never_submits() {
		let connector = MockConnector::new();
		let service = service(&connector);

		let result = service
			.dry_run(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await
			.unwrap();

		assert!(result.is_success());
		assert!(connector.submissions().is_empty());
	}

	#[tokio::test]
	async fn test_nonce_race_loser_fails_submission() {
		let connector = MockConnector::new();
		connector.freeze_nonce();
		let service = service(&connector);

		let winner = service
			.dispatch(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await;
		let loser = service
			.dispatch(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await;

		assert!(winner.is_ok());
		match loser.unwrap_err() {
			DispatchError::SubmissionFailed { reason } => {
				assert!(reason.contains("nonce too low"));
			},
			other => panic!("unexpected error: {:?}", other),
		}
		assert_eq!(connector.submissions().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_receipt_timeout_is_bounded() {
		let connector = MockConnector::new();
		connector.set_never_include();
		let service = DispatchService::new(Arc::new(connector.clone()), Duration::from_secs(5));

		let err = service
			.dispatch(&connection(), &call_bytes(), 256_000, 0x10000000000)
			.await
			.unwrap_err();

		assert!(matches!(err, DispatchError::ReceiptTimeout { .. }));
		// The transaction was submitted; only its receipt never came.
		assert_eq!(connector.submissions().len(), 1);
	}
}
