//! Action harness module for the precompile dispatch harness.
//!
//! One generic harness replaces the per-action wrapper scripts: every
//! business operation is a [`MethodPayload`] variant mapped to exactly
//! one precompile method. Each invocation builds a fresh client and
//! contract handle from its [`ChainConnection`], invokes the method, and
//! flattens every fault into [`ActionResult::Failed`] plus a logged
//! warning — faults never propagate into the runner.

use alloy_sol_types::SolCall;
use harness_evm::{EvmConnector, EvmError, EvmInterface};
use harness_types::{
	ActionResult, AssetMetadata, CallRequest, ChainConnection, MethodPayload, SubmitRequest,
	VariableStore, ASSET_METADATA_SLOT,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod abi;

pub use abi::{mutating_calldata, DidPrecompile, Erc20};

/// Faults inside an action, flattened at the harness boundary.
#[derive(Debug, Error)]
enum ActionError {
	#[error(transparent)]
	Evm(#[from] EvmError),
	/// The transaction was included but execution failed.
	#[error("Transaction reverted in block {block}")]
	Reverted { block: u64 },
	#[error("Bad read response: {0}")]
	Decode(String),
}

/// Defaults applied to every action invocation.
#[derive(Debug, Clone)]
pub struct ActionDefaults {
	/// Gas limit for action transactions.
	pub gas_limit: u64,
	/// Bound on the wait for a submitted transaction's receipt.
	pub receipt_timeout: Duration,
}

impl Default for ActionDefaults {
	fn default() -> Self {
		Self {
			gas_limit: 250_000,
			receipt_timeout: Duration::from_secs(120),
		}
	}
}

/// The generic action harness.
///
/// Holds no per-connection state: the endpoint, signer and contract
/// handle are rebuilt fresh on every [`run`](Self::run), so concurrent
/// invocations with different connections share nothing mutable. The
/// variable store is the one caller-owned slot read actions publish into.
pub struct ActionRunner {
	connector: Arc<dyn EvmConnector>,
	defaults: ActionDefaults,
	store: VariableStore,
}

impl ActionRunner {
	pub fn new(
		connector: Arc<dyn EvmConnector>,
		defaults: ActionDefaults,
		store: VariableStore,
	) -> Self {
		Self {
			connector,
			defaults,
			store,
		}
	}

	/// Runs one action to completion.
	///
	/// Never returns an error: any fault from the client layer is logged
	/// as a warning and reported as `Failed`, keeping the calling runner
	/// alive for the remaining steps.
	pub async fn run(&self, connection: &ChainConnection, payload: &MethodPayload) -> ActionResult {
		match self.run_inner(connection, payload).await {
			Ok(()) => ActionResult::Ok,
			Err(e) => {
				tracing::warn!(
					action = payload.name(),
					network = %connection.network_name,
					error = %e,
					"Eth tx failed"
				);
				ActionResult::Failed {
					reason: e.to_string(),
				}
			},
		}
	}

	async fn run_inner(
		&self,
		connection: &ChainConnection,
		payload: &MethodPayload,
	) -> Result<(), ActionError> {
		// Fresh endpoint, signer and contract handle per invocation.
		let evm = self.connector.connect(connection).await?;
		let contract = PrecompileContract {
			evm: &*evm,
			address: connection.precompile_address,
			gas_limit: self.defaults.gas_limit,
			receipt_timeout: self.defaults.receipt_timeout,
		};

		match payload {
			MethodPayload::ReadTokenMetadata { balance_of } => {
				let metadata = contract.read_metadata(*balance_of).await?;
				// Exactly one store write per invocation, after all four
				// reads have completed.
				self.store
					.set(
						ASSET_METADATA_SLOT,
						serde_json::to_value(&metadata)
							.map_err(|e| ActionError::Decode(e.to_string()))?,
					)
					.await;
				Ok(())
			},
			mutating => {
				// Read payloads are handled above; every other variant
				// has a calldata mapping.
				let (name, calldata) = match mutating_calldata(mutating) {
					Some(mapped) => mapped,
					None => unreachable!("non-read payload without method mapping"),
				};
				tracing::debug!(action = name, to = %contract.address, "Invoking precompile");
				contract.send(calldata).await
			},
		}
	}

	/// The store read actions publish into.
	pub fn store(&self) -> &VariableStore {
		&self.store
	}
}

/// A per-invocation contract handle: one precompile address, one bound
/// client, fixed gas settings.
struct PrecompileContract<'a> {
	evm: &'a dyn EvmInterface,
	address: harness_types::Address,
	gas_limit: u64,
	receipt_timeout: Duration,
}

impl PrecompileContract<'_> {
	/// Submits one method call and awaits its inclusion.
	async fn send(&self, calldata: Vec<u8>) -> Result<(), ActionError> {
		let request = SubmitRequest {
			to: self.address,
			input: calldata,
			gas_limit: self.gas_limit,
			gas_price: None,
			nonce: None,
		};
		let hash = self.evm.submit(&request).await?;
		let receipt = self.evm.wait_for_receipt(&hash, self.receipt_timeout).await?;
		if !receipt.success {
			return Err(ActionError::Reverted {
				block: receipt.block_number,
			});
		}
		Ok(())
	}

	/// Issues a read call and returns its raw return data.
	async fn read(&self, calldata: Vec<u8>) -> Result<Vec<u8>, ActionError> {
		let request = CallRequest {
			from: self.evm.sender(),
			to: self.address,
			input: calldata,
			gas_limit: None,
			gas_price: None,
			nonce: None,
		};
		Ok(self.evm.call(&request).await?)
	}

	/// The four metadata reads, issued concurrently.
	///
	/// Completion order is unconstrained; the combined record is only
	/// assembled once all four are in.
	async fn read_metadata(
		&self,
		balance_of: harness_types::Address,
	) -> Result<AssetMetadata, ActionError> {
		let (name, symbol, total_supply, balance) = tokio::try_join!(
			self.read(Erc20::nameCall {}.abi_encode()),
			self.read(Erc20::symbolCall {}.abi_encode()),
			self.read(Erc20::totalSupplyCall {}.abi_encode()),
			self.read(Erc20::balanceOfCall { who: balance_of }.abi_encode()),
		)?;

		let name = Erc20::nameCall::abi_decode_returns(&name, true)
			.map_err(|e| ActionError::Decode(format!("name: {}", e)))?
			._0;
		let symbol = Erc20::symbolCall::abi_decode_returns(&symbol, true)
			.map_err(|e| ActionError::Decode(format!("symbol: {}", e)))?
			._0;
		let total_supply = Erc20::totalSupplyCall::abi_decode_returns(&total_supply, true)
			.map_err(|e| ActionError::Decode(format!("totalSupply: {}", e)))?
			._0;
		let balance = Erc20::balanceOfCall::abi_decode_returns(&balance, true)
			.map_err(|e| ActionError::Decode(format!("balanceOf: {}", e)))?
			._0;

		Ok(AssetMetadata {
			name,
			symbol,
			total_supply: u128::try_from(total_supply)
				.map_err(|_| ActionError::Decode("totalSupply exceeds u128".to_string()))?,
			balance_of: u128::try_from(balance)
				.map_err(|_| ActionError::Decode("balanceOf exceeds u128".to_string()))?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, B256, U256};
	use harness_evm::implementations::mock::MockConnector;
	use harness_types::SecretString;

	fn connection(precompile: harness_types::Address) -> ChainConnection {
		ChainConnection {
			network_name: "mock".to_string(),
			rpc_host: "127.0.0.1".to_string(),
			rpc_port: 9933,
			chain_id: 688,
			sender_private_key: SecretString::from("0x01"),
			precompile_address: precompile,
		}
	}

	fn xc20() -> harness_types::Address {
		address!("ffffffff00000000000000000000000000000834")
	}

	fn runner(connector: &MockConnector) -> ActionRunner {
		ActionRunner::new(
			Arc::new(connector.clone()),
			ActionDefaults::default(),
			VariableStore::new(),
		)
	}

	fn script_metadata_reads(connector: &MockConnector, balance: u64) {
		connector.set_call_return(
			Erc20::nameCall::SELECTOR,
			Erc20::nameCall::abi_encode_returns(&("Watr".to_string(),)),
		);
		connector.set_call_return(
			Erc20::symbolCall::SELECTOR,
			Erc20::symbolCall::abi_encode_returns(&("WATR".to_string(),)),
		);
		connector.set_call_return(
			Erc20::totalSupplyCall::SELECTOR,
			Erc20::totalSupplyCall::abi_encode_returns(&(U256::from(1_000_000u64),)),
		);
		connector.set_call_return(
			Erc20::balanceOfCall::SELECTOR,
			Erc20::balanceOfCall::abi_encode_returns(&(U256::from(balance),)),
		);
	}

	#[tokio::test]
	async fn test_transfer_action_submits_one_call() {
		let connector = MockConnector::new();
		let runner = runner(&connector);

		let result = runner
			.run(
				&connection(xc20()),
				&MethodPayload::TransferToken {
					to: address!("3cd0a705a2dc65e5b1e1205896baa2be8a07c6e0"),
					amount: U256::from(100u64),
				},
			)
			.await;

		assert!(result.is_ok());
		let submissions = connector.submissions();
		assert_eq!(submissions.len(), 1);
		assert_eq!(submissions[0].to, xc20());
		assert_eq!(submissions[0].gas_limit, 250_000);
		assert_eq!(&submissions[0].input[..4], Erc20::transferCall::SELECTOR);
	}

	#[tokio::test]
	async fn test_failed_submission_reports_failed() {
		let connector = MockConnector::new();
		connector.script_submission_failure("connection refused");
		let runner = runner(&connector);

		let result = runner
			.run(
				&connection(xc20()),
				&MethodPayload::TransferToken {
					to: address!("3cd0a705a2dc65e5b1e1205896baa2be8a07c6e0"),
					amount: U256::from(1u64),
				},
			)
			.await;

		assert_eq!(
			result.failure_reason(),
			Some("RPC error: connection refused")
		);
	}

	#[tokio::test]
	async fn test_reverted_action_reports_failed() {
		// An action against a DID that was never created reverts on
		// chain; the harness reports Failed rather than faulting.
		let connector = MockConnector::new();
		connector.set_revert_included();
		let runner = runner(&connector);

		let result = runner
			.run(
				&connection(address!("0000000000000000000000000000000000000402")),
				&MethodPayload::RemoveDidServices {
					did: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
					service_keys: vec![B256::from([0x5a; 32])],
				},
			)
			.await;

		assert!(!result.is_ok());
		assert!(result.failure_reason().unwrap().contains("reverted"));
	}

	#[tokio::test]
	async fn test_metadata_read_publishes_once() {
		let connector = MockConnector::new();
		script_metadata_reads(&connector, 50);
		let runner = runner(&connector);

		let result = runner
			.run(
				&connection(xc20()),
				&MethodPayload::ReadTokenMetadata {
					balance_of: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
				},
			)
			.await;

		assert!(result.is_ok());
		assert_eq!(runner.store().len().await, 1);
		let record = runner.store().get(ASSET_METADATA_SLOT).await.unwrap();
		assert_eq!(record["name"], "Watr");
		assert_eq!(record["symbol"], "WATR");
		assert_eq!(record["totalSupply"], 1_000_000);
		assert_eq!(record["balanceOf"], 50);
		// No transaction was submitted for a read.
		assert!(connector.submissions().is_empty());
	}

	#[tokio::test]
	async fn test_metadata_read_is_idempotent() {
		let connector = MockConnector::new();
		script_metadata_reads(&connector, 50);
		let runner = runner(&connector);
		let payload = MethodPayload::ReadTokenMetadata {
			balance_of: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
		};

		assert!(runner.run(&connection(xc20()), &payload).await.is_ok());
		let first = runner.store().get(ASSET_METADATA_SLOT).await.unwrap();
		assert!(runner.run(&connection(xc20()), &payload).await.is_ok());
		let second = runner.store().get(ASSET_METADATA_SLOT).await.unwrap();

		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_metadata_read_failure_leaves_store_empty() {
		let connector = MockConnector::new();
		// Unscripted reads return empty data, which fails decoding.
		let runner = runner(&connector);

		let result = runner
			.run(
				&connection(xc20()),
				&MethodPayload::ReadTokenMetadata {
					balance_of: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
				},
			)
			.await;

		assert!(!result.is_ok());
		assert!(runner.store().is_empty().await);
	}
}
