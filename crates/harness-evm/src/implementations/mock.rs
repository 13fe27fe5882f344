//! Mock EVM client for tests and offline runs.
//!
//! The mock models the one piece of chain state the harness actually
//! depends on: the sender's nonce sequence. Submissions are accepted only
//! at the current nonce, so nonce races surface exactly as they do on a
//! live node. Dry-run failures, submission failures and never-included
//! transactions can be scripted per connector.

use crate::{EvmConnector, EvmError, EvmInterface};
use alloy_primitives::{keccak256, Address};
use async_trait::async_trait;
use harness_types::{
	CallRequest, ChainConnection, ConfigSchema, Schema, SubmitRequest, TransactionHash,
	TransactionReceipt, ValidationError, U256,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
	/// Next nonce the chain will accept.
	accepted_nonce: u64,
	/// When set, `transaction_count` keeps reporting this value.
	frozen_nonce: Option<u64>,
	dry_run_failure: Option<String>,
	submission_failure: Option<String>,
	never_include: bool,
	revert_included: bool,
	balances: HashMap<Address, U256>,
	/// Scripted read results keyed by 4-byte selector.
	call_returns: HashMap<[u8; 4], Vec<u8>>,
	submissions: Vec<SubmitRequest>,
	receipts: HashMap<Vec<u8>, TransactionReceipt>,
	block_number: u64,
}

/// Connector handing out mock clients that all share one chain state.
#[derive(Clone, Default)]
pub struct MockConnector {
	state: Arc<Mutex<MockState>>,
}

impl MockConnector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the EVM-side balance reported for an address.
	pub fn set_balance(&self, address: Address, balance: U256) {
		self.state.lock().unwrap().balances.insert(address, balance);
	}

	/// Makes every subsequent dry run fail with the given reason.
	pub fn script_dry_run_failure(&self, reason: &str) {
		self.state.lock().unwrap().dry_run_failure = Some(reason.to_string());
	}

	/// Makes the next submission fail with the given reason.
	pub fn script_submission_failure(&self, reason: &str) {
		self.state.lock().unwrap().submission_failure = Some(reason.to_string());
	}

	/// Freezes the reported nonce at its current value.
	///
	/// Accepted nonces still advance, so a second submission built from
	/// the frozen reading fails the way a lost nonce race does.
	pub fn freeze_nonce(&self) {
		let mut state = self.state.lock().unwrap();
		state.frozen_nonce = Some(state.accepted_nonce);
	}

	/// Scripts the return data for reads with the given selector.
	pub fn set_call_return(&self, selector: [u8; 4], data: Vec<u8>) {
		self.state.lock().unwrap().call_returns.insert(selector, data);
	}

	/// Makes submitted transactions never reach a block.
	pub fn set_never_include(&self) {
		self.state.lock().unwrap().never_include = true;
	}

	/// Makes included transactions carry a failed execution status.
	pub fn set_revert_included(&self) {
		self.state.lock().unwrap().revert_included = true;
	}

	/// All submissions accepted so far, in order.
	pub fn submissions(&self) -> Vec<SubmitRequest> {
		self.state.lock().unwrap().submissions.clone()
	}

	/// The nonces of accepted submissions, in order.
	pub fn submitted_nonces(&self) -> Vec<Option<u64>> {
		self.state
			.lock()
			.unwrap()
			.submissions
			.iter()
			.map(|s| s.nonce)
			.collect()
	}
}

/// Configuration schema for the mock connector; any table is accepted.
pub struct MockConnectorSchema;

impl ConfigSchema for MockConnectorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl EvmConnector for MockConnector {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockConnectorSchema)
	}

	async fn connect(
		&self,
		connection: &ChainConnection,
	) -> Result<Box<dyn EvmInterface>, EvmError> {
		// Deterministic stand-in for key derivation: hash of the key text.
		let digest = keccak256(connection.sender_private_key.expose_secret().as_bytes());
		let sender = Address::from_slice(&digest[12..]);

		Ok(Box::new(MockEvm {
			state: Arc::clone(&self.state),
			sender,
		}))
	}
}

/// Mock EVM client bound to one sender, sharing its connector's state.
pub struct MockEvm {
	state: Arc<Mutex<MockState>>,
	sender: Address,
}

#[async_trait]
impl EvmInterface for MockEvm {
	fn sender(&self) -> Address {
		self.sender
	}

	async fn transaction_count(&self, _address: Address) -> Result<u64, EvmError> {
		let state = self.state.lock().unwrap();
		Ok(state.frozen_nonce.unwrap_or(state.accepted_nonce))
	}

	async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, EvmError> {
		let state = self.state.lock().unwrap();
		if let Some(reason) = &state.dry_run_failure {
			return Err(EvmError::Execution(reason.clone()));
		}
		if request.input.len() >= 4 {
			let mut selector = [0u8; 4];
			selector.copy_from_slice(&request.input[..4]);
			if let Some(data) = state.call_returns.get(&selector) {
				return Ok(data.clone());
			}
		}
		Ok(Vec::new())
	}

	async fn submit(&self, request: &SubmitRequest) -> Result<TransactionHash, EvmError> {
		let mut state = self.state.lock().unwrap();

		if let Some(reason) = state.submission_failure.take() {
			return Err(EvmError::Rpc(reason));
		}

		let nonce = request.nonce.unwrap_or(state.accepted_nonce);
		if nonce != state.accepted_nonce {
			return Err(EvmError::Rpc(format!(
				"nonce too low: expected {}, got {}",
				state.accepted_nonce, nonce
			)));
		}

		state.accepted_nonce += 1;
		state.block_number += 1;

		let mut preimage = nonce.to_be_bytes().to_vec();
		preimage.extend_from_slice(&request.input);
		let hash = TransactionHash(keccak256(&preimage).to_vec());

		let receipt = TransactionReceipt {
			hash: hash.clone(),
			block_number: state.block_number,
			success: !state.revert_included,
		};
		state.receipts.insert(hash.0.clone(), receipt);
		state.submissions.push(request.clone());

		Ok(hash)
	}

	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
		timeout: Duration,
	) -> Result<TransactionReceipt, EvmError> {
		{
			let state = self.state.lock().unwrap();
			if !state.never_include {
				return state
					.receipts
					.get(&hash.0)
					.cloned()
					.ok_or_else(|| EvmError::Rpc("Transaction not found".to_string()));
			}
		}
		// Scripted unresponsive node: sleep out the deadline.
		tokio::time::sleep(timeout).await;
		Err(EvmError::Timeout(timeout))
	}

	async fn native_balance(&self, address: Address) -> Result<U256, EvmError> {
		let state = self.state.lock().unwrap();
		Ok(state.balances.get(&address).copied().unwrap_or(U256::ZERO))
	}
}

/// Registry for the mock EVM implementation.
pub struct Registry;

impl harness_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = crate::EvmConnectorFactory;

	fn factory() -> Self::Factory {
		|_config: &toml::Value| -> Result<Box<dyn EvmConnector>, EvmError> {
			Ok(Box::new(MockConnector::new()))
		}
	}
}

impl crate::EvmRegistry for Registry {}
