//! Alloy-based EVM client implementation.
//!
//! This implementation uses the Alloy library to talk to the chain's
//! Ethereum-compatible JSON-RPC endpoint. Each [`connect`] call builds a
//! fresh provider with a wallet bound to the connection's sender key and
//! chain id; nothing is cached between invocations.
//!
//! [`connect`]: AlloyConnector::connect

use crate::{EvmConnector, EvmError, EvmInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use harness_types::{
	CallRequest, ChainConnection, ConfigSchema, Field, FieldType, Schema, SubmitRequest,
	TransactionHash, TransactionReceipt, ValidationError, U256,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the Alloy connector.
#[derive(Debug, Clone, Deserialize)]
pub struct AlloyConnectorConfig {
	/// Receipt poll interval in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
	2_000
}

impl Default for AlloyConnectorConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: default_poll_interval_ms(),
		}
	}
}

/// Configuration schema for the Alloy connector.
pub struct AlloyConnectorSchema;

impl ConfigSchema for AlloyConnectorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"poll_interval_ms",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			)],
		);
		schema.validate(config)
	}
}

/// Connector building Alloy-backed clients from connection parameters.
pub struct AlloyConnector {
	config: AlloyConnectorConfig,
}

impl AlloyConnector {
	pub fn new(config: AlloyConnectorConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl EvmConnector for AlloyConnector {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyConnectorSchema)
	}

	async fn connect(
		&self,
		connection: &ChainConnection,
	) -> Result<Box<dyn EvmInterface>, EvmError> {
		let url = connection
			.rpc_url()
			.parse()
			.map_err(|e| EvmError::Rpc(format!("Invalid RPC URL: {}", e)))?;

		let signer: PrivateKeySigner = connection
			.sender_private_key
			.expose_secret()
			.parse()
			.map_err(|_| EvmError::InvalidKey)?;
		let sender = signer.address();

		let chain_signer = signer.with_chain_id(Some(connection.chain_id));
		let wallet = EthereumWallet::from(chain_signer);

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		provider
			.client()
			.set_poll_interval(Duration::from_millis(self.config.poll_interval_ms));

		tracing::debug!(
			network = %connection.network_name,
			chain_id = connection.chain_id,
			sender = %sender,
			"Connected EVM client"
		);

		Ok(Box::new(AlloyEvm {
			provider: Arc::new(provider),
			sender,
			poll_interval: Duration::from_millis(self.config.poll_interval_ms),
		}))
	}
}

/// Alloy-based EVM client bound to one endpoint and sender.
pub struct AlloyEvm {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	sender: Address,
	poll_interval: Duration,
}

impl AlloyEvm {
	/// Builds an Alloy transaction request from a submission request.
	fn to_transaction_request(&self, request: &SubmitRequest) -> TransactionRequest {
		let mut tx = TransactionRequest::default()
			.to(request.to)
			.input(request.input.clone().into());
		tx.from = Some(self.sender);
		tx.gas = Some(request.gas_limit);
		tx.gas_price = request.gas_price;
		tx.nonce = request.nonce;
		tx
	}
}

#[async_trait]
impl EvmInterface for AlloyEvm {
	fn sender(&self) -> Address {
		self.sender
	}

	async fn transaction_count(&self, address: Address) -> Result<u64, EvmError> {
		self.provider
			.get_transaction_count(address)
			.await
			.map_err(|e| EvmError::Rpc(format!("Failed to get transaction count: {}", e)))
	}

	async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, EvmError> {
		let mut tx = TransactionRequest::default()
			.to(request.to)
			.input(request.input.clone().into());
		tx.from = Some(request.from);
		tx.gas = request.gas_limit;
		tx.gas_price = request.gas_price;
		tx.nonce = request.nonce;

		match self.provider.call(&tx).await {
			Ok(bytes) => Ok(bytes.to_vec()),
			// An error response means the node simulated the call and
			// rejected it; anything else is transport trouble.
			Err(e) => match e.as_error_resp() {
				Some(payload) => Err(EvmError::Execution(payload.message.to_string())),
				None => Err(EvmError::Rpc(e.to_string())),
			},
		}
	}

	async fn submit(&self, request: &SubmitRequest) -> Result<TransactionHash, EvmError> {
		let tx = self.to_transaction_request(request);

		let pending = self
			.provider
			.send_transaction(tx)
			.await
			.map_err(|e| EvmError::Rpc(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending.tx_hash();
		tracing::info!(
			tx_hash = %harness_types::with_0x_prefix(&hex::encode(tx_hash.0)),
			to = %request.to,
			"Submitted transaction"
		);

		Ok(TransactionHash(tx_hash.0.to_vec()))
	}

	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
		timeout: Duration,
	) -> Result<TransactionReceipt, EvmError> {
		let tx_hash = alloy_primitives::FixedBytes::<32>::from_slice(&hash.0);
		let start = tokio::time::Instant::now();

		loop {
			if start.elapsed() > timeout {
				return Err(EvmError::Timeout(timeout));
			}

			match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => {
					return Ok(TransactionReceipt {
						hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
						block_number: receipt.block_number.unwrap_or(0),
						success: receipt.status(),
					});
				},
				Ok(None) => {
					// Not yet mined, wait and retry.
					tokio::time::sleep(self.poll_interval).await;
				},
				Err(e) => {
					return Err(EvmError::Rpc(format!("Failed to get receipt: {}", e)));
				},
			}
		}
	}

	async fn native_balance(&self, address: Address) -> Result<U256, EvmError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| EvmError::Rpc(format!("Failed to get balance: {}", e)))
	}
}

/// Registry for the Alloy EVM implementation.
pub struct Registry;

impl harness_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "alloy";
	type Factory = crate::EvmConnectorFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn EvmConnector>, EvmError> {
			AlloyConnectorSchema
				.validate(config)
				.map_err(|e| EvmError::Config(e.to_string()))?;
			let connector_config: AlloyConnectorConfig = config
				.clone()
				.try_into()
				.map_err(|e| EvmError::Config(format!("Invalid alloy config: {}", e)))?;
			Ok(Box::new(AlloyConnector::new(connector_config)))
		}
	}
}

impl crate::EvmRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use harness_types::ImplementationRegistry;

	#[test]
	fn test_schema_accepts_empty_table() {
		let config: toml::Value = toml::from_str("").unwrap();
		assert!(AlloyConnectorSchema.validate(&config).is_ok());
	}

	#[test]
	fn test_schema_rejects_zero_poll_interval() {
		let config: toml::Value = toml::from_str("poll_interval_ms = 0").unwrap();
		assert!(AlloyConnectorSchema.validate(&config).is_err());
	}

	#[test]
	fn test_factory_defaults() {
		let config: toml::Value = toml::from_str("").unwrap();
		assert!(Registry::factory()(&config).is_ok());
	}

	#[test]
	fn test_factory_rejects_bad_type() {
		let config: toml::Value = toml::from_str("poll_interval_ms = \"fast\"").unwrap();
		assert!(Registry::factory()(&config).is_err());
	}
}
