//! EVM transaction client module for the precompile dispatch harness.
//!
//! This module defines the seam between the harness and the chain's
//! Ethereum-compatible JSON-RPC surface: nonce lookup, dry-run calls,
//! signed submission and receipt polling. The dispatch bridge and the
//! action harness only ever talk to the chain through these traits, so
//! every client is constructed fresh from a [`ChainConnection`] at the
//! point of use and never shared across invocations.

use async_trait::async_trait;
use harness_types::{
	Address, CallRequest, ChainConnection, ConfigSchema, ImplementationRegistry, SubmitRequest,
	TransactionHash, TransactionReceipt, U256,
};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod alloy;
	pub mod mock;
}

/// Errors that can occur during EVM client operations.
#[derive(Debug, Error)]
pub enum EvmError {
	/// Error that occurs during network communication with the node.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// Error reported by the node while executing a call.
	///
	/// Distinct from [`EvmError::Rpc`]: the request reached the node and
	/// was simulated, but execution was rejected.
	#[error("Execution rejected: {0}")]
	Execution(String),
	/// Error that occurs when a receipt does not arrive within the bound.
	#[error("Timed out after {0:?} waiting for receipt")]
	Timeout(Duration),
	/// Error that occurs when the sender private key cannot be parsed.
	#[error("Invalid sender private key")]
	InvalidKey,
	/// Error that occurs when implementation configuration is invalid.
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Trait defining the interface for EVM transaction clients.
///
/// A client is bound to one endpoint, one chain id and one signing key,
/// all taken from the [`ChainConnection`] it was connected from.
#[async_trait]
pub trait EvmInterface: Send + Sync {
	/// The address of the wallet-bound transaction sender.
	fn sender(&self) -> Address;

	/// Returns the current transaction count (next nonce) for an address.
	///
	/// This is a plain read with no ordering guarantee relative to
	/// concurrent submissions from the same account.
	async fn transaction_count(&self, address: Address) -> Result<u64, EvmError>;

	/// Executes a call against current state without committing anything.
	///
	/// Used both for contract reads and for dry-running a transaction
	/// before submission. Execution rejection surfaces as
	/// [`EvmError::Execution`] carrying the node's reported reason.
	async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, EvmError>;

	/// Signs and submits a transaction, returning its hash.
	///
	/// When `request.nonce` is `None` the client resolves the next
	/// account nonce itself; callers needing explicit sequencing pass
	/// `Some`.
	async fn submit(&self, request: &SubmitRequest) -> Result<TransactionHash, EvmError>;

	/// Waits until the transaction is included and a receipt is available.
	///
	/// Polls the node until the receipt appears or `timeout` elapses,
	/// in which case [`EvmError::Timeout`] is returned. The transaction
	/// may still land later; the caller decides what to do with that.
	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
		timeout: Duration,
	) -> Result<TransactionReceipt, EvmError>;

	/// Returns the native (EVM-side) balance of an address.
	async fn native_balance(&self, address: Address) -> Result<U256, EvmError>;
}

/// Trait for constructing EVM clients from connection parameters.
///
/// Connectors are the configured, long-lived half of the seam; the
/// clients they hand out are per-invocation and never cached.
#[async_trait]
pub trait EvmConnector: Send + Sync {
	/// Returns the configuration schema for this connector implementation.
	///
	/// The schema is used to validate the implementation's TOML table
	/// before the connector is constructed.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Builds a fresh client (endpoint + signer) for one connection.
	async fn connect(&self, connection: &ChainConnection) -> Result<Box<dyn EvmInterface>, EvmError>;
}

/// Type alias for EVM connector factory functions.
///
/// This is the function signature that all EVM implementations must provide
/// to create instances of their connector.
pub type EvmConnectorFactory = fn(&toml::Value) -> Result<Box<dyn EvmConnector>, EvmError>;

/// Registry trait for EVM connector implementations.
///
/// This trait extends the base ImplementationRegistry to specify that
/// EVM implementations must provide an EvmConnectorFactory.
pub trait EvmRegistry: ImplementationRegistry<Factory = EvmConnectorFactory> {}

/// Get all registered EVM connector implementations.
///
/// Returns a vector of (name, factory) tuples for all available
/// implementations, used by the runner's factory registry.
pub fn get_all_implementations() -> Vec<(&'static str, EvmConnectorFactory)> {
	use implementations::{alloy, mock};

	vec![
		(alloy::Registry::NAME, alloy::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}
