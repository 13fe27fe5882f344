//! Native state reader module for the precompile dispatch harness.
//!
//! Dispatch effects are verified from the native side of the chain: free
//! balances from the system account record, DID documents from the DID
//! pallet's storage. This module defines the reader seam and the account
//! mapping helpers shared by verification code. Readers are used for
//! verification only, never for dispatch.

use async_trait::async_trait;
use harness_types::{Address, ConfigSchema, ImplementationRegistry};
use parity_scale_codec::{Decode, Encode};
use sp_core::crypto::AccountId32;
use thiserror::Error;

/// EVM/native account mapping and address form conversions.
pub mod account;

/// Re-export implementations
pub mod implementations {
	pub mod mock;
	pub mod substrate;
}

/// Errors that can occur during native state reads.
#[derive(Debug, Error)]
pub enum NativeError {
	/// Error that occurs during communication with the native RPC.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// Error that occurs when stored bytes fail to SCALE-decode.
	#[error("Decode error: {0}")]
	Decode(String),
	/// Error that occurs when an address form cannot be parsed or mapped.
	#[error("Account error: {0}")]
	Account(String),
	/// Error that occurs when implementation configuration is invalid.
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Balance bookkeeping of one native account.
///
/// SCALE layout of the runtime's `AccountData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Decode, Encode)]
pub struct AccountData {
	pub free: u128,
	pub reserved: u128,
	pub frozen: u128,
	pub flags: u128,
}

/// One native account's system record.
///
/// SCALE layout of `frame_system::AccountInfo`, the value stored under
/// `System/Account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Decode, Encode)]
pub struct AccountInfo {
	pub nonce: u32,
	pub consumers: u32,
	pub providers: u32,
	pub sufficients: u32,
	pub data: AccountData,
}

/// A DID record as stored by the DID pallet.
///
/// Flattened from the pallet's `Document`: the authentication and
/// assertion methods are single EVM-style addresses, services are stored
/// by key with the document holding the key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidDocument {
	pub controller: AccountId32,
	pub authentication: Address,
	pub assertion: Option<Address>,
	pub service_keys: Vec<[u8; 32]>,
}

/// Trait defining the interface for native state readers.
#[async_trait]
pub trait NativeStateInterface: Send + Sync {
	/// Returns the configuration schema for this reader implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Reads the system account record, `None` for untouched accounts.
	async fn account_info(&self, account: &AccountId32) -> Result<Option<AccountInfo>, NativeError>;

	/// Reads the DID document anchored at an account, if one exists.
	async fn did_document(&self, account: &AccountId32)
		-> Result<Option<DidDocument>, NativeError>;

	/// The free balance of an account, zero for untouched accounts.
	async fn free_balance(&self, account: &AccountId32) -> Result<u128, NativeError> {
		Ok(self
			.account_info(account)
			.await?
			.map(|info| info.data.free)
			.unwrap_or(0))
	}
}

/// Type alias for native reader factory functions.
pub type NativeReaderFactory =
	fn(&toml::Value) -> Result<Box<dyn NativeStateInterface>, NativeError>;

/// Registry trait for native reader implementations.
pub trait NativeRegistry: ImplementationRegistry<Factory = NativeReaderFactory> {}

/// Get all registered native reader implementations.
pub fn get_all_implementations() -> Vec<(&'static str, NativeReaderFactory)> {
	use implementations::{mock, substrate};

	vec![
		(substrate::Registry::NAME, substrate::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}
