//! Substrate JSON-RPC native state reader.
//!
//! Reads runtime storage directly through `state_getStorage`, building
//! the keys the same way the runtime does: `twox128(pallet) ++
//! twox128(item) ++ blake2_128_concat(encoded map key)`, then
//! SCALE-decoding the returned value.

use crate::{AccountInfo, DidDocument, NativeError, NativeStateInterface};
use alloy_primitives::Address;
use async_trait::async_trait;
use harness_types::{
	with_0x_prefix, without_0x_prefix, ConfigSchema, Field, FieldType, Schema, ValidationError,
};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use parity_scale_codec::{Decode, Encode};
use serde::Deserialize;
use sp_core::crypto::AccountId32;
use sp_core::hashing::{blake2_128, twox_128};

/// Configuration for the Substrate reader.
#[derive(Debug, Clone, Deserialize)]
pub struct SubstrateReaderConfig {
	#[serde(default = "default_rpc_host")]
	pub rpc_host: String,
	/// Port of the node's native JSON-RPC endpoint.
	pub rpc_port: u16,
	/// Name of the DID pallet as it appears in storage key prefixes.
	#[serde(default = "default_did_pallet")]
	pub did_pallet: String,
}

fn default_rpc_host() -> String {
	harness_types::DEFAULT_RPC_HOST.to_string()
}

fn default_did_pallet() -> String {
	"DID".to_string()
}

/// Configuration schema for the Substrate reader.
pub struct SubstrateReaderSchema;

impl ConfigSchema for SubstrateReaderSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new(
				"rpc_port",
				FieldType::Integer {
					min: Some(1),
					max: Some(65_535),
				},
			)],
			vec![
				Field::new("rpc_host", FieldType::String),
				Field::new("did_pallet", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Builds a storage key for a `Blake2_128Concat` map entry.
fn map_storage_key(pallet: &str, item: &str, encoded_key: &[u8]) -> Vec<u8> {
	let mut key = twox_128(pallet.as_bytes()).to_vec();
	key.extend_from_slice(&twox_128(item.as_bytes()));
	key.extend_from_slice(&blake2_128(encoded_key));
	key.extend_from_slice(encoded_key);
	key
}

// SCALE mirror of the DID pallet's Document and its method wrappers.
#[derive(Decode)]
struct RawAuthentication {
	controller: sp_core::H160,
}

#[derive(Decode)]
struct RawAssertion {
	controller: sp_core::H160,
}

#[derive(Decode)]
struct RawDocument {
	controller: AccountId32,
	authentication: RawAuthentication,
	assertion_method: Option<RawAssertion>,
	services: Vec<[u8; 32]>,
}

impl From<RawDocument> for DidDocument {
	fn from(raw: RawDocument) -> Self {
		DidDocument {
			controller: raw.controller,
			authentication: Address::from_slice(raw.authentication.controller.as_bytes()),
			assertion: raw
				.assertion_method
				.map(|a| Address::from_slice(a.controller.as_bytes())),
			service_keys: raw.services,
		}
	}
}

/// Native state reader backed by a node's JSON-RPC endpoint.
pub struct SubstrateReader {
	client: HttpClient,
	did_pallet: String,
}

impl SubstrateReader {
	pub fn new(config: SubstrateReaderConfig) -> Result<Self, NativeError> {
		let url = format!("http://{}:{}", config.rpc_host, config.rpc_port);
		let client = HttpClientBuilder::default()
			.build(&url)
			.map_err(|e| NativeError::Rpc(format!("Failed to build RPC client: {}", e)))?;
		Ok(Self {
			client,
			did_pallet: config.did_pallet,
		})
	}

	/// Fetches raw storage bytes at a key, `None` if the key is empty.
	async fn get_storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>, NativeError> {
		let key_hex = with_0x_prefix(&hex::encode(key));
		let value: Option<String> = self
			.client
			.request("state_getStorage", rpc_params![&key_hex])
			.await
			.map_err(|e| NativeError::Rpc(format!("state_getStorage failed: {}", e)))?;
		tracing::debug!(key = %key_hex, found = value.is_some(), "Storage read");

		value
			.map(|v| {
				hex::decode(without_0x_prefix(&v))
					.map_err(|e| NativeError::Decode(format!("Invalid storage hex: {}", e)))
			})
			.transpose()
	}
}

#[async_trait]
impl NativeStateInterface for SubstrateReader {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SubstrateReaderSchema)
	}

	async fn account_info(
		&self,
		account: &AccountId32,
	) -> Result<Option<AccountInfo>, NativeError> {
		let key = map_storage_key("System", "Account", &account.encode());
		let Some(bytes) = self.get_storage(&key).await? else {
			return Ok(None);
		};
		let info = AccountInfo::decode(&mut &bytes[..])
			.map_err(|e| NativeError::Decode(format!("Bad AccountInfo: {}", e)))?;
		Ok(Some(info))
	}

	async fn did_document(
		&self,
		account: &AccountId32,
	) -> Result<Option<DidDocument>, NativeError> {
		let key = map_storage_key(&self.did_pallet, "Did", &account.encode());
		let Some(bytes) = self.get_storage(&key).await? else {
			return Ok(None);
		};
		let raw = RawDocument::decode(&mut &bytes[..])
			.map_err(|e| NativeError::Decode(format!("Bad DID document: {}", e)))?;
		Ok(Some(raw.into()))
	}
}

/// Registry for the Substrate reader implementation.
pub struct Registry;

impl harness_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "substrate";
	type Factory = crate::NativeReaderFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn NativeStateInterface>, NativeError> {
			SubstrateReaderSchema
				.validate(config)
				.map_err(|e| NativeError::Config(e.to_string()))?;
			let reader_config: SubstrateReaderConfig = config
				.clone()
				.try_into()
				.map_err(|e| NativeError::Config(format!("Invalid substrate config: {}", e)))?;
			Ok(Box::new(SubstrateReader::new(reader_config)?))
		}
	}
}

impl crate::NativeRegistry for Registry {}
