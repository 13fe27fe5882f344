//! Configuration module for the precompile dispatch harness.
//!
//! This module provides structures and utilities for loading harness
//! configuration from TOML files, resolving `${VAR}` / `${VAR:-default}`
//! environment references and validating that all required values are set
//! before any client is constructed.

use std::collections::HashMap;
use std::str::FromStr;

use harness_types::{Address, CallIndices, ChainConnection, SecretString};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the harness.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Harness-wide settings.
	pub harness: HarnessConfig,
	/// The chain endpoint and sender identity.
	pub connection: ConnectionConfig,
	/// Precompile addresses per contract family.
	#[serde(default)]
	pub precompiles: PrecompileConfig,
	/// Dispatch bridge settings.
	#[serde(default)]
	pub dispatch: DispatchConfig,
	/// EVM client implementation selection.
	#[serde(default)]
	pub evm: EvmConfig,
	/// Native state reader implementation selection.
	#[serde(default)]
	pub native: NativeConfig,
}

/// Harness-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessConfig {
	/// Identifier for this harness instance, used in logs.
	pub id: String,
	/// Gas limit for action transactions unless a step overrides it.
	#[serde(default = "default_action_gas_limit")]
	pub action_gas_limit: u64,
	/// How long to wait for a submitted transaction's receipt.
	#[serde(default = "default_receipt_timeout_secs")]
	pub receipt_timeout_secs: u64,
}

fn default_action_gas_limit() -> u64 {
	250_000
}

fn default_receipt_timeout_secs() -> u64 {
	120
}

/// The chain endpoint and sender identity.
///
/// `precompile_address` is deliberately absent here; per-family connections
/// are derived with [`ConnectionConfig::connection`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
	pub network_name: String,
	#[serde(default = "default_rpc_host")]
	pub rpc_host: String,
	pub rpc_port: u16,
	pub chain_id: u64,
	/// Hex-encoded sender key; supports `${VAR}` references.
	pub sender_private_key: SecretString,
	/// SS58 network prefix used when parsing native addresses.
	#[serde(default = "default_ss58_prefix")]
	pub ss58_prefix: u16,
}

fn default_rpc_host() -> String {
	harness_types::DEFAULT_RPC_HOST.to_string()
}

fn default_ss58_prefix() -> u16 {
	19
}

impl ConnectionConfig {
	/// Builds a [`ChainConnection`] targeting the given precompile.
	pub fn connection(&self, precompile_address: Address) -> ChainConnection {
		ChainConnection {
			network_name: self.network_name.clone(),
			rpc_host: self.rpc_host.clone(),
			rpc_port: self.rpc_port,
			chain_id: self.chain_id,
			sender_private_key: self.sender_private_key.clone(),
			precompile_address,
		}
	}
}

/// Precompile addresses per contract family.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrecompileConfig {
	/// The generic runtime-call dispatch precompile.
	#[serde(default = "default_dispatch_address")]
	pub dispatch: Address,
	/// DID registry precompile, required for DID actions.
	pub did: Option<Address>,
	/// XC-20 asset precompile, required for token actions.
	pub xc20: Option<Address>,
}

impl Default for PrecompileConfig {
	fn default() -> Self {
		Self {
			dispatch: default_dispatch_address(),
			did: None,
			xc20: None,
		}
	}
}

fn default_dispatch_address() -> Address {
	// 1025, the reserved dispatch slot in the non-Ethereum precompile range
	alloy_primitives::address!("0000000000000000000000000000000000000401")
}

/// Dispatch bridge settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
	/// Gas limit for dispatch transactions.
	#[serde(default = "default_dispatch_gas_limit")]
	pub gas_limit: u64,
	/// Fixed legacy gas price for dispatch transactions.
	///
	/// Accepted as an integer or a decimal string; `toml` cannot
	/// deserialize `u128` directly.
	#[serde(
		default = "default_dispatch_gas_price",
		deserialize_with = "harness_types::u128_amount"
	)]
	pub gas_price: u128,
	/// Runtime call indices, required for scenarios with dispatch steps.
	pub call_indices: Option<CallIndices>,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			gas_limit: default_dispatch_gas_limit(),
			gas_price: default_dispatch_gas_price(),
			call_indices: None,
		}
	}
}

fn default_dispatch_gas_limit() -> u64 {
	256_000
}

fn default_dispatch_gas_price() -> u128 {
	// 0x10000000000, the fixed price launched test networks accept
	1_099_511_627_776
}

/// EVM client implementation selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmConfig {
	/// Which implementation to construct clients from.
	#[serde(default = "default_evm_implementation")]
	pub implementation: String,
	/// Map of implementation names to their raw configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

impl Default for EvmConfig {
	fn default() -> Self {
		Self {
			implementation: default_evm_implementation(),
			implementations: HashMap::new(),
		}
	}
}

fn default_evm_implementation() -> String {
	"alloy".to_string()
}

/// Native state reader implementation selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NativeConfig {
	/// Which implementation to construct readers from.
	#[serde(default = "default_native_implementation")]
	pub implementation: String,
	/// Map of implementation names to their raw configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

impl Default for NativeConfig {
	fn default() -> Self {
		Self {
			implementation: default_native_implementation(),
			implementations: HashMap::new(),
		}
	}
}

fn default_native_implementation() -> String {
	"substrate".to_string()
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to bound the regex scan.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment references.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		raw.parse()
	}

	/// Validates the configuration before anything is constructed from it.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.harness.id.is_empty() {
			return Err(ConfigError::Validation(
				"Harness ID cannot be empty".into(),
			));
		}
		if self.harness.action_gas_limit == 0 {
			return Err(ConfigError::Validation(
				"harness.action_gas_limit must be greater than 0".into(),
			));
		}
		if self.harness.receipt_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"harness.receipt_timeout_secs must be greater than 0".into(),
			));
		}

		if self.connection.network_name.is_empty() {
			return Err(ConfigError::Validation(
				"connection.network_name cannot be empty".into(),
			));
		}
		if self.connection.rpc_port == 0 {
			return Err(ConfigError::Validation(
				"connection.rpc_port must be greater than 0".into(),
			));
		}
		if self.connection.chain_id == 0 {
			return Err(ConfigError::Validation(
				"connection.chain_id must be greater than 0".into(),
			));
		}
		if self.connection.sender_private_key.is_empty() {
			return Err(ConfigError::Validation(
				"connection.sender_private_key cannot be empty".into(),
			));
		}

		if self.dispatch.gas_limit == 0 {
			return Err(ConfigError::Validation(
				"dispatch.gas_limit must be greater than 0".into(),
			));
		}
		if self.dispatch.gas_price == 0 {
			return Err(ConfigError::Validation(
				"dispatch.gas_price must be greater than 0".into(),
			));
		}

		if self.evm.implementation.is_empty() {
			return Err(ConfigError::Validation(
				"evm.implementation cannot be empty".into(),
			));
		}
		if self.native.implementation.is_empty() {
			return Err(ConfigError::Validation(
				"native.implementation cannot be empty".into(),
			));
		}

		Ok(())
	}
}

/// Parses a configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL_CONFIG: &str = r#"
[harness]
id = "devnet-harness"

[connection]
network_name = "watr-devnet"
rpc_port = 9933
chain_id = 688
sender_private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL_CONFIG.parse().unwrap();

		assert_eq!(config.harness.action_gas_limit, 250_000);
		assert_eq!(config.harness.receipt_timeout_secs, 120);
		assert_eq!(config.connection.rpc_host, "127.0.0.1");
		assert_eq!(config.connection.ss58_prefix, 19);
		assert_eq!(config.dispatch.gas_limit, 256_000);
		assert_eq!(config.dispatch.gas_price, 0x10000000000);
		assert_eq!(config.evm.implementation, "alloy");
		assert_eq!(config.native.implementation, "substrate");
		assert_eq!(
			config.precompiles.dispatch,
			alloy_primitives::address!("0000000000000000000000000000000000000401")
		);
		assert!(config.precompiles.did.is_none());
	}

	#[test]
	fn test_full_config_parses() {
		let config_str = r#"
[harness]
id = "devnet-harness"
action_gas_limit = 300000
receipt_timeout_secs = 60

[connection]
network_name = "watr-devnet"
rpc_host = "127.0.0.1"
rpc_port = 9933
chain_id = 688
sender_private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
ss58_prefix = 19

[precompiles]
dispatch = "0x0000000000000000000000000000000000000401"
did = "0x0000000000000000000000000000000000000402"
xc20 = "0xffffffff00000000000000000000000000000834"

[dispatch]
gas_limit = 256000
gas_price = 1099511627776

[dispatch.call_indices.balances_transfer]
pallet = 10
call = 0

[dispatch.call_indices.did_create]
pallet = 60
call = 0

[evm]
implementation = "alloy"

[evm.implementations.alloy]
poll_interval_ms = 2000

[native]
implementation = "substrate"

[native.implementations.substrate]
rpc_port = 9933
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.harness.action_gas_limit, 300_000);
		let indices = config.dispatch.call_indices.expect("indices set");
		assert_eq!(indices.balances_transfer.pallet, 10);
		assert_eq!(indices.did_create.pallet, 60);
		assert!(config.evm.implementations.contains_key("alloy"));
		assert!(config.precompiles.xc20.is_some());
	}

	#[test]
	fn test_gas_price_accepts_integer_and_string() {
		let integer = format!("{}\n[dispatch]\ngas_price = 1099511627776", MINIMAL_CONFIG);
		let config: Config = integer.parse().unwrap();
		assert_eq!(config.dispatch.gas_price, 0x10000000000);

		// Full-precision prices exceed TOML's i64 range and must be quoted.
		let quoted = format!(
			"{}\n[dispatch]\ngas_price = \"340282366920938463463374607431768211455\"",
			MINIMAL_CONFIG
		);
		let config: Config = quoted.parse().unwrap();
		assert_eq!(config.dispatch.gas_price, u128::MAX);
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TEST_HARNESS_PORT", "9944");

		let input = "rpc_port = ${TEST_HARNESS_PORT}";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "rpc_port = 9944");

		std::env::remove_var("TEST_HARNESS_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${MISSING_HARNESS_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${MISSING_HARNESS_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("MISSING_HARNESS_VAR"));
	}

	#[test]
	fn test_key_from_env_var() {
		std::env::set_var(
			"TEST_HARNESS_KEY",
			"0x5fb92d6e98884f76de468fa3f6278f8807c48bebc13595d45af5bdc4da702133",
		);

		let config_str = r#"
[harness]
id = "devnet-harness"

[connection]
network_name = "watr-devnet"
rpc_port = 9933
chain_id = 688
sender_private_key = "${TEST_HARNESS_KEY}"
"#;
		let config: Config = config_str.parse().unwrap();
		assert_eq!(
			config.connection.sender_private_key.expose_secret(),
			"0x5fb92d6e98884f76de468fa3f6278f8807c48bebc13595d45af5bdc4da702133"
		);

		std::env::remove_var("TEST_HARNESS_KEY");
	}

	#[test]
	fn test_empty_id_rejected() {
		let config_str = MINIMAL_CONFIG.replace("devnet-harness", "");
		let result: Result<Config, _> = config_str.parse();
		assert!(result.is_err());
	}

	#[test]
	fn test_zero_timeout_rejected() {
		let broken = MINIMAL_CONFIG.replace(
			"id = \"devnet-harness\"",
			"id = \"devnet-harness\"\nreceipt_timeout_secs = 0",
		);
		assert!(broken.parse::<Config>().is_err());
	}

	#[test]
	fn test_connection_builder_targets_precompile() {
		let config: Config = MINIMAL_CONFIG.parse().unwrap();
		let connection = config.connection.connection(config.precompiles.dispatch);
		assert_eq!(connection.rpc_url(), "http://127.0.0.1:9933");
		assert_eq!(connection.chain_id, 688);
		assert_eq!(
			connection.precompile_address,
			config.precompiles.dispatch
		);
	}

	#[tokio::test]
	async fn test_from_file() {
		use std::io::Write;

		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(MINIMAL_CONFIG.as_bytes()).unwrap();

		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.harness.id, "devnet-harness");
	}
}
