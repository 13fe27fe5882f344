//! Main entry point for the precompile harness runner.
//!
//! This binary loads a TOML configuration and a scenario file, wires up
//! the configured EVM client and native state reader implementations,
//! and runs the scenario's steps in order against the chain. Every step
//! reports pass/fail individually; the process exits non-zero if any
//! step failed.

use clap::Parser;
use harness_actions::{ActionDefaults, ActionRunner};
use harness_config::Config;
use harness_dispatch::DispatchService;
use harness_evm::EvmConnectorFactory;
use harness_native::NativeReaderFactory;
use harness_types::VariableStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod scenario;

use scenario::{run_scenario, Components, Scenario};

/// Command-line arguments for the harness runner.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Path to the scenario file to run
	#[arg(short, long)]
	scenario: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the harness runner.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the configured client implementations
/// 5. Runs the scenario and reports per-step results
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started harness");

	let config_path = args
		.config
		.to_str()
		.ok_or("config path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.harness.id);

	let components = build_components(config)?;

	let raw = tokio::fs::read_to_string(&args.scenario).await?;
	let scenario = Scenario::parse(&raw)?;
	tracing::info!(
		scenario = %scenario.name,
		steps = scenario.steps.len(),
		"Loaded scenario"
	);

	// Best effort: surface the sender identity and its funding before any
	// step burns gas.
	match sender_funding(&components).await {
		Ok((sender, balance)) => {
			tracing::info!(sender = %sender, %balance, "Sender funding");
		},
		Err(reason) => tracing::warn!(%reason, "Could not read sender funding"),
	}

	let reports = run_scenario(&components, &scenario).await;

	let mut failed = 0usize;
	for report in &reports {
		if report.passed() {
			tracing::info!(step = %report.label, index = report.index, "Step passed");
		} else {
			failed += 1;
			let reason = report.failure.as_deref().unwrap_or("unknown");
			tracing::error!(
				step = %report.label,
				index = report.index,
				reason,
				"Step failed"
			);
		}
	}
	tracing::info!(total = reports.len(), failed, "Scenario finished");

	if failed > 0 {
		std::process::exit(1);
	}
	Ok(())
}

/// Looks up a factory by the configured implementation name.
///
/// The raw implementation table from the config is passed through to the
/// factory, which validates it against its own schema; a missing table
/// is treated as empty so implementations with fully defaulted configs
/// need no stanza.
fn implementation_table(
	implementations: &HashMap<String, toml::Value>,
	name: &str,
) -> toml::Value {
	implementations
		.get(name)
		.cloned()
		.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()))
}

/// Reads the EVM-side balance of the configured sender.
async fn sender_funding(
	components: &Components,
) -> Result<(alloy_primitives::Address, alloy_primitives::U256), String> {
	let connection = components
		.config
		.connection
		.connection(components.config.precompiles.dispatch);
	let evm = components
		.evm
		.connect(&connection)
		.await
		.map_err(|e| e.to_string())?;
	let sender = evm.sender();
	let balance = evm
		.native_balance(sender)
		.await
		.map_err(|e| e.to_string())?;
	Ok((sender, balance))
}

/// Builds the scenario components from the loaded configuration.
fn build_components(config: Config) -> Result<Components, Box<dyn std::error::Error>> {
	let evm_factories: HashMap<&'static str, EvmConnectorFactory> =
		harness_evm::get_all_implementations().into_iter().collect();
	let native_factories: HashMap<&'static str, NativeReaderFactory> =
		harness_native::get_all_implementations()
			.into_iter()
			.collect();

	let evm_name = config.evm.implementation.as_str();
	let evm_factory = evm_factories
		.get(evm_name)
		.ok_or_else(|| format!("unknown EVM implementation '{}'", evm_name))?;
	let evm = evm_factory(&implementation_table(&config.evm.implementations, evm_name))?;
	let evm: Arc<dyn harness_evm::EvmConnector> = Arc::from(evm);

	let native_name = config.native.implementation.as_str();
	let native_factory = native_factories
		.get(native_name)
		.ok_or_else(|| format!("unknown native implementation '{}'", native_name))?;
	let native = native_factory(&implementation_table(
		&config.native.implementations,
		native_name,
	))?;

	let receipt_timeout = Duration::from_secs(config.harness.receipt_timeout_secs);
	let actions = ActionRunner::new(
		Arc::clone(&evm),
		ActionDefaults {
			gas_limit: config.harness.action_gas_limit,
			receipt_timeout,
		},
		VariableStore::new(),
	);
	let dispatch = DispatchService::new(Arc::clone(&evm), receipt_timeout);

	Ok(Components {
		config,
		evm,
		native: Arc::from(native),
		actions,
		dispatch,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	const CONFIG: &str = r#"
[harness]
id = "devnet"

[connection]
network_name = "devnet"
rpc_port = 9933
chain_id = 688
sender_private_key = "0x0101010101010101010101010101010101010101010101010101010101010101"

[evm]
implementation = "mock"

[native]
implementation = "mock"
"#;

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			scenario: PathBuf::from("scenarios/smoke.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_build_components_with_mock_implementations() {
		let config: Config = CONFIG.parse().unwrap();

		let components = build_components(config).expect("build failed");
		assert_eq!(components.config.harness.id, "devnet");
	}

	#[test]
	fn test_build_components_rejects_unknown_implementation() {
		let mut config: Config = CONFIG.parse().unwrap();
		config.evm.implementation = "websocket".to_string();

		let err = match build_components(config) {
			Ok(_) => panic!("unknown implementation accepted"),
			Err(e) => e.to_string(),
		};
		assert!(err.contains("websocket"), "unexpected error: {}", err);
	}

	#[test]
	fn test_missing_implementation_table_defaults_to_empty() {
		let table = implementation_table(&HashMap::new(), "mock");
		assert!(matches!(table, toml::Value::Table(ref t) if t.is_empty()));
	}

	#[tokio::test]
	async fn test_sender_funding_reads_mock_balance() {
		let config: Config = CONFIG.parse().unwrap();
		let components = build_components(config).expect("build failed");

		let (_, balance) = sender_funding(&components).await.expect("funding read");
		// The factory-built mock starts with an unfunded sender.
		assert_eq!(balance, alloy_primitives::U256::ZERO);
	}

	#[tokio::test]
	async fn test_config_loads_from_file() {
		let dir = tempdir().expect("Failed to create temp dir");
		let path = dir.path().join("config.toml");
		std::fs::write(&path, CONFIG).expect("Failed to write config");

		let config = Config::from_file(path.to_str().unwrap())
			.await
			.expect("Failed to load config");
		assert_eq!(config.harness.id, "devnet");
		assert_eq!(config.connection.chain_id, 688);
		assert_eq!(config.evm.implementation, "mock");
	}
}
