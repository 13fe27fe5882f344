//! Scenario loading and execution.
//!
//! A scenario is a TOML list of steps: actions against the DID or XC-20
//! precompiles, and raw dispatches through the generic dispatch
//! precompile with optional before/after verification against native
//! state. Steps run strictly in order and a failed step never halts the
//! run; each step reports its own pass/fail.

use harness_actions::ActionRunner;
use harness_dispatch::{CallEncoder, DispatchService, NativeCall, ScaleCallEncoder};
use harness_native::{account, NativeStateInterface};
use harness_types::{
	opt_u128_amount, u128_amount, ActionFamily, Address, ChainConnection, DidService,
	MethodPayload, VerificationSample,
};
use serde::Deserialize;
use sp_core::crypto::AccountId32;
use std::sync::Arc;

/// A parsed scenario file.
#[derive(Debug, Deserialize)]
pub struct Scenario {
	/// Scenario name, used in logs and the summary.
	pub name: String,
	#[serde(default)]
	pub steps: Vec<Step>,
}

impl Scenario {
	pub fn parse(raw: &str) -> Result<Self, String> {
		toml::from_str(raw).map_err(|e| format!("Invalid scenario: {}", e.message()))
	}
}

/// One scenario step.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
	/// An action harness invocation against a contract-family precompile.
	Action {
		#[serde(flatten)]
		payload: MethodPayload,
	},
	/// A native call dispatched through the generic dispatch precompile.
	Dispatch {
		#[serde(flatten)]
		call: DispatchCallSpec,
		/// Explicit caller choice to submit without a dry run.
		#[serde(default)]
		skip_dry_run: bool,
		gas_limit: Option<u64>,
		#[serde(default, deserialize_with = "opt_u128_amount")]
		gas_price: Option<u128>,
		verify: Option<VerifySpec>,
	},
}

impl Step {
	pub fn label(&self) -> &'static str {
		match self {
			Step::Action { payload } => payload.name(),
			Step::Dispatch { call, .. } => call.name(),
		}
	}
}

/// The native call a dispatch step encodes.
///
/// Accounts are SS58 strings; a missing controller means "the dispatching
/// sender", resolved through the runtime's EVM-to-native mapping.
#[derive(Debug, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DispatchCallSpec {
	BalancesTransfer {
		dest: String,
		#[serde(deserialize_with = "u128_amount")]
		amount: u128,
	},
	DidCreate {
		controller: Option<String>,
		authentication: Address,
		assertion: Option<Address>,
		#[serde(default)]
		services: Vec<DidService>,
	},
}

impl DispatchCallSpec {
	fn name(&self) -> &'static str {
		match self {
			DispatchCallSpec::BalancesTransfer { .. } => "balances_transfer",
			DispatchCallSpec::DidCreate { .. } => "did_create",
		}
	}
}

/// Native-state assertion taken as a before/after pair around a dispatch.
#[derive(Debug, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum VerifySpec {
	/// The account's free balance grew by exactly `amount`.
	BalanceCredited {
		account: String,
		#[serde(deserialize_with = "u128_amount")]
		amount: u128,
	},
	/// A DID document exists for the account after the dispatch.
	DidExists { account: Option<String> },
}

/// Everything a scenario run needs, wired up by `main`.
pub struct Components {
	pub config: harness_config::Config,
	pub evm: Arc<dyn harness_evm::EvmConnector>,
	pub native: Arc<dyn NativeStateInterface>,
	pub actions: ActionRunner,
	pub dispatch: DispatchService,
}

/// Outcome of one executed step.
#[derive(Debug)]
pub struct StepReport {
	pub index: usize,
	pub label: String,
	/// `None` on success, the reason otherwise.
	pub failure: Option<String>,
}

impl StepReport {
	pub fn passed(&self) -> bool {
		self.failure.is_none()
	}
}

/// Runs every step of a scenario in order, never halting on failure.
pub async fn run_scenario(components: &Components, scenario: &Scenario) -> Vec<StepReport> {
	let mut reports = Vec::with_capacity(scenario.steps.len());
	for (index, step) in scenario.steps.iter().enumerate() {
		let label = step.label().to_string();
		tracing::info!(scenario = %scenario.name, step = %label, index, "Running step");

		let failure = match run_step(components, step).await {
			Ok(()) => None,
			Err(reason) => {
				tracing::warn!(step = %label, %reason, "Step failed");
				Some(reason)
			},
		};
		reports.push(StepReport {
			index,
			label,
			failure,
		});
	}
	reports
}

async fn run_step(components: &Components, step: &Step) -> Result<(), String> {
	match step {
		Step::Action { payload } => run_action(components, payload).await,
		Step::Dispatch {
			call,
			skip_dry_run,
			gas_limit,
			gas_price,
			verify,
		} => {
			run_dispatch(
				components,
				call,
				*skip_dry_run,
				*gas_limit,
				*gas_price,
				verify.as_ref(),
			)
			.await
		},
	}
}

async fn run_action(components: &Components, payload: &MethodPayload) -> Result<(), String> {
	let precompiles = &components.config.precompiles;
	let address = match payload.family() {
		ActionFamily::Did => precompiles
			.did
			.ok_or("no DID precompile configured (precompiles.did)")?,
		ActionFamily::Xc20 => precompiles
			.xc20
			.ok_or("no XC-20 precompile configured (precompiles.xc20)")?,
	};
	let connection = components.config.connection.connection(address);

	match components.actions.run(&connection, payload).await {
		result if result.is_ok() => Ok(()),
		result => Err(result
			.failure_reason()
			.unwrap_or("action failed")
			.to_string()),
	}
}

async fn run_dispatch(
	components: &Components,
	spec: &DispatchCallSpec,
	skip_dry_run: bool,
	gas_limit: Option<u64>,
	gas_price: Option<u128>,
	verify: Option<&VerifySpec>,
) -> Result<(), String> {
	let config = &components.config;
	let connection = config
		.connection
		.connection(config.precompiles.dispatch);

	let indices = config
		.dispatch
		.call_indices
		.ok_or("no runtime call indices configured (dispatch.call_indices)")?;
	let encoder = ScaleCallEncoder::new(indices);

	let call = resolve_call(components, &connection, spec).await?;
	let call_bytes = encoder.encode_call(&call).map_err(|e| e.to_string())?;

	let gas_limit = gas_limit.unwrap_or(config.dispatch.gas_limit);
	let gas_price = gas_price.unwrap_or(config.dispatch.gas_price);

	let before = match verify {
		Some(spec) => Some(sample(components, &connection, spec).await?),
		None => None,
	};

	let outcome = if skip_dry_run {
		components
			.dispatch
			.dispatch_unchecked(&connection, &call_bytes, gas_limit, gas_price)
			.await
	} else {
		components
			.dispatch
			.dispatch(&connection, &call_bytes, gas_limit, gas_price)
			.await
	}
	.map_err(|e| e.to_string())?;

	if let Some(receipt) = &outcome.receipt {
		if !receipt.success {
			return Err(format!(
				"dispatch reverted in block {}",
				receipt.block_number
			));
		}
	}

	if let Some(spec) = verify {
		let after = sample(components, &connection, spec).await?;
		check_verification(spec, VerificationSample::new(before.unwrap_or(0), after))?;
	}

	Ok(())
}

/// Resolves a call spec into a concrete native call.
async fn resolve_call(
	components: &Components,
	connection: &ChainConnection,
	spec: &DispatchCallSpec,
) -> Result<NativeCall, String> {
	match spec {
		DispatchCallSpec::BalancesTransfer { dest, amount } => {
			let (dest, _) = account::parse_ss58(dest).map_err(|e| e.to_string())?;
			Ok(NativeCall::BalancesTransfer {
				dest,
				amount: *amount,
			})
		},
		DispatchCallSpec::DidCreate {
			controller,
			authentication,
			assertion,
			services,
		} => {
			let controller = match controller {
				Some(address) => account::parse_ss58(address).map_err(|e| e.to_string())?.0,
				None => sender_account(components, connection).await?,
			};
			Ok(NativeCall::DidCreate {
				controller,
				authentication: *authentication,
				assertion: *assertion,
				services: services.clone(),
			})
		},
	}
}

/// The native account the runtime maps the EVM sender to.
async fn sender_account(
	components: &Components,
	connection: &ChainConnection,
) -> Result<AccountId32, String> {
	let evm = components
		.evm
		.connect(connection)
		.await
		.map_err(|e| e.to_string())?;
	Ok(account::evm_to_native(evm.sender()))
}

/// Takes one native-state reading for a verification spec.
///
/// Balance checks sample the free balance; existence checks sample 0/1.
async fn sample(
	components: &Components,
	connection: &ChainConnection,
	spec: &VerifySpec,
) -> Result<u128, String> {
	match spec {
		VerifySpec::BalanceCredited { account, .. } => {
			let (account, _) = account::parse_ss58(account).map_err(|e| e.to_string())?;
			components
				.native
				.free_balance(&account)
				.await
				.map_err(|e| e.to_string())
		},
		VerifySpec::DidExists { account } => {
			let account = match account {
				Some(address) => account::parse_ss58(address).map_err(|e| e.to_string())?.0,
				None => sender_account(components, connection).await?,
			};
			let document = components
				.native
				.did_document(&account)
				.await
				.map_err(|e| e.to_string())?;
			Ok(document.is_some() as u128)
		},
	}
}

fn check_verification(spec: &VerifySpec, sample: VerificationSample<u128>) -> Result<(), String> {
	match spec {
		VerifySpec::BalanceCredited { amount, .. } => match sample.credited() {
			Some(credited) if credited == *amount => Ok(()),
			Some(credited) => Err(format!(
				"expected {} credited, observed {} (before {}, after {})",
				amount, credited, sample.before, sample.after
			)),
			None => Err(format!(
				"balance decreased: before {}, after {}",
				sample.before, sample.after
			)),
		},
		VerifySpec::DidExists { .. } => {
			if sample.after == 1 {
				Ok(())
			} else {
				Err("DID document not found after dispatch".to_string())
			}
		},
	}
}
