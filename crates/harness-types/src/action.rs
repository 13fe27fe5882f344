//! Action payloads and results.
//!
//! Every business operation the harness can perform is one variant of
//! [`MethodPayload`], with its fields typed and ordered exactly as the
//! contract method expects them. The harness maps each variant to exactly
//! one precompile method; adding an action means adding a variant and its
//! mapping, nothing else.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// One service entry attached to a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidService {
	/// Service type discriminant as the runtime encodes it.
	pub type_id: u8,
	/// Service endpoint, an arbitrary UTF-8 string (URL in practice).
	pub endpoint: String,
}

/// The contract family an action belongs to.
///
/// The runner uses this to pick which configured precompile address the
/// connection should target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFamily {
	/// DID registry precompile.
	Did,
	/// XC-20 asset precompile with the ERC-20 surface.
	Xc20,
}

/// A strongly typed action payload.
///
/// Field order within each variant is the ABI argument order of the mapped
/// contract method and must not be reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MethodPayload {
	CreateDid {
		controller: Address,
		authentication: Address,
		assertion: Address,
		services: Vec<DidService>,
	},
	UpdateDid {
		did: Address,
		controller: Address,
		authentication: Address,
		assertion: Address,
		services: Vec<DidService>,
	},
	RemoveDid {
		did: Address,
	},
	AddDidServices {
		did: Address,
		services: Vec<DidService>,
	},
	RemoveDidServices {
		did: Address,
		service_keys: Vec<B256>,
	},
	IssueCredentials {
		issuer_did: Address,
		subject_did: Address,
		credentials: Vec<String>,
		verifiable_credential_hash: B256,
	},
	RevokeCredentials {
		issuer_did: Address,
		subject_did: Address,
		credentials: Vec<String>,
	},
	TransferToken {
		to: Address,
		amount: U256,
	},
	ReadTokenMetadata {
		/// Account whose balance the metadata read reports.
		balance_of: Address,
	},
}

impl MethodPayload {
	/// The action name used in logs and scenario files.
	pub fn name(&self) -> &'static str {
		match self {
			MethodPayload::CreateDid { .. } => "create_did",
			MethodPayload::UpdateDid { .. } => "update_did",
			MethodPayload::RemoveDid { .. } => "remove_did",
			MethodPayload::AddDidServices { .. } => "add_did_services",
			MethodPayload::RemoveDidServices { .. } => "remove_did_services",
			MethodPayload::IssueCredentials { .. } => "issue_credentials",
			MethodPayload::RevokeCredentials { .. } => "revoke_credentials",
			MethodPayload::TransferToken { .. } => "transfer_token",
			MethodPayload::ReadTokenMetadata { .. } => "read_token_metadata",
		}
	}

	/// Which precompile family this payload targets.
	pub fn family(&self) -> ActionFamily {
		match self {
			MethodPayload::TransferToken { .. } | MethodPayload::ReadTokenMetadata { .. } => {
				ActionFamily::Xc20
			},
			_ => ActionFamily::Did,
		}
	}

	/// True for payloads that only read state and never submit a transaction.
	pub fn is_read(&self) -> bool {
		matches!(self, MethodPayload::ReadTokenMetadata { .. })
	}
}

/// Result of one action invocation.
///
/// This is the only shape that crosses the harness boundary; faults inside
/// an action are flattened into `Failed` with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResult {
	Ok,
	Failed { reason: String },
}

impl ActionResult {
	pub fn is_ok(&self) -> bool {
		matches!(self, ActionResult::Ok)
	}

	pub fn failure_reason(&self) -> Option<&str> {
		match self {
			ActionResult::Ok => None,
			ActionResult::Failed { reason } => Some(reason),
		}
	}
}

/// The record the token metadata read publishes.
///
/// Serialized field names match the shape consumers of the shared variable
/// store already expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
	pub name: String,
	pub symbol: String,
	pub total_supply: u128,
	pub balance_of: u128,
}
