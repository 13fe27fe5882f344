//! Native call encoding.
//!
//! A dispatched call travels as the runtime's own SCALE encoding: pallet
//! index, call index within that pallet, then the call arguments. Index
//! assignment is runtime metadata, so the encoder takes [`CallIndices`]
//! from configuration instead of baking them in.

use harness_types::{Address, CallBytes, CallIndices, DidService};
use parity_scale_codec::{Compact, Encode};
use sp_core::crypto::AccountId32;
use thiserror::Error;

/// Errors that can occur while encoding a native call.
#[derive(Debug, Error)]
pub enum EncodeError {
	/// A service carries a type id the runtime does not know.
	#[error("Unsupported service type: {0}")]
	UnsupportedServiceType(u8),
}

/// A native runtime call the harness knows how to dispatch.
///
/// One variant per call the dispatch scenarios exercise; arguments are
/// declared in the pallet's signature order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
	/// `balances.transfer(dest, amount)`.
	BalancesTransfer { dest: AccountId32, amount: u128 },
	/// `did.create_did(controller, authentication, assertion, services)`.
	DidCreate {
		controller: AccountId32,
		authentication: Address,
		assertion: Option<Address>,
		services: Vec<DidService>,
	},
}

impl NativeCall {
	/// The call name used in logs and scenario files.
	pub fn name(&self) -> &'static str {
		match self {
			NativeCall::BalancesTransfer { .. } => "balances_transfer",
			NativeCall::DidCreate { .. } => "did_create",
		}
	}
}

/// Trait for turning a structured native call into opaque call bytes.
pub trait CallEncoder: Send + Sync {
	fn encode_call(&self, call: &NativeCall) -> Result<CallBytes, EncodeError>;
}

/// SCALE encoder using configured pallet/call indices.
#[derive(Debug, Clone)]
pub struct ScaleCallEncoder {
	indices: CallIndices,
}

impl ScaleCallEncoder {
	pub fn new(indices: CallIndices) -> Self {
		Self { indices }
	}

	/// Encodes one service entry as the pallet's `ServiceInfo`.
	///
	/// The runtime enum currently has a single variant (index 0), which
	/// the EVM surface addresses as type id 1; both spellings are
	/// accepted here.
	fn encode_service(service: &DidService, out: &mut Vec<u8>) -> Result<(), EncodeError> {
		match service.type_id {
			0 | 1 => out.push(0u8),
			other => return Err(EncodeError::UnsupportedServiceType(other)),
		}
		service.endpoint.as_bytes().to_vec().encode_to(out);
		Ok(())
	}
}

impl CallEncoder for ScaleCallEncoder {
	fn encode_call(&self, call: &NativeCall) -> Result<CallBytes, EncodeError> {
		let mut bytes = Vec::new();
		match call {
			NativeCall::BalancesTransfer { dest, amount } => {
				bytes.push(self.indices.balances_transfer.pallet);
				bytes.push(self.indices.balances_transfer.call);
				// MultiAddress::Id
				bytes.push(0u8);
				dest.encode_to(&mut bytes);
				Compact(*amount).encode_to(&mut bytes);
			},
			NativeCall::DidCreate {
				controller,
				authentication,
				assertion,
				services,
			} => {
				bytes.push(self.indices.did_create.pallet);
				bytes.push(self.indices.did_create.call);
				controller.encode_to(&mut bytes);
				bytes.extend_from_slice(authentication.as_slice());
				match assertion {
					Some(address) => {
						bytes.push(1u8);
						bytes.extend_from_slice(address.as_slice());
					},
					None => bytes.push(0u8),
				}
				Compact(services.len() as u32).encode_to(&mut bytes);
				for service in services {
					Self::encode_service(service, &mut bytes)?;
				}
			},
		}
		Ok(CallBytes(bytes))
	}
}
