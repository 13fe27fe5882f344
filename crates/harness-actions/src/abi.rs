//! Precompile ABI surfaces and payload encoding.
//!
//! The DID precompile exposes snake_case selectors over the standard ABI
//! encoding; the XC-20 precompile exposes the plain ERC-20 surface. Each
//! [`MethodPayload`] variant maps to exactly one method here, with its
//! fields encoded in the declared order — the mapping is fixed at build
//! time, never chosen dynamically.

use alloy_primitives::Bytes;
use alloy_sol_types::{sol, SolCall};
use harness_types::{DidService, MethodPayload};

sol! {
	/// The DID registry precompile.
	///
	/// Service entries travel as two parallel arrays: type discriminants
	/// and endpoint byte strings.
	interface DidPrecompile {
		function create_did(address controller, address authentication, address assertion, uint8[] services_types, bytes[] services_data) external returns (bool);
		function update_did(address did, address controller, address authentication, address assertion, uint8[] services_types, bytes[] services_data) external returns (bool);
		function remove_did(address did) external returns (bool);
		function add_did_services(address did, uint8[] services_types, bytes[] services_data) external returns (bool);
		function remove_did_services(address did, bytes32[] service_keys) external returns (bool);
		function issue_credentials(address issuer_did, address subject_did, bytes[] credentials, bytes32 verifiable_credential_hash) external returns (bool);
		function revoke_credentials(address issuer_did, address subject_did, bytes[] credentials) external returns (bool);
	}

	/// The ERC-20 surface of an XC-20 asset precompile.
	interface Erc20 {
		function name() external view returns (string);
		function symbol() external view returns (string);
		function totalSupply() external view returns (uint256);
		function balanceOf(address who) external view returns (uint256);
		function transfer(address to, uint256 amount) external returns (bool);
	}
}

/// Splits typed service entries into the precompile's parallel arrays.
fn split_services(services: &[DidService]) -> (Vec<u8>, Vec<Bytes>) {
	let types = services.iter().map(|s| s.type_id).collect();
	let data = services
		.iter()
		.map(|s| Bytes::from(s.endpoint.clone().into_bytes()))
		.collect();
	(types, data)
}

fn to_bytes_array(credentials: &[String]) -> Vec<Bytes> {
	credentials
		.iter()
		.map(|c| Bytes::from(c.clone().into_bytes()))
		.collect()
}

/// ABI-encodes a mutating payload into `(method name, calldata)`.
///
/// Returns `None` for read-only payloads, which never submit a
/// transaction and are handled by the read path instead.
pub fn mutating_calldata(payload: &MethodPayload) -> Option<(&'static str, Vec<u8>)> {
	let encoded = match payload {
		MethodPayload::CreateDid {
			controller,
			authentication,
			assertion,
			services,
		} => {
			let (services_types, services_data) = split_services(services);
			DidPrecompile::create_didCall {
				controller: *controller,
				authentication: *authentication,
				assertion: *assertion,
				services_types,
				services_data,
			}
			.abi_encode()
		},
		MethodPayload::UpdateDid {
			did,
			controller,
			authentication,
			assertion,
			services,
		} => {
			let (services_types, services_data) = split_services(services);
			DidPrecompile::update_didCall {
				did: *did,
				controller: *controller,
				authentication: *authentication,
				assertion: *assertion,
				services_types,
				services_data,
			}
			.abi_encode()
		},
		MethodPayload::RemoveDid { did } => {
			DidPrecompile::remove_didCall { did: *did }.abi_encode()
		},
		MethodPayload::AddDidServices { did, services } => {
			let (services_types, services_data) = split_services(services);
			DidPrecompile::add_did_servicesCall {
				did: *did,
				services_types,
				services_data,
			}
			.abi_encode()
		},
		MethodPayload::RemoveDidServices { did, service_keys } => {
			DidPrecompile::remove_did_servicesCall {
				did: *did,
				service_keys: service_keys.clone(),
			}
			.abi_encode()
		},
		MethodPayload::IssueCredentials {
			issuer_did,
			subject_did,
			credentials,
			verifiable_credential_hash,
		} => DidPrecompile::issue_credentialsCall {
			issuer_did: *issuer_did,
			subject_did: *subject_did,
			credentials: to_bytes_array(credentials),
			verifiable_credential_hash: *verifiable_credential_hash,
		}
		.abi_encode(),
		MethodPayload::RevokeCredentials {
			issuer_did,
			subject_did,
			credentials,
		} => DidPrecompile::revoke_credentialsCall {
			issuer_did: *issuer_did,
			subject_did: *subject_did,
			credentials: to_bytes_array(credentials),
		}
		.abi_encode(),
		MethodPayload::TransferToken { to, amount } => Erc20::transferCall {
			to: *to,
			amount: *amount,
		}
		.abi_encode(),
		MethodPayload::ReadTokenMetadata { .. } => return None,
	};
	Some((payload.name(), encoded))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, keccak256, B256, U256};

	#[test]
	fn test_selectors_follow_precompile_convention() {
		assert_eq!(
			DidPrecompile::create_didCall::SELECTOR,
			&keccak256(b"create_did(address,address,address,uint8[],bytes[])")[..4]
		);
		assert_eq!(
			DidPrecompile::remove_didCall::SELECTOR,
			&keccak256(b"remove_did(address)")[..4]
		);
		assert_eq!(
			Erc20::transferCall::SELECTOR,
			&keccak256(b"transfer(address,uint256)")[..4]
		);
	}

	#[test]
	fn test_transfer_calldata_layout() {
		let payload = MethodPayload::TransferToken {
			to: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
			amount: U256::from(100u64),
		};
		let (name, calldata) = mutating_calldata(&payload).unwrap();
		assert_eq!(name, "transfer_token");
		// selector + two 32-byte words
		assert_eq!(calldata.len(), 4 + 64);
		assert_eq!(&calldata[..4], Erc20::transferCall::SELECTOR);
	}

	#[test]
	fn test_services_split_into_parallel_arrays() {
		let payload = MethodPayload::CreateDid {
			controller: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
			authentication: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
			assertion: address!("3cd0a705a2dc65e5b1e1205896baa2be8a07c6e0"),
			services: vec![
				DidService {
					type_id: 1,
					endpoint: "https://a.example".to_string(),
				},
				DidService {
					type_id: 1,
					endpoint: "https://b.example".to_string(),
				},
			],
		};
		let (_, calldata) = mutating_calldata(&payload).unwrap();

		let decoded =
			DidPrecompile::create_didCall::abi_decode(&calldata, true).expect("decodes back");
		assert_eq!(decoded.services_types, vec![1, 1]);
		assert_eq!(decoded.services_data.len(), 2);
		assert_eq!(&decoded.services_data[1][..], b"https://b.example");
	}

	#[test]
	fn test_read_payload_has_no_mutating_calldata() {
		let payload = MethodPayload::ReadTokenMetadata {
			balance_of: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
		};
		assert!(mutating_calldata(&payload).is_none());
	}

	#[test]
	fn test_remove_did_services_keys_round_trip() {
		let key = B256::from([0x5a; 32]);
		let payload = MethodPayload::RemoveDidServices {
			did: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
			service_keys: vec![key],
		};
		let (_, calldata) = mutating_calldata(&payload).unwrap();
		let decoded = DidPrecompile::remove_did_servicesCall::abi_decode(&calldata, true).unwrap();
		assert_eq!(decoded.service_keys, vec![key]);
	}
}
