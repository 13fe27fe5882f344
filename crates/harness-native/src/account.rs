//! EVM/native account mapping.
//!
//! The runtime maps EVM callers into native accounts with a hashed
//! mapping: `blake2_256("evm:" ++ address)`. Verification code needs the
//! same mapping to read the native records a dispatched call touched, and
//! the SS58 conversions to accept operator-supplied native addresses.

use crate::NativeError;
use alloy_primitives::Address;
use sp_core::crypto::{AccountId32, Ss58AddressFormat, Ss58Codec};
use sp_core::hashing::blake2_256;

/// Maps an EVM address to the native account the runtime dispatches as.
pub fn evm_to_native(address: Address) -> AccountId32 {
	let mut data = [0u8; 24];
	data[..4].copy_from_slice(b"evm:");
	data[4..].copy_from_slice(address.as_slice());
	AccountId32::new(blake2_256(&data))
}

/// Renders a native account in SS58 form with the given network prefix.
pub fn to_ss58(account: &AccountId32, prefix: u16) -> String {
	account.to_ss58check_with_version(Ss58AddressFormat::custom(prefix))
}

/// Parses an SS58 address, returning the account and its network prefix.
pub fn parse_ss58(address: &str) -> Result<(AccountId32, u16), NativeError> {
	let (account, format) = AccountId32::from_ss58check_with_version(address)
		.map_err(|e| NativeError::Account(format!("Invalid SS58 address: {:?}", e)))?;
	Ok((account, format.into()))
}

/// Derives the EVM address of an asset's XC-20 precompile.
///
/// Asset precompiles live in the reserved `0xFFFFFFFF…` range: four 0xFF
/// prefix bytes followed by the big-endian asset id.
pub fn xc20_address(asset_id: u128) -> Address {
	let mut bytes = [0u8; 20];
	bytes[..4].copy_from_slice(&[0xff; 4]);
	bytes[4..].copy_from_slice(&asset_id.to_be_bytes());
	Address::from(bytes)
}
