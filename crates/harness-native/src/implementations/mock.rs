//! In-memory native state for tests and offline runs.

use crate::{AccountData, AccountInfo, DidDocument, NativeError, NativeStateInterface};
use async_trait::async_trait;
use harness_types::{ConfigSchema, Schema, ValidationError};
use sp_core::crypto::AccountId32;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
	accounts: HashMap<AccountId32, AccountInfo>,
	documents: HashMap<AccountId32, DidDocument>,
	staged_credits: HashMap<AccountId32, u128>,
}

/// Mock native reader with settable balances and DID records.
///
/// Clones share state, so the same reader can be handed to the code under
/// test and scripted from the test body.
#[derive(Clone, Default)]
pub struct MockNativeReader {
	state: Arc<Mutex<MockState>>,
}

impl MockNativeReader {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets an account's free balance, creating the record if needed.
	pub fn set_free_balance(&self, account: AccountId32, free: u128) {
		let mut state = self.state.lock().unwrap();
		let info = state.accounts.entry(account).or_insert_with(|| AccountInfo {
			providers: 1,
			..Default::default()
		});
		info.data = AccountData {
			free,
			..info.data
		};
	}

	/// Credits an account, as an included balances transfer would.
	pub fn credit(&self, account: &AccountId32, amount: u128) {
		let mut state = self.state.lock().unwrap();
		let info = state
			.accounts
			.entry(account.clone())
			.or_insert_with(|| AccountInfo {
				providers: 1,
				..Default::default()
			});
		info.data.free = info.data.free.saturating_add(amount);
	}

	/// Stages a credit that lands after the account's next read.
	///
	/// Models a transfer included between two samples of the same
	/// account: the first read sees the old balance, later reads see
	/// the credited one.
	pub fn stage_credit(&self, account: AccountId32, amount: u128) {
		self.state
			.lock()
			.unwrap()
			.staged_credits
			.insert(account, amount);
	}

	/// Installs a DID document for an account.
	pub fn set_did_document(&self, account: AccountId32, document: DidDocument) {
		self.state.lock().unwrap().documents.insert(account, document);
	}
}

/// Configuration schema for the mock reader; any table is accepted.
pub struct MockReaderSchema;

impl ConfigSchema for MockReaderSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl NativeStateInterface for MockNativeReader {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockReaderSchema)
	}

	async fn account_info(
		&self,
		account: &AccountId32,
	) -> Result<Option<AccountInfo>, NativeError> {
		let mut state = self.state.lock().unwrap();
		let current = state.accounts.get(account).copied();
		if let Some(amount) = state.staged_credits.remove(account) {
			let info = state
				.accounts
				.entry(account.clone())
				.or_insert_with(|| AccountInfo {
					providers: 1,
					..Default::default()
				});
			info.data.free = info.data.free.saturating_add(amount);
		}
		Ok(current)
	}

	async fn did_document(
		&self,
		account: &AccountId32,
	) -> Result<Option<DidDocument>, NativeError> {
		Ok(self.state.lock().unwrap().documents.get(account).cloned())
	}
}

/// Registry for the mock native reader implementation.
pub struct Registry;

impl harness_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = crate::NativeReaderFactory;

	fn factory() -> Self::Factory {
		|_config: &toml::Value| -> Result<Box<dyn NativeStateInterface>, NativeError> {
			Ok(Box::new(MockNativeReader::new()))
		}
	}
}

impl crate::NativeRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[tokio::test]
	async fn test_balance_scripting() {
		let reader = MockNativeReader::new();
		let account = AccountId32::new([0x01; 32]);

		assert_eq!(reader.free_balance(&account).await.unwrap(), 0);
		reader.set_free_balance(account.clone(), 500);
		reader.credit(&account, 100);
		assert_eq!(reader.free_balance(&account).await.unwrap(), 600);
	}

	#[tokio::test]
	async fn test_staged_credit_lands_after_next_read() {
		let reader = MockNativeReader::new();
		let account = AccountId32::new([0x03; 32]);
		reader.set_free_balance(account.clone(), 500);
		reader.stage_credit(account.clone(), 100);

		assert_eq!(reader.free_balance(&account).await.unwrap(), 500);
		assert_eq!(reader.free_balance(&account).await.unwrap(), 600);
		// The credit lands once.
		assert_eq!(reader.free_balance(&account).await.unwrap(), 600);
	}

	#[tokio::test]
	async fn test_did_document_round_trip() {
		let reader = MockNativeReader::new();
		let account = AccountId32::new([0x02; 32]);
		let document = DidDocument {
			controller: account.clone(),
			authentication: address!("773539d4ac0e786233d90a233654ccee26a613d9"),
			assertion: None,
			service_keys: vec![],
		};

		assert!(reader.did_document(&account).await.unwrap().is_none());
		reader.set_did_document(account.clone(), document.clone());
		assert_eq!(reader.did_document(&account).await.unwrap(), Some(document));
	}
}
