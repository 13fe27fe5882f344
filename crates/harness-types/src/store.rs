//! Shared variable store for scenario state.
//!
//! Read actions publish their results into named slots that later steps (or
//! the operator, through the summary) can inspect. The store is owned by the
//! runner and handed to actions by clone; clones share the same slots.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Slot the token metadata read action publishes into.
pub const ASSET_METADATA_SLOT: &str = "$asset_metadata";

/// A named-slot store shared across scenario steps.
///
/// Writers replace the whole slot value in one call; there is no partial
/// update, which keeps concurrent readers from ever observing a half-built
/// record.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
	slots: Arc<RwLock<HashMap<String, Value>>>,
}

impl VariableStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the value of `slot` in one write.
	pub async fn set(&self, slot: &str, value: Value) {
		let mut slots = self.slots.write().await;
		slots.insert(slot.to_string(), value);
	}

	/// Returns a clone of the slot value, if set.
	pub async fn get(&self, slot: &str) -> Option<Value> {
		let slots = self.slots.read().await;
		slots.get(slot).cloned()
	}

	/// Number of populated slots.
	pub async fn len(&self) -> usize {
		let slots = self.slots.read().await;
		slots.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn test_set_then_get() {
		let store = VariableStore::new();
		store
			.set(ASSET_METADATA_SLOT, json!({ "name": "Watr" }))
			.await;

		let value = store.get(ASSET_METADATA_SLOT).await.expect("slot set");
		assert_eq!(value["name"], "Watr");
		assert_eq!(store.len().await, 1);
	}

	#[tokio::test]
	async fn test_clones_share_slots() {
		let store = VariableStore::new();
		let clone = store.clone();
		clone.set("$probe", json!(42)).await;

		assert_eq!(store.get("$probe").await, Some(json!(42)));
	}

	#[tokio::test]
	async fn test_set_replaces_whole_value() {
		let store = VariableStore::new();
		store.set("$probe", json!({ "a": 1, "b": 2 })).await;
		store.set("$probe", json!({ "a": 3 })).await;

		let value = store.get("$probe").await.expect("slot set");
		assert_eq!(value, json!({ "a": 3 }));
	}
}
