//! Common types module for the precompile dispatch harness.
//!
//! This module defines the core data types shared by the dispatch bridge,
//! the action harness and the runner. It provides a centralized location
//! for shared types to ensure consistency across all harness components.

/// Action payloads, results and the token metadata record.
pub mod action;
/// Chain connection parameters for a single node endpoint.
pub mod connection;
/// Dispatch bridge types: opaque call bytes, requests and outcomes.
pub mod dispatch;
/// EVM client request and receipt types.
pub mod evm;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string type for private keys.
pub mod secret_string;
/// Shared variable store for cross-step scenario state.
pub mod store;
/// Hex formatting helpers.
pub mod utils;
/// Configuration validation types for type-safe TOML configs.
pub mod validation;
/// Before/after state samples for effect verification.
pub mod verification;

// Re-export all types for convenient access
pub use action::*;
pub use alloy_primitives::{Address, B256, U256};
pub use connection::*;
pub use dispatch::*;
pub use evm::*;
pub use registry::*;
pub use secret_string::*;
pub use store::*;
pub use utils::{opt_u128_amount, u128_amount, with_0x_prefix, without_0x_prefix};
pub use validation::*;
pub use verification::*;
