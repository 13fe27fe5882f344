//! Registry trait for self-registering implementations.
//!
//! Every pluggable implementation (EVM client, native state reader) exposes
//! a Registry struct implementing this trait, tying its configuration name
//! to its factory function.

/// Base trait for implementation registries.
///
/// The name is the key used in the TOML configuration, for example
/// "alloy" for `evm.implementation = "alloy"` or "substrate" for
/// `native.implementation = "substrate"`.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
