//! Before/after state samples.
//!
//! Dispatch effects are asserted from reads taken outside the transaction:
//! one sample before submission, one after inclusion. The pair is kept
//! together so assertions always compare readings from the same source.

use serde::{Deserialize, Serialize};

/// A pair of native-state readings taken around a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSample<T> {
	pub before: T,
	pub after: T,
}

impl<T> VerificationSample<T> {
	pub fn new(before: T, after: T) -> Self {
		Self { before, after }
	}
}

impl<T: PartialEq> VerificationSample<T> {
	/// True if the two readings differ at all.
	pub fn changed(&self) -> bool {
		self.before != self.after
	}
}

impl VerificationSample<u128> {
	/// Amount gained between the readings, `None` if the value decreased.
	pub fn credited(&self) -> Option<u128> {
		self.after.checked_sub(self.before)
	}

	/// Amount lost between the readings, `None` if the value increased.
	pub fn debited(&self) -> Option<u128> {
		self.before.checked_sub(self.after)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_credited_and_debited() {
		let sample = VerificationSample::new(5u128, 105u128);
		assert!(sample.changed());
		assert_eq!(sample.credited(), Some(100));
		assert_eq!(sample.debited(), None);

		let drained = VerificationSample::new(105u128, 5u128);
		assert_eq!(drained.debited(), Some(100));
		assert_eq!(drained.credited(), None);
	}

	#[test]
	fn test_unchanged_sample() {
		let sample = VerificationSample::new(7u128, 7u128);
		assert!(!sample.changed());
		assert_eq!(sample.credited(), Some(0));
		assert_eq!(sample.debited(), Some(0));
	}
}
