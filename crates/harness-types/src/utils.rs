//! Hex formatting and serde helpers.
//!
//! Small string utilities for the `0x` prefix handling used throughout
//! the harness, plus the amount deserializer shared by config and
//! scenario files.

/// Adds a "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes the "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Accepts `u128` amounts as integers or decimal strings.
///
/// TOML integers cap at `i64::MAX`, well below full-precision 18-decimal
/// amounts (and `toml` rejects `u128` targets outright), so files quote
/// large values and this visitor parses both forms.
pub fn u128_amount<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
	D: serde::Deserializer<'de>,
{
	struct AmountVisitor;

	impl serde::de::Visitor<'_> for AmountVisitor {
		type Value = u128;

		fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
			f.write_str("a non-negative integer or decimal string")
		}

		fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<u128, E> {
			Ok(value as u128)
		}

		fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<u128, E> {
			u128::try_from(value).map_err(|_| E::custom("amount cannot be negative"))
		}

		fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<u128, E> {
			value
				.parse()
				.map_err(|e| E::custom(format!("bad amount: {}", e)))
		}
	}

	deserializer.deserialize_any(AmountVisitor)
}

/// `Option` form of [`u128_amount`] for fields that may be omitted.
///
/// Use together with `#[serde(default)]`; the deserializer only runs
/// when the key is present.
pub fn opt_u128_amount<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	u128_amount(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Deserialize;

	#[test]
	fn test_prefix_round_trip() {
		assert_eq!(with_0x_prefix("0a0000"), "0x0a0000");
		assert_eq!(with_0x_prefix("0x0a0000"), "0x0a0000");
		assert_eq!(without_0x_prefix("0x0a0000"), "0a0000");
		assert_eq!(without_0x_prefix("0X0a0000"), "0a0000");
		assert_eq!(without_0x_prefix("0a0000"), "0a0000");
	}

	#[derive(Deserialize)]
	struct Amounts {
		#[serde(deserialize_with = "u128_amount")]
		plain: u128,
		#[serde(default, deserialize_with = "opt_u128_amount")]
		optional: Option<u128>,
	}

	#[test]
	fn test_amounts_parse_from_toml() {
		let amounts: Amounts = toml::from_str(
			"plain = 1099511627776\noptional = \"100000000000000000000\"",
		)
		.unwrap();
		assert_eq!(amounts.plain, 1_099_511_627_776);
		assert_eq!(amounts.optional, Some(100_000_000_000_000_000_000));
	}

	#[test]
	fn test_omitted_amount_is_none() {
		let amounts: Amounts = toml::from_str("plain = \"7\"").unwrap();
		assert_eq!(amounts.plain, 7);
		assert_eq!(amounts.optional, None);
	}

	#[test]
	fn test_negative_amount_rejected() {
		assert!(toml::from_str::<Amounts>("plain = -1").is_err());
	}
}
