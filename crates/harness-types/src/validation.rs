//! Configuration validation utilities.
//!
//! Implementation tables in the harness config are raw TOML until the
//! selected implementation validates them. This module provides the shared
//! schema framework those validators are built from: typed fields, optional
//! custom validators and nested tables with path-qualified errors.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing from the table.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field is present but carries an unacceptable value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field is present with the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// The TOML type a field is expected to carry.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// An integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// An array whose elements all share one type.
	Array(Box<FieldType>),
	/// A nested table validated by its own schema.
	Table(Schema),
}

/// Custom validator run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// One field in a schema: a name, an expected type and an optional
/// validator.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator returning an error message on rejection.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// A validation schema: fields that must be present and fields that may be.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// Checks presence of required fields, the type of every present field,
	/// custom validators, and nested tables recursively. Unknown fields are
	/// accepted; implementations may carry extra keys.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			check_field(&field.name, value, field)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				check_field(&field.name, value, field)?;
			}
		}

		Ok(())
	}
}

fn check_field(name: &str, value: &toml::Value, field: &Field) -> Result<(), ValidationError> {
	check_type(name, value, &field.field_type)?;
	if let Some(validator) = &field.validator {
		validator(value).map_err(|message| ValidationError::InvalidValue {
			field: name.to_string(),
			message,
		})?;
	}
	Ok(())
}

fn check_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	};

	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch("string"));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value.as_integer().ok_or_else(|| mismatch("integer"))?;
			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}
			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch("boolean"));
			}
		},
		FieldType::Array(inner_type) => {
			let array = value.as_array().ok_or_else(|| mismatch("array"))?;
			for (i, item) in array.iter().enumerate() {
				check_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| qualify(field_name, e))?;
		},
	}

	Ok(())
}

/// Prefixes nested-field errors with the parent table name.
fn qualify(parent: &str, error: ValidationError) -> ValidationError {
	match error {
		ValidationError::MissingField(f) => {
			ValidationError::MissingField(format!("{}.{}", parent, f))
		},
		ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
			field: format!("{}.{}", parent, field),
			message,
		},
		ValidationError::TypeMismatch {
			field,
			expected,
			actual,
		} => ValidationError::TypeMismatch {
			field: format!("{}.{}", parent, field),
			expected,
			actual,
		},
	}
}

/// Trait implemented by every pluggable implementation's config validator.
pub trait ConfigSchema: Send + Sync {
	/// Validates the implementation's TOML table before construction.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("rpc_port", FieldType::Integer {
				min: Some(1),
				max: Some(65535),
			})],
			vec![
				Field::new("label", FieldType::String),
				Field::new(
					"indices",
					FieldType::Table(Schema::new(
						vec![Field::new("pallet", FieldType::Integer {
							min: Some(0),
							max: Some(255),
						})],
						vec![],
					)),
				),
			],
		)
	}

	#[test]
	fn test_accepts_valid_table() {
		let value: toml::Value = toml::from_str(
			r#"
			rpc_port = 9933
			label = "devnet"

			[indices]
			pallet = 10
			"#,
		)
		.unwrap();
		assert!(schema().validate(&value).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let value: toml::Value = toml::from_str("label = \"devnet\"").unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "rpc_port"));
	}

	#[test]
	fn test_out_of_range_integer() {
		let value: toml::Value = toml::from_str("rpc_port = 70000").unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { field, .. } if field == "rpc_port"));
	}

	#[test]
	fn test_nested_errors_are_qualified() {
		let value: toml::Value = toml::from_str(
			r#"
			rpc_port = 9933

			[indices]
			pallet = 300
			"#,
		)
		.unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(
			matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "indices.pallet")
		);
	}

	#[test]
	fn test_custom_validator_runs() {
		let schema = Schema::new(
			vec![
				Field::new("key", FieldType::String).with_validator(|value| {
					let s = value.as_str().unwrap_or_default();
					if s.starts_with("0x") {
						Ok(())
					} else {
						Err("must start with 0x".to_string())
					}
				}),
			],
			vec![],
		);

		let good: toml::Value = toml::from_str("key = \"0xabc\"").unwrap();
		assert!(schema.validate(&good).is_ok());

		let bad: toml::Value = toml::from_str("key = \"abc\"").unwrap();
		assert!(schema.validate(&bad).is_err());
	}
}
