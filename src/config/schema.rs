//! JSON Schema validation for register files

use crate::error::MustrError;
use anyhow::{Result, anyhow};
use jsonschema::Validator;
use serde_json::Value;

/// Embedded register file schema
pub const REGISTER_SCHEMA: &str = include_str!("../../docs/register.schema.json");

/// Compile the embedded register file schema
///
/// # Errors
///
/// Returns an error if the embedded schema is invalid
pub fn get_schema() -> Result<Validator> {
    let schema: Value = serde_json::from_str(REGISTER_SCHEMA)
        .map_err(|e| anyhow!("Failed to parse embedded JSON schema: {e}"))?;

    jsonschema::draft7::new(&schema).map_err(|e| anyhow!("Failed to compile JSON schema: {e}"))
}

/// Validate a register file value against the schema
///
/// # Errors
///
/// Returns a configuration error listing every violation
pub fn validate_against_schema(register: &Value) -> Result<()> {
    let schema = get_schema()?;

    let error_messages: Vec<String> = schema
        .iter_errors(register)
        .map(|e| format!("  - {e}"))
        .collect();

    if !error_messages.is_empty() {
        return Err(MustrError::configuration(format!(
            "register file does not match the schema:\n{}",
            error_messages.join("\n")
        ))
        .into());
    }

    Ok(())
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_register() {
        let register = json!({
            "templates": [
                {"name": "db", "template": "example.class", "partials": {"author": "example.author"}}
            ],
            "components": [
                {"name": "model", "templates": ["db"]}
            ]
        });
        validate_against_schema(&register).unwrap();
    }

    #[test]
    fn test_component_without_templates_is_rejected() {
        let register = json!({"components": [{"name": "model"}]});
        let err = validate_against_schema(&register).unwrap_err();
        assert!(err.to_string().contains("does not match the schema"));
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let register = json!({
            "templates": [{
                "name": "db",
                "injects": [{"filename": "index.ts", "find": "x", "insert": "y", "strategy": "sideways"}]
            }]
        });
        assert!(validate_against_schema(&register).is_err());
    }
}
