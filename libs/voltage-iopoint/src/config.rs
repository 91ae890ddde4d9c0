//! Per-point configuration
//!
//! Plain serde types. Loading them from files is left to the host (see
//! `common::config` for the loader used by the VoltageEMS tools).

use crate::attribute::Directions;
use crate::error::{PointError, Result};
use crate::value::DataType;
use serde::{Deserialize, Serialize};

/// Configuration of a single I/O point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointConfig {
    /// Point name, used in logs and introspection
    pub name: String,
    /// Value type the point carries
    pub data_type: DataType,
    /// Directions the point exposes (both by default)
    #[serde(default)]
    pub directions: Directions,
}

impl PointConfig {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            directions: Directions::default(),
        }
    }

    pub fn with_directions(mut self, directions: Directions) -> Self {
        self.directions = directions;
        self
    }

    /// Check the configuration against the value type it is bound to
    pub fn validate(&self, expected: DataType) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PointError::InvalidConfig(
                "point name must not be empty".to_string(),
            ));
        }
        if !self.directions.input && !self.directions.output {
            return Err(PointError::InvalidConfig(format!(
                "point '{}' has no direction enabled",
                self.name
            )));
        }
        if self.data_type != expected {
            return Err(PointError::DataTypeMismatch {
                point: self.name.clone(),
                configured: self.data_type,
                expected,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_default_directions() {
        let config: PointConfig =
            serde_json::from_str(r#"{"name": "pump_speed", "data_type": "float64"}"#).unwrap();
        assert_eq!(config.name, "pump_speed");
        assert_eq!(config.data_type, DataType::Float64);
        assert_eq!(config.directions, Directions::INPUT_OUTPUT);
    }

    #[test]
    fn test_deserialize_input_only() {
        let config: PointConfig = serde_json::from_str(
            r#"{"name": "level", "data_type": "int32", "directions": {"output": false}}"#,
        )
        .unwrap();
        assert_eq!(config.directions, Directions::INPUT);
    }

    #[test]
    fn test_validate() {
        let config = PointConfig::new("valve", DataType::Bool);
        assert!(config.validate(DataType::Bool).is_ok());

        assert!(matches!(
            config.validate(DataType::Float64),
            Err(PointError::DataTypeMismatch { .. })
        ));

        let empty = PointConfig::new("  ", DataType::Bool);
        assert!(matches!(
            empty.validate(DataType::Bool),
            Err(PointError::InvalidConfig(_))
        ));

        let none = PointConfig::new("x", DataType::Bool).with_directions(Directions {
            input: false,
            output: false,
        });
        assert!(none.validate(DataType::Bool).is_err());
    }
}
