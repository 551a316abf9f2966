// ⚠️ Error types for the entity graph
// Only two things can go wrong when touching a bike: a value outside a
// field's allowed set, or two related fields that disagree.

use thiserror::Error;

use crate::entities::EntityKind;

/// Result type for entity operations
pub type Result<T> = std::result::Result<T, BikeError>;

/// Entity graph errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BikeError {
    #[error("Invalid value {value} for {entity}.{field}: {reason}")]
    InvalidValue {
        entity: EntityKind,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Consistency violation on {entity}.{field}: {first} is {first_value} but {second} is {second_value}")]
    ConsistencyViolation {
        entity: EntityKind,
        field: String,
        first: String,
        first_value: String,
        second: String,
        second_value: String,
    },
}

impl BikeError {
    pub fn invalid(
        entity: EntityKind,
        field: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        BikeError::InvalidValue {
            entity,
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Field name the error is about
    pub fn field(&self) -> &str {
        match self {
            BikeError::InvalidValue { field, .. } => field,
            BikeError::ConsistencyViolation { field, .. } => field,
        }
    }

    pub fn is_invalid_value(&self) -> bool {
        matches!(self, BikeError::InvalidValue { .. })
    }

    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, BikeError::ConsistencyViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err = BikeError::invalid(EntityKind::BrakeDisc, "diameter", 205, "not a rotor size");
        assert!(err.is_invalid_value());
        assert_eq!(err.field(), "diameter");
        assert_eq!(
            err.to_string(),
            "Invalid value 205 for BrakeDisc.diameter: not a rotor size"
        );
    }

    #[test]
    fn test_consistency_violation_message() {
        let err = BikeError::ConsistencyViolation {
            entity: EntityKind::Wheel,
            field: "diameter".to_string(),
            first: "rim".to_string(),
            first_value: "29".to_string(),
            second: "tyre".to_string(),
            second_value: "27.5".to_string(),
        };
        assert!(err.is_consistency_violation());
        assert!(err.to_string().contains("rim is 29 but tyre is 27.5"));
    }
}
