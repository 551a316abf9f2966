// 📐 Validated Setters
// Every write to an entity field passes through `Entity::set`. The value is
// shaped to the declared type, checked against the field's rules, committed,
// and only then propagated to owned children.

use chrono::NaiveDate;
use tracing::trace;

use crate::entities::{Entity, EntityKind, Value, WheelDiameter};
use crate::error::{BikeError, Result};
use crate::schema::{registry, FieldDefinition, FieldType, Propagation, ValidationRule};

impl Entity {
    /// Assign a field after validating it against the schema.
    ///
    /// Fails with `InvalidValue` for undeclared fields, values of the wrong
    /// shape and values outside a closed set, and with `ConsistencyViolation`
    /// when a related field disagrees. Nothing is written on failure.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let definition = declaration(self.kind(), field)?;
        let value = coerce(self.kind(), definition, value.into())?;

        for rule in &definition.validation_rules {
            check_rule(self, definition, rule, Some(&value))?;
        }

        trace!(entity = %self.kind(), field, value = %value, "set");
        match definition.propagation {
            None => self.commit(field, value),
            Some(propagation) => {
                // the field and its owned members change together or not at all
                let mut staged = self.clone();
                staged.commit(field, value.clone());
                propagate(&mut staged, propagation, &value)?;
                *self = staged;
            }
        }
        Ok(())
    }

    /// Builder-style `set`, for assembling caller-supplied entities
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Read a field after re-running its cross-field checks.
    ///
    /// A wheel's diameter is only meaningful when rim and tyre agree, so this
    /// fails with `ConsistencyViolation` when any of them disagree, even if
    /// the wheel's own diameter is unset.
    pub fn checked_get(&self, field: &str) -> Result<Option<&Value>> {
        let definition = declaration(self.kind(), field)?;
        let own = self.get(field);
        for rule in &definition.validation_rules {
            check_rule(self, definition, rule, own)?;
        }
        Ok(own)
    }

    /// Append an element to a collection field
    pub fn push(&mut self, field: &str, item: Entity) -> Result<()> {
        let definition = declaration(self.kind(), field)?;
        let FieldType::Collection(kind) = definition.field_type else {
            return Err(BikeError::invalid(
                self.kind(),
                field,
                item.kind(),
                format!("expected {}, field is not a collection", definition.field_type.describe()),
            ));
        };
        if item.kind() != kind {
            return Err(BikeError::invalid(
                self.kind(),
                field,
                item.kind(),
                format!("collection holds {}", kind),
            ));
        }

        if self.collection_mut(field).is_none() {
            self.commit(field, Value::Collection(Vec::new()));
        }
        if let Some(items) = self.collection_mut(field) {
            items.push(item);
        }
        Ok(())
    }
}

fn declaration(kind: EntityKind, field: &str) -> Result<&'static FieldDefinition> {
    registry()
        .field(kind, field)
        .ok_or_else(|| BikeError::invalid(kind, field, "-", format!("{} has no field {}", kind, field)))
}

// ============================================================================
// SHAPING
// ============================================================================

/// Bring a value into the declared shape or reject it
fn coerce(entity: EntityKind, definition: &FieldDefinition, value: Value) -> Result<Value> {
    let field = definition.name;
    let expected = definition.field_type.describe();
    let mismatch = |value: &Value| {
        BikeError::invalid(
            entity,
            field,
            value,
            format!("expected {}, got {}", expected, value.type_name()),
        )
    };

    let shaped = match (definition.field_type, value) {
        (FieldType::Float, Value::Integer(number)) => Value::Float(number as f64),
        (FieldType::Integer, Value::Float(number)) if number.fract() == 0.0 => {
            Value::Integer(number as i64)
        }
        (FieldType::Date, Value::Text(text)) => {
            let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| {
                BikeError::invalid(entity, field, &text, "expected a YYYY-MM-DD date")
            })?;
            Value::Date(date)
        }
        (FieldType::Standard(kind), Value::Text(text)) => match kind.parse(&text) {
            Some(standard) => Value::Standard(standard),
            None => {
                return Err(BikeError::invalid(
                    entity,
                    field,
                    &text,
                    format!("not a {}; allowed: {}", kind.name(), kind.allowed().join(", ")),
                ))
            }
        },
        (FieldType::Diameter, value) => Value::Diameter(normalize_diameter(entity, field, &value)?),
        (_, value) => value,
    };

    if definition.field_type.matches(&shaped) {
        Ok(shaped)
    } else {
        Err(mismatch(&shaped))
    }
}

/// "650B" is 27.5; the result must be one of 20, 24, 26, 27.5, 29
fn normalize_diameter(entity: EntityKind, field: &str, value: &Value) -> Result<WheelDiameter> {
    let normalized = match value {
        Value::Diameter(diameter) => Some(*diameter),
        Value::Text(text) => WheelDiameter::normalize(text),
        Value::Integer(number) => WheelDiameter::from_inches(*number as f64),
        Value::Float(number) => WheelDiameter::from_inches(*number),
        _ => None,
    };
    normalized.ok_or_else(|| {
        let allowed: Vec<String> = WheelDiameter::ALL.iter().map(|d| d.to_string()).collect();
        BikeError::invalid(
            entity,
            field,
            value,
            format!("wheel diameter must be one of {} (or 650B)", allowed.join(", ")),
        )
    })
}

// ============================================================================
// RULES
// ============================================================================

fn check_rule(
    entity: &Entity,
    definition: &FieldDefinition,
    rule: &ValidationRule,
    candidate: Option<&Value>,
) -> Result<()> {
    match rule {
        ValidationRule::OneOf(allowed) => match candidate {
            Some(value) => {
                let accepted = value.as_integer().map_or(false, |n| allowed.contains(&n));
                if accepted {
                    Ok(())
                } else {
                    let allowed: Vec<String> = allowed.iter().map(|n| n.to_string()).collect();
                    Err(BikeError::invalid(
                        entity.kind(),
                        definition.name,
                        value,
                        format!("must be one of {}", allowed.join(", ")),
                    ))
                }
            }
            None => Ok(()),
        },
        ValidationRule::MatchesChildren(children) => {
            check_children(entity, definition.name, children, candidate)
        }
    }
}

/// Every known value among the children (in declaration order) and the
/// candidate must be equal; the first disagreement is reported.
fn check_children(
    entity: &Entity,
    field: &str,
    children: &[&str],
    candidate: Option<&Value>,
) -> Result<()> {
    let own_label = entity.kind().name().to_lowercase();
    let mut known: Vec<(&str, &Value)> = children
        .iter()
        .filter_map(|child| {
            entity
                .child(child)
                .and_then(|nested| nested.get(field))
                .map(|value| (*child, value))
        })
        .collect();
    if let Some(value) = candidate {
        known.push((own_label.as_str(), value));
    }

    let Some((first, first_value)) = known.first().copied() else {
        return Ok(());
    };
    for (second, second_value) in known.iter().skip(1) {
        if *second_value != first_value {
            return Err(BikeError::ConsistencyViolation {
                entity: entity.kind(),
                field: field.to_string(),
                first: first.to_string(),
                first_value: first_value.to_string(),
                second: second.to_string(),
                second_value: second_value.to_string(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// PROPAGATION
// ============================================================================

fn propagate(entity: &mut Entity, propagation: Propagation, value: &Value) -> Result<()> {
    match propagation {
        Propagation::WheelSizeToPair { front, rear } => {
            let Some(size) = value.as_wheel_size() else {
                return Ok(());
            };
            let (front_size, rear_size) = size.split();
            for (member, member_size) in [(front, front_size), (rear, rear_size)] {
                if entity.child(member).is_none() {
                    entity.set(member, Entity::new(EntityKind::Wheel))?;
                }
                if let Some(wheel) = entity.child_mut(member) {
                    wheel.set("size", member_size)?;
                }
            }
            Ok(())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{HeadsetStandard, PressureUnit, WheelSize};

    fn wheel_with(rim: Option<&str>, tyre: Option<&str>) -> Entity {
        let mut wheel = Entity::new(EntityKind::Wheel);
        let mut rim_entity = Entity::new(EntityKind::Rim);
        if let Some(diameter) = rim {
            rim_entity.set("diameter", diameter).unwrap();
        }
        let mut tyre_entity = Entity::new(EntityKind::Tyre);
        if let Some(diameter) = tyre {
            tyre_entity.set("diameter", diameter).unwrap();
        }
        wheel.set("rim", rim_entity).unwrap();
        wheel.set("tyre", tyre_entity).unwrap();
        wheel
    }

    #[test]
    fn test_rim_diameter_650b_stores_27_5() {
        let mut rim = Entity::new(EntityKind::Rim);
        rim.set("diameter", "650B").unwrap();

        let stored = rim.get("diameter").and_then(Value::as_diameter).unwrap();
        assert_eq!(stored, WheelDiameter::TwentySevenFive);
        assert_eq!(stored.inches(), 27.5);
    }

    #[test]
    fn test_rim_diameter_28_rejected() {
        let mut rim = Entity::new(EntityKind::Rim);
        let err = rim.set("diameter", 28).unwrap_err();

        assert!(err.is_invalid_value());
        assert!(!rim.is_set("diameter"), "nothing written on failure");
    }

    #[test]
    fn test_tyre_diameter_accepts_numbers() {
        let mut tyre = Entity::new(EntityKind::Tyre);
        tyre.set("diameter", 29).unwrap();
        assert_eq!(
            tyre.get("diameter").and_then(Value::as_diameter),
            Some(WheelDiameter::TwentyNine)
        );
        tyre.set("diameter", 27.5).unwrap();
        assert_eq!(
            tyre.get("diameter").and_then(Value::as_diameter),
            Some(WheelDiameter::TwentySevenFive)
        );
        assert!(tyre.set("diameter", "700c").unwrap_err().is_invalid_value());
    }

    #[test]
    fn test_disc_diameter_closed_set() {
        let mut disc = Entity::new(EntityKind::BrakeDisc);
        disc.set("diameter", 203).unwrap();
        assert_eq!(disc.integer("diameter"), Some(203));

        let err = disc.set("diameter", 205).unwrap_err();
        assert!(err.is_invalid_value());
        assert_eq!(disc.integer("diameter"), Some(203), "previous value kept");
    }

    #[test]
    fn test_every_legal_rotor_size_accepted() {
        let mut disc = Entity::new(EntityKind::BrakeDisc);
        for diameter in crate::schema::DISC_DIAMETERS {
            assert!(disc.set("diameter", diameter).is_ok(), "{} rejected", diameter);
        }
    }

    #[test]
    fn test_wheel_consistency_violation_on_read() {
        let wheel = wheel_with(Some("29"), Some("27.5"));
        let err = wheel.checked_get("diameter").unwrap_err();

        match err {
            BikeError::ConsistencyViolation {
                first,
                first_value,
                second,
                second_value,
                ..
            } => {
                assert_eq!(first, "rim");
                assert_eq!(first_value, "29");
                assert_eq!(second, "tyre");
                assert_eq!(second_value, "27.5");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_wheel_consistency_violation_on_set() {
        let mut wheel = wheel_with(Some("29"), Some("27.5"));
        let err = wheel.set("diameter", 29).unwrap_err();
        assert!(err.is_consistency_violation());
        assert!(!wheel.is_set("diameter"));
    }

    #[test]
    fn test_wheel_diameter_must_match_rim() {
        let mut wheel = wheel_with(Some("29"), None);
        let err = wheel.set("diameter", "650B").unwrap_err();
        assert!(err.to_string().contains("rim is 29 but wheel is 27.5"));

        wheel.set("diameter", 29).unwrap();
        assert_eq!(
            wheel.checked_get("diameter").unwrap().and_then(Value::as_diameter),
            Some(WheelDiameter::TwentyNine)
        );
    }

    #[test]
    fn test_wheel_diameter_without_children_is_free() {
        let mut wheel = Entity::new(EntityKind::Wheel);
        wheel.set("diameter", 26).unwrap();
        assert!(wheel.checked_get("diameter").is_ok());
    }

    #[test]
    fn test_mullet_propagation() {
        let mut pair = Entity::new(EntityKind::WheelPair);
        pair.set("size", WheelSize::Mixed).unwrap();

        assert_eq!(
            pair.path("front").and_then(|w| w.get("size")).and_then(Value::as_wheel_size),
            Some(WheelSize::TwentyNine)
        );
        assert_eq!(
            pair.path("rear").and_then(|w| w.get("size")).and_then(Value::as_wheel_size),
            Some(WheelSize::TwentySevenFive)
        );
        assert_eq!(
            pair.get("size").and_then(Value::as_wheel_size),
            Some(WheelSize::Mixed)
        );
    }

    #[test]
    fn test_plain_size_propagates_to_both() {
        let mut pair = Entity::new(EntityKind::WheelPair);
        pair.set("size", "26\"").unwrap();

        for member in ["front", "rear"] {
            assert_eq!(
                pair.path(member).and_then(|w| w.get("size")).and_then(Value::as_wheel_size),
                Some(WheelSize::TwentySix)
            );
        }
    }

    #[test]
    fn test_propagation_is_idempotent_and_keeps_wheels() {
        let mut pair = Entity::new(EntityKind::WheelPair);
        let front = Entity::new(EntityKind::Wheel).with("brand", "DT Swiss").unwrap();
        pair.set("front", front).unwrap();

        pair.set("size", WheelSize::Mixed).unwrap();
        let once = pair.clone();
        pair.set("size", WheelSize::Mixed).unwrap();

        assert_eq!(pair, once);
        assert_eq!(pair.path("front").and_then(|w| w.text("brand")), Some("DT Swiss"));
    }

    #[test]
    fn test_failed_propagation_writes_nothing() {
        let mut pair = Entity::new(EntityKind::WheelPair);
        // a rim drifted into the front slot cannot take a size
        pair.commit("front", Entity::new(EntityKind::Rim).into());
        let before = pair.clone();

        let err = pair.set("size", "29\"").unwrap_err();
        assert!(err.is_invalid_value());
        assert!(!pair.is_set("size"));
        assert!(!pair.is_set("rear"));
        assert_eq!(pair, before);
    }

    #[test]
    fn test_standards_parsed_from_text() {
        let mut headset = Entity::new(EntityKind::Headset);
        headset.set("standard", "tapered").unwrap();
        assert_eq!(
            headset.get("standard").and_then(Value::as_standard),
            Some(HeadsetStandard::Tapered.into())
        );

        let err = headset.set("standard", "ISCG-05").unwrap_err();
        assert!(err.is_invalid_value());

        let mut pressure = Entity::new(EntityKind::Pressure);
        assert!(pressure.set("unit", PressureUnit::Bar).is_ok());
        assert!(pressure.set("unit", WheelSize::TwentyNine).is_err());
    }

    #[test]
    fn test_type_mismatch_and_unknown_field() {
        let mut fork = Entity::new(EntityKind::Fork);
        assert!(fork.set("travel", "160mm").unwrap_err().is_invalid_value());
        assert!(fork.set("wattage", 250).unwrap_err().is_invalid_value());
        assert!(fork
            .set("usage", Entity::new(EntityKind::Rim))
            .unwrap_err()
            .is_invalid_value());
        fork.set("travel", 160).unwrap();
        assert_eq!(fork.integer("travel"), Some(160));
    }

    #[test]
    fn test_numeric_widening() {
        let mut bike = Entity::bike();
        bike.set("weight", 15).unwrap();
        assert_eq!(bike.float("weight"), Some(15.0));
        bike.set("model_year", 2022.0).unwrap();
        assert_eq!(bike.integer("model_year"), Some(2022));
        assert!(bike.set("model_year", 2022.5).is_err());
    }

    #[test]
    fn test_date_field_parses_iso_text() {
        let mut bike = Entity::bike();
        bike.set("purchase_date", "2021-08-13").unwrap();
        assert_eq!(
            bike.get("purchase_date").and_then(Value::as_date),
            NaiveDate::from_ymd_opt(2021, 8, 13)
        );
        assert!(bike.set("purchase_date", "13/08/21").is_err());
    }

    #[test]
    fn test_push_into_collection() {
        let mut components = Entity::new(EntityKind::Components);
        let ring = Entity::new(EntityKind::Chainring).with("tooth_count", 32).unwrap();
        components.push("chainrings", ring).unwrap();

        assert_eq!(components.items("chainrings").len(), 1);
        assert!(components
            .push("chainrings", Entity::new(EntityKind::Cassette))
            .is_err());
        assert!(components
            .push("frame", Entity::new(EntityKind::Chainring))
            .is_err());
    }

    #[test]
    fn test_falsy_values_are_values() {
        let mut seatpost = Entity::new(EntityKind::Seatpost);
        seatpost.set("telescopic", false).unwrap();
        seatpost.set("travel", 0).unwrap();
        seatpost.set("brand", "").unwrap();
        assert_eq!(seatpost.len(), 3);
    }
}
