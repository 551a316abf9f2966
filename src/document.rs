// 📄 JSON Documents
// Loads partial bike graphs from JSON and writes built graphs back out.
// Loading goes field by field through `Entity::set`, so a document can never
// smuggle in a value the setters would reject.

use anyhow::{Context, Result as AnyResult};
use serde_json::Value as Json;
use std::path::Path;

use crate::entities::{Entity, EntityKind, Value};
use crate::error::{BikeError, Result};
use crate::schema::{registry, FieldDefinition, FieldType};

/// Key naming the entity kind of a JSON object
pub const KIND_KEY: &str = "kind";

// ============================================================================
// LOADING
// ============================================================================

/// Convert a (partial) JSON object into an entity of `kind`.
///
/// Composite fields are set before scalars, so a wheel pair's size is
/// propagated onto wheels that came from the same document. `null` leaves a
/// field unset.
pub fn from_json(kind: EntityKind, json: &Json) -> Result<Entity> {
    let object = json.as_object().ok_or_else(|| {
        BikeError::invalid(kind, KIND_KEY, json, "expected a JSON object")
    })?;

    if let Some(tag) = object.get(KIND_KEY) {
        let named = tag_kind(kind, tag)?;
        if named != kind {
            return Err(BikeError::invalid(
                kind,
                KIND_KEY,
                tag,
                format!("document is a {}, expected {}", named, kind),
            ));
        }
    }

    let mut entity = Entity::new(kind);
    let (composites, scalars): (Vec<_>, Vec<_>) = object
        .iter()
        .filter(|(key, value)| key.as_str() != KIND_KEY && !value.is_null())
        .partition(|(key, _)| {
            registry()
                .field(kind, key)
                .map(|definition| definition.field_type.is_composite())
                .unwrap_or(false)
        });

    for (key, value) in composites.into_iter().chain(scalars) {
        let converted = match registry().field(kind, key) {
            Some(definition) => field_value(kind, definition, value)?,
            // undeclared: let the setter reject it
            None => scalar(kind, key, value)?,
        };
        entity.set(key, converted)?;
    }
    Ok(entity)
}

/// Load and validate a bike document from disk
pub fn load_bike(path: &Path) -> AnyResult<Entity> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bike document: {}", path.display()))?;
    let json: Json = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;
    let bike = from_json(EntityKind::Bike, &json)
        .with_context(|| format!("Invalid bike document: {}", path.display()))?;
    Ok(bike)
}

fn tag_kind(owner: EntityKind, tag: &Json) -> Result<EntityKind> {
    tag.as_str()
        .and_then(EntityKind::parse)
        .ok_or_else(|| BikeError::invalid(owner, KIND_KEY, tag, "unknown entity kind"))
}

fn field_value(owner: EntityKind, definition: &FieldDefinition, json: &Json) -> Result<Value> {
    let field = definition.name;
    match definition.field_type {
        FieldType::Entity(_) | FieldType::Variant(_) | FieldType::PairMember(_) => {
            Ok(Value::from(nested(owner, definition, json)?))
        }
        FieldType::Collection(kind) => {
            let items = json.as_array().ok_or_else(|| {
                BikeError::invalid(owner, field, json, format!("expected a list of {}", kind))
            })?;
            let entities = items
                .iter()
                .map(|item| from_json(kind, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Collection(entities))
        }
        _ => scalar(owner, field, json),
    }
}

/// Nested object; its `"kind"` picks a variant, otherwise the slot's default
fn nested(owner: EntityKind, definition: &FieldDefinition, json: &Json) -> Result<Entity> {
    let tagged = match json.get(KIND_KEY) {
        Some(tag) => Some(tag_kind(owner, tag)?),
        None => None,
    };
    let kind = tagged
        .or_else(|| definition.field_type.default_kind())
        .ok_or_else(|| BikeError::invalid(owner, definition.name, json, "no entity kind"))?;
    from_json(kind, json)
}

fn scalar(owner: EntityKind, field: &str, json: &Json) -> Result<Value> {
    match json {
        Json::String(text) => Ok(Value::Text(text.clone())),
        Json::Bool(flag) => Ok(Value::Boolean(*flag)),
        Json::Number(number) => match number.as_i64() {
            Some(integer) => Ok(Value::Integer(integer)),
            None => number
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| BikeError::invalid(owner, field, json, "number out of range")),
        },
        _ => Err(BikeError::invalid(
            owner,
            field,
            json,
            "expected a text, number or boolean",
        )),
    }
}

// ============================================================================
// WRITING
// ============================================================================

/// Serialize a graph as `{"kind": ..., <set fields>}` objects
pub fn to_json(entity: &Entity) -> serde_json::Result<Json> {
    serde_json::to_value(entity)
}

pub fn to_json_pretty(entity: &Entity) -> AnyResult<String> {
    serde_json::to_string_pretty(entity).context("Failed to serialize bike graph")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::entities::{Standard, SuspensionType, WheelDiameter, WheelSize};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_partial_document_loads() {
        let doc = json!({
            "kind": "Bike",
            "owner": "sam",
            "purchase_date": "2023-04-01",
            "components": {
                "fork": {"brand": "Fox", "travel": 170, "suspension_type": "air"},
                "wheels": {"size": "29\""}
            }
        });
        let bike = from_json(EntityKind::Bike, &doc).unwrap();

        assert_eq!(bike.text("owner"), Some("sam"));
        assert_eq!(
            bike.get("purchase_date").and_then(Value::as_date),
            NaiveDate::from_ymd_opt(2023, 4, 1)
        );
        let fork = bike.path("components.fork").unwrap();
        assert_eq!(fork.integer("travel"), Some(170));
        assert_eq!(
            fork.get("suspension_type").and_then(Value::as_standard),
            Some(Standard::Suspension(SuspensionType::Air))
        );
        assert_eq!(
            bike.path("components.wheels.rear")
                .and_then(|w| w.get("size"))
                .and_then(Value::as_wheel_size),
            Some(WheelSize::TwentyNine)
        );
    }

    #[test]
    fn test_variant_slot_uses_kind_key() {
        let doc = json!({"front_brake": {"kind": "RimBrake", "brand": "Magura"}});
        let components = from_json(EntityKind::Components, &doc).unwrap();
        assert_eq!(components.child("front_brake").unwrap().kind(), EntityKind::RimBrake);

        let doc = json!({"rear_brake": {"brand": "SRAM"}});
        let components = from_json(EntityKind::Components, &doc).unwrap();
        assert_eq!(components.child("rear_brake").unwrap().kind(), EntityKind::DiscBrake);
    }

    #[test]
    fn test_document_values_are_validated() {
        let doc = json!({"components": {"front_brake": {"disc": {"diameter": 205}}}});
        let err = from_json(EntityKind::Bike, &doc).unwrap_err();
        assert!(err.is_invalid_value());
        assert_eq!(err.field(), "diameter");

        let doc = json!({"frame": {"travel": "long"}});
        assert!(from_json(EntityKind::Components, &doc).is_err());

        let doc = json!({"handlebars": {"colour": "black"}});
        assert!(from_json(EntityKind::Components, &doc).is_err());
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let doc = json!({"kind": "Fork"});
        assert!(from_json(EntityKind::Bike, &doc).is_err());

        let doc = json!({"frame": {"kind": "Fork"}});
        assert!(from_json(EntityKind::Components, &doc).is_err());

        assert!(from_json(EntityKind::Bike, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_null_leaves_field_unset() {
        let doc = json!({"owner": null, "brand": "YT"});
        let bike = from_json(EntityKind::Bike, &doc).unwrap();
        assert!(!bike.is_set("owner"));
        assert_eq!(bike.text("brand"), Some("YT"));
    }

    #[test]
    fn test_collections_and_widening() {
        let doc = json!({
            "chainrings": [{"tooth_count": 32}, {"tooth_count": 34.0}],
            "seatpost": {"diameter": 31}
        });
        let components = from_json(EntityKind::Components, &doc).unwrap();
        let rings = components.items("chainrings");
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[1].integer("tooth_count"), Some(34));
        assert_eq!(components.path("seatpost").and_then(|s| s.float("diameter")), Some(31.0));
    }

    #[test]
    fn test_built_graph_reloads() {
        let mut bike = build(None);
        bike.path_mut("components.wheels.front.rim")
            .unwrap()
            .set("diameter", "650B")
            .unwrap();
        bike.set("purchase_date", "2024-06-30").unwrap();

        let json = to_json(&bike).unwrap();
        assert_eq!(json["kind"], "Bike");
        assert_eq!(json["components"]["wheels"]["front"]["rim"]["diameter"], 27.5);

        let reloaded = from_json(EntityKind::Bike, &json).unwrap();
        assert_eq!(reloaded, bike);
        assert_eq!(
            reloaded
                .path("components.wheels.front.rim")
                .and_then(|r| r.get("diameter"))
                .and_then(Value::as_diameter),
            Some(WheelDiameter::TwentySevenFive)
        );
    }

    #[test]
    fn test_pretty_output() {
        let bike = Entity::bike().with("brand", "Commencal").unwrap();
        let text = to_json_pretty(&bike).unwrap();
        assert!(text.contains("\"brand\": \"Commencal\""));
    }
}
