// 🏗️ Graph Builder
// Walks the schema registry depth-first and instantiates every composite
// field that is missing. Values the caller already set are never replaced;
// scalar fields are never invented.

use serde::Serialize;
use tracing::{debug, warn};

use crate::entities::{Entity, EntityKind, Value};
use crate::schema::{registry, FieldDefinition, FieldType};

/// Path of the wheel pair inside a bike
pub const WHEELS_PATH: &str = "components.wheels";

/// Path of the setup aggregate inside a bike
pub const SETUP_PATH: &str = "setup";

// ============================================================================
// BUILD REPORT
// ============================================================================

/// A composite slot whose present value does not have the declared type.
/// The value is left in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDrift {
    pub path: String,
    pub expected: String,
    pub found: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Paths of the entities instantiated by this build
    pub created: Vec<String>,
    pub drift: Vec<SchemaDrift>,
}

impl BuildReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} entities created, {} drifted slots left in place",
            self.created.len(),
            self.drift.len()
        )
    }
}

// ============================================================================
// GRAPH BUILDER
// ============================================================================

/// Populates a bike graph in place.
///
/// ```
/// use bike_garage::GraphBuilder;
///
/// let builder = GraphBuilder::new(None);
/// assert!(builder.bike().path("components.wheels.front.rim").is_some());
/// ```
#[derive(Debug)]
pub struct GraphBuilder {
    bike: Entity,
    report: BuildReport,
}

impl GraphBuilder {
    /// Build `bike`, or an empty bike when none is given
    pub fn new(bike: Option<Entity>) -> Self {
        let mut builder = GraphBuilder {
            bike: bike.unwrap_or_else(Entity::bike),
            report: BuildReport::default(),
        };
        builder.build();
        builder
    }

    /// Run all build steps again. A second run changes nothing.
    pub fn build(&mut self) -> &BuildReport {
        let mut report = BuildReport::default();
        let root = self.bike.kind().name().to_lowercase();

        populate(&mut self.bike, &root, &mut report);
        self.init_wheels(&root, &mut report);
        self.init_setup(&root, &mut report);

        debug!(root = %root, "{}", report.summary());
        self.report = report;
        &self.report
    }

    /// Front and rear wheels, each with rim, hub and tyre
    fn init_wheels(&mut self, root: &str, report: &mut BuildReport) {
        if let Some(pair) = self.bike.path_mut(WHEELS_PATH) {
            if pair.kind() == EntityKind::WheelPair {
                populate_pair(pair, &format!("{}.{}", root, WHEELS_PATH), report);
            }
        }
    }

    /// Fork and shock suspension setups
    fn init_setup(&mut self, root: &str, report: &mut BuildReport) {
        if let Some(setup) = self.bike.path_mut(SETUP_PATH) {
            if setup.kind() == EntityKind::Setup {
                populate_pair(setup, &format!("{}.{}", root, SETUP_PATH), report);
            }
        }
    }

    pub fn bike(&self) -> &Entity {
        &self.bike
    }

    pub fn bike_mut(&mut self) -> &mut Entity {
        &mut self.bike
    }

    pub fn into_bike(self) -> Entity {
        self.bike
    }

    /// Report of the most recent build
    pub fn report(&self) -> &BuildReport {
        &self.report
    }
}

/// Build a bike graph and return it
pub fn build(bike: Option<Entity>) -> Entity {
    GraphBuilder::new(bike).into_bike()
}

/// A fully populated standalone entity of any kind (e.g. a replacement
/// disc brake with its rotor and pads)
pub fn build_entity(kind: EntityKind) -> Entity {
    let mut entity = Entity::new(kind);
    let mut report = BuildReport::default();
    let root = kind.name().to_lowercase();
    populate(&mut entity, &root, &mut report);
    populate_pair(&mut entity, &root, &mut report);
    entity
}

// ============================================================================
// WALK
// ============================================================================

/// Generic pass: entity, variant and collection fields. Pair members are
/// left to `populate_pair`.
fn populate(entity: &mut Entity, path: &str, report: &mut BuildReport) {
    let Some(definition) = registry().entity(entity.kind()) else {
        return;
    };

    for field in definition.composite_fields() {
        match field.field_type {
            FieldType::Entity(_) | FieldType::Variant(_) => {
                ensure_child(entity, field, path, report);
            }
            FieldType::Collection(_) => ensure_collection(entity, field, path, report),
            _ => {}
        }
    }
}

/// Specialization pass: both members of an owned pair
fn populate_pair(entity: &mut Entity, path: &str, report: &mut BuildReport) {
    let Some(definition) = registry().entity(entity.kind()) else {
        return;
    };

    for field in definition.fields() {
        if let FieldType::PairMember(_) = field.field_type {
            ensure_child(entity, field, path, report);
        }
    }
}

fn ensure_child(entity: &mut Entity, field: &FieldDefinition, path: &str, report: &mut BuildReport) {
    let child_path = format!("{}.{}", path, field.name);

    match entity.get(field.name) {
        None => {
            let Some(kind) = field.field_type.default_kind() else {
                return;
            };
            match entity.set(field.name, Entity::new(kind)) {
                Ok(()) => {
                    debug!(path = %child_path, kind = %kind, "instantiated default");
                    report.created.push(child_path.clone());
                }
                Err(err) => {
                    warn!(path = %child_path, error = %err, "could not instantiate default");
                    return;
                }
            }
        }
        Some(value) if !field.field_type.matches(value) => {
            record_drift(report, &child_path, field, value);
        }
        Some(_) => {}
    }

    // Wrong-kind entities are still walked with their own schema
    if let Some(child) = entity.child_mut(field.name) {
        populate(child, &child_path, report);
    }
}

fn ensure_collection(
    entity: &mut Entity,
    field: &FieldDefinition,
    path: &str,
    report: &mut BuildReport,
) {
    let child_path = format!("{}.{}", path, field.name);

    match entity.get(field.name) {
        None => {
            if let Err(err) = entity.set(field.name, Value::Collection(Vec::new())) {
                warn!(path = %child_path, error = %err, "could not instantiate collection");
                return;
            }
            debug!(path = %child_path, "instantiated empty collection");
            report.created.push(child_path.clone());
        }
        Some(value) if !field.field_type.matches(value) => {
            record_drift(report, &child_path, field, value);
        }
        Some(_) => {}
    }

    if let Some(items) = entity.collection_mut(field.name) {
        for (index, item) in items.iter_mut().enumerate() {
            let item_path = format!("{}[{}]", child_path, index);
            populate(item, &item_path, report);
        }
    }
}

fn record_drift(report: &mut BuildReport, path: &str, field: &FieldDefinition, value: &Value) {
    let found = match value {
        Value::Entity(entity) => entity.kind().name().to_string(),
        other => other.type_name().to_string(),
    };
    warn!(
        path,
        expected = %field.field_type.describe(),
        found = %found,
        "schema drift: keeping present value"
    );
    report.drift.push(SchemaDrift {
        path: path.to_string(),
        expected: field.field_type.describe(),
        found,
    });
}

// ============================================================================
// TESTS
// ============================================================================
