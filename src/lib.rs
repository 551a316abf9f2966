// Bike Garage - Core Library
// Entity graph for bike configurations: schema, builder, validated setters,
// spec-sheet import and JSON documents. Used by the CLI and tests.

pub mod error;      // Error types (InvalidValue, ConsistencyViolation)
pub mod entities;   // Entity graph + closed standards
pub mod schema;     // Schema registry: what fields every entity kind declares
pub mod validation; // Validated setters on Entity
pub mod builder;    // Graph builder: instantiate every composite slot
pub mod import;     // Spec-sheet importer
pub mod document;   // JSON load / save

// Re-export commonly used types
pub use error::{BikeError, Result};
pub use entities::{
    Entity, EntityKind, Value,
    Standard, StandardKind,
    SuspensionType, HeadsetStandard, BottomBracketStandard,
    WheelSize, WheelDiameter, PressureUnit, IscgStandard,
};
pub use schema::{
    SchemaRegistry, EntityDefinition, FieldDefinition, FieldType,
    ValidationRule, Propagation, registry, DISC_DIAMETERS,
};
pub use builder::{
    GraphBuilder, BuildReport, SchemaDrift,
    build, build_entity,
};
pub use import::{
    SpecImporter, SpecRow, RowOutcome, ImportReport,
    load_spec_sheet, read_spec_sheet,
};
pub use document::{from_json, to_json, to_json_pretty, load_bike};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
