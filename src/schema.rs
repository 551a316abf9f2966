// 🏛️ Schema Layer - Entity Registry
// Declares, for every entity kind, the fields it has and what they may hold.
// The builder and the validated setter both read this catalogue; neither
// knows anything about individual component types.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::entities::{EntityKind, StandardKind, Value};

/// Legal brake rotor diameters (mm)
pub const DISC_DIAMETERS: [i64; 6] = [140, 160, 180, 200, 203, 220];

/// Brake slots accept either variant; the first is the default.
pub const BRAKE_VARIANTS: &[EntityKind] = &[EntityKind::DiscBrake, EntityKind::RimBrake];

// ============================================================================
// FIELD TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    /// Value from a closed enumeration
    Standard(StandardKind),
    /// Rim/tyre/wheel diameter class ("650B" normalizes to 27.5)
    Diameter,
    /// Nested entity of one kind
    Entity(EntityKind),
    /// Nested entity of one of several kinds (tagged union)
    Variant(&'static [EntityKind]),
    /// One half of an owned pair (front/rear wheel, fork/shock setup)
    PairMember(EntityKind),
    /// Zero or more nested entities of one kind
    Collection(EntityKind),
}

impl FieldType {
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            FieldType::Entity(_)
                | FieldType::Variant(_)
                | FieldType::PairMember(_)
                | FieldType::Collection(_)
        )
    }

    /// Entity kinds a composite field accepts
    pub fn entity_kinds(&self) -> &[EntityKind] {
        match self {
            FieldType::Entity(kind) | FieldType::PairMember(kind) | FieldType::Collection(kind) => {
                std::slice::from_ref(kind)
            }
            FieldType::Variant(kinds) => kinds,
            _ => &[],
        }
    }

    /// Kind instantiated when the builder fills an empty composite slot
    pub fn default_kind(&self) -> Option<EntityKind> {
        self.entity_kinds().first().copied()
    }

    /// Whether an already-present value has the declared shape
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Text, Value::Text(_)) => true,
            (FieldType::Integer, Value::Integer(_)) => true,
            (FieldType::Float, Value::Float(_)) => true,
            (FieldType::Boolean, Value::Boolean(_)) => true,
            (FieldType::Date, Value::Date(_)) => true,
            (FieldType::Standard(kind), Value::Standard(standard)) => standard.kind() == *kind,
            (FieldType::Diameter, Value::Diameter(_)) => true,
            (FieldType::Entity(_) | FieldType::Variant(_) | FieldType::PairMember(_), Value::Entity(entity)) => {
                self.entity_kinds().contains(&entity.kind())
            }
            (FieldType::Collection(kind), Value::Collection(items)) => {
                items.iter().all(|item| item.kind() == *kind)
            }
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FieldType::Text => "text".to_string(),
            FieldType::Integer => "integer".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Date => "date".to_string(),
            FieldType::Standard(kind) => kind.name().to_string(),
            FieldType::Diameter => "wheel diameter".to_string(),
            FieldType::Entity(kind) => kind.name().to_string(),
            FieldType::Variant(kinds) => kinds
                .iter()
                .map(|kind| kind.name())
                .collect::<Vec<_>>()
                .join(" | "),
            FieldType::PairMember(kind) => format!("{} (pair)", kind),
            FieldType::Collection(kind) => format!("[{}]", kind),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ValidationRule {
    /// Integer must be one of the listed values
    OneOf(&'static [i64]),
    /// Value must agree with the same field on each listed child entity
    MatchesChildren(&'static [&'static str]),
}

/// What happens after a value is committed
#[derive(Debug, Clone, Copy, Serialize)]
pub enum Propagation {
    /// Wheel size fans out to the front and rear members of the pair
    WheelSizeToPair {
        front: &'static str,
        rear: &'static str,
    },
}

// ============================================================================
// FIELD DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub field_type: FieldType,
    pub description: &'static str,
    /// Display unit for measured values ("mm", "°", "kg")
    pub unit: Option<&'static str>,
    pub validation_rules: Vec<ValidationRule>,
    pub propagation: Option<Propagation>,
}

impl FieldDefinition {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        FieldDefinition {
            name,
            field_type,
            description: "",
            unit: None,
            validation_rules: Vec::new(),
            propagation: None,
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = Some(propagation);
        self
    }
}

// ============================================================================
// ENTITY DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct EntityDefinition {
    pub kind: EntityKind,
    pub description: &'static str,
    fields: Vec<FieldDefinition>,
}

impl EntityDefinition {
    pub fn new(kind: EntityKind, description: &'static str) -> Self {
        EntityDefinition {
            kind,
            description,
            fields: Vec::new(),
        }
    }

    /// A physical part: starts with the fields every component shares
    pub fn component(kind: EntityKind, description: &'static str) -> Self {
        Self::new(kind, description)
            .field(FieldDefinition::new("brand", FieldType::Text))
            .field(FieldDefinition::new("model", FieldType::Text))
            .field(
                FieldDefinition::new("name", FieldType::Text)
                    .with_description("Full product name as listed on a spec sheet"),
            )
            .field(FieldDefinition::new("additional_info", FieldType::Text))
            .field(
                FieldDefinition::new("usage", FieldType::Entity(EntityKind::Usage))
                    .with_description("Usage accumulated on this part"),
            )
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn composite_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.field_type.is_composite())
    }
}

// ============================================================================
// SCHEMA REGISTRY
// ============================================================================

/// Catalogue of every entity kind and its fields
#[derive(Debug)]
pub struct SchemaRegistry {
    entities: HashMap<EntityKind, EntityDefinition>,
}

/// The process-wide registry, built on first use
pub fn registry() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SchemaRegistry::new)
}

impl SchemaRegistry {
    /// Create a registry holding the full bike catalogue
    pub fn new() -> Self {
        let mut registry = SchemaRegistry {
            entities: HashMap::new(),
        };

        registry.register_aggregates();
        registry.register_frame_and_suspension();
        registry.register_cockpit();
        registry.register_brakes();
        registry.register_wheels();
        registry.register_drivetrain();
        registry.register_setup();
        registry
    }

    fn register_aggregates(&mut self) {
        use FieldType::*;

        self.register(
            EntityDefinition::new(EntityKind::Bike, "Root of the configuration graph")
                .field(FieldDefinition::new("owner", Text))
                .field(FieldDefinition::new("brand", Text))
                .field(FieldDefinition::new("model", Text))
                .field(FieldDefinition::new("model_year", Integer))
                .field(FieldDefinition::new("purchase_date", Date))
                .field(FieldDefinition::new("total_usage", Entity(EntityKind::Usage)))
                .field(
                    FieldDefinition::new("initial_value", Entity(EntityKind::Price))
                        .with_description("Purchase price"),
                )
                .field(FieldDefinition::new("geometry", Entity(EntityKind::Geometry)))
                .field(FieldDefinition::new("components", Entity(EntityKind::Components)))
                .field(FieldDefinition::new("setup", Entity(EntityKind::Setup)))
                .field(FieldDefinition::new("weight", Float).with_unit("kg")),
        );

        self.register(
            EntityDefinition::new(EntityKind::Usage, "Aggregate usage statistics")
                .field(FieldDefinition::new("hours", Float).with_unit("h"))
                .field(FieldDefinition::new("distance", Float).with_unit("km"))
                .field(FieldDefinition::new("races", Integer)),
        );

        self.register(
            EntityDefinition::new(EntityKind::Price, "Amount of money in a currency")
                .field(FieldDefinition::new("amount", Float))
                .field(FieldDefinition::new("currency", Text)),
        );

        // Measured values only; nothing here is cross-checked
        self.register(
            EntityDefinition::new(EntityKind::Geometry, "Frame geometry measurements")
                .field(FieldDefinition::new("top_tube_length", Integer).with_unit("mm"))
                .field(FieldDefinition::new("reach", Integer).with_unit("mm"))
                .field(FieldDefinition::new("stack", Integer).with_unit("mm"))
                .field(FieldDefinition::new("seat_tube_length", Integer).with_unit("mm"))
                .field(FieldDefinition::new("chainstay_length", Integer).with_unit("mm"))
                .field(FieldDefinition::new("head_tube_angle", Float).with_unit("°"))
                .field(FieldDefinition::new("seat_tube_angle", Float).with_unit("°"))
                .field(FieldDefinition::new("bottom_bracket_drop", Integer).with_unit("mm"))
                .field(FieldDefinition::new("bottom_bracket_height", Integer).with_unit("mm"))
                .field(FieldDefinition::new("wheelbase", Integer).with_unit("mm"))
                .field(FieldDefinition::new("head_tube_length", Integer).with_unit("mm"))
                .field(FieldDefinition::new("standover", Integer).with_unit("mm")),
        );

        self.register(
            EntityDefinition::new(EntityKind::Components, "One slot per part category")
                .field(FieldDefinition::new("frame", Entity(EntityKind::Frame)))
                .field(FieldDefinition::new("fork", Entity(EntityKind::Fork)))
                .field(FieldDefinition::new("shock", Entity(EntityKind::Shock)))
                .field(FieldDefinition::new("headset", Entity(EntityKind::Headset)))
                .field(FieldDefinition::new("handlebars", Entity(EntityKind::Handlebars)))
                .field(FieldDefinition::new("stem", Entity(EntityKind::Stem)))
                .field(FieldDefinition::new("grips", Entity(EntityKind::Grips)))
                .field(FieldDefinition::new("front_brake", Variant(BRAKE_VARIANTS)))
                .field(FieldDefinition::new("rear_brake", Variant(BRAKE_VARIANTS)))
                .field(FieldDefinition::new("wheels", Entity(EntityKind::WheelPair)))
                .field(FieldDefinition::new("bottom_bracket", Entity(EntityKind::BottomBracket)))
                .field(FieldDefinition::new("cranks", Entity(EntityKind::Cranks)))
                .field(FieldDefinition::new("pedals", Entity(EntityKind::Pedals)))
                .field(FieldDefinition::new("chain_guide", Entity(EntityKind::ChainGuide)))
                .field(FieldDefinition::new("chainrings", Collection(EntityKind::Chainring)))
                .field(FieldDefinition::new("cassette", Entity(EntityKind::Cassette)))
                .field(FieldDefinition::new("derailleur", Entity(EntityKind::Derailleur)))
                .field(FieldDefinition::new("chain", Entity(EntityKind::Chain)))
                .field(FieldDefinition::new("saddle", Entity(EntityKind::Saddle)))
                .field(FieldDefinition::new("seatpost", Entity(EntityKind::Seatpost))),
        );
    }

    fn register_frame_and_suspension(&mut self) {
        use FieldType::*;

        self.register(
            EntityDefinition::component(EntityKind::Frame, "Frame")
                .field(FieldDefinition::new("model_year", Integer))
                .field(FieldDefinition::new("size", Text))
                .field(FieldDefinition::new("boost", Boolean))
                .field(
                    FieldDefinition::new("travel", Integer)
                        .with_description("Rear wheel travel")
                        .with_unit("mm"),
                )
                .field(FieldDefinition::new(
                    "head_tube",
                    Standard(StandardKind::Headset),
                ))
                .field(FieldDefinition::new("iscg_tabs", Standard(StandardKind::Iscg)))
                .field(FieldDefinition::new("rear_dropout", Text)),
        );

        self.register(
            EntityDefinition::component(EntityKind::Shock, "Rear shock")
                .field(FieldDefinition::new("length", Float).with_unit("mm"))
                .field(FieldDefinition::new("stroke", Float).with_unit("mm"))
                .field(FieldDefinition::new(
                    "suspension_type",
                    Standard(StandardKind::Suspension),
                )),
        );

        self.register(
            EntityDefinition::component(EntityKind::Fork, "Suspension fork")
                .field(FieldDefinition::new("travel", Integer).with_unit("mm"))
                .field(FieldDefinition::new("offset", Integer).with_unit("mm"))
                .field(FieldDefinition::new("boost", Boolean))
                .field(FieldDefinition::new(
                    "suspension_type",
                    Standard(StandardKind::Suspension),
                )),
        );
    }

    fn register_cockpit(&mut self) {
        use FieldType::*;

        self.register(
            EntityDefinition::component(EntityKind::Handlebars, "Handlebars")
                .field(FieldDefinition::new("width", Integer).with_unit("mm"))
                .field(FieldDefinition::new("rise", Integer).with_unit("mm"))
                .field(
                    FieldDefinition::new("diameter", Float)
                        .with_description("Clamp diameter")
                        .with_unit("mm"),
                ),
        );

        self.register(
            EntityDefinition::component(EntityKind::Stem, "Stem")
                .field(FieldDefinition::new("length", Integer).with_unit("mm"))
                .field(FieldDefinition::new("rise_angle", Integer).with_unit("°"))
                .field(FieldDefinition::new("bar_clamp", Float).with_unit("mm")),
        );

        self.register(
            EntityDefinition::component(EntityKind::Headset, "Headset")
                .field(FieldDefinition::new("standard", Standard(StandardKind::Headset))),
        );

        self.register(
            EntityDefinition::component(EntityKind::Grips, "Grips")
                .field(FieldDefinition::new("lock_on", Boolean)),
        );
    }

    fn register_brakes(&mut self) {
        use FieldType::*;

        self.register(EntityDefinition::component(EntityKind::RimBrake, "Rim brake"));

        self.register(
            EntityDefinition::component(EntityKind::DiscBrake, "Disc brake")
                .field(FieldDefinition::new("pistons", Integer))
                .field(FieldDefinition::new("disc", Entity(EntityKind::BrakeDisc)))
                .field(FieldDefinition::new("pads", Entity(EntityKind::Pads))),
        );

        self.register(
            EntityDefinition::component(EntityKind::BrakeDisc, "Brake rotor")
                .field(
                    FieldDefinition::new("diameter", Integer)
                        .with_unit("mm")
                        .with_validation(ValidationRule::OneOf(&DISC_DIAMETERS)),
                )
                .field(FieldDefinition::new("centerlock", Boolean)),
        );

        self.register(
            EntityDefinition::component(EntityKind::Pads, "Brake pads")
                .field(FieldDefinition::new("compound", Text)),
        );
    }

    fn register_wheels(&mut self) {
        use FieldType::*;

        self.register(
            EntityDefinition::new(EntityKind::WheelPair, "Front and rear wheel")
                .field(
                    FieldDefinition::new("size", Standard(StandardKind::WheelSize))
                        .with_description("Pair classification; mixed means 29\" front, 27.5\" rear")
                        .with_propagation(Propagation::WheelSizeToPair {
                            front: "front",
                            rear: "rear",
                        }),
                )
                .field(FieldDefinition::new("front", PairMember(EntityKind::Wheel)))
                .field(FieldDefinition::new("rear", PairMember(EntityKind::Wheel))),
        );

        self.register(
            EntityDefinition::component(EntityKind::Wheel, "Wheel")
                .field(FieldDefinition::new("size", Standard(StandardKind::WheelSize)))
                .field(
                    FieldDefinition::new("diameter", Diameter)
                        .with_description("Must agree with rim and tyre diameters")
                        .with_validation(ValidationRule::MatchesChildren(&["rim", "tyre"])),
                )
                .field(FieldDefinition::new("rim", Entity(EntityKind::Rim)))
                .field(FieldDefinition::new("hub", Entity(EntityKind::Hub)))
                .field(FieldDefinition::new("tyre", Entity(EntityKind::Tyre))),
        );

        self.register(
            EntityDefinition::component(EntityKind::Rim, "Rim")
                .field(FieldDefinition::new("diameter", Diameter))
                .field(FieldDefinition::new("spoke_count", Integer))
                .field(FieldDefinition::new("inner_width", Float).with_unit("mm")),
        );

        self.register(
            EntityDefinition::component(EntityKind::Hub, "Hub")
                .field(FieldDefinition::new("holes_count", Integer))
                .field(FieldDefinition::new("boost", Boolean))
                .field(FieldDefinition::new("axle", Text)),
        );

        self.register(
            EntityDefinition::component(EntityKind::Tyre, "Tyre")
                .field(FieldDefinition::new("width", Float).with_unit("in"))
                .field(FieldDefinition::new("casing", Text))
                .field(FieldDefinition::new("compound", Text))
                .field(FieldDefinition::new("diameter", Diameter)),
        );
    }

    fn register_drivetrain(&mut self) {
        use FieldType::*;

        self.register(
            EntityDefinition::component(EntityKind::BottomBracket, "Bottom bracket")
                .field(FieldDefinition::new(
                    "standard",
                    Standard(StandardKind::BottomBracket),
                )),
        );

        self.register(
            EntityDefinition::component(EntityKind::Cranks, "Crankset")
                .field(FieldDefinition::new("length", Integer).with_unit("mm"))
                .field(FieldDefinition::new("boost", Boolean)),
        );

        self.register(EntityDefinition::component(EntityKind::Pedals, "Pedals"));

        self.register(
            EntityDefinition::component(EntityKind::ChainGuide, "Chain guide")
                .field(FieldDefinition::new("mount", Standard(StandardKind::Iscg))),
        );

        self.register(
            EntityDefinition::component(EntityKind::Chainring, "Chainring")
                .field(FieldDefinition::new("tooth_count", Integer))
                .field(FieldDefinition::new("offset", Integer).with_unit("mm")),
        );

        self.register(
            EntityDefinition::component(EntityKind::Cassette, "Cassette")
                .field(FieldDefinition::new("speeds", Integer))
                .field(
                    FieldDefinition::new("tooth_range", Text)
                        .with_description("Smallest to largest cog, e.g. 10-52t"),
                ),
        );

        self.register(
            EntityDefinition::component(EntityKind::Derailleur, "Rear derailleur")
                .field(FieldDefinition::new("speeds", Integer)),
        );

        self.register(
            EntityDefinition::component(EntityKind::Chain, "Chain")
                .field(FieldDefinition::new("speeds_compatibility", Integer)),
        );

        self.register(EntityDefinition::component(EntityKind::Saddle, "Saddle"));

        self.register(
            EntityDefinition::component(EntityKind::Seatpost, "Seatpost")
                .field(FieldDefinition::new("telescopic", Boolean))
                .field(FieldDefinition::new("diameter", Float).with_unit("mm"))
                .field(FieldDefinition::new("travel", Integer).with_unit("mm")),
        );
    }

    fn register_setup(&mut self) {
        use FieldType::*;

        self.register(
            EntityDefinition::new(EntityKind::Setup, "Rider setup of the bike")
                .field(FieldDefinition::new("front_tyre", Entity(EntityKind::Pressure)))
                .field(FieldDefinition::new("rear_tyre", Entity(EntityKind::Pressure)))
                .field(FieldDefinition::new("fork", PairMember(EntityKind::SuspensionSetup)))
                .field(FieldDefinition::new("shock", PairMember(EntityKind::SuspensionSetup)))
                .field(FieldDefinition::new("stem_height", Integer).with_unit("mm"))
                .field(FieldDefinition::new("saddle_height", Integer).with_unit("mm"))
                .field(FieldDefinition::new("brake_levers_angle", Integer).with_unit("°"))
                .field(FieldDefinition::new("chain_length", Integer))
                .field(FieldDefinition::new("chainline", Integer).with_unit("mm")),
        );

        self.register(
            EntityDefinition::new(EntityKind::SuspensionSetup, "Fork or shock settings")
                .field(FieldDefinition::new("pressure", Entity(EntityKind::Pressure)))
                .field(FieldDefinition::new("fast_compression", Integer).with_unit("clicks"))
                .field(FieldDefinition::new("slow_compression", Integer).with_unit("clicks"))
                .field(FieldDefinition::new("fast_rebound", Integer).with_unit("clicks"))
                .field(FieldDefinition::new("slow_rebound", Integer).with_unit("clicks")),
        );

        self.register(
            EntityDefinition::new(EntityKind::Pressure, "Pressure with units")
                .field(FieldDefinition::new("value", Float))
                .field(FieldDefinition::new("unit", Standard(StandardKind::PressureUnit))),
        );
    }

    /// Register (or replace) an entity definition
    pub fn register(&mut self, definition: EntityDefinition) {
        self.entities.insert(definition.kind, definition);
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&EntityDefinition> {
        self.entities.get(&kind)
    }

    pub fn field(&self, kind: EntityKind, name: &str) -> Option<&FieldDefinition> {
        self.entity(kind).and_then(|definition| definition.get(name))
    }

    /// Registered kinds in catalogue order
    pub fn kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = self.entities.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn count(&self) -> usize {
        self.entities.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
