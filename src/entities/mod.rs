// 🚲 Entity Models - the bike configuration graph
//
// Each entity has:
// - A kind tag (which schema declaration it follows)
// - A map of field name → value, where "absent" means unset
// - Exclusive ownership of every nested entity below it

pub mod standards;

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub use standards::{
    BottomBracketStandard, HeadsetStandard, IscgStandard, PressureUnit, Standard, StandardKind,
    SuspensionType, WheelDiameter, WheelSize,
};

// ============================================================================
// ENTITY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    // Root and aggregates
    Bike,
    Usage,
    Price,
    Geometry,
    Components,
    Setup,

    // Frame & suspension
    Frame,
    Shock,
    Fork,

    // Cockpit
    Handlebars,
    Stem,
    Headset,
    Grips,

    // Brakes
    RimBrake,
    DiscBrake,
    BrakeDisc,
    Pads,

    // Wheels
    WheelPair,
    Wheel,
    Rim,
    Hub,
    Tyre,

    // Drivetrain
    BottomBracket,
    Cranks,
    Pedals,
    ChainGuide,
    Chainring,
    Cassette,
    Derailleur,
    Chain,

    // Contact points
    Saddle,
    Seatpost,

    // Setup records
    SuspensionSetup,
    Pressure,
}

impl EntityKind {
    pub const ALL: [EntityKind; 34] = [
        EntityKind::Bike,
        EntityKind::Usage,
        EntityKind::Price,
        EntityKind::Geometry,
        EntityKind::Components,
        EntityKind::Setup,
        EntityKind::Frame,
        EntityKind::Shock,
        EntityKind::Fork,
        EntityKind::Handlebars,
        EntityKind::Stem,
        EntityKind::Headset,
        EntityKind::Grips,
        EntityKind::RimBrake,
        EntityKind::DiscBrake,
        EntityKind::BrakeDisc,
        EntityKind::Pads,
        EntityKind::WheelPair,
        EntityKind::Wheel,
        EntityKind::Rim,
        EntityKind::Hub,
        EntityKind::Tyre,
        EntityKind::BottomBracket,
        EntityKind::Cranks,
        EntityKind::Pedals,
        EntityKind::ChainGuide,
        EntityKind::Chainring,
        EntityKind::Cassette,
        EntityKind::Derailleur,
        EntityKind::Chain,
        EntityKind::Saddle,
        EntityKind::Seatpost,
        EntityKind::SuspensionSetup,
        EntityKind::Pressure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Bike => "Bike",
            EntityKind::Usage => "Usage",
            EntityKind::Price => "Price",
            EntityKind::Geometry => "Geometry",
            EntityKind::Components => "Components",
            EntityKind::Setup => "Setup",
            EntityKind::Frame => "Frame",
            EntityKind::Shock => "Shock",
            EntityKind::Fork => "Fork",
            EntityKind::Handlebars => "Handlebars",
            EntityKind::Stem => "Stem",
            EntityKind::Headset => "Headset",
            EntityKind::Grips => "Grips",
            EntityKind::RimBrake => "RimBrake",
            EntityKind::DiscBrake => "DiscBrake",
            EntityKind::BrakeDisc => "BrakeDisc",
            EntityKind::Pads => "Pads",
            EntityKind::WheelPair => "WheelPair",
            EntityKind::Wheel => "Wheel",
            EntityKind::Rim => "Rim",
            EntityKind::Hub => "Hub",
            EntityKind::Tyre => "Tyre",
            EntityKind::BottomBracket => "BottomBracket",
            EntityKind::Cranks => "Cranks",
            EntityKind::Pedals => "Pedals",
            EntityKind::ChainGuide => "ChainGuide",
            EntityKind::Chainring => "Chainring",
            EntityKind::Cassette => "Cassette",
            EntityKind::Derailleur => "Derailleur",
            EntityKind::Chain => "Chain",
            EntityKind::Saddle => "Saddle",
            EntityKind::Seatpost => "Seatpost",
            EntityKind::SuspensionSetup => "SuspensionSetup",
            EntityKind::Pressure => "Pressure",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .copied()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// VALUE
// ============================================================================

/// A field value. A field that was never set has no `Value` at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Standard(Standard),
    Diameter(WheelDiameter),
    Entity(Box<Entity>),
    Collection(Vec<Entity>),
}

impl Value {
    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Standard(_) => "standard",
            Value::Diameter(_) => "diameter",
            Value::Entity(_) => "entity",
            Value::Collection(_) => "collection",
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Entity(_) | Value::Collection(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_standard(&self) -> Option<Standard> {
        match self {
            Value::Standard(standard) => Some(*standard),
            _ => None,
        }
    }

    pub fn as_wheel_size(&self) -> Option<WheelSize> {
        match self {
            Value::Standard(Standard::WheelSize(size)) => Some(*size),
            _ => None,
        }
    }

    pub fn as_diameter(&self) -> Option<WheelDiameter> {
        match self {
            Value::Diameter(diameter) => Some(*diameter),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_entity_mut(&mut self) -> Option<&mut Entity> {
        match self {
            Value::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Entity]> {
        match self {
            Value::Collection(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{:?}", text),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::Standard(standard) => write!(f, "{}", standard),
            Value::Diameter(diameter) => write!(f, "{}", diameter),
            Value::Entity(entity) => write!(f, "<{}>", entity.kind()),
            Value::Collection(items) => write!(f, "[{} entities]", items.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<Standard> for Value {
    fn from(value: Standard) -> Self {
        Value::Standard(value)
    }
}

impl From<WheelSize> for Value {
    fn from(value: WheelSize) -> Self {
        Value::Standard(value.into())
    }
}

impl From<SuspensionType> for Value {
    fn from(value: SuspensionType) -> Self {
        Value::Standard(value.into())
    }
}

impl From<HeadsetStandard> for Value {
    fn from(value: HeadsetStandard) -> Self {
        Value::Standard(value.into())
    }
}

impl From<BottomBracketStandard> for Value {
    fn from(value: BottomBracketStandard) -> Self {
        Value::Standard(value.into())
    }
}

impl From<PressureUnit> for Value {
    fn from(value: PressureUnit) -> Self {
        Value::Standard(value.into())
    }
}

impl From<IscgStandard> for Value {
    fn from(value: IscgStandard) -> Self {
        Value::Standard(value.into())
    }
}

impl From<WheelDiameter> for Value {
    fn from(value: WheelDiameter) -> Self {
        Value::Diameter(value)
    }
}

impl From<Entity> for Value {
    fn from(value: Entity) -> Self {
        Value::Entity(Box::new(value))
    }
}

impl From<Vec<Entity>> for Value {
    fn from(value: Vec<Entity>) -> Self {
        Value::Collection(value)
    }
}

// ============================================================================
// ENTITY
// ============================================================================

/// A configuration node: kind tag plus its set fields.
///
/// Fields are written through the validated setter (`Entity::set`, see
/// `validation`); reads go straight to the backing map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    kind: EntityKind,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Create an empty entity: every field unset
    pub fn new(kind: EntityKind) -> Self {
        Entity {
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Empty root
    pub fn bike() -> Self {
        Entity::new(EntityKind::Bike)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the field holds any value (including `0`, `false`, `""`)
    pub fn is_set(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Names of the fields that are currently set, in name order
    pub fn set_fields(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_text)
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_integer)
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_float)
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Nested entity held by a field
    pub fn child(&self, field: &str) -> Option<&Entity> {
        self.get(field).and_then(Value::as_entity)
    }

    pub fn child_mut(&mut self, field: &str) -> Option<&mut Entity> {
        self.fields.get_mut(field).and_then(Value::as_entity_mut)
    }

    /// Elements of a collection field (empty when unset)
    pub fn items(&self, field: &str) -> &[Entity] {
        self.get(field).and_then(Value::as_collection).unwrap_or(&[])
    }

    /// Follow a dotted path of entity fields ("components.wheels.front")
    pub fn path(&self, path: &str) -> Option<&Entity> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |entity, segment| entity.child(segment))
    }

    pub fn path_mut(&mut self, path: &str) -> Option<&mut Entity> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |entity, segment| entity.child_mut(segment))
    }

    /// Store a value that already passed validation
    pub(crate) fn commit(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    pub(crate) fn collection_mut(&mut self, field: &str) -> Option<&mut Vec<Entity>> {
        match self.fields.get_mut(field) {
            Some(Value::Collection(items)) => Some(items),
            _ => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
