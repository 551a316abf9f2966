// 📥 Spec-Sheet Importer
// Maps (label, raw text) rows from a product spec table onto a bike graph.
// One mapper per recognized label; every write goes through `Entity::set`,
// so imported data is held to the same rules as anything else.

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::builder::{build_entity, GraphBuilder};
use crate::entities::{
    BottomBracketStandard, Entity, EntityKind, HeadsetStandard, IscgStandard, SuspensionType,
    WheelDiameter, WheelSize,
};
use crate::error::{BikeError, Result};

// ============================================================================
// CORE TYPES
// ============================================================================

/// One row of a spec table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRow {
    pub label: String,
    pub text: String,
}

impl SpecRow {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        SpecRow {
            label: label.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Applied,
    /// Label has no mapper
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, BikeError)>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} applied, {} skipped, {} failed",
            self.applied.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// A mapper writes one spec row into a built bike
pub type Mapper = fn(&mut Entity, &str) -> Result<()>;

// ============================================================================
// IMPORTER
// ============================================================================

pub struct SpecImporter {
    mappers: HashMap<&'static str, Mapper>,
}

impl SpecImporter {
    /// Importer with a mapper for every label of a bike spec table
    pub fn new() -> Self {
        let mut importer = SpecImporter {
            mappers: HashMap::new(),
        };
        importer.register_default_mappers();
        importer
    }

    fn register_default_mappers(&mut self) {
        self.register("Product", map_product);
        self.register("Model Year", map_model_year);
        self.register("Wheel Size", map_wheel_size);
        self.register("Rear Travel", map_rear_travel);
        self.register("Rear Shock", map_rear_shock);
        self.register("Fork", map_fork);
        self.register("Fork Travel", map_fork_travel);
        self.register("Head Tube Diameter", map_head_tube);
        self.register("Headset", |bike, text| map_named(bike, "headset", text));
        self.register("Handlebar", map_handlebar);
        self.register("Stem", map_stem);
        self.register("Grips", map_grips);
        self.register("Brakes", map_brakes);
        self.register("Rear Derailleur", map_rear_derailleur);
        self.register("ISCG Tabs", map_iscg_tabs);
        self.register("Chainguide", map_chainguide);
        self.register("Cranks", map_cranks);
        self.register("Chainrings", map_chainrings);
        self.register("Bottom Bracket", map_bottom_bracket);
        self.register("Pedals", |bike, text| map_named(bike, "pedals", text));
        self.register("Chain", map_chain);
        self.register("Cassette", map_cassette);
        self.register("Rims", map_rims);
        self.register("Hubs", map_hubs);
        self.register("Tires", map_tires);
        self.register("Saddle", |bike, text| map_named(bike, "saddle", text));
        self.register("Seatpost", map_seatpost);
        self.register("Seatpost Diameter", map_seatpost_diameter);
        self.register("Rear Dropout / Hub Dimensions", map_rear_dropout);
        self.register("Weight", map_weight);
    }

    pub fn register(&mut self, label: &'static str, mapper: Mapper) {
        self.mappers.insert(label, mapper);
    }

    pub fn recognizes(&self, label: &str) -> bool {
        self.mappers.contains_key(label.trim())
    }

    /// Apply one row to an already built bike.
    ///
    /// A row is all-or-nothing: when any value from it is rejected, none of
    /// the row's other values are kept either.
    pub fn apply(&self, bike: &mut Entity, row: &SpecRow) -> Result<RowOutcome> {
        let label = row.label.trim();
        match self.mappers.get(label) {
            Some(mapper) => {
                let mut staged = bike.clone();
                mapper(&mut staged, row.text.trim())?;
                *bike = staged;
                Ok(RowOutcome::Applied)
            }
            None => {
                debug!(label, "no mapper for label, skipping");
                Ok(RowOutcome::Skipped)
            }
        }
    }

    /// Build the bike, then apply every row. A rejected row is recorded,
    /// leaves the bike as it was, and the import carries on with the next one.
    pub fn import(&self, bike: &mut Entity, rows: &[SpecRow]) -> ImportReport {
        let placeholder = Entity::bike();
        let mut builder = GraphBuilder::new(Some(std::mem::replace(bike, placeholder)));
        let target = builder.bike_mut();

        let mut report = ImportReport::default();
        for row in rows {
            let label = row.label.trim().to_string();
            match self.apply(target, row) {
                Ok(RowOutcome::Applied) => report.applied.push(label),
                Ok(RowOutcome::Skipped) => report.skipped.push(label),
                Err(err) => {
                    warn!(label = %label, error = %err, "spec row rejected");
                    report.failed.push((label, err));
                }
            }
        }

        *bike = builder.into_bike();
        report
    }
}

impl Default for SpecImporter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SPEC SHEET FILES
// ============================================================================

/// Read a two-column `label,value` CSV (with header row)
pub fn read_spec_sheet<R: Read>(reader: R) -> AnyResult<Vec<SpecRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let record = result.with_context(|| {
            format!("Failed to parse spec sheet line {}", line_num + 2)
        })?;

        let label = record.get(0).unwrap_or("").trim();
        if label.is_empty() {
            continue;
        }
        let text = record.get(1).unwrap_or("");
        rows.push(SpecRow::new(label, text));
    }
    Ok(rows)
}

pub fn load_spec_sheet(path: &Path) -> AnyResult<Vec<SpecRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open spec sheet: {}", path.display()))?;
    read_spec_sheet(file).with_context(|| format!("Failed to read spec sheet: {}", path.display()))
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// Spec cells list details separated by commas or line breaks
fn items(text: &str) -> Vec<&str> {
    text.split(|c: char| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Number written right before `unit` ("Width 780mm" → 780)
fn number_before(text: &str, unit: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    let before = &lower[..lower.find(unit)?];
    let token = before.split_whitespace().last()?;
    let numeric: String = token
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse().ok()
}

/// First number in the text ("160mm" → 160)
fn first_number(text: &str) -> Option<f64> {
    let numeric: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.trim_end_matches('.').parse().ok()
}

/// Integer token carrying a one-letter suffix ("32t" teeth, "32h" holes)
fn suffixed_number(text: &str, suffix: char) -> Option<i64> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .find_map(|token| token.to_lowercase().strip_suffix(suffix)?.parse().ok())
}

fn whole(value: f64) -> i64 {
    value.round() as i64
}

fn unreadable(entity: EntityKind, field: &str, text: &str, what: &str) -> BikeError {
    BikeError::invalid(entity, field, text, format!("could not read {} from spec text", what))
}

fn millimeters(entity: EntityKind, field: &str, text: &str) -> Result<i64> {
    number_before(text, "mm")
        .or_else(|| first_number(text))
        .map(whole)
        .ok_or_else(|| unreadable(entity, field, text, "a length in mm"))
}

/// Speed count from "12-speed" / "12 speed" / "12s"
fn speeds(text: &str) -> Option<i64> {
    number_before(text, "speed")
        .or_else(|| {
            text.split_whitespace()
                .find_map(|token| token.to_lowercase().strip_suffix('s')?.parse::<f64>().ok())
        })
        .map(whole)
}

fn components(bike: &mut Entity) -> Result<&mut Entity> {
    bike.child_mut("components").ok_or_else(|| {
        BikeError::invalid(EntityKind::Bike, "components", "-", "components missing")
    })
}

fn slot<'a>(bike: &'a mut Entity, name: &str) -> Result<&'a mut Entity> {
    bike.path_mut(&format!("components.{}", name)).ok_or_else(|| {
        BikeError::invalid(
            EntityKind::Components,
            name,
            "-",
            "component slot missing; build the bike before importing",
        )
    })
}

fn wheel_part<'a>(bike: &'a mut Entity, side: &str, part: &str) -> Result<&'a mut Entity> {
    bike.path_mut(&format!("components.wheels.{}.{}", side, part))
        .ok_or_else(|| {
            BikeError::invalid(
                EntityKind::Wheel,
                part,
                "-",
                "wheel part missing; build the bike before importing",
            )
        })
}

/// First item is the product name, the rest is kept as additional info
fn set_name_and_info(component: &mut Entity, details: &[&str]) -> Result<()> {
    if let Some(name) = details.first() {
        component.set("name", *name)?;
    }
    if details.len() > 1 {
        component.set("additional_info", details[1..].join(", "))?;
    }
    Ok(())
}

// ============================================================================
// MAPPERS
// ============================================================================

fn map_named(bike: &mut Entity, slot_name: &str, text: &str) -> Result<()> {
    set_name_and_info(slot(bike, slot_name)?, &items(text))
}

fn map_product(bike: &mut Entity, text: &str) -> Result<()> {
    match text.split_once(' ') {
        Some((brand, model)) => {
            bike.set("brand", brand)?;
            bike.set("model", model.trim())
        }
        None => bike.set("brand", text),
    }
}

fn map_model_year(bike: &mut Entity, text: &str) -> Result<()> {
    let year: i64 = text
        .parse()
        .map_err(|_| unreadable(EntityKind::Bike, "model_year", text, "a year"))?;
    bike.set("model_year", year)
}

/// Keeps a size that is already set
fn map_wheel_size(bike: &mut Entity, text: &str) -> Result<()> {
    let wheels = slot(bike, "wheels")?;
    if wheels.is_set("size") {
        return Ok(());
    }
    let size = WheelSize::detect(text)
        .ok_or_else(|| unreadable(EntityKind::WheelPair, "size", text, "a wheel size"))?;
    wheels.set("size", size)
}

fn map_rear_travel(bike: &mut Entity, text: &str) -> Result<()> {
    let travel = millimeters(EntityKind::Frame, "travel", text)?;
    slot(bike, "frame")?.set("travel", travel)
}

fn map_rear_shock(bike: &mut Entity, text: &str) -> Result<()> {
    let shock = slot(bike, "shock")?;
    set_name_and_info(shock, &items(text))?;
    if let Some(kind) = SuspensionType::detect(text) {
        shock.set("suspension_type", kind)?;
    }
    Ok(())
}

fn map_fork(bike: &mut Entity, text: &str) -> Result<()> {
    let fork = slot(bike, "fork")?;
    let mut details = items(text);

    if let Some(index) = details
        .iter()
        .skip(1)
        .position(|item| item.to_lowercase().contains("offset"))
    {
        let item = details.remove(index + 1);
        fork.set("offset", millimeters(EntityKind::Fork, "offset", item)?)?;
    }
    if details.iter().any(|item| item.to_lowercase().contains("boost")) {
        fork.set("boost", true)?;
    }
    if let Some(kind) = SuspensionType::detect(text) {
        fork.set("suspension_type", kind)?;
    }
    set_name_and_info(fork, &details)
}

fn map_fork_travel(bike: &mut Entity, text: &str) -> Result<()> {
    let travel = millimeters(EntityKind::Fork, "travel", text)?;
    slot(bike, "fork")?.set("travel", travel)
}

fn map_head_tube(bike: &mut Entity, text: &str) -> Result<()> {
    let Some(standard) = HeadsetStandard::detect(text) else {
        return Ok(());
    };
    slot(bike, "headset")?.set("standard", standard)?;
    slot(bike, "frame")?.set("head_tube", standard)
}

fn map_handlebar(bike: &mut Entity, text: &str) -> Result<()> {
    let bars = slot(bike, "handlebars")?;
    let details = items(text);
    let mut extra = Vec::new();

    for item in details.iter().skip(1) {
        let lower = item.to_lowercase();
        if lower.contains("width") {
            bars.set("width", millimeters(EntityKind::Handlebars, "width", item)?)?;
        } else if lower.contains("diameter") || lower.contains("clamp") {
            let diameter = number_before(item, "mm")
                .ok_or_else(|| unreadable(EntityKind::Handlebars, "diameter", item, "a diameter"))?;
            bars.set("diameter", diameter)?;
        } else if lower.contains("rise") {
            bars.set("rise", millimeters(EntityKind::Handlebars, "rise", item)?)?;
        } else {
            extra.push(*item);
        }
    }

    if let Some(name) = details.first() {
        bars.set("name", *name)?;
    }
    if !extra.is_empty() {
        bars.set("additional_info", extra.join(", "))?;
    }
    Ok(())
}

fn map_stem(bike: &mut Entity, text: &str) -> Result<()> {
    let stem = slot(bike, "stem")?;
    let details = items(text);
    let mut extra = Vec::new();

    for item in details.iter().skip(1) {
        let lower = item.to_lowercase();
        if lower.contains("length") {
            stem.set("length", millimeters(EntityKind::Stem, "length", item)?)?;
        } else if lower.contains("bar clamp") {
            let clamp = number_before(item, "mm")
                .ok_or_else(|| unreadable(EntityKind::Stem, "bar_clamp", item, "a clamp size"))?;
            stem.set("bar_clamp", clamp)?;
        } else if lower.contains("rise") {
            let angle = number_before(item, "°")
                .or_else(|| first_number(item))
                .ok_or_else(|| unreadable(EntityKind::Stem, "rise_angle", item, "an angle"))?;
            stem.set("rise_angle", whole(angle))?;
        } else {
            extra.push(*item);
        }
    }

    if let Some(name) = details.first() {
        stem.set("name", *name)?;
    }
    if !extra.is_empty() {
        stem.set("additional_info", extra.join(", "))?;
    }
    Ok(())
}

fn map_grips(bike: &mut Entity, text: &str) -> Result<()> {
    let grips = slot(bike, "grips")?;
    let mut details = items(text);
    if let Some(index) = details.iter().position(|item| item.to_lowercase().contains("lock")) {
        grips.set("lock_on", true)?;
        if index > 0 {
            details.remove(index);
        }
    }
    set_name_and_info(grips, &details)
}

/// Brake slot as a disc brake; a rim brake there is replaced because a rotor
/// was listed for it
fn disc_brake<'a>(bike: &'a mut Entity, slot_name: &str) -> Result<&'a mut Entity> {
    let is_disc = slot(bike, slot_name)?.kind() == EntityKind::DiscBrake;
    if !is_disc {
        components(bike)?.set(slot_name, build_entity(EntityKind::DiscBrake))?;
    }
    slot(bike, slot_name)
}

fn set_rotor(bike: &mut Entity, slot_name: &str, diameter: i64, centerlock: bool) -> Result<()> {
    let brake = disc_brake(bike, slot_name)?;
    if brake.child("disc").is_none() {
        brake.set("disc", build_entity(EntityKind::BrakeDisc))?;
    }
    let disc = brake
        .child_mut("disc")
        .ok_or_else(|| BikeError::invalid(EntityKind::DiscBrake, "disc", "-", "rotor missing"))?;
    disc.set("diameter", diameter)?;
    if centerlock {
        disc.set("centerlock", true)?;
    }
    Ok(())
}

fn map_brakes(bike: &mut Entity, text: &str) -> Result<()> {
    let details = items(text);
    let text_lower = text.to_lowercase();
    let centerlock = text_lower.contains("centerlock") || text_lower.contains("center lock");

    for item in details.iter().skip(1) {
        let lower = item.to_lowercase();
        if !lower.contains("rotor") {
            continue;
        }
        let diameter = millimeters(EntityKind::BrakeDisc, "diameter", item)?;
        let front = lower.contains("front");
        let rear = lower.contains("rear");

        if lower.contains("rotors") || (!front && !rear) {
            set_rotor(bike, "front_brake", diameter, centerlock)?;
            set_rotor(bike, "rear_brake", diameter, centerlock)?;
        } else {
            if front {
                set_rotor(bike, "front_brake", diameter, centerlock)?;
            }
            if rear {
                set_rotor(bike, "rear_brake", diameter, centerlock)?;
            }
        }
    }

    let extra: Vec<&str> = details
        .iter()
        .skip(1)
        .filter(|item| {
            let lower = item.to_lowercase();
            !lower.contains("rotor") && !lower.contains("centerlock") && !lower.contains("center lock")
        })
        .copied()
        .collect();
    let pistons = details
        .iter()
        .find(|item| item.to_lowercase().contains("piston"))
        .and_then(|item| first_number(item))
        .map(whole);

    for slot_name in ["front_brake", "rear_brake"] {
        let brake = slot(bike, slot_name)?;
        if let (Some(count), EntityKind::DiscBrake) = (pistons, brake.kind()) {
            brake.set("pistons", count)?;
        }
        if let Some(name) = details.first() {
            brake.set("name", *name)?;
        }
        if !extra.is_empty() {
            brake.set("additional_info", extra.join(", "))?;
        }
    }
    Ok(())
}

fn map_rear_derailleur(bike: &mut Entity, text: &str) -> Result<()> {
    let derailleur = slot(bike, "derailleur")?;
    set_name_and_info(derailleur, &items(text))?;
    if let Some(count) = speeds(text) {
        derailleur.set("speeds", count)?;
    }
    Ok(())
}

/// "None" and other unknown layouts leave the tabs unset
fn map_iscg_tabs(bike: &mut Entity, text: &str) -> Result<()> {
    match IscgStandard::detect(text) {
        Some(standard) => slot(bike, "frame")?.set("iscg_tabs", standard),
        None => Ok(()),
    }
}

fn map_chainguide(bike: &mut Entity, text: &str) -> Result<()> {
    let guide = slot(bike, "chain_guide")?;
    set_name_and_info(guide, &items(text))?;
    if let Some(standard) = IscgStandard::detect(text) {
        guide.set("mount", standard)?;
    }
    Ok(())
}

fn map_cranks(bike: &mut Entity, text: &str) -> Result<()> {
    let cranks = slot(bike, "cranks")?;
    set_name_and_info(cranks, &items(text))?;
    if let Some(length) = number_before(text, "mm") {
        cranks.set("length", whole(length))?;
    }
    if text.to_lowercase().contains("boost") {
        cranks.set("boost", true)?;
    }
    Ok(())
}

/// One chainring per "<n>t" item, added only when none are listed yet
fn map_chainrings(bike: &mut Entity, text: &str) -> Result<()> {
    let components = components(bike)?;
    if !components.items("chainrings").is_empty() {
        return Ok(());
    }

    for item in items(text) {
        let Some(teeth) = suffixed_number(item, 't') else {
            continue;
        };
        let ring = build_entity(EntityKind::Chainring)
            .with("name", item)?
            .with("tooth_count", teeth)?;
        components.push("chainrings", ring)?;
    }
    Ok(())
}

fn map_bottom_bracket(bike: &mut Entity, text: &str) -> Result<()> {
    let bracket = slot(bike, "bottom_bracket")?;
    set_name_and_info(bracket, &items(text))?;
    if let Some(standard) = BottomBracketStandard::detect(text) {
        bracket.set("standard", standard)?;
    }
    Ok(())
}

fn map_chain(bike: &mut Entity, text: &str) -> Result<()> {
    let chain = slot(bike, "chain")?;
    set_name_and_info(chain, &items(text))?;
    if let Some(count) = speeds(text) {
        chain.set("speeds_compatibility", count)?;
    }
    Ok(())
}

fn map_cassette(bike: &mut Entity, text: &str) -> Result<()> {
    let cassette = slot(bike, "cassette")?;
    set_name_and_info(cassette, &items(text))?;
    if let Some(count) = speeds(text) {
        cassette.set("speeds", count)?;
    }
    let range = text.split_whitespace().find(|token| {
        let lower = token.to_lowercase();
        lower.contains('-') && lower.ends_with('t') && lower.starts_with(|c: char| c.is_ascii_digit())
    });
    if let Some(range) = range {
        cassette.set("tooth_range", range.trim_end_matches(','))?;
    }
    Ok(())
}

/// (front, rear) diameters implied by the text; mixed sizes split
fn wheel_diameters(text: &str) -> Option<(WheelDiameter, WheelDiameter)> {
    let (front, rear) = WheelSize::detect(text)?.split();
    Some((front.diameter()?, rear.diameter()?))
}

fn map_wheel_parts(bike: &mut Entity, part: &str, text: &str) -> Result<()> {
    let details = items(text);
    let diameters = wheel_diameters(text);

    for (index, side) in ["front", "rear"].into_iter().enumerate() {
        let entity = wheel_part(bike, side, part)?;
        set_name_and_info(entity, &details)?;
        if let Some((front, rear)) = diameters {
            entity.set("diameter", if index == 0 { front } else { rear })?;
        }
    }
    Ok(())
}

fn map_rims(bike: &mut Entity, text: &str) -> Result<()> {
    map_wheel_parts(bike, "rim", text)?;
    if let Some(holes) = suffixed_number(text, 'h') {
        for side in ["front", "rear"] {
            wheel_part(bike, side, "rim")?.set("spoke_count", holes)?;
        }
    }
    Ok(())
}

fn map_hubs(bike: &mut Entity, text: &str) -> Result<()> {
    let details = items(text);
    let boost = text.to_lowercase().contains("boost");
    for side in ["front", "rear"] {
        let hub = wheel_part(bike, side, "hub")?;
        set_name_and_info(hub, &details)?;
        if boost {
            hub.set("boost", true)?;
        }
    }
    Ok(())
}

/// Tyre width from "29x2.5" style sizes
fn tyre_width(item: &str) -> Option<f64> {
    item.split_whitespace().find_map(|token| {
        let (diameter, width) = token.split_once(|c: char| c == 'x' || c == 'X')?;
        diameter.trim_end_matches('"').parse::<f64>().ok()?;
        first_number(width)
    })
}

/// "Front: ..., Rear: ..." lists a tyre per wheel; otherwise both share one
fn tyre_details<'a>(details: &[&'a str], side: &str) -> Vec<&'a str> {
    let matching: Vec<&'a str> = details
        .iter()
        .filter(|item| item.to_lowercase().starts_with(side))
        .copied()
        .collect();
    if matching.is_empty() {
        details.to_vec()
    } else {
        matching
    }
}

fn map_tires(bike: &mut Entity, text: &str) -> Result<()> {
    let details = items(text);
    let diameters = wheel_diameters(text);

    for (index, side) in ["front", "rear"].into_iter().enumerate() {
        let side_details = tyre_details(&details, side);
        let tyre = wheel_part(bike, side, "tyre")?;
        set_name_and_info(tyre, &side_details)?;
        if let Some(width) = side_details.iter().find_map(|item| tyre_width(item)) {
            tyre.set("width", width)?;
        }
        if let Some((front, rear)) = diameters {
            tyre.set("diameter", if index == 0 { front } else { rear })?;
        }
    }
    Ok(())
}

fn map_seatpost(bike: &mut Entity, text: &str) -> Result<()> {
    let seatpost = slot(bike, "seatpost")?;
    set_name_and_info(seatpost, &items(text))?;
    let lower = text.to_lowercase();
    if lower.contains("dropper") || lower.contains("reverb") || lower.contains("transfer") {
        seatpost.set("telescopic", true)?;
        if let Some(travel) = number_before(text, "mm") {
            seatpost.set("travel", whole(travel))?;
        }
    }
    Ok(())
}

fn map_seatpost_diameter(bike: &mut Entity, text: &str) -> Result<()> {
    let diameter = number_before(text, "mm")
        .or_else(|| first_number(text))
        .ok_or_else(|| unreadable(EntityKind::Seatpost, "diameter", text, "a diameter"))?;
    slot(bike, "seatpost")?.set("diameter", diameter)
}

fn map_rear_dropout(bike: &mut Entity, text: &str) -> Result<()> {
    slot(bike, "frame")?.set("rear_dropout", text)?;
    let rear_hub = wheel_part(bike, "rear", "hub")?;
    rear_hub.set("axle", text)?;
    let lower = text.to_lowercase();
    if lower.contains("boost") || lower.contains("148") {
        rear_hub.set("boost", true)?;
        slot(bike, "frame")?.set("boost", true)?;
    }
    Ok(())
}

/// Stored in kg; pound values are converted
fn map_weight(bike: &mut Entity, text: &str) -> Result<()> {
    let lower = text.to_lowercase();
    let kilograms = if let Some(kg) = number_before(&lower, "kg") {
        kg
    } else if let Some(pounds) = number_before(&lower, "lb") {
        pounds * 0.453_592
    } else {
        return Err(unreadable(EntityKind::Bike, "weight", text, "a weight in kg or lb"));
    };
    bike.set("weight", (kilograms * 100.0).round() / 100.0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::entities::{Standard, Value, WheelDiameter};

    fn apply(bike: &mut Entity, label: &str, text: &str) -> Result<RowOutcome> {
        SpecImporter::new().apply(bike, &SpecRow::new(label, text))
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(number_before("Width 780mm", "mm"), Some(780.0));
        assert_eq!(number_before("Bar clamp 35mm", "mm"), Some(35.0));
        assert_eq!(number_before("no unit", "mm"), None);
        assert_eq!(first_number("160mm"), Some(160.0));
        assert_eq!(speeds("SRAM GX Eagle, 12-speed"), Some(12));
        assert_eq!(suffixed_number("X-Sync 2, 32t", 't'), Some(32));
        assert_eq!(suffixed_number("DT Swiss EX 511, 32h", 'h'), Some(32));
        assert_eq!(tyre_width("Maxxis Assegai 29x2.5\""), Some(2.5));
        assert_eq!(items("A, B\nC"), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_product_splits_brand_and_model() {
        let mut bike = build(None);
        apply(&mut bike, "Product", "YT Capra 29 Core 4").unwrap();
        assert_eq!(bike.text("brand"), Some("YT"));
        assert_eq!(bike.text("model"), Some("Capra 29 Core 4"));
    }

    #[test]
    fn test_model_year_must_be_numeric() {
        let mut bike = build(None);
        apply(&mut bike, "Model Year", "2022").unwrap();
        assert_eq!(bike.integer("model_year"), Some(2022));
        assert!(apply(&mut bike, "Model Year", "soon").is_err());
    }

    #[test]
    fn test_unrecognized_label_is_skipped() {
        let mut bike = build(None);
        let before = bike.clone();
        let outcome = apply(&mut bike, "Shifters", "SRAM GX Eagle").unwrap();
        assert_eq!(outcome, RowOutcome::Skipped);
        assert_eq!(bike, before);
    }

    #[test]
    fn test_labels_are_trimmed() {
        let importer = SpecImporter::new();
        assert!(importer.recognizes("Bottom Bracket\t"));
        assert!(importer.recognizes("Pedals "));
        assert!(!importer.recognizes("Front Derailleur"));
    }

    #[test]
    fn test_wheel_size_mullet_propagates() {
        let mut bike = build(None);
        apply(&mut bike, "Wheel Size", "29\" front, 27.5\" rear").unwrap();

        let front = bike.path("components.wheels.front").unwrap();
        let rear = bike.path("components.wheels.rear").unwrap();
        assert_eq!(front.get("size").and_then(Value::as_wheel_size), Some(WheelSize::TwentyNine));
        assert_eq!(
            rear.get("size").and_then(Value::as_wheel_size),
            Some(WheelSize::TwentySevenFive)
        );
    }

    #[test]
    fn test_wheel_size_not_overwritten() {
        let mut bike = build(None);
        apply(&mut bike, "Wheel Size", "26\"").unwrap();
        apply(&mut bike, "Wheel Size", "29\"").unwrap();
        assert_eq!(
            bike.path("components.wheels")
                .and_then(|w| w.get("size"))
                .and_then(Value::as_wheel_size),
            Some(WheelSize::TwentySix)
        );
    }

    #[test]
    fn test_travel_strips_unit() {
        let mut bike = build(None);
        apply(&mut bike, "Rear Travel", "165mm").unwrap();
        apply(&mut bike, "Fork Travel", "170mm").unwrap();
        assert_eq!(bike.path("components.frame").and_then(|f| f.integer("travel")), Some(165));
        assert_eq!(bike.path("components.fork").and_then(|f| f.integer("travel")), Some(170));
    }

    #[test]
    fn test_fork_offset_and_info() {
        let mut bike = build(None);
        apply(&mut bike, "Fork", "RockShox ZEB Select Air, 44mm offset, Charger RC damper").unwrap();

        let fork = bike.path("components.fork").unwrap();
        assert_eq!(fork.text("name"), Some("RockShox ZEB Select Air"));
        assert_eq!(fork.integer("offset"), Some(44));
        assert_eq!(fork.text("additional_info"), Some("Charger RC damper"));
        assert_eq!(
            fork.get("suspension_type").and_then(Value::as_standard),
            Some(Standard::Suspension(SuspensionType::Air))
        );
    }

    #[test]
    fn test_head_tube_sets_headset_and_frame() {
        let mut bike = build(None);
        apply(&mut bike, "Head Tube Diameter", "Tapered 1 1/8\" to 1.5\"").unwrap();
        let expected = Some(Standard::Headset(HeadsetStandard::Tapered));
        assert_eq!(
            bike.path("components.headset").and_then(|h| h.get("standard")).and_then(Value::as_standard),
            expected
        );
        assert_eq!(
            bike.path("components.frame").and_then(|f| f.get("head_tube")).and_then(Value::as_standard),
            expected
        );
    }

    #[test]
    fn test_handlebar_and_stem_details() {
        let mut bike = build(None);
        apply(&mut bike, "Handlebar", "Race Face Turbine R, Width 780mm, Rise 20mm, Diameter 35mm").unwrap();
        apply(&mut bike, "Stem", "Race Face Turbine R, Length 40mm, Bar clamp 35mm, Rise 0°").unwrap();

        let bars = bike.path("components.handlebars").unwrap();
        assert_eq!(bars.integer("width"), Some(780));
        assert_eq!(bars.integer("rise"), Some(20));
        assert_eq!(bars.float("diameter"), Some(35.0));
        assert!(!bars.is_set("additional_info"));

        let stem = bike.path("components.stem").unwrap();
        assert_eq!(stem.integer("length"), Some(40));
        assert_eq!(stem.float("bar_clamp"), Some(35.0));
        assert_eq!(stem.integer("rise_angle"), Some(0));
    }

    #[test]
    fn test_grips_lock_on() {
        let mut bike = build(None);
        apply(&mut bike, "Grips", "ODI Elite Pro, lock-on").unwrap();
        let grips = bike.path("components.grips").unwrap();
        assert_eq!(grips.boolean("lock_on"), Some(true));
        assert_eq!(grips.text("name"), Some("ODI Elite Pro"));
        assert!(!grips.is_set("additional_info"));
    }

    #[test]
    fn test_brakes_set_rotor_diameters() {
        let mut bike = build(None);
        apply(
            &mut bike,
            "Brakes",
            "SRAM Code RSC, 4-piston, Front rotor 220mm, Rear rotor 200mm",
        )
        .unwrap();

        assert_eq!(
            bike.path("components.front_brake.disc").and_then(|d| d.integer("diameter")),
            Some(220)
        );
        assert_eq!(
            bike.path("components.rear_brake.disc").and_then(|d| d.integer("diameter")),
            Some(200)
        );
        let front = bike.path("components.front_brake").unwrap();
        assert_eq!(front.text("name"), Some("SRAM Code RSC"));
        assert_eq!(front.text("additional_info"), Some("4-piston"));
        assert_eq!(front.integer("pistons"), Some(4));
    }

    #[test]
    fn test_brakes_reject_illegal_rotor() {
        let mut bike = build(None);
        let err = apply(&mut bike, "Brakes", "Magura MT5, 205mm rotors").unwrap_err();
        assert!(err.is_invalid_value());
        assert!(!bike.path("components.front_brake.disc").unwrap().is_set("diameter"));
    }

    #[test]
    fn test_rotor_replaces_rim_brake() {
        let mut bike = build(None);
        bike.path_mut("components")
            .unwrap()
            .set("front_brake", Entity::new(EntityKind::RimBrake))
            .unwrap();
        apply(&mut bike, "Brakes", "Shimano XT, 203mm rotors, centerlock").unwrap();

        let front = bike.path("components.front_brake").unwrap();
        assert_eq!(front.kind(), EntityKind::DiscBrake);
        assert_eq!(front.path("disc").and_then(|d| d.integer("diameter")), Some(203));
        assert_eq!(front.path("disc").and_then(|d| d.boolean("centerlock")), Some(true));
        assert!(!front.is_set("additional_info"));
    }

    #[test]
    fn test_rims_and_tires_share_diameter_rules() {
        let mut bike = build(None);
        apply(&mut bike, "Rims", "DT Swiss EX 511, 32h, 29\"").unwrap();
        apply(&mut bike, "Tires", "Maxxis Assegai 29x2.5\", EXO+").unwrap();

        let wheel = bike.path("components.wheels.front").unwrap();
        assert_eq!(
            wheel.path("rim").and_then(|r| r.get("diameter")).and_then(Value::as_diameter),
            Some(WheelDiameter::TwentyNine)
        );
        assert_eq!(wheel.path("rim").and_then(|r| r.integer("spoke_count")), Some(32));
        assert_eq!(wheel.path("tyre").and_then(|t| t.float("width")), Some(2.5));
        assert!(wheel.checked_get("diameter").is_ok());
    }

    #[test]
    fn test_mismatched_rim_and_tyre_detected_on_read() {
        let mut bike = build(None);
        apply(&mut bike, "Rims", "DT Swiss EX 511, 27.5\"").unwrap();
        apply(&mut bike, "Tires", "Maxxis Minion DHF 29x2.5\"").unwrap();

        let wheel = bike.path("components.wheels.rear").unwrap();
        assert!(wheel.checked_get("diameter").unwrap_err().is_consistency_violation());
    }

    #[test]
    fn test_rejected_row_leaves_no_partial_write() {
        let mut bike = build(None);
        let before = bike.clone();
        let err = apply(
            &mut bike,
            "Brakes",
            "SRAM Code RSC, Front rotor 200mm, Rear rotor 205mm",
        )
        .unwrap_err();

        assert!(err.is_invalid_value());
        assert_eq!(bike, before);
        assert!(!bike.path("components.front_brake.disc").unwrap().is_set("diameter"));
    }

    #[test]
    fn test_tire_and_rim_details_are_not_diameters() {
        let mut bike = build(None);
        apply(&mut bike, "Tires", "Maxxis Minion DHR II 2.4\", 3C MaxxTerra, EXO+, 120tpi").unwrap();
        apply(&mut bike, "Rims", "WTB ST i29 TCS 2.0, 28h").unwrap();

        let wheel = bike.path("components.wheels.front").unwrap();
        assert!(!wheel.path("tyre").unwrap().is_set("diameter"));
        assert!(!wheel.path("rim").unwrap().is_set("diameter"));
        assert_eq!(wheel.path("rim").and_then(|r| r.integer("spoke_count")), Some(28));
        assert!(wheel.checked_get("diameter").is_ok());
    }

    #[test]
    fn test_mullet_rims() {
        let mut bike = build(None);
        apply(&mut bike, "Rims", "Race Face AR 30, 29\" front, 27.5\" rear").unwrap();
        assert_eq!(
            bike.path("components.wheels.rear.rim")
                .and_then(|r| r.get("diameter"))
                .and_then(Value::as_diameter),
            Some(WheelDiameter::TwentySevenFive)
        );
    }

    #[test]
    fn test_drivetrain_details() {
        let mut bike = build(None);
        apply(&mut bike, "Cranks", "SRAM GX Eagle, 170mm").unwrap();
        apply(&mut bike, "Chainrings", "32t").unwrap();
        apply(&mut bike, "Cassette", "SRAM XG-1275 Eagle, 12-speed, 10-52t").unwrap();
        apply(&mut bike, "Bottom Bracket", "SRAM DUB BSA 73mm").unwrap();
        apply(&mut bike, "Chain", "SRAM GX Eagle 12-speed").unwrap();

        let components = bike.child("components").unwrap();
        assert_eq!(components.path("cranks").and_then(|c| c.integer("length")), Some(170));
        assert_eq!(components.items("chainrings")[0].integer("tooth_count"), Some(32));
        assert_eq!(components.path("cassette").and_then(|c| c.integer("speeds")), Some(12));
        assert_eq!(components.path("cassette").and_then(|c| c.text("tooth_range")), Some("10-52t"));
        assert_eq!(
            components.path("bottom_bracket").and_then(|b| b.get("standard")).and_then(Value::as_standard),
            Some(Standard::BottomBracket(BottomBracketStandard::Threaded))
        );
        assert_eq!(
            components.path("chain").and_then(|c| c.integer("speeds_compatibility")),
            Some(12)
        );
    }

    #[test]
    fn test_weight_in_pounds_is_converted() {
        let mut bike = build(None);
        apply(&mut bike, "Weight", "35 lb").unwrap();
        assert_eq!(bike.float("weight"), Some(15.88));
        apply(&mut bike, "Weight", "16.2 kg").unwrap();
        assert_eq!(bike.float("weight"), Some(16.2));
    }

    #[test]
    fn test_import_builds_first_and_reports() {
        let mut bike = Entity::bike();
        let rows = vec![
            SpecRow::new("Product", "YT Capra Core 3"),
            SpecRow::new("Shifters", "SRAM GX"),
            SpecRow::new("Brakes", "SRAM Code R, 205mm rotors"),
            SpecRow::new("Fork Travel", "170mm"),
        ];
        let report = SpecImporter::new().import(&mut bike, &rows);

        assert_eq!(report.applied, vec!["Product", "Fork Travel"]);
        assert_eq!(report.skipped, vec!["Shifters"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "Brakes");
        assert!(!report.is_clean());
        assert!(bike.path("setup.shock").is_some());
        assert_eq!(bike.path("components.fork").and_then(|f| f.integer("travel")), Some(170));
    }

    #[test]
    fn test_read_spec_sheet_csv() {
        let csv = "label,value\nProduct,YT Capra 29\nWheel Size,\"29\"\"\"\n,ignored\nWeight,15.6 kg\n";
        let rows = read_spec_sheet(csv.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                SpecRow::new("Product", "YT Capra 29"),
                SpecRow::new("Wheel Size", "29\""),
                SpecRow::new("Weight", "15.6 kg"),
            ]
        );
    }
}
