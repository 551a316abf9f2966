// 📏 Component standards - closed enumerations
// Every value a standard field may hold is listed here; nothing else is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SUSPENSION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspensionType {
    Air,
    Spring,
}

impl SuspensionType {
    pub const ALL: [SuspensionType; 2] = [SuspensionType::Air, SuspensionType::Spring];

    pub fn as_str(&self) -> &'static str {
        match self {
            SuspensionType::Air => "air",
            SuspensionType::Spring => "spring",
        }
    }

    /// Detect from free text ("RockShox Super Deluxe Coil" → Spring)
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("coil") || lower.contains("spring") {
            return Some(SuspensionType::Spring);
        }
        if lower.contains("air") {
            return Some(SuspensionType::Air);
        }
        None
    }
}

// ============================================================================
// HEADSET STANDARD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadsetStandard {
    #[serde(rename = "tapered")]
    Tapered,
    #[serde(rename = "ahead")]
    Ahead,
    #[serde(rename = "threaded")]
    Threaded,
    #[serde(rename = "integrated")]
    Integrated,
    #[serde(rename = "integrated press fit")]
    IntegratedPressFit,
}

impl HeadsetStandard {
    pub const ALL: [HeadsetStandard; 5] = [
        HeadsetStandard::Tapered,
        HeadsetStandard::Ahead,
        HeadsetStandard::Threaded,
        HeadsetStandard::Integrated,
        HeadsetStandard::IntegratedPressFit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeadsetStandard::Tapered => "tapered",
            HeadsetStandard::Ahead => "ahead",
            HeadsetStandard::Threaded => "threaded",
            HeadsetStandard::Integrated => "integrated",
            HeadsetStandard::IntegratedPressFit => "integrated press fit",
        }
    }

    /// Longest standard name contained in the text wins, so
    /// "integrated press fit" is not read as plain "integrated".
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        Self::ALL
            .iter()
            .filter(|standard| lower.contains(standard.as_str()))
            .max_by_key(|standard| standard.as_str().len())
            .copied()
    }
}

// ============================================================================
// BOTTOM BRACKET STANDARD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BottomBracketStandard {
    #[serde(rename = "threaded")]
    Threaded,
    #[serde(rename = "press fit")]
    PressFit,
    #[serde(rename = "BB30")]
    Bb30,
    #[serde(rename = "ISIS")]
    Isis,
    #[serde(rename = "square")]
    Square,
}

impl BottomBracketStandard {
    pub const ALL: [BottomBracketStandard; 5] = [
        BottomBracketStandard::Threaded,
        BottomBracketStandard::PressFit,
        BottomBracketStandard::Bb30,
        BottomBracketStandard::Isis,
        BottomBracketStandard::Square,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BottomBracketStandard::Threaded => "threaded",
            BottomBracketStandard::PressFit => "press fit",
            BottomBracketStandard::Bb30 => "BB30",
            BottomBracketStandard::Isis => "ISIS",
            BottomBracketStandard::Square => "square",
        }
    }

    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        // BSA / English shells are threaded; PF30 is a press fit shell
        if lower.contains("bsa") || lower.contains("english") {
            return Some(BottomBracketStandard::Threaded);
        }
        if lower.contains("pf") || lower.contains("pressfit") {
            return Some(BottomBracketStandard::PressFit);
        }
        Self::ALL
            .iter()
            .find(|standard| lower.contains(&standard.as_str().to_lowercase()))
            .copied()
    }
}

// ============================================================================
// WHEEL SIZE CLASSIFICATION
// ============================================================================

/// Wheel-diameter classification of a wheel or wheel pair.
///
/// `Mixed` is the mullet setup: 29" front, 27.5" rear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelSize {
    #[serde(rename = "16\"")]
    Sixteen,
    #[serde(rename = "20\"")]
    Twenty,
    #[serde(rename = "24\"")]
    TwentyFour,
    #[serde(rename = "26\"")]
    TwentySix,
    #[serde(rename = "27.5\"")]
    TwentySevenFive,
    #[serde(rename = "29\"")]
    TwentyNine,
    #[serde(rename = "mixed")]
    Mixed,
}

impl WheelSize {
    pub const ALL: [WheelSize; 7] = [
        WheelSize::Sixteen,
        WheelSize::Twenty,
        WheelSize::TwentyFour,
        WheelSize::TwentySix,
        WheelSize::TwentySevenFive,
        WheelSize::TwentyNine,
        WheelSize::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelSize::Sixteen => "16\"",
            WheelSize::Twenty => "20\"",
            WheelSize::TwentyFour => "24\"",
            WheelSize::TwentySix => "26\"",
            WheelSize::TwentySevenFive => "27.5\"",
            WheelSize::TwentyNine => "29\"",
            WheelSize::Mixed => "mixed",
        }
    }

    /// Sizes a mixed pair resolves to, as (front, rear).
    pub fn split(&self) -> (WheelSize, WheelSize) {
        match self {
            WheelSize::Mixed => (WheelSize::TwentyNine, WheelSize::TwentySevenFive),
            other => (*other, *other),
        }
    }

    /// Rim/tyre diameter class matching this size, if it is a single size
    /// inside the supported diameter set.
    pub fn diameter(&self) -> Option<WheelDiameter> {
        match self {
            WheelSize::Twenty => Some(WheelDiameter::Twenty),
            WheelSize::TwentyFour => Some(WheelDiameter::TwentyFour),
            WheelSize::TwentySix => Some(WheelDiameter::TwentySix),
            WheelSize::TwentySevenFive => Some(WheelDiameter::TwentySevenFive),
            WheelSize::TwentyNine => Some(WheelDiameter::TwentyNine),
            WheelSize::Sixteen | WheelSize::Mixed => None,
        }
    }

    /// Classify a free-text size description from a spec sheet.
    ///
    /// "mullet", "mixed" or a 27.5/29 combination all mean `Mixed`. Sizes are
    /// read from whole tokens only (`29"`, `29x2.5`, `27.5`, `650B`, `26in`),
    /// so "120tpi" or a rim called "i29" name no size.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '/' | '(' | ')' | ';' | ':'))
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.iter().any(|token| matches!(*token, "mullet" | "mixed")) {
            return Some(WheelSize::Mixed);
        }

        let sizes: Vec<WheelSize> = tokens.iter().filter_map(|token| Self::from_token(token)).collect();
        if sizes.contains(&WheelSize::TwentyNine) && sizes.contains(&WheelSize::TwentySevenFive) {
            return Some(WheelSize::Mixed);
        }
        [
            WheelSize::TwentyNine,
            WheelSize::TwentySevenFive,
            WheelSize::TwentySix,
            WheelSize::TwentyFour,
            WheelSize::Twenty,
            WheelSize::Sixteen,
        ]
        .into_iter()
        .find(|size| sizes.contains(size))
    }

    /// Size named by one lowercase token, if the token is a wheel size
    fn from_token(token: &str) -> Option<Self> {
        if token.starts_with("650b") {
            return Some(WheelSize::TwentySevenFive);
        }
        // tyre sizes: 29x2.5
        let token = match token.split_once('x') {
            Some((diameter, width)) if width.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                diameter
            }
            Some(_) => return None,
            None => token,
        };
        let number = token
            .trim_end_matches(|c: char| matches!(c, '"' | '\'' | '\u{201d}' | '+'))
            .trim_end_matches("inch")
            .trim_end_matches("in")
            .trim_end_matches("er");
        match number {
            "16" => Some(WheelSize::Sixteen),
            "20" => Some(WheelSize::Twenty),
            "24" => Some(WheelSize::TwentyFour),
            "26" => Some(WheelSize::TwentySix),
            "27.5" => Some(WheelSize::TwentySevenFive),
            "29" => Some(WheelSize::TwentyNine),
            _ => None,
        }
    }
}

// ============================================================================
// WHEEL DIAMETER
// ============================================================================

/// Normalized rim/tyre/wheel diameter class (inches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDiameter {
    Twenty,
    TwentyFour,
    TwentySix,
    TwentySevenFive,
    TwentyNine,
}

impl WheelDiameter {
    pub const ALL: [WheelDiameter; 5] = [
        WheelDiameter::Twenty,
        WheelDiameter::TwentyFour,
        WheelDiameter::TwentySix,
        WheelDiameter::TwentySevenFive,
        WheelDiameter::TwentyNine,
    ];

    pub fn inches(&self) -> f64 {
        match self {
            WheelDiameter::Twenty => 20.0,
            WheelDiameter::TwentyFour => 24.0,
            WheelDiameter::TwentySix => 26.0,
            WheelDiameter::TwentySevenFive => 27.5,
            WheelDiameter::TwentyNine => 29.0,
        }
    }

    pub fn from_inches(inches: f64) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|diameter| diameter.inches() == inches)
            .copied()
    }

    /// Normalize a textual diameter: "650B" is 27.5, otherwise the text must
    /// be a number (an optional trailing `"` is ignored).
    pub fn normalize(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("650b") {
            return Some(WheelDiameter::TwentySevenFive);
        }
        trimmed
            .trim_end_matches('"')
            .parse::<f64>()
            .ok()
            .and_then(Self::from_inches)
    }
}

impl Serialize for WheelDiameter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.inches())
    }
}

// ============================================================================
// PRESSURE UNIT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    Psi,
    Bar,
}

impl PressureUnit {
    pub const ALL: [PressureUnit; 2] = [PressureUnit::Psi, PressureUnit::Bar];

    pub fn as_str(&self) -> &'static str {
        match self {
            PressureUnit::Psi => "psi",
            PressureUnit::Bar => "bar",
        }
    }
}

// ============================================================================
// ISCG TABS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IscgStandard {
    /// Original ISCG (pre-2005) tab layout
    #[serde(rename = "ISCG")]
    Iscg,
    #[serde(rename = "ISCG-05")]
    Iscg05,
}

impl IscgStandard {
    pub const ALL: [IscgStandard; 2] = [IscgStandard::Iscg, IscgStandard::Iscg05];

    pub fn as_str(&self) -> &'static str {
        match self {
            IscgStandard::Iscg => "ISCG",
            IscgStandard::Iscg05 => "ISCG-05",
        }
    }

    pub fn detect(text: &str) -> Option<Self> {
        let compact: String = text
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if compact.contains("ISCG05") {
            Some(IscgStandard::Iscg05)
        } else if compact.contains("ISCG") {
            Some(IscgStandard::Iscg)
        } else {
            None
        }
    }
}

// ============================================================================
// STANDARD - tagged union stored in entity fields
// ============================================================================

/// Which closed enumeration a field draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StandardKind {
    Suspension,
    Headset,
    BottomBracket,
    WheelSize,
    PressureUnit,
    Iscg,
}

impl StandardKind {
    pub fn name(&self) -> &'static str {
        match self {
            StandardKind::Suspension => "suspension type",
            StandardKind::Headset => "headset standard",
            StandardKind::BottomBracket => "bottom bracket standard",
            StandardKind::WheelSize => "wheel size",
            StandardKind::PressureUnit => "pressure unit",
            StandardKind::Iscg => "ISCG standard",
        }
    }

    /// Every legal value, as display strings
    pub fn allowed(&self) -> Vec<&'static str> {
        match self {
            StandardKind::Suspension => SuspensionType::ALL.iter().map(|s| s.as_str()).collect(),
            StandardKind::Headset => HeadsetStandard::ALL.iter().map(|s| s.as_str()).collect(),
            StandardKind::BottomBracket => {
                BottomBracketStandard::ALL.iter().map(|s| s.as_str()).collect()
            }
            StandardKind::WheelSize => WheelSize::ALL.iter().map(|s| s.as_str()).collect(),
            StandardKind::PressureUnit => PressureUnit::ALL.iter().map(|s| s.as_str()).collect(),
            StandardKind::Iscg => IscgStandard::ALL.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// Exact (case-insensitive) lookup of a display string
    pub fn parse(&self, text: &str) -> Option<Standard> {
        let text = text.trim();
        let all: Vec<Standard> = match self {
            StandardKind::Suspension => SuspensionType::ALL.iter().map(|&s| s.into()).collect(),
            StandardKind::Headset => HeadsetStandard::ALL.iter().map(|&s| s.into()).collect(),
            StandardKind::BottomBracket => {
                BottomBracketStandard::ALL.iter().map(|&s| s.into()).collect()
            }
            StandardKind::WheelSize => WheelSize::ALL.iter().map(|&s| s.into()).collect(),
            StandardKind::PressureUnit => PressureUnit::ALL.iter().map(|&s| s.into()).collect(),
            StandardKind::Iscg => IscgStandard::ALL.iter().map(|&s| s.into()).collect(),
        };
        all.into_iter()
            .find(|standard| standard.as_str().eq_ignore_ascii_case(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Standard {
    Suspension(SuspensionType),
    Headset(HeadsetStandard),
    BottomBracket(BottomBracketStandard),
    WheelSize(WheelSize),
    PressureUnit(PressureUnit),
    Iscg(IscgStandard),
}

impl Standard {
    pub fn kind(&self) -> StandardKind {
        match self {
            Standard::Suspension(_) => StandardKind::Suspension,
            Standard::Headset(_) => StandardKind::Headset,
            Standard::BottomBracket(_) => StandardKind::BottomBracket,
            Standard::WheelSize(_) => StandardKind::WheelSize,
            Standard::PressureUnit(_) => StandardKind::PressureUnit,
            Standard::Iscg(_) => StandardKind::Iscg,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Standard::Suspension(s) => s.as_str(),
            Standard::Headset(s) => s.as_str(),
            Standard::BottomBracket(s) => s.as_str(),
            Standard::WheelSize(s) => s.as_str(),
            Standard::PressureUnit(s) => s.as_str(),
            Standard::Iscg(s) => s.as_str(),
        }
    }
}

impl From<SuspensionType> for Standard {
    fn from(value: SuspensionType) -> Self {
        Standard::Suspension(value)
    }
}

impl From<HeadsetStandard> for Standard {
    fn from(value: HeadsetStandard) -> Self {
        Standard::Headset(value)
    }
}

impl From<BottomBracketStandard> for Standard {
    fn from(value: BottomBracketStandard) -> Self {
        Standard::BottomBracket(value)
    }
}

impl From<WheelSize> for Standard {
    fn from(value: WheelSize) -> Self {
        Standard::WheelSize(value)
    }
}

impl From<PressureUnit> for Standard {
    fn from(value: PressureUnit) -> Self {
        Standard::PressureUnit(value)
    }
}

impl From<IscgStandard> for Standard {
    fn from(value: IscgStandard) -> Self {
        Standard::Iscg(value)
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WheelDiameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inches())
    }
}

// ============================================================================
// TESTS
// ============================================================================
