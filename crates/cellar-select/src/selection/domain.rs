use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Catalog identifier for a wine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WineId(pub String);

impl fmt::Display for WineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a stored questionnaire submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WineColor {
    Red,
    White,
    Rose,
    Sparkling,
}

impl WineColor {
    pub const ALL: [WineColor; 4] = [
        WineColor::Red,
        WineColor::White,
        WineColor::Rose,
        WineColor::Sparkling,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WineColor::Red => "Red",
            WineColor::White => "White",
            WineColor::Rose => "Rosé",
            WineColor::Sparkling => "Sparkling",
        }
    }

    /// Parses catalog and questionnaire labels, including the merchant's French ones.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "red" | "rouge" => Some(Self::Red),
            "white" | "blanc" => Some(Self::White),
            "rose" | "rosé" => Some(Self::Rose),
            "sparkling" | "bulles" | "petillant" | "pétillant" => Some(Self::Sparkling),
            _ => None,
        }
    }
}

impl fmt::Display for WineColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CultivationMethod {
    Traditional,
    Organic,
    Biodynamic,
    /// Catalog label that maps to none of the known methods.
    Unclassified,
}

impl CultivationMethod {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "traditional" | "traditionnelle" | "conventional" => Self::Traditional,
            "organic" | "biologique" | "bio" => Self::Organic,
            "biodynamic" | "biodynamique" => Self::Biodynamic,
            _ => Self::Unclassified,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CultivationMethod::Traditional => "traditional",
            CultivationMethod::Organic => "organic",
            CultivationMethod::Biodynamic => "biodynamic",
            CultivationMethod::Unclassified => "unclassified",
        }
    }
}

/// Tasting axes recorded for red wines (1-5 scale).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedTaste {
    pub fruitiness: Option<u8>,
    pub spice: Option<u8>,
    pub oakiness: Option<u8>,
    pub tannin: Option<u8>,
}

/// Tasting axes recorded for white, rosé and sparkling wines (1-5 scale).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteTaste {
    pub fruitiness: Option<u8>,
    pub minerality: Option<u8>,
    pub butteriness: Option<u8>,
    pub oakiness: Option<u8>,
    pub sweetness: Option<u8>,
}

/// Color-specific taste profile. Rosé and sparkling wines share the white axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TasteProfile {
    Red(RedTaste),
    White(WhiteTaste),
}

impl TasteProfile {
    pub fn axis_for(color: WineColor) -> TasteAxis {
        match color {
            WineColor::Red => TasteAxis::Red,
            WineColor::White | WineColor::Rose | WineColor::Sparkling => TasteAxis::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TasteAxis {
    Red,
    White,
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WineRecord {
    pub id: WineId,
    pub region: String,
    pub appellation: String,
    pub estate: String,
    pub color: WineColor,
    pub price: f64,
    pub taste: TasteProfile,
    pub quality_rating: f64,
    pub cultivation: CultivationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_grape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drinking_window: Option<DrinkingWindow>,
}

impl WineRecord {
    /// One-line listing used in e-mails and CLI output.
    pub fn listing_line(&self) -> String {
        format!(
            "{} - {} ({}) - {}€",
            self.estate, self.appellation, self.color, self.price
        )
    }
}

/// Years after vintage during which the wine is at its peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkingWindow {
    pub from_years: u8,
    pub until_years: u8,
}

/// Catalog filters extracted from the questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub appellations: Vec<String>,
    #[serde(default)]
    pub estates: Vec<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub widen_search: Option<bool>,
}

impl Filters {
    pub fn has_content_terms(&self) -> bool {
        [&self.regions, &self.appellations, &self.estates]
            .iter()
            .any(|terms| terms.iter().any(|term| !term.trim().is_empty()))
    }

    pub fn widening_requested(&self) -> bool {
        self.widen_search == Some(true)
    }
}

/// Rank weight per color (1-4, higher is preferred). Missing colors weigh 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorWeights {
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub red: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub white: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub rose: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub sparkling: Option<u8>,
}

impl ColorWeights {
    pub const MAX_WEIGHT: u8 = 4;

    pub fn weight(&self, color: WineColor) -> u8 {
        match color {
            WineColor::Red => self.red,
            WineColor::White => self.white,
            WineColor::Rose => self.rose,
            WineColor::Sparkling => self.sparkling,
        }
        .unwrap_or(0)
    }

    pub fn set(&mut self, color: WineColor, weight: u8) {
        let slot = match color {
            WineColor::Red => &mut self.red,
            WineColor::White => &mut self.white,
            WineColor::Rose => &mut self.rose,
            WineColor::Sparkling => &mut self.sparkling,
        };
        *slot = Some(weight);
    }

    /// First ranked color weighs 4, the next 3, and so on. Duplicates keep their first rank.
    pub fn from_ranking(ranking: &[WineColor]) -> Self {
        let mut weights = Self::default();
        let mut next = Self::MAX_WEIGHT;
        for color in ranking {
            if next == 0 {
                break;
            }
            if weights.weight(*color) == 0 {
                weights.set(*color, next);
                next -= 1;
            }
        }
        weights
    }

    pub(crate) fn entries(&self) -> BTreeMap<WineColor, Option<u8>> {
        WineColor::ALL
            .into_iter()
            .map(|color| {
                let value = match color {
                    WineColor::Red => self.red,
                    WineColor::White => self.white,
                    WineColor::Rose => self.rose,
                    WineColor::Sparkling => self.sparkling,
                };
                (color, value)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedPreferences {
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub fruitiness: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub spice: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub oakiness: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub tannin: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitePreferences {
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub fruitiness: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub minerality: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub butteriness: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub oakiness: Option<u8>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub sweetness: Option<u8>,
}

/// Taste intensities (1 = dislike, 5 = strong like) plus the cultivation preference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TastePreferences {
    #[serde(default)]
    pub red: Option<RedPreferences>,
    #[serde(default)]
    pub white: Option<WhitePreferences>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub cultivation: Option<u8>,
}

impl TastePreferences {
    pub const MAX_INTENSITY: u8 = 5;

    fn intensities(&self) -> Vec<Option<u8>> {
        let red = self.red.unwrap_or_default();
        let white = self.white.unwrap_or_default();
        vec![
            red.fruitiness,
            red.spice,
            red.oakiness,
            red.tannin,
            white.fruitiness,
            white.minerality,
            white.butteriness,
            white.oakiness,
            white.sweetness,
            self.cultivation,
        ]
    }
}

/// Structured output of the preference extractor, consumed by retrieval and scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub color_weights: ColorWeights,
    #[serde(default)]
    pub preferences: TastePreferences,
}

impl SelectionCriteria {
    /// Checks the value ranges an extractor must respect.
    pub fn validate(&self) -> Result<(), CriteriaViolation> {
        for (color, weight) in self.color_weights.entries() {
            if let Some(weight) = weight {
                if weight > ColorWeights::MAX_WEIGHT {
                    return Err(CriteriaViolation::ColorWeightOutOfRange { color, weight });
                }
            }
        }

        if let Some(value) = self
            .preferences
            .intensities()
            .into_iter()
            .flatten()
            .find(|value| *value > TastePreferences::MAX_INTENSITY)
        {
            return Err(CriteriaViolation::IntensityOutOfRange(value));
        }

        for price in [self.filters.price_min, self.filters.price_max]
            .into_iter()
            .flatten()
        {
            if !price.is_finite() || price < 0.0 {
                return Err(CriteriaViolation::InvalidPrice(price));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CriteriaViolation {
    #[error("color weight {weight} for {color} exceeds {max}", max = ColorWeights::MAX_WEIGHT)]
    ColorWeightOutOfRange { color: WineColor, weight: u8 },
    #[error("preference intensity {0} exceeds {max}", max = TastePreferences::MAX_INTENSITY)]
    IntensityOutOfRange(u8),
    #[error("price bound {0} is not a non-negative amount")]
    InvalidPrice(f64),
}

/// Candidate with its transient ranking score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWine {
    pub wine: WineRecord,
    pub score: f64,
}

/// Accepts integers, integral floats and numeric strings; language models emit all three.
fn lenient_intensity<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(serde_json::Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a numeric intensity, found {other}"
            )))
        }
    };

    match number {
        Some(value) if value.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(&value) => {
            Ok(Some(value as u8))
        }
        Some(value) => Err(serde::de::Error::custom(format!(
            "intensity {value} is not a whole number in range"
        ))),
        None => Err(serde::de::Error::custom("intensity is not numeric")),
    }
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(number)) => Ok(number.as_f64()),
        Some(serde_json::Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("price '{text}' is not numeric"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a numeric price, found {other}"
        ))),
    }
}
