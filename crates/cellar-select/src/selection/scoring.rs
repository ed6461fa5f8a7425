use serde::Serialize;

use super::domain::{
    ColorWeights, CultivationMethod, RedPreferences, RedTaste, ScoredWine, TastePreferences,
    TasteProfile, WhitePreferences, WhiteTaste, WineColor, WineRecord,
};

pub const COLOR_WEIGHT_MULTIPLIER: f64 = 10.0;
pub const QUALITY_MULTIPLIER: f64 = 5.0;
pub const CULTIVATION_FULL_BONUS: f64 = 20.0;
pub const CULTIVATION_PARTIAL_BONUS: f64 = 10.0;

/// The four independent terms that add up to a wine's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub color: f64,
    pub taste: f64,
    pub baseline: f64,
    pub cultivation: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.color + self.taste + self.baseline + self.cultivation
    }
}

/// Cultivation preference band derived from the 1-5 intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CultivationBand {
    /// 4 and above: favors low-intervention farming.
    LowIntervention,
    /// 2 to 3.
    Moderate,
    /// Below 2, including an unanswered preference.
    Traditional,
}

impl CultivationBand {
    pub fn from_intensity(intensity: Option<u8>) -> Self {
        match intensity.unwrap_or(0) {
            4.. => Self::LowIntervention,
            2..=3 => Self::Moderate,
            _ => Self::Traditional,
        }
    }

    pub fn bonus(&self, method: CultivationMethod) -> f64 {
        use CultivationMethod::*;

        match (self, method) {
            (_, Unclassified) => 0.0,
            (Self::LowIntervention, Biodynamic) => CULTIVATION_FULL_BONUS,
            (Self::LowIntervention, Organic) => CULTIVATION_PARTIAL_BONUS,
            (Self::LowIntervention, Traditional) => 0.0,
            (Self::Moderate, Organic) => CULTIVATION_FULL_BONUS,
            (Self::Moderate, Biodynamic | Traditional) => CULTIVATION_PARTIAL_BONUS,
            (Self::Traditional, Traditional) => CULTIVATION_FULL_BONUS,
            (Self::Traditional, Organic) => CULTIVATION_PARTIAL_BONUS,
            (Self::Traditional, Biodynamic) => 0.0,
        }
    }
}

/// Total score of `wine` under the extracted weights and preferences.
pub fn score(wine: &WineRecord, weights: &ColorWeights, preferences: &TastePreferences) -> f64 {
    score_components(wine, weights, preferences).total()
}

pub fn score_components(
    wine: &WineRecord,
    weights: &ColorWeights,
    preferences: &TastePreferences,
) -> ScoreBreakdown {
    ScoreBreakdown {
        color: color_term(wine.color, weights),
        taste: taste_term(wine, preferences),
        baseline: wine.quality_rating * QUALITY_MULTIPLIER,
        cultivation: CultivationBand::from_intensity(preferences.cultivation)
            .bonus(wine.cultivation),
    }
}

/// Scores every candidate, preserving retrieval order.
pub fn score_all(
    candidates: Vec<WineRecord>,
    weights: &ColorWeights,
    preferences: &TastePreferences,
) -> Vec<ScoredWine> {
    candidates
        .into_iter()
        .map(|wine| {
            let score = score(&wine, weights, preferences);
            tracing::debug!(wine_id = %wine.id, score, "scored wine");
            ScoredWine { wine, score }
        })
        .collect()
}

fn color_term(color: WineColor, weights: &ColorWeights) -> f64 {
    f64::from(weights.weight(color)) * COLOR_WEIGHT_MULTIPLIER
}

fn taste_term(wine: &WineRecord, preferences: &TastePreferences) -> f64 {
    match (wine.color, &wine.taste) {
        (WineColor::Red, TasteProfile::Red(taste)) => {
            red_alignment(taste, &preferences.red.unwrap_or_default())
        }
        (
            WineColor::White | WineColor::Rose | WineColor::Sparkling,
            TasteProfile::White(taste),
        ) => white_alignment(taste, &preferences.white.unwrap_or_default()),
        // Profile recorded on the wrong axis for its color.
        _ => 0.0,
    }
}

fn red_alignment(taste: &RedTaste, preferences: &RedPreferences) -> f64 {
    weighted_sum(&[
        (taste.fruitiness, preferences.fruitiness),
        (taste.spice, preferences.spice),
        (taste.oakiness, preferences.oakiness),
        (taste.tannin, preferences.tannin),
    ])
}

fn white_alignment(taste: &WhiteTaste, preferences: &WhitePreferences) -> f64 {
    weighted_sum(&[
        (taste.fruitiness, preferences.fruitiness),
        (taste.minerality, preferences.minerality),
        (taste.butteriness, preferences.butteriness),
        (taste.oakiness, preferences.oakiness),
        (taste.sweetness, preferences.sweetness),
    ])
}

fn weighted_sum(pairs: &[(Option<u8>, Option<u8>)]) -> f64 {
    pairs
        .iter()
        .map(|(value, intensity)| {
            f64::from(value.unwrap_or(0)) * f64::from(intensity.unwrap_or(0))
        })
        .sum()
}
