use async_trait::async_trait;

use super::{ExtractionError, PreferenceExtractor};
use crate::selection::domain::{
    ColorWeights, Filters, RedPreferences, SelectionCriteria, TastePreferences, WhitePreferences,
};
use crate::selection::questionnaire::{ExperienceLevel, QuestionnaireAnswers, QuestionnaireV1};

/// Deterministic extractor mapping typed answers straight onto criteria.
///
/// Used when no language model is configured. Favourite references cannot be
/// told apart without a model, so every term is tried as both an appellation
/// and an estate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedExtractor;

impl RuleBasedExtractor {
    pub fn criteria_for(&self, answers: &QuestionnaireAnswers) -> SelectionCriteria {
        match answers {
            QuestionnaireAnswers::V1(answers) => criteria_from_v1(answers),
        }
    }
}

#[async_trait]
impl PreferenceExtractor for RuleBasedExtractor {
    async fn extract(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<SelectionCriteria, ExtractionError> {
        let criteria = self.criteria_for(answers);
        criteria.validate()?;
        Ok(criteria)
    }
}

fn criteria_from_v1(answers: &QuestionnaireV1) -> SelectionCriteria {
    let references = match answers.level {
        ExperienceLevel::Beginner => Vec::new(),
        ExperienceLevel::Connoisseur | ExperienceLevel::Expert => answers
            .favorite_references
            .as_deref()
            .map(split_terms)
            .unwrap_or_default(),
    };
    let (price_min, price_max) = answers
        .budget
        .as_deref()
        .map(parse_budget)
        .unwrap_or((None, None));

    let filters = Filters {
        regions: answers
            .preferred_regions
            .iter()
            .map(|region| region.trim().to_string())
            .filter(|region| !region.is_empty())
            .collect(),
        appellations: references.clone(),
        estates: references,
        price_min,
        price_max,
        widen_search: Some(answers.explore_new_regions != Some(false)),
    };

    let preferences = TastePreferences {
        red: answers.taste.red.map(|red| RedPreferences {
            fruitiness: red.fruitiness,
            spice: red.spice,
            oakiness: red.oakiness,
            tannin: red.tannin,
        }),
        white: answers.taste.white.map(|white| WhitePreferences {
            fruitiness: white.fruitiness,
            minerality: white.minerality,
            butteriness: white.butteriness,
            oakiness: white.oakiness,
            sweetness: white.sweetness,
        }),
        cultivation: answers.cultivation_importance,
    };

    SelectionCriteria {
        filters,
        color_weights: ColorWeights::from_ranking(&answers.color_ranking),
        preferences,
    }
}

fn split_terms(text: &str) -> Vec<String> {
    text.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"50-100"` gives both bounds, `"100+"` or `"30"` only a floor.
pub(crate) fn parse_budget(text: &str) -> (Option<f64>, Option<f64>) {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();

    if let Some((low, high)) = cleaned.split_once(['-', '–']) {
        return (parse_amount(low), parse_amount(high));
    }

    (parse_amount(cleaned.trim_end_matches('+')), None)
}

fn parse_amount(value: &str) -> Option<f64> {
    value
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}
