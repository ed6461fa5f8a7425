//! Typed questionnaire answers as posted by the intake form.
//!
//! Answers are versioned so that extractors can match on the exact shape they
//! understand instead of probing an open key/value map.

use serde::{Deserialize, Serialize};

use super::domain::WineColor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum QuestionnaireAnswers {
    #[serde(rename = "v1")]
    V1(QuestionnaireV1),
}

impl QuestionnaireAnswers {
    pub fn v1(&self) -> &QuestionnaireV1 {
        match self {
            QuestionnaireAnswers::V1(answers) => answers,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.v1()
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Readable label/value pairs in question order, skipping unanswered questions.
    pub fn summary_lines(&self) -> Vec<(&'static str, String)> {
        let answers = self.v1();
        let mut lines = vec![("1. Experience level", answers.level.label().to_string())];

        if let Some(email) = self.email() {
            lines.push(("2. Email", email.to_string()));
        }
        if !answers.consumption_moments.is_empty() {
            lines.push(("3. Moments", answers.consumption_moments.join(", ")));
        }
        if !answers.color_ranking.is_empty() {
            let ranking = answers
                .color_ranking
                .iter()
                .map(WineColor::label)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(("4. Color ranking", ranking));
        }
        if let Some(red) = answers.taste.red.as_ref().and_then(RedRatings::describe) {
            lines.push(("5. Red taste", red));
        }
        if let Some(white) = answers.taste.white.as_ref().and_then(WhiteRatings::describe) {
            lines.push(("5. White taste", white));
        }
        if let Some(importance) = answers.cultivation_importance {
            lines.push(("6. Organic/biodynamic importance", importance.to_string()));
        }
        if !answers.preferred_regions.is_empty() {
            lines.push(("7. Preferred regions", answers.preferred_regions.join(", ")));
        }
        if let Some(references) = non_blank(&answers.favorite_references) {
            lines.push(("8. Favourite appellations/estates", references.to_string()));
        }
        if let Some(explore) = answers.explore_new_regions {
            let label = if explore { "yes" } else { "no" };
            lines.push(("9. Explore new regions", label.to_string()));
        }
        if let Some(budget) = non_blank(&answers.budget) {
            lines.push(("10. Budget per bottle", budget.to_string()));
        }
        if let Some(comments) = non_blank(&answers.comments) {
            lines.push(("11. Comments", comments.to_string()));
        }

        lines
    }
}

/// First published version of the intake questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireV1 {
    pub level: ExperienceLevel,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub consumption_moments: Vec<String>,
    #[serde(default)]
    pub color_ranking: Vec<WineColor>,
    #[serde(default)]
    pub taste: TasteRatings,
    #[serde(default)]
    pub cultivation_importance: Option<u8>,
    #[serde(default)]
    pub preferred_regions: Vec<String>,
    /// Free text naming appellations and estates; asked to connoisseurs and experts only.
    #[serde(default)]
    pub favorite_references: Option<String>,
    /// Budget range per bottle, e.g. `"50-100"`.
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub explore_new_regions: Option<bool>,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Connoisseur,
    Expert,
}

impl ExperienceLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Connoisseur => "connoisseur",
            ExperienceLevel::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasteRatings {
    #[serde(default)]
    pub red: Option<RedRatings>,
    #[serde(default)]
    pub white: Option<WhiteRatings>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedRatings {
    pub fruitiness: Option<u8>,
    pub spice: Option<u8>,
    pub oakiness: Option<u8>,
    pub tannin: Option<u8>,
}

impl RedRatings {
    fn describe(&self) -> Option<String> {
        describe_ratings(&[
            ("fruitiness", self.fruitiness),
            ("spice", self.spice),
            ("oakiness", self.oakiness),
            ("tannin", self.tannin),
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteRatings {
    pub fruitiness: Option<u8>,
    pub minerality: Option<u8>,
    pub butteriness: Option<u8>,
    pub oakiness: Option<u8>,
    pub sweetness: Option<u8>,
}

impl WhiteRatings {
    fn describe(&self) -> Option<String> {
        describe_ratings(&[
            ("fruitiness", self.fruitiness),
            ("minerality", self.minerality),
            ("butteriness", self.butteriness),
            ("oakiness", self.oakiness),
            ("sweetness", self.sweetness),
        ])
    }
}

fn describe_ratings(ratings: &[(&str, Option<u8>)]) -> Option<String> {
    let parts = ratings
        .iter()
        .filter_map(|(label, value)| value.map(|value| format!("{label} {value}")))
        .collect::<Vec<_>>();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
