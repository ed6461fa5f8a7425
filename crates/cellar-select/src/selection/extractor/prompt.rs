use serde_json::{json, Value};

use super::SELECTION_TOOL_NAME;
use crate::selection::questionnaire::QuestionnaireAnswers;

pub(crate) const SYSTEM_PROMPT: &str = "You are an expert on French wine helping a merchant build \
a client's cellar. You may only recommend wines from the merchant's catalog. Always answer by \
calling the `get_wines` tool with strictly valid JSON arguments.";

pub(crate) fn user_prompt(answers: &QuestionnaireAnswers) -> Result<String, serde_json::Error> {
    let answers_json = serde_json::to_string_pretty(answers)?;
    Ok(format!(
        "A client has completed our cellar questionnaire. Translate the answers into catalog \
filters, color weights and taste preferences so we can pick their ten best wines.\n\n\
Catalog: table `wines` with region, appellation, estate, color (red, white, rose, sparkling), \
price, red taste axes (fruitiness, spice, oakiness, tannin) and white taste axes (fruitiness, \
minerality, butteriness, oakiness, sweetness), each on a 1-5 scale. Rosé and sparkling wines \
use the white axes.\n\n\
Rules:\n\
1. filters.regions: the preferred regions as an array of strings.\n\
2. filters.appellations and filters.estates: split the favourite references on commas and \
sort each item into appellations or estates. Use empty arrays when the answer is empty or \
meaningless.\n\
3. filters.price_min / filters.price_max: convert the budget range (\"50-100\" gives 50 and 100).\n\
4. filters.widen_search: false only when the client declined to explore new regions, true otherwise.\n\
5. color_weights: from the color ranking, first gets 4, second 3, third 2, fourth 1. All four \
keys (red, white, rose, sparkling) are expected.\n\
6. preferences.red / preferences.white: copy the 1-5 taste ratings (1 = dislike, 5 = strong \
liking). preferences.cultivation: the 1-5 importance of organic or biodynamic farming.\n\
7. Omit any filter that was not answered.\n\n\
Client answers:\n{answers_json}"
    ))
}

/// Tool definition forcing the model to emit structured criteria.
pub(crate) fn selection_tool() -> Value {
    let intensity = json!({ "type": "number", "minimum": 1, "maximum": 5 });
    let weight = json!({ "type": "number", "minimum": 1, "maximum": 4 });
    let terms = json!({ "type": "array", "items": { "type": "string" } });

    json!({
        "type": "function",
        "function": {
            "name": SELECTION_TOOL_NAME,
            "description": "Query the wine catalog with the client's preferences.",
            "parameters": {
                "type": "object",
                "properties": {
                    "filters": {
                        "type": "object",
                        "properties": {
                            "regions": terms,
                            "appellations": terms,
                            "estates": terms,
                            "widen_search": { "type": "boolean" },
                            "price_min": { "type": "number" },
                            "price_max": { "type": "number" }
                        }
                    },
                    "color_weights": {
                        "type": "object",
                        "properties": {
                            "red": weight,
                            "white": weight,
                            "rose": weight,
                            "sparkling": weight
                        }
                    },
                    "preferences": {
                        "type": "object",
                        "properties": {
                            "red": {
                                "type": "object",
                                "properties": {
                                    "fruitiness": intensity,
                                    "spice": intensity,
                                    "oakiness": intensity,
                                    "tannin": intensity
                                }
                            },
                            "white": {
                                "type": "object",
                                "properties": {
                                    "fruitiness": intensity,
                                    "minerality": intensity,
                                    "butteriness": intensity,
                                    "oakiness": intensity,
                                    "sweetness": intensity
                                }
                            },
                            "cultivation": intensity
                        }
                    }
                },
                "required": ["filters", "color_weights", "preferences"]
            }
        }
    })
}
