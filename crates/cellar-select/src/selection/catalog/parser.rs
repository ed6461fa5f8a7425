use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::selection::domain::{
    CultivationMethod, DrinkingWindow, RedTaste, TasteAxis, TasteProfile, WhiteTaste, WineColor,
    WineId, WineRecord,
};

#[derive(Debug)]
pub(crate) enum RowError {
    Csv(csv::Error),
    Invalid { line: u64, reason: String },
}

impl From<csv::Error> for RowError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<WineRecord>, RowError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize::<CatalogRow>() {
        let row = result?;
        // header is line 1
        let line = records.len() as u64 + 2;
        records.push(row.into_record(line)?);
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    region: String,
    appellation: String,
    estate: String,
    color: String,
    price: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    red_fruitiness: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    red_spice: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    red_oakiness: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    red_tannin: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    white_fruitiness: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    white_minerality: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    white_butteriness: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    white_oakiness: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    white_sweetness: Option<u8>,
    quality_rating: f64,
    #[serde(default)]
    cultivation: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    dominant_grape: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    peak_from: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    peak_until: Option<u8>,
}

const TASTE_MIN: u8 = 1;
const TASTE_MAX: u8 = 5;

impl CatalogRow {
    fn taste_columns(&self) -> [(&'static str, Option<u8>); 9] {
        [
            ("red_fruitiness", self.red_fruitiness),
            ("red_spice", self.red_spice),
            ("red_oakiness", self.red_oakiness),
            ("red_tannin", self.red_tannin),
            ("white_fruitiness", self.white_fruitiness),
            ("white_minerality", self.white_minerality),
            ("white_butteriness", self.white_butteriness),
            ("white_oakiness", self.white_oakiness),
            ("white_sweetness", self.white_sweetness),
        ]
    }

    fn into_record(self, line: u64) -> Result<WineRecord, RowError> {
        let color = WineColor::parse(&self.color).ok_or_else(|| RowError::Invalid {
            line,
            reason: format!("unknown color '{}'", self.color),
        })?;

        if self.id.is_empty() {
            return Err(RowError::Invalid {
                line,
                reason: "missing id".to_string(),
            });
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(RowError::Invalid {
                line,
                reason: format!("price {} is not a non-negative amount", self.price),
            });
        }
        if !self.quality_rating.is_finite() {
            return Err(RowError::Invalid {
                line,
                reason: "quality rating is not a number".to_string(),
            });
        }

        if let Some((column, value)) = self.taste_columns().into_iter().find_map(|(column, value)| {
            value
                .filter(|value| !(TASTE_MIN..=TASTE_MAX).contains(value))
                .map(|value| (column, value))
        }) {
            return Err(RowError::Invalid {
                line,
                reason: format!("{column} {value} is outside {TASTE_MIN}-{TASTE_MAX}"),
            });
        }

        let taste = match TasteProfile::axis_for(color) {
            TasteAxis::Red => TasteProfile::Red(RedTaste {
                fruitiness: self.red_fruitiness,
                spice: self.red_spice,
                oakiness: self.red_oakiness,
                tannin: self.red_tannin,
            }),
            TasteAxis::White => TasteProfile::White(WhiteTaste {
                fruitiness: self.white_fruitiness,
                minerality: self.white_minerality,
                butteriness: self.white_butteriness,
                oakiness: self.white_oakiness,
                sweetness: self.white_sweetness,
            }),
        };

        let drinking_window = match (self.peak_from, self.peak_until) {
            (Some(from_years), Some(until_years)) => Some(DrinkingWindow {
                from_years,
                until_years,
            }),
            _ => None,
        };

        Ok(WineRecord {
            id: WineId(self.id),
            region: self.region,
            appellation: self.appellation,
            estate: self.estate,
            color,
            price: self.price,
            taste,
            quality_rating: self.quality_rating,
            cultivation: CultivationMethod::parse(&self.cultivation),
            dominant_grape: self.dominant_grape,
            drinking_window,
        })
    }
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}
