use crate::infra::{build_pipeline, load_catalog};
use cellar_select::config::AppConfig;
use cellar_select::error::AppError;
use cellar_select::selection::{
    InMemoryCatalog, QuestionnaireAnswers, ScoredWine, SelectionCriteria, WineColor,
};
use cellar_select::telemetry;
use clap::Args;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct SelectArgs {
    /// Questionnaire answers as JSON (`{"version": "v1", ...}`)
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Catalog CSV to select from (defaults to CATALOG_PATH or the bundled sample)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Pre-extracted selection criteria as JSON; skips preference extraction
    #[arg(long)]
    pub(crate) criteria: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Catalog CSV to summarize (defaults to CATALOG_PATH or the bundled sample)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run_select(args: SelectArgs) -> Result<(), AppError> {
    let SelectArgs {
        answers,
        catalog,
        criteria,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init_for_cli(&config.telemetry)?;

    let catalog_path = catalog.or_else(|| config.catalog.path.clone());
    let catalog = load_catalog(catalog_path.as_deref())?;
    let pipeline = build_pipeline(&config, catalog);

    let answers: QuestionnaireAnswers = read_json(&answers)?;
    let selection = match criteria {
        Some(path) => {
            let criteria: SelectionCriteria = read_json(&path)?;
            pipeline.select_with_criteria(&criteria).await?
        }
        None => pipeline.select_scored(&answers).await?,
    };

    render_selection(&answers, &selection);
    Ok(())
}

pub(crate) fn run_catalog_summary(args: CatalogArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_for_cli(&config.telemetry)?;

    let catalog_path = args.catalog.or_else(|| config.catalog.path.clone());
    let catalog = load_catalog(catalog_path.as_deref())?;
    render_catalog_summary(&catalog);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&raw).map_err(std::io::Error::from)?;
    Ok(value)
}

fn render_selection(answers: &QuestionnaireAnswers, selection: &[ScoredWine]) {
    println!("Wine selection");
    for (label, value) in answers.summary_lines() {
        println!("  {label}: {value}");
    }

    if selection.is_empty() {
        println!("\nNo wine in the catalog matches these answers.");
        return;
    }

    println!("\nTop {} wines", selection.len());
    for (index, scored) in selection.iter().enumerate() {
        println!(
            "{:>2}. {} (score {:.1})",
            index + 1,
            scored.wine.listing_line(),
            scored.score
        );
    }
}

#[derive(Debug, Default, PartialEq)]
struct ColorStats {
    count: usize,
    min_price: f64,
    max_price: f64,
    total_price: f64,
}

impl ColorStats {
    fn record(&mut self, price: f64) {
        if self.count == 0 {
            self.min_price = price;
            self.max_price = price;
        } else {
            self.min_price = self.min_price.min(price);
            self.max_price = self.max_price.max(price);
        }
        self.count += 1;
        self.total_price += price;
    }

    fn average_price(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_price / self.count as f64
        }
    }
}

fn color_stats(catalog: &InMemoryCatalog) -> BTreeMap<WineColor, ColorStats> {
    let mut stats: BTreeMap<WineColor, ColorStats> = BTreeMap::new();
    for wine in catalog.wines() {
        stats.entry(wine.color).or_default().record(wine.price);
    }
    stats
}

fn render_catalog_summary(catalog: &InMemoryCatalog) {
    println!("Catalog summary ({} wines)", catalog.len());
    for (color, stats) in color_stats(catalog) {
        println!(
            "  {:<10} {:>3} wines | {:>7.2}€ - {:>7.2}€ (avg {:.2}€)",
            color.label(),
            stats.count,
            stats.min_price,
            stats.max_price,
            stats.average_price()
        );
    }
}
