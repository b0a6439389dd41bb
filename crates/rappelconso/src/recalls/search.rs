use crate::prelude::*;
use rappelconso_core::params::{SearchRequest, DEFAULT_CATEGORY_LIMIT, DEFAULT_LATEST_LIMIT};

use super::{output_records, report_error, RecallClient};

/// Options for searching recalls
#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Recalls whose label matches a product name:
  rappelconso recalls search --filter libelle=chocolat

  # Newest recalls of a brand, five at a time:
  rappelconso recalls search --filter marque_produit=Acme --order-by \"date_publication desc\" --limit 5

  # Raw filter expression (fields are checked against the dataset schema):
  rappelconso recalls search --where \"date_publication >= '2024-01-01' AND categorie_produit = 'Alimentation'\"

  # Full-text search:
  rappelconso recalls search -q \"listeria\"

NOTES:
  - Sort orders: date_publication, libelle, marque_produit, categorie_produit (asc or desc)
  - --filter on an unknown field is ignored; --where on an unknown field is rejected
  - Limit must be between 1 and 100")]
pub struct SearchOptions {
    /// Maximum number of recalls to return (1-100)
    #[arg(short, long, default_value = "20")]
    pub limit: i64,

    /// Sort order (e.g., "date_publication desc")
    #[arg(short, long)]
    pub order_by: Option<String>,

    /// Raw filter expression in the Opendatasoft query language
    #[arg(short, long = "where")]
    pub where_clause: Option<String>,

    /// Exact-match filter as FIELD=VALUE (repeatable)
    #[arg(short, long = "filter", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// Full-text query
    #[arg(short)]
    pub q: Option<String>,

    /// Facet refinement as FIELD=VALUE (repeatable)
    #[arg(long, value_parser = parse_key_value)]
    pub refine: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Options for listing the latest recalls
#[derive(Debug, clap::Args, Clone)]
pub struct LatestOptions {
    /// Number of recalls to return (1-100)
    #[arg(short, long, default_value_t = DEFAULT_LATEST_LIMIT)]
    pub limit: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Options for listing the latest recalls of a category
#[derive(Debug, clap::Args, Clone)]
pub struct ByCategoryOptions {
    /// Product category (e.g., "Alimentation")
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Number of recalls to return (1-100)
    #[arg(short, long, default_value_t = DEFAULT_CATEGORY_LIMIT)]
    pub limit: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_key_value(input: &str) -> std::result::Result<(String, String), String> {
    input
        .split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got {input:?}"))
}

impl From<SearchOptions> for SearchRequest {
    fn from(options: SearchOptions) -> Self {
        SearchRequest {
            limit: Some(options.limit),
            order_by: options.order_by,
            where_clause: options.where_clause,
            filters: options.filters.into_iter().collect(),
            q: options.q,
            refine: options.refine.into_iter().collect(),
        }
    }
}

pub async fn run(options: SearchOptions, client: &RecallClient) -> Result<()> {
    let json = options.json;
    let request = SearchRequest::from(options);

    let outcome = client
        .search(&request)
        .await
        .map_err(|e| report_error(e, json))?;

    output_records(&outcome, json)
}

pub async fn run_latest(options: LatestOptions, client: &RecallClient) -> Result<()> {
    let outcome = client
        .latest(Some(options.limit))
        .await
        .map_err(|e| report_error(e, options.json))?;

    output_records(&outcome, options.json)
}

pub async fn run_by_category(options: ByCategoryOptions, client: &RecallClient) -> Result<()> {
    let outcome = client
        .latest_by_category(&options.category, Some(options.limit))
        .await
        .map_err(|e| report_error(e, options.json))?;

    output_records(&outcome, options.json)
}
