use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use rappelconso_core::error::QueryError;
use rappelconso_core::normalize::{Outcome, Passthrough};
use rappelconso_core::schema::{format_publication_date, ResultEnvelope};
use serde::Serialize;

pub mod categories;
pub mod client;
pub mod search;

pub use client::{RecallClient, RecallConfig, DEFAULT_BASE_URL};

#[derive(Debug, clap::Parser)]
#[command(name = "recalls")]
#[command(about = "Product recall queries (search, latest, categories)")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Search recalls with filters and a sort order
    #[clap(name = "search")]
    Search(search::SearchOptions),

    /// List the most recent recalls
    #[clap(name = "latest")]
    Latest(search::LatestOptions),

    /// List the most recent recalls of one product category
    #[clap(name = "by-category")]
    ByCategory(search::ByCategoryOptions),

    /// Count recalls per product category
    #[clap(name = "categories")]
    Categories(categories::CategoriesOptions),

    /// Show the product category with the most recalls
    #[clap(name = "top-category")]
    TopCategory(categories::CategoriesOptions),
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        eprintln!("RappelConso API: {}", global.base_url);
        eprintln!();
    }

    let client = RecallClient::new(&RecallConfig::from_global(&global))?;

    match app.command {
        Commands::Search(options) => search::run(options, &client).await,
        Commands::Latest(options) => search::run_latest(options, &client).await,
        Commands::ByCategory(options) => search::run_by_category(options, &client).await,
        Commands::Categories(options) => categories::run(options, &client).await,
        Commands::TopCategory(options) => categories::run_top(options, &client).await,
    }
}

/// Print any serializable output as pretty JSON
pub fn output_json<T: Serialize>(output: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(output)
        .map_err(|e| eyre!("JSON serialization failed: {}", e))?;
    println!("{text}");
    Ok(())
}

/// Turn a tool error into a CLI failure, echoing it as JSON when requested
pub fn report_error(error: QueryError, json: bool) -> color_eyre::Report {
    if json {
        if let Ok(text) = serde_json::to_string_pretty(&error) {
            println!("{text}");
        }
    }

    match &error.hint {
        Some(hint) => eyre!("{error}\nHint: {hint}"),
        None => eyre!(error),
    }
}

pub(crate) fn output_passthrough(passthrough: &Passthrough) -> Result<()> {
    eprintln!(
        "{} {}",
        "Could not normalize the RappelConso response:".yellow().bold(),
        passthrough.reason
    );
    eprintln!("{}", "Raw payload follows.".yellow());
    output_json(&passthrough.raw)
}

/// Print a records outcome as JSON or as a table
pub fn output_records(outcome: &Outcome<ResultEnvelope>, json: bool) -> Result<()> {
    if json {
        return output_json(outcome);
    }

    match outcome {
        Outcome::Normalized(envelope) => {
            println!("{}", format_records_table(envelope));
            Ok(())
        }
        Outcome::Passthrough(passthrough) => output_passthrough(passthrough),
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

fn format_records_table(envelope: &ResultEnvelope) -> String {
    let mut result = String::new();

    result.push_str(&format!(
        "\n{} {} {}\n",
        "Showing".bright_white(),
        envelope.results.len().to_string().bright_cyan().bold(),
        format!("of {} recalls", envelope.total_count).bright_white()
    ));

    if envelope.skipped > 0 {
        result.push_str(&format!(
            "{}\n",
            format!("{} upstream records skipped (invalid)", envelope.skipped).yellow()
        ));
    }

    if envelope.results.is_empty() {
        result.push_str(&format!("\n{}\n", "No recalls found.".yellow()));
        return result;
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Date",
        "Produit",
        "Marque",
        "Catégorie",
        "Motif"
    ]);

    for record in &envelope.results {
        table.add_row(prettytable::row![
            format_publication_date(&record.date_publication),
            truncate_text(&record.libelle, 40),
            record.marque_produit.as_deref().unwrap_or("-"),
            record.categorie_produit.as_deref().unwrap_or("-"),
            truncate_text(record.motif_rappel.as_deref().unwrap_or("-"), 50)
        ]);
    }

    result.push('\n');
    result.push_str(&table.to_string());
    result
}
