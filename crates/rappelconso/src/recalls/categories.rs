use crate::prelude::{println, *};
use colored::Colorize;
use rappelconso_core::normalize::{CategoryCounts, Outcome, TopCategory};

use super::{output_json, output_passthrough, report_error, RecallClient};

/// Options for category statistics
#[derive(Debug, clap::Args, Clone)]
pub struct CategoriesOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: CategoriesOptions, client: &RecallClient) -> Result<()> {
    let outcome = client
        .category_counts()
        .await
        .map_err(|e| report_error(e, options.json))?;

    if options.json {
        return output_json(&outcome);
    }

    match &outcome {
        Outcome::Normalized(counts) => {
            println!("{}", format_counts_table(counts));
            Ok(())
        }
        Outcome::Passthrough(passthrough) => output_passthrough(passthrough),
    }
}

pub async fn run_top(options: CategoriesOptions, client: &RecallClient) -> Result<()> {
    let outcome = client
        .top_category()
        .await
        .map_err(|e| report_error(e, options.json))?;

    if options.json {
        return output_json(&outcome);
    }

    match &outcome {
        Outcome::Normalized(top) => {
            println!("{}", format_top_category(top));
            Ok(())
        }
        Outcome::Passthrough(passthrough) => output_passthrough(passthrough),
    }
}

fn format_counts_table(counts: &CategoryCounts) -> String {
    if counts.categories.is_empty() {
        return format!("\n{}\n", "No categories reported.".yellow());
    }

    let total: u64 = counts.categories.iter().map(|c| c.count).sum();

    let mut table = new_table();
    table.add_row(prettytable::row!["Catégorie", "Rappels"]);
    for category in &counts.categories {
        table.add_row(prettytable::row![category.name, category.count]);
    }

    format!(
        "\n{} {}\n\n{}",
        format!("{} categories,", counts.categories.len()).bright_white(),
        format!("{total} recalls").bright_cyan().bold(),
        table
    )
}

fn format_top_category(top: &TopCategory) -> String {
    format!(
        "{} {} ({} recalls)",
        "Most recalled category:".bright_white(),
        top.category.bright_cyan().bold(),
        top.count
    )
}
