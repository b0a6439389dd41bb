//! Prompt templates

use crate::error::QueryError;

/// Name under which the product lookup prompt is published
pub const PRODUCT_RECALL_PROMPT: &str = "chercher_rappel_produit";

/// Argument holding the product label
pub const PRODUCT_ARGUMENT: &str = "nom_produit";

/// Question asking whether a product labelled `nom_produit` has been recalled
pub fn product_recall_question(nom_produit: &str) -> Result<String, QueryError> {
    let nom_produit = nom_produit.trim();
    if nom_produit.is_empty() {
        return Err(QueryError::invalid_input(format!(
            "{PRODUCT_ARGUMENT} must not be empty"
        )));
    }

    Ok(format!(
        "Y a-t-il eu des rappels pour le produit libellé '{nom_produit}'?"
    ))
}
