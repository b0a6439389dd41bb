//! Upstream query parameters for each tool operation
//!
//! Every function here validates the caller's input and returns the exact
//! parameter list sent to the records endpoint. Nothing is sent when
//! validation fails.

use crate::error::QueryError;
use crate::filter::{self, RawValidation};
use crate::schema::{CATEGORY_FIELD, DATE_FIELD, FIELDS};
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const DEFAULT_LATEST_LIMIT: i64 = 20;
pub const DEFAULT_CATEGORY_LIMIT: i64 = 10;

/// Ordered `(name, value)` pairs for the upstream query string
pub type QueryParams = Vec<(String, String)>;

/// Sort expressions accepted by the search tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    DatePublicationDesc,
    DatePublicationAsc,
    LibelleAsc,
    LibelleDesc,
    MarqueProduitAsc,
    MarqueProduitDesc,
    CategorieProduitAsc,
    CategorieProduitDesc,
}

impl SortOrder {
    pub const ALL: &'static [SortOrder] = &[
        SortOrder::DatePublicationDesc,
        SortOrder::DatePublicationAsc,
        SortOrder::LibelleAsc,
        SortOrder::LibelleDesc,
        SortOrder::MarqueProduitAsc,
        SortOrder::MarqueProduitDesc,
        SortOrder::CategorieProduitAsc,
        SortOrder::CategorieProduitDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::DatePublicationDesc => "date_publication desc",
            SortOrder::DatePublicationAsc => "date_publication asc",
            SortOrder::LibelleAsc => "libelle asc",
            SortOrder::LibelleDesc => "libelle desc",
            SortOrder::MarqueProduitAsc => "marque_produit asc",
            SortOrder::MarqueProduitDesc => "marque_produit desc",
            SortOrder::CategorieProduitAsc => "categorie_produit asc",
            SortOrder::CategorieProduitDesc => "categorie_produit desc",
        }
    }

    /// Parse a sort expression, ignoring case and extra whitespace
    ///
    /// A bare field name sorts ascending, like the upstream API does.
    pub fn parse(input: &str) -> Option<Self> {
        let mut words = input.split_whitespace().map(str::to_ascii_lowercase);
        let field = words.next()?;
        let direction = words.next().unwrap_or_else(|| "asc".to_string());
        if words.next().is_some() {
            return None;
        }

        let normalized = format!("{field} {direction}");
        Self::ALL
            .iter()
            .copied()
            .find(|order| order.as_str() == normalized)
    }

    pub fn allowed_values() -> Vec<&'static str> {
        Self::ALL.iter().map(SortOrder::as_str).collect()
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of the generic search tool
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub limit: Option<i64>,
    pub order_by: Option<String>,
    /// Raw filter expression in the upstream dialect
    pub where_clause: Option<String>,
    /// Exact-match mapping, field to value
    pub filters: BTreeMap<String, String>,
    /// Full-text query
    pub q: Option<String>,
    /// Facet refinements, field to value
    pub refine: BTreeMap<String, String>,
}

/// Parameters ready to send, with what was discarded on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    pub params: QueryParams,
    /// Filter and refine keys dropped because they are not allow-listed
    pub dropped: Vec<String>,
    pub validation: RawValidation,
}

pub fn validate_limit(limit: Option<i64>, default: i64) -> Result<i64, QueryError> {
    let limit = limit.unwrap_or(default);
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(QueryError::invalid_input(format!(
            "limit must be between {MIN_LIMIT} and {MAX_LIMIT}, got {limit}"
        )));
    }
    Ok(limit)
}

pub fn validate_sort(order_by: &str) -> Result<SortOrder, QueryError> {
    SortOrder::parse(order_by).ok_or_else(|| {
        let mut error =
            QueryError::invalid_input(format!("Unsupported sort order: {order_by:?}"));
        error.hint = Some(format!(
            "Allowed values: {}",
            SortOrder::allowed_values().join(", ")
        ));
        error
    })
}

fn param(name: &str, value: impl ToString) -> (String, String) {
    (name.to_string(), value.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn search_params(request: &SearchRequest) -> Result<PreparedQuery, QueryError> {
    let limit = validate_limit(request.limit, DEFAULT_SEARCH_LIMIT)?;
    let order = non_blank(request.order_by.as_deref())
        .map(validate_sort)
        .transpose()?;
    let translated = filter::translate(
        request.where_clause.as_deref(),
        &request.filters,
        FIELDS,
    )?;

    let mut params = vec![param("limit", limit), param("select", "*")];
    if let Some(order) = order {
        params.push(param("order_by", order));
    }
    if let Some(clause) = translated.clause {
        params.push(param("where", clause));
    }
    if let Some(q) = non_blank(request.q.as_deref()) {
        params.push(param("q", q));
    }

    let (refinements, refine_dropped) = filter::partition_known(&request.refine, FIELDS);
    for (field, value) in refinements {
        params.push(param(&format!("refine.{field}"), value));
    }

    let mut dropped = translated.dropped;
    dropped.extend(refine_dropped);

    Ok(PreparedQuery {
        params,
        dropped,
        validation: translated.validation,
    })
}

pub fn latest_params(limit: Option<i64>) -> Result<QueryParams, QueryError> {
    let limit = validate_limit(limit, DEFAULT_LATEST_LIMIT)?;
    Ok(vec![
        param("limit", limit),
        param("select", "*"),
        param("order_by", SortOrder::DatePublicationDesc),
    ])
}

/// Zero-row query that only asks for the category facet
pub fn category_facet_params() -> QueryParams {
    vec![param("limit", 0), param("facet", CATEGORY_FIELD)]
}

pub fn latest_by_category_params(
    category: &str,
    limit: Option<i64>,
) -> Result<QueryParams, QueryError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(QueryError::invalid_input("category must not be empty"));
    }
    let limit = validate_limit(limit, DEFAULT_CATEGORY_LIMIT)?;

    Ok(vec![
        param("limit", limit),
        param("select", "*"),
        param("order_by", format!("{DATE_FIELD} desc")),
        param("where", filter::equals_clause(CATEGORY_FIELD, category)),
    ])
}

/// Value of the first parameter named `name`
pub fn get_param<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(
            SortOrder::parse("date_publication desc"),
            Some(SortOrder::DatePublicationDesc)
        );
        assert_eq!(
            SortOrder::parse("  DATE_PUBLICATION   DESC "),
            Some(SortOrder::DatePublicationDesc)
        );
        assert_eq!(SortOrder::parse("libelle"), Some(SortOrder::LibelleAsc));
        assert_eq!(SortOrder::parse("prix desc"), None);
        assert_eq!(SortOrder::parse("libelle desc nulls"), None);
        assert_eq!(SortOrder::parse(""), None);
    }

    #[test]
    fn test_sort_order_round_trips_through_as_str() {
        for order in SortOrder::ALL {
            assert_eq!(SortOrder::parse(order.as_str()), Some(*order));
        }
    }

    #[test]
    fn test_validate_limit_bounds() {
        assert_eq!(validate_limit(None, 20).unwrap(), 20);
        assert_eq!(validate_limit(Some(1), 20).unwrap(), 1);
        assert_eq!(validate_limit(Some(100), 20).unwrap(), 100);

        for bad in [0, -5, 101] {
            let error = validate_limit(Some(bad), 20).unwrap_err();
            assert_eq!(error.kind, ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_search_params_defaults() {
        let prepared = search_params(&SearchRequest::default()).unwrap();

        assert_eq!(get_param(&prepared.params, "limit"), Some("20"));
        assert_eq!(get_param(&prepared.params, "select"), Some("*"));
        assert!(get_param(&prepared.params, "where").is_none());
        assert!(get_param(&prepared.params, "order_by").is_none());
        assert_eq!(prepared.validation, RawValidation::Absent);
    }

    #[test]
    fn test_search_params_full() {
        let request = SearchRequest {
            limit: Some(5),
            order_by: Some("date_publication DESC".to_string()),
            where_clause: Some("date_publication >= '2024-01-01'".to_string()),
            filters: BTreeMap::from([
                ("libelle".to_string(), "chocolat".to_string()),
                ("bogus".to_string(), "x".to_string()),
            ]),
            q: Some("noisettes".to_string()),
            refine: BTreeMap::from([
                ("marque_produit".to_string(), "Acme".to_string()),
                ("also_bogus".to_string(), "y".to_string()),
            ]),
        };

        let prepared = search_params(&request).unwrap();

        assert_eq!(get_param(&prepared.params, "limit"), Some("5"));
        assert_eq!(
            get_param(&prepared.params, "order_by"),
            Some("date_publication desc")
        );
        assert_eq!(
            get_param(&prepared.params, "where"),
            Some("libelle LIKE 'chocolat' AND (date_publication >= '2024-01-01')")
        );
        assert_eq!(get_param(&prepared.params, "q"), Some("noisettes"));
        assert_eq!(
            get_param(&prepared.params, "refine.marque_produit"),
            Some("Acme")
        );
        assert_eq!(
            prepared.dropped,
            vec!["bogus".to_string(), "also_bogus".to_string()]
        );
        assert_eq!(prepared.validation, RawValidation::Validated);
    }

    #[test]
    fn test_search_params_rejects_bad_sort() {
        let request = SearchRequest {
            order_by: Some("prix desc".to_string()),
            ..Default::default()
        };
        let error = search_params(&request).unwrap_err();

        assert_eq!(error.kind, ErrorKind::InvalidInput);
        assert!(error.hint.unwrap().contains("date_publication desc"));
    }

    #[test]
    fn test_search_params_rejects_unknown_raw_field() {
        let request = SearchRequest {
            where_clause: Some("nom_produit LIKE 'chocolat'".to_string()),
            ..Default::default()
        };
        let error = search_params(&request).unwrap_err();

        assert_eq!(error.invalid_fields, vec!["nom_produit".to_string()]);
    }

    #[test]
    fn test_search_params_rejects_bad_limit_before_filters() {
        let request = SearchRequest {
            limit: Some(500),
            ..Default::default()
        };
        assert!(search_params(&request).is_err());
    }

    #[test]
    fn test_latest_params() {
        let params = latest_params(Some(50)).unwrap();

        assert_eq!(get_param(&params, "limit"), Some("50"));
        assert_eq!(get_param(&params, "order_by"), Some("date_publication desc"));
        assert!(latest_params(Some(0)).is_err());
    }

    #[test]
    fn test_category_facet_params() {
        let params = category_facet_params();

        assert_eq!(get_param(&params, "limit"), Some("0"));
        assert_eq!(get_param(&params, "facet"), Some("categorie_produit"));
    }

    #[test]
    fn test_latest_by_category_params_escapes() {
        let params = latest_by_category_params(" Hygiène d'hiver ", None).unwrap();

        assert_eq!(get_param(&params, "limit"), Some("10"));
        assert_eq!(
            get_param(&params, "where"),
            Some("categorie_produit = 'Hygiène d''hiver'")
        );
        assert_eq!(get_param(&params, "order_by"), Some("date_publication desc"));
    }

    #[test]
    fn test_latest_by_category_params_blank_category() {
        let error = latest_by_category_params("  ", Some(5)).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
    }
}
