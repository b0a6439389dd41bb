//! Response normalization
//!
//! The records endpoint has answered with several envelope layouts over the
//! years. Each one is a variant of [`EnvelopeShape`], and [`DISPATCH`] lists
//! them in the order they are tried. Payloads that match none of them are
//! never dropped silently: they come back as a [`Passthrough`] carrying the
//! raw body.

use crate::error::ErrorKind;
use crate::schema::{RecallRecord, ResultEnvelope};
use serde::Serialize;
use serde_json::{json, Value};

/// Raw upstream body, parsed as JSON when possible
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Text(String),
}

impl UpstreamBody {
    pub fn parse(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => UpstreamBody::Json(value),
            Err(_) => UpstreamBody::Text(text),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            UpstreamBody::Json(value) => value.clone(),
            UpstreamBody::Text(text) => Value::String(text.clone()),
        }
    }
}

/// Un-normalized upstream payload returned when its shape is not understood
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passthrough {
    /// Always [`ErrorKind::NormalizationFailure`]
    pub kind: ErrorKind,
    pub reason: String,
    pub raw: Value,
}

impl Passthrough {
    pub fn new(reason: impl Into<String>, raw: Value) -> Self {
        Self {
            kind: ErrorKind::NormalizationFailure,
            reason: reason.into(),
            raw,
        }
    }
}

/// Either a normalized value or the raw payload it could not be built from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Normalized(T),
    Passthrough(Passthrough),
}

impl<T> Outcome<T> {
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Outcome::Normalized(value) => f(value),
            Outcome::Passthrough(passthrough) => Outcome::Passthrough(passthrough),
        }
    }

    pub fn normalized(self) -> Option<T> {
        match self {
            Outcome::Normalized(value) => Some(value),
            Outcome::Passthrough(_) => None,
        }
    }
}

impl<T> From<Passthrough> for Outcome<T> {
    fn from(passthrough: Passthrough) -> Self {
        Outcome::Passthrough(passthrough)
    }
}

/// Known layouts of a records response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `{records: [{record: {fields: {...}}}]}`
    RecordsNested,
    /// `{records: [{fields: {...}}]}`
    RecordsFlat,
    /// `{results: [{record: {fields: {...}}}]}`
    ResultsNested,
    /// `{results: [{...}]}`
    ResultsFlat,
}

/// Shapes in the order they are tried
pub const DISPATCH: &[EnvelopeShape] = &[
    EnvelopeShape::RecordsNested,
    EnvelopeShape::RecordsFlat,
    EnvelopeShape::ResultsNested,
    EnvelopeShape::ResultsFlat,
];

/// Top-level keys that may hold the record array, by priority
pub const ARRAY_KEYS: &[&str] = &["records", "results"];

impl EnvelopeShape {
    pub fn array_key(&self) -> &'static str {
        match self {
            EnvelopeShape::RecordsNested | EnvelopeShape::RecordsFlat => "records",
            EnvelopeShape::ResultsNested | EnvelopeShape::ResultsFlat => "results",
        }
    }

    fn path(&self) -> &'static [&'static str] {
        match self {
            EnvelopeShape::RecordsNested | EnvelopeShape::ResultsNested => &["record", "fields"],
            EnvelopeShape::RecordsFlat => &["fields"],
            EnvelopeShape::ResultsFlat => &[],
        }
    }

    /// The field mapping of one array element, if it has this shape
    pub fn extract<'a>(&self, element: &'a Value) -> Option<&'a Value> {
        if *self == EnvelopeShape::ResultsFlat && element.get("record").is_some() {
            return None;
        }

        let fields = self
            .path()
            .iter()
            .try_fold(element, |current, key| current.get(key))?;

        fields.is_object().then_some(fields)
    }
}

/// Locate the record array and the shapes registered for its key
fn locate_records(payload: &Value) -> Option<(&'static str, &Vec<Value>)> {
    ARRAY_KEYS.iter().find_map(|key| {
        payload
            .get(*key)
            .and_then(Value::as_array)
            .map(|items| (*key, items))
    })
}

fn extract_fields<'a>(key: &str, element: &'a Value) -> Option<(EnvelopeShape, &'a Value)> {
    DISPATCH
        .iter()
        .filter(|shape| shape.array_key() == key)
        .find_map(|shape| shape.extract(element).map(|fields| (*shape, fields)))
}

/// Shape of the first array element that matches a known layout
pub fn detect_shape(payload: &Value) -> Option<EnvelopeShape> {
    let (key, items) = locate_records(payload)?;
    items
        .iter()
        .find_map(|element| extract_fields(key, element).map(|(shape, _)| shape))
}

fn upstream_total(payload: &Value) -> Option<u64> {
    payload
        .get("total_count")
        .and_then(Value::as_u64)
        .or_else(|| payload.get("nhits").and_then(Value::as_u64))
}

/// Normalize a records response into a [`ResultEnvelope`]
///
/// Elements that fail validation are skipped and counted. A non-empty array
/// where no element validates is treated as a shape mismatch and returned as
/// a passthrough; an empty array is a genuine zero-result envelope.
pub fn normalize_records(body: &UpstreamBody) -> Outcome<ResultEnvelope> {
    let payload = match body {
        UpstreamBody::Json(value) => value,
        UpstreamBody::Text(text) => {
            return Passthrough::new("upstream body is not JSON", Value::String(text.clone()))
                .into()
        }
    };

    if !payload.is_object() {
        return Passthrough::new("upstream payload is not a JSON object", payload.clone()).into();
    }

    let Some((key, items)) = locate_records(payload) else {
        return Passthrough::new(
            format!("no record array found under {}", ARRAY_KEYS.join(" or ")),
            payload.clone(),
        )
        .into();
    };

    let mut results = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for element in items {
        let record = extract_fields(key, element)
            .and_then(|(_, fields)| RecallRecord::from_fields(fields).ok());

        match record {
            Some(record) => results.push(record),
            None => skipped += 1,
        }
    }

    if results.is_empty() && !items.is_empty() {
        return Passthrough::new(
            format!(
                "none of the {} upstream records matched the recall schema",
                items.len()
            ),
            payload.clone(),
        )
        .into();
    }

    let total_count = upstream_total(payload).unwrap_or(results.len() as u64);

    Outcome::Normalized(ResultEnvelope {
        total_count,
        results,
        skipped,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCategory {
    pub category: String,
    pub count: u64,
}

/// Top-level keys that may hold facet groups, by priority
pub const FACET_KEYS: &[&str] = &["facets", "facet_groups"];

fn facet_group<'a>(payload: &'a Value, field: &str) -> Option<&'a Vec<Value>> {
    FACET_KEYS
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_array))
        .flatten()
        .find(|group| group.get("name").and_then(Value::as_str) == Some(field))
        .and_then(|group| group.get("facets"))
        .and_then(Value::as_array)
}

fn category_count(entry: &Value) -> Option<CategoryCount> {
    let name = entry
        .get("name")
        .or_else(|| entry.get("value"))
        .and_then(Value::as_str)?;
    let count = entry.get("count").and_then(Value::as_u64)?;

    Some(CategoryCount {
        name: name.to_string(),
        count,
    })
}

/// Reshape the facet counts of `field` into `{name, count}` pairs
///
/// Upstream order is preserved.
pub fn normalize_category_counts(body: &UpstreamBody, field: &str) -> Outcome<CategoryCounts> {
    let payload = match body {
        UpstreamBody::Json(value) => value,
        UpstreamBody::Text(text) => {
            return Passthrough::new("upstream body is not JSON", Value::String(text.clone()))
                .into()
        }
    };

    let Some(entries) = facet_group(payload, field) else {
        return Passthrough::new(
            format!("facet {field:?} missing from upstream response"),
            payload.clone(),
        )
        .into();
    };

    Outcome::Normalized(CategoryCounts {
        categories: entries.iter().filter_map(category_count).collect(),
    })
}

/// Category with the highest count; ties go to the first one encountered
pub fn select_top_category(categories: &[CategoryCount]) -> Option<TopCategory> {
    let mut best: Option<&CategoryCount> = None;

    for candidate in categories {
        match best {
            Some(current) if candidate.count <= current.count => {}
            _ => best = Some(candidate),
        }
    }

    best.map(|c| TopCategory {
        category: c.name.clone(),
        count: c.count,
    })
}

/// Derive the top category from a category-count outcome
pub fn top_category(counts: Outcome<CategoryCounts>) -> Outcome<TopCategory> {
    counts.and_then(|counts| match select_top_category(&counts.categories) {
        Some(top) => Outcome::Normalized(top),
        None => Passthrough::new("no categories reported", json!({ "categories": [] })).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CATEGORY_FIELD;

    fn json_body(value: Value) -> UpstreamBody {
        UpstreamBody::Json(value)
    }

    fn facet_body() -> UpstreamBody {
        json_body(json!({
            "facets": [
                {
                    "name": "categorie_produit",
                    "facets": [
                        {"name": "Alimentation", "count": 100},
                        {"name": "Véhicules", "count": 50}
                    ]
                }
            ]
        }))
    }

    fn counts(pairs: &[(&str, u64)]) -> Vec<CategoryCount> {
        pairs
            .iter()
            .map(|(name, count)| CategoryCount {
                name: name.to_string(),
                count: *count,
            })
            .collect()
    }

    #[test]
    fn test_upstream_body_parse() {
        assert!(matches!(
            UpstreamBody::parse("{\"a\": 1}".to_string()),
            UpstreamBody::Json(_)
        ));
        assert_eq!(
            UpstreamBody::parse("<html>".to_string()),
            UpstreamBody::Text("<html>".to_string())
        );
    }

    #[test]
    fn test_records_nested_round_trip() {
        let body = json_body(json!({
            "records": [
                {"record": {"fields": {"libelle": "chocolat", "date_publication": "2024-05-02"}}}
            ]
        }));

        let envelope = normalize_records(&body).normalized().unwrap();

        assert_eq!(envelope.results.len(), 1);
        assert_eq!(envelope.results[0].libelle, "chocolat");
        assert_eq!(envelope.total_count, 1);
        assert_eq!(envelope.skipped, 0);
    }

    #[test]
    fn test_records_flat() {
        let body = json_body(json!({
            "nhits": 42,
            "records": [
                {"recordid": "abc", "fields": {"libelle": "biscuits", "date_publication": "2024-05-02"}}
            ]
        }));

        let envelope = normalize_records(&body).normalized().unwrap();

        assert_eq!(envelope.results[0].libelle, "biscuits");
        assert_eq!(envelope.total_count, 42);
    }

    #[test]
    fn test_results_nested() {
        let body = json_body(json!({
            "total_count": 7,
            "results": [
                {"record": {"fields": {"libelle": "fromage", "date_publication": "2024-05-02"}}}
            ]
        }));

        let envelope = normalize_records(&body).normalized().unwrap();

        assert_eq!(envelope.results[0].libelle, "fromage");
        assert_eq!(envelope.total_count, 7);
        assert_eq!(detect_shape(&body.to_value()), Some(EnvelopeShape::ResultsNested));
    }

    #[test]
    fn test_results_flat() {
        let body = json_body(json!({
            "total_count": 3,
            "results": [
                {"libelle": "jambon", "date_publication": "2024-05-02", "categorie_produit": "Alimentation"}
            ]
        }));

        let envelope = normalize_records(&body).normalized().unwrap();

        assert_eq!(envelope.results[0].libelle, "jambon");
        assert_eq!(
            envelope.results[0].categorie_produit.as_deref(),
            Some("Alimentation")
        );
        assert_eq!(envelope.total_count, 3);
        assert_eq!(detect_shape(&body.to_value()), Some(EnvelopeShape::ResultsFlat));
    }

    #[test]
    fn test_records_key_has_priority_over_results() {
        let body = json_body(json!({
            "records": [{"fields": {"libelle": "from records", "date_publication": "2024"}}],
            "results": [{"libelle": "from results", "date_publication": "2024"}]
        }));

        let envelope = normalize_records(&body).normalized().unwrap();

        assert_eq!(envelope.results.len(), 1);
        assert_eq!(envelope.results[0].libelle, "from records");
    }

    #[test]
    fn test_partial_failure_keeps_valid_records() {
        let body = json_body(json!({
            "records": [
                {"record": {"fields": {"libelle": "chocolat", "date_publication": "2024-05-02"}}},
                {"record": {"fields": {"date_publication": "2024-05-03"}}}
            ]
        }));

        let envelope = normalize_records(&body).normalized().unwrap();

        assert_eq!(envelope.results.len(), 1);
        assert_eq!(envelope.skipped, 1);
        assert_eq!(envelope.total_count, 1);
    }

    #[test]
    fn test_empty_array_is_genuine_zero() {
        let body = json_body(json!({"total_count": 0, "records": []}));

        let envelope = normalize_records(&body).normalized().unwrap();

        assert_eq!(envelope.total_count, 0);
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn test_no_valid_records_falls_back_to_passthrough() {
        let payload = json!({
            "results": [{"unexpected": true}, {"record": {"id": "x"}}]
        });
        let outcome = normalize_records(&json_body(payload.clone()));

        match outcome {
            Outcome::Passthrough(passthrough) => {
                assert_eq!(passthrough.kind, ErrorKind::NormalizationFailure);
                assert_eq!(passthrough.raw, payload);
                assert!(passthrough.reason.contains("2 upstream records"));
            }
            Outcome::Normalized(_) => panic!("expected passthrough"),
        }
    }

    #[test]
    fn test_missing_array_is_passthrough() {
        let outcome = normalize_records(&json_body(json!({"error": "boom"})));
        assert!(outcome.normalized().is_none());
    }

    #[test]
    fn test_text_body_is_passthrough() {
        let outcome = normalize_records(&UpstreamBody::Text("<html>oops</html>".to_string()));

        match outcome {
            Outcome::Passthrough(passthrough) => {
                assert_eq!(passthrough.raw, json!("<html>oops</html>"));
            }
            Outcome::Normalized(_) => panic!("expected passthrough"),
        }
    }

    #[test]
    fn test_non_object_payload_is_passthrough() {
        let outcome = normalize_records(&json_body(json!([1, 2, 3])));
        assert!(outcome.normalized().is_none());
    }

    #[test]
    fn test_passthrough_serialization() {
        let outcome: Outcome<ResultEnvelope> =
            Passthrough::new("bad shape", json!({"x": 1})).into();
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["kind"], "normalization_failure");
        assert_eq!(value["reason"], "bad shape");
        assert_eq!(value["raw"], json!({"x": 1}));
    }

    #[test]
    fn test_normalize_category_counts() {
        let counts = normalize_category_counts(&facet_body(), CATEGORY_FIELD)
            .normalized()
            .unwrap();

        assert_eq!(
            counts.categories,
            vec![
                CategoryCount {
                    name: "Alimentation".to_string(),
                    count: 100
                },
                CategoryCount {
                    name: "Véhicules".to_string(),
                    count: 50
                },
            ]
        );
    }

    #[test]
    fn test_normalize_category_counts_facet_groups() {
        let body = json_body(json!({
            "nhits": 10,
            "facet_groups": [
                {"name": "nature_juridique_rappel", "facets": [{"name": "Volontaire", "count": 9}]},
                {"name": "categorie_produit", "facets": [{"name": "Bébés-Enfants", "count": 4, "path": "Bébés-Enfants"}]}
            ]
        }));

        let counts = normalize_category_counts(&body, CATEGORY_FIELD)
            .normalized()
            .unwrap();

        assert_eq!(counts.categories.len(), 1);
        assert_eq!(counts.categories[0].name, "Bébés-Enfants");
        assert_eq!(counts.categories[0].count, 4);
    }

    #[test]
    fn test_normalize_category_counts_miss() {
        let body = json_body(json!({"facets": [{"name": "marque_produit", "facets": []}]}));
        let outcome = normalize_category_counts(&body, CATEGORY_FIELD);

        match outcome {
            Outcome::Passthrough(passthrough) => {
                assert!(passthrough.reason.contains("categorie_produit"));
            }
            Outcome::Normalized(_) => panic!("expected passthrough"),
        }
    }

    #[test]
    fn test_select_top_category() {
        let top = select_top_category(&counts(&[("Alimentation", 100), ("Véhicules", 50)]));

        assert_eq!(
            top,
            Some(TopCategory {
                category: "Alimentation".to_string(),
                count: 100
            })
        );
    }

    #[test]
    fn test_select_top_category_tie_keeps_first() {
        let top = select_top_category(&counts(&[
            ("Hygiène-Beauté", 10),
            ("Alimentation", 30),
            ("Véhicules", 30),
        ]))
        .unwrap();

        assert_eq!(top.category, "Alimentation");
        assert_eq!(top.count, 30);
    }

    #[test]
    fn test_select_top_category_empty() {
        assert_eq!(select_top_category(&[]), None);
    }

    #[test]
    fn test_top_category_from_counts() {
        let top = top_category(normalize_category_counts(&facet_body(), CATEGORY_FIELD))
            .normalized()
            .unwrap();

        assert_eq!(top.category, "Alimentation");
        assert_eq!(top.count, 100);
    }

    #[test]
    fn test_top_category_propagates_passthrough() {
        let miss = normalize_category_counts(&json_body(json!({})), CATEGORY_FIELD);
        let expected = miss.clone();

        let top = top_category(miss);

        match (top, expected) {
            (Outcome::Passthrough(actual), Outcome::Passthrough(expected)) => {
                assert_eq!(actual, expected)
            }
            _ => panic!("expected passthrough"),
        }
    }

    #[test]
    fn test_top_category_no_categories() {
        let empty = Outcome::Normalized(CategoryCounts { categories: vec![] });
        match top_category(empty) {
            Outcome::Passthrough(passthrough) => {
                assert_eq!(passthrough.reason, "no categories reported")
            }
            Outcome::Normalized(_) => panic!("expected passthrough"),
        }
    }
}
