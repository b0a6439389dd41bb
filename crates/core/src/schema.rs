//! Normalized recall record and result envelope
//!
//! [`RecallRecord`] mirrors the fields of the `rappelconso-v2-gtin-trie`
//! dataset. [`FIELDS`] is the filter allow-list and must list exactly the
//! serialized attribute names of [`RecallRecord`], in declaration order.

use chrono::{DateTime, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Dataset field holding the product category
pub const CATEGORY_FIELD: &str = "categorie_produit";

/// Dataset field holding the publication date of the recall notice
pub const DATE_FIELD: &str = "date_publication";

/// Field names accepted in filter expressions
pub const FIELDS: &[&str] = &[
    "id",
    "numero_fiche",
    "numero_version",
    "rappel_guid",
    "libelle",
    "date_publication",
    "nature_juridique_rappel",
    "categorie_produit",
    "sous_categorie_produit",
    "marque_produit",
    "modeles_ou_references",
    "identification_produits",
    "gtin",
    "conditionnements",
    "temperature_conservation",
    "date_debut_commercialisation",
    "date_date_fin_commercialisation",
    "zone_geographique_de_vente",
    "distributeurs",
    "motif_rappel",
    "risques_encourus",
    "preconisations_sanitaires",
    "description_complementaire_risque",
    "conduites_a_tenir_par_le_consommateur",
    "numero_contact",
    "modalites_de_compensation",
    "date_de_fin_de_la_procedure_de_rappel",
    "informations_complementaires",
    "liens_vers_les_images",
    "lien_vers_la_liste_des_produits",
    "lien_vers_la_liste_des_distributeurs",
    "lien_vers_affichette_pdf",
    "lien_vers_la_fiche_rappel",
];

/// Whether `field` may appear in a filter
pub fn is_allowed(field: &str) -> bool {
    FIELDS.contains(&field)
}

/// One normalized product recall
///
/// `libelle` and `date_publication` are required; a raw record missing
/// either one is rejected by [`RecallRecord::from_fields`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallRecord {
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub numero_fiche: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub numero_version: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub rappel_guid: Option<String>,
    #[serde(deserialize_with = "required_text")]
    pub libelle: String,
    #[serde(deserialize_with = "required_text")]
    pub date_publication: String,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub nature_juridique_rappel: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub categorie_produit: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub sous_categorie_produit: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub marque_produit: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub modeles_ou_references: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub identification_produits: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub conditionnements: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub temperature_conservation: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub date_debut_commercialisation: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub date_date_fin_commercialisation: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub zone_geographique_de_vente: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub distributeurs: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub motif_rappel: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub risques_encourus: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub preconisations_sanitaires: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub description_complementaire_risque: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub conduites_a_tenir_par_le_consommateur: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub numero_contact: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub modalites_de_compensation: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub date_de_fin_de_la_procedure_de_rappel: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub informations_complementaires: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub liens_vers_les_images: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub lien_vers_la_liste_des_produits: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub lien_vers_la_liste_des_distributeurs: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub lien_vers_affichette_pdf: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub lien_vers_la_fiche_rappel: Option<String>,
}

impl RecallRecord {
    /// Validate a raw field mapping and build a record from it
    ///
    /// Unknown keys are ignored. Scalars are rendered as text, arrays of
    /// scalars are joined with `" | "`.
    pub fn from_fields(fields: &Value) -> Result<Self, serde_json::Error> {
        RecallRecord::deserialize(fields)
    }
}

/// Normalized response of the record-returning operations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    /// Upstream-reported total when available, otherwise `results.len()`
    pub total_count: u64,
    pub results: Vec<RecallRecord>,
    /// Upstream elements rejected by per-record validation
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(value_to_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" | "))
            }
        }
        object @ Value::Object(_) => Some(object.to_string()),
    }
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_text))
}

fn required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_text(value).ok_or_else(|| de::Error::custom("expected a non-empty value"))
}

/// Format a publication date for display
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates. Anything else
/// is returned unchanged.
pub fn format_publication_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        let mut map = serde_json::Map::new();
        for field in FIELDS {
            map.insert(field.to_string(), json!(format!("value of {field}")));
        }
        Value::Object(map)
    }

    #[test]
    fn test_fields_match_record_attributes() {
        let record = RecallRecord::from_fields(&full_record()).unwrap();
        let serialized = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = serialized
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();

        let mut expected: Vec<&str> = FIELDS.to_vec();
        expected.sort_unstable();
        let mut actual = keys.clone();
        actual.sort_unstable();

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_from_fields_minimal() {
        let record = RecallRecord::from_fields(&json!({
            "libelle": "chocolat",
            "date_publication": "2024-05-02"
        }))
        .unwrap();

        assert_eq!(record.libelle, "chocolat");
        assert_eq!(record.date_publication, "2024-05-02");
        assert!(record.marque_produit.is_none());
    }

    #[test]
    fn test_from_fields_missing_required() {
        let result = RecallRecord::from_fields(&json!({
            "date_publication": "2024-05-02",
            "marque_produit": "Acme"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_fields_blank_required() {
        let result = RecallRecord::from_fields(&json!({
            "libelle": "   ",
            "date_publication": "2024-05-02"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_fields_lenient_scalars() {
        let record = RecallRecord::from_fields(&json!({
            "id": 12345,
            "libelle": "Pâte à tartiner",
            "date_publication": "2024-05-02",
            "gtin": 3017620422003u64,
            "distributeurs": ["Carrefour", "Leclerc"],
            "numero_contact": null,
            "champ_inconnu": "ignored"
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("12345"));
        assert_eq!(record.gtin.as_deref(), Some("3017620422003"));
        assert_eq!(record.distributeurs.as_deref(), Some("Carrefour | Leclerc"));
        assert!(record.numero_contact.is_none());
    }

    #[test]
    fn test_is_allowed() {
        assert!(is_allowed("libelle"));
        assert!(is_allowed(CATEGORY_FIELD));
        assert!(is_allowed(DATE_FIELD));
        assert!(!is_allowed("prix"));
        assert!(!is_allowed("LIBELLE"));
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let record = RecallRecord::from_fields(&json!({
            "libelle": "chocolat",
            "date_publication": "2024-05-02"
        }))
        .unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_envelope_skipped_omitted_when_zero() {
        let envelope = ResultEnvelope {
            total_count: 0,
            results: vec![],
            skipped: 0,
        };
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value, json!({ "total_count": 0, "results": [] }));
    }

    #[test]
    fn test_format_publication_date_rfc3339() {
        assert_eq!(
            format_publication_date("2024-05-02T14:30:00+02:00"),
            "2024-05-02"
        );
    }

    #[test]
    fn test_format_publication_date_plain() {
        assert_eq!(format_publication_date("2024-05-02"), "2024-05-02");
    }

    #[test]
    fn test_format_publication_date_unknown() {
        assert_eq!(format_publication_date("mai 2024"), "mai 2024");
    }
}
