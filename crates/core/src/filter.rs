//! Filter translation
//!
//! Turns the two filter inputs accepted by the search tool into a single
//! `where` fragment in the Opendatasoft query dialect:
//!
//! - an exact-match mapping (`field -> value`), where unknown fields are
//!   dropped and reported;
//! - a raw expression, where unknown fields reject the whole request.

use crate::error::QueryError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Operators recognized in raw filter expressions
pub const OPERATORS: &[&str] = &["LIKE", "=", "!=", "<>", "<", ">", "<=", ">=", "IN", "IS"];

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "null", "like", "in", "is", "true", "false",
];

/// How much of the raw expression could be checked against the allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValidation {
    /// No raw expression was supplied
    Absent,
    /// Every field found before an operator is allow-listed
    Validated,
    /// No field could be extracted; the expression is forwarded untrusted
    Unvalidated,
}

/// Result of a successful translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedFilter {
    /// `where` fragment, `None` when the request is unfiltered
    pub clause: Option<String>,
    /// Mapping keys dropped because they are not allow-listed
    pub dropped: Vec<String>,
    pub validation: RawValidation,
}

/// Double single quotes so `value` can sit inside a `'...'` literal
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

pub fn like_clause(field: &str, value: &str) -> String {
    format!("{field} LIKE '{}'", escape_literal(value))
}

pub fn equals_clause(field: &str, value: &str) -> String {
    format!("{field} = '{}'", escape_literal(value))
}

/// Split a mapping into allow-listed pairs and dropped keys
pub fn partition_known<'a>(
    mapping: &'a BTreeMap<String, String>,
    allowed: &[&str],
) -> (Vec<(&'a str, &'a str)>, Vec<String>) {
    let mut known = Vec::new();
    let mut dropped = Vec::new();

    for (key, value) in mapping {
        if allowed.contains(&key.as_str()) {
            known.push((key.as_str(), value.as_str()));
        } else {
            dropped.push(key.clone());
        }
    }

    (known, dropped)
}

/// Replace every quoted literal with a placeholder
///
/// Handles single and double quotes with doubled-quote escapes
/// (`'l''eau'`). A backslash is an ordinary character, as upstream. An
/// unterminated literal swallows the rest of the input.
pub fn strip_literals(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\'' && c != '"' {
            out.push(c);
            continue;
        }

        let quote = c;
        while let Some(inner) = chars.next() {
            if inner == quote {
                if chars.peek() == Some(&quote) {
                    chars.next();
                } else {
                    break;
                }
            }
        }
        out.push_str(" ? ");
    }

    out
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)`?\b([a-z_][a-z0-9_]*)\b`?\s*\)*\s*(?:not\s+)?(?:like\b|in\b|is\b|!=|<>|<=|>=|=|<|>)",
        )
        .expect("field pattern is a valid regex")
    })
}

/// Field identifiers found immediately before an operator, in order of appearance
pub fn extract_fields(expr: &str) -> Vec<String> {
    let stripped = strip_literals(expr);
    let mut fields: Vec<String> = Vec::new();

    for caps in field_pattern().captures_iter(&stripped) {
        let name = &caps[1];
        if KEYWORDS.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        if !fields.iter().any(|f| f == name) {
            fields.push(name.to_string());
        }
    }

    fields
}

/// Build the `where` fragment for a search
///
/// Mapping pairs become `field LIKE 'value'` clauses joined with `AND`.
/// A raw expression is appended as `AND (<raw>)` when both are present.
pub fn translate(
    raw: Option<&str>,
    mapping: &BTreeMap<String, String>,
    allowed: &[&str],
) -> Result<TranslatedFilter, QueryError> {
    let (known, dropped) = partition_known(mapping, allowed);
    let mut clauses: Vec<String> = known
        .into_iter()
        .map(|(field, value)| like_clause(field, value))
        .collect();

    let raw = raw.map(str::trim).filter(|r| !r.is_empty());

    let validation = match raw {
        None => RawValidation::Absent,
        Some(expr) => {
            let fields = extract_fields(expr);
            if fields.is_empty() {
                RawValidation::Unvalidated
            } else {
                let unknown: Vec<String> = fields
                    .into_iter()
                    .filter(|f| !allowed.contains(&f.as_str()))
                    .collect();
                if !unknown.is_empty() {
                    return Err(QueryError::invalid_fields(unknown));
                }
                RawValidation::Validated
            }
        }
    };

    if let Some(expr) = raw {
        if clauses.is_empty() {
            clauses.push(expr.to_string());
        } else {
            clauses.push(format!("({expr})"));
        }
    }

    let clause = if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    };

    Ok(TranslatedFilter {
        clause,
        dropped,
        validation,
    })
}
