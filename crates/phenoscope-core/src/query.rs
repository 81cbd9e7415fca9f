//! Query compilation and portable query forms.
//!
//! `compile` is a pure function from a selection snapshot to a `QueryState`;
//! identical snapshots always produce identical clause sequences. The
//! portable form renders the same semantic query as a percent-encoded string
//! for the export link, in one of two backend dialects, and decoding a
//! portable form recovers an equivalent `QueryState`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::DatasetProfile;
use crate::error::{PhenoscopeError, Result};
use crate::selection::SelectionSnapshot;

/// Characters left unescaped by `encodeURIComponent`, which the download
/// endpoint expects.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// One conjunct of a compiled query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryClause {
    /// Exact-value facet filter.
    Term { field: String, value: String },
    /// Analyzed free-text filter (scientific name search).
    Match { field: String, text: String },
}

/// A compiled query: either the match-everything fallback or a conjunction.
///
/// Invariant: `Bool` never carries an empty clause list; an empty conjunction
/// compiles to `MatchAll` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryState {
    MatchAll,
    Bool { must: Vec<QueryClause> },
}

/// Serialization target for the portable query form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryDialect {
    /// Percent-encoded Elasticsearch query JSON.
    EsJson,
    /// Percent-encoded Lucene-style boolean expression.
    Lucene,
}

/// Compiles the current selection into a query.
///
/// Clause order: facet clauses grouped by field in profile declaration order
/// (values in insertion order), then any selected fields the profile does not
/// declare (sorted by name, for determinism), then the text clause.
pub fn compile(profile: &DatasetProfile, snapshot: &SelectionSnapshot) -> QueryState {
    let mut must = Vec::new();

    let mut push_field = |field: &str| {
        for value in snapshot.values(field) {
            must.push(QueryClause::Term {
                field: field.to_string(),
                value: value.clone(),
            });
        }
    };

    for def in &profile.facets {
        push_field(&def.name);
    }
    for field in snapshot.field_names() {
        if !profile.facets.iter().any(|def| def.name == field) {
            push_field(field);
        }
    }

    if let Some(text) = snapshot.text_filter() {
        must.push(QueryClause::Match {
            field: profile.text_field.value.clone(),
            text: text.to_string(),
        });
    }

    if must.is_empty() {
        QueryState::MatchAll
    } else {
        QueryState::Bool { must }
    }
}

impl QueryState {
    /// Renders the Elasticsearch query document for this state.
    pub fn to_es_json(&self) -> Value {
        match self {
            QueryState::MatchAll => json!({ "match_all": {} }),
            QueryState::Bool { must } => {
                let clauses: Vec<Value> = must.iter().map(QueryClause::to_es_json).collect();
                json!({ "bool": { "must": clauses } })
            }
        }
    }

    fn from_es_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| malformed("query is not an object"))?;
        if object.contains_key("match_all") {
            return Ok(QueryState::MatchAll);
        }
        let must = object
            .get("bool")
            .and_then(|b| b.get("must"))
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("expected match_all or bool.must"))?;
        let clauses = must.iter().map(QueryClause::from_es_json).collect::<Result<Vec<_>>>()?;
        if clauses.is_empty() {
            return Err(malformed("bool.must is empty"));
        }
        Ok(QueryState::Bool { must: clauses })
    }
}

impl QueryClause {
    fn to_es_json(&self) -> Value {
        match self {
            QueryClause::Term { field, value } => {
                let mut inner = serde_json::Map::new();
                inner.insert(field.clone(), Value::String(value.clone()));
                json!({ "term": inner })
            }
            QueryClause::Match { field, text } => {
                let mut inner = serde_json::Map::new();
                inner.insert(field.clone(), Value::String(text.clone()));
                json!({ "match": inner })
            }
        }
    }

    fn from_es_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| malformed("clause is not an object"))?;
        if let Some(inner) = object.get("term") {
            let (field, value) = single_string_entry(inner)?;
            return Ok(QueryClause::Term { field, value });
        }
        if let Some(inner) = object.get("match") {
            let (field, text) = single_string_entry(inner)?;
            return Ok(QueryClause::Match { field, text });
        }
        Err(malformed("clause is neither term nor match"))
    }
}

fn single_string_entry(value: &Value) -> Result<(String, String)> {
    let object = value.as_object().ok_or_else(|| malformed("clause body is not an object"))?;
    if object.len() != 1 {
        return Err(malformed("clause body must have exactly one field"));
    }
    let (field, value) = object
        .iter()
        .next()
        .ok_or_else(|| malformed("clause body must have exactly one field"))?;
    let text = value
        .as_str()
        .ok_or_else(|| malformed("clause value is not a string"))?;
    Ok((field.clone(), text.to_string()))
}

fn malformed(reason: &str) -> PhenoscopeError {
    PhenoscopeError::PortableForm {
        reason: reason.to_string(),
    }
}

/// Renders the query in the given dialect and percent-encodes it for URL
/// embedding.
pub fn to_portable_form(query: &QueryState, dialect: QueryDialect) -> String {
    let raw = match dialect {
        QueryDialect::EsJson => query.to_es_json().to_string(),
        QueryDialect::Lucene => to_lucene(query),
    };
    utf8_percent_encode(&raw, URI_COMPONENT).to_string()
}

/// Decodes a portable form back into a query. Inverse of `to_portable_form`
/// up to query equivalence.
pub fn from_portable_form(encoded: &str, dialect: QueryDialect) -> Result<QueryState> {
    let raw = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| malformed(&format!("invalid percent encoding: {e}")))?;
    match dialect {
        QueryDialect::EsJson => {
            let value: Value = serde_json::from_str(&raw)
                .map_err(|e| malformed(&format!("invalid query JSON: {e}")))?;
            QueryState::from_es_json(&value)
        }
        QueryDialect::Lucene => from_lucene(&raw),
    }
}

/// Builds the downloadable-result link for the current query.
pub fn build_export_link(profile: &DatasetProfile, query: &QueryState) -> String {
    format!(
        "{}?{}&limit={}",
        profile.download_url.value,
        to_portable_form(query, profile.dialect.value),
        profile.export_limit.value
    )
}

// Lucene dialect. Term clauses render quoted (`family:"Rosaceae"`), the text
// clause renders parenthesized (`scientific_name:(Rosa canina)`); the
// delimiters are the discriminator when decoding.

fn to_lucene(query: &QueryState) -> String {
    let QueryState::Bool { must } = query else {
        return "*:*".to_string();
    };
    must.iter()
        .map(|clause| match clause {
            QueryClause::Term { field, value } => {
                format!("{}:\"{}\"", field, escape_lucene(value))
            }
            QueryClause::Match { field, text } => format!("{field}:({text})"),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn escape_lucene(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape_lucene(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn from_lucene(raw: &str) -> Result<QueryState> {
    let raw = raw.trim();
    if raw == "*:*" {
        return Ok(QueryState::MatchAll);
    }
    if raw.is_empty() {
        return Err(malformed("empty Lucene expression"));
    }
    let mut clauses = Vec::new();
    for part in split_top_level_and(raw) {
        clauses.push(parse_lucene_clause(part.trim())?);
    }
    Ok(QueryState::Bool { must: clauses })
}

/// Splits on ` AND ` occurrences that are outside quotes and parentheses.
fn split_top_level_and(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && c == '(' {
            depth += 1;
        } else if !in_quotes && c == ')' {
            depth = depth.saturating_sub(1);
        } else if !in_quotes && depth == 0 && raw[i..].starts_with(" AND ") {
            parts.push(&raw[start..i]);
            start = i + " AND ".len();
            // Skip the remaining separator characters.
            for _ in 0..(" AND ".len() - 1) {
                chars.next();
            }
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn parse_lucene_clause(part: &str) -> Result<QueryClause> {
    let (field, body) = part
        .split_once(':')
        .ok_or_else(|| malformed(&format!("clause without field separator: {part}")))?;
    let field = field.trim().to_string();
    let body = body.trim();
    if field.is_empty() || body.is_empty() {
        return Err(malformed(&format!("incomplete clause: {part}")));
    }
    if body.starts_with('"') && body.ends_with('"') && body.len() >= 2 {
        return Ok(QueryClause::Term {
            field,
            value: unescape_lucene(&body[1..body.len() - 1]),
        });
    }
    if body.starts_with('(') && body.ends_with(')') && body.len() >= 2 {
        return Ok(QueryClause::Match {
            field,
            text: body[1..body.len() - 1].to_string(),
        });
    }
    // Bare token, e.g. hand-written `scientific_name:Rosa`.
    Ok(QueryClause::Match {
        field,
        text: body.to_string(),
    })
}
