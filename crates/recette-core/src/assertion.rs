//! Assertion engine: fixture predicates vs projected records
//!
//! Every configured predicate is evaluated, and every disagreement is
//! returned, so one broken field never hides another.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fixture::Predicates;
use crate::projector::NormalizedRecord;
use crate::route::Route;

/// Pseudo-field of `many` that checks the department derived from `zipcode`.
pub const TERRITORY_FIELD: &str = "terr";

/// One named predicate of a fixture `results` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PredicateKind {
    FirstResult,
    Only,
    HasProperties,
    Many,
    Including,
    NbResult,
}

impl PredicateKind {
    /// Key used in fixture documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstResult => "firstResult",
            Self::Only => "only",
            Self::HasProperties => "hasProperties",
            Self::Many => "many",
            Self::Including => "including",
            Self::NbResult => "nbResult",
        }
    }
}

impl std::fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate that did not hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Disagreement {
    pub predicate: PredicateKind,
    /// Field under test (absent for whole-collection checks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Index of the offending record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<usize>,
    pub expected: Value,
    /// Observed value; absent when the record lacks the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    pub message: String,
}

impl Disagreement {
    fn new(predicate: PredicateKind, expected: &Value, message: impl Into<String>) -> Self {
        Self {
            predicate,
            field: None,
            record: None,
            expected: expected.clone(),
            actual: None,
            message: message.into(),
        }
    }

    fn malformed(predicate: PredicateKind, expected: &Value, shape: &str) -> Self {
        Self::new(
            predicate,
            expected,
            format!("malformed predicate: expected {shape}"),
        )
    }

    fn on(mut self, field: &str, record: usize, actual: Option<&Value>) -> Self {
        self.field = Some(field.to_string());
        self.record = Some(record);
        self.actual = actual.cloned();
        self
    }
}

impl std::fmt::Display for Disagreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.predicate)?;
        if let Some(field) = &self.field {
            write!(f, ".{field}")?;
        }
        if let Some(idx) = self.record {
            write!(f, " [record {idx}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Evaluate every configured predicate against `records`.
#[must_use]
pub fn evaluate(
    route: &Route,
    records: &[NormalizedRecord],
    predicates: &Predicates,
) -> Vec<Disagreement> {
    let mut out = Vec::new();
    for (kind, expected) in predicates.configured() {
        match kind {
            PredicateKind::FirstResult => check_first_result(route, records, expected, &mut out),
            PredicateKind::Only => check_only(records, expected, &mut out),
            PredicateKind::HasProperties => check_has_properties(records, expected, &mut out),
            PredicateKind::Many => check_many(records, expected, &mut out),
            PredicateKind::Including => check_including(records, expected, &mut out),
            PredicateKind::NbResult => check_nb_result(records, expected, &mut out),
        }
    }
    out
}

fn check_first_result(
    route: &Route,
    records: &[NormalizedRecord],
    expected: &Value,
    out: &mut Vec<Disagreement>,
) {
    let kind = PredicateKind::FirstResult;
    // Routes without an identity field have nothing to compare.
    let Some(field) = route.identity_field() else {
        return;
    };
    let Some(wanted) = expected.as_object() else {
        out.push(Disagreement::malformed(kind, expected, "a mapping"));
        return;
    };
    let Some(first) = records.first() else {
        out.push(Disagreement::new(kind, expected, "no results returned"));
        return;
    };

    let want = wanted.get(field);
    let got = first.get(field);
    if !option_eq(want, got) {
        out.push(
            Disagreement::new(
                kind,
                want.unwrap_or(&Value::Null),
                format!("expected {}, got {}", show(want), show(got)),
            )
            .on(field, 0, got),
        );
    }
}

fn check_only(records: &[NormalizedRecord], expected: &Value, out: &mut Vec<Disagreement>) {
    let kind = PredicateKind::Only;
    let Some(filters) = expected.as_object() else {
        out.push(Disagreement::malformed(kind, expected, "a mapping"));
        return;
    };
    for (idx, record) in records.iter().enumerate() {
        for (field, want) in filters {
            let got = record.get(field);
            if !got.is_some_and(|g| loose_eq(g, want)) {
                out.push(
                    Disagreement::new(
                        kind,
                        want,
                        format!("expected {want}, got {}", show(got)),
                    )
                    .on(field, idx, got),
                );
            }
        }
    }
}

fn check_has_properties(
    records: &[NormalizedRecord],
    expected: &Value,
    out: &mut Vec<Disagreement>,
) {
    let kind = PredicateKind::HasProperties;
    let names: Option<Vec<&str>> = expected
        .as_array()
        .and_then(|items| items.iter().map(Value::as_str).collect());
    let Some(names) = names else {
        out.push(Disagreement::malformed(
            kind,
            expected,
            "a sequence of field names",
        ));
        return;
    };
    for (idx, record) in records.iter().enumerate() {
        for name in &names {
            if !record.has(name) {
                out.push(
                    Disagreement::new(kind, &Value::String((*name).to_string()), "missing field")
                        .on(name, idx, None),
                );
            }
        }
    }
}

fn check_many(records: &[NormalizedRecord], expected: &Value, out: &mut Vec<Disagreement>) {
    let kind = PredicateKind::Many;
    let Some(filters) = expected.as_object() else {
        out.push(Disagreement::malformed(kind, expected, "a mapping"));
        return;
    };
    let mut sets: Vec<(&String, &Vec<Value>)> = Vec::with_capacity(filters.len());
    for (field, allowed) in filters {
        match allowed.as_array() {
            Some(set) => sets.push((field, set)),
            None => out.push(
                Disagreement::malformed(kind, allowed, "a sequence of allowed values")
                    .on(field, 0, None),
            ),
        }
    }

    for (idx, record) in records.iter().enumerate() {
        for (field, allowed) in &sets {
            let actual = if field.as_str() == TERRITORY_FIELD {
                // No zipcode, nothing to derive.
                match record.get("zipcode").and_then(zipcode_department) {
                    Some(code) => Some(Value::String(code)),
                    None => continue,
                }
            } else {
                record.get(field).cloned()
            };
            let member = actual
                .as_ref()
                .is_some_and(|a| allowed.iter().any(|v| loose_eq(a, v)));
            if !member {
                let set = Value::Array((*allowed).clone());
                let message = format!("{} is not one of {set}", show(actual.as_ref()));
                out.push(Disagreement::new(kind, &set, message).on(field, idx, actual.as_ref()));
            }
        }
    }
}

fn check_including(records: &[NormalizedRecord], expected: &Value, out: &mut Vec<Disagreement>) {
    let kind = PredicateKind::Including;
    let Some(filters) = expected.as_object() else {
        out.push(Disagreement::malformed(kind, expected, "a mapping"));
        return;
    };
    for (idx, record) in records.iter().enumerate() {
        for (field, needle) in filters {
            let got = record.get(field);
            let contained = match got {
                Some(Value::String(haystack)) => match needle {
                    Value::String(n) => haystack.contains(n.as_str()),
                    Value::Number(n) => haystack.contains(&n.to_string()),
                    _ => false,
                },
                Some(Value::Array(items)) => items.iter().any(|i| loose_eq(i, needle)),
                _ => false,
            };
            if !contained {
                out.push(
                    Disagreement::new(
                        kind,
                        needle,
                        format!("{} does not contain {needle}", show(got)),
                    )
                    .on(field, idx, got),
                );
            }
        }
    }
}

fn check_nb_result(records: &[NormalizedRecord], expected: &Value, out: &mut Vec<Disagreement>) {
    let kind = PredicateKind::NbResult;
    let Some(want) = expected.as_u64() else {
        out.push(Disagreement::malformed(
            kind,
            expected,
            "a non-negative integer",
        ));
        return;
    };
    let got = records.len() as u64;
    if got != want {
        let mut d = Disagreement::new(
            kind,
            expected,
            format!("expected {want} results, got {got}"),
        );
        d.actual = Some(Value::from(got));
        out.push(d);
    }
}

/// Department code from a postal code: two characters below `"97"`, three
/// for overseas territories.
#[must_use]
pub fn department_code(zipcode: &str) -> String {
    let width = if zipcode < "97" { 2 } else { 3 };
    zipcode.chars().take(width).collect()
}

fn zipcode_department(zipcode: &Value) -> Option<String> {
    let text = match zipcode {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then(|| department_code(&text))
}

/// Deep equality where numbers compare by value (`1 == 1.0`).
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loose_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => objects_eq(x, y),
        _ => a == b,
    }
}

fn objects_eq(x: &Map<String, Value>, y: &Map<String, Value>) -> bool {
    x.len() == y.len()
        && x
            .iter()
            .all(|(k, v)| y.get(k).is_some_and(|w| loose_eq(v, w)))
}

fn option_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => loose_eq(x, y),
        (None, None) => true,
        _ => false,
    }
}

fn show(value: Option<&Value>) -> String {
    value.map_or_else(|| "<absent>".to_string(), Value::to_string)
}
