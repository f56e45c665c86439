//! Result projection: raw response item → flat comparison record
//!
//! Every extraction is total. A field the service did not send is simply
//! absent from the record; nothing here returns an error except the
//! collection unwrap, which needs the body to have the route's shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::route::{Collection, Route};

/// Feature properties copied verbatim for `/search` and `/reverse`.
const FEATURE_FIELDS: &[&str] = &[
    "type",
    "municipalitycode",
    "oldmunicipalitycode",
    "departmentcode",
    "districtcode",
    "section",
    "category",
    "zipcode",
    "truegeometry",
    "number",
    "sheet",
    "_type",
    "metropole",
];

/// Feature properties that upstream returns either as a scalar or as a
/// one-element array.
const SEQUENCE_FIELDS: &[&str] = &["city", "citycode", "postcode"];

/// Completion item fields.
const COMPLETION_FIELDS: &[&str] = &[
    "fulltext",
    "city",
    "citycode",
    "postcode",
    "country",
    "zipcode",
    "poiType",
    "metropole",
];

/// Flat field → value mapping for one response item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, Value>,
}

impl NormalizedRecord {
    /// Value of `field`, or `None` when the service did not send it.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether `field` was sent (possibly as `null` or empty).
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Insert a field, skipping absent values.
    pub fn set(&mut self, field: impl Into<String>, value: Option<Value>) {
        if let Some(v) = value {
            self.fields.insert(field.into(), v);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// First element of an array, or the value itself.
///
/// An empty array yields `None`.
#[must_use]
pub fn first_if_sequence(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::Array(items) => items.first().cloned(),
        scalar => Some(scalar.clone()),
    }
}

/// JavaScript-style truthiness, used where the service signals absence with
/// empty strings or zeros.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Project one raw item for `route`.
#[must_use]
pub fn project(item: &Value, route: &Route) -> NormalizedRecord {
    match route {
        Route::Search | Route::Reverse => project_feature(item),
        Route::Completion => project_completion(item),
        Route::Root | Route::Other(_) => passthrough(item),
    }
}

fn project_feature(item: &Value) -> NormalizedRecord {
    let empty = Map::new();
    let properties = item
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut record = NormalizedRecord::default();

    let cleabs = properties
        .get("extrafields")
        .and_then(|extra| extra.get("cleabs"))
        .filter(|v| is_truthy(v));
    record.set("id", cleabs.or_else(|| properties.get("id")).cloned());

    for field in SEQUENCE_FIELDS {
        record.set(*field, first_if_sequence(properties.get(*field)));
    }
    for field in FEATURE_FIELDS {
        record.set(*field, properties.get(*field).cloned());
    }
    record
}

fn project_completion(item: &Value) -> NormalizedRecord {
    let mut record = NormalizedRecord::default();
    for field in COMPLETION_FIELDS {
        record.set(*field, item.get(*field).cloned());
    }
    record
}

// Non-object items have no fields to pass through.
fn passthrough(item: &Value) -> NormalizedRecord {
    let mut record = NormalizedRecord::default();
    if let Some(object) = item.as_object() {
        for (key, value) in object {
            record.set(key.clone(), Some(value.clone()));
        }
    }
    record
}

/// Message of a top-level `error` field, if the body carries a truthy one.
#[must_use]
pub fn service_error(body: &Value) -> Option<String> {
    let error = body.get("error").filter(|e| is_truthy(e))?;
    Some(match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    })
}

/// Unwrap the route's collection and project every item.
///
/// # Errors
///
/// Returns [`CollectionError`] if the body lacks the collection key or the
/// collection is not a sequence.
pub fn project_response(
    body: &Value,
    route: &Route,
) -> Result<Vec<NormalizedRecord>, CollectionError> {
    match route.collection() {
        Collection::Whole => Ok(vec![project(body, route)]),
        Collection::Key(key) => match body.get(key) {
            Some(Value::Array(items)) => Ok(items.iter().map(|i| project(i, route)).collect()),
            Some(_) => Err(CollectionError::NotASequence(key)),
            None => Err(CollectionError::Missing(key)),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("response has no '{0}' collection")]
    Missing(&'static str),
    #[error("response '{0}' is not a sequence")]
    NotASequence(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn feature(properties: Value) -> Value {
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [2.35, 48.85]},
            "properties": properties,
        })
    }

    // ── first_if_sequence ──

    #[test]
    fn first_if_sequence_unwraps_arrays() {
        assert_eq!(
            first_if_sequence(Some(&json!(["Paris", "Lyon"]))),
            Some(json!("Paris"))
        );
    }

    #[test]
    fn first_if_sequence_keeps_scalars() {
        assert_eq!(first_if_sequence(Some(&json!("Paris"))), Some(json!("Paris")));
        assert_eq!(first_if_sequence(Some(&json!(null))), Some(json!(null)));
    }

    #[test]
    fn first_if_sequence_empty_and_absent() {
        assert_eq!(first_if_sequence(Some(&json!([]))), None);
        assert_eq!(first_if_sequence(None), None);
    }

    // ── feature projection ──

    #[test]
    fn city_array_and_scalar_project_the_same() {
        let wrapped = project(&feature(json!({"city": ["Paris"]})), &Route::Search);
        let bare = project(&feature(json!({"city": "Paris"})), &Route::Search);
        assert_eq!(wrapped.get("city"), Some(&json!("Paris")));
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn id_prefers_cleabs() {
        let record = project(
            &feature(json!({"id": "plain", "extrafields": {"cleabs": "ABC123"}})),
            &Route::Search,
        );
        assert_eq!(record.get("id"), Some(&json!("ABC123")));
    }

    #[test]
    fn id_falls_back_when_cleabs_empty() {
        let record = project(
            &feature(json!({"id": "plain", "extrafields": {"cleabs": ""}})),
            &Route::Reverse,
        );
        assert_eq!(record.get("id"), Some(&json!("plain")));
    }

    #[test]
    fn feature_drops_unlisted_fields() {
        let record = project(
            &feature(json!({
                "label": "8 Boulevard du Port 80000 Amiens",
                "postcode": ["80000"],
                "zipcode": "80000",
                "_type": "address",
            })),
            &Route::Search,
        );
        assert!(!record.has("label"));
        assert_eq!(record.get("postcode"), Some(&json!("80000")));
        assert_eq!(record.get("_type"), Some(&json!("address")));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn feature_without_properties_is_empty() {
        let record = project(&json!({"type": "Feature"}), &Route::Search);
        assert!(record.is_empty());
    }

    // ── completion / passthrough ──

    #[test]
    fn completion_reads_item_directly() {
        let record = project(
            &json!({
                "fulltext": "Paris",
                "city": "Paris",
                "kind": "municipality",
                "x": 2.35,
            }),
            &Route::Completion,
        );
        assert_eq!(record.get("fulltext"), Some(&json!("Paris")));
        assert!(!record.has("kind"));
        assert!(!record.has("x"));
    }

    #[test]
    fn other_route_passes_everything_through() {
        let item = json!({"name": "x", "nested": {"a": 1}});
        let record = project(&item, &Route::Other("/getCapabilities".into()));
        assert_eq!(record.get("nested"), Some(&json!({"a": 1})));
        assert_eq!(record.len(), 2);
    }

    // ── response shaping ──

    #[test]
    fn search_unwraps_features() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [feature(json!({"id": "a"})), feature(json!({"id": "b"}))],
        });
        let records = project_response(&body, &Route::Search).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("id"), Some(&json!("b")));
    }

    #[test]
    fn completion_unwraps_results() {
        let body = json!({"status": "OK", "results": [{"fulltext": "Paris"}]});
        let records = project_response(&body, &Route::Completion).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn root_wraps_body() {
        let body = json!({"version": "1.0", "indexes": ["address"]});
        let records = project_response(&body, &Route::Root).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("version"), Some(&json!("1.0")));
    }

    #[test]
    fn missing_collection_is_error() {
        let body = json!({"type": "FeatureCollection"});
        assert_eq!(
            project_response(&body, &Route::Search),
            Err(CollectionError::Missing("features"))
        );
        let body = json!({"results": {"a": 1}});
        assert_eq!(
            project_response(&body, &Route::Completion),
            Err(CollectionError::NotASequence("results"))
        );
    }

    #[test]
    fn service_error_detection() {
        assert_eq!(
            service_error(&json!({"error": "index unavailable"})),
            Some("index unavailable".into())
        );
        assert_eq!(service_error(&json!({"error": ""})), None);
        assert_eq!(service_error(&json!({"features": []})), None);
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(null)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!("0")));
    }

    // ── properties ──

    fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ]
    }

    fn arb_properties() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(
            prop::sample::select(vec![
                "id", "city", "citycode", "postcode", "type", "zipcode", "label", "section",
            ]),
            prop_oneof![
                arb_scalar(),
                prop::collection::vec(arb_scalar(), 0..3).prop_map(Value::Array),
            ],
            0..8,
        )
        .prop_map(|m| {
            Value::Object(m.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
        })
    }

    proptest! {
        #[test]
        fn projection_is_idempotent(properties in arb_properties()) {
            let item = feature(properties);
            prop_assert_eq!(project(&item, &Route::Search), project(&item, &Route::Search));
        }

        #[test]
        fn sequence_fields_never_project_to_arrays(properties in arb_properties()) {
            let record = project(&feature(properties), &Route::Search);
            for field in SEQUENCE_FIELDS {
                prop_assert!(!matches!(record.get(field), Some(Value::Array(_))));
            }
        }
    }
}
