//! Declarative metadata filters and their compiled predicate form.
//!
//! A [`MetadataFilter`] narrows vector search to records matching
//! structural attributes: exact values, inclusive numeric ranges, or set
//! membership. [`MetadataFilter::compile`] turns the declarative form into
//! a [`CompiledPredicate`] that both serializes to the vector store's query
//! dialect and evaluates locally against a metadata map.
//!
//! All clauses are conjunctive. An empty filter matches every record.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::{Error, Result};

// =============================================================================
// DECLARATIVE FILTER
// =============================================================================

/// One constraint on a single metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterConstraint {
    /// Exact-match equality against a JSON literal.
    Equals(JsonValue),
    /// Inclusive numeric range; a missing side is unbounded.
    Range { min: Option<f64>, max: Option<f64> },
    /// Value must be a member of the given set.
    OneOf(Vec<JsonValue>),
}

/// Declarative mapping from field name to constraint.
///
/// A field appears at most once (map semantics). `BTreeMap` keeps clause
/// order deterministic for identical input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    fields: BTreeMap<String, FilterConstraint>,
}

impl MetadataFilter {
    /// Create an empty filter (matches all records).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style constraint setter. A repeated field replaces the
    /// earlier constraint.
    pub fn with(mut self, field: impl Into<String>, constraint: FilterConstraint) -> Self {
        self.fields.insert(field.into(), constraint);
        self
    }

    /// Convenience: equality constraint.
    pub fn with_eq(self, field: impl Into<String>, value: JsonValue) -> Self {
        self.with(field, FilterConstraint::Equals(value))
    }

    /// Convenience: inclusive numeric range constraint.
    pub fn with_range(
        self,
        field: impl Into<String>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        self.with(field, FilterConstraint::Range { min, max })
    }

    /// Convenience: set-membership constraint.
    pub fn with_one_of(self, field: impl Into<String>, values: Vec<JsonValue>) -> Self {
        self.with(field, FilterConstraint::OneOf(values))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Parse the wire shape used by producers: an object mapping field name
    /// to a bare literal (equality), a `{min, max}` object (range, either
    /// side optional), or an array (set membership).
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        let obj = match value {
            JsonValue::Null => return Ok(Self::new()),
            JsonValue::Object(obj) => obj,
            other => {
                return Err(Error::Validation(format!(
                    "metadata_filters must be an object, got {}",
                    type_name(other)
                )))
            }
        };

        let mut filter = Self::new();
        for (field, spec) in obj {
            let constraint = match spec {
                JsonValue::Object(bounds) => parse_range(field, bounds)?,
                JsonValue::Array(values) => FilterConstraint::OneOf(values.clone()),
                literal => FilterConstraint::Equals(literal.clone()),
            };
            filter.fields.insert(field.clone(), constraint);
        }
        Ok(filter)
    }

    /// Compile into the conjunctive predicate form.
    ///
    /// Pure and deterministic. A range with `min > max` is a caller error,
    /// reported rather than silently swapped.
    pub fn compile(&self) -> Result<CompiledPredicate> {
        let mut clauses = Vec::with_capacity(self.fields.len());

        for (field, constraint) in &self.fields {
            match constraint {
                FilterConstraint::Equals(value) => {
                    clauses.push(CompiledClause::Eq {
                        field: field.clone(),
                        value: value.clone(),
                    });
                }
                FilterConstraint::Range { min, max } => {
                    if let (Some(lo), Some(hi)) = (min, max) {
                        if lo > hi {
                            return Err(Error::Validation(format!(
                                "filter '{}': min {} exceeds max {}",
                                field, lo, hi
                            )));
                        }
                    }
                    clauses.push(CompiledClause::Range {
                        field: field.clone(),
                        min: *min,
                        max: *max,
                    });
                }
                FilterConstraint::OneOf(values) => {
                    clauses.push(CompiledClause::In {
                        field: field.clone(),
                        values: values.clone(),
                    });
                }
            }
        }

        Ok(CompiledPredicate { clauses })
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn parse_range(field: &str, bounds: &Map<String, JsonValue>) -> Result<FilterConstraint> {
    let known = bounds.keys().all(|k| k == "min" || k == "max");
    if bounds.is_empty() || !known {
        return Err(Error::Validation(format!(
            "filter '{}': constraint object must contain only 'min'/'max'",
            field
        )));
    }

    let side = |key: &str| -> Result<Option<f64>> {
        match bounds.get(key) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| {
                Error::Validation(format!("filter '{}': '{}' must be numeric", field, key))
            }),
        }
    };

    Ok(FilterConstraint::Range {
        min: side("min")?,
        max: side("max")?,
    })
}

impl Serialize for MetadataFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, constraint) in &self.fields {
            let spec = match constraint {
                FilterConstraint::Equals(v) => v.clone(),
                FilterConstraint::Range { min, max } => {
                    let mut obj = Map::new();
                    if let Some(lo) = min {
                        obj.insert("min".into(), json!(lo));
                    }
                    if let Some(hi) = max {
                        obj.insert("max".into(), json!(hi));
                    }
                    JsonValue::Object(obj)
                }
                FilterConstraint::OneOf(values) => JsonValue::Array(values.clone()),
            };
            map.serialize_entry(field, &spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetadataFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        MetadataFilter::from_value(&value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// COMPILED PREDICATE
// =============================================================================

/// One compiled clause. All clauses in a predicate are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledClause {
    Eq {
        field: String,
        value: JsonValue,
    },
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    In {
        field: String,
        values: Vec<JsonValue>,
    },
}

impl CompiledClause {
    fn matches(&self, metadata: &Map<String, JsonValue>) -> bool {
        match self {
            CompiledClause::Eq { field, value } => metadata.get(field) == Some(value),
            CompiledClause::Range { field, min, max } => {
                let Some(actual) = metadata.get(field).and_then(|v| v.as_f64()) else {
                    return false;
                };
                min.map_or(true, |lo| actual >= lo) && max.map_or(true, |hi| actual <= hi)
            }
            CompiledClause::In { field, values } => metadata
                .get(field)
                .is_some_and(|actual| values.contains(actual)),
        }
    }

    fn to_query_json(&self) -> JsonValue {
        match self {
            CompiledClause::Eq { field, value } => json!({ field: value }),
            CompiledClause::Range { field, min, max } => {
                let mut spec = Map::new();
                if let Some(lo) = min {
                    spec.insert("$gte".into(), json!(lo));
                }
                if let Some(hi) = max {
                    spec.insert("$lte".into(), json!(hi));
                }
                json!({ field: spec })
            }
            CompiledClause::In { field, values } => json!({ field: { "$in": values } }),
        }
    }
}

/// Conjunctive predicate usable by the vector store's query interface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPredicate {
    clauses: Vec<CompiledClause>,
}

impl CompiledPredicate {
    /// Predicate that matches every record.
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[CompiledClause] {
        &self.clauses
    }

    /// Evaluate against a record's metadata. A field absent from the
    /// metadata fails its clause.
    pub fn matches(&self, metadata: &Map<String, JsonValue>) -> bool {
        self.clauses.iter().all(|c| c.matches(metadata))
    }

    /// `where`-document for a Chroma-compatible query API: bare value for
    /// equality, `$gte`/`$lte` for ranges, `$in` for sets, multiple clauses
    /// joined under `$and`. `None` when the predicate matches everything.
    pub fn to_query_json(&self) -> Option<JsonValue> {
        match self.clauses.len() {
            0 => None,
            1 => Some(self.clauses[0].to_query_json()),
            _ => Some(json!({
                "$and": self.clauses.iter().map(|c| c.to_query_json()).collect::<Vec<_>>()
            })),
        }
    }
}
