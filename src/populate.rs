//! Reference resolution: synthesizing stage groups that dereference
//! foreign-key fields into embedded sub-documents.
//!
//! Identifier fields live under a reserved sub-document namespace (`metadata`
//! by default). For each [`ReferenceSpec`] the resolver emits, in order: an
//! identifier cast (`$toObjectId`, mapped over the array for plural
//! references), a left-outer `$lookup` against the target collection, a
//! cardinality-shaping `$addFields` (first element or removal for singular
//! references, array or removal for plural ones), a null-pruning `$addFields`
//! guarding the source identifier, and, when fields are excluded, a
//! suppressing `$project`. Groups for successive specs are concatenated in
//! input order with no interleaving or deduplication.

use crate::errors::PopulateError;
use crate::pipeline::stage::{add_fields_stage, lookup_stage, project_stage, LookupSpec, Stage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Default sub-document namespace holding reference identifier fields.
pub const DEFAULT_METADATA_FIELD: &str = "metadata";

/// Whether a reference resolves to one related document or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Descriptor of a foreign-key field to dereference into an embedded
/// sub-document.
///
/// `cardinality` is the authoritative tag when present. When absent it is
/// inferred structurally: an `id_field` ending in `Ids` denotes a one-to-many
/// reference, anything else one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSpec {
    /// Identifier field within the metadata namespace, e.g. `userId`.
    pub id_field: String,
    /// Collection to look the identifier(s) up in.
    pub collection: String,
    /// Output sub-field under the same namespace. Defaults to `id_field`
    /// with its `Id`/`Ids` suffix stripped.
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Dot-paths inside the resolved sub-document to suppress, e.g.
    /// credential hashes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_fields: Vec<String>,
    /// Explicit cardinality tag overriding suffix inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
}

impl ReferenceSpec {
    pub fn new(id_field: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            collection: collection.into(),
            alias: None,
            exclude_fields: Vec::new(),
            cardinality: None,
        }
    }

    /// Name the output sub-field explicitly.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Suppress dot-paths inside the resolved sub-document.
    pub fn with_excluded<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Tag the cardinality explicitly instead of relying on the `Ids`
    /// suffix convention.
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    /// The cardinality in effect: the explicit tag, or suffix inference.
    pub fn effective_cardinality(&self) -> Cardinality {
        self.cardinality.unwrap_or(if self.id_field.ends_with("Ids") {
            Cardinality::Many
        } else {
            Cardinality::One
        })
    }

    /// The output sub-field name: the explicit alias, or the identifier
    /// field with its `Id`/`Ids` suffix stripped.
    pub fn output_alias(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => strip_id_suffix(&self.id_field),
        }
    }
}

fn strip_id_suffix(id_field: &str) -> &str {
    id_field
        .strip_suffix("Ids")
        .or_else(|| id_field.strip_suffix("Id"))
        .unwrap_or(id_field)
}

/// Synthesizes metadata-population stage groups from reference specs.
///
/// The namespace is injected rather than read from a global so callers with a
/// differently named sub-document can reuse the resolver unchanged.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    namespace: String,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    /// Resolver over the default `metadata` namespace.
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_METADATA_FIELD)
    }

    /// Resolver over a custom sub-document namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Synthesize the flat stage sequence for the given specs, concatenated
    /// in input order.
    ///
    /// Duplicate output aliases are legal here: both groups run and the later
    /// one's writes win in the final document. A warning is logged because
    /// that precedence is rarely what the caller meant; use
    /// [`try_resolve`](Self::try_resolve) to reject it outright.
    pub fn resolve(&self, specs: &[ReferenceSpec]) -> Vec<Stage> {
        if let Some(alias) = duplicate_alias(specs) {
            log::warn!(
                "reference specs share output alias `{}.{}`; the later group's writes take precedence",
                self.namespace,
                alias
            );
        }
        specs.iter().flat_map(|spec| self.spec_stages(spec)).collect()
    }

    /// Like [`resolve`](Self::resolve), but fails fast on duplicate output
    /// aliases instead of letting the later group win silently.
    pub fn try_resolve(&self, specs: &[ReferenceSpec]) -> Result<Vec<Stage>, PopulateError> {
        if let Some(alias) = duplicate_alias(specs) {
            return Err(PopulateError::DuplicateAlias { alias });
        }
        Ok(specs.iter().flat_map(|spec| self.spec_stages(spec)).collect())
    }

    /// The four (or five, with exclusions) stages for one spec.
    fn spec_stages(&self, spec: &ReferenceSpec) -> Vec<Stage> {
        let source_path = self.field_path(&spec.id_field);
        let alias_path = self.field_path(spec.output_alias());
        let cardinality = spec.effective_cardinality();

        let mut stages = vec![
            match cardinality {
                Cardinality::One => cast_id_stage(&source_path),
                Cardinality::Many => cast_ids_stage(&source_path),
            },
            lookup_stage(
                LookupSpec::new(spec.collection.clone(), alias_path.clone())
                    .on_fields(source_path.clone(), "_id"),
            ),
            shape_result_stage(&alias_path, cardinality),
            // Guards the case where the source identifier was absent and the
            // cast left a null behind. Idempotent.
            prune_null_stage(&source_path),
        ];

        if let Some(stage) = self.exclusion_stage(spec) {
            stages.push(stage);
        }
        stages
    }

    fn field_path(&self, field: &str) -> String {
        format!("{}.{}", self.namespace, field)
    }

    /// `$project` suppressing excluded dot-paths under the resolved alias.
    fn exclusion_stage(&self, spec: &ReferenceSpec) -> Option<Stage> {
        if spec.exclude_fields.is_empty() {
            return None;
        }
        let alias = spec.output_alias();
        let mut projection = Map::new();
        for field in &spec.exclude_fields {
            projection.insert(self.field_path(&format!("{alias}.{field}")), json!(0));
        }
        Some(project_stage(Value::Object(projection)))
    }
}

/// First output alias shared by two specs, if any.
fn duplicate_alias(specs: &[ReferenceSpec]) -> Option<String> {
    let mut seen = HashSet::new();
    for spec in specs {
        let alias = spec.output_alias();
        if !seen.insert(alias) {
            return Some(alias.to_string());
        }
    }
    None
}

fn field_document(path: &str, value: Value) -> Value {
    let mut doc = Map::new();
    doc.insert(path.to_string(), value);
    Value::Object(doc)
}

/// `$addFields` casting a single string identifier to ObjectId in place.
fn cast_id_stage(path: &str) -> Stage {
    add_fields_stage(field_document(
        path,
        json!({"$toObjectId": format!("${path}")}),
    ))
}

/// `$addFields` casting every element of an identifier array in place.
fn cast_ids_stage(path: &str) -> Stage {
    add_fields_stage(field_document(
        path,
        json!({
            "$map": {
                "input": format!("${path}"),
                "as": "id",
                "in": {"$toObjectId": "$$id"},
            }
        }),
    ))
}

/// `$addFields` collapsing the join result: for singular references the
/// first element or removal, for plural ones the array or removal. An empty
/// join result is always removed, never left as null or `[]`.
fn shape_result_stage(path: &str, cardinality: Cardinality) -> Stage {
    let field_ref = format!("${path}");
    let non_empty = match cardinality {
        Cardinality::One => json!({"$arrayElemAt": [field_ref.clone(), 0]}),
        Cardinality::Many => json!(field_ref.clone()),
    };
    add_fields_stage(field_document(
        path,
        json!({
            "$cond": {
                "if": {"$eq": [{"$size": field_ref}, 0]},
                "then": "$$REMOVE",
                "else": non_empty,
            }
        }),
    ))
}

/// `$addFields` removing the field at `path` entirely when its value is null.
fn prune_null_stage(path: &str) -> Stage {
    let field_ref = format!("${path}");
    add_fields_stage(field_document(
        path,
        json!({
            "$cond": {
                "if": {"$eq": [field_ref.clone(), null]},
                "then": "$$REMOVE",
                "else": field_ref,
            }
        }),
    ))
}
