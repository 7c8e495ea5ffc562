//! Aggregation stage descriptors and their factory functions.
//!
//! Each factory wraps a typed payload into a single-key tagged descriptor
//! (`{"$match": ...}`, `{"$lookup": ...}`, ...). Factories are pure and total:
//! no validation, no side effects, no errors. A payload the server would
//! reject still produces a structurally well-formed descriptor; semantic
//! validation is the server's job, not ours.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One atomic step of an aggregation pipeline, tagged by operator name.
///
/// Serialization is externally tagged with the server's documented operator
/// names, so `serde_json::to_value` yields exactly the wire form the
/// aggregation command expects, e.g. `{"$match": {"status": "active"}}`.
///
/// Stages are immutable once created. Free-form operator documents (`$match`,
/// `$group`, `$project`, ...) are carried as opaque [`Value`]s; operators with
/// a fixed grammar carry structured specs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "$match")]
    Match(Value),
    #[serde(rename = "$lookup")]
    Lookup(LookupSpec),
    #[serde(rename = "$group")]
    Group(Value),
    #[serde(rename = "$addFields")]
    AddFields(Value),
    #[serde(rename = "$project")]
    Project(Value),
    #[serde(rename = "$sort")]
    Sort(SortSpec),
    #[serde(rename = "$skip")]
    Skip(u64),
    #[serde(rename = "$limit")]
    Limit(u64),
    #[serde(rename = "$facet")]
    Facet(Value),
    #[serde(rename = "$unwind")]
    Unwind(UnwindSpec),
    #[serde(rename = "$replaceRoot")]
    ReplaceRoot(ReplaceRootSpec),
    #[serde(rename = "$count")]
    Count(String),
    #[serde(rename = "$unionWith")]
    UnionWith(UnionWithSpec),
    #[serde(rename = "$set")]
    Set(Value),
    #[serde(rename = "$unset")]
    Unset(UnsetSpec),
    #[serde(rename = "$merge")]
    Merge(MergeSpec),
    #[serde(rename = "$graphLookup")]
    GraphLookup(GraphLookupSpec),
    #[serde(rename = "$bucket")]
    Bucket(BucketSpec),
    #[serde(rename = "$bucketAuto")]
    BucketAuto(BucketAutoSpec),
    #[serde(rename = "$redact")]
    Redact(Value),
}

/// Specification for a `$lookup` left-outer join with another collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupSpec {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_field: Option<String>,
    #[serde(rename = "as")]
    pub as_field: String,
    #[serde(rename = "let", default, skip_serializing_if = "Option::is_none")]
    pub let_vars: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<Stage>>,
}

impl LookupSpec {
    /// Create a lookup spec joining `from` into the `as_field` output array.
    pub fn new(from: impl Into<String>, as_field: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            local_field: None,
            foreign_field: None,
            as_field: as_field.into(),
            let_vars: None,
            pipeline: None,
        }
    }

    /// Match `local_field` in the input documents against `foreign_field`
    /// in the joined collection.
    pub fn on_fields(
        mut self,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        self.local_field = Some(local_field.into());
        self.foreign_field = Some(foreign_field.into());
        self
    }

    /// Bind variables for use in a correlated sub-pipeline.
    pub fn let_vars(mut self, vars: Map<String, Value>) -> Self {
        self.let_vars = Some(vars);
        self
    }

    /// Run a sub-pipeline on the joined collection.
    pub fn pipeline(mut self, stages: Vec<Stage>) -> Self {
        self.pipeline = Some(stages);
        self
    }
}

/// Sort direction for a single `$sort` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl Serialize for SortOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SortOrder::Ascending => serializer.serialize_i32(1),
            SortOrder::Descending => serializer.serialize_i32(-1),
        }
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i64::deserialize(deserializer)? {
            1 => Ok(SortOrder::Ascending),
            -1 => Ok(SortOrder::Descending),
            other => Err(serde::de::Error::custom(format!(
                "sort order must be 1 or -1, got {other}"
            ))),
        }
    }
}

/// Ordered `$sort` specification. Key order is preserved because the server
/// sorts by the keys in the order they appear.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Map<String, Value>);

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sort key.
    pub fn field(mut self, name: impl Into<String>, order: SortOrder) -> Self {
        let direction = match order {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        };
        self.0.insert(name.into(), Value::from(direction));
        self
    }

    pub fn ascending(self, name: impl Into<String>) -> Self {
        self.field(name, SortOrder::Ascending)
    }

    pub fn descending(self, name: impl Into<String>) -> Self {
        self.field(name, SortOrder::Descending)
    }
}

/// Specification for a `$unwind` array-expansion stage.
///
/// A bare path string converts into a spec with only `path` set, so the
/// string shorthand and the structured form produce identical descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnwindSpec {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_array_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_null_and_empty_arrays: Option<bool>,
}

impl UnwindSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            include_array_index: None,
            preserve_null_and_empty_arrays: None,
        }
    }

    pub fn include_array_index(mut self, field: impl Into<String>) -> Self {
        self.include_array_index = Some(field.into());
        self
    }

    pub fn preserve_null_and_empty_arrays(mut self, preserve: bool) -> Self {
        self.preserve_null_and_empty_arrays = Some(preserve);
        self
    }
}

impl From<&str> for UnwindSpec {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for UnwindSpec {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// Specification for a `$replaceRoot` document-replacement stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRootSpec {
    pub new_root: Value,
}

impl ReplaceRootSpec {
    pub fn new(new_root: impl Into<Value>) -> Self {
        Self {
            new_root: new_root.into(),
        }
    }
}

/// Specification for a `$unionWith` stage combining another collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionWithSpec {
    pub coll: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<Stage>>,
}

impl UnionWithSpec {
    pub fn new(coll: impl Into<String>) -> Self {
        Self {
            coll: coll.into(),
            pipeline: None,
        }
    }

    pub fn pipeline(mut self, stages: Vec<Stage>) -> Self {
        self.pipeline = Some(stages);
        self
    }
}

/// Field list for a `$unset` stage: a single path or a list of paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnsetSpec {
    Field(String),
    Fields(Vec<String>),
}

impl From<&str> for UnsetSpec {
    fn from(field: &str) -> Self {
        UnsetSpec::Field(field.to_string())
    }
}

impl From<String> for UnsetSpec {
    fn from(field: String) -> Self {
        UnsetSpec::Field(field)
    }
}

impl From<Vec<String>> for UnsetSpec {
    fn from(fields: Vec<String>) -> Self {
        UnsetSpec::Fields(fields)
    }
}

impl From<Vec<&str>> for UnsetSpec {
    fn from(fields: Vec<&str>) -> Self {
        UnsetSpec::Fields(fields.into_iter().map(String::from).collect())
    }
}

/// Join key(s) for a `$merge` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergeOn {
    Field(String),
    Fields(Vec<String>),
}

/// Action taken by `$merge` when an output document matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhenMatched {
    Replace,
    KeepExisting,
    Merge,
    Fail,
    Pipeline,
}

/// Action taken by `$merge` when no output document matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhenNotMatched {
    Insert,
    Discard,
    Fail,
}

/// Specification for a `$merge` stage writing results into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSpec {
    pub into: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<MergeOn>,
    #[serde(rename = "let", default, skip_serializing_if = "Option::is_none")]
    pub let_vars: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_matched: Option<WhenMatched>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_not_matched: Option<WhenNotMatched>,
}

impl MergeSpec {
    pub fn new(into: impl Into<String>) -> Self {
        Self {
            into: into.into(),
            on: None,
            let_vars: None,
            when_matched: None,
            when_not_matched: None,
        }
    }

    pub fn on(mut self, on: MergeOn) -> Self {
        self.on = Some(on);
        self
    }

    pub fn when_matched(mut self, action: WhenMatched) -> Self {
        self.when_matched = Some(action);
        self
    }

    pub fn when_not_matched(mut self, action: WhenNotMatched) -> Self {
        self.when_not_matched = Some(action);
        self
    }
}

/// Specification for a `$graphLookup` recursive traversal stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLookupSpec {
    pub from: String,
    pub start_with: Value,
    pub connect_from_field: String,
    pub connect_to_field: String,
    #[serde(rename = "as")]
    pub as_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrict_search_with_match: Option<Value>,
}

/// Specification for a `$bucket` stage grouping documents by boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    pub group_by: Value,
    pub boundaries: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

/// Specification for a `$bucketAuto` stage with server-chosen boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketAutoSpec {
    pub group_by: Value,
    pub buckets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
}

/// Create a `$match` stage filtering documents.
pub fn match_stage(filter: Value) -> Stage {
    Stage::Match(filter)
}

/// Create a `$lookup` stage performing a left outer join.
pub fn lookup_stage(spec: LookupSpec) -> Stage {
    Stage::Lookup(spec)
}

/// Create a `$group` stage.
pub fn group_stage(spec: Value) -> Stage {
    Stage::Group(spec)
}

/// Create a `$addFields` stage adding computed fields.
pub fn add_fields_stage(spec: Value) -> Stage {
    Stage::AddFields(spec)
}

/// Create a `$project` stage reshaping the output document.
pub fn project_stage(spec: Value) -> Stage {
    Stage::Project(spec)
}

/// Create a `$sort` stage.
pub fn sort_stage(spec: SortSpec) -> Stage {
    Stage::Sort(spec)
}

/// Create a `$skip` stage.
pub fn skip_stage(count: u64) -> Stage {
    Stage::Skip(count)
}

/// Create a `$limit` stage.
pub fn limit_stage(count: u64) -> Stage {
    Stage::Limit(count)
}

/// Create a `$facet` stage running several sub-pipelines over the same input.
pub fn facet_stage(spec: Value) -> Stage {
    Stage::Facet(spec)
}

/// Create a `$unwind` stage. Accepts a bare path string as shorthand for a
/// spec with only `path` set.
pub fn unwind_stage(spec: impl Into<UnwindSpec>) -> Stage {
    Stage::Unwind(spec.into())
}

/// Create a `$replaceRoot` stage.
pub fn replace_root_stage(spec: ReplaceRootSpec) -> Stage {
    Stage::ReplaceRoot(spec)
}

/// Create a `$count` stage writing the document count into `field`.
pub fn count_stage(field: impl Into<String>) -> Stage {
    Stage::Count(field.into())
}

/// Create a `$unionWith` stage.
pub fn union_with_stage(spec: UnionWithSpec) -> Stage {
    Stage::UnionWith(spec)
}

/// Create a `$set` stage. `$set` is the server's alias of `$addFields`.
pub fn set_stage(spec: Value) -> Stage {
    Stage::Set(spec)
}

/// Create a `$unset` stage removing one or more fields.
pub fn unset_stage(fields: impl Into<UnsetSpec>) -> Stage {
    Stage::Unset(fields.into())
}

/// Create a `$merge` stage.
pub fn merge_stage(spec: MergeSpec) -> Stage {
    Stage::Merge(spec)
}

/// Create a `$graphLookup` stage.
pub fn graph_lookup_stage(spec: GraphLookupSpec) -> Stage {
    Stage::GraphLookup(spec)
}

/// Create a `$bucket` stage.
pub fn bucket_stage(spec: BucketSpec) -> Stage {
    Stage::Bucket(spec)
}

/// Create a `$bucketAuto` stage.
pub fn bucket_auto_stage(spec: BucketAutoSpec) -> Stage {
    Stage::BucketAuto(spec)
}

/// Create a `$redact` stage.
pub fn redact_stage(spec: Value) -> Stage {
    Stage::Redact(spec)
}
