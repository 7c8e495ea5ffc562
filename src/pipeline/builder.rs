//! Fluent, shape-tracking pipeline composition.
//!
//! The builder uses a phantom type parameter to track the document shape
//! flowing between stages at compile time. Operations that preserve the shape
//! (filtering, sorting, pagination) return a builder of the same shape;
//! operations that change it (joins, grouping, reshaping) return a builder
//! parameterized by a caller-chosen new shape. The shape tag carries no data
//! and has zero runtime cost.

use super::stage::{
    add_fields_stage, bucket_auto_stage, bucket_stage, count_stage, facet_stage, graph_lookup_stage,
    group_stage, limit_stage, lookup_stage, match_stage, merge_stage, project_stage, redact_stage,
    replace_root_stage, set_stage, skip_stage, sort_stage, union_with_stage, unset_stage,
    unwind_stage, BucketAutoSpec, BucketSpec, GraphLookupSpec, LookupSpec, MergeSpec,
    ReplaceRootSpec, SortSpec, Stage, UnionWithSpec, UnsetSpec, UnwindSpec,
};
use im::Vector;
use serde_json::Value;
use std::marker::PhantomData;

/// Shape marker for pipelines whose document shape is not statically tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Untyped;

/// Builder for constructing aggregation pipelines.
///
/// Every operation, shape-preserving or shape-transforming, takes `&self` and
/// returns a new handle over a copy-extended persistent stage sequence. A
/// previously obtained handle or [`build`](Self::build) snapshot never
/// observes appends made through another handle, so handles are plain values
/// with no aliasing hazard.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = PipelineBuilder::new()
///     .match_(json!({"status": "active"}))
///     .sort(SortSpec::new().descending("createdAt"))
///     .limit(25)
///     .build();
/// ```
pub struct PipelineBuilder<Shape = Untyped> {
    stages: Vector<Stage>,
    _shape: PhantomData<fn() -> Shape>,
}

impl PipelineBuilder<Untyped> {
    /// Create a new empty pipeline builder.
    pub fn new() -> Self {
        Self {
            stages: Vector::new(),
            _shape: PhantomData,
        }
    }
}

impl Default for PipelineBuilder<Untyped> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Shape> Clone for PipelineBuilder<Shape> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
            _shape: PhantomData,
        }
    }
}

impl<Shape> PipelineBuilder<Shape> {
    /// Create a builder seeded with an initial stage sequence, e.g. the
    /// output of the reference resolver.
    pub fn from_stages(stages: impl IntoIterator<Item = Stage>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
            _shape: PhantomData,
        }
    }

    /// Build the final pipeline: a snapshot of the accumulated stages.
    pub fn build(&self) -> Vec<Stage> {
        self.stages.iter().cloned().collect()
    }

    /// Number of stages accumulated so far.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn appended(&self, stage: Stage) -> Vector<Stage> {
        let mut stages = self.stages.clone();
        stages.push_back(stage);
        stages
    }

    fn keep_shape(&self, stage: Stage) -> Self {
        Self {
            stages: self.appended(stage),
            _shape: PhantomData,
        }
    }

    fn new_shape<NewShape>(&self, stage: Stage) -> PipelineBuilder<NewShape> {
        PipelineBuilder {
            stages: self.appended(stage),
            _shape: PhantomData,
        }
    }

    /// Append an arbitrary caller-supplied stage, shape-preserving.
    pub fn raw(&self, stage: Stage) -> Self {
        self.keep_shape(stage)
    }

    /// Append a `$match` stage. Trailing underscore avoids the keyword.
    pub fn match_(&self, filter: Value) -> Self {
        self.keep_shape(match_stage(filter))
    }

    /// Append a `$sort` stage.
    pub fn sort(&self, spec: SortSpec) -> Self {
        self.keep_shape(sort_stage(spec))
    }

    /// Append a `$skip` stage.
    pub fn skip(&self, count: u64) -> Self {
        self.keep_shape(skip_stage(count))
    }

    /// Append a `$limit` stage.
    pub fn limit(&self, count: u64) -> Self {
        self.keep_shape(limit_stage(count))
    }

    /// Append a `$unionWith` stage.
    pub fn union_with(&self, spec: UnionWithSpec) -> Self {
        self.keep_shape(union_with_stage(spec))
    }

    /// Append a `$unset` stage removing fields.
    pub fn unset(&self, fields: impl Into<UnsetSpec>) -> Self {
        self.keep_shape(unset_stage(fields))
    }

    /// Append a `$merge` stage writing into an external collection.
    pub fn merge(&self, spec: MergeSpec) -> Self {
        self.keep_shape(merge_stage(spec))
    }

    /// Append a `$graphLookup` recursive traversal stage.
    pub fn graph_lookup(&self, spec: GraphLookupSpec) -> Self {
        self.keep_shape(graph_lookup_stage(spec))
    }

    /// Append a `$bucket` stage.
    pub fn bucket(&self, spec: BucketSpec) -> Self {
        self.keep_shape(bucket_stage(spec))
    }

    /// Append a `$bucketAuto` stage.
    pub fn bucket_auto(&self, spec: BucketAutoSpec) -> Self {
        self.keep_shape(bucket_auto_stage(spec))
    }

    /// Append a `$redact` stage.
    pub fn redact(&self, spec: Value) -> Self {
        self.keep_shape(redact_stage(spec))
    }

    /// Append a `$lookup` join. The joined field changes the document shape,
    /// so the returned builder is parameterized by the caller's new shape.
    pub fn lookup<NewShape>(&self, spec: LookupSpec) -> PipelineBuilder<NewShape> {
        self.new_shape(lookup_stage(spec))
    }

    /// Append a `$group` stage, replacing the document shape.
    pub fn group<NewShape>(&self, spec: Value) -> PipelineBuilder<NewShape> {
        self.new_shape(group_stage(spec))
    }

    /// Append a `$addFields` stage, extending the document shape.
    pub fn add_fields<NewShape>(&self, spec: Value) -> PipelineBuilder<NewShape> {
        self.new_shape(add_fields_stage(spec))
    }

    /// Append a `$set` stage, extending the document shape.
    pub fn set<NewShape>(&self, spec: Value) -> PipelineBuilder<NewShape> {
        self.new_shape(set_stage(spec))
    }

    /// Append a `$project` stage, replacing the document shape.
    pub fn project<NewShape>(&self, spec: Value) -> PipelineBuilder<NewShape> {
        self.new_shape(project_stage(spec))
    }

    /// Append a `$facet` stage, replacing the document shape.
    pub fn facet<NewShape>(&self, spec: Value) -> PipelineBuilder<NewShape> {
        self.new_shape(facet_stage(spec))
    }

    /// Append a `$unwind` stage, replacing the document shape.
    pub fn unwind<NewShape>(&self, spec: impl Into<UnwindSpec>) -> PipelineBuilder<NewShape> {
        self.new_shape(unwind_stage(spec))
    }

    /// Append a `$replaceRoot` stage, replacing the document shape.
    pub fn replace_root<NewShape>(&self, spec: ReplaceRootSpec) -> PipelineBuilder<NewShape> {
        self.new_shape(replace_root_stage(spec))
    }

    /// Append a `$count` stage, replacing the document shape with a single
    /// count field.
    pub fn count<NewShape>(&self, field: impl Into<String>) -> PipelineBuilder<NewShape> {
        self.new_shape(count_stage(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct WithUser;

    #[test]
    fn build_returns_stages_in_append_order() {
        let pipeline = PipelineBuilder::new()
            .match_(json!({"status": "active"}))
            .sort(SortSpec::new().ascending("name"))
            .limit(10)
            .build();

        assert_eq!(
            serde_json::to_value(&pipeline).unwrap(),
            json!([
                {"$match": {"status": "active"}},
                {"$sort": {"name": 1}},
                {"$limit": 10}
            ])
        );
    }

    #[test]
    fn transforming_call_extends_without_touching_prior_handle() {
        let base = PipelineBuilder::new().match_(json!({"tenantId": "t1"}));
        let joined: PipelineBuilder<WithUser> =
            base.lookup(LookupSpec::new("users", "user").on_fields("userId", "_id"));

        assert_eq!(joined.build().len(), base.build().len() + 1);

        // Appends through the new handle stay invisible to the old one and
        // vice versa.
        let extended = joined.limit(5);
        let rebased = base.skip(2);
        assert_eq!(base.build().len(), 1);
        assert_eq!(joined.build().len(), 2);
        assert_eq!(extended.build().len(), 3);
        assert_eq!(rebased.build().len(), 2);
    }

    #[test]
    fn preserving_call_copy_extends_instead_of_mutating() {
        let base = PipelineBuilder::new().match_(json!({"a": 1}));
        let snapshot = base.build();
        let _later = base.limit(1).skip(2);
        assert_eq!(base.build(), snapshot);
    }

    #[test]
    fn from_stages_seeds_initial_sequence() {
        let seed = vec![
            match_stage(json!({"status": "open"})),
            skip_stage(10),
        ];
        let pipeline = PipelineBuilder::<Untyped>::from_stages(seed.clone())
            .limit(5)
            .build();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline[..2], seed[..]);
    }

    #[test]
    fn raw_appends_caller_supplied_stage() {
        let stage = count_stage("total");
        let pipeline = PipelineBuilder::new().raw(stage.clone()).build();
        assert_eq!(pipeline, vec![stage]);
    }

    #[test]
    fn chained_shape_transforms_accumulate() {
        let pipeline = PipelineBuilder::new()
            .match_(json!({"conversationId": "c1"}))
            .lookup::<Untyped>(LookupSpec::new("users", "sender").on_fields("senderId", "_id"))
            .unwind::<Untyped>("$sender")
            .project::<Untyped>(json!({"sender.password": 0}))
            .build();
        assert_eq!(pipeline.len(), 4);
    }
}
