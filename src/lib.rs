// Export modules for library usage
pub mod errors;
pub mod filter;
pub mod pipeline;
pub mod populate;

// Re-export commonly used types
pub use crate::errors::PopulateError;
pub use crate::filter::{filter, FilterOperator};
pub use crate::pipeline::builder::{PipelineBuilder, Untyped};
pub use crate::pipeline::stage::{
    add_fields_stage, bucket_auto_stage, bucket_stage, count_stage, facet_stage, graph_lookup_stage,
    group_stage, limit_stage, lookup_stage, match_stage, merge_stage, project_stage, redact_stage,
    replace_root_stage, set_stage, skip_stage, sort_stage, union_with_stage, unset_stage,
    unwind_stage, BucketAutoSpec, BucketSpec, GraphLookupSpec, LookupSpec, MergeOn, MergeSpec,
    ReplaceRootSpec, SortOrder, SortSpec, Stage, UnionWithSpec, UnsetSpec, UnwindSpec, WhenMatched,
    WhenNotMatched,
};
pub use crate::populate::{
    Cardinality, ReferenceResolver, ReferenceSpec, DEFAULT_METADATA_FIELD,
};
