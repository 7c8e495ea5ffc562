//! Pure construction layer for aggregation pipelines.
//!
//! Stage factories wrap operator payloads into tagged descriptors; the
//! builder sequences them while tracking the document shape at the type
//! level. Nothing in this module performs I/O or talks to a server.

pub mod builder;
pub mod stage;
