//! File manager integration tests
//!
//! Covers listing, replace-vs-add accounting, quota enforcement,
//! normalization and the serialization of same-user mutations.

mod concurrency;
