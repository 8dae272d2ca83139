//! Privilege reconciler integration tests

mod checks;
