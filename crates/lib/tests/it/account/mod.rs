//! Account lifecycle integration tests

mod lifecycle;
