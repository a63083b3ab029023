//! Frame builders, in-memory service doubles and a runtime helper shared by the unit tests.
pub(crate) mod frames;
