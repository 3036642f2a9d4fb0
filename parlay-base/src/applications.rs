//! Ready-made computation graphs for concrete multi-party applications.
pub mod betting;
