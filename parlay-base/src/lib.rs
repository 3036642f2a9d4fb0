//! Parlay: an API for constructing the computation graph of a multi-party
//! betting program, to be compiled and executed by an external
//! secure-computation runtime.
#[macro_use]
pub mod errors;
pub mod applications;
mod constants;
pub mod data_types;
pub mod graphs;
pub mod parties;
#[doc(hidden)]
pub mod type_inference;
#[doc(hidden)]
pub mod version;

#[cfg(test)]
#[macro_use]
extern crate maplit;
