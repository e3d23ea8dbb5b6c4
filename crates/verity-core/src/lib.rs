//! Core types and trait definitions for the Verity truth-scoring engine.
//!
//! This crate has no HTTP or database dependencies. It
//! holds the domain model, the storage and provider abstractions, and the
//! two pure algorithms the engine is built on: the append-only vector index
//! and union-find claim grouping.

pub mod article;
pub mod cluster;
pub mod error;
pub mod grouping;
pub mod index;
pub mod provider;
pub mod store;

pub use error::{Error, Result};
