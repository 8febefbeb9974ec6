//! doclabel - turn OCR output for PDF pages into annotation-tool datasets.
//!
//! Core library: domain model, geometry normalization, dataset assembly and
//! writing, configuration, and conversion of exported annotations into a
//! columnar training set. Collaborators that spawn processes (rasterizer,
//! OCR engines, servers) live in the sibling crates.

// Enum types use inherent `from_str` methods returning Option, not FromStr.
#![allow(clippy::should_implement_trait)]

pub mod config;
pub mod convert;
pub mod dataset;
pub mod geometry;
pub mod models;
pub mod utils;
