//! Rasterization, OCR, and the dataset pipeline for doclabel.
//!
//! This crate holds everything that shells out to external tools or runs
//! inference; the pure dataset model lives in `doclabel`.

#![allow(clippy::should_implement_trait)]

pub mod ocr;
pub mod render;
pub mod services;
