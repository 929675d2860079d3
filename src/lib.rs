//! covidstats library
//!
//! Fetches monthly COVID-19 totals, caches them as JSON, and analyzes the
//! cached months. Exposed as a library for integration tests.

pub mod analysis;
pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod pipeline;
pub mod report;
pub mod ui;
