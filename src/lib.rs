//! Choropleth map of US COVID-19 case counts per state.
//!
//! Single forward pipeline: fetch the case table from the source page,
//! extract it into a row-indexed table, build a logarithmic color scale from
//! one metric column, then join state boundary shapes against the table and
//! paint each match.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod render;
pub mod scale;
pub mod shapes;
