// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Optional config file looked up next to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "coromap.yaml";

/// The source serves a cut-down page to clients that do not look like a
/// browser making an XHR, so both spoofed headers are required.
pub const DEFAULT_SOURCE_URL: &str = "https://www.worldometers.info/coronavirus/country/us/";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/50.0.2661.75 Safari/537.36";

/// Rows kept from the top of the source table. The page appends aggregate
/// rows (totals, territories, repatriated travellers) after the real states;
/// this cutoff drops them. Tied to the current page layout.
pub const DEFAULT_STATE_ROW_LIMIT: usize = 62;

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_metric_column() -> String {
    "TotalCases".to_string()
}

fn default_state_row_limit() -> usize {
    DEFAULT_STATE_ROW_LIMIT
}

fn default_shape_name_field() -> String {
    "name".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("shapes")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("usa-total-cases.png")
}

fn default_dpi() -> f64 {
    300.0
}

fn default_pad_inches() -> f64 {
    0.2
}

fn default_figure_size_in() -> [f64; 2] {
    [6.4, 4.8]
}

/// Geodetic viewport as [lon0, lon1, lat0, lat1]. Frames the continental US
/// plus the Alaska/Hawaii offsets.
fn default_extent() -> [f64; 4] {
    [-100.0, -160.0, 20.0, 100.0]
}

fn default_line_width_pt() -> f64 {
    0.05
}

/// Which Natural Earth dataset supplies the state polygons.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShapeSource {
    pub resolution: String,
    pub category: String,
    pub name: String,
}

impl Default for ShapeSource {
    fn default() -> Self {
        Self {
            resolution: "110m".to_string(),
            category: "cultural".to_string(),
            name: "admin_1_states_provinces_lakes".to_string(),
        }
    }
}

/// Lambert Conformal Conic parameters, in degrees.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectionParams {
    pub central_longitude: f64,
    pub central_latitude: f64,
    pub standard_parallels: [f64; 2],
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            central_longitude: -96.0,
            central_latitude: 39.0,
            standard_parallels: [33.0, 45.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source_url: String,
    pub user_agent: String,
    /// Table column the color scale is computed from.
    pub metric_column: String,
    pub state_row_limit: usize,
    pub shape_source: ShapeSource,
    /// Attribute on each shape record used as the join key into the table.
    pub shape_name_field: String,
    pub cache_dir: PathBuf,
    pub output_path: PathBuf,
    pub dpi: f64,
    pub pad_inches: f64,
    pub figure_size_in: [f64; 2],
    pub extent: [f64; 4],
    pub projection: ProjectionParams,
    pub line_width_pt: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            user_agent: default_user_agent(),
            metric_column: default_metric_column(),
            state_row_limit: default_state_row_limit(),
            shape_source: ShapeSource::default(),
            shape_name_field: default_shape_name_field(),
            cache_dir: default_cache_dir(),
            output_path: default_output_path(),
            dpi: default_dpi(),
            pad_inches: default_pad_inches(),
            figure_size_in: default_figure_size_in(),
            extent: default_extent(),
            projection: ProjectionParams::default(),
            line_width_pt: default_line_width_pt(),
        }
    }
}

impl Config {
    /// Load overrides from `path` if it exists, otherwise compiled defaults.
    /// A present-but-malformed file is an error, never silently ignored.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
