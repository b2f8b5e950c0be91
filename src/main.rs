use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use coromap::{
    config::{Config, DEFAULT_CONFIG_PATH},
    extract, fetch, render,
    scale::LogScale,
    shapes,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load configuration ───────────────────────────────────────
    let config = Config::load(Path::new(DEFAULT_CONFIG_PATH))?;
    info!(
        source = %config.source_url,
        metric = %config.metric_column,
        rows = config.state_row_limit,
        "configured"
    );

    // ─── 3) fetch the case page ──────────────────────────────────────
    let client = fetch::http_client()?;
    let start = Instant::now();
    let html = fetch::fetch_page(&client, &config.source_url, &config.user_agent)
        .context("fetching case page")?;
    info!(elapsed = ?start.elapsed(), bytes = html.len(), "fetched case page");

    // ─── 4) extract the case table ───────────────────────────────────
    let table = extract::extract_table(&html, config.state_row_limit)
        .context("extracting case table")?;
    info!(rows = table.len(), "extracted case table");

    // ─── 5) color scale from the metric column ───────────────────────
    let scale = LogScale::from_table(&table, &config.metric_column)?;
    info!(min = scale.min(), max = scale.max(), "computed log color scale");

    // ─── 6) resolve state boundaries ─────────────────────────────────
    let shp = shapes::natural_earth(&client, &config.shape_source, &config.cache_dir)
        .context("resolving state boundary shapefile")?;
    let states = shapes::read_shape_records(&shp, &config.shape_name_field)?;
    info!(shapes = states.len(), "loaded state boundaries");

    // ─── 7) render + save ────────────────────────────────────────────
    let report = render::render_choropleth(
        &table,
        &scale,
        &states,
        &render::RenderOptions::from_config(&config),
    )?;
    render::save_png(&report.pixmap, &config.output_path)?;
    info!(
        path = %config.output_path.display(),
        misses = report.misses.len(),
        "wrote choropleth"
    );

    Ok(())
}
