// src/shapes.rs

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use thiserror::Error;
use tracing::{info, warn};
use zip::ZipArchive;

use crate::config::ShapeSource;

/// Natural Earth publishes its datasets as zip archives under one bucket.
pub const NATURAL_EARTH_BASE: &str = "https://naturalearth.s3.amazonaws.com";

/// Sidecar files that make up one ESRI shapefile dataset.
const SHAPEFILE_PARTS: &[&str] = &["shp", "shx", "dbf", "prj", "cpg"];

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("GET {url}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unpacking {archive}")]
    Unpack {
        archive: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("archive {archive} holds no {stem}.shp member")]
    MissingShp { archive: String, stem: String },
    #[error("reading shapefile {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One named region boundary: polygon rings of (lon, lat) degree pairs.
/// Outer and inner (hole) rings are kept flat; the renderer separates them
/// again with an even-odd fill.
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl ShapeSource {
    /// Dataset file stem, e.g. `ne_110m_admin_1_states_provinces_lakes`.
    pub fn stem(&self) -> String {
        format!("ne_{}_{}", self.resolution, self.name)
    }

    pub fn archive_url(&self) -> String {
        format!(
            "{NATURAL_EARTH_BASE}/{}_{}/{}.zip",
            self.resolution,
            self.category,
            self.stem()
        )
    }
}

/// Resolve a Natural Earth dataset to a local `.shp` path, downloading and
/// unpacking the archive into `cache_dir` on first use. A cached `.shp`
/// short-circuits the network entirely.
pub fn natural_earth(
    client: &Client,
    source: &ShapeSource,
    cache_dir: &Path,
) -> Result<PathBuf, ShapeError> {
    let stem = source.stem();
    let shp_path = cache_dir.join(format!("{stem}.shp"));
    if shp_path.exists() {
        info!(path = %shp_path.display(), "shapefile cache hit");
        return Ok(shp_path);
    }

    fs::create_dir_all(cache_dir)?;
    let url = source.archive_url();
    info!(%url, "downloading shapefile archive");

    // Stage the download in an unlinked temp file, then unpack from it.
    let mut staged = tempfile::tempfile()?;
    client
        .get(&url)
        .send()
        .and_then(|resp| resp.error_for_status())
        .and_then(|mut resp| resp.copy_to(&mut staged))
        .map_err(|source| ShapeError::Download {
            url: url.clone(),
            source,
        })?;
    staged.seek(SeekFrom::Start(0))?;

    unpack_sidecars(staged, &url, &stem, cache_dir)?;

    if !shp_path.exists() {
        return Err(ShapeError::MissingShp {
            archive: url,
            stem,
        });
    }
    Ok(shp_path)
}

/// Extract the dataset's sidecar files into `cache_dir`, flattening any
/// directory prefix the archive may carry.
fn unpack_sidecars(
    archive_file: File,
    url: &str,
    stem: &str,
    cache_dir: &Path,
) -> Result<(), ShapeError> {
    let unpack_err = |source| ShapeError::Unpack {
        archive: url.to_string(),
        source,
    };
    let mut archive = ZipArchive::new(archive_file).map_err(unpack_err)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(unpack_err)?;
        let Some(file_name) = Path::new(entry.name())
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        let member = Path::new(&file_name);
        let stem_matches = member
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s == stem);
        let part_matches = member
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SHAPEFILE_PARTS.contains(&e.to_ascii_lowercase().as_str()));
        if !(stem_matches && part_matches) {
            continue;
        }
        let dest = cache_dir.join(&file_name);
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;
        info!(member = %file_name, "unpacked");
    }
    Ok(())
}

/// Read polygon records and their name attribute. Non-polygon shapes and
/// records without a usable name are skipped with a warning, never fatal.
pub fn read_shape_records(path: &Path, name_field: &str) -> Result<Vec<ShapeRecord>, ShapeError> {
    let read_err = |source| ShapeError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = shapefile::Reader::from_path(path).map_err(read_err)?;

    let mut records = Vec::new();
    for entry in reader.iter_shapes_and_records() {
        let (shape, record) = entry.map_err(read_err)?;
        let polygon = match shape {
            shapefile::Shape::Polygon(p) => p,
            other => {
                warn!(kind = ?other.shapetype(), "skipping non-polygon shape");
                continue;
            }
        };
        let name = match record.get(name_field) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) if !s.trim().is_empty() => {
                s.trim().to_string()
            }
            _ => {
                warn!(field = name_field, "skipping shape record without a usable name");
                continue;
            }
        };
        let rings = polygon
            .rings()
            .iter()
            .map(|ring| ring.points().iter().map(|p| (p.x, p.y)).collect())
            .collect();
        records.push(ShapeRecord { name, rings });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_url_matches_published_layout() {
        let source = ShapeSource::default();
        assert_eq!(
            source.archive_url(),
            "https://naturalearth.s3.amazonaws.com/110m_cultural/ne_110m_admin_1_states_provinces_lakes.zip"
        );
        assert_eq!(source.stem(), "ne_110m_admin_1_states_provinces_lakes");
    }

    #[test]
    fn cached_shp_short_circuits_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let source = ShapeSource::default();
        let cached = dir.path().join(format!("{}.shp", source.stem()));
        fs::write(&cached, b"stub").unwrap();

        // A cache hit must return before the client is ever used.
        let client = Client::new();
        let resolved = natural_earth(&client, &source, dir.path()).unwrap();
        assert_eq!(resolved, cached);
    }

    #[test]
    fn unreadable_shapefile_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere.shp");
        assert!(read_shape_records(&missing, "name").is_err());
    }
}
