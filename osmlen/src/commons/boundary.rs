use std::path::{Path, PathBuf};

use geo::Geometry;
use geojson::GeoJson;
use tracing::debug;
use wkt::TryFromWkt;

use crate::error::{Error, Result};
use crate::geo_core::Shape;

/// Parse a WKT Polygon or MultiPolygon.
pub fn parse_wkt(text: &str) -> Result<Shape> {
    let geometry = Geometry::<f64>::try_from_wkt_str(text.trim()).map_err(|e| Error::InvalidWkt(e.to_string()))?;
    Shape::try_from(geometry)
}

/// Parse a GeoJSON geometry, feature or feature collection.
/// Polygonal members of a collection are merged into one MultiPolygon.
pub fn parse_geojson(text: &str) -> Result<Shape> {
    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| Error::InvalidGeoJson(e.to_string()))?;
    let geometry = Geometry::<f64>::try_from(geojson).map_err(|e| Error::InvalidGeoJson(e.to_string()))?;
    Shape::try_from(geometry)
}

/// Read a boundary file: GeoJSON for `.geojson`/`.json`, WKT otherwise.
pub fn read_boundary(path: &Path) -> Result<Shape> {
    let text = std::fs::read_to_string(path)?;
    let is_geojson = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("geojson") | Some("json")
    );
    debug!(path = %path.display(), is_geojson, "reading boundary");
    if is_geojson {
        parse_geojson(&text)
    } else {
        parse_wkt(&text)
    }
}

/// Directory of named boundaries, one file per region.
#[derive(Debug, Clone)]
pub struct BoundaryStore {
    dir: PathBuf,
}

impl BoundaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        BoundaryStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<name>.txt`, falling back to `.geojson` or `.json` when only those exist.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let wkt = self.dir.join(format!("{name}.txt"));
        if wkt.exists() {
            return wkt;
        }
        ["geojson", "json"]
            .iter()
            .map(|ext| self.dir.join(format!("{name}.{ext}")))
            .find(|path| path.exists())
            .unwrap_or(wkt)
    }

    pub fn load(&self, name: &str) -> Result<Shape> {
        read_boundary(&self.path_for(name))
    }
}
