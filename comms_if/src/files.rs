//! # Field files
//!
//! File formats used to persist a field between sessions:
//!
//! - Boundary file (JSON): the outer boundary ring as a list of `[easting, northing]` pairs.
//! - Headland file (JSON): the ordered headland points with their tangent headings, plus the
//!   distance the headland was offset from the boundary.
//! - Track file (CSV): one track per line, `name, heading_deg, a_e, a_n[, b_e, b_n]`. When the B
//!   point is missing it is placed [`DEFAULT_B_DISTANCE_M`] along the heading from A.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Distance from A at which a missing B point is placed.
pub const DEFAULT_B_DISTANCE_M: f64 = 100.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The outer boundary of a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundaryFile {
    /// Ring vertices as `[easting_m, northing_m]`, the closing vertex is not repeated.
    pub points: Vec<[f64; 2]>,
}

/// A single persisted headland point.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadlandFilePoint {
    pub easting_m: f64,
    pub northing_m: f64,
    pub heading_rad: f64,
}

/// A persisted headland.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeadlandFile {
    /// Distance the headland was offset inwards from the boundary.
    pub move_distance_m: f64,

    /// Whether the points form a closed ring (true) or an open clipped polyline (false).
    #[serde(default = "default_closed")]
    pub closed: bool,

    pub points: Vec<HeadlandFilePoint>,
}

/// A single track (AB line) record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackRecord {
    pub name: String,
    pub heading_deg: f64,
    pub a_e: f64,
    pub a_n: f64,
    pub b_e: f64,
    pub b_n: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FileError {
    #[error("Could not access the file: {0}")]
    Io(io::Error),

    #[error("Invalid JSON: {0}")]
    Json(serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(csv::Error),

    #[error("Track record on line {0} has {1} fields, expected 4 or 6")]
    WrongFieldCount(u64, usize),

    #[error("Track record on line {0} has an invalid number: {1:?}")]
    InvalidNumber(u64, String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BoundaryFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        load_json(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FileError> {
        save_json(self, path)
    }
}

impl HeadlandFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        load_json(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FileError> {
        save_json(self, path)
    }
}

impl TrackRecord {
    /// Read all tracks from a CSV string.
    pub fn read_all(csv_str: &str) -> Result<Vec<Self>, FileError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(csv_str.as_bytes());

        let mut tracks = Vec::new();

        for result in reader.records() {
            let record = result.map_err(FileError::Csv)?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() != 4 && record.len() != 6 {
                return Err(FileError::WrongFieldCount(line, record.len()));
            }

            let num = |i: usize| -> Result<f64, FileError> {
                let s = record.get(i).unwrap_or("");
                s.parse::<f64>()
                    .map_err(|_| FileError::InvalidNumber(line, s.to_string()))
            };

            let heading_deg = num(1)?;
            let a_e = num(2)?;
            let a_n = num(3)?;

            let (b_e, b_n) = if record.len() == 6 {
                (num(4)?, num(5)?)
            } else {
                let h = heading_deg.to_radians();
                (
                    a_e + DEFAULT_B_DISTANCE_M * h.sin(),
                    a_n + DEFAULT_B_DISTANCE_M * h.cos(),
                )
            };

            tracks.push(TrackRecord {
                name: record.get(0).unwrap_or("").to_string(),
                heading_deg,
                a_e,
                a_n,
                b_e,
                b_n,
            });
        }

        Ok(tracks)
    }

    /// Load all tracks from a CSV file.
    pub fn load_all<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, FileError> {
        let s = fs::read_to_string(path).map_err(FileError::Io)?;
        Self::read_all(&s)
    }

    /// Write all tracks as CSV, always including the B point.
    pub fn write_all(tracks: &[Self]) -> Result<String, FileError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);

        for t in tracks {
            writer
                .write_record(&[
                    t.name.clone(),
                    format!("{}", t.heading_deg),
                    format!("{}", t.a_e),
                    format!("{}", t.a_n),
                    format!("{}", t.b_e),
                    format!("{}", t.b_n),
                ])
                .map_err(FileError::Csv)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| FileError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Save all tracks to a CSV file.
    pub fn save_all<P: AsRef<Path>>(tracks: &[Self], path: P) -> Result<(), FileError> {
        fs::write(path, Self::write_all(tracks)?).map_err(FileError::Io)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_closed() -> bool {
    true
}

fn load_json<T, P>(path: P) -> Result<T, FileError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let s = fs::read_to_string(path).map_err(FileError::Io)?;
    serde_json::from_str(&s).map_err(FileError::Json)
}

fn save_json<T, P>(data: &T, path: P) -> Result<(), FileError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = serde_json::to_string_pretty(data).map_err(FileError::Json)?;
    fs::write(path, json).map_err(FileError::Io)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_tracks() {
        let csv = "\
# name, heading, A, B
north, 0, 10, 20, 10, 120
east line, 90, 0.5, 0
";
        let tracks = TrackRecord::read_all(csv).unwrap();
        assert_eq!(tracks.len(), 2);

        assert_eq!(tracks[0].name, "north");
        assert_eq!(tracks[0].b_n, 120.0);

        // Missing B is placed along the heading
        assert_eq!(tracks[1].name, "east line");
        assert!((tracks[1].b_e - 100.5).abs() < 1e-9);
        assert!(tracks[1].b_n.abs() < 1e-9);
    }

    #[test]
    fn test_read_bad_tracks() {
        assert!(matches!(
            TrackRecord::read_all("a, 0, 1\n"),
            Err(FileError::WrongFieldCount(_, 3))
        ));
        assert!(matches!(
            TrackRecord::read_all("a, zero, 1, 2\n"),
            Err(FileError::InvalidNumber(_, _))
        ));
    }

    #[test]
    fn test_write_tracks() {
        let tracks = vec![TrackRecord {
            name: "t1".into(),
            heading_deg: 45.0,
            a_e: 1.0,
            a_n: 2.0,
            b_e: 3.0,
            b_n: 4.0,
        }];
        let s = TrackRecord::write_all(&tracks).unwrap();
        assert_eq!(s, "t1,45,1,2,3,4\n");
        assert_eq!(TrackRecord::read_all(&s).unwrap(), tracks);
    }

    #[test]
    fn test_headland_json_defaults() {
        let json = r#"{"move_distance_m": 12.0, "points": [
            {"easting_m": 1.0, "northing_m": 2.0, "heading_rad": 0.0}
        ]}"#;
        let file: HeadlandFile = serde_json::from_str(json).unwrap();
        assert!(file.closed);
        assert_eq!(file.points.len(), 1);
        assert_eq!(file.move_distance_m, 12.0);
    }
}
