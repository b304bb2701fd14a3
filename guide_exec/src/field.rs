//! # Field store
//!
//! Holds the geometry of the current field: the outer boundary, the headland and the available
//! tracks. Readers take a [`FieldGeometry`] snapshot once per tick, which is a cheap `Arc` clone.
//! Writers build the replacement geometry off to the side and then swap it in whole, so a reader
//! never sees a half-built headland.
//!
//! Every swap that changes the headland or tracks queues the new value to the session's save
//! thread, in the same file formats [`FieldGeometry::load`] reads. Saving happens after the swap
//! and never blocks the caller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use log::{info, warn};
use nalgebra::Vector2;
use thiserror::Error;

use crate::{
    headland::{
        self, clip_at_line, nearest_anchor, BoundaryAnchor, BoundaryRing, ClipMode,
        HeadlandError, HeadlandLine, JoinType,
    },
    track_guid::{GuidanceError, Track},
};
use comms_if::files::{BoundaryFile, FileError, HeadlandFile, TrackRecord};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

pub const BOUNDARY_FILE: &str = "boundary.json";
pub const HEADLAND_FILE: &str = "headland.json";
pub const TRACKS_FILE: &str = "tracks.csv";

/// Session-relative directory the field is saved into.
pub const FIELD_SAVE_DIR: &str = "field";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An immutable snapshot of the field.
#[derive(Debug, Clone, Default)]
pub struct FieldGeometry {
    pub boundary: Option<Arc<BoundaryRing>>,
    pub headland: Option<Arc<HeadlandLine>>,
    pub tracks: Arc<Vec<Track>>,
}

/// Shared owner of the field geometry.
#[derive(Debug, Default)]
pub struct FieldStore {
    geometry: Mutex<Arc<FieldGeometry>>,

    /// Serialises writers so that two edits cannot both start from the same snapshot
    write_lock: Mutex<()>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("No field boundary has been loaded")]
    NoBoundary,

    #[error("There is no headland")]
    NoHeadland,

    #[error(transparent)]
    Headland(#[from] HeadlandError),

    #[error("There is no track named {0:?}")]
    UnknownTrack(String),

    #[error("Invalid track: {0}")]
    Track(#[from] GuidanceError),

    #[error("Could not load a field file: {0}")]
    File(#[from] FileError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FieldGeometry {
    /// Load a field from a directory.
    ///
    /// `boundary.json` must exist. `headland.json` and `tracks.csv` are loaded if present.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, FieldError> {
        let dir = dir.as_ref();

        let boundary = BoundaryRing::from_file(&BoundaryFile::load(dir.join(BOUNDARY_FILE))?)?;

        let headland_path = dir.join(HEADLAND_FILE);
        let headland = match headland_path.exists() {
            true => Some(Arc::new(HeadlandLine::from_file(&HeadlandFile::load(
                headland_path,
            )?)?)),
            false => None,
        };

        let tracks_path = dir.join(TRACKS_FILE);
        let tracks = match tracks_path.exists() {
            true => TrackRecord::load_all(tracks_path)?
                .iter()
                .map(Track::from_record)
                .collect::<Result<Vec<_>, _>>()?,
            false => Vec::new(),
        };

        info!(
            "Loaded field from {:?}: {} boundary points, {}, {} track(s)",
            dir,
            boundary.len(),
            match headland {
                Some(ref h) => format!("headland of {} points", h.len()),
                None => "no headland".to_string(),
            },
            tracks.len()
        );

        Ok(Self {
            boundary: Some(Arc::new(boundary)),
            headland,
            tracks: Arc::new(tracks),
        })
    }

    /// Save the field into a directory, in the layout read by [`FieldGeometry::load`].
    ///
    /// A stale headland file is removed when the field has no headland.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<(), FieldError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(FileError::Io)?;

        if let Some(ref boundary) = self.boundary {
            boundary.to_file().save(dir.join(BOUNDARY_FILE))?;
        }

        let headland_path = dir.join(HEADLAND_FILE);
        match self.headland {
            Some(ref headland) => headland.to_file().save(headland_path)?,
            None if headland_path.exists() => {
                fs::remove_file(headland_path).map_err(FileError::Io)?
            }
            None => (),
        }

        TrackRecord::save_all(&self.track_records(), dir.join(TRACKS_FILE))?;

        info!("Field saved to {:?}", dir);

        Ok(())
    }

    fn track_records(&self) -> Vec<TrackRecord> {
        self.tracks.iter().map(Track::to_record).collect()
    }

    pub fn has_headland(&self) -> bool {
        self.headland.is_some()
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name() == name)
    }
}

impl FieldStore {
    pub fn new(geometry: FieldGeometry) -> Self {
        Self {
            geometry: Mutex::new(Arc::new(geometry)),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the current geometry.
    pub fn snapshot(&self) -> Arc<FieldGeometry> {
        self.geometry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the boundary. Any headland was built from the old boundary and is removed.
    pub fn set_boundary(&self, boundary: BoundaryRing) {
        let file = boundary.to_file();

        self.edit(|geom| {
            info!(
                "Boundary replaced, {} points, rev {}",
                boundary.len(),
                boundary.revision()
            );
            if geom.headland.is_some() {
                warn!("Headland removed as it belonged to the previous boundary");
            }

            Ok(FieldGeometry {
                boundary: Some(Arc::new(boundary)),
                headland: None,
                ..geom.clone()
            })
        })
        .ok();

        util::session::save(Path::new(FIELD_SAVE_DIR).join(BOUNDARY_FILE), file);
    }

    /// Add a track, replacing any track with the same name. Returns the number of tracks.
    pub fn add_track(&self, track: Track) -> Result<usize, FieldError> {
        let mut csv = String::new();
        let mut num_tracks = 0;

        self.edit(|geom| {
            let mut tracks: Vec<Track> = geom
                .tracks
                .iter()
                .filter(|t| t.name() != track.name())
                .cloned()
                .collect();
            tracks.push(track);

            let new_geom = FieldGeometry {
                tracks: Arc::new(tracks),
                ..geom.clone()
            };

            csv = TrackRecord::write_all(&new_geom.track_records())?;
            num_tracks = new_geom.tracks.len();

            Ok(new_geom)
        })?;

        util::session::save_text(Path::new(FIELD_SAVE_DIR).join(TRACKS_FILE), csv);

        Ok(num_tracks)
    }

    /// Build the headland by offsetting the boundary inwards.
    ///
    /// On failure the existing headland is kept.
    pub fn build_headland(
        &self,
        distance_m: f64,
        join: JoinType,
    ) -> Result<Arc<HeadlandLine>, FieldError> {
        self.swap_headland(|geom| {
            let boundary = geom.boundary.as_ref().ok_or(FieldError::NoBoundary)?;
            Ok(headland::build_headland(boundary, distance_m, join)?)
        })
    }

    /// Snap a point onto the current headland ring.
    pub fn snap_to_headland(&self, point_m: &Vector2<f64>) -> Result<BoundaryAnchor, FieldError> {
        let geom = self.snapshot();
        let ring = geom
            .headland
            .as_ref()
            .ok_or(FieldError::NoHeadland)?
            .as_ring()?;

        Ok(nearest_anchor(&ring, point_m))
    }

    /// Clip the closed headland along the line through two anchors made against it.
    ///
    /// Anchors made against an earlier headland are rejected and the headland is left as it was.
    pub fn clip_headland(
        &self,
        anchor_1: &BoundaryAnchor,
        anchor_2: &BoundaryAnchor,
        mode: ClipMode,
    ) -> Result<Arc<HeadlandLine>, FieldError> {
        self.swap_headland(|geom| {
            let current = geom.headland.as_ref().ok_or(FieldError::NoHeadland)?;
            let ring = current.as_ring()?;
            let points = clip_at_line(&ring, anchor_1, anchor_2, mode)?;

            Ok(HeadlandLine::new_open(&points, current.move_distance_m())?)
        })
    }

    pub fn clear_headland(&self) {
        self.edit(|geom| {
            Ok(FieldGeometry {
                headland: None,
                ..geom.clone()
            })
        })
        .ok();
        info!("Headland cleared");
    }

    /// Build a new headland from the current geometry, swap it in and queue it for saving.
    fn swap_headland<F>(&self, build: F) -> Result<Arc<HeadlandLine>, FieldError>
    where
        F: FnOnce(&FieldGeometry) -> Result<HeadlandLine, FieldError>,
    {
        let mut built = None;

        self.edit(|geom| {
            let line = Arc::new(build(geom)?);
            built = Some(line.clone());

            Ok(FieldGeometry {
                headland: Some(line),
                ..geom.clone()
            })
        })?;

        let line = built.ok_or(FieldError::NoHeadland)?;

        info!(
            "Headland swapped in: {} points, {}, {:.1} m long, rev {}",
            line.len(),
            if line.is_closed() { "closed" } else { "open" },
            line.length_m(),
            line.revision()
        );

        util::session::save(Path::new(FIELD_SAVE_DIR).join(HEADLAND_FILE), line.to_file());

        Ok(line)
    }

    fn edit<F>(&self, f: F) -> Result<(), FieldError>
    where
        F: FnOnce(&FieldGeometry) -> Result<FieldGeometry, FieldError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let new_geom = f(&self.snapshot())?;

        *self
            .geometry
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(new_geom);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom;
    use approx::assert_relative_eq;

    fn square_store() -> FieldStore {
        let store = FieldStore::default();
        store.set_boundary(
            BoundaryRing::new(vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(100.0, 0.0),
                Vector2::new(100.0, 100.0),
                Vector2::new(0.0, 100.0),
            ])
            .unwrap(),
        );
        store
    }

    #[test]
    fn test_build_and_snapshot() {
        let store = square_store();
        let before = store.snapshot();
        assert!(!before.has_headland());

        let line = store.build_headland(10.0, JoinType::Miter).unwrap();
        assert!(line.is_closed());
        assert_relative_eq!(line.length_m(), 320.0, epsilon = 1e-9);

        // Old snapshots are untouched by the swap
        assert!(!before.has_headland());
        assert!(store.snapshot().has_headland());
    }

    #[test]
    fn test_failed_build_keeps_headland() {
        let store = FieldStore::default();
        assert!(matches!(
            store.build_headland(10.0, JoinType::Round),
            Err(FieldError::NoBoundary)
        ));

        let store = square_store();
        let first = store.build_headland(10.0, JoinType::Miter).unwrap();

        assert!(matches!(
            store.build_headland(60.0, JoinType::Miter),
            Err(FieldError::Headland(_))
        ));
        let kept = store.snapshot().headland.clone().unwrap();
        assert_eq!(kept.revision(), first.revision());
    }

    #[test]
    fn test_snap_and_clip() {
        let store = square_store();
        store.build_headland(10.0, JoinType::Miter).unwrap();

        let a1 = store.snap_to_headland(&Vector2::new(30.0, 5.0)).unwrap();
        let a2 = store.snap_to_headland(&Vector2::new(95.0, 50.0)).unwrap();
        assert_relative_eq!(a1.position_m, Vector2::new(30.0, 10.0), epsilon = 1e-9);

        let line = store.clip_headland(&a1, &a2, ClipMode::Line).unwrap();
        assert!(!line.is_closed());
        assert_eq!(line.move_distance_m(), 10.0);
        assert_relative_eq!(
            geom::polyline_length(&line.positions(), false),
            100.0,
            epsilon = 1e-9
        );

        // An open headland cannot be clipped again
        assert!(matches!(
            store.snap_to_headland(&Vector2::new(30.0, 5.0)),
            Err(FieldError::Headland(HeadlandError::NotClosed))
        ));
    }

    #[test]
    fn test_stale_anchor_after_rebuild() {
        let store = square_store();
        store.build_headland(10.0, JoinType::Miter).unwrap();

        let a1 = store.snap_to_headland(&Vector2::new(30.0, 5.0)).unwrap();
        let a2 = store.snap_to_headland(&Vector2::new(95.0, 50.0)).unwrap();

        let rebuilt = store.build_headland(12.0, JoinType::Miter).unwrap();

        assert!(matches!(
            store.clip_headland(&a1, &a2, ClipMode::Curve),
            Err(FieldError::Headland(HeadlandError::StaleAnchor { .. }))
        ));

        let kept = store.snapshot().headland.clone().unwrap();
        assert_eq!(kept.revision(), rebuilt.revision());
        assert!(kept.is_closed());
    }

    #[test]
    fn test_boundary_replacement_clears_headland() {
        let store = square_store();
        store.build_headland(10.0, JoinType::Round).unwrap();
        assert!(store.snapshot().has_headland());

        let old_rev = store.snapshot().boundary.as_ref().unwrap().revision();

        store.set_boundary(
            BoundaryRing::new(vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(50.0, 0.0),
                Vector2::new(50.0, 50.0),
            ])
            .unwrap(),
        );
        assert!(!store.snapshot().has_headland());
        assert_ne!(store.snapshot().boundary.as_ref().unwrap().revision(), old_rev);

        store.clear_headland();
        assert!(store.snapshot().boundary.is_some());
    }

    #[test]
    fn test_add_track() {
        let store = square_store();
        let north =
            |x: f64| Track::new("north", Vector2::new(x, 0.0), Vector2::new(x, 100.0)).unwrap();
        let east = Track::new("east", Vector2::new(0.0, 20.0), Vector2::new(1.0, 20.0)).unwrap();

        assert_eq!(store.add_track(north(50.0)).unwrap(), 1);
        assert_eq!(store.add_track(east).unwrap(), 2);

        // Same name replaces
        assert_eq!(store.add_track(north(60.0)).unwrap(), 2);

        let geom = store.snapshot();
        assert_eq!(geom.track("north").unwrap().point_a().x, 60.0);
        assert!(geom.track("east").is_some());
        assert!(geom.track("south").is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("fieldnav_field_{}", std::process::id()));

        let store = square_store();
        store.build_headland(10.0, JoinType::Miter).unwrap();
        let a1 = store.snap_to_headland(&Vector2::new(30.0, 5.0)).unwrap();
        let a2 = store.snap_to_headland(&Vector2::new(95.0, 50.0)).unwrap();
        store.clip_headland(&a1, &a2, ClipMode::Curve).unwrap();
        for (name, a, b) in [
            ("north", Vector2::new(50.0, 0.0), Vector2::new(50.0, 100.0)),
            ("diagonal", Vector2::new(10.5, 20.25), Vector2::new(80.0, 90.125)),
        ]
        .iter()
        {
            store.add_track(Track::new(name, *a, *b).unwrap()).unwrap();
        }

        let saved = store.snapshot();
        saved.save(&dir).unwrap();
        let loaded = FieldGeometry::load(&dir).unwrap();

        assert_eq!(
            loaded.boundary.as_ref().unwrap().points(),
            saved.boundary.as_ref().unwrap().points()
        );

        let h_saved = saved.headland.as_ref().unwrap();
        let h_loaded = loaded.headland.as_ref().unwrap();
        assert!(!h_loaded.is_closed());
        assert_eq!(h_loaded.move_distance_m(), 10.0);
        assert_eq!(h_loaded.len(), h_saved.len());
        for (a, b) in h_loaded.positions().iter().zip(h_saved.positions().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }

        assert_eq!(loaded.tracks.len(), 2);
        for t in saved.tracks.iter() {
            let l = loaded.track(t.name()).unwrap();
            assert_eq!(l.point_a(), t.point_a());
            assert_eq!(l.point_b(), t.point_b());
            assert_relative_eq!(l.heading_rad(), t.heading_rad(), epsilon = 1e-12);
        }

        // Clearing the headland removes its file on the next save
        store.clear_headland();
        store.snapshot().save(&dir).unwrap();
        assert!(!FieldGeometry::load(&dir).unwrap().has_headland());

        fs::remove_dir_all(&dir).unwrap();
    }
}
