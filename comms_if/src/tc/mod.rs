//! # Telecommand module
//!
//! This module provides the operator commands accepted by the guidance executable. Commands are
//! written in the same syntax whether they are typed on the command line or read from a timed
//! script, for example `headland build 12 --join miter` or `paths-away -2`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use structopt::clap::AppSettings;
use structopt::StructOpt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command issued by the operator to the guidance system.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt, PartialEq)]
pub enum GuideCmd {
    /// Set which parallel of the active track is being followed.
    ///
    /// Zero is the track itself, positive values move to the right of the A->B direction.
    #[structopt(name = "paths-away", setting = AppSettings::AllowNegativeNumbers)]
    SetPathsAway {
        /// Number of track widths to offset the active track by
        paths_away: i32,
    },

    /// Make the named track the active one.
    #[structopt(name = "track")]
    SelectTrack {
        /// Name of the track as given in the track file
        name: String,
    },

    /// Add a track through two points, replacing any track of the same name.
    #[structopt(name = "add-track", setting = AppSettings::AllowNegativeNumbers)]
    AddTrack {
        /// Name the track is selected by
        name: String,
        /// Easting of point A
        a_e: f64,
        /// Northing of point A
        a_n: f64,
        /// Easting of point B
        b_e: f64,
        /// Northing of point B
        b_n: f64,
    },

    /// Replace the field boundary with one loaded from a boundary file.
    ///
    /// The headland belongs to the old boundary and is removed.
    #[structopt(name = "boundary")]
    LoadBoundary {
        /// Path to the boundary JSON file
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },

    /// Headland operations.
    #[structopt(name = "headland")]
    Headland(HeadlandCmd),

    /// Enable or disable automatic U-turns at the headland.
    #[structopt(name = "youturn")]
    YouTurn {
        /// Either `on` or `off`
        state: Switch,
    },

    /// Abandon the current U-turn, if there is one, and return to line following.
    #[structopt(name = "abort-turn")]
    AbortTurn,
}

/// Headland building and editing commands.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt, PartialEq)]
pub enum HeadlandCmd {
    /// Build the headland by offsetting the field boundary inwards.
    #[structopt(name = "build")]
    Build {
        /// The inward offset distance in meters
        distance_m: f64,

        /// How the offset edges are joined at reflex corners, `round` or `miter`
        #[structopt(long, default_value = "round")]
        join: JoinType,
    },

    /// Cut the headland along the line through two points, keeping one of the two arcs.
    #[structopt(name = "clip", setting = AppSettings::AllowNegativeNumbers)]
    Clip {
        /// Easting of the first point
        x1: f64,
        /// Northing of the first point
        y1: f64,
        /// Easting of the second point
        x2: f64,
        /// Northing of the second point
        y2: f64,

        /// Which arc to keep, `curve` (longer) or `line` (shorter)
        #[structopt(long, default_value = "curve")]
        mode: ClipMode,
    },

    /// Remove the headland.
    #[structopt(name = "clear")]
    Clear,
}

/// Corner join used when offsetting a ring.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JoinType {
    /// Reflex corners of the offset ring are replaced by circular arcs around the original vertex.
    Round,

    /// Reflex corners are extended to the intersection of the offset edges, falling back to a
    /// bevel past the miter limit.
    Miter,
}

/// Which arc of a ring to keep after clipping.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClipMode {
    /// Keep the longer arc.
    Curve,

    /// Keep the shorter arc.
    Line,
}

/// A simple on/off switch.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum GuideCmdParseError {
    #[error("The command is empty")]
    Empty,

    #[error("Invalid command: {0}")]
    Invalid(structopt::clap::Error),

    #[error("{0:?} is not a recognised value, expected one of {1}")]
    UnknownValue(String, &'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GuideCmd {
    /// Parse a command from a single line of whitespace separated words.
    pub fn parse_line(line: &str) -> Result<Self, GuideCmdParseError> {
        let words: Vec<&str> = line.split_whitespace().collect();

        if words.is_empty() {
            return Err(GuideCmdParseError::Empty);
        }

        Self::from_iter_safe(std::iter::once("guide").chain(words))
            .map_err(GuideCmdParseError::Invalid)
    }
}

impl FromStr for JoinType {
    type Err = GuideCmdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round" | "curve" => Ok(JoinType::Round),
            "miter" | "mitre" | "line" => Ok(JoinType::Miter),
            _ => Err(GuideCmdParseError::UnknownValue(
                s.to_string(),
                "round, miter",
            )),
        }
    }
}

impl FromStr for ClipMode {
    type Err = GuideCmdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "curve" => Ok(ClipMode::Curve),
            "line" => Ok(ClipMode::Line),
            _ => Err(GuideCmdParseError::UnknownValue(s.to_string(), "curve, line")),
        }
    }
}

impl FromStr for Switch {
    type Err = GuideCmdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "enable" | "true" => Ok(Switch::On),
            "off" | "disable" | "false" => Ok(Switch::Off),
            _ => Err(GuideCmdParseError::UnknownValue(s.to_string(), "on, off")),
        }
    }
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_headland() {
        assert_eq!(
            GuideCmd::parse_line("headland build 12.5 --join miter").unwrap(),
            GuideCmd::Headland(HeadlandCmd::Build {
                distance_m: 12.5,
                join: JoinType::Miter
            })
        );
        assert_eq!(
            GuideCmd::parse_line("headland build 8").unwrap(),
            GuideCmd::Headland(HeadlandCmd::Build {
                distance_m: 8.0,
                join: JoinType::Round
            })
        );
        assert_eq!(
            GuideCmd::parse_line("headland clip -5 10 105 10.5 --mode line").unwrap(),
            GuideCmd::Headland(HeadlandCmd::Clip {
                x1: -5.0,
                y1: 10.0,
                x2: 105.0,
                y2: 10.5,
                mode: ClipMode::Line
            })
        );
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(
            GuideCmd::parse_line("  paths-away -3 ").unwrap(),
            GuideCmd::SetPathsAway { paths_away: -3 }
        );
        assert_eq!(
            GuideCmd::parse_line("youturn off").unwrap(),
            GuideCmd::YouTurn { state: Switch::Off }
        );
        assert_eq!(
            GuideCmd::parse_line("abort-turn").unwrap(),
            GuideCmd::AbortTurn
        );
        assert_eq!(
            GuideCmd::parse_line("add-track west -20 0 -20.5 100").unwrap(),
            GuideCmd::AddTrack {
                name: "west".into(),
                a_e: -20.0,
                a_n: 0.0,
                b_e: -20.5,
                b_n: 100.0
            }
        );
        assert_eq!(
            GuideCmd::parse_line("boundary fields/home/boundary.json").unwrap(),
            GuideCmd::LoadBoundary {
                path: PathBuf::from("fields/home/boundary.json")
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            GuideCmd::parse_line("   "),
            Err(GuideCmdParseError::Empty)
        ));
        assert!(matches!(
            GuideCmd::parse_line("youturn maybe"),
            Err(GuideCmdParseError::Invalid(_))
        ));
        assert!(matches!(
            GuideCmd::parse_line("headland build --join round"),
            Err(GuideCmdParseError::Invalid(_))
        ));
    }
}
