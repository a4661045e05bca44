//! The fixed set of named gestures the scene can morph between.

use crate::error::MorphError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A named target configuration of shape, transform and material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Hero,
    Welcome,
    Vision,
    Scatter,
    Gallery,
    Globe,
}

/// How a gesture choreographs its entry beyond the plain position morph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choreography {
    /// Tweened transform, idle motion, disperse when eligible.
    Standard,
    /// Transform snaps before the morph; content is revealed once it lands.
    InstantReveal,
    /// Scattered start, color morph in lock-step, drag rotation enabled.
    Interactive,
}

impl Choreography {
    #[inline]
    pub fn is_self_choreographed(self) -> bool {
        !matches!(self, Choreography::Standard)
    }
}

impl Gesture {
    pub const ALL: [Gesture; 6] = [
        Gesture::Hero,
        Gesture::Welcome,
        Gesture::Vision,
        Gesture::Scatter,
        Gesture::Gallery,
        Gesture::Globe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Gesture::Hero => "hero",
            Gesture::Welcome => "welcome",
            Gesture::Vision => "vision",
            Gesture::Scatter => "scatter",
            Gesture::Gallery => "gallery",
            Gesture::Globe => "globe",
        }
    }

    pub fn choreography(self) -> Choreography {
        match self {
            Gesture::Gallery => Choreography::InstantReveal,
            Gesture::Globe => Choreography::Interactive,
            _ => Choreography::Standard,
        }
    }

    /// Whether the pointer disperse field may run while this gesture is at rest.
    pub fn allows_disperse(self) -> bool {
        self.choreography() == Choreography::Standard && self != Gesture::Scatter
    }

    #[inline]
    pub fn is_interactive(self) -> bool {
        self.choreography() == Choreography::Interactive
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gesture {
    type Err = MorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gesture::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MorphError::UnknownGestureName(s.to_string()))
    }
}

/// Host device class; constrained devices get far fewer particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Constrained,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Constrained => "constrained",
        })
    }
}
