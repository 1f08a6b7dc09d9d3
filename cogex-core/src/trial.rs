use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stimulus::{StimulusLevel, StimulusPair};

/// Physical screen side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Raw two-way choice returned by the presentation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyChoice {
    LeftKey,
    RightKey,
}

impl KeyChoice {
    pub fn side(self) -> Side {
        match self {
            KeyChoice::LeftKey => Side::Left,
            KeyChoice::RightKey => Side::Right,
        }
    }

    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Left => KeyChoice::LeftKey,
            Side::Right => KeyChoice::RightKey,
        }
    }

    pub fn mirrored(self) -> Self {
        Self::for_side(self.side().opposite())
    }
}

/// Pre-response trial condition. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub level: StimulusLevel,
    pub standard_side: Side,
}

impl Trial {
    pub fn new(level: StimulusLevel, standard_side: Side) -> Self {
        Self {
            level,
            standard_side,
        }
    }

    pub fn test_side(&self) -> Side {
        self.standard_side.opposite()
    }

    /// Line lengths for this trial given the standard magnitude.
    pub fn stimulus_pair(&self, standard_length: f64) -> StimulusPair {
        let standard = standard_length;
        let test = standard_length * self.level.ratio();
        match self.standard_side {
            Side::Left => StimulusPair {
                left: standard,
                right: test,
            },
            Side::Right => StimulusPair {
                left: test,
                right: standard,
            },
        }
    }
}

/// Canonical 2AFC judgment, persisted as 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Response {
    StandardLonger = 0,
    TestLonger = 1,
}

impl Response {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.as_u8())
    }
}

impl TryFrom<u8> for Response {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Response::StandardLonger),
            1 => Ok(Response::TestLonger),
            other => Err(Error::invalid_value(format!("response {other} is not 0 or 1"))),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Response::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// One recorded observation: the level shown and the coded judgment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    #[serde(rename = "ratio")]
    pub level: StimulusLevel,
    pub response: Response,
}
