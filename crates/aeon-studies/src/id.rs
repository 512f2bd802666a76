//! Study identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a study. The variant is part of identity, so challenge and
/// dilation numbering never collide with normal study numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StudyId {
    Normal(u32),
    Challenge(u32),
    Dilation(u32),
}

/// The variant tag of a [`StudyId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyKind {
    Normal,
    Challenge,
    Dilation,
}

impl StudyId {
    pub fn number(self) -> u32 {
        match self {
            StudyId::Normal(n) | StudyId::Challenge(n) | StudyId::Dilation(n) => n,
        }
    }

    pub fn kind(self) -> StudyKind {
        match self {
            StudyId::Normal(_) => StudyKind::Normal,
            StudyId::Challenge(_) => StudyKind::Challenge,
            StudyId::Dilation(_) => StudyKind::Dilation,
        }
    }

    pub fn is_normal(self) -> bool {
        matches!(self, StudyId::Normal(_))
    }

    /// Row of a normal study for the given row stride (`71 / 10 == 7`).
    pub fn row(self, stride: u32) -> u32 {
        self.number() / stride.max(1)
    }

    /// Column within the row (`71 % 10 == 1`).
    pub fn column(self, stride: u32) -> u32 {
        self.number() % stride.max(1)
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyId::Normal(n) => write!(f, "TS{n}"),
            StudyId::Challenge(n) => write!(f, "EC{n}"),
            StudyId::Dilation(n) => write!(f, "DS{n}"),
        }
    }
}

/// Error parsing a [`StudyId`] label such as `TS71`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid study label '{0}': expected TS<n>, EC<n> or DS<n>")]
pub struct ParseStudyIdError(pub String);

impl FromStr for StudyId {
    type Err = ParseStudyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let err = || ParseStudyIdError(s.to_string());
        if label.len() < 3 || !label.is_char_boundary(2) {
            return Err(err());
        }
        let (prefix, digits) = label.split_at(2);
        let number: u32 = digits.parse().map_err(|_| err())?;
        match prefix.to_ascii_uppercase().as_str() {
            "TS" => Ok(StudyId::Normal(number)),
            "EC" => Ok(StudyId::Challenge(number)),
            "DS" => Ok(StudyId::Dilation(number)),
            _ => Err(err()),
        }
    }
}
