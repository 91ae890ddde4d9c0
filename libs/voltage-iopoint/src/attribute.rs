//! Attribute, event and direction identifiers
//!
//! Names are resolved once at binding time into these enums; the hot path
//! never compares strings. All names are case-sensitive.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Attributes
// ============================================================================

/// Readable attribute of a point state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    UpdateTime,
    Value,
    ChangeTime,
    Quality,
    Error,
}

impl Attribute {
    pub const UPDATE_TIME: &'static str = "updateTime";
    pub const VALUE: &'static str = "value";
    pub const CHANGE_TIME: &'static str = "changeTime";
    pub const QUALITY: &'static str = "quality";
    pub const ERROR: &'static str = "error";

    /// All attributes in declaration order
    pub const ALL: [Attribute; 5] = [
        Attribute::UpdateTime,
        Attribute::Value,
        Attribute::ChangeTime,
        Attribute::Quality,
        Attribute::Error,
    ];

    /// Resolve any attribute name, including `value`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::UPDATE_TIME => Some(Attribute::UpdateTime),
            Self::VALUE => Some(Attribute::Value),
            Self::CHANGE_TIME => Some(Attribute::ChangeTime),
            Self::QUALITY => Some(Attribute::Quality),
            Self::ERROR => Some(Attribute::Error),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::UpdateTime => Self::UPDATE_TIME,
            Attribute::Value => Self::VALUE,
            Attribute::ChangeTime => Self::CHANGE_TIME,
            Attribute::Quality => Self::QUALITY,
            Attribute::Error => Self::ERROR,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Events
// ============================================================================

/// Change event of a point state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ValueChanged,
    QualityChanged,
    /// Fired when anything changed
    Changed,
}

impl EventKind {
    pub const VALUE_CHANGED: &'static str = "valueChanged";
    pub const QUALITY_CHANGED: &'static str = "qualityChanged";
    pub const CHANGED: &'static str = "changed";

    /// Firing order
    pub const ALL: [EventKind; 3] = [
        EventKind::ValueChanged,
        EventKind::QualityChanged,
        EventKind::Changed,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::VALUE_CHANGED => Some(EventKind::ValueChanged),
            Self::QUALITY_CHANGED => Some(EventKind::QualityChanged),
            Self::CHANGED => Some(EventKind::Changed),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ValueChanged => Self::VALUE_CHANGED,
            EventKind::QualityChanged => Self::QUALITY_CHANGED,
            EventKind::Changed => Self::CHANGED,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            EventKind::ValueChanged => 0,
            EventKind::QualityChanged => 1,
            EventKind::Changed => 2,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Directions
// ============================================================================

/// Transfer direction of a point state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Values read from the device
    Input,
    /// Values written to the device
    Output,
}

impl Direction {
    /// Name prefix that selects this direction in qualified names
    pub const OUTPUT_PREFIX: &'static str = "write.";

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }

    /// Split a point-level name into direction and local name
    ///
    /// `write.error` addresses the output state, anything unqualified the
    /// input state.
    pub fn split_name(name: &str) -> (Direction, &str) {
        match name.strip_prefix(Self::OUTPUT_PREFIX) {
            Some(rest) => (Direction::Output, rest),
            None => (Direction::Input, name),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directions a point supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Directions {
    #[serde(default = "default_true")]
    pub input: bool,
    #[serde(default = "default_true")]
    pub output: bool,
}

fn default_true() -> bool {
    true
}

impl Directions {
    pub const INPUT_OUTPUT: Directions = Directions {
        input: true,
        output: true,
    };
    pub const INPUT: Directions = Directions {
        input: true,
        output: false,
    };
    pub const OUTPUT: Directions = Directions {
        input: false,
        output: true,
    };

    pub fn contains(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.input,
            Direction::Output => self.output,
        }
    }
}

impl Default for Directions {
    fn default() -> Self {
        Self::INPUT_OUTPUT
    }
}

/// Attribute qualified by the state it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointAttribute {
    pub direction: Direction,
    pub attribute: Attribute,
}

impl fmt::Display for PointAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Input => write!(f, "{}", self.attribute),
            Direction::Output => write!(f, "{}{}", Direction::OUTPUT_PREFIX, self.attribute),
        }
    }
}
