//! Settings shared by the format readers
//!
//! Everything here is plain data: readers hand it to their decoder when the catalog is
//! queried and again when `read` is called. Nothing is validated beyond parsing string
//! enumerations.

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// relative tolerance used when resolving a requested time value to a registered one
pub const TIME_RELATIVE_TOLERANCE: f64 = 1e-6;

/// absolute tolerance used when resolving a requested time value to a registered one
pub const TIME_ABSOLUTE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How a case directory is laid out on disk
pub enum CaseType {
    #[default]
    Reconstructed,
    Decomposed,
}

impl FromStr for CaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reconstructed" => Ok(Self::Reconstructed),
            "decomposed" => Ok(Self::Decomposed),
            other => Err(Error::InvalidConfigValue {
                setting: "case_type",
                message: format!("Unknown case type '{other}'."),
            }),
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconstructed => write!(f, "reconstructed"),
            Self::Decomposed => write!(f, "decomposed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Decoder hints carried by every [`FormatReader`](crate::FormatReader)
pub struct ReaderSettings {
    pub case_type: CaseType,
    /// hide a `0.0` entry from the reported time values
    pub skip_zero_time: bool,
    /// ask the decoder to also produce point data interpolated from cell data
    pub cell_to_point: bool,
    pub decompose_polyhedra: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            case_type: CaseType::Reconstructed,
            skip_zero_time: false,
            cell_to_point: true,
            decompose_polyhedra: true,
        }
    }
}
