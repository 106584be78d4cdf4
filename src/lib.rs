//! # vtk-readers
//!
//! A format dispatching reader layer for VTK style mesh and volume datasets.
//!
//! Given a path, [`get_reader`] picks a reader through the static [`FormatRegistry`],
//! the caller toggles which arrays, blocks and timesteps should be loaded, and
//! [`Reader::read`] produces a [`Dataset`]: a single [`Mesh`] or an ordered
//! [`MultiBlock`] collection.
//!
//! ```no_run
//! use vtk_readers::prelude::*;
//!
//! let mut reader = vtk_readers::get_reader("flow.vtu")?;
//! if let Some(arrays) = reader.arrays_mut() {
//!     arrays.disable_all_arrays(ArrayDomain::Cell)?;
//!     arrays.enable_array(ArrayDomain::Cell, "pressure")?;
//! }
//! let dataset = reader.read()?;
//! println!("{} points", dataset.n_points());
//! # Ok::<(), vtk_readers::Error>(())
//! ```
//!
//! Readers expose optional capabilities through the [`ArraySelection`] and
//! [`TimeSeries`] traits. The bundled decoders cover the VTK XML family, `.pvd`
//! manifests and Plot3D grids; any other registered kind can be decoded by handing a
//! [`Decoder`] to [`FormatReader::with_decoder`].

pub mod array;
pub mod config;
mod data;
pub mod mesh;
pub mod parse;
pub mod plot3d;
pub mod prelude;
pub mod reader;
pub mod registry;
mod selection;
mod time;
mod traits;
mod utils;
mod write_vtk;

pub use array::{Attributes, DataArray, ScalarType};
pub use data::{Block, Dataset, MultiBlock};
pub use mesh::{CellArray, Extent, Geometry, Mesh};

pub use traits::{ArraySelection, Decoder, Reader, TimeSeries};

pub use selection::{ArrayDomain, ArrayStatusList, SelectionState};
pub use time::TimeCursor;

pub use reader::{
    get_reader, AnyReader, Catalog, CatalogQuery, DecodeRequest, Fragment, FormatReader,
    ManifestReader, Progress,
};
pub use registry::{FormatRegistry, ReaderDescriptor, ReaderKind};

pub use plot3d::{Plot3DFunction, Plot3DOptions, Plot3DReader};

pub use utils::ByteOrder;
pub use write_vtk::{save, write_multiblock, write_vtk, Encoding};

pub use quick_xml::reader::Reader as XmlReader;
pub use quick_xml::writer::Writer;

use std::path::{Path, PathBuf};

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("path `{}` does not exist", .0.display())]
    PathNotFound(PathBuf),
    #[error("unsupported format for `{}`: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },
    #[error("unknown {domain} array `{name}`, available arrays: {available:?}")]
    UnknownArray {
        domain: ArrayDomain,
        name: String,
        available: Vec<String>,
    },
    #[error("{what} index {index} is out of range (count: {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Not a valid time {value:?} from available time values: {valid:?}")]
    InvalidTimeValue { value: f64, valid: Vec<f64> },
    #[error("invalid value for `{setting}`: {message}")]
    InvalidConfigValue {
        setting: &'static str,
        message: String,
    },
    #[error("failed to decode `{}`: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Could not write XML data to file: `{0}`")]
    XmlWrite(#[from] quick_xml::Error),
}

impl Error {
    /// wrap a decoder failure with the path that was being decoded
    pub fn decode<E: Into<DecodeError>>(path: &Path, source: E) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub(crate) fn unsupported<T: Into<String>>(path: &Path, reason: T) -> Self {
        Self::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// `PathNotFound` unless `path` exists
    pub(crate) fn check_exists(path: &Path) -> Result<(), Self> {
        if path.exists() {
            Ok(())
        } else {
            Err(Self::PathNotFound(path.to_path_buf()))
        }
    }
}

/// Failures raised while decoding a file, carrying the decoder's own diagnostic
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Xml(#[from] parse::ParseError),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Plot3D(#[from] plot3d::LayoutError),
    #[error("no decoder is bundled for {0} files")]
    Unavailable(ReaderKind),
}
