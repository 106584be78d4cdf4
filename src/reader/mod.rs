//! Concrete readers and the [`get_reader`] entry point
//!
//! Most formats are handled by [`FormatReader`], a generic reader that holds the array
//! and time selection and hands the byte level work to a [`Decoder`]. Manifest files
//! (`.pvd`) fan out to one child reader per referenced file through
//! [`ManifestReader`].

mod format;
mod manifest;
mod multiblock;
mod xml;

pub use format::{builtin_decoder, FormatReader, UnavailableDecoder};
pub use manifest::{Fragment, ManifestReader};
pub use multiblock::MultiBlockDecoder;
pub use xml::VtkXmlDecoder;

use crate::config::ReaderSettings;
use crate::prelude::*;
use crate::registry::{FormatRegistry, ReaderKind};
use crate::selection::SelectionState;

/// Construct a reader for `path`, choosing the format through the global
/// [`FormatRegistry`].
///
/// Unsupported suffixes fail with [`Error::UnsupportedFormat`] before the path is
/// checked, and a missing path fails with [`Error::PathNotFound`].
///
/// ```no_run
/// use vtk_readers::prelude::*;
///
/// let reader = vtk_readers::get_reader("wavy.pvd")?;
/// assert_eq!(reader.kind(), vtk_readers::ReaderKind::Pvd);
/// # Ok::<(), vtk_readers::Error>(())
/// ```
pub fn get_reader<P: AsRef<Path>>(path: P) -> Result<AnyReader, Error> {
    let path = path.as_ref();
    let descriptor = FormatRegistry::global().resolve(path)?;
    AnyReader::new(path, descriptor.kind)
}

/// Arrays, patches and time values a decoder reports for a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub point_arrays: Vec<String>,
    pub cell_arrays: Vec<String>,
    pub patches: Vec<String>,
    pub time_values: Vec<f64>,
}

/// The reader state a decoder may consult while building a [`Catalog`]
#[derive(Debug, Clone, Copy)]
pub struct CatalogQuery<'a> {
    /// the active time, `None` for readers without time values
    pub time: Option<f64>,
    pub selection: &'a SelectionState,
    pub settings: &'a ReaderSettings,
}

/// Everything a decoder needs for a single `read`
#[derive(Debug, Clone, Copy)]
pub struct DecodeRequest<'a> {
    pub selection: &'a SelectionState,
    pub time: Option<f64>,
    pub settings: &'a ReaderSettings,
    pub progress: &'a Progress,
}

impl<'a> DecodeRequest<'a> {
    /// the equivalent catalog query
    pub fn query(&self) -> CatalogQuery<'a> {
        CatalogQuery {
            time: self.time,
            selection: self.selection,
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Progress reporting for a single `read` call
///
/// When enabled, every step is emitted as an `info` event on the
/// `vtk_readers::progress` target.
pub struct Progress {
    reader: String,
    enabled: bool,
}

impl Progress {
    pub fn new<T: Into<String>>(reader: T, enabled: bool) -> Self {
        Self {
            reader: reader.into(),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn step(&self, step: usize, total: usize) {
        if self.enabled {
            tracing::info!(
                target: "vtk_readers::progress",
                reader = %self.reader,
                step,
                total,
                "reading"
            );
        }
    }
}

#[derive(Debug)]
/// The reader returned by [`get_reader`]
pub enum AnyReader {
    Format(FormatReader),
    Manifest(ManifestReader),
}

impl AnyReader {
    /// construct the reader for an already known kind
    pub fn new<P: AsRef<Path>>(path: P, kind: ReaderKind) -> Result<Self, Error> {
        match kind {
            ReaderKind::Pvd => Ok(Self::Manifest(ManifestReader::new(path)?)),
            kind => Ok(Self::Format(FormatReader::new(path, kind)?)),
        }
    }

    pub fn as_format(&self) -> Option<&FormatReader> {
        match self {
            Self::Format(reader) => Some(reader),
            Self::Manifest(_) => None,
        }
    }

    pub fn as_format_mut(&mut self) -> Option<&mut FormatReader> {
        match self {
            Self::Format(reader) => Some(reader),
            Self::Manifest(_) => None,
        }
    }

    pub fn as_manifest(&self) -> Option<&ManifestReader> {
        match self {
            Self::Format(_) => None,
            Self::Manifest(reader) => Some(reader),
        }
    }

    pub fn as_manifest_mut(&mut self) -> Option<&mut ManifestReader> {
        match self {
            Self::Format(_) => None,
            Self::Manifest(reader) => Some(reader),
        }
    }

    fn inner(&self) -> &dyn Reader {
        match self {
            Self::Format(reader) => reader,
            Self::Manifest(reader) => reader,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Reader {
        match self {
            Self::Format(reader) => reader,
            Self::Manifest(reader) => reader,
        }
    }
}

impl Reader for AnyReader {
    fn path(&self) -> &Path {
        self.inner().path()
    }

    fn kind(&self) -> ReaderKind {
        self.inner().kind()
    }

    fn read(&self) -> Result<Dataset, Error> {
        self.inner().read()
    }

    fn show_progress(&mut self) {
        self.inner_mut().show_progress()
    }

    fn hide_progress(&mut self) {
        self.inner_mut().hide_progress()
    }

    fn progress_enabled(&self) -> bool {
        self.inner().progress_enabled()
    }

    fn arrays(&self) -> Option<&dyn ArraySelection> {
        self.inner().arrays()
    }

    fn arrays_mut(&mut self) -> Option<&mut dyn ArraySelection> {
        self.inner_mut().arrays_mut()
    }

    fn time(&self) -> Option<&dyn TimeSeries> {
        self.inner().time()
    }

    fn time_mut(&mut self) -> Option<&mut dyn TimeSeries> {
        self.inner_mut().time_mut()
    }
}

impl From<FormatReader> for AnyReader {
    fn from(reader: FormatReader) -> Self {
        Self::Format(reader)
    }
}

impl From<ManifestReader> for AnyReader {
    fn from(reader: ManifestReader) -> Self {
        Self::Manifest(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_before_missing() {
        let err = get_reader("not_a_supported_file.no_data").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));

        let err = get_reader("missing_file.vtp").unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn progress_flag() {
        assert!(!Progress::disabled().is_enabled());
        assert!(Progress::new("XmlPolyData", true).is_enabled());
    }
}
