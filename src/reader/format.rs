use crate::config::{CaseType, ReaderSettings};
use crate::plot3d::Plot3DMetaDecoder;
use crate::prelude::*;
use crate::registry::{FormatRegistry, ReaderKind};
use crate::selection::{ArrayStatusList, SelectionState};
use crate::time::TimeCursor;
use crate::traits::unknown_array;

use super::{Catalog, CatalogQuery, DecodeRequest, MultiBlockDecoder, Progress, VtkXmlDecoder};

use std::fmt;

/// the decoder bundled for `kind`
pub fn builtin_decoder(kind: ReaderKind) -> Box<dyn Decoder> {
    match kind {
        ReaderKind::XmlImageData
        | ReaderKind::XmlRectilinearGrid
        | ReaderKind::XmlStructuredGrid
        | ReaderKind::XmlUnstructuredGrid
        | ReaderKind::XmlPolyData => Box::new(VtkXmlDecoder),
        ReaderKind::XmlMultiBlock => Box::new(MultiBlockDecoder),
        ReaderKind::Plot3DMeta => Box::new(Plot3DMetaDecoder),
        kind => Box::new(UnavailableDecoder::new(kind)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Stands in for formats without a bundled decoder: the catalog is empty and every
/// decode fails with [`DecodeError::Unavailable`].
pub struct UnavailableDecoder {
    kind: ReaderKind,
}

impl UnavailableDecoder {
    pub fn new(kind: ReaderKind) -> Self {
        Self { kind }
    }
}

impl Decoder for UnavailableDecoder {
    fn catalog(&self, _path: &Path, _query: &CatalogQuery<'_>) -> Result<Catalog, Error> {
        Ok(Catalog::default())
    }

    fn decode(&self, path: &Path, _request: &DecodeRequest<'_>) -> Result<Dataset, Error> {
        Err(Error::decode(path, DecodeError::Unavailable(self.kind)))
    }
}

/// A reader for a single file (or case directory) of one format
///
/// The reader keeps the array and time selection and re-queries the decoder's
/// [`Catalog`] whenever a change can alter what is discoverable: a new active time, a
/// patch toggle, or a new case type.
pub struct FormatReader {
    path: PathBuf,
    kind: ReaderKind,
    decoder: Box<dyn Decoder>,
    settings: ReaderSettings,
    selection: SelectionState,
    time: TimeCursor,
    /// time values as reported by the decoder, before `skip_zero_time`
    all_time_values: Vec<f64>,
    progress: bool,
}

impl fmt::Debug for FormatReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatReader")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("settings", &self.settings)
            .field("selection", &self.selection)
            .field("time", &self.time)
            .field("progress", &self.progress)
            .finish()
    }
}

impl FormatReader {
    /// construct a reader with the bundled decoder for `kind`
    pub fn new<P: AsRef<Path>>(path: P, kind: ReaderKind) -> Result<Self, Error> {
        Self::with_decoder(path, kind, builtin_decoder(kind))
    }

    /// Construct a reader that decodes through `decoder`.
    ///
    /// The path must exist and match the file or directory arity registered for
    /// `kind`. The decoder's catalog is queried once before returning.
    pub fn with_decoder<P: AsRef<Path>>(
        path: P,
        kind: ReaderKind,
        decoder: Box<dyn Decoder>,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        Error::check_exists(path)?;

        if let Some(descriptor) = FormatRegistry::global().descriptor(kind) {
            if path.is_dir() && !descriptor.accepts_directory() {
                return Err(Error::unsupported(path, format!("{kind} readers do not accept directories")));
            }
            if !path.is_dir() && !descriptor.accepts_file() {
                return Err(Error::unsupported(path, format!("{kind} readers require a directory")));
            }
        }

        let mut reader = Self {
            path: path.to_path_buf(),
            kind,
            decoder,
            settings: ReaderSettings::default(),
            selection: SelectionState::default(),
            time: TimeCursor::default(),
            all_time_values: Vec::new(),
            progress: false,
        };
        reader.update()?;

        tracing::debug!(
            path = %reader.path.display(),
            kind = %kind,
            point_arrays = reader.selection.point.len(),
            cell_arrays = reader.selection.cell.len(),
            patches = reader.selection.patch.len(),
            time_points = reader.time.len(),
            "constructed reader"
        );

        Ok(reader)
    }

    fn active_time(&self) -> Option<f64> {
        (!self.time.is_empty()).then(|| self.time.active_value())
    }

    fn visible_times(&self) -> Vec<f64> {
        self.all_time_values
            .iter()
            .copied()
            .filter(|t| !(self.settings.skip_zero_time && *t == 0.0))
            .collect()
    }

    /// Query the decoder again and reconcile the array lists with what it reports.
    ///
    /// Statuses of arrays that are still present are kept, new arrays start enabled.
    pub fn update(&mut self) -> Result<(), Error> {
        let query = CatalogQuery {
            time: self.active_time(),
            selection: &self.selection,
            settings: &self.settings,
        };
        let catalog = self.decoder.catalog(&self.path, &query)?;

        self.selection.point.reconcile(catalog.point_arrays);
        self.selection.cell.reconcile(catalog.cell_arrays);
        self.selection.patch.reconcile(catalog.patches);

        self.all_time_values = catalog.time_values;
        self.time.replace_values(self.visible_times());

        tracing::debug!(
            path = %self.path.display(),
            point_arrays = self.selection.point.len(),
            cell_arrays = self.selection.cell.len(),
            patches = self.selection.patch.len(),
            "reconciled arrays"
        );

        Ok(())
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn case_type(&self) -> CaseType {
        self.settings.case_type
    }

    /// Set the case layout from its string name (`reconstructed` or `decomposed`).
    /// Unknown names fail with [`Error::InvalidConfigValue`] and leave the setting
    /// unchanged.
    pub fn set_case_type(&mut self, case_type: &str) -> Result<(), Error> {
        self.settings.case_type = case_type.parse()?;
        self.update()
    }

    pub fn skip_zero_time(&self) -> bool {
        self.settings.skip_zero_time
    }

    /// hide a `0.0` time value and re-derive the time list
    pub fn set_skip_zero_time(&mut self, skip: bool) -> Result<(), Error> {
        self.settings.skip_zero_time = skip;
        self.time.replace_values(self.visible_times());
        self.update()
    }

    pub fn cell_to_point(&self) -> bool {
        self.settings.cell_to_point
    }

    pub fn set_cell_to_point(&mut self, enabled: bool) {
        self.settings.cell_to_point = enabled;
    }

    pub fn decompose_polyhedra(&self) -> bool {
        self.settings.decompose_polyhedra
    }

    pub fn set_decompose_polyhedra(&mut self, enabled: bool) {
        self.settings.decompose_polyhedra = enabled;
    }
}

impl Reader for FormatReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn kind(&self) -> ReaderKind {
        self.kind
    }

    fn read(&self) -> Result<Dataset, Error> {
        let progress = Progress::new(self.kind.to_string(), self.progress);
        let request = DecodeRequest {
            selection: &self.selection,
            time: self.active_time(),
            settings: &self.settings,
            progress: &progress,
        };

        progress.step(0, 1);
        let dataset = self.decoder.decode(&self.path, &request)?;
        progress.step(1, 1);

        Ok(dataset)
    }

    fn show_progress(&mut self) {
        self.progress = true;
    }

    fn hide_progress(&mut self) {
        self.progress = false;
    }

    fn progress_enabled(&self) -> bool {
        self.progress
    }

    fn arrays(&self) -> Option<&dyn ArraySelection> {
        Some(self)
    }

    fn arrays_mut(&mut self) -> Option<&mut dyn ArraySelection> {
        Some(self)
    }

    fn time(&self) -> Option<&dyn TimeSeries> {
        (!self.all_time_values.is_empty()).then(|| self as &dyn TimeSeries)
    }

    fn time_mut(&mut self) -> Option<&mut dyn TimeSeries> {
        if self.all_time_values.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl ArraySelection for FormatReader {
    fn array_list(&self, domain: ArrayDomain) -> &ArrayStatusList {
        self.selection.list(domain)
    }

    fn set_array_status(&mut self, domain: ArrayDomain, name: &str, enabled: bool) -> Result<(), Error> {
        let list = self.selection.list_mut(domain);
        if !list.set(name, enabled) {
            return Err(unknown_array(list, domain, name));
        }

        // the point and cell arrays on offer depend on which patches are read
        if domain == ArrayDomain::Patch {
            self.update()?;
        }

        Ok(())
    }

    fn set_all_array_status(&mut self, domain: ArrayDomain, enabled: bool) -> Result<(), Error> {
        self.selection.list_mut(domain).set_all(enabled);

        if domain == ArrayDomain::Patch {
            self.update()?;
        }

        Ok(())
    }
}

impl TimeSeries for FormatReader {
    fn time_values(&self) -> &[f64] {
        self.time.values()
    }

    fn active_time_index(&self) -> usize {
        self.time.active_index()
    }

    fn set_active_time_value(&mut self, value: f64) -> Result<(), Error> {
        let index = self.time.set_active_value(value)?;
        tracing::debug!(path = %self.path.display(), index, value, "active time changed");
        self.update()
    }

    fn set_active_time_point(&mut self, index: usize) -> Result<(), Error> {
        self.time.set_active_index(index)?;
        tracing::debug!(path = %self.path.display(), index, "active time changed");
        self.update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_kinds_construct_but_do_not_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bunny.ply");
        std::fs::write(&path, "ply\n").unwrap();

        let reader = FormatReader::new(&path, ReaderKind::Ply).unwrap();
        assert_eq!(reader.kind(), ReaderKind::Ply);
        assert_eq!(reader.path(), path.as_path());
        assert!(reader.time().is_none());

        let err = reader.read().unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                source: DecodeError::Unavailable(ReaderKind::Ply),
                ..
            }
        ));
    }

    #[test]
    fn arity_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let err = FormatReader::new(dir.path(), ReaderKind::Stl).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));

        assert!(FormatReader::new(dir.path(), ReaderKind::Dicom).is_ok());
    }

    #[test]
    fn progress_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        std::fs::write(&path, []).unwrap();

        let mut reader = FormatReader::new(&path, ReaderKind::Png).unwrap();
        assert!(!reader.progress_enabled());
        reader.show_progress();
        assert!(reader.progress_enabled());
        reader.hide_progress();
        assert!(!reader.progress_enabled());
    }
}
