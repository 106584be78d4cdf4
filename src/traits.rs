//! # Traits
//!
//! Readers are composed from independent capabilities rather than a single large
//! interface. Every reader implements [`Reader`]; readers that can toggle arrays also
//! implement [`ArraySelection`], and readers with more than one timestep implement
//! [`TimeSeries`]. Callers discover a capability through [`Reader::arrays`] and
//! [`Reader::time`]:
//!
//! ```no_run
//! use vtk_readers::prelude::*;
//!
//! let mut reader = vtk_readers::get_reader("case.pvd")?;
//! if let Some(time) = reader.time_mut() {
//!     time.set_active_time_point(1)?;
//! }
//! let dataset = reader.read()?;
//! # Ok::<(), vtk_readers::Error>(())
//! ```
//!
//! The byte level work for a format is hidden behind [`Decoder`].

use crate::prelude::*;
use crate::reader::{Catalog, CatalogQuery, DecodeRequest};
use crate::registry::ReaderKind;
use crate::selection::ArrayStatusList;

/// The contract every format reader implements
pub trait Reader {
    /// the path this reader was constructed with
    fn path(&self) -> &Path;

    fn kind(&self) -> ReaderKind;

    /// Decode the bound path with the current selection.
    ///
    /// Reading never changes the selection, and every call decodes the file again.
    fn read(&self) -> Result<Dataset, Error>;

    /// emit progress events while reading
    fn show_progress(&mut self);

    fn hide_progress(&mut self);

    fn progress_enabled(&self) -> bool;

    fn arrays(&self) -> Option<&dyn ArraySelection> {
        None
    }

    fn arrays_mut(&mut self) -> Option<&mut dyn ArraySelection> {
        None
    }

    fn time(&self) -> Option<&dyn TimeSeries> {
        None
    }

    fn time_mut(&mut self) -> Option<&mut dyn TimeSeries> {
        None
    }
}

/// Enable or disable the named arrays of each [`ArrayDomain`]
///
/// Changing a status does not load anything: it only decides what the next
/// [`Reader::read`] produces.
pub trait ArraySelection {
    /// the arrays currently discoverable in `domain`, in discovery order
    fn array_list(&self, domain: ArrayDomain) -> &ArrayStatusList;

    /// Set the status of a single array. Fails with [`Error::UnknownArray`] when
    /// `name` is not currently discoverable.
    fn set_array_status(&mut self, domain: ArrayDomain, name: &str, enabled: bool) -> Result<(), Error>;

    /// set the status of every currently discoverable array in `domain`
    fn set_all_array_status(&mut self, domain: ArrayDomain, enabled: bool) -> Result<(), Error>;

    fn array_names(&self, domain: ArrayDomain) -> Vec<String> {
        self.array_list(domain).names()
    }

    fn number_arrays(&self, domain: ArrayDomain) -> usize {
        self.array_list(domain).len()
    }

    fn array_status(&self, domain: ArrayDomain, name: &str) -> Result<bool, Error> {
        self.array_list(domain)
            .status(name)
            .ok_or_else(|| unknown_array(self.array_list(domain), domain, name))
    }

    /// snapshot of every `(name, enabled)` pair in discovery order
    fn all_arrays_status(&self, domain: ArrayDomain) -> Vec<(String, bool)> {
        self.array_list(domain).entries().to_vec()
    }

    fn enable_array(&mut self, domain: ArrayDomain, name: &str) -> Result<(), Error> {
        self.set_array_status(domain, name, true)
    }

    fn disable_array(&mut self, domain: ArrayDomain, name: &str) -> Result<(), Error> {
        self.set_array_status(domain, name, false)
    }

    fn enable_all_arrays(&mut self, domain: ArrayDomain) -> Result<(), Error> {
        self.set_all_array_status(domain, true)
    }

    fn disable_all_arrays(&mut self, domain: ArrayDomain) -> Result<(), Error> {
        self.set_all_array_status(domain, false)
    }
}

/// the [`Error::UnknownArray`] for `name`, listing what is available
pub(crate) fn unknown_array(list: &ArrayStatusList, domain: ArrayDomain, name: &str) -> Error {
    Error::UnknownArray {
        domain,
        name: name.to_string(),
        available: list.names(),
    }
}

/// Value and index based selection of the active timestep
pub trait TimeSeries {
    /// registered time values in ascending order
    fn time_values(&self) -> &[f64];

    fn active_time_index(&self) -> usize;

    /// Select a timestep by value. The value must match a registered time within the
    /// [`config`](crate::config) tolerances, otherwise [`Error::InvalidTimeValue`]
    /// is returned.
    fn set_active_time_value(&mut self, value: f64) -> Result<(), Error>;

    /// select a timestep by index, failing with [`Error::IndexOutOfRange`]
    fn set_active_time_point(&mut self, index: usize) -> Result<(), Error>;

    fn number_time_points(&self) -> usize {
        self.time_values().len()
    }

    fn time_point_value(&self, index: usize) -> Result<f64, Error> {
        let values = self.time_values();
        values.get(index).copied().ok_or(Error::IndexOutOfRange {
            what: "time point",
            index,
            len: values.len(),
        })
    }

    fn active_time_value(&self) -> f64 {
        self.time_values()
            .get(self.active_time_index())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Decodes a single file format
///
/// A decoder opens the file inside each call and releases it before returning, so
/// no handle outlives a `catalog` or `decode` call.
pub trait Decoder {
    /// list the arrays, patches and time values the file offers for `query`
    fn catalog(&self, path: &Path, query: &CatalogQuery<'_>) -> Result<Catalog, Error>;

    /// decode the file with the given selection
    fn decode(&self, path: &Path, request: &DecodeRequest<'_>) -> Result<Dataset, Error>;
}
