//! Common traits and types that are useful for working with `vtk_readers`
#![allow(unused_imports)]

pub use crate::data::{Block, Dataset, MultiBlock};
pub use crate::mesh::{Geometry, Mesh};
pub use crate::selection::ArrayDomain;
pub use crate::traits::{ArraySelection, Decoder, Reader, TimeSeries};

pub(crate) use crate::array::{Attributes, DataArray, ScalarType};
pub(crate) use crate::{DecodeError, Error};

pub(crate) use derive_more::{Constructor, Display, From};

pub(crate) use ndarray::{Array1, Array2, ArrayView1, Axis};

pub(crate) use std::path::{Path, PathBuf};
