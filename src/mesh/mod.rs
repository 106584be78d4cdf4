//! # Mesh Information
//!
//! A [`Mesh`] pairs a [`Geometry`] with the data arrays attached to its points, its
//! cells and the dataset as a whole. The geometry variants mirror the five serial
//! VTK XML dataset kinds:
//!
//! | variant | file | topology |
//! |---|---|---|
//! | `ImageData` | `.vti` | implicit, from extent, origin and spacing |
//! | `RectilinearGrid` | `.vtr` | implicit, from extent and three coordinate axes |
//! | `StructuredGrid` | `.vts` | implicit, from extent, with explicit points |
//! | `UnstructuredGrid` | `.vtu` | explicit cells and cell types |
//! | `PolyData` | `.vtp` | explicit verts, lines, strips and polys |
//!
//! Structured kinds describe their size with an inclusive [`Extent`]; an extent
//! whose end is smaller than its start describes an empty mesh.

mod cells;
mod extent;

pub use cells::CellArray;
pub use extent::Extent;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq)]
/// Point coordinates and cell topology of a mesh
pub enum Geometry {
    ImageData {
        extent: Extent,
        origin: [f64; 3],
        spacing: [f64; 3],
    },
    RectilinearGrid {
        extent: Extent,
        x: Array1<f64>,
        y: Array1<f64>,
        z: Array1<f64>,
    },
    StructuredGrid {
        extent: Extent,
        /// `(n_points, 3)` coordinates
        points: Array2<f64>,
        /// optional per point visibility, 0 for a blanked point
        blanking: Option<Vec<i32>>,
    },
    UnstructuredGrid {
        points: Array2<f64>,
        cells: CellArray,
        cell_types: Vec<u8>,
    },
    PolyData {
        points: Array2<f64>,
        verts: CellArray,
        lines: CellArray,
        strips: CellArray,
        polys: CellArray,
    },
}

impl Geometry {
    /// the `VTKFile type` attribute for this geometry
    pub fn vtk_type(&self) -> &'static str {
        match self {
            Self::ImageData { .. } => "ImageData",
            Self::RectilinearGrid { .. } => "RectilinearGrid",
            Self::StructuredGrid { .. } => "StructuredGrid",
            Self::UnstructuredGrid { .. } => "UnstructuredGrid",
            Self::PolyData { .. } => "PolyData",
        }
    }

    /// the serial XML file suffix, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::ImageData { .. } => "vti",
            Self::RectilinearGrid { .. } => "vtr",
            Self::StructuredGrid { .. } => "vts",
            Self::UnstructuredGrid { .. } => "vtu",
            Self::PolyData { .. } => "vtp",
        }
    }

    pub fn extent(&self) -> Option<Extent> {
        match self {
            Self::ImageData { extent, .. }
            | Self::RectilinearGrid { extent, .. }
            | Self::StructuredGrid { extent, .. } => Some(*extent),
            Self::UnstructuredGrid { .. } | Self::PolyData { .. } => None,
        }
    }

    /// explicit point coordinates, if this geometry stores them
    pub fn points(&self) -> Option<&Array2<f64>> {
        match self {
            Self::StructuredGrid { points, .. }
            | Self::UnstructuredGrid { points, .. }
            | Self::PolyData { points, .. } => Some(points),
            Self::ImageData { .. } | Self::RectilinearGrid { .. } => None,
        }
    }

    pub fn n_points(&self) -> usize {
        match self.extent() {
            Some(extent) => extent.num_points(),
            None => self.points().map(|p| p.nrows()).unwrap_or(0),
        }
    }

    pub fn n_cells(&self) -> usize {
        match self {
            Self::ImageData { extent, .. }
            | Self::RectilinearGrid { extent, .. }
            | Self::StructuredGrid { extent, .. } => extent.num_cells(),
            Self::UnstructuredGrid { cells, .. } => cells.len(),
            Self::PolyData {
                verts,
                lines,
                strips,
                polys,
                ..
            } => verts.len() + lines.len() + strips.len() + polys.len(),
        }
    }

    /// an empty geometry of the same kind
    pub(crate) fn empty_like(&self) -> Self {
        match self {
            Self::ImageData { origin, spacing, .. } => Self::ImageData {
                extent: Extent::empty(),
                origin: *origin,
                spacing: *spacing,
            },
            Self::RectilinearGrid { .. } => Self::RectilinearGrid {
                extent: Extent::empty(),
                x: Array1::zeros(0),
                y: Array1::zeros(0),
                z: Array1::zeros(0),
            },
            Self::StructuredGrid { .. } => Self::StructuredGrid {
                extent: Extent::empty(),
                points: Array2::zeros((0, 3)),
                blanking: None,
            },
            Self::UnstructuredGrid { .. } => Self::UnstructuredGrid {
                points: Array2::zeros((0, 3)),
                cells: CellArray::default(),
                cell_types: Vec::new(),
            },
            Self::PolyData { .. } => Self::PolyData {
                points: Array2::zeros((0, 3)),
                verts: CellArray::default(),
                lines: CellArray::default(),
                strips: CellArray::default(),
                polys: CellArray::default(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A single dataset: geometry plus point, cell and field data
pub struct Mesh {
    pub geometry: Geometry,
    pub point_data: Attributes,
    pub cell_data: Attributes,
    pub field_data: Attributes,
}

impl Mesh {
    /// a mesh with no data arrays
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            point_data: Attributes::new(),
            cell_data: Attributes::new(),
            field_data: Attributes::new(),
        }
    }

    pub fn n_points(&self) -> usize {
        self.geometry.n_points()
    }

    pub fn n_cells(&self) -> usize {
        self.geometry.n_cells()
    }

    /// names of every array: point data, then cell data, then field data
    pub fn array_names(&self) -> Vec<String> {
        self.point_data
            .iter()
            .chain(self.cell_data.iter())
            .chain(self.field_data.iter())
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn n_arrays(&self) -> usize {
        self.point_data.len() + self.cell_data.len() + self.field_data.len()
    }

    /// look an array up by name in point, then cell, then field data
    pub fn array(&self, name: &str) -> Option<&DataArray> {
        self.point_data
            .get(name)
            .or_else(|| self.cell_data.get(name))
            .or_else(|| self.field_data.get(name))
    }

    /// whether the mesh holds no points
    pub fn is_empty(&self) -> bool {
        self.n_points() == 0
    }
}
