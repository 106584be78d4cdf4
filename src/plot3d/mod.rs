//! Multi-block Plot3D grids, solutions and function files
//!
//! A Plot3D data set is a grid file (`.xyz`) optionally paired with solution files
//! (`.q`) holding the conserved flow variables, and a function file (`.f`) holding
//! arbitrary per point variables. [`Plot3DReader`] reads one block per grid block,
//! and computes the requested [`Plot3DFunction`]s from the active solution.
//!
//! ```no_run
//! use vtk_readers::prelude::*;
//! use vtk_readers::Plot3DReader;
//!
//! let mut reader = Plot3DReader::new("multi-bin.xyz")?;
//! reader.add_q_file("multi-bin.q")?;
//! reader.add_function(112)?;
//! reader.add_function(Plot3DReader::KINETIC_ENERGY)?;
//!
//! let blocks = reader.read()?;
//! # Ok::<(), vtk_readers::Error>(())
//! ```

mod format;
mod functions;
mod meta;

pub use format::{
    detect_layout, read_functions, read_grid, read_q, FileFormat, FileLayout, GridBlock, LayoutError,
    Precision, QBlock,
};
pub use functions::Plot3DFunction;
pub use meta::{MetaEntry, Plot3DMeta, Plot3DMetaDecoder};

use functions::{FlowField, GasModel};

use crate::mesh::Extent;
use crate::prelude::*;
use crate::reader::Progress;
use crate::registry::ReaderKind;
use crate::selection::SelectionState;
use crate::time::TimeCursor;

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Settings read by a [`Plot3DReader`] when decoding
pub struct Plot3DOptions {
    /// detect the file layout from the grid file instead of using `layout`
    pub auto_detect_format: bool,
    /// keep functions that were only computed as inputs of requested functions, on by
    /// default as in VTK's PLOT3D reader
    pub preserve_intermediate_functions: bool,
    /// ratio of specific heats
    pub gamma: f64,
    pub r_gas_constant: f64,
    pub layout: FileLayout,
}

impl Default for Plot3DOptions {
    fn default() -> Self {
        Self {
            auto_detect_format: true,
            preserve_intermediate_functions: true,
            gamma: 1.4,
            r_gas_constant: 1.0,
            layout: FileLayout::default(),
        }
    }
}

/// Values that identify a [`Plot3DFunction`]: the function itself or its numeric id
pub trait IntoFunction {
    fn into_function(self) -> Result<Plot3DFunction, Error>;
}

impl IntoFunction for Plot3DFunction {
    fn into_function(self) -> Result<Plot3DFunction, Error> {
        Ok(self)
    }
}

fn function_from_id(id: i64) -> Result<Plot3DFunction, Error> {
    Plot3DFunction::from_id(id).ok_or_else(|| Error::InvalidConfigValue {
        setting: "function",
        message: format!("{id} is not a Plot3D function id"),
    })
}

impl IntoFunction for i32 {
    fn into_function(self) -> Result<Plot3DFunction, Error> {
        function_from_id(self as i64)
    }
}

impl IntoFunction for u32 {
    fn into_function(self) -> Result<Plot3DFunction, Error> {
        function_from_id(self as i64)
    }
}

/// The files and settings of a single decode
pub(crate) struct Plot3DInputs<'a> {
    pub xyz: &'a Path,
    pub q: Option<&'a Path>,
    pub function: Option<&'a Path>,
    pub function_names: &'a [String],
    pub functions: &'a BTreeSet<Plot3DFunction>,
    pub options: &'a Plot3DOptions,
    /// point arrays missing from the selection or enabled in it are kept
    pub selection: Option<&'a SelectionState>,
}

fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::decode(path, e))
}

/// decode the grid and its optional solution and function files into one mesh per
/// grid block
pub(crate) fn decode_blocks(inputs: &Plot3DInputs<'_>, progress: &Progress) -> Result<MultiBlock, Error> {
    let xyz = inputs.xyz;
    let grid_bytes = read_file(xyz)?;

    let layout = if inputs.options.auto_detect_format {
        detect_layout(&grid_bytes).map_err(|e| Error::decode(xyz, e))?
    } else {
        inputs.options.layout
    };
    tracing::debug!(path = %xyz.display(), ?layout, "plot3d layout");

    let grid = read_grid(&grid_bytes, &layout).map_err(|e| Error::decode(xyz, e))?;

    let solution = match inputs.q {
        Some(path) => Some(read_q(&read_file(path)?, &layout, &grid).map_err(|e| Error::decode(path, e))?),
        None => None,
    };

    let variables = match inputs.function {
        Some(path) => {
            Some(read_functions(&read_file(path)?, &layout, &grid).map_err(|e| Error::decode(path, e))?)
        }
        None => None,
    };

    let total = grid.len();
    let mut blocks = MultiBlock::new();

    for (index, block) in grid.iter().enumerate() {
        let [ni, nj, nk] = block.dims;
        let mut mesh = Mesh::new(Geometry::StructuredGrid {
            extent: Extent::new(ni, nj, nk),
            points: block.points.clone(),
            blanking: block.iblank.clone(),
        });

        if let Some(q) = solution.as_ref().and_then(|s| s.get(index)) {
            mesh.point_data.insert(DataArray::scalars("Density", q.density.clone()));
            mesh.point_data.insert(DataArray::from_array("Momentum", q.momentum.clone()));
            mesh.point_data.insert(DataArray::scalars("StagnationEnergy", q.energy.clone()));
            mesh.field_data.insert(DataArray::scalars("Properties", q.properties.to_vec()));

            let gas = GasModel {
                gamma: inputs.options.gamma,
                r: inputs.options.r_gas_constant,
                fsmach: q.properties[0],
            };
            let derived = FlowField::new(block.dims, &block.points, q, gas)
                .compute(inputs.functions, inputs.options.preserve_intermediate_functions);
            for array in derived {
                mesh.point_data.insert(array);
            }
        }

        if let Some(values) = variables.as_ref().and_then(|v| v.get(index)) {
            for (position, values) in values.iter().enumerate() {
                let name = inputs
                    .function_names
                    .get(position)
                    .cloned()
                    .unwrap_or_else(|| format!("Function{position}"));
                mesh.point_data.insert(DataArray::scalars(name, values.clone()));
            }
        }

        if let Some(selection) = inputs.selection {
            for name in mesh.point_data.names() {
                if !selection.is_enabled(ArrayDomain::Point, &name) {
                    mesh.point_data.remove(&name);
                }
            }
        }

        blocks.push(None::<String>, mesh);
        progress.step(index + 1, total);
    }

    Ok(blocks)
}

/// Reader for a Plot3D grid file with optional solution and function files
///
/// Every solution file added with [`Plot3DReader::add_q_file`] is one timestep, so a
/// reader with several solution files implements [`TimeSeries`] over the time values
/// `0, 1, ..`.
#[derive(Debug, Clone)]
pub struct Plot3DReader {
    path: PathBuf,
    q_files: Vec<PathBuf>,
    function_file: Option<PathBuf>,
    function_names: Vec<String>,
    functions: BTreeSet<Plot3DFunction>,
    options: Plot3DOptions,
    time: TimeCursor,
    progress: bool,
}

impl Plot3DReader {
    pub const DENSITY: Plot3DFunction = Plot3DFunction::Density;
    pub const PRESSURE: Plot3DFunction = Plot3DFunction::Pressure;
    pub const PRESSURE_COEFFICIENT: Plot3DFunction = Plot3DFunction::PressureCoefficient;
    pub const MACH_NUMBER: Plot3DFunction = Plot3DFunction::MachNumber;
    pub const SOUND_SPEED: Plot3DFunction = Plot3DFunction::SoundSpeed;
    pub const TEMPERATURE: Plot3DFunction = Plot3DFunction::Temperature;
    pub const ENTHALPY: Plot3DFunction = Plot3DFunction::Enthalpy;
    pub const INTERNAL_ENERGY: Plot3DFunction = Plot3DFunction::InternalEnergy;
    pub const KINETIC_ENERGY: Plot3DFunction = Plot3DFunction::KineticEnergy;
    pub const VELOCITY_MAGNITUDE: Plot3DFunction = Plot3DFunction::VelocityMagnitude;
    pub const STAGNATION_ENERGY: Plot3DFunction = Plot3DFunction::StagnationEnergy;
    pub const ENTROPY: Plot3DFunction = Plot3DFunction::Entropy;
    pub const SWIRL: Plot3DFunction = Plot3DFunction::Swirl;
    pub const VELOCITY: Plot3DFunction = Plot3DFunction::Velocity;
    pub const VORTICITY: Plot3DFunction = Plot3DFunction::Vorticity;
    pub const MOMENTUM: Plot3DFunction = Plot3DFunction::Momentum;
    pub const PRESSURE_GRADIENT: Plot3DFunction = Plot3DFunction::PressureGradient;
    pub const VORTICITY_MAGNITUDE: Plot3DFunction = Plot3DFunction::VorticityMagnitude;
    pub const STRAIN_RATE: Plot3DFunction = Plot3DFunction::StrainRate;

    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        Error::check_exists(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            q_files: Vec::new(),
            function_file: None,
            function_names: Vec::new(),
            functions: BTreeSet::new(),
            options: Plot3DOptions::default(),
            time: TimeCursor::default(),
            progress: false,
        })
    }

    pub fn q_files(&self) -> &[PathBuf] {
        &self.q_files
    }

    /// add a solution file as the next timestep
    pub fn add_q_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        self.add_q_files([path])
    }

    /// Add several solution files. Nothing is added unless every path exists.
    pub fn add_q_files<I, P>(&mut self, paths: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        for path in &paths {
            Error::check_exists(path)?;
        }

        self.q_files.extend(paths);
        let values = (0..self.q_files.len()).map(|i| i as f64).collect();
        self.time.replace_values(values);

        tracing::debug!(path = %self.path.display(), q_files = self.q_files.len(), "added q files");
        Ok(())
    }

    pub fn function_file(&self) -> Option<&Path> {
        self.function_file.as_deref()
    }

    pub fn set_function_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        Error::check_exists(path)?;
        self.function_file = Some(path.to_path_buf());
        Ok(())
    }

    pub fn function_names(&self) -> &[String] {
        &self.function_names
    }

    /// names of the variables of the function file, in file order
    pub fn set_function_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.function_names = names.into_iter().map(Into::into).collect();
    }

    /// the requested functions, ordered by id
    pub fn functions(&self) -> Vec<Plot3DFunction> {
        self.functions.iter().copied().collect()
    }

    /// Request a function, by value or by id. Requesting a function twice has no
    /// further effect.
    pub fn add_function<F: IntoFunction>(&mut self, function: F) -> Result<(), Error> {
        self.functions.insert(function.into_function()?);
        Ok(())
    }

    /// Remove a function, by value or by id. Removing a function that was not
    /// requested is not an error.
    pub fn remove_function<F: IntoFunction>(&mut self, function: F) -> Result<(), Error> {
        self.functions.remove(&function.into_function()?);
        Ok(())
    }

    pub fn remove_all_functions(&mut self) {
        self.functions.clear();
    }

    pub fn options(&self) -> &Plot3DOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Plot3DOptions {
        &mut self.options
    }

    pub fn auto_detect_format(&self) -> bool {
        self.options.auto_detect_format
    }

    pub fn set_auto_detect_format(&mut self, enabled: bool) {
        self.options.auto_detect_format = enabled;
    }

    pub fn preserve_intermediate_functions(&self) -> bool {
        self.options.preserve_intermediate_functions
    }

    pub fn set_preserve_intermediate_functions(&mut self, enabled: bool) {
        self.options.preserve_intermediate_functions = enabled;
    }

    pub fn gamma(&self) -> f64 {
        self.options.gamma
    }

    pub fn set_gamma(&mut self, gamma: f64) {
        self.options.gamma = gamma;
    }

    pub fn r_gas_constant(&self) -> f64 {
        self.options.r_gas_constant
    }

    pub fn set_r_gas_constant(&mut self, r: f64) {
        self.options.r_gas_constant = r;
    }

    fn active_q_file(&self) -> Option<&Path> {
        self.q_files.get(self.time.active_index()).map(PathBuf::as_path)
    }
}

impl Reader for Plot3DReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn kind(&self) -> ReaderKind {
        ReaderKind::Plot3D
    }

    fn read(&self) -> Result<Dataset, Error> {
        let progress = Progress::new(ReaderKind::Plot3D.to_string(), self.progress);
        let inputs = Plot3DInputs {
            xyz: &self.path,
            q: self.active_q_file(),
            function: self.function_file.as_deref(),
            function_names: &self.function_names,
            functions: &self.functions,
            options: &self.options,
            selection: None,
        };

        let blocks = decode_blocks(&inputs, &progress)?;
        tracing::debug!(path = %self.path.display(), blocks = blocks.len(), "decoded plot3d grid");

        Ok(Dataset::MultiBlock(blocks))
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

    fn time(&self) -> Option<&dyn TimeSeries> {
        (!self.q_files.is_empty()).then(|| self as &dyn TimeSeries)
    }

    fn time_mut(&mut self) -> Option<&mut dyn TimeSeries> {
        if self.q_files.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl TimeSeries for Plot3DReader {
    fn time_values(&self) -> &[f64] {
        self.time.values()
    }

    fn active_time_index(&self) -> usize {
        self.time.active_index()
    }

    fn set_active_time_value(&mut self, value: f64) -> Result<(), Error> {
        self.time.set_active_value(value)?;
        Ok(())
    }

    fn set_active_time_point(&mut self, index: usize) -> Result<(), Error> {
        self.time.set_active_index(index)
    }
}
