//! `.p3d` meta files: JSON documents describing the layout of a Plot3D data set and
//! the grid, solution and function files of each of its timesteps.
//!
//! ```json
//! {
//!     "auto-detect-format": false,
//!     "format": "binary",
//!     "byte-order": "big",
//!     "precision": 32,
//!     "multi-grid": true,
//!     "language": "C",
//!     "filenames": [
//!         { "time": 3.5, "xyz": "combxyz.bin", "q": "combq.1.bin", "function": "combf.1.bin" },
//!         { "time": 4.5, "xyz": "combxyz.bin", "q": "combq.2.bin" }
//!     ],
//!     "function-names": ["density", "velocity"]
//! }
//! ```

use super::format::{FileFormat, Precision};
use super::{decode_blocks, Plot3DInputs, Plot3DOptions};
use crate::prelude::*;
use crate::reader::{Catalog, CatalogQuery, DecodeRequest};
use crate::utils::{is_close, ByteOrder};

use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Deserialize)]
/// The files of a single timestep, relative to the meta file
pub struct MetaEntry {
    pub time: f64,
    pub xyz: PathBuf,
    pub q: Option<PathBuf>,
    pub function: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
/// Contents of a `.p3d` file. Absent keys keep the [`Plot3DOptions`] defaults.
pub struct Plot3DMeta {
    pub auto_detect_format: Option<bool>,
    pub byte_order: Option<String>,
    pub precision: Option<u32>,
    pub multi_grid: Option<bool>,
    pub format: Option<String>,
    pub blanking: Option<bool>,
    pub language: Option<String>,
    #[serde(rename = "2D")]
    pub two_dimensional: Option<bool>,
    #[serde(rename = "R")]
    pub r: Option<f64>,
    pub gamma: Option<f64>,
    #[serde(default)]
    pub filenames: Vec<MetaEntry>,
    #[serde(default)]
    pub function_names: Vec<String>,
}

fn invalid(setting: &'static str, value: impl std::fmt::Display) -> Error {
    Error::InvalidConfigValue {
        setting,
        message: format!("unknown value `{value}`"),
    }
}

impl Plot3DMeta {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path).map_err(|e| Error::decode(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::decode(path, e))
    }

    /// Decoding options described by the file. Unknown string values fail with
    /// [`Error::InvalidConfigValue`].
    pub fn options(&self) -> Result<Plot3DOptions, Error> {
        let mut options = Plot3DOptions::default();
        let layout = &mut options.layout;

        if let Some(auto) = self.auto_detect_format {
            options.auto_detect_format = auto;
        }

        if let Some(format) = &self.format {
            layout.format = match format.to_ascii_lowercase().as_str() {
                "binary" => FileFormat::Binary,
                "ascii" => FileFormat::Ascii,
                _ => return Err(invalid("format", format)),
            };
        }

        if let Some(order) = &self.byte_order {
            layout.byte_order = match order.to_ascii_lowercase().as_str() {
                "little" => ByteOrder::LittleEndian,
                "big" => ByteOrder::BigEndian,
                _ => return Err(invalid("byte-order", order)),
            };
        }

        if let Some(precision) = self.precision {
            layout.precision = match precision {
                32 => Precision::Single,
                64 => Precision::Double,
                _ => return Err(invalid("precision", precision)),
            };
        }

        if let Some(language) = &self.language {
            layout.fortran_records = match language.to_ascii_lowercase().as_str() {
                "c" => false,
                "fortran" => true,
                _ => return Err(invalid("language", language)),
            };
        }

        layout.multi_grid = self.multi_grid.unwrap_or(layout.multi_grid);
        layout.iblanking = self.blanking.unwrap_or(layout.iblanking);
        layout.two_dimensional = self.two_dimensional.unwrap_or(layout.two_dimensional);

        if let Some(r) = self.r {
            options.r_gas_constant = r;
        }
        if let Some(gamma) = self.gamma {
            options.gamma = gamma;
        }

        Ok(options)
    }

    /// the time values of every entry, ascending and without duplicates
    pub fn time_values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.filenames.iter().map(|e| e.time).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }

    /// the first entry registered for `time`
    pub fn entry_at(&self, time: f64) -> Option<&MetaEntry> {
        self.filenames.iter().find(|e| is_close(e.time, time))
    }
}

#[derive(Debug, Default, Clone, Copy)]
/// Decoder for `.p3d` meta files, one timestep per `filenames` entry
pub struct Plot3DMetaDecoder;

impl Decoder for Plot3DMetaDecoder {
    fn catalog(&self, path: &Path, _query: &CatalogQuery<'_>) -> Result<Catalog, Error> {
        let meta = Plot3DMeta::from_path(path)?;
        let mut point_arrays = Vec::new();

        if meta.filenames.iter().any(|e| e.q.is_some()) {
            point_arrays.extend(["Density", "Momentum", "StagnationEnergy"].map(String::from));
        }
        if meta.filenames.iter().any(|e| e.function.is_some()) {
            point_arrays.extend(meta.function_names.iter().cloned());
        }

        Ok(Catalog {
            point_arrays,
            time_values: meta.time_values(),
            ..Catalog::default()
        })
    }

    fn decode(&self, path: &Path, request: &DecodeRequest<'_>) -> Result<Dataset, Error> {
        let meta = Plot3DMeta::from_path(path)?;
        let options = meta.options()?;

        let entry = match request.time {
            Some(time) => meta.entry_at(time),
            None => meta.filenames.first(),
        }
        .ok_or_else(|| Error::InvalidConfigValue {
            setting: "filenames",
            message: format!("no grid file is listed for time {:?}", request.time),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let xyz = base.join(&entry.xyz);
        let q = entry.q.as_ref().map(|q| base.join(q));
        let function = entry.function.as_ref().map(|f| base.join(f));
        let functions = BTreeSet::new();

        let inputs = Plot3DInputs {
            xyz: &xyz,
            q: q.as_deref(),
            function: function.as_deref(),
            function_names: &meta.function_names,
            functions: &functions,
            options: &options,
            selection: Some(request.selection),
        };

        let blocks = decode_blocks(&inputs, request.progress)?;
        tracing::debug!(path = %path.display(), time = entry.time, blocks = blocks.len(), "decoded plot3d meta file");

        Ok(Dataset::MultiBlock(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_every_key() {
        let meta: Plot3DMeta = serde_json::from_str(
            r#"{
                "auto-detect-format": false,
                "format": "ascii",
                "byte-order": "big",
                "precision": 64,
                "multi-grid": true,
                "blanking": true,
                "language": "fortran",
                "2D": true,
                "R": 287.0,
                "gamma": 1.3,
                "filenames": [
                    {"time": 4.5, "xyz": "grid.xyz", "q": "b.q"},
                    {"time": 3.5, "xyz": "grid.xyz", "q": "a.q", "function": "a.f"}
                ],
                "function-names": ["density", "velocity"]
            }"#,
        )
        .unwrap();

        let options = meta.options().unwrap();
        assert!(!options.auto_detect_format);
        assert_eq!(options.gamma, 1.3);
        assert_eq!(options.r_gas_constant, 287.0);
        assert_eq!(options.layout.format, FileFormat::Ascii);
        assert_eq!(options.layout.byte_order, ByteOrder::BigEndian);
        assert_eq!(options.layout.precision, Precision::Double);
        assert!(options.layout.multi_grid);
        assert!(options.layout.iblanking);
        assert!(options.layout.fortran_records);
        assert!(options.layout.two_dimensional);

        assert_eq!(meta.time_values(), vec![3.5, 4.5]);
        assert_eq!(meta.entry_at(3.5).and_then(|e| e.function.clone()), Some(PathBuf::from("a.f")));
        assert!(meta.entry_at(1.0).is_none());
    }

    #[test]
    fn absent_keys_keep_defaults() {
        let meta: Plot3DMeta = serde_json::from_str(r#"{"filenames": []}"#).unwrap();
        assert_eq!(meta.options().unwrap(), Plot3DOptions::default());
    }

    #[test]
    fn unknown_values_are_rejected() {
        let meta: Plot3DMeta = serde_json::from_str(r#"{"byte-order": "middle"}"#).unwrap();
        let err = meta.options().unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { setting: "byte-order", .. }));

        let meta: Plot3DMeta = serde_json::from_str(r#"{"precision": 16}"#).unwrap();
        assert!(meta.options().is_err());
    }
}
