//! Static table mapping file suffixes, file contents and directory layouts to reader
//! kinds.
//!
//! The table is built at compile time and never mutated, so [`FormatRegistry::global`]
//! can be shared freely.

use crate::prelude::*;
use crate::utils::lowercase_file_name;

use quick_xml::events::Event;
use quick_xml::reader::Reader as XmlReader;

use std::fmt;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Every format a reader can be constructed for
pub enum ReaderKind {
    AvsUcd,
    BinaryMarchingCubes,
    Bmp,
    Byu,
    Cgns,
    Dem,
    Dicom,
    EnSight,
    Facet,
    Fluent,
    Gambit,
    GeSigna,
    Gif,
    Hdf,
    Hdr,
    Jpeg,
    LegacyVtk,
    MetaImage,
    Mfix,
    Nifti,
    Nrrd,
    Obj,
    OpenFoam,
    /// raw Plot3D grids, constructed directly through [`Plot3DReader`](crate::Plot3DReader)
    Plot3D,
    Plot3DMeta,
    Ply,
    Png,
    Pnm,
    Pts,
    Pvd,
    PVtk,
    PVtr,
    PVtu,
    Slc,
    Stl,
    Tecplot,
    Tiff,
    Xdmf,
    XmlImageData,
    XmlMultiBlock,
    XmlPolyData,
    XmlRectilinearGrid,
    XmlStructuredGrid,
    XmlUnstructuredGrid,
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl ReaderKind {
    /// the `VTKFile type` attribute of the serial VTK XML kinds
    pub fn xml_type(&self) -> Option<&'static str> {
        match self {
            Self::XmlImageData => Some("ImageData"),
            Self::XmlRectilinearGrid => Some("RectilinearGrid"),
            Self::XmlStructuredGrid => Some("StructuredGrid"),
            Self::XmlUnstructuredGrid => Some("UnstructuredGrid"),
            Self::XmlPolyData => Some("PolyData"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Content check used when several kinds share a suffix
pub enum Probe {
    /// the file is not a VTK XML document
    LegacyVtk,
    /// the file is a VTK XML document with this `type` attribute
    XmlType(&'static str),
}

impl Probe {
    fn matches(&self, xml_type: Option<&str>) -> bool {
        match self {
            Self::LegacyVtk => xml_type.is_none(),
            Self::XmlType(expected) => xml_type == Some(*expected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Content check for directory inputs
pub enum DirectoryProbe {
    /// some entry of the directory carries this extension
    ContainsExtension(&'static str),
    /// this relative path exists inside the directory
    ContainsPath(&'static str),
}

impl DirectoryProbe {
    fn matches(&self, directory: &Path) -> bool {
        match self {
            Self::ContainsExtension(extension) => std::fs::read_dir(directory)
                .map(|entries| {
                    entries.filter_map(|e| e.ok()).any(|entry| {
                        entry
                            .path()
                            .extension()
                            .and_then(|e| e.to_str())
                            .map(|e| e.eq_ignore_ascii_case(extension))
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false),
            Self::ContainsPath(relative) => directory.join(relative).exists(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether a kind is constructed from a file, a directory, or either
pub enum Arity {
    File,
    Directory,
    FileOrDirectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How a directory is recognised, and how strongly. The highest specificity among
/// matching rules wins.
pub struct DirectoryRule {
    pub probe: DirectoryProbe,
    pub specificity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderDescriptor {
    pub kind: ReaderKind,
    /// lowercase suffixes including the leading dot
    pub suffixes: &'static [&'static str],
    pub probe: Option<Probe>,
    pub arity: Arity,
    pub directory: Option<DirectoryRule>,
}

impl ReaderDescriptor {
    const fn file(kind: ReaderKind, suffixes: &'static [&'static str]) -> Self {
        Self {
            kind,
            suffixes,
            probe: None,
            arity: Arity::File,
            directory: None,
        }
    }

    const fn probed(kind: ReaderKind, suffixes: &'static [&'static str], probe: Probe) -> Self {
        Self {
            kind,
            suffixes,
            probe: Some(probe),
            arity: Arity::File,
            directory: None,
        }
    }

    const fn with_directory(mut self, probe: DirectoryProbe, specificity: u8) -> Self {
        self.arity = Arity::FileOrDirectory;
        self.directory = Some(DirectoryRule { probe, specificity });
        self
    }

    pub fn accepts_directory(&self) -> bool {
        matches!(self.arity, Arity::Directory | Arity::FileOrDirectory)
    }

    pub fn accepts_file(&self) -> bool {
        matches!(self.arity, Arity::File | Arity::FileOrDirectory)
    }

    /// length of the longest suffix of this descriptor that `file_name` ends with
    fn suffix_match(&self, file_name: &str) -> Option<usize> {
        self.suffixes
            .iter()
            .filter(|suffix| file_name.ends_with(*suffix) && file_name.len() > suffix.len())
            .map(|suffix| suffix.len())
            .max()
    }
}

use ReaderKind as K;

static DESCRIPTORS: &[ReaderDescriptor] = &[
    ReaderDescriptor::file(K::AvsUcd, &[".inp", ".avsucd"]),
    ReaderDescriptor::file(K::BinaryMarchingCubes, &[".tri"]),
    ReaderDescriptor::file(K::Bmp, &[".bmp"]),
    ReaderDescriptor::file(K::Byu, &[".g", ".byu"]),
    ReaderDescriptor::file(K::Cgns, &[".cgns"]),
    ReaderDescriptor::file(K::Dem, &[".dem"]),
    ReaderDescriptor::file(K::Dicom, &[".dcm"]).with_directory(DirectoryProbe::ContainsExtension("dcm"), 1),
    ReaderDescriptor::file(K::EnSight, &[".case"]),
    ReaderDescriptor::file(K::Facet, &[".facet"]),
    ReaderDescriptor::file(K::Fluent, &[".cas"]),
    ReaderDescriptor::file(K::Gambit, &[".neu"]),
    ReaderDescriptor::file(K::GeSigna, &[".mr"]),
    ReaderDescriptor::file(K::Gif, &[".gif"]),
    ReaderDescriptor::file(K::Hdf, &[".hdf", ".vtkhdf"]),
    ReaderDescriptor::file(K::Hdr, &[".hdr"]),
    ReaderDescriptor::file(K::Jpeg, &[".jpg", ".jpeg"]),
    ReaderDescriptor::probed(K::LegacyVtk, &[".vtk"], Probe::LegacyVtk),
    ReaderDescriptor::file(K::MetaImage, &[".mha", ".mhd"]),
    ReaderDescriptor::file(K::Mfix, &[".res"]),
    ReaderDescriptor::file(K::Nifti, &[".nii", ".nii.gz"]),
    ReaderDescriptor::file(K::Nrrd, &[".nrrd", ".nhdr"]),
    ReaderDescriptor::file(K::Obj, &[".obj"]),
    ReaderDescriptor::file(K::OpenFoam, &[".foam"])
        .with_directory(DirectoryProbe::ContainsPath("system/controlDict"), 2),
    ReaderDescriptor::file(K::Plot3DMeta, &[".p3d"]),
    ReaderDescriptor::file(K::Ply, &[".ply"]),
    ReaderDescriptor::file(K::Png, &[".png"]),
    ReaderDescriptor::file(K::Pnm, &[".pnm", ".pgm", ".ppm"]),
    ReaderDescriptor::file(K::Pts, &[".pts"]),
    ReaderDescriptor::file(K::Pvd, &[".pvd"]),
    ReaderDescriptor::file(K::PVtk, &[".pvtk"]),
    ReaderDescriptor::file(K::PVtr, &[".pvtr"]),
    ReaderDescriptor::file(K::PVtu, &[".pvtu"]),
    ReaderDescriptor::file(K::Slc, &[".slc"]),
    ReaderDescriptor::file(K::Stl, &[".stl"]),
    ReaderDescriptor::file(K::Tecplot, &[".dat"]),
    ReaderDescriptor::file(K::Tiff, &[".tif", ".tiff"]),
    ReaderDescriptor::file(K::Xdmf, &[".xdmf"]),
    ReaderDescriptor::probed(K::XmlImageData, &[".vti", ".vtk"], Probe::XmlType("ImageData")),
    ReaderDescriptor::file(K::XmlMultiBlock, &[".vtm", ".vtmb"]),
    ReaderDescriptor::probed(K::XmlPolyData, &[".vtp", ".vtk"], Probe::XmlType("PolyData")),
    ReaderDescriptor::probed(
        K::XmlRectilinearGrid,
        &[".vtr", ".vtk"],
        Probe::XmlType("RectilinearGrid"),
    ),
    ReaderDescriptor::probed(
        K::XmlStructuredGrid,
        &[".vts", ".vtk"],
        Probe::XmlType("StructuredGrid"),
    ),
    ReaderDescriptor::probed(
        K::XmlUnstructuredGrid,
        &[".vtu", ".vtk"],
        Probe::XmlType("UnstructuredGrid"),
    ),
];

static GLOBAL: FormatRegistry = FormatRegistry {
    descriptors: DESCRIPTORS,
};

#[derive(Debug)]
/// Lookup from a path to the [`ReaderDescriptor`] that handles it
pub struct FormatRegistry {
    descriptors: &'static [ReaderDescriptor],
}

impl FormatRegistry {
    /// the process wide registry
    pub fn global() -> &'static FormatRegistry {
        &GLOBAL
    }

    pub fn descriptors(&self) -> &[ReaderDescriptor] {
        self.descriptors
    }

    pub fn descriptor(&self, kind: ReaderKind) -> Option<&ReaderDescriptor> {
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    /// resolve a directory or a file path
    pub fn resolve(&self, path: &Path) -> Result<&ReaderDescriptor, Error> {
        if path.is_dir() {
            self.resolve_directory(path)
        } else {
            self.resolve_file(path)
        }
    }

    /// Resolve a file path by its longest matching suffix, probing the file contents
    /// when several kinds share that suffix. A file that cannot be opened falls back
    /// to the first candidate, so a missing path is reported at construction.
    pub fn resolve_file(&self, path: &Path) -> Result<&ReaderDescriptor, Error> {
        let file_name = lowercase_file_name(path)
            .ok_or_else(|| Error::unsupported(path, "path has no file name"))?;

        let longest = self
            .descriptors
            .iter()
            .filter_map(|d| d.suffix_match(&file_name))
            .max()
            .ok_or_else(|| Error::unsupported(path, "no reader is registered for this file suffix"))?;

        let candidates: Vec<&ReaderDescriptor> = self
            .descriptors
            .iter()
            .filter(|d| d.suffix_match(&file_name) == Some(longest))
            .collect();

        let descriptor = match candidates.as_slice() {
            [only] => *only,
            _ => {
                let xml_type = sniff_xml_type(path);
                candidates
                    .iter()
                    .find(|d| d.probe.map(|p| p.matches(xml_type.as_deref())).unwrap_or(false))
                    .or_else(|| candidates.first())
                    .copied()
                    .ok_or_else(|| Error::unsupported(path, "no reader matches the file contents"))?
            }
        };

        tracing::debug!(path = %path.display(), kind = %descriptor.kind, "resolved reader");
        Ok(descriptor)
    }

    /// Resolve a directory by inspecting its contents. The matching rule with the
    /// highest specificity wins.
    pub fn resolve_directory(&self, path: &Path) -> Result<&ReaderDescriptor, Error> {
        let descriptor = self
            .descriptors
            .iter()
            .filter_map(|d| d.directory.map(|rule| (d, rule)))
            .filter(|(_, rule)| rule.probe.matches(path))
            .max_by_key(|(_, rule)| rule.specificity)
            .map(|(d, _)| d)
            .ok_or_else(|| Error::unsupported(path, "no reader recognises the directory contents"))?;

        tracing::debug!(path = %path.display(), kind = %descriptor.kind, "resolved directory reader");
        Ok(descriptor)
    }
}

/// the `type` attribute of a `VTKFile` root element, if the file starts like one
fn sniff_xml_type(path: &Path) -> Option<String> {
    let mut head = Vec::new();
    std::fs::File::open(path)
        .ok()?
        .take(4096)
        .read_to_end(&mut head)
        .ok()?;

    let mut reader = XmlReader::from_reader(head.as_slice());
    let mut buffer = Vec::new();

    loop {
        match reader.read_event_into(&mut buffer).ok()? {
            Event::Start(start) | Event::Empty(start) => {
                if start.name().as_ref() != b"VTKFile" {
                    return None;
                }
                return start
                    .attributes()
                    .filter_map(|a| a.ok())
                    .find(|a| a.key.as_ref() == b"type")
                    .and_then(|a| a.unescape_value().ok())
                    .map(|v| v.into_owned());
            }
            Event::Eof => return None,
            _ => (),
        }
        buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_are_case_insensitive_and_longest_first() {
        let registry = FormatRegistry::global();

        let kind = |name: &str| registry.resolve_file(Path::new(name)).map(|d| d.kind).unwrap();

        assert_eq!(kind("brain.nii.gz"), ReaderKind::Nifti);
        assert_eq!(kind("BRAIN.NII"), ReaderKind::Nifti);
        assert_eq!(kind("mesh.VTU"), ReaderKind::XmlUnstructuredGrid);
        assert_eq!(kind("missing.vtk"), ReaderKind::LegacyVtk);
        assert!(registry.resolve_file(Path::new("archive.gz")).is_err());
        assert!(registry.resolve_file(Path::new("grid.xyz")).is_err());
    }

    #[test]
    fn directory_specificities_are_unique() {
        let mut specificities: Vec<u8> = FormatRegistry::global()
            .descriptors()
            .iter()
            .filter_map(|d| d.directory.map(|rule| rule.specificity))
            .collect();
        let total = specificities.len();

        specificities.sort_unstable();
        specificities.dedup();
        assert_eq!(specificities.len(), total);
    }

    #[test]
    fn suffixes_are_lowercase_and_unique_per_kind() {
        for descriptor in FormatRegistry::global().descriptors() {
            for suffix in descriptor.suffixes {
                assert!(suffix.starts_with('.'));
                assert_eq!(*suffix, suffix.to_ascii_lowercase());
            }
        }

        let mut kinds: Vec<String> = FormatRegistry::global()
            .descriptors()
            .iter()
            .map(|d| d.kind.to_string())
            .collect();
        let total = kinds.len();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), total);
    }

    #[test]
    fn xml_content_selects_kind() {
        let dir = tempfile::tempdir().unwrap();

        let xml = dir.path().join("surface.vtk");
        std::fs::write(&xml, r#"<?xml version="1.0"?><VTKFile type="PolyData"></VTKFile>"#).unwrap();
        let legacy = dir.path().join("legacy.vtk");
        std::fs::write(&legacy, "# vtk DataFile Version 3.0\nlegacy\nASCII\n").unwrap();

        let registry = FormatRegistry::global();
        assert_eq!(registry.resolve(&xml).unwrap().kind, ReaderKind::XmlPolyData);
        assert_eq!(registry.resolve(&legacy).unwrap().kind, ReaderKind::LegacyVtk);
    }

    #[test]
    fn most_specific_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("system")).unwrap();
        std::fs::write(dir.path().join("system/controlDict"), "").unwrap();
        std::fs::write(dir.path().join("slice.dcm"), "").unwrap();

        let registry = FormatRegistry::global();
        assert_eq!(registry.resolve(dir.path()).unwrap().kind, ReaderKind::OpenFoam);

        std::fs::remove_dir_all(dir.path().join("system")).unwrap();
        assert_eq!(registry.resolve(dir.path()).unwrap().kind, ReaderKind::Dicom);

        std::fs::remove_file(dir.path().join("slice.dcm")).unwrap();
        assert!(matches!(
            registry.resolve(dir.path()),
            Err(Error::UnsupportedFormat { .. })
        ));
    }
}
