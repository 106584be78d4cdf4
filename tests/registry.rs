use vtk_readers::prelude::*;
use vtk_readers::{get_reader, DecodeError, Error, FormatRegistry, ReaderKind};

const BUNDLED: &[ReaderKind] = &[
    ReaderKind::Pvd,
    ReaderKind::Plot3DMeta,
    ReaderKind::XmlImageData,
    ReaderKind::XmlMultiBlock,
    ReaderKind::XmlPolyData,
    ReaderKind::XmlRectilinearGrid,
    ReaderKind::XmlStructuredGrid,
    ReaderKind::XmlUnstructuredGrid,
];

#[test]
fn every_suffix_constructs_a_reader() {
    let dir = tempfile::tempdir().unwrap();

    for descriptor in FormatRegistry::global().descriptors() {
        if BUNDLED.contains(&descriptor.kind) || !descriptor.accepts_file() {
            continue;
        }

        for suffix in descriptor.suffixes {
            let path = dir.path().join(format!("sample{suffix}"));
            std::fs::write(&path, "").unwrap();

            let reader = get_reader(&path).unwrap();
            assert_eq!(reader.kind(), descriptor.kind, "suffix {suffix}");
            assert_eq!(reader.path(), path.as_path());

            let err = reader.read().unwrap_err();
            assert!(
                matches!(&err, Error::Decode { source: DecodeError::Unavailable(kind), .. } if *kind == descriptor.kind),
                "unexpected error for {suffix}: {err}"
            );
        }
    }
}

#[test]
fn suffixes_ignore_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Scan.NII.GZ");
    std::fs::write(&path, "").unwrap();

    assert_eq!(get_reader(&path).unwrap().kind(), ReaderKind::Nifti);
}

#[test]
fn unsupported_suffixes() {
    let dir = tempfile::tempdir().unwrap();

    for name in ["notes.txt", "grid.xyz", "archive.gz", "no_suffix"] {
        let path = dir.path().join(name);
        std::fs::write(&path, "").unwrap();

        let err = get_reader(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }), "{name}");
    }

    // the suffix is checked before the path
    let err = get_reader(dir.path().join("missing.txt")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { .. }));

    let err = get_reader(dir.path().join("missing.stl")).unwrap_err();
    assert!(matches!(err, Error::PathNotFound(p) if p.ends_with("missing.stl")));
}

#[test]
fn legacy_and_xml_vtk_files() {
    let dir = tempfile::tempdir().unwrap();

    let legacy = dir.path().join("legacy.vtk");
    std::fs::write(&legacy, "# vtk DataFile Version 3.0\nlegacy\nASCII\nDATASET POLYDATA\n").unwrap();
    assert_eq!(get_reader(&legacy).unwrap().kind(), ReaderKind::LegacyVtk);

    let xml = dir.path().join("image.vtk");
    std::fs::write(
        &xml,
        r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="1.0" byte_order="LittleEndian">
  <ImageData WholeExtent="0 1 0 0 0 0" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="0 1 0 0 0 0"></Piece>
  </ImageData>
</VTKFile>
"#,
    )
    .unwrap();

    let reader = get_reader(&xml).unwrap();
    assert_eq!(reader.kind(), ReaderKind::XmlImageData);
    assert_eq!(reader.read().unwrap().n_points(), 2);
}

#[test]
fn case_directories() {
    let dir = tempfile::tempdir().unwrap();

    let dicom = dir.path().join("scan");
    std::fs::create_dir(&dicom).unwrap();
    std::fs::write(dicom.join("slice_000.dcm"), "").unwrap();
    assert_eq!(get_reader(&dicom).unwrap().kind(), ReaderKind::Dicom);

    let foam = dir.path().join("cavity");
    std::fs::create_dir_all(foam.join("system")).unwrap();
    std::fs::write(foam.join("system").join("controlDict"), "").unwrap();
    std::fs::write(foam.join("mesh.dcm"), "").unwrap();
    assert_eq!(get_reader(&foam).unwrap().kind(), ReaderKind::OpenFoam);

    let empty = dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();
    assert!(matches!(get_reader(&empty), Err(Error::UnsupportedFormat { .. })));
}

#[test]
fn readers_without_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.stl");
    std::fs::write(&path, "solid part\nendsolid part\n").unwrap();

    let mut reader = get_reader(&path).unwrap();
    assert!(reader.time().is_none());
    assert!(reader.time_mut().is_none());
    assert_eq!(reader.arrays().unwrap().number_arrays(ArrayDomain::Point), 0);

    assert!(!reader.progress_enabled());
    reader.show_progress();
    assert!(reader.progress_enabled());
    reader.hide_progress();
    assert!(!reader.progress_enabled());
}
