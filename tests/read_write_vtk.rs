use ndarray::{arr1, Array2};
use vtk_readers::prelude::*;
use vtk_readers::{
    get_reader, save, write_vtk, CellArray, DataArray, Encoding, Error, Extent, ReaderKind,
    ScalarType, SelectionState,
};

fn points(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, 3), |(i, c)| (i * 3 + c) as f64 * 0.25)
}

fn image() -> Mesh {
    let mut mesh = Mesh::new(Geometry::ImageData {
        extent: Extent::new(3, 2, 2),
        origin: [1.0, 0.0, -2.5],
        spacing: [0.5, 1.0, 2.0],
    });
    mesh.point_data
        .insert(DataArray::scalars("temperature", (0..12).map(|i| i as f64).collect()));
    mesh.cell_data.insert(
        DataArray::from_vec("id", ScalarType::Int32, 1, vec![4.0, -2.0]).unwrap(),
    );
    mesh
}

fn rectilinear() -> Mesh {
    let mut mesh = Mesh::new(Geometry::RectilinearGrid {
        extent: Extent::new(3, 2, 1),
        x: arr1(&[0.0, 0.1, 0.5]),
        y: arr1(&[-1.0, 1.0]),
        z: arr1(&[0.0]),
    });
    mesh.point_data.insert(DataArray::from_array("velocity", points(6)));
    mesh
}

fn structured() -> Mesh {
    let mut mesh = Mesh::new(Geometry::StructuredGrid {
        extent: Extent::new(2, 2, 2),
        points: points(8),
        blanking: None,
    });
    mesh.field_data
        .insert(DataArray::scalars("TimeValue", vec![0.5]));
    mesh
}

fn unstructured() -> Mesh {
    let mut mesh = Mesh::new(Geometry::UnstructuredGrid {
        points: points(5),
        cells: CellArray::from_cells(vec![vec![0, 1, 2, 3], vec![1, 2, 4]]),
        cell_types: vec![10, 5],
    });
    mesh.cell_data.insert(
        DataArray::from_vec("quality", ScalarType::Float32, 1, vec![0.5, 0.25]).unwrap(),
    );
    mesh
}

fn poly_data() -> Mesh {
    let mut mesh = Mesh::new(Geometry::PolyData {
        points: points(4),
        verts: CellArray::from_cells(vec![vec![3]]),
        lines: CellArray::from_cells(vec![vec![0, 3]]),
        strips: CellArray::default(),
        polys: CellArray::from_cells(vec![vec![0, 1, 2]]),
    });
    mesh.point_data
        .insert(DataArray::scalars("height", vec![0.0, 1.0, 2.0, 3.0]));
    mesh.cell_data.insert(
        DataArray::from_vec("region", ScalarType::UInt8, 1, vec![1.0, 2.0, 3.0]).unwrap(),
    );
    mesh
}

fn every_kind() -> Vec<Mesh> {
    vec![image(), rectilinear(), structured(), unstructured(), poly_data()]
}

fn round_trip(mesh: &Mesh, encoding: Encoding) -> Mesh {
    let mut output = Vec::new();
    write_vtk(&mut output, mesh, encoding).unwrap();

    let document = vtk_readers::parse::parse_document(&output).unwrap();
    vtk_readers::parse::read_mesh(&document, &SelectionState::default()).unwrap()
}

#[test]
fn ascii_round_trip() {
    for mesh in every_kind() {
        assert_eq!(round_trip(&mesh, Encoding::Ascii), mesh);
    }
}

#[test]
fn base64_round_trip() {
    for mesh in every_kind() {
        assert_eq!(round_trip(&mesh, Encoding::Base64), mesh);
    }
}

#[test]
fn empty_meshes_round_trip() {
    for mesh in every_kind() {
        let empty = Mesh::new(match &mesh.geometry {
            Geometry::ImageData { origin, spacing, .. } => Geometry::ImageData {
                extent: Extent::empty(),
                origin: *origin,
                spacing: *spacing,
            },
            Geometry::RectilinearGrid { .. } => Geometry::RectilinearGrid {
                extent: Extent::empty(),
                x: arr1(&[]),
                y: arr1(&[]),
                z: arr1(&[]),
            },
            Geometry::StructuredGrid { .. } => Geometry::StructuredGrid {
                extent: Extent::empty(),
                points: Array2::zeros((0, 3)),
                blanking: None,
            },
            Geometry::UnstructuredGrid { .. } => Geometry::UnstructuredGrid {
                points: Array2::zeros((0, 3)),
                cells: CellArray::default(),
                cell_types: Vec::new(),
            },
            Geometry::PolyData { .. } => Geometry::PolyData {
                points: Array2::zeros((0, 3)),
                verts: CellArray::default(),
                lines: CellArray::default(),
                strips: CellArray::default(),
                polys: CellArray::default(),
            },
        });

        assert!(empty.is_empty());
        for encoding in [Encoding::Ascii, Encoding::Base64] {
            let read = round_trip(&empty, encoding);
            assert_eq!(read, empty);
            assert_eq!(read.n_points(), 0);
            assert_eq!(read.n_cells(), 0);
        }
    }
}

#[test]
fn save_then_read_through_the_registry() {
    let dir = tempfile::tempdir().unwrap();

    for (mesh, kind) in every_kind().into_iter().zip([
        ReaderKind::XmlImageData,
        ReaderKind::XmlRectilinearGrid,
        ReaderKind::XmlStructuredGrid,
        ReaderKind::XmlUnstructuredGrid,
        ReaderKind::XmlPolyData,
    ]) {
        let path = dir.path().join(format!("mesh.{}", mesh.geometry.extension()));
        save(&path, &Dataset::Mesh(mesh.clone()), Encoding::Base64).unwrap();

        let reader = get_reader(&path).unwrap();
        assert_eq!(reader.kind(), kind);
        assert_eq!(reader.path(), path.as_path());

        let read = reader.read().unwrap().into_mesh().unwrap();
        assert_eq!(read, mesh);
    }
}

#[test]
fn xml_in_a_vtk_file_is_sniffed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("surface.vtk");

    let mut file = std::fs::File::create(&path).unwrap();
    write_vtk(&mut file, &poly_data(), Encoding::Ascii).unwrap();
    drop(file);

    let reader = get_reader(&path).unwrap();
    assert_eq!(reader.kind(), ReaderKind::XmlPolyData);
    assert_eq!(reader.read().unwrap().into_mesh().unwrap(), poly_data());
}

#[test]
fn corrupt_byte_count_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.vtp");
    let payload = base64::encode([0xFF; 16]);

    std::fs::write(
        &path,
        format!(
            r#"<?xml version="1.0"?>
<VTKFile type="PolyData" version="1.0" byte_order="LittleEndian" header_type="UInt64">
  <PolyData>
    <Piece NumberOfPoints="1" NumberOfVerts="0" NumberOfLines="0" NumberOfStrips="0" NumberOfPolys="0">
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="binary">{payload}</DataArray>
      </Points>
    </Piece>
  </PolyData>
</VTKFile>
"#
        ),
    )
    .unwrap();

    let reader = get_reader(&path).unwrap();
    assert!(matches!(reader.read(), Err(Error::Decode { .. })));
}

#[test]
fn multiblock_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("case.vtm");

    let mut walls = MultiBlock::new();
    walls.push(Some("left"), unstructured());
    walls.push(Some("right"), poly_data());

    let mut blocks = MultiBlock::new();
    blocks.push(Some("inlet"), image());
    blocks.push(Some("walls"), walls);

    save(&path, &Dataset::MultiBlock(blocks.clone()), Encoding::Ascii).unwrap();
    assert!(dir.path().join("case").join("case_0.vti").exists());
    assert!(dir.path().join("case").join("case_2.vtp").exists());

    let reader = get_reader(&path).unwrap();
    assert_eq!(reader.kind(), ReaderKind::XmlMultiBlock);
    assert_eq!(
        reader.arrays().unwrap().array_names(ArrayDomain::Patch),
        vec!["inlet", "walls/left", "walls/right"]
    );

    let read = reader.read().unwrap().into_multi_block().unwrap();
    assert_eq!(read, blocks);
}

#[test]
fn disabled_patches_are_not_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("case.vtm");

    let mut blocks = MultiBlock::new();
    blocks.push(Some("inlet"), image());
    blocks.push(Some("outlet"), poly_data());
    save(&path, &Dataset::MultiBlock(blocks), Encoding::Base64).unwrap();

    let mut reader = get_reader(&path).unwrap();
    let arrays = reader.arrays_mut().unwrap();

    // both patches contribute their arrays while enabled
    assert_eq!(
        arrays.array_names(ArrayDomain::Point),
        vec!["temperature", "height"]
    );

    arrays.disable_all_arrays(ArrayDomain::Patch).unwrap();
    arrays.enable_array(ArrayDomain::Patch, "outlet").unwrap();
    assert_eq!(arrays.array_names(ArrayDomain::Point), vec!["height"]);

    let read = reader.read().unwrap().into_multi_block().unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read.keys(), vec![Some("outlet")]);
    assert_eq!(read["outlet"].as_mesh(), Some(&poly_data()));
}

#[test]
fn disabled_arrays_are_not_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.vtu");
    save(&path, &Dataset::Mesh(unstructured()), Encoding::Ascii).unwrap();

    let mut reader = get_reader(&path).unwrap();
    reader
        .arrays_mut()
        .unwrap()
        .disable_array(ArrayDomain::Cell, "quality")
        .unwrap();

    let mesh = reader.read().unwrap().into_mesh().unwrap();
    assert!(mesh.cell_data.is_empty());
    assert_eq!(mesh.n_cells(), 2);
}
