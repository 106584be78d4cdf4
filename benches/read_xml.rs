use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use vtk_readers::prelude::*;
use vtk_readers::{write_vtk, DataArray, Encoding, Extent, SelectionState};

fn structured(n: usize) -> Mesh {
    let points = n * n * n;
    let mut mesh = Mesh::new(Geometry::StructuredGrid {
        extent: Extent::new(n, n, n),
        points: Array2::random((points, 3), Uniform::new(0., 10.)),
        blanking: None,
    });
    mesh.point_data.insert(DataArray::from_array(
        "velocity",
        Array2::random((points, 3), Uniform::new(-1., 1.)),
    ));
    mesh
}

fn encoded(n: usize, encoding: Encoding) -> Vec<u8> {
    let mut output = Vec::new();
    write_vtk(&mut output, &structured(n), encoding).unwrap();
    output
}

fn read(bytes: &[u8]) -> usize {
    let document = vtk_readers::parse::parse_document(bytes).unwrap();
    vtk_readers::parse::read_mesh(&document, &SelectionState::default())
        .unwrap()
        .n_points()
}

fn read_xml_bench(c: &mut Criterion) {
    for n in [32, 64] {
        let ascii = encoded(n, Encoding::Ascii);
        c.bench_function(&format!("read ascii {n}"), |b| b.iter(|| read(black_box(&ascii))));

        let binary = encoded(n, Encoding::Base64);
        c.bench_function(&format!("read base64 {n}"), |b| b.iter(|| read(black_box(&binary))));
    }

    c.bench_function("write base64 64", |b| {
        let mesh = structured(64);
        b.iter(|| {
            let mut output = Vec::new();
            write_vtk(&mut output, black_box(&mesh), Encoding::Base64).unwrap();
            output.len()
        })
    });
}

criterion_group!(benches, read_xml_bench);
criterion_main!(benches);
