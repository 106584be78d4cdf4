use crate::mesh::CellArray;
use crate::prelude::*;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// the encoding to use when writing an inline `DataArray`
pub enum Encoding {
    Ascii,
    #[default]
    Base64,
}

impl Encoding {
    fn vtk_name(&self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Base64 => "binary",
        }
    }
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str, attributes: &[(&str, &str)]) -> Result<(), Error> {
    let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
    writer.write_event(Event::Start(element))?;
    Ok(())
}

fn empty<W: Write>(writer: &mut Writer<W>, name: &str, attributes: &[(&str, &str)]) -> Result<(), Error> {
    let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), Error> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Encode values as the text of a `DataArray`. Binary data is a single base64 stream
/// holding a `UInt64` byte count followed by the little endian values.
fn encode_values<I: Iterator<Item = f64>>(scalar_type: ScalarType, values: I, encoding: Encoding) -> String {
    match encoding {
        Encoding::Ascii => {
            let mut buffer = ryu::Buffer::new();
            values
                .map(|value| scalar_type.format_ascii(value, &mut buffer))
                .collect::<Vec<_>>()
                .join(" ")
        }
        Encoding::Base64 => {
            let mut body = Vec::new();
            values.for_each(|value| scalar_type.encode(value, &mut body));

            let mut bytes = Vec::with_capacity(body.len() + 8);
            bytes.extend((body.len() as u64).to_le_bytes());
            bytes.extend(body);
            base64::encode(bytes)
        }
    }
}

fn write_values<W: Write, I: Iterator<Item = f64>>(
    writer: &mut Writer<W>,
    name: &str,
    scalar_type: ScalarType,
    components: usize,
    values: I,
    encoding: Encoding,
    extra: &[(&str, &str)],
) -> Result<(), Error> {
    let components = components.to_string();
    let mut attributes = vec![
        ("type", scalar_type.vtk_name()),
        ("Name", name),
        ("NumberOfComponents", components.as_str()),
        ("format", encoding.vtk_name()),
    ];
    attributes.extend_from_slice(extra);

    start(writer, "DataArray", &attributes)?;
    let text = encode_values(scalar_type, values, encoding);
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    end(writer, "DataArray")
}

fn write_array<W: Write>(writer: &mut Writer<W>, array: &DataArray, encoding: Encoding) -> Result<(), Error> {
    write_values(
        writer,
        &array.name,
        array.scalar_type,
        array.components(),
        array.iter(),
        encoding,
        &[],
    )
}

fn write_attributes<W: Write>(
    writer: &mut Writer<W>,
    section: &str,
    attributes: &Attributes,
    encoding: Encoding,
) -> Result<(), Error> {
    start(writer, section, &[])?;
    for array in attributes {
        write_array(writer, array, encoding)?;
    }
    end(writer, section)
}

fn write_field_data<W: Write>(writer: &mut Writer<W>, field_data: &Attributes, encoding: Encoding) -> Result<(), Error> {
    if field_data.is_empty() {
        return Ok(());
    }

    start(writer, "FieldData", &[])?;
    for array in field_data {
        let tuples = array.tuples().to_string();
        write_values(
            writer,
            &array.name,
            array.scalar_type,
            array.components(),
            array.iter(),
            encoding,
            &[("NumberOfTuples", tuples.as_str())],
        )?;
    }
    end(writer, "FieldData")
}

fn write_points<W: Write>(writer: &mut Writer<W>, points: &Array2<f64>, encoding: Encoding) -> Result<(), Error> {
    start(writer, "Points", &[])?;
    write_values(
        writer,
        "Points",
        ScalarType::Float64,
        3,
        points.iter().copied(),
        encoding,
        &[],
    )?;
    end(writer, "Points")
}

/// a `Cells`, `Verts`, `Lines`, `Strips` or `Polys` section
fn write_cells<W: Write>(
    writer: &mut Writer<W>,
    section: &str,
    cells: &CellArray,
    cell_types: Option<&[u8]>,
    encoding: Encoding,
) -> Result<(), Error> {
    start(writer, section, &[])?;

    write_values(
        writer,
        "connectivity",
        ScalarType::Int64,
        1,
        cells.connectivity.iter().map(|v| *v as f64),
        encoding,
        &[],
    )?;
    write_values(
        writer,
        "offsets",
        ScalarType::Int64,
        1,
        cells.offsets.iter().map(|v| *v as f64),
        encoding,
        &[],
    )?;

    if let Some(types) = cell_types {
        write_values(
            writer,
            "types",
            ScalarType::UInt8,
            1,
            types.iter().map(|t| *t as f64),
            encoding,
            &[],
        )?;
    }

    end(writer, section)
}

fn format_triple(values: &[f64; 3]) -> String {
    let mut buffer = ryu::Buffer::new();
    values
        .iter()
        .map(|v| buffer.format(*v).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write a mesh as a serial VTK XML document to a `Writer`
///
/// Every array is written inline in the requested encoding, so the output can be read
/// back by [`parse::read_mesh`](crate::parse::read_mesh) into an equal mesh.
pub fn write_vtk<W: Write>(writer: W, mesh: &Mesh, encoding: Encoding) -> Result<(), Error> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;

    let kind = mesh.geometry.vtk_type();
    start(
        &mut writer,
        "VTKFile",
        &[
            ("type", kind),
            ("version", "1.0"),
            ("byte_order", "LittleEndian"),
            ("header_type", "UInt64"),
        ],
    )?;

    let extent = mesh.geometry.extent().map(|e| e.to_span_string());
    let extent = extent.as_deref().unwrap_or_default();

    match &mesh.geometry {
        Geometry::ImageData { origin, spacing, .. } => {
            let origin = format_triple(origin);
            let spacing = format_triple(spacing);
            start(
                &mut writer,
                kind,
                &[
                    ("WholeExtent", extent),
                    ("Origin", origin.as_str()),
                    ("Spacing", spacing.as_str()),
                ],
            )?;
        }
        Geometry::RectilinearGrid { .. } | Geometry::StructuredGrid { .. } => {
            start(&mut writer, kind, &[("WholeExtent", extent)])?;
        }
        Geometry::UnstructuredGrid { .. } | Geometry::PolyData { .. } => start(&mut writer, kind, &[])?,
    }

    write_field_data(&mut writer, &mesh.field_data, encoding)?;

    let n_points = mesh.n_points().to_string();
    let n_cells = mesh.n_cells().to_string();

    match &mesh.geometry {
        Geometry::ImageData { .. } => {
            start(&mut writer, "Piece", &[("Extent", extent)])?;
        }
        Geometry::RectilinearGrid { x, y, z, .. } => {
            start(&mut writer, "Piece", &[("Extent", extent)])?;
            start(&mut writer, "Coordinates", &[])?;
            for (name, axis) in [("x", x), ("y", y), ("z", z)] {
                write_values(&mut writer, name, ScalarType::Float64, 1, axis.iter().copied(), encoding, &[])?;
            }
            end(&mut writer, "Coordinates")?;
        }
        Geometry::StructuredGrid { points, .. } => {
            start(&mut writer, "Piece", &[("Extent", extent)])?;
            write_points(&mut writer, points, encoding)?;
        }
        Geometry::UnstructuredGrid {
            points,
            cells,
            cell_types,
        } => {
            start(
                &mut writer,
                "Piece",
                &[("NumberOfPoints", n_points.as_str()), ("NumberOfCells", n_cells.as_str())],
            )?;
            write_points(&mut writer, points, encoding)?;
            write_cells(&mut writer, "Cells", cells, Some(cell_types), encoding)?;
        }
        Geometry::PolyData {
            points,
            verts,
            lines,
            strips,
            polys,
        } => {
            let counts = [verts, lines, strips, polys].map(|c| c.len().to_string());
            start(
                &mut writer,
                "Piece",
                &[
                    ("NumberOfPoints", n_points.as_str()),
                    ("NumberOfVerts", counts[0].as_str()),
                    ("NumberOfLines", counts[1].as_str()),
                    ("NumberOfStrips", counts[2].as_str()),
                    ("NumberOfPolys", counts[3].as_str()),
                ],
            )?;
            write_points(&mut writer, points, encoding)?;
            for (section, cells) in [("Verts", verts), ("Lines", lines), ("Strips", strips), ("Polys", polys)] {
                write_cells(&mut writer, section, cells, None, encoding)?;
            }
        }
    }

    write_attributes(&mut writer, "PointData", &mesh.point_data, encoding)?;
    write_attributes(&mut writer, "CellData", &mesh.cell_data, encoding)?;

    end(&mut writer, "Piece")?;
    end(&mut writer, kind)?;
    end(&mut writer, "VTKFile")?;

    Ok(())
}

fn save_mesh(path: &Path, mesh: &Mesh, encoding: Encoding) -> Result<(), Error> {
    let mut file = BufWriter::new(File::create(path)?);
    write_vtk(&mut file, mesh, encoding)?;
    file.flush()?;
    Ok(())
}

fn block_attributes<'a>(index: &'a str, name: Option<&'a str>) -> Vec<(&'a str, &'a str)> {
    let mut attributes = vec![("index", index)];
    if let Some(name) = name {
        attributes.push(("name", name));
    }
    attributes
}

fn write_blocks<W: Write>(
    writer: &mut Writer<W>,
    blocks: &MultiBlock,
    stem: &str,
    leaf_directory: &Path,
    encoding: Encoding,
    written: &mut usize,
) -> Result<(), Error> {
    for (index, block) in blocks.iter().enumerate() {
        let index = index.to_string();

        match &block.data {
            Dataset::Mesh(mesh) => {
                let file_name = format!("{stem}_{written}.{}", mesh.geometry.extension());
                save_mesh(&leaf_directory.join(&file_name), mesh, encoding)?;
                *written += 1;

                let relative = format!("{stem}/{file_name}");
                let mut attributes = block_attributes(&index, block.name.as_deref());
                attributes.push(("file", relative.as_str()));
                empty(writer, "DataSet", &attributes)?;
            }
            Dataset::MultiBlock(inner) => {
                start(writer, "Block", &block_attributes(&index, block.name.as_deref()))?;
                write_blocks(writer, inner, stem, leaf_directory, encoding, written)?;
                end(writer, "Block")?;
            }
        }
    }

    Ok(())
}

/// Write a `.vtm` index at `path`, and every leaf mesh into
/// `<stem>/<stem>_<n>.<ext>` next to it, numbered depth first.
pub fn write_multiblock<P: AsRef<Path>>(path: P, blocks: &MultiBlock, encoding: Encoding) -> Result<(), Error> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::unsupported(path, "path has no file stem"))?
        .to_string();

    let leaf_directory = path.parent().unwrap_or_else(|| Path::new("")).join(&stem);
    std::fs::create_dir_all(&leaf_directory)?;

    let mut writer = Writer::new_with_indent(BufWriter::new(File::create(path)?), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    start(
        &mut writer,
        "VTKFile",
        &[
            ("type", "vtkMultiBlockDataSet"),
            ("version", "1.0"),
            ("byte_order", "LittleEndian"),
            ("header_type", "UInt64"),
        ],
    )?;
    start(&mut writer, "vtkMultiBlockDataSet", &[])?;

    let mut written = 0;
    write_blocks(&mut writer, blocks, &stem, &leaf_directory, encoding, &mut written)?;

    end(&mut writer, "vtkMultiBlockDataSet")?;
    end(&mut writer, "VTKFile")?;
    writer.into_inner().flush()?;

    tracing::debug!(path = %path.display(), leaves = written, "wrote multiblock index");
    Ok(())
}

/// Save a dataset, choosing the format from the dataset: a mesh is written as the
/// serial format of its geometry and a multi-block collection as a `.vtm` index.
/// The suffix of `path` must match, otherwise [`Error::UnsupportedFormat`] is
/// returned and nothing is written.
pub fn save<P: AsRef<Path>>(path: P, dataset: &Dataset, encoding: Encoding) -> Result<(), Error> {
    let path = path.as_ref();

    let expected = match dataset {
        Dataset::Mesh(mesh) => mesh.geometry.extension(),
        Dataset::MultiBlock(_) => "vtm",
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if extension.as_deref() != Some(expected) {
        return Err(Error::unsupported(
            path,
            format!("this dataset must be saved with the `.{expected}` suffix"),
        ));
    }

    match dataset {
        Dataset::Mesh(mesh) => save_mesh(path, mesh, encoding)?,
        Dataset::MultiBlock(blocks) => write_multiblock(path, blocks, encoding)?,
    }

    tracing::debug!(path = %path.display(), "saved dataset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Extent;

    fn image() -> Mesh {
        let mut mesh = Mesh::new(Geometry::ImageData {
            extent: Extent::new(2, 2, 1),
            origin: [0.0, 0.0, 0.0],
            spacing: [0.5, 0.5, 1.0],
        });
        mesh.point_data
            .insert(DataArray::scalars("height", vec![0.0, 1.5, 2.0, -1.0]));
        mesh
    }

    #[test]
    fn ascii_output() {
        let mut output = Vec::new();
        write_vtk(&mut output, &image(), Encoding::Ascii).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\"?>"));
        assert!(text.contains(r#"<VTKFile type="ImageData" version="1.0" byte_order="LittleEndian" header_type="UInt64">"#));
        assert!(text.contains(r#"WholeExtent="0 1 0 1 0 0""#));
        assert!(text.contains(r#"Spacing="0.5 0.5 1.0""#));
        assert!(text.contains("0.0 1.5 2.0 -1.0"));
    }

    #[test]
    fn base64_header_counts_bytes() {
        let encoded = encode_values(ScalarType::Float32, [1.0, 2.0].into_iter(), Encoding::Base64);
        let decoded = base64::decode(encoded).unwrap();

        assert_eq!(u64::from_le_bytes(decoded[..8].try_into().unwrap()), 8);
        assert_eq!(&decoded[8..12], 1.0f32.to_le_bytes().as_slice());
    }

    #[test]
    fn suffix_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.vtu");

        let err = save(&path, &Dataset::Mesh(image()), Encoding::Ascii).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        assert!(!path.exists());
    }
}
