use crate::mesh::{CellArray, Extent};
use crate::prelude::*;
use crate::selection::SelectionState;
use crate::utils::ByteOrder;

use super::array::{decode_data_array, HeaderType};
use super::error::*;
use super::{AppendedData, Document, Element, EventSummary};

#[derive(Debug, Clone, PartialEq)]
/// Attributes of the `VTKFile` root element that affect decoding
pub struct FileHeader {
    /// the `type` attribute, such as `PolyData`
    pub kind: String,
    pub byte_order: ByteOrder,
    pub header_type: HeaderType,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            kind: String::new(),
            byte_order: ByteOrder::LittleEndian,
            header_type: HeaderType::UInt32,
        }
    }
}

impl FileHeader {
    pub fn from_root(root: &Element) -> Result<Self, ParseError> {
        if root.name != "VTKFile" {
            let unexpected = UnexpectedElement::new("VTKFile", EventSummary::element(&root.name));
            return Err(unexpected.into());
        }

        let kind = root.required_attribute("type")?.to_string();

        let byte_order = match root.attribute("byte_order") {
            Some(value) => ByteOrder::from_vtk(value).ok_or_else(|| {
                UnexpectedAttributeValue::new(
                    "VTKFile".into(),
                    "byte_order".into(),
                    "LittleEndian or BigEndian".into(),
                    ParsedNameOrBytes::from(value),
                )
            })?,
            None => ByteOrder::LittleEndian,
        };

        let header_type = match root.attribute("header_type") {
            Some(value) => HeaderType::from_vtk(value).ok_or_else(|| {
                UnexpectedAttributeValue::new(
                    "VTKFile".into(),
                    "header_type".into(),
                    "UInt32 or UInt64".into(),
                    ParsedNameOrBytes::from(value),
                )
            })?,
            None => HeaderType::UInt32,
        };

        if let Some(compressor) = root.attribute("compressor") {
            if !compressor.is_empty() {
                return Err(UnsupportedCompression::from(compressor.to_string()).into());
            }
        }

        Ok(Self {
            kind,
            byte_order,
            header_type,
        })
    }
}

/// everything a `DataArray` needs to be decoded
#[derive(Clone, Copy)]
struct Context<'a> {
    header: &'a FileHeader,
    appended: Option<&'a AppendedData>,
    selection: &'a SelectionState,
}

impl<'a> Context<'a> {
    fn decode(&self, element: &Element) -> Result<DataArray, ParseError> {
        decode_data_array(element, self.header, self.appended)
    }
}

/// point and cell array names of a serial VTK XML document, in file order
pub fn list_arrays(document: &Document) -> Result<(Vec<String>, Vec<String>), ParseError> {
    let header = FileHeader::from_root(&document.root)?;
    let body = document.root.required_child(&header.kind)?;

    let mut point = Vec::new();
    let mut cell = Vec::new();

    for piece in body.children_named("Piece") {
        collect_names(piece.child("PointData"), &mut point);
        collect_names(piece.child("CellData"), &mut cell);
    }

    Ok((point, cell))
}

fn collect_names(data: Option<&Element>, names: &mut Vec<String>) {
    let arrays = data.into_iter().flat_map(|d| d.children_named("DataArray"));
    for array in arrays {
        let name = array.attribute("Name").unwrap_or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
}

/// build a [`Mesh`] from a serial VTK XML document, skipping disabled arrays
pub fn read_mesh(document: &Document, selection: &SelectionState) -> Result<Mesh, ParseError> {
    let header = FileHeader::from_root(&document.root)?;
    let body = document.root.required_child(&header.kind)?;

    let ctx = Context {
        header: &header,
        appended: document.appended.as_ref(),
        selection,
    };

    let mut mesh = match header.kind.as_str() {
        "ImageData" | "RectilinearGrid" | "StructuredGrid" => read_structured(body, ctx)?,
        "UnstructuredGrid" | "PolyData" => {
            let mut pieces = body.children_named("Piece");
            let mut mesh = match pieces.next() {
                Some(piece) => read_explicit_piece(&header.kind, piece, ctx)?,
                None => Mesh::new(empty_explicit(&header.kind)),
            };
            for piece in pieces {
                let next = read_explicit_piece(&header.kind, piece, ctx)?;
                append_piece(&mut mesh, next);
            }
            mesh
        }
        other => {
            let unexpected = UnexpectedAttributeValue::new(
                "VTKFile".into(),
                "type".into(),
                "a serial dataset type".into(),
                ParsedNameOrBytes::from(other),
            );
            return Err(unexpected.into());
        }
    };

    let field_data = body
        .child("FieldData")
        .or_else(|| document.root.child("FieldData"));
    if let Some(field_data) = field_data {
        mesh.field_data = read_field_data(field_data, ctx)?;
    }

    Ok(mesh)
}

fn extent_attribute(element: &Element, key: &str) -> Result<Option<Extent>, ParseError> {
    match element.attribute(key) {
        Some(value) => Extent::from_span_string(value)
            .map(Some)
            .ok_or_else(|| ParseError::invalid_number(format!("{} attribute {key}", element.name), value)),
        None => Ok(None),
    }
}

fn triple_attribute(element: &Element, key: &str) -> Result<Option<[f64; 3]>, ParseError> {
    let value = match element.attribute(key) {
        Some(value) => value,
        None => return Ok(None),
    };

    let invalid = || ParseError::invalid_number(format!("{} attribute {key}", element.name), value);

    let parsed = value
        .split_ascii_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    match parsed.as_slice() {
        [x, y, z] => Ok(Some([*x, *y, *z])),
        _ => Err(invalid()),
    }
}

fn read_structured(body: &Element, ctx: Context<'_>) -> Result<Mesh, ParseError> {
    let mut pieces = body.children_named("Piece");
    let piece = pieces.next();
    if pieces.next().is_some() {
        let unexpected = UnexpectedElement::new(format!("/{}", body.name), EventSummary::element("Piece"));
        return Err(unexpected.into());
    }

    let whole = extent_attribute(body, "WholeExtent")?;
    let extent = match piece {
        Some(piece) => extent_attribute(piece, "Extent")?.or(whole),
        None => whole,
    }
    .unwrap_or_default();

    let geometry = match body.name.as_str() {
        "ImageData" => Geometry::ImageData {
            extent,
            origin: triple_attribute(body, "Origin")?.unwrap_or([0.0; 3]),
            spacing: triple_attribute(body, "Spacing")?.unwrap_or([1.0; 3]),
        },
        "RectilinearGrid" => {
            let coordinates = piece.and_then(|p| p.child("Coordinates"));
            let mut axes = coordinates
                .into_iter()
                .flat_map(|c| c.children_named("DataArray"))
                .map(|a| ctx.decode(a).map(|a| a.values.column(0).to_owned()));

            let mut next_axis = || axes.next().unwrap_or_else(|| Ok(Array1::zeros(0)));
            let x = next_axis()?;
            let y = next_axis()?;
            let z = next_axis()?;

            for (axis, len) in [(&x, extent.x_len()), (&y, extent.y_len()), (&z, extent.z_len())] {
                if axis.len() != len {
                    return Err(ParseError::length_mismatch("Coordinates", len, axis.len()));
                }
            }

            Geometry::RectilinearGrid { extent, x, y, z }
        }
        _ => {
            let points = match piece {
                Some(piece) => read_points(piece, ctx)?,
                None => Array2::zeros((0, 3)),
            };
            if points.nrows() != extent.num_points() {
                return Err(ParseError::length_mismatch("Points", extent.num_points(), points.nrows()));
            }

            Geometry::StructuredGrid {
                extent,
                points,
                blanking: None,
            }
        }
    };

    let mut mesh = Mesh::new(geometry);
    if let Some(piece) = piece {
        read_piece_data(piece, &mut mesh, ctx)?;
    }

    Ok(mesh)
}

fn read_points(piece: &Element, ctx: Context<'_>) -> Result<Array2<f64>, ParseError> {
    let array = match piece.child("Points").and_then(|p| p.child("DataArray")) {
        Some(array) => ctx.decode(array)?,
        None => return Ok(Array2::zeros((0, 3))),
    };

    if array.tuples() == 0 {
        return Ok(Array2::zeros((0, 3)));
    }

    if array.components() != 3 {
        return Err(ParseError::length_mismatch(&array.name, 3, array.components()));
    }

    Ok(array.values)
}

fn read_cells(piece: &Element, name: &str, ctx: Context<'_>) -> Result<CellArray, ParseError> {
    let section = match piece.child(name) {
        Some(section) => section,
        None => return Ok(CellArray::default()),
    };

    let mut connectivity = Vec::new();
    let mut offsets = Vec::new();

    for array in section.children_named("DataArray") {
        match array.attribute("Name") {
            Some("connectivity") => {
                connectivity = ctx.decode(array)?.iter().map(|v| v as i64).collect();
            }
            Some("offsets") => offsets = ctx.decode(array)?.iter().map(|v| v as i64).collect(),
            _ => (),
        }
    }

    Ok(CellArray::new(connectivity, offsets))
}

fn read_cell_types(piece: &Element, ctx: Context<'_>) -> Result<Vec<u8>, ParseError> {
    let types = piece
        .child("Cells")
        .into_iter()
        .flat_map(|c| c.children_named("DataArray"))
        .find(|a| a.attribute("Name") == Some("types"));

    match types {
        Some(array) => Ok(ctx.decode(array)?.iter().map(|v| v as u8).collect()),
        None => Ok(Vec::new()),
    }
}

fn empty_explicit(kind: &str) -> Geometry {
    if kind == "PolyData" {
        Geometry::PolyData {
            points: Array2::zeros((0, 3)),
            verts: CellArray::default(),
            lines: CellArray::default(),
            strips: CellArray::default(),
            polys: CellArray::default(),
        }
    } else {
        Geometry::UnstructuredGrid {
            points: Array2::zeros((0, 3)),
            cells: CellArray::default(),
            cell_types: Vec::new(),
        }
    }
}

fn read_explicit_piece(kind: &str, piece: &Element, ctx: Context<'_>) -> Result<Mesh, ParseError> {
    let points = read_points(piece, ctx)?;

    if let Some(expected) = piece.parsed_attribute::<usize>("NumberOfPoints")? {
        if expected != points.nrows() {
            return Err(ParseError::length_mismatch("Points", expected, points.nrows()));
        }
    }

    let geometry = if kind == "PolyData" {
        Geometry::PolyData {
            points,
            verts: read_cells(piece, "Verts", ctx)?,
            lines: read_cells(piece, "Lines", ctx)?,
            strips: read_cells(piece, "Strips", ctx)?,
            polys: read_cells(piece, "Polys", ctx)?,
        }
    } else {
        let cells = read_cells(piece, "Cells", ctx)?;
        let cell_types = read_cell_types(piece, ctx)?;
        if cell_types.len() != cells.len() {
            return Err(ParseError::length_mismatch("types", cells.len(), cell_types.len()));
        }

        Geometry::UnstructuredGrid {
            points,
            cells,
            cell_types,
        }
    };

    let mut mesh = Mesh::new(geometry);
    read_piece_data(piece, &mut mesh, ctx)?;

    Ok(mesh)
}

fn append_piece(mesh: &mut Mesh, piece: Mesh) {
    let offset = mesh.n_points() as i64;

    match (&mut mesh.geometry, piece.geometry) {
        (
            Geometry::UnstructuredGrid {
                points,
                cells,
                cell_types,
            },
            Geometry::UnstructuredGrid {
                points: other_points,
                cells: other_cells,
                cell_types: other_types,
            },
        ) => {
            // both arrays are (n, 3) so the append cannot fail
            let _ = points.append(Axis(0), other_points.view());
            cells.append(&other_cells, offset);
            cell_types.extend(other_types);
        }
        (
            Geometry::PolyData {
                points,
                verts,
                lines,
                strips,
                polys,
            },
            Geometry::PolyData {
                points: other_points,
                verts: other_verts,
                lines: other_lines,
                strips: other_strips,
                polys: other_polys,
            },
        ) => {
            let _ = points.append(Axis(0), other_points.view());
            verts.append(&other_verts, offset);
            lines.append(&other_lines, offset);
            strips.append(&other_strips, offset);
            polys.append(&other_polys, offset);
        }
        _ => return,
    }

    mesh.point_data.concat(piece.point_data);
    mesh.cell_data.concat(piece.cell_data);
}

fn read_piece_data(piece: &Element, mesh: &mut Mesh, ctx: Context<'_>) -> Result<(), ParseError> {
    let n_points = mesh.n_points();
    let n_cells = mesh.n_cells();

    mesh.point_data = read_attributes(piece.child("PointData"), ArrayDomain::Point, n_points, ctx)?;
    mesh.cell_data = read_attributes(piece.child("CellData"), ArrayDomain::Cell, n_cells, ctx)?;

    Ok(())
}

fn read_attributes(
    data: Option<&Element>,
    domain: ArrayDomain,
    expected_tuples: usize,
    ctx: Context<'_>,
) -> Result<Attributes, ParseError> {
    let mut attributes = Attributes::new();

    let arrays = data.into_iter().flat_map(|d| d.children_named("DataArray"));
    for element in arrays {
        let name = element.attribute("Name").unwrap_or_default();
        if !ctx.selection.is_enabled(domain, name) {
            continue;
        }

        let array = ctx.decode(element)?;
        if array.tuples() != expected_tuples {
            return Err(ParseError::length_mismatch(name, expected_tuples, array.tuples()));
        }

        attributes.insert(array);
    }

    Ok(attributes)
}

fn read_field_data(field_data: &Element, ctx: Context<'_>) -> Result<Attributes, ParseError> {
    let mut attributes = Attributes::new();

    for element in field_data.children_named("DataArray") {
        match ctx.decode(element) {
            Ok(array) => attributes.insert(array),
            Err(ParseError::UnsupportedDataType(e)) => {
                tracing::debug!("skipping field data array: {e}");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(attributes)
}
