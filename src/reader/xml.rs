use crate::parse;
use crate::prelude::*;

use super::{Catalog, CatalogQuery, DecodeRequest};

#[derive(Debug, Default, Clone, Copy)]
/// Decoder for the serial VTK XML formats: `.vti`, `.vtr`, `.vts`, `.vtu`, `.vtp`
/// and `.vtk` files holding XML.
pub struct VtkXmlDecoder;

impl Decoder for VtkXmlDecoder {
    fn catalog(&self, path: &Path, _query: &CatalogQuery<'_>) -> Result<Catalog, Error> {
        let document = parse::read_document(path).map_err(|e| Error::decode(path, e))?;
        let (point_arrays, cell_arrays) =
            parse::list_arrays(&document).map_err(|e| Error::decode(path, e))?;

        Ok(Catalog {
            point_arrays,
            cell_arrays,
            ..Catalog::default()
        })
    }

    fn decode(&self, path: &Path, request: &DecodeRequest<'_>) -> Result<Dataset, Error> {
        let document = parse::read_document(path).map_err(|e| Error::decode(path, e))?;
        let mesh = parse::read_mesh(&document, request.selection).map_err(|e| Error::decode(path, e))?;

        tracing::debug!(
            path = %path.display(),
            points = mesh.n_points(),
            cells = mesh.n_cells(),
            "decoded xml dataset"
        );

        Ok(Dataset::Mesh(mesh))
    }
}
