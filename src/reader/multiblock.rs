use crate::parse::{self, Element, EventSummary, ParseError, UnexpectedElement};
use crate::prelude::*;
use crate::registry::FormatRegistry;

use super::{builtin_decoder, Catalog, CatalogQuery, DecodeRequest};

#[derive(Debug, Default, Clone, Copy)]
/// Decoder for `.vtm` multi-block index files
///
/// Every leaf `DataSet` is exposed as a patch named by its path through the block
/// tree (`group/leaf`). Disabled patches are left out of the result, and groups that
/// end up without children are left out as well.
pub struct MultiBlockDecoder;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        name: String,
        patch: String,
        file: Option<PathBuf>,
    },
    Group {
        name: String,
        children: Vec<Node>,
    },
}

fn block_name(element: &Element, position: usize) -> String {
    match element.attribute("name") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let index = element.attribute("index").unwrap_or_default();
            if index.is_empty() {
                format!("Block-{position}")
            } else {
                format!("Block-{index}")
            }
        }
    }
}

fn parse_nodes(element: &Element, prefix: &str, base: &Path) -> Vec<Node> {
    element
        .children
        .iter()
        .filter(|c| c.name == "DataSet" || c.name == "Block")
        .enumerate()
        .map(|(position, child)| {
            let name = block_name(child, position);
            let patch = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };

            if child.name == "Block" {
                Node::Group {
                    children: parse_nodes(child, &patch, base),
                    name,
                }
            } else {
                Node::Leaf {
                    file: child
                        .attribute("file")
                        .filter(|f| !f.is_empty())
                        .map(|f| base.join(f)),
                    name,
                    patch,
                }
            }
        })
        .collect()
}

fn read_tree(path: &Path) -> Result<Vec<Node>, Error> {
    let document = parse::read_document(path).map_err(|e| Error::decode(path, e))?;

    let body = match document.root.attribute("type") {
        Some(kind) if document.root.name == "VTKFile" => document.root.required_child(kind),
        _ => Err(ParseError::from(UnexpectedElement::new(
            "VTKFile",
            EventSummary::element(&document.root.name),
        ))),
    }
    .map_err(|e| Error::decode(path, e))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(parse_nodes(body, "", base))
}

fn leaves(nodes: &[Node]) -> Vec<(&str, Option<&Path>)> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::Leaf { patch, file, .. } => out.push((patch.as_str(), file.as_deref())),
            Node::Group { children, .. } => out.extend(leaves(children)),
        }
    }
    out
}

fn child_decoder(path: &Path) -> Result<Box<dyn Decoder>, Error> {
    let descriptor = FormatRegistry::global().resolve_file(path)?;
    Ok(builtin_decoder(descriptor.kind))
}

fn merge_names(target: &mut Vec<String>, names: Vec<String>) {
    for name in names {
        if !target.contains(&name) {
            target.push(name);
        }
    }
}

impl Decoder for MultiBlockDecoder {
    fn catalog(&self, path: &Path, query: &CatalogQuery<'_>) -> Result<Catalog, Error> {
        let nodes = read_tree(path)?;
        let mut catalog = Catalog::default();

        for (patch, file) in leaves(&nodes) {
            catalog.patches.push(patch.to_string());

            if !query.selection.is_enabled(ArrayDomain::Patch, patch) {
                continue;
            }

            if let Some(file) = file {
                let child = child_decoder(file)?.catalog(file, query)?;
                merge_names(&mut catalog.point_arrays, child.point_arrays);
                merge_names(&mut catalog.cell_arrays, child.cell_arrays);
            }
        }

        Ok(catalog)
    }

    fn decode(&self, path: &Path, request: &DecodeRequest<'_>) -> Result<Dataset, Error> {
        let nodes = read_tree(path)?;
        let total = leaves(&nodes).len();
        let mut step = 0;

        let blocks = decode_nodes(&nodes, request, &mut step, total)?;
        Ok(Dataset::MultiBlock(blocks))
    }
}

fn decode_nodes(
    nodes: &[Node],
    request: &DecodeRequest<'_>,
    step: &mut usize,
    total: usize,
) -> Result<MultiBlock, Error> {
    let mut blocks = MultiBlock::new();

    for node in nodes {
        match node {
            Node::Leaf { name, patch, file } => {
                *step += 1;
                if !request.selection.is_enabled(ArrayDomain::Patch, patch) {
                    continue;
                }

                let file = match file {
                    Some(file) => file,
                    None => continue,
                };

                let data = child_decoder(file)?.decode(file, request)?;
                request.progress.step(*step, total);
                blocks.push(Some(name.as_str()), data);
            }
            Node::Group { name, children } => {
                let inner = decode_nodes(children, request, step, total)?;
                if !inner.is_empty() {
                    blocks.push(Some(name.as_str()), inner);
                }
            }
        }
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_names() {
        let document = parse::parse_document(
            br#"<VTKFile type="vtkMultiBlockDataSet">
                <vtkMultiBlockDataSet>
                    <DataSet index="0" name="inlet" file="a/a_0.vtp"/>
                    <Block index="1" name="walls">
                        <DataSet index="0" name="left" file="a/a_1.vtp"/>
                        <DataSet index="1" file="a/a_2.vtp"/>
                    </Block>
                    <DataSet index="2"/>
                </vtkMultiBlockDataSet>
            </VTKFile>"#,
        )
        .unwrap();

        let body = document.root.required_child("vtkMultiBlockDataSet").unwrap();
        let nodes = parse_nodes(body, "", Path::new("case"));
        let patches: Vec<&str> = leaves(&nodes).into_iter().map(|(p, _)| p).collect();

        assert_eq!(patches, vec!["inlet", "walls/left", "walls/Block-1", "Block-2"]);
        assert_eq!(leaves(&nodes)[0].1, Some(Path::new("case/a/a_0.vtp")));
        assert_eq!(leaves(&nodes)[3].1, None);
    }
}
