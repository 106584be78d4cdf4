use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, From)]
/// The result of a [`Reader::read`](crate::Reader::read) call.
///
/// A `Dataset` is either a single [`Mesh`] or an ordered [`MultiBlock`] collection of
/// further datasets. Every read constructs a fresh value owned by the caller.
pub enum Dataset {
    Mesh(Mesh),
    MultiBlock(MultiBlock),
}

impl Dataset {
    /// total number of points, summed over every leaf of a multi-block
    pub fn n_points(&self) -> usize {
        match self {
            Self::Mesh(mesh) => mesh.n_points(),
            Self::MultiBlock(blocks) => blocks.iter().map(|b| b.data.n_points()).sum(),
        }
    }

    /// total number of cells, summed over every leaf of a multi-block
    pub fn n_cells(&self) -> usize {
        match self {
            Self::Mesh(mesh) => mesh.n_cells(),
            Self::MultiBlock(blocks) => blocks.iter().map(|b| b.data.n_cells()).sum(),
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            Self::Mesh(mesh) => Some(mesh),
            Self::MultiBlock(_) => None,
        }
    }

    pub fn as_multi_block(&self) -> Option<&MultiBlock> {
        match self {
            Self::Mesh(_) => None,
            Self::MultiBlock(blocks) => Some(blocks),
        }
    }

    pub fn into_mesh(self) -> Option<Mesh> {
        match self {
            Self::Mesh(mesh) => Some(mesh),
            Self::MultiBlock(_) => None,
        }
    }

    pub fn into_multi_block(self) -> Option<MultiBlock> {
        match self {
            Self::Mesh(_) => None,
            Self::MultiBlock(blocks) => Some(blocks),
        }
    }

    pub fn is_multi_block(&self) -> bool {
        matches!(self, Self::MultiBlock(_))
    }
}

#[derive(Debug, Clone, PartialEq, Constructor)]
/// A single child of a [`MultiBlock`], optionally named
pub struct Block {
    pub name: Option<String>,
    pub data: Dataset,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Ordered, indexable collection of child datasets
pub struct MultiBlock {
    blocks: Vec<Block>,
}

impl MultiBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn push<T: Into<String>, D: Into<Dataset>>(&mut self, name: Option<T>, data: D) {
        self.blocks.push(Block {
            name: name.map(Into::into),
            data: data.into(),
        });
    }

    pub fn get(&self, index: usize) -> Option<&Dataset> {
        self.blocks.get(index).map(|b| &b.data)
    }

    /// first block carrying `name`
    pub fn get_by_name(&self, name: &str) -> Option<&Dataset> {
        self.blocks
            .iter()
            .find(|b| b.name.as_deref() == Some(name))
            .map(|b| &b.data)
    }

    /// block names in order, `None` for unnamed blocks
    pub fn keys(&self) -> Vec<Option<&str>> {
        self.blocks.iter().map(|b| b.name.as_deref()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// every leaf mesh, depth first
    pub fn leaves(&self) -> Vec<&Mesh> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match &block.data {
                Dataset::Mesh(mesh) => out.push(mesh),
                Dataset::MultiBlock(inner) => out.extend(inner.leaves()),
            }
        }
        out
    }
}

impl FromIterator<Block> for MultiBlock {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MultiBlock {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a MultiBlock {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

impl std::ops::Index<usize> for MultiBlock {
    type Output = Dataset;

    fn index(&self, index: usize) -> &Self::Output {
        &self.blocks[index].data
    }
}

impl std::ops::Index<&str> for MultiBlock {
    type Output = Dataset;

    fn index(&self, name: &str) -> &Self::Output {
        match self.get_by_name(name) {
            Some(data) => data,
            None => panic!("no block named `{name}`"),
        }
    }
}
