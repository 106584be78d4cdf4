/// Cell connectivity in the layout VTK XML files use: a flat list of point ids and,
/// for every cell, the offset one past its last point id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellArray {
    pub connectivity: Vec<i64>,
    pub offsets: Vec<i64>,
}

impl CellArray {
    pub fn new(connectivity: Vec<i64>, offsets: Vec<i64>) -> Self {
        Self {
            connectivity,
            offsets,
        }
    }

    /// build from a list of cells, each a list of point ids
    pub fn from_cells<I, C>(cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[i64]>,
    {
        let mut out = Self::default();
        for cell in cells {
            out.connectivity.extend_from_slice(cell.as_ref());
            out.offsets.push(out.connectivity.len() as i64);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// point ids of the `index`th cell
    pub fn cell(&self, index: usize) -> Option<&[i64]> {
        let end = *self.offsets.get(index)? as usize;
        let start = match index {
            0 => 0,
            _ => *self.offsets.get(index - 1)? as usize,
        };
        self.connectivity.get(start..end)
    }

    /// append `other`, shifting its point ids by `point_offset`
    pub(crate) fn append(&mut self, other: &CellArray, point_offset: i64) {
        let base = self.connectivity.len() as i64;
        self.connectivity
            .extend(other.connectivity.iter().map(|id| id + point_offset));
        self.offsets.extend(other.offsets.iter().map(|o| o + base));
    }
}
