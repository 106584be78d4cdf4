//! container types for data arrays read from / written to files

mod scalar;

pub use scalar::ScalarType;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq)]
/// A named array of tuples, such as a pressure field or a velocity field
///
/// Values are always held as `f64` with one row per tuple and one column per
/// component. `scalar_type` records the on-disk type so a written file matches the
/// file it was read from.
pub struct DataArray {
    pub name: String,
    pub scalar_type: ScalarType,
    pub values: Array2<f64>,
}

impl DataArray {
    /// Construct an array from a tuple-major buffer with `components` values per tuple.
    ///
    /// Returns `None` if the buffer length is not a multiple of `components`.
    pub fn from_vec<T: Into<String>>(
        name: T,
        scalar_type: ScalarType,
        components: usize,
        buffer: Vec<f64>,
    ) -> Option<Self> {
        let components = components.max(1);
        if buffer.len() % components != 0 {
            return None;
        }

        let tuples = buffer.len() / components;
        let values = Array2::from_shape_vec((tuples, components), buffer).ok()?;

        Some(Self {
            name: name.into(),
            scalar_type,
            values,
        })
    }

    /// single component `Float64` array
    pub fn scalars<T: Into<String>>(name: T, values: Vec<f64>) -> Self {
        let len = values.len();
        Self {
            name: name.into(),
            scalar_type: ScalarType::Float64,
            values: Array2::from_shape_vec((len, 1), values)
                .unwrap_or_else(|_| Array2::zeros((0, 1))),
        }
    }

    /// `Float64` array from an already shaped `(tuples, components)` array
    pub fn from_array<T: Into<String>>(name: T, values: Array2<f64>) -> Self {
        Self {
            name: name.into(),
            scalar_type: ScalarType::Float64,
            values,
        }
    }

    pub fn components(&self) -> usize {
        self.values.ncols()
    }

    pub fn tuples(&self) -> usize {
        self.values.nrows()
    }

    /// iterate every value in tuple-major order
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// the values of a single component
    pub fn component(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.components()).then(|| self.values.column(index))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Ordered collection of [`DataArray`]s attached to points, cells or the whole dataset
pub struct Attributes {
    arrays: Vec<DataArray>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// add an array, replacing any existing array with the same name in place
    pub fn insert(&mut self, array: DataArray) {
        match self.arrays.iter_mut().find(|a| a.name == array.name) {
            Some(existing) => *existing = array,
            None => self.arrays.push(array),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<DataArray> {
        let idx = self.arrays.iter().position(|a| a.name == name)?;
        Some(self.arrays.remove(idx))
    }

    pub fn names(&self) -> Vec<String> {
        self.arrays.iter().map(|a| a.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataArray> {
        self.arrays.iter()
    }

    /// append every array of `other` to the matching array of `self`, used when
    /// concatenating pieces. Arrays missing from either side are dropped.
    pub(crate) fn concat(&mut self, other: Attributes) {
        let mut merged = Vec::with_capacity(self.arrays.len());

        for mine in self.arrays.drain(..) {
            let Some(theirs) = other.get(&mine.name) else {
                continue;
            };
            if theirs.components() != mine.components() {
                continue;
            }

            let mut values = mine.values.clone();
            if values.append(Axis(0), theirs.values.view()).is_ok() {
                merged.push(DataArray { values, ..mine });
            }
        }

        self.arrays = merged;
    }
}

impl FromIterator<DataArray> for Attributes {
    fn from_iter<I: IntoIterator<Item = DataArray>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        iter.into_iter().for_each(|a| attributes.insert(a));
        attributes
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a DataArray;
    type IntoIter = std::slice::Iter<'a, DataArray>;

    fn into_iter(self) -> Self::IntoIter {
        self.arrays.iter()
    }
}

impl std::ops::Index<&str> for Attributes {
    type Output = DataArray;

    fn index(&self, name: &str) -> &Self::Output {
        match self.get(name) {
            Some(array) => array,
            None => panic!("no array named `{name}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut attributes = Attributes::new();
        attributes.insert(DataArray::scalars("a", vec![1.0]));
        attributes.insert(DataArray::scalars("b", vec![2.0]));
        attributes.insert(DataArray::scalars("a", vec![3.0]));

        assert_eq!(attributes.names(), vec!["a", "b"]);
        assert_eq!(attributes["a"].values[[0, 0]], 3.0);
    }

    #[test]
    fn from_vec_checks_components() {
        assert!(DataArray::from_vec("v", ScalarType::Float32, 3, vec![0.0; 7]).is_none());

        let array = DataArray::from_vec("v", ScalarType::Float32, 3, vec![0.0; 9]).unwrap();
        assert_eq!(array.tuples(), 3);
        assert_eq!(array.components(), 3);
    }

    #[test]
    fn concat_pieces() {
        let mut first: Attributes = [DataArray::scalars("p", vec![1.0, 2.0])]
            .into_iter()
            .collect();
        let second: Attributes = [
            DataArray::scalars("p", vec![3.0]),
            DataArray::scalars("only_here", vec![0.0]),
        ]
        .into_iter()
        .collect();

        first.concat(second);

        assert_eq!(first.names(), vec!["p"]);
        assert_eq!(first["p"].iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }
}
