use crate::utils::is_close;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Default)]
/// Ordered time values of a reader together with the active index
///
/// The cursor is always valid: with no time values the active index is 0 and the
/// active value is `0.0`.
pub struct TimeCursor {
    values: Vec<f64>,
    active: usize,
}

impl TimeCursor {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, active: 0 }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_value(&self) -> f64 {
        self.values.get(self.active).copied().unwrap_or(0.0)
    }

    pub fn value(&self, index: usize) -> Result<f64, Error> {
        self.values
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                what: "time point",
                index,
                len: self.values.len(),
            })
    }

    /// index of the registered value matching `value` within tolerance
    pub fn resolve(&self, value: f64) -> Result<usize, Error> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| is_close(**v, value))
            .min_by(|(_, a), (_, b)| {
                (*a - value)
                    .abs()
                    .partial_cmp(&(*b - value).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(index, _)| index)
            .ok_or_else(|| Error::InvalidTimeValue {
                value,
                valid: self.values.clone(),
            })
    }

    pub fn set_active_value(&mut self, value: f64) -> Result<usize, Error> {
        let index = self.resolve(value)?;
        self.active = index;
        Ok(index)
    }

    pub fn set_active_index(&mut self, index: usize) -> Result<(), Error> {
        self.value(index)?;
        self.active = index;
        Ok(())
    }

    /// Replace the time values, keeping the active value if it is still registered
    /// and falling back to the first value otherwise.
    pub fn replace_values(&mut self, values: Vec<f64>) {
        let previous = self.values.get(self.active).copied();
        self.values = values;
        self.active = previous
            .and_then(|value| self.resolve(value).ok())
            .unwrap_or(0);
    }
}
