/// Describes the inclusive index range of a structured dataset, as found in the
/// `WholeExtent` and `Extent` attributes of a VTK file.
///
/// An axis whose end is smaller than its start is empty, which is how an empty
/// structured dataset is written (`"0 -1 0 -1 0 -1"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub x_start: i64,
    pub x_end: i64,
    pub y_start: i64,
    pub y_end: i64,
    pub z_start: i64,
    pub z_end: i64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::empty()
    }
}

impl Extent {
    /// extent of a grid with the given number of points per axis, starting at 0
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            x_start: 0,
            x_end: nx as i64 - 1,
            y_start: 0,
            y_end: ny as i64 - 1,
            z_start: 0,
            z_end: nz as i64 - 1,
        }
    }

    /// extent with no points
    pub fn empty() -> Self {
        Self::new(0, 0, 0)
    }

    /// parse an extent string you would find in a vtk file. The expected input is in
    /// the form `"x_start x_end y_start y_end z_start z_end"`
    ///
    /// # Example
    /// ```
    /// let extent = vtk_readers::Extent::from_span_string("0 10 0 20 0 -1").unwrap();
    /// assert_eq!(extent.dimensions(), [11, 21, 0]);
    /// ```
    ///
    /// Returns `None` if there are not exactly 6 integers.
    pub fn from_span_string(span_string: &str) -> Option<Self> {
        let values = span_string
            .split_ascii_whitespace()
            .map(|x| x.parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()?;

        match values.as_slice() {
            [x_start, x_end, y_start, y_end, z_start, z_end] => Some(Self {
                x_start: *x_start,
                x_end: *x_end,
                y_start: *y_start,
                y_end: *y_end,
                z_start: *z_start,
                z_end: *z_end,
            }),
            _ => None,
        }
    }

    /// number of points in the X direction
    pub fn x_len(&self) -> usize {
        axis_len(self.x_start, self.x_end)
    }

    /// number of points in the Y direction
    pub fn y_len(&self) -> usize {
        axis_len(self.y_start, self.y_end)
    }

    /// number of points in the Z direction
    pub fn z_len(&self) -> usize {
        axis_len(self.z_start, self.z_end)
    }

    pub fn dimensions(&self) -> [usize; 3] {
        [self.x_len(), self.y_len(), self.z_len()]
    }

    pub fn num_points(&self) -> usize {
        self.x_len()
            .saturating_mul(self.y_len())
            .saturating_mul(self.z_len())
    }

    /// number of cells as VTK counts them: an axis with a single point does not
    /// multiply the count, and a grid of a single point holds a single vertex cell
    pub fn num_cells(&self) -> usize {
        let dims = self.dimensions();
        if dims.iter().any(|d| *d == 0) {
            return 0;
        }

        dims.iter()
            .map(|d| if *d > 1 { d - 1 } else { 1 })
            .fold(1, usize::saturating_mul)
    }

    /// Format the extent into a string that would be written to a vtk file
    pub fn to_span_string(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.x_start, self.x_end, self.y_start, self.y_end, self.z_start, self.z_end
        )
    }
}

fn axis_len(start: i64, end: i64) -> usize {
    if end < start {
        0
    } else {
        usize::try_from(end.abs_diff(start))
            .unwrap_or(usize::MAX)
            .saturating_add(1)
    }
}
