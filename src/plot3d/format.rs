//! Byte level layout of Plot3D grid (`.xyz`), solution (`.q`) and function (`.f`)
//! files.
//!
//! Every file is a sequence of records: an optional block count for multi-grid files,
//! the dimensions of every block, then the data of every block. Binary files written
//! by Fortran wrap each record in 4 byte length markers.

use crate::prelude::*;
use crate::utils::{fixed_bytes, ByteOrder};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("unexpected end of file at position {position}")]
    UnexpectedEof { position: usize },
    #[error("`{0}` is not a valid number")]
    InvalidAscii(String),
    #[error("record marker mismatch at byte {position}: opened with {opened}, closed with {closed}")]
    RecordMismatch {
        position: usize,
        opened: i32,
        closed: i32,
    },
    #[error("invalid block dimensions {0:?}")]
    InvalidDimensions(Vec<i64>),
    #[error("no supported layout matches the {0} byte file")]
    Undetected(usize),
    #[error("{unread} bytes left after reading every block")]
    TrailingData { unread: usize },
    #[error("{file} file holds {found} blocks but the grid holds {expected}")]
    BlockCount {
        file: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("block {block} of the {file} file has dimensions {found:?}, the grid has {expected:?}")]
    BlockDimensions {
        file: &'static str,
        block: usize,
        expected: [usize; 3],
        found: [usize; 3],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Binary,
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Width of floating point values in binary files
pub enum Precision {
    #[default]
    Single,
    Double,
}

impl Precision {
    fn size(&self) -> usize {
        match self {
            Self::Single => 4,
            Self::Double => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How a Plot3D file is laid out on disk
pub struct FileLayout {
    pub format: FileFormat,
    pub byte_order: ByteOrder,
    pub precision: Precision,
    /// the file starts with a block count
    pub multi_grid: bool,
    /// every record is wrapped in Fortran length markers
    pub fortran_records: bool,
    /// an integer visibility value follows the coordinates of every point
    pub iblanking: bool,
    /// blocks have two dimensions and no z coordinates
    pub two_dimensional: bool,
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            format: FileFormat::Binary,
            byte_order: ByteOrder::LittleEndian,
            precision: Precision::Single,
            multi_grid: false,
            fortran_records: false,
            iblanking: false,
            two_dimensional: false,
        }
    }
}

impl FileLayout {
    /// every binary layout, in the order auto-detection tries them
    fn binary_candidates() -> Vec<Self> {
        let mut candidates = Vec::new();
        for byte_order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            for fortran_records in [false, true] {
                for multi_grid in [false, true] {
                    for precision in [Precision::Single, Precision::Double] {
                        for iblanking in [false, true] {
                            for two_dimensional in [false, true] {
                                candidates.push(Self {
                                    format: FileFormat::Binary,
                                    byte_order,
                                    precision,
                                    multi_grid,
                                    fortran_records,
                                    iblanking,
                                    two_dimensional,
                                });
                            }
                        }
                    }
                }
            }
        }
        candidates
    }

    fn ascii_candidates() -> Vec<Self> {
        let mut candidates = Vec::new();
        for multi_grid in [false, true] {
            for iblanking in [false, true] {
                for two_dimensional in [false, true] {
                    candidates.push(Self {
                        format: FileFormat::Ascii,
                        multi_grid,
                        iblanking,
                        two_dimensional,
                        ..Self::default()
                    });
                }
            }
        }
        candidates
    }
}

/// Sequential reader over the values of a file
struct Stream<'a> {
    layout: FileLayout,
    bytes: &'a [u8],
    tokens: Vec<&'a str>,
    position: usize,
    record: Option<(usize, i32)>,
}

impl<'a> Stream<'a> {
    fn new(bytes: &'a [u8], layout: FileLayout) -> Self {
        let tokens = match layout.format {
            FileFormat::Ascii => std::str::from_utf8(bytes)
                .map(|text| text.split_ascii_whitespace().collect())
                .unwrap_or_default(),
            FileFormat::Binary => Vec::new(),
        };

        Self {
            layout,
            bytes,
            tokens,
            position: 0,
            record: None,
        }
    }

    fn is_binary(&self) -> bool {
        self.layout.format == FileFormat::Binary
    }

    fn take_bytes(&mut self, len: usize) -> Result<&'a [u8], LayoutError> {
        let bytes = self
            .bytes
            .get(self.position..self.position + len)
            .ok_or(LayoutError::UnexpectedEof {
                position: self.position,
            })?;
        self.position += len;
        Ok(bytes)
    }

    fn take_token(&mut self) -> Result<&'a str, LayoutError> {
        let token = self
            .tokens
            .get(self.position)
            .copied()
            .ok_or(LayoutError::UnexpectedEof {
                position: self.position,
            })?;
        self.position += 1;
        Ok(token)
    }

    fn raw_i32(&mut self) -> Result<i32, LayoutError> {
        let bytes = self.take_bytes(4)?;
        Ok(i32::from_le_bytes(fixed_bytes(bytes, self.layout.byte_order)))
    }

    fn read_i32(&mut self) -> Result<i32, LayoutError> {
        if self.is_binary() {
            self.raw_i32()
        } else {
            let token = self.take_token()?;
            token
                .parse::<i32>()
                .or_else(|_| token.parse::<f64>().map(|v| v as i32))
                .map_err(|_| LayoutError::InvalidAscii(token.to_string()))
        }
    }

    fn read_f64(&mut self) -> Result<f64, LayoutError> {
        if self.is_binary() {
            let order = self.layout.byte_order;
            match self.layout.precision {
                Precision::Single => {
                    let bytes = self.take_bytes(4)?;
                    Ok(f32::from_le_bytes(fixed_bytes(bytes, order)) as f64)
                }
                Precision::Double => {
                    let bytes = self.take_bytes(8)?;
                    Ok(f64::from_le_bytes(fixed_bytes(bytes, order)))
                }
            }
        } else {
            let token = self.take_token()?;
            parse_ascii_float(token)
        }
    }

    /// read `len` floats, checking the file is long enough before allocating
    fn read_f64s(&mut self, len: usize) -> Result<Vec<f64>, LayoutError> {
        let needed = if self.is_binary() {
            len.saturating_mul(self.layout.precision.size())
        } else {
            len
        };
        if needed > self.remaining() {
            return Err(LayoutError::UnexpectedEof {
                position: self.position,
            });
        }

        (0..len).map(|_| self.read_f64()).collect()
    }

    fn read_i32s(&mut self, len: usize) -> Result<Vec<i32>, LayoutError> {
        let needed = if self.is_binary() { len.saturating_mul(4) } else { len };
        if needed > self.remaining() {
            return Err(LayoutError::UnexpectedEof {
                position: self.position,
            });
        }

        (0..len).map(|_| self.read_i32()).collect()
    }

    fn remaining(&self) -> usize {
        if self.is_binary() {
            self.bytes.len().saturating_sub(self.position)
        } else {
            self.tokens.len().saturating_sub(self.position)
        }
    }

    fn begin_record(&mut self) -> Result<(), LayoutError> {
        if self.is_binary() && self.layout.fortran_records {
            let length = self.raw_i32()?;
            self.record = Some((self.position, length));
        }
        Ok(())
    }

    fn end_record(&mut self) -> Result<(), LayoutError> {
        if let Some((start, opened)) = self.record.take() {
            let closed = self.raw_i32()?;
            let written = (self.position - 4 - start) as i64;
            if closed != opened || written != opened as i64 {
                return Err(LayoutError::RecordMismatch {
                    position: self.position,
                    opened,
                    closed,
                });
            }
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), LayoutError> {
        match self.remaining() {
            0 => Ok(()),
            unread => Err(LayoutError::TrailingData { unread }),
        }
    }
}

/// Fortran writes doubles as `1.5D+00`
fn parse_ascii_float(token: &str) -> Result<f64, LayoutError> {
    token
        .parse::<f64>()
        .or_else(|_| token.replace(['D', 'd'], "E").parse::<f64>())
        .map_err(|_| LayoutError::InvalidAscii(token.to_string()))
}

/// read the optional block count and the dimensions of every block
fn read_header(stream: &mut Stream<'_>, extra: bool) -> Result<Vec<([usize; 3], usize)>, LayoutError> {
    let blocks = if stream.layout.multi_grid {
        stream.begin_record()?;
        let blocks = stream.read_i32()?;
        stream.end_record()?;
        if blocks < 1 {
            return Err(LayoutError::InvalidDimensions(vec![blocks as i64]));
        }
        blocks as usize
    } else {
        1
    };

    let per_block = if stream.layout.two_dimensional { 2 } else { 3 } + usize::from(extra);
    // every block needs at least its dimensions
    if blocks.saturating_mul(per_block) > stream.remaining() {
        return Err(LayoutError::UnexpectedEof {
            position: stream.position,
        });
    }

    stream.begin_record()?;
    let mut headers = Vec::with_capacity(blocks);
    for _ in 0..blocks {
        let ni = stream.read_i32()?;
        let nj = stream.read_i32()?;
        let nk = if stream.layout.two_dimensional {
            1
        } else {
            stream.read_i32()?
        };
        let nvars = if extra { stream.read_i32()? } else { 0 };

        let invalid = || LayoutError::InvalidDimensions(vec![ni as i64, nj as i64, nk as i64, nvars as i64]);
        if ni < 1 || nj < 1 || nk < 1 || nvars < 0 {
            return Err(invalid());
        }

        // every point takes at least one value, larger blocks cannot fit in the file
        let dims = [ni as usize, nj as usize, nk as usize];
        match dims[0].checked_mul(dims[1]).and_then(|n| n.checked_mul(dims[2])) {
            Some(n) if n <= stream.remaining() => headers.push((dims, nvars as usize)),
            _ => return Err(invalid()),
        }
    }
    stream.end_record()?;

    Ok(headers)
}

#[derive(Debug, Clone, PartialEq)]
/// A single block of a grid file
pub struct GridBlock {
    pub dims: [usize; 3],
    /// `(n_points, 3)` coordinates, z is zero for two dimensional grids
    pub points: Array2<f64>,
    pub iblank: Option<Vec<i32>>,
}

impl GridBlock {
    pub fn n_points(&self) -> usize {
        self.dims.iter().product()
    }
}

/// read every block of a grid file with a known layout
pub fn read_grid(bytes: &[u8], layout: &FileLayout) -> Result<Vec<GridBlock>, LayoutError> {
    let mut stream = Stream::new(bytes, *layout);
    let headers = read_header(&mut stream, false)?;

    let mut blocks = Vec::with_capacity(headers.len());
    for (dims, _) in headers {
        let n = dims.iter().product::<usize>();
        let mut points = Array2::zeros((n, 3));

        stream.begin_record()?;
        let axes = if layout.two_dimensional { 2 } else { 3 };
        for axis in 0..axes {
            let values = stream.read_f64s(n)?;
            points.column_mut(axis).assign(&Array1::from(values));
        }
        let iblank = if layout.iblanking {
            Some(stream.read_i32s(n)?)
        } else {
            None
        };
        stream.end_record()?;

        blocks.push(GridBlock {
            dims,
            points,
            iblank,
        });
    }

    stream.finish()?;
    Ok(blocks)
}

/// Detect the layout of a grid file: ascii when the file is numeric text, otherwise
/// the first binary layout that consumes the file exactly.
pub fn detect_layout(bytes: &[u8]) -> Result<FileLayout, LayoutError> {
    let is_text = !bytes.is_empty()
        && bytes.iter().all(|b| {
            b.is_ascii_digit() || b.is_ascii_whitespace() || b"+-.eEdD".contains(b)
        });

    let candidates = if is_text {
        FileLayout::ascii_candidates()
    } else {
        FileLayout::binary_candidates()
    };

    candidates
        .into_iter()
        .find(|layout| read_grid(bytes, layout).is_ok())
        .ok_or(LayoutError::Undetected(bytes.len()))
}

#[derive(Debug, Clone, PartialEq)]
/// A single block of a solution file
pub struct QBlock {
    /// free-stream Mach number, angle of attack, Reynolds number and time
    pub properties: [f64; 4],
    pub density: Vec<f64>,
    /// `(n_points, 3)`, z is zero for two dimensional files
    pub momentum: Array2<f64>,
    pub energy: Vec<f64>,
}

fn check_dims(
    file: &'static str,
    grid: &[GridBlock],
    dims: &[[usize; 3]],
) -> Result<(), LayoutError> {
    if grid.len() != dims.len() {
        return Err(LayoutError::BlockCount {
            file,
            expected: grid.len(),
            found: dims.len(),
        });
    }

    for (block, (g, found)) in grid.iter().zip(dims).enumerate() {
        if g.dims != *found {
            return Err(LayoutError::BlockDimensions {
                file,
                block,
                expected: g.dims,
                found: *found,
            });
        }
    }

    Ok(())
}

/// read every block of a solution file, checking it matches the grid
pub fn read_q(bytes: &[u8], layout: &FileLayout, grid: &[GridBlock]) -> Result<Vec<QBlock>, LayoutError> {
    let mut stream = Stream::new(bytes, *layout);
    let headers = read_header(&mut stream, false)?;
    let dims: Vec<[usize; 3]> = headers.iter().map(|(d, _)| *d).collect();
    check_dims("q", grid, &dims)?;

    let mut blocks = Vec::with_capacity(dims.len());
    for dims in dims {
        let n = dims.iter().product::<usize>();

        stream.begin_record()?;
        let mut properties = [0.0; 4];
        for value in properties.iter_mut() {
            *value = stream.read_f64()?;
        }
        stream.end_record()?;

        stream.begin_record()?;
        let density = stream.read_f64s(n)?;
        let mut momentum = Array2::zeros((n, 3));
        let components = if layout.two_dimensional { 2 } else { 3 };
        for component in 0..components {
            let values = stream.read_f64s(n)?;
            momentum.column_mut(component).assign(&Array1::from(values));
        }
        let energy = stream.read_f64s(n)?;
        stream.end_record()?;

        blocks.push(QBlock {
            properties,
            density,
            momentum,
            energy,
        });
    }

    stream.finish()?;
    Ok(blocks)
}

/// read every block of a function file: one `Vec` per variable, per block
pub fn read_functions(
    bytes: &[u8],
    layout: &FileLayout,
    grid: &[GridBlock],
) -> Result<Vec<Vec<Vec<f64>>>, LayoutError> {
    let mut stream = Stream::new(bytes, *layout);
    let headers = read_header(&mut stream, true)?;
    let dims: Vec<[usize; 3]> = headers.iter().map(|(d, _)| *d).collect();
    check_dims("function", grid, &dims)?;

    let mut blocks = Vec::with_capacity(headers.len());
    for (dims, nvars) in headers {
        let n = dims.iter().product::<usize>();

        stream.begin_record()?;
        let variables = (0..nvars)
            .map(|_| stream.read_f64s(n))
            .collect::<Result<Vec<_>, _>>()?;
        stream.end_record()?;

        blocks.push(variables);
    }

    stream.finish()?;
    Ok(blocks)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// write a single precision grid the way a C program would, optionally with
    /// Fortran record markers and in big endian
    pub(crate) fn grid_bytes(
        blocks: &[([usize; 3], Vec<[f64; 3]>)],
        multi_grid: bool,
        fortran: bool,
        big_endian: bool,
    ) -> Vec<u8> {
        let int = |v: i32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        let float = |v: f64| {
            if big_endian {
                (v as f32).to_be_bytes()
            } else {
                (v as f32).to_le_bytes()
            }
        };

        let mut out = Vec::new();
        let record = |out: &mut Vec<u8>, body: Vec<u8>| {
            if fortran {
                out.extend(int(body.len() as i32));
            }
            out.extend(&body);
            if fortran {
                out.extend(int(body.len() as i32));
            }
        };

        if multi_grid {
            record(&mut out, int(blocks.len() as i32).to_vec());
        }

        let mut dims = Vec::new();
        for (d, _) in blocks {
            for v in d {
                dims.extend(int(*v as i32));
            }
        }
        record(&mut out, dims);

        for (_, points) in blocks {
            let mut body = Vec::new();
            for axis in 0..3 {
                for p in points {
                    body.extend(float(p[axis]));
                }
            }
            record(&mut out, body);
        }

        out
    }

    fn unit_cube() -> ([usize; 3], Vec<[f64; 3]>) {
        let mut points = Vec::new();
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    points.push([i as f64, j as f64, k as f64]);
                }
            }
        }
        ([2, 2, 2], points)
    }

    #[test]
    fn detect_plain_binary() {
        let bytes = grid_bytes(&[unit_cube()], false, false, false);
        let layout = detect_layout(&bytes).unwrap();

        assert_eq!(layout.byte_order, ByteOrder::LittleEndian);
        assert!(!layout.multi_grid);
        assert!(!layout.fortran_records);
        assert_eq!(layout.precision, Precision::Single);

        let grid = read_grid(&bytes, &layout).unwrap();
        assert_eq!(grid[0].dims, [2, 2, 2]);
        assert_eq!(grid[0].points.row(7).to_vec(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn detect_fortran_big_endian_multi_grid() {
        let bytes = grid_bytes(&[unit_cube(), unit_cube()], true, true, true);
        let layout = detect_layout(&bytes).unwrap();

        assert_eq!(layout.byte_order, ByteOrder::BigEndian);
        assert!(layout.multi_grid);
        assert!(layout.fortran_records);

        let grid = read_grid(&bytes, &layout).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[1].n_points(), 8);
    }

    #[test]
    fn ascii_grid() {
        let text = "1\n2 1 1\n0.0 1.5D+00\n0 0\n0 0\n";
        let layout = detect_layout(text.as_bytes()).unwrap();
        assert_eq!(layout.format, FileFormat::Ascii);
        assert!(layout.multi_grid);

        let grid = read_grid(text.as_bytes(), &layout).unwrap();
        assert_eq!(grid[0].points[[1, 0]], 1.5);
    }

    #[test]
    fn truncated_file() {
        let mut bytes = grid_bytes(&[unit_cube()], false, false, false);
        bytes.truncate(bytes.len() - 3);
        assert!(detect_layout(&bytes).is_err());
        assert!(read_grid(&bytes, &FileLayout::default()).is_err());
    }
}
