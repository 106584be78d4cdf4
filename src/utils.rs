use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Byte order of binary payloads
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// parse the `byte_order` attribute of a `VTKFile` element
    pub(crate) fn from_vtk(value: &str) -> Option<Self> {
        match value {
            "LittleEndian" => Some(Self::LittleEndian),
            "BigEndian" => Some(Self::BigEndian),
            _ => None,
        }
    }

    pub(crate) fn vtk_name(&self) -> &'static str {
        match self {
            Self::LittleEndian => "LittleEndian",
            Self::BigEndian => "BigEndian",
        }
    }
}

/// copy up to `N` bytes into a fixed size array, respecting byte order
pub(crate) fn fixed_bytes<const N: usize>(bytes: &[u8], order: ByteOrder) -> [u8; N] {
    let mut arr = [0; N];
    bytes
        .iter()
        .take(N)
        .enumerate()
        .for_each(|(idx, value)| arr[idx] = *value);

    // normalize everything to little endian so callers only use `from_le_bytes`
    if order == ByteOrder::BigEndian {
        arr.reverse();
    }

    arr
}

/// lowercase file name of a path, used for suffix matching
pub(crate) fn lowercase_file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_ascii_lowercase())
}

/// `a` and `b` are equal within the crate wide time tolerance
pub(crate) fn is_close(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs());
    (a - b).abs()
        <= crate::config::TIME_ABSOLUTE_TOLERANCE + crate::config::TIME_RELATIVE_TOLERANCE * scale
}
