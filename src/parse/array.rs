use crate::prelude::*;
use crate::utils::{fixed_bytes, ByteOrder};

use super::dataset::FileHeader;
use super::error::*;
use super::{AppendedData, AppendedEncoding, Element};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Integer type of the byte count written in front of every binary array
pub enum HeaderType {
    #[default]
    UInt32,
    UInt64,
}

impl HeaderType {
    pub fn from_vtk(name: &str) -> Option<Self> {
        match name {
            "UInt32" => Some(Self::UInt32),
            "UInt64" => Some(Self::UInt64),
            _ => None,
        }
    }

    pub fn vtk_name(&self) -> &'static str {
        match self {
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::UInt32 => 4,
            Self::UInt64 => 8,
        }
    }

    fn read(&self, bytes: &[u8], order: ByteOrder) -> usize {
        match self {
            Self::UInt32 => u32::from_le_bytes(fixed_bytes(bytes, order)) as usize,
            Self::UInt64 => u64::from_le_bytes(fixed_bytes(bytes, order)) as usize,
        }
    }
}

/// number of base64 characters needed to encode `n` bytes, `None` on overflow
fn base64_len(n: usize) -> Option<usize> {
    (n.checked_add(2)? / 3).checked_mul(4)
}

/// decode a single `<DataArray>` element in any of the three formats
pub fn decode_data_array(
    element: &Element,
    header: &FileHeader,
    appended: Option<&AppendedData>,
) -> Result<DataArray, ParseError> {
    let name = element.attribute("Name").unwrap_or_default();

    let type_name = element.required_attribute("type")?;
    let scalar_type = ScalarType::from_vtk(type_name)
        .ok_or_else(|| UnsupportedDataType::new(name.into(), type_name.into()))?;

    let components = element
        .parsed_attribute::<usize>("NumberOfComponents")?
        .unwrap_or(1);

    let values = match element.attribute("format").unwrap_or("ascii") {
        "ascii" => parse_ascii(name, &element.text)?,
        "binary" => decode_inline(name, &element.text, scalar_type, header)?,
        "appended" => {
            let offset = element
                .parsed_attribute::<usize>("offset")?
                .ok_or_else(|| ParseError::missing_attribute("DataArray", "offset"))?;
            decode_appended(name, offset, scalar_type, header, appended)?
        }
        other => {
            let unexpected = UnexpectedAttributeValue::new(
                "DataArray".into(),
                "format".into(),
                "ascii, binary or appended".into(),
                ParsedNameOrBytes::from(other),
            );
            return Err(unexpected.into());
        }
    };

    let len = values.len();
    DataArray::from_vec(name, scalar_type, components, values).ok_or_else(|| {
        let expected = (len / components.max(1) + 1) * components.max(1);
        ParseError::length_mismatch(name, expected, len)
    })
}

fn parse_ascii(name: &str, text: &str) -> Result<Vec<f64>, ParseError> {
    text.split_ascii_whitespace()
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| ParseError::invalid_number(format!("DataArray `{name}`"), value))
        })
        .collect()
}

fn base64_decode(name: &str, encoded: &[u8]) -> Result<Vec<u8>, ParseError> {
    base64::decode(encoded).map_err(|e| Base64Array::new(name.into(), e).into())
}

/// inline base64 data: a byte count header followed by the data, either encoded as
/// one stream or as two separately padded streams
fn decode_inline(
    name: &str,
    text: &str,
    scalar_type: ScalarType,
    header: &FileHeader,
) -> Result<Vec<f64>, ParseError> {
    let encoded: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    let order = header.byte_order;
    let header_size = header.header_type.size();

    if let Ok(decoded) = base64::decode(&encoded) {
        if decoded.len() >= header_size {
            let num_bytes = header.header_type.read(&decoded[..header_size], order);
            let data = header_size
                .checked_add(num_bytes)
                .and_then(|end| decoded.get(header_size..end));
            if let Some(data) = data {
                return Ok(scalar_type.decode_all(data, order));
            }
        }
    }

    let split = base64_len(header_size).map_or(encoded.len(), |n| n.min(encoded.len()));
    let (head, body) = encoded.split_at(split);

    let head = base64_decode(name, head)?;
    let num_bytes = header.header_type.read(&head, order);

    let body = base64_decode(name, body)?;
    let data = body
        .get(..num_bytes)
        .ok_or_else(|| ParseError::length_mismatch(name, num_bytes, body.len()))?;

    Ok(scalar_type.decode_all(data, order))
}

fn out_of_bounds(name: &str, start: usize, bytes: &[u8]) -> ParseError {
    AppendedOutOfBounds::new(name.into(), start, bytes.len()).into()
}

/// `start + len`, failing when a corrupt header pushes it past the addressable range
fn checked_end(
    name: &str,
    bytes: &[u8],
    start: usize,
    len: Option<usize>,
) -> Result<usize, ParseError> {
    len.and_then(|len| start.checked_add(len))
        .ok_or_else(|| out_of_bounds(name, start, bytes))
}

fn appended_slice<'a>(
    name: &str,
    bytes: &'a [u8],
    start: usize,
    len: Option<usize>,
) -> Result<&'a [u8], ParseError> {
    let end = checked_end(name, bytes, start, len)?;
    bytes
        .get(start..end)
        .ok_or_else(|| out_of_bounds(name, start, bytes))
}

fn decode_appended(
    name: &str,
    offset: usize,
    scalar_type: ScalarType,
    header: &FileHeader,
    appended: Option<&AppendedData>,
) -> Result<Vec<f64>, ParseError> {
    let appended =
        appended.ok_or_else(|| ParseError::missing_element("VTKFile", "AppendedData"))?;

    let order = header.byte_order;
    let header_size = header.header_type.size();
    let bytes = appended.bytes.as_slice();

    match appended.encoding {
        AppendedEncoding::Raw => {
            let head = appended_slice(name, bytes, offset, Some(header_size))?;
            let num_bytes = header.header_type.read(head, order);
            let start = checked_end(name, bytes, offset, Some(header_size))?;
            let data = appended_slice(name, bytes, start, Some(num_bytes))?;
            Ok(scalar_type.decode_all(data, order))
        }
        AppendedEncoding::Base64 => {
            let head_len = base64_len(header_size);
            let head = appended_slice(name, bytes, offset, head_len)?;
            let head = base64_decode(name, head)?;
            let num_bytes = header.header_type.read(&head, order);

            let start = checked_end(name, bytes, offset, head_len)?;
            let data = appended_slice(name, bytes, start, base64_len(num_bytes))?;
            let data = base64_decode(name, data)?;
            let data = data
                .get(..num_bytes)
                .ok_or_else(|| ParseError::length_mismatch(name, num_bytes, data.len()))?;

            Ok(scalar_type.decode_all(data, order))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_document;

    fn header(header_type: HeaderType, byte_order: ByteOrder) -> FileHeader {
        FileHeader {
            kind: "PolyData".into(),
            byte_order,
            header_type,
        }
    }

    fn element(xml: &str) -> Element {
        parse_document(xml.as_bytes()).unwrap().root
    }

    #[test]
    fn ascii_array() {
        let array = element(
            r#"<DataArray type="Int32" Name="id" NumberOfComponents="2" format="ascii">
                1 2
                3 4
            </DataArray>"#,
        );
        let array = decode_data_array(&array, &FileHeader::default(), None).unwrap();

        assert_eq!(array.name, "id");
        assert_eq!(array.scalar_type, ScalarType::Int32);
        assert_eq!(array.tuples(), 2);
        assert_eq!(array.iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn base64_single_stream() {
        let mut bytes = 16u64.to_le_bytes().to_vec();
        bytes.extend(1.5f64.to_le_bytes());
        bytes.extend((-2.0f64).to_le_bytes());
        let encoded = base64::encode(&bytes);

        let xml = format!(r#"<DataArray type="Float64" Name="x" format="binary">{encoded}</DataArray>"#);
        let header = header(HeaderType::UInt64, ByteOrder::LittleEndian);
        let array = decode_data_array(&element(&xml), &header, None).unwrap();

        assert_eq!(array.iter().collect::<Vec<_>>(), vec![1.5, -2.0]);
    }

    #[test]
    fn base64_split_streams() {
        let data: Vec<u8> = 7i32.to_be_bytes().into_iter().chain(9i32.to_be_bytes()).collect();
        let encoded = format!(
            "{}{}",
            base64::encode(8u32.to_be_bytes()),
            base64::encode(&data)
        );

        let xml = format!(r#"<DataArray type="Int32" Name="n" format="binary">{encoded}</DataArray>"#);
        let header = header(HeaderType::UInt32, ByteOrder::BigEndian);
        let array = decode_data_array(&element(&xml), &header, None).unwrap();

        assert_eq!(array.iter().collect::<Vec<_>>(), vec![7.0, 9.0]);
    }

    #[test]
    fn raw_appended() {
        let mut bytes = 4u32.to_le_bytes().to_vec();
        bytes.extend(3.25f32.to_le_bytes());
        bytes.extend(8u32.to_le_bytes());
        bytes.extend(1.0f32.to_le_bytes());
        bytes.extend(2.0f32.to_le_bytes());

        let appended = AppendedData {
            encoding: AppendedEncoding::Raw,
            bytes,
        };

        let xml = r#"<DataArray type="Float32" Name="b" format="appended" offset="8"/>"#;
        let header = header(HeaderType::UInt32, ByteOrder::LittleEndian);
        let array = decode_data_array(&element(xml), &header, Some(&appended)).unwrap();
        assert_eq!(array.iter().collect::<Vec<_>>(), vec![1.0, 2.0]);

        let xml = r#"<DataArray type="Float32" Name="c" format="appended" offset="20"/>"#;
        let err = decode_data_array(&element(xml), &header, Some(&appended)).unwrap_err();
        assert!(matches!(err, ParseError::AppendedOutOfBounds(_)));
    }

    #[test]
    fn base64_appended() {
        let first = format!(
            "{}{}",
            base64::encode(8u32.to_le_bytes()),
            base64::encode(4.0f64.to_le_bytes())
        );
        let second = format!(
            "{}{}",
            base64::encode(1u32.to_le_bytes()),
            base64::encode([5u8])
        );
        let offset = first.len();

        let appended = AppendedData {
            encoding: AppendedEncoding::Base64,
            bytes: format!("{first}{second}").into_bytes(),
        };

        let header = header(HeaderType::UInt32, ByteOrder::LittleEndian);
        let xml = format!(r#"<DataArray type="UInt8" Name="u" format="appended" offset="{offset}"/>"#);
        let array = decode_data_array(&element(&xml), &header, Some(&appended)).unwrap();
        assert_eq!(array.iter().collect::<Vec<_>>(), vec![5.0]);
    }

    #[test]
    fn corrupt_byte_counts() {
        let header = header(HeaderType::UInt64, ByteOrder::LittleEndian);

        let encoded = base64::encode([0xFF; 16]);
        let xml = format!(r#"<DataArray type="Float64" Name="x" format="binary">{encoded}</DataArray>"#);
        let err = decode_data_array(&element(&xml), &header, None).unwrap_err();
        assert!(matches!(err, ParseError::LengthMismatch(_)));

        let raw = AppendedData {
            encoding: AppendedEncoding::Raw,
            bytes: vec![0xFF; 16],
        };
        let xml = r#"<DataArray type="Float64" Name="y" format="appended" offset="0"/>"#;
        let err = decode_data_array(&element(xml), &header, Some(&raw)).unwrap_err();
        assert!(matches!(err, ParseError::AppendedOutOfBounds(_)));

        let encoded = AppendedData {
            encoding: AppendedEncoding::Base64,
            bytes: base64::encode([0xFF; 16]).into_bytes(),
        };
        let err = decode_data_array(&element(xml), &header, Some(&encoded)).unwrap_err();
        assert!(matches!(err, ParseError::AppendedOutOfBounds(_)));

        let xml = format!(
            r#"<DataArray type="Float64" Name="z" format="appended" offset="{}"/>"#,
            usize::MAX
        );
        let err = decode_data_array(&element(&xml), &header, Some(&raw)).unwrap_err();
        assert!(matches!(err, ParseError::AppendedOutOfBounds(_)));
    }

    #[test]
    fn unsupported_type() {
        let xml = r#"<DataArray type="String" Name="s" format="ascii">1</DataArray>"#;
        let err = decode_data_array(&element(xml), &FileHeader::default(), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "data type `String` of array `s` is not supported"
        );
    }
}
