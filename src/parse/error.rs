use crate::prelude::*;

use super::event_summary::EventSummary;

use quick_xml::name::QName;

#[derive(Debug, thiserror::Error, From)]
/// Everything that can go wrong while reading a VTK XML document
pub enum ParseError {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedAttributeValue(UnexpectedAttributeValue),
    #[error("{0}")]
    MissingElement(MissingElement),
    #[error("{0}")]
    InvalidNumber(InvalidNumber),
    #[error("{0}")]
    Base64(Base64Array),
    #[error("{0}")]
    UnsupportedDataType(UnsupportedDataType),
    #[error("{0}")]
    UnsupportedCompression(UnsupportedCompression),
    #[error("{0}")]
    AppendedOutOfBounds(AppendedOutOfBounds),
    #[error("{0}")]
    LengthMismatch(LengthMismatch),
    #[error("{0}")]
    Utf8(Utf8),
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml element: {}", xml_err)]
pub struct MalformedXml {
    xml_err: quick_xml::Error,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml attribute: {}", att_err)]
pub struct MalformedAttribute {
    att_err: quick_xml::events::attributes::AttrError,
}

#[derive(From, Display, Debug)]
#[display(fmt = "element or attribute name is not valid UTF8: {}", utf8_err)]
pub struct Utf8 {
    utf8_err: std::str::Utf8Error,
}

#[derive(Display, Debug)]
#[display(
    fmt = "unexpected element. Expected `{}`, got {}",
    expected_name,
    actual_element
)]
pub struct UnexpectedElement {
    expected_name: String,
    actual_element: EventSummary,
}

impl UnexpectedElement {
    pub(crate) fn new<T: Into<String>>(expected_name: T, actual_element: EventSummary) -> Self {
        Self {
            expected_name: expected_name.into(),
            actual_element,
        }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "unexpected attribute value for {} in {} element: expected {}, got {}",
    attribute_name,
    element_name,
    expected_value,
    actual_value
)]
pub struct UnexpectedAttributeValue {
    pub(crate) element_name: String,
    pub(crate) attribute_name: String,
    pub(crate) expected_value: String,
    pub(crate) actual_value: ParsedNameOrBytes,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "missing attribute `{}` in {} element", attribute_name, element_name)]
pub struct MissingAttribute {
    element_name: String,
    attribute_name: String,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "missing `{}` element inside {} element", child_name, parent_name)]
pub struct MissingElement {
    parent_name: String,
    child_name: String,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "failed to parse `{}` as a number in {}", value, context)]
pub struct InvalidNumber {
    context: String,
    value: String,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "failed to decode base64 data of array `{}`: {}", array_name, source)]
pub struct Base64Array {
    array_name: String,
    source: base64::DecodeError,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "data type `{}` of array `{}` is not supported", data_type, array_name)]
pub struct UnsupportedDataType {
    array_name: String,
    data_type: String,
}

#[derive(From, Display, Debug)]
#[display(
    fmt = "compressed files are not supported (compressor `{}`)",
    compressor
)]
pub struct UnsupportedCompression {
    compressor: String,
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "array `{}` at offset {} reads past the end of the {} byte appended section",
    array_name,
    offset,
    available
)]
pub struct AppendedOutOfBounds {
    array_name: String,
    offset: usize,
    available: usize,
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "array `{}` holds {} values, expected {}",
    array_name,
    actual,
    expected
)]
pub struct LengthMismatch {
    array_name: String,
    expected: usize,
    actual: usize,
}

#[derive(From, Display, Debug)]
pub enum ParsedNameOrBytes {
    #[display(fmt = "{}", _0)]
    Utf8(String),
    #[display(fmt = "{:?} (cannot convert to UTF8 string)", _0)]
    Bytes(Vec<u8>),
}

impl ParsedNameOrBytes {
    pub(crate) fn new(bytes: &[u8]) -> Self {
        let vec = Vec::from(bytes);
        match String::from_utf8(vec) {
            Ok(string) => Self::Utf8(string),
            Err(e) => Self::Bytes(e.into_bytes()),
        }
    }
}

impl<'a> From<QName<'a>> for ParsedNameOrBytes {
    fn from(x: QName) -> Self {
        Self::new(x.as_ref())
    }
}

impl<'a> From<&'a str> for ParsedNameOrBytes {
    fn from(x: &str) -> Self {
        Self::Utf8(x.into())
    }
}

impl ParseError {
    pub(crate) fn missing_attribute(element_name: &str, attribute_name: &str) -> Self {
        MissingAttribute::new(element_name.into(), attribute_name.into()).into()
    }

    pub(crate) fn missing_element(parent_name: &str, child_name: &str) -> Self {
        MissingElement::new(parent_name.into(), child_name.into()).into()
    }

    pub(crate) fn invalid_number<T: Into<String>>(context: T, value: &str) -> Self {
        InvalidNumber::new(context.into(), value.into()).into()
    }

    pub(crate) fn length_mismatch(array_name: &str, expected: usize, actual: usize) -> Self {
        LengthMismatch::new(array_name.into(), expected, actual).into()
    }
}
