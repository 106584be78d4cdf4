//! reading and parsing xml VTK files
//!
//! A VTK XML file is first read into a small [`Document`] tree of [`Element`]s. The
//! `<AppendedData>` section is not valid XML when it holds raw binary, so its bytes
//! are sliced out of the input directly and kept on the document.
//!
//! The tree is then turned into a [`Mesh`](crate::Mesh) by [`read_mesh`], which
//! decodes every `<DataArray>` through the ascii, inline binary or appended paths.

mod array;
mod dataset;
mod error;
mod event_summary;

pub use array::{decode_data_array, HeaderType};
pub use dataset::{list_arrays, read_mesh, FileHeader};
pub use error::*;
pub use event_summary::EventSummary;

use crate::prelude::*;

use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

#[derive(Debug, Clone, PartialEq, Default)]
/// A parsed xml element with its attributes, children and text content
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(Utf8::from)?
            .to_string();

        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(MalformedAttribute::from)?;
            let key = std::str::from_utf8(attribute.key.as_ref()).map_err(Utf8::from)?;
            let value = attribute.unescape_value().map_err(MalformedXml::from)?;
            attributes.push((key.to_string(), value.into_owned()));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// the value of `key`, or a `MissingAttribute` error naming this element
    pub fn required_attribute(&self, key: &str) -> Result<&str, ParseError> {
        self.attribute(key)
            .ok_or_else(|| ParseError::missing_attribute(&self.name, key))
    }

    /// parse the value of `key` as a number, `None` if the attribute is absent
    pub fn parsed_attribute<T: std::str::FromStr>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ParseError> {
        match self.attribute(key) {
            Some(value) => value.trim().parse().map(Some).map_err(|_| {
                ParseError::invalid_number(format!("{} attribute {key}", self.name), value)
            }),
            None => Ok(None),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn required_child(&self, name: &str) -> Result<&Element, ParseError> {
        self.child(name)
            .ok_or_else(|| ParseError::missing_element(&self.name, name))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendedEncoding {
    Raw,
    Base64,
}

#[derive(Debug, Clone, PartialEq)]
/// The bytes following the `_` marker of an `<AppendedData>` element
pub struct AppendedData {
    pub encoding: AppendedEncoding,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
    pub appended: Option<AppendedData>,
}

/// read in and parse an xml document for a given path
pub fn read_document(path: &Path) -> Result<Document, DecodeError> {
    let bytes = std::fs::read(path)?;
    Ok(parse_document(&bytes)?)
}

/// parse an in-memory xml document into an element tree
pub fn parse_document(bytes: &[u8]) -> Result<Document, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut buffer = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut appended = None;

    loop {
        let event = reader
            .read_event_into(&mut buffer)
            .map_err(MalformedXml::from)?;

        match event {
            Event::Start(start) => {
                let element = Element::from_start(&start)?;

                if element.name == "AppendedData" {
                    appended = Some(slice_appended(bytes, reader.buffer_position(), &element)?);
                    attach(&mut stack, &mut root, element)?;
                    break;
                }

                stack.push(element);
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(end) => {
                let element = match stack.pop() {
                    Some(element) => element,
                    None => {
                        let unexpected =
                            UnexpectedElement::new("start element", EventSummary::end(&end));
                        return Err(unexpected.into());
                    }
                };

                if element.name.as_bytes() != end.name().as_ref() {
                    let unexpected =
                        UnexpectedElement::new(format!("/{}", element.name), EventSummary::end(&end));
                    return Err(unexpected.into());
                }

                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(MalformedXml::from)?;
                    push_text(current, &text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let text = std::str::from_utf8(&data).map_err(Utf8::from)?;
                    push_text(current, text);
                }
            }
            Event::Eof => break,
            _ => (),
        }

        buffer.clear();
    }

    // unclosed elements are only allowed after the appended section, which ends the
    // xml portion of the file
    if appended.is_none() {
        if let Some(open) = stack.last() {
            return Err(UnexpectedElement::new(format!("/{}", open.name), EventSummary::eof()).into());
        }
    }

    while let Some(element) = stack.pop() {
        attach(&mut stack, &mut root, element)?;
    }

    match root {
        Some(root) => Ok(Document { root, appended }),
        None => Err(UnexpectedElement::new("root element", EventSummary::eof()).into()),
    }
}

fn push_text(element: &mut Element, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !element.text.is_empty() {
        element.text.push(' ');
    }
    element.text.push_str(text);
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }

    if root.is_some() {
        return Err(UnexpectedElement::new("eof", EventSummary::element(&element.name)).into());
    }

    *root = Some(element);
    Ok(())
}

/// slice the bytes between the `_` marker and the closing `</AppendedData>` tag
fn slice_appended(bytes: &[u8], position: usize, element: &Element) -> Result<AppendedData, ParseError> {
    let encoding = match element.attribute("encoding").unwrap_or("raw") {
        "raw" => AppendedEncoding::Raw,
        "base64" => AppendedEncoding::Base64,
        other => {
            let unexpected = UnexpectedAttributeValue::new(
                "AppendedData".into(),
                "encoding".into(),
                "raw or base64".into(),
                ParsedNameOrBytes::from(other),
            );
            return Err(unexpected.into());
        }
    };

    let rest = bytes.get(position..).unwrap_or_default();
    let start = rest
        .iter()
        .position(|b| *b == b'_')
        .ok_or_else(|| ParseError::missing_element("AppendedData", "_"))?
        + 1;

    let closing = b"</AppendedData>";
    let end = rest
        .windows(closing.len())
        .rposition(|window| window == closing)
        .ok_or_else(|| ParseError::missing_element("VTKFile", "/AppendedData"))?;

    if end < start {
        return Err(ParseError::missing_element("AppendedData", "_"));
    }

    let mut data = rest[start..end].to_vec();
    if encoding == AppendedEncoding::Base64 {
        data.retain(|b| !b.is_ascii_whitespace());
    }

    Ok(AppendedData {
        encoding,
        bytes: data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_tree() {
        let xml = br#"<?xml version="1.0"?>
            <VTKFile type="PolyData" version="0.1">
                <PolyData>
                    <Piece NumberOfPoints="1">
                        <Points>
                            <DataArray type="Float32" NumberOfComponents="3" format="ascii">
                                0 1 2
                            </DataArray>
                        </Points>
                    </Piece>
                </PolyData>
            </VTKFile>"#;

        let document = parse_document(xml).unwrap();
        assert_eq!(document.root.name, "VTKFile");
        assert_eq!(document.root.attribute("type"), Some("PolyData"));
        assert!(document.appended.is_none());

        let array = document
            .root
            .required_child("PolyData")
            .and_then(|p| p.required_child("Piece"))
            .and_then(|p| p.required_child("Points"))
            .and_then(|p| p.required_child("DataArray"))
            .unwrap();
        assert_eq!(array.text, "0 1 2");
        assert_eq!(array.parsed_attribute::<usize>("NumberOfComponents").unwrap(), Some(3));
    }

    #[test]
    fn raw_appended_section() {
        let mut xml = br#"<VTKFile type="ImageData"><AppendedData encoding="raw">
            _"#
        .to_vec();
        xml.extend([0u8, b'<', 255, b'_']);
        xml.extend(b"\n</AppendedData>\n</VTKFile>");

        let document = parse_document(&xml).unwrap();
        let appended = document.appended.unwrap();
        assert_eq!(appended.encoding, AppendedEncoding::Raw);
        assert_eq!(appended.bytes[..4], [0u8, b'<', 255, b'_']);
        assert_eq!(document.root.children[0].name, "AppendedData");
    }

    #[test]
    fn mismatched_end() {
        let err = parse_document(b"<VTKFile><Piece></VTKFile>").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedElement(_) | ParseError::MalformedXml(_)));
    }

    #[test]
    fn missing_attribute_message() {
        let document = parse_document(br#"<VTKFile type="PolyData"/>"#).unwrap();
        let err = document.root.required_attribute("version").unwrap_err();
        assert_eq!(err.to_string(), "missing attribute `version` in VTKFile element");
    }
}
