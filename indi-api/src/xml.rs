//! A minimal DOM-ish tree over `quick_xml`, sized for INDI's wire
//! format: a stream of sibling elements with no enclosing root, each
//! shallow (attributes plus either text or further child elements).

use crate::types::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::BTreeMap;
use std::io::BufRead;

/// One parsed XML element: a tag, its attributes, and either text
/// content or child elements (INDI never mixes the two at a given
/// level).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Text content with leading/trailing whitespace trimmed, the way
    /// INDI's pretty-printed indentation needs to be ignored.
    pub fn text_trimmed(&self) -> &str {
        self.text.trim()
    }
}

fn decode_attrs(start: &BytesStart) -> Result<BTreeMap<String, String>> {
    let mut attrs = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::BadFormat(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::BadFormat(e.to_string()))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// Reads one top-level element (with all of its descendants) from
/// `reader`, or `Ok(None)` at end of stream. Text and comment/PI
/// events between top-level elements are skipped.
pub fn read_element<R: BufRead>(reader: &mut Reader<R>) -> Result<Option<Element>> {
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::BadFormat(e.to_string()))?;
        match event {
            Event::Eof => return Ok(None),
            Event::Start(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let attrs = decode_attrs(&start)?;
                let element = read_body(reader, tag, attrs)?;
                return Ok(Some(element));
            }
            Event::Empty(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let attrs = decode_attrs(&start)?;
                return Ok(Some(Element {
                    tag,
                    attrs,
                    ..Default::default()
                }));
            }
            _ => {
                buf.clear();
                continue;
            }
        }
    }
}

/// Reads the children and text of an element whose opening tag has
/// already been consumed, through its matching end tag.
fn read_body<R: BufRead>(
    reader: &mut Reader<R>,
    tag: String,
    attrs: BTreeMap<String, String>,
) -> Result<Element> {
    let mut element = Element {
        tag,
        attrs,
        ..Default::default()
    };
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::BadFormat(e.to_string()))?;
        match event {
            Event::Eof => {
                return Err(Error::BadFormat(format!(
                    "unexpected end of stream inside <{}>",
                    element.tag
                )))
            }
            Event::End(end) => {
                let closing = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if closing != element.tag {
                    return Err(Error::BadFormat(format!(
                        "mismatched close tag: expected </{}>, found </{}>",
                        element.tag, closing
                    )));
                }
                return Ok(element);
            }
            Event::Start(start) => {
                let child_tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let child_attrs = decode_attrs(&start)?;
                let child = read_body(reader, child_tag, child_attrs)?;
                element.children.push(child);
            }
            Event::Empty(start) => {
                let child_tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let child_attrs = decode_attrs(&start)?;
                element.children.push(Element {
                    tag: child_tag,
                    attrs: child_attrs,
                    ..Default::default()
                });
            }
            Event::Text(text) | Event::CData(text) => {
                let decoded = text
                    .decode()
                    .map_err(|e| Error::BadFormat(e.to_string()))?;
                element.text.push_str(decoded.as_ref());
            }
            _ => {}
        }
        buf.clear();
    }
}
