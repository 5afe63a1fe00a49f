//! Test-only EBML walker built on the crate's own decoders.

#![allow(dead_code)]

use std::io::Cursor;

use webm_muxer::ebml;
use webm_muxer::elements::{element_kind, element_name, ElementKind, CLUSTER, CUES, SEGMENT};

/// A parsed element header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub id: u32,
    /// Offset of the first ID byte.
    pub offset: u64,
    /// ID plus size field.
    pub header_size: u64,
    /// Declared payload size; `None` for unknown.
    pub size: Option<u64>,
    /// Payload size actually spanned (resolved for unknown sizes).
    pub span: u64,
}

impl Element {
    pub fn payload_start(&self) -> u64 {
        self.offset + self.header_size
    }

    pub fn end(&self) -> u64 {
        self.payload_start() + self.span
    }

    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.payload_start() as usize..self.end() as usize]
    }
}

/// Read the element header at `offset`.
pub fn read_header(data: &[u8], offset: u64) -> (u32, u64, Option<u64>) {
    let mut cursor = Cursor::new(&data[offset as usize..]);
    let (id, id_len) = ebml::read_element_id(&mut cursor).expect("element ID");
    let (size, size_len) = ebml::read_element_size(&mut cursor).expect("element size");
    (id, (id_len + size_len) as u64, size)
}

/// Walk sibling elements in `start..end`.
///
/// An unknown-size Segment runs to `end`; an unknown-size Cluster extends
/// up to the next Cluster or Cues.
pub fn walk(data: &[u8], start: u64, end: u64) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut offset = start;
    while offset < end {
        let (id, header_size, size) = read_header(data, offset);
        let span = match size {
            Some(size) => size,
            None if id == SEGMENT => end - offset - header_size,
            None => unknown_span(data, offset + header_size, end),
        };
        elements.push(Element {
            id,
            offset,
            header_size,
            size,
            span,
        });
        offset += header_size + span;
    }
    assert_eq!(offset, end, "elements overrun their parent");
    elements
}

fn unknown_span(data: &[u8], payload_start: u64, end: u64) -> u64 {
    let mut offset = payload_start;
    while offset < end {
        let (id, header_size, size) = read_header(data, offset);
        if id == CLUSTER || id == CUES {
            break;
        }
        offset += header_size + size.expect("nested unknown size");
    }
    offset - payload_start
}

/// Children of `parent`.
pub fn children(data: &[u8], parent: &Element) -> Vec<Element> {
    assert_eq!(
        element_kind(parent.id),
        Some(ElementKind::Master),
        "{} has no children",
        element_name(parent.id)
    );
    walk(data, parent.payload_start(), parent.end())
}

/// First child of `parent` with `id`.
pub fn child(data: &[u8], parent: &Element, id: u32) -> Option<Element> {
    children(data, parent).into_iter().find(|e| e.id == id)
}

/// Big-endian unsigned payload of `element`.
pub fn read_uint(data: &[u8], element: &Element) -> u64 {
    element
        .payload(data)
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Top-level EBML header and Segment.
pub fn top_level(data: &[u8]) -> (Element, Element) {
    let elements = walk(data, 0, data.len() as u64);
    assert_eq!(elements.len(), 2, "expected EBML header and one Segment");
    (elements[0], elements[1])
}
