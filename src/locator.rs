//! Streaming lookup of a nested XML field, and mapping of the found value
//! back to a character span in the original text.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::Error;
use crate::types::Location;

/// A field addressed by its own element name and the name of the element
/// that must directly enclose it.
#[derive(Debug, Clone, Copy)]
pub struct FieldPath<'a> {
    /// Name of the target element.
    pub field: &'a str,
    /// Name of the element that must be the target's immediate parent.
    pub parent: &'a str,
}

/// `<project><version>` in a Maven POM.
pub const POM_VERSION: FieldPath<'static> = FieldPath { field: "version", parent: "project" };

/// Text of a located field and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedValue {
    /// One-based line number where the text content begins.
    pub line: usize,
    /// Text content as reported by the tokenizer.
    pub value: String,
}

/// Find the first text content of `path.field` directly under `path.parent`.
///
/// One pass over the document keeping only the stack of open element names.
/// Returns `Ok(None)` when the field never appears.
///
/// # Errors
///
/// Returns `Error::Xml` if the document is not well-formed before the field
/// is reached.
pub fn locate_field(text: &str, path: FieldPath<'_>) -> Result<Option<LocatedValue>, Error> {
    let mut found = None;
    visit_fields(text, path, |value| {
        found = Some(value);
        return false;
    })?;
    return Ok(found);
}

/// Feed the text content of every `path.field` directly under
/// `path.parent` to `visitor`, in document order, until it returns false.
///
/// # Errors
///
/// Returns `Error::Xml` if the document is not well-formed before the
/// visitor stops.
pub fn visit_fields<F>(text: &str, path: FieldPath<'_>, mut visitor: F) -> Result<(), Error>
where
    F: FnMut(LocatedValue) -> bool,
{
    let mut reader = Reader::from_str(text);
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut armed = false;

    loop {
        let event_start = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        let value = match reader.read_event()? {
            Event::CData(data) if armed => String::from_utf8_lossy(&data.into_inner()).into_owned(),
            Event::End(_) => {
                armed = false;
                open.pop();
                continue;
            },
            Event::Eof => return Ok(()),
            Event::Start(start) => {
                let name = start.name();
                let parent_matches = open
                    .last()
                    .is_some_and(|parent| return parent.as_slice() == path.parent.as_bytes());
                if name.as_ref() == path.field.as_bytes() && parent_matches {
                    armed = true;
                }
                open.push(name.as_ref().to_vec());
                continue;
            },
            Event::Text(content) if armed => content
                .unescape()
                .map_err(|e| {
                    return Error::ParseFailed {
                        file: std::path::PathBuf::from("<xml>"),
                        reason: e.to_string(),
                    };
                })?
                .into_owned(),
            _ => continue,
        };

        armed = false;
        if !visitor(LocatedValue { line: line_of(text, event_start), value }) {
            return Ok(());
        }
    }
}

/// One-based line number of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    let newlines = text
        .as_bytes()
        .get(..end)
        .map_or(0, |prefix| return prefix.iter().filter(|&&b| return b == b'\n').count());
    return newlines.saturating_add(1);
}

/// Character span of the first occurrence of `value` on the one-based
/// `line` of `text`, with document-relative offsets.
///
/// Returns `None` when the line does not exist or does not contain the
/// value verbatim (for example when the tokenizer expanded an entity).
pub fn locate_span(text: &str, line: usize, value: &str) -> Option<Location> {
    let mut line_start = 0_usize;
    for (index, line_text) in text.split_inclusive('\n').enumerate() {
        if index.saturating_add(1) == line {
            let byte_index = line_text.find(value)?;
            let before = line_text.get(..byte_index)?;
            let char_start = line_start.saturating_add(before.chars().count());
            let char_end = char_start.saturating_add(value.chars().count());
            return Some(Location { char_end, char_start, line });
        }
        line_start = line_start.saturating_add(line_text.chars().count());
    }
    return None;
}
