//! Streaming XML access for the OOXML parts of a workbook.
//! Wraps quick-xml with the reader settings the workbook parts need and adds
//! small helpers for attributes and character references.

use crate::error::IngestError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

/// Errors raised while decoding XML text content
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    UnknownEntity(String),
}

/// Event reader holding its own scratch buffer
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` must produce both a start and an end event
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Returns the next event, or `None` at end of document.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, IngestError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Attribute lookup on start tags
pub(crate) trait XmlNodeHelper<'a> {
    /// Unescaped value of the attribute `name`, if present.
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, IngestError>;

    /// Value of the attribute whose local name (namespace prefix ignored) is `name`.
    fn local_attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, IngestError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, IngestError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }

    fn local_attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, IngestError> {
        for result in self.attributes() {
            let attribute = result?;
            if attribute.key.local_name().as_ref() == name.as_bytes() {
                return Ok(Some(attribute.unescape_value()?));
            }
        }
        Ok(None)
    }
}

/// Appends entity and character references (`&amp;`, `&#233;`, `&#xE9;`) to a string.
pub(crate) trait XmlTextHelper {
    fn push_reference(&mut self, reference: &BytesRef) -> Result<(), IngestError>;
}

impl XmlTextHelper for String {
    fn push_reference(&mut self, reference: &BytesRef) -> Result<(), IngestError> {
        let raw = reference.xml_content()?;
        match raw.strip_prefix('#') {
            Some(number) => {
                let code = match number.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16)?,
                    None => number.parse::<u32>()?,
                };
                if let Some(character) = char::from_u32(code) {
                    self.push(character);
                }
            }
            None => match resolve_xml_entity(&raw) {
                Some(entity) => self.push_str(entity),
                None => Err(XmlError::UnknownEntity(raw.to_string()))?,
            },
        }
        Ok(())
    }
}

/// Drives an [`XmlReader`] to the end of the document, dispatching each event
/// to the given match arms; unmatched events are ignored.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}
