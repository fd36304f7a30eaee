pub mod clover;

use quick_xml::events::BytesStart;
use quick_xml::reader::Reader;

use crate::error::{CloverError, Result};
use crate::model::CoverageReport;

/// Every report parser implements this trait.
pub trait Parser {
    /// Parse the input bytes into the nested report model.
    fn parse(&self, input: &[u8]) -> Result<CoverageReport>;
}

/// Look up a single attribute by name, unescaped.
pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

pub(crate) fn xml_err(source: quick_xml::Error, reader: &Reader<&[u8]>) -> CloverError {
    CloverError::Xml {
        source,
        position: reader.buffer_position(),
    }
}
