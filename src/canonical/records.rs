//! Flat record XML used to exchange rows with the XSLT transformer
//!
//! Rows travel as `<rec col="value" .../>` elements under a `<root>` element,
//! one attribute per column.

use std::borrow::Cow;
use std::path::Path;

use csv::{StringRecord, Writer};
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer as XmlWriter};

use crate::error::{Error, Result};

const ROOT: &str = "root";
const RECORD: &str = "rec";

/// Column/value pairs of one record, in attribute order
pub type Record = Vec<(String, String)>;

/// Render CSV rows as a record document
pub fn render_records(headers: &[String], rows: &[StringRecord]) -> Result<String> {
    let mut writer = XmlWriter::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;

    for row in rows {
        let mut rec = BytesStart::new(RECORD);
        for (name, value) in headers.iter().zip(row.iter()) {
            let escaped = escape_attribute(value);
            rec.push_attribute(Attribute {
                key: QName(name.as_bytes()),
                value: Cow::Borrowed(escaped.as_bytes()),
            });
        }
        writer.write_event(Event::Empty(rec))?;
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::MalformedRecords(format!("non UTF-8 document: {}", e)))
}

/// Markup escapes plus line breaks, which attribute normalization would flatten
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

/// Extract the attributes of every `<rec>` element of a document
///
/// Elements match on local name, so `<ns:rec>` counts; markup inside
/// comments, CDATA and processing instructions does not.
pub fn parse_records(xml: &str) -> Result<Vec<Record>> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == RECORD.as_bytes() => {
                records.push(read_attributes(&e)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

fn read_attributes(element: &BytesStart<'_>) -> Result<Record> {
    let mut record = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::MalformedRecords(format!("attribute name: {}", e)))?;
        record.push((name.to_string(), attr.unescape_value()?.into_owned()));
    }
    Ok(record)
}

/// Write records as CSV; columns in first-seen order, missing values left empty
pub fn write_records_csv(path: &Path, records: &[Record]) -> Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for (name, _) in record {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
    }

    let mut writer = Writer::from_path(path)?;
    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }
    for record in records {
        let row = columns.iter().map(|col| {
            record
                .iter()
                .find(|(name, _)| name == col)
                .map_or("", |(_, value)| value.as_str())
        });
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(())
}
