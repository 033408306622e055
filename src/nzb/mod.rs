//! NZB document building
//!
//! Serializes a [`ReleaseFragments`] tree into an NZB 1.1 document:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <!DOCTYPE nzb PUBLIC "-//newzBin//DTD NZB 1.1//EN" "http://www.newzbin.com/DTD/nzb/nzb-1.1.dtd">
//! <!--NZB Generated by: nzb-writer v0.1.0 October 18, 2026, 9:05 am +0000-->
//! <nzb xmlns="http://www.newzbin.com/DTD/2003/nzb">
//!   <head>
//!     <meta type="category">TV &gt; HD</meta>
//!     <meta type="name">Some.Show.S01E01</meta>
//!   </head>
//!   <file poster="poster1" date="1700000000" subject="Video(1/5)">
//!     <groups>
//!       <group>alt.binaries.test</group>
//!     </groups>
//!     <segments>
//!       <segment bytes="100" number="1">a@x</segment>
//!     </segments>
//!   </file>
//! </nzb>
//! ```
//!
//! Every binary becomes its own `<file>`; its `<groups>` come from the owning
//! collection's Xref header.

mod groups;

pub use groups::extract_groups;

use chrono::{DateTime, TimeZone};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use std::io;

use crate::db::{CollectionRow, PartRow};
use crate::error::{Error, PipelineError, Result};
use crate::fragments::{BinaryFragment, ReleaseFragments};

/// DOCTYPE root element name
pub const NZB_DTD_NAME: &str = "nzb";
/// DOCTYPE public identifier
pub const NZB_DTD_PUBLIC: &str = "-//newzBin//DTD NZB 1.1//EN";
/// DOCTYPE system identifier
pub const NZB_DTD_EXTERNAL: &str = "http://www.newzbin.com/DTD/nzb/nzb-1.1.dtd";
/// Namespace of the `<nzb>` root element
pub const NZB_XML_NS: &str = "http://www.newzbin.com/DTD/2003/nzb";

/// Name written into the generator comment
pub const GENERATOR_NAME: &str = "nzb-writer";

const INDENT_WIDTH: usize = 2;

/// Values written into the document `<head>` and leading comment
#[derive(Debug, Clone, Copy)]
pub struct NzbHead<'a> {
    /// Category title, `<meta type="category">`
    pub category: &'a str,
    /// Release name, `<meta type="name">`
    pub name: &'a str,
    /// Text of the generator comment
    pub comment: &'a str,
}

/// A serialized NZB document
#[must_use]
#[derive(Debug, Clone)]
pub struct BuiltNzb {
    /// Uncompressed XML bytes
    pub xml: Vec<u8>,
    /// First non-empty message-id in the document
    pub nzb_guid: Option<String>,
    /// Number of `<file>` elements
    pub file_count: usize,
    /// Number of `<segment>` elements
    pub segment_count: usize,
}

/// Text of the generator comment
///
/// `NZB Generated by: nzb-writer v0.1.0 October 18, 2026, 9:05 am +0000`; an
/// empty `tag` is left out.
pub fn generator_comment<Tz>(tag: &str, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let stamp = generated_at.format("%B %-d, %Y, %-I:%M %P %z");
    let text = if tag.is_empty() {
        format!("NZB Generated by: {} {}", GENERATOR_NAME, stamp)
    } else {
        format!("NZB Generated by: {} {} {}", GENERATOR_NAME, tag, stamp)
    };
    comment_safe(&text)
}

/// `--` may not appear inside an XML comment, nor may it end with `-`
fn comment_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

/// Subject line of a `<file>`: the binary name and its declared part count
///
/// Always `1/<total>`, whatever the number of segments actually present.
pub fn file_subject(binary_name: &str, total_parts: i64) -> String {
    format!("{}(1/{})", binary_name, total_parts)
}

/// Serialize `fragments` into an NZB document
///
/// Writer failures abort with [`PipelineError::BuildFailure`]; nothing is
/// returned for a partially written document.
pub fn build_nzb(head: &NzbHead<'_>, fragments: &ReleaseFragments) -> Result<BuiltNzb> {
    let xml = write_document(head, fragments).map_err(|e| {
        Error::Pipeline(PipelineError::BuildFailure {
            release_id: fragments.release_id,
            reason: e.to_string(),
        })
    })?;

    Ok(BuiltNzb {
        xml,
        nzb_guid: fragments.first_message_id().map(str::to_string),
        file_count: fragments.file_count(),
        segment_count: fragments.segment_count(),
    })
}

fn write_document(head: &NzbHead<'_>, fragments: &ReleaseFragments) -> io::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(format!(
        r#"{} PUBLIC "{}" "{}""#,
        NZB_DTD_NAME, NZB_DTD_PUBLIC, NZB_DTD_EXTERNAL
    ))))?;
    writer.write_event(Event::Comment(BytesText::new(head.comment)))?;

    writer
        .create_element("nzb")
        .with_attribute(("xmlns", NZB_XML_NS))
        .write_inner_content(|w| {
            write_head(w, head)?;
            for (collection, binary) in fragments.binaries() {
                write_file(w, collection, binary)?;
            }
            Ok::<(), io::Error>(())
        })?;

    let mut xml = writer.into_inner();
    xml.push(b'\n');
    Ok(xml)
}

fn write_head(w: &mut Writer<Vec<u8>>, head: &NzbHead<'_>) -> io::Result<()> {
    w.create_element("head").write_inner_content(|w| {
        w.create_element("meta")
            .with_attribute(("type", "category"))
            .write_text_content(BytesText::new(head.category))?;
        w.create_element("meta")
            .with_attribute(("type", "name"))
            .write_text_content(BytesText::new(head.name))?;
        Ok::<(), io::Error>(())
    })?;
    Ok(())
}

fn write_file(
    w: &mut Writer<Vec<u8>>,
    collection: &CollectionRow,
    binary: &BinaryFragment,
) -> io::Result<()> {
    let date = collection.date.to_string();
    let subject = file_subject(&binary.binary.name, binary.binary.total_parts);

    w.create_element("file")
        .with_attribute(("poster", collection.from_name.as_str()))
        .with_attribute(("date", date.as_str()))
        .with_attribute(("subject", subject.as_str()))
        .write_inner_content(|w| {
            w.create_element("groups").write_inner_content(|w| {
                for group in extract_groups(&collection.xref) {
                    w.create_element("group")
                        .write_text_content(BytesText::new(group))?;
                }
                Ok::<(), io::Error>(())
            })?;
            w.create_element("segments").write_inner_content(|w| {
                for part in &binary.parts {
                    write_segment(w, part)?;
                }
                Ok::<(), io::Error>(())
            })?;
            Ok::<(), io::Error>(())
        })?;
    Ok(())
}

fn write_segment(w: &mut Writer<Vec<u8>>, part: &PartRow) -> io::Result<()> {
    let bytes = part.size.to_string();
    let number = part.part_number.to_string();

    w.create_element("segment")
        .with_attribute(("bytes", bytes.as_str()))
        .with_attribute(("number", number.as_str()))
        .write_text_content(BytesText::new(&part.message_id))?;
    Ok(())
}
