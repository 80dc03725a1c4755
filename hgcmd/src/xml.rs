//! Parser for `--style xml` changeset listings.
//!
//! Mercurial's xml style emits
//!
//! ```xml
//! <log>
//!   <logentry revision="0" node="...">
//!     <tag>tip</tag>
//!     <author email="bob@example.com">Bob</author>
//!     <date>2020-01-01T00:00:00+00:00</date>
//!     <msg xml:space="preserve">fix bug</msg>
//!   </logentry>
//! </log>
//! ```
//!
//! Children missing from an entry leave the field at its default.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;

use crate::{Error, Result};

/// Marker that opens the XML document in mixed command output.
const XML_MARKER: &str = "<?xml";

/// One changeset from a `log`-like listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Revision {
    /// Local revision number (`revision` attribute).
    pub id: String,
    /// Full changeset hash (`node` attribute).
    pub node: String,
    /// Commit date, unset if missing or unparseable.
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Author name.
    pub author: String,
    /// Author email address.
    pub email: String,
    /// Commit message.
    pub message: String,
    /// Named branch; empty means `default`.
    pub branch: String,
    /// Tags on this changeset.
    pub tags: Vec<String>,
}

/// Parses a complete xml-style document into revisions.
///
/// Only `logentry` elements directly under the root `log` element are
/// collected. Fails only if the text is not well-formed XML.
pub fn parse_revisions(xml: &str) -> Result<Vec<Revision>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut revisions = Vec::new();
    let mut current: Option<Revision> = None;
    let mut text = String::new();
    let mut seen_root = false;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                open_element(&e, &stack, &mut seen_root, &mut current)?;
                text.clear();
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = e.name().as_ref().to_vec();
                open_element(&e, &stack, &mut seen_root, &mut current)?;
                text.clear();
                close_element(&name, &stack, &text, &mut current, &mut revisions);
            }
            Event::Text(t) if stack.len() == 3 && current.is_some() => {
                text.push_str(&t.unescape().map_err(malformed)?);
            }
            Event::CData(c) if stack.len() == 3 && current.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                close_element(&name, &stack, &text, &mut current, &mut revisions);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(Error::MalformedOutput("no root element".into()));
    }
    if !stack.is_empty() {
        return Err(Error::MalformedOutput("unexpected end of document".into()));
    }
    Ok(revisions)
}

/// Parses revisions from output that may carry text before the XML.
///
/// `incoming`/`outgoing` print status lines ahead of the document; those
/// are dropped. No XML marker at all means no revisions.
pub fn parse_revisions_after_marker(output: &str) -> Result<Vec<Revision>> {
    match output.find(XML_MARKER) {
        Some(i) => parse_revisions(&output[i..]),
        None => Ok(Vec::new()),
    }
}

/// Handles an opening tag given the stack of its ancestors.
fn open_element(
    e: &BytesStart<'_>,
    stack: &[Vec<u8>],
    seen_root: &mut bool,
    current: &mut Option<Revision>,
) -> Result<()> {
    if stack.is_empty() {
        if *seen_root {
            return Err(Error::MalformedOutput("multiple root elements".into()));
        }
        *seen_root = true;
        return Ok(());
    }
    let name = e.name();
    if stack.len() == 1 && stack[0] == b"log" && name.as_ref() == b"logentry" {
        *current = Some(Revision {
            id: attribute(e, "revision")?.unwrap_or_default(),
            node: attribute(e, "node")?.unwrap_or_default(),
            ..Revision::default()
        });
    } else if stack.len() == 2 && name.as_ref() == b"author" {
        if let Some(rev) = current.as_mut() {
            rev.email = attribute(e, "email")?.unwrap_or_default();
        }
    }
    Ok(())
}

/// Handles a closing tag; `stack` no longer contains the element itself.
fn close_element(
    name: &[u8],
    stack: &[Vec<u8>],
    text: &str,
    current: &mut Option<Revision>,
    revisions: &mut Vec<Revision>,
) {
    match stack.len() {
        1 if name == b"logentry" => {
            if let Some(rev) = current.take() {
                revisions.push(rev);
            }
        }
        2 => {
            let Some(rev) = current.as_mut() else {
                return;
            };
            match name {
                b"author" => rev.author = text.trim().to_owned(),
                b"date" => rev.timestamp = parse_date(text),
                b"msg" => rev.message = text.to_owned(),
                b"branch" => rev.branch = text.trim().to_owned(),
                b"tag" => rev.tags.push(text.trim().to_owned()),
                _ => {}
            }
        }
        _ => {}
    }
}

/// Reads and unescapes an attribute value.
fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    match e.try_get_attribute(key).map_err(malformed)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(malformed)?.into_owned())),
        None => Ok(None),
    }
}

/// Parses an RFC 3339 date, or an offset-less one taken as UTC.
fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    let parsed = DateTime::parse_from_rfc3339(text).ok().or_else(|| {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|n| n.and_utc().fixed_offset())
    });
    if parsed.is_none() {
        tracing::warn!(date = text, "unparseable changeset date");
    }
    parsed
}

/// Maps any XML-layer error to [`Error::MalformedOutput`].
#[allow(clippy::needless_pass_by_value)]
fn malformed(e: impl std::fmt::Display) -> Error {
    Error::MalformedOutput(e.to_string())
}
