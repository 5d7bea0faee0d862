//! Reading and writing element streams.
//!
//! Two encodings are understood: one JSON record per line (what indexers
//! emit) and a single JSON array. Loading goes through the [`Builder`], so a
//! loaded store obeys the same invariants as one built in memory.

use crate::builder::Builder;
use crate::config::Config;
use crate::error::GraphError;
use crate::model::{Element, Id};
use crate::store::{Snapshot, Store};
use crate::util;
use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info, warn};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// One JSON record per line
    #[default]
    Line,
    /// A single JSON array of records
    Json,
}

impl Format {
    /// Peeks past leading whitespace; `[` means a JSON array. The whitespace
    /// is consumed, nothing else is.
    pub fn detect<R: BufRead>(reader: &mut R) -> io::Result<Format> {
        sniff(reader).map(|(format, _)| format)
    }
}

/// Returns the format and the number of newlines skipped on the way.
fn sniff<R: BufRead>(reader: &mut R) -> io::Result<(Format, usize)> {
    let mut newlines = 0;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok((Format::Line, newlines));
        }
        let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        newlines += buf[..skip].iter().filter(|&&b| b == b'\n').count();
        if skip < buf.len() {
            let format = if buf[skip] == b'[' {
                Format::Json
            } else {
                Format::Line
            };
            reader.consume(skip);
            return Ok((format, newlines));
        }
        reader.consume(skip);
    }
}

/// Policy for records the builder rejects while loading.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    /// Stop at the first rejected record
    #[default]
    Abort,
    /// Log the rejected record and keep loading
    Skip,
}

impl OnError {
    pub fn as_str(self) -> &'static str {
        match self {
            OnError::Abort => "abort",
            OnError::Skip => "skip",
        }
    }
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub on_error: OnError,
}

impl LoadOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            on_error: config.on_error,
        }
    }

    pub fn on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub id: Id,
    pub error: GraphError,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub snapshot: Snapshot,
    pub rejected: Vec<Rejected>,
}

/// Streaming iterator over a line-delimited dump. Blank lines are skipped;
/// a malformed line yields an error naming its 1-based line number.
pub struct ElementReader<R> {
    reader: R,
    line: usize,
    buf: String,
    done: bool,
}

impl<R: BufRead> ElementReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
            done: false,
        }
    }

    fn starting_after(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Number of the last line read.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for ElementReader<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line += 1;
                    let record = self.buf.trim();
                    if record.is_empty() {
                        continue;
                    }
                    let line = self.line;
                    return Some(
                        serde_json::from_str(record).with_context(|| format!("line {line}")),
                    );
                }
                Err(err) => {
                    self.done = true;
                    let line = self.line + 1;
                    return Some(Err(err).with_context(|| format!("read line {line}")));
                }
            }
        }
        None
    }
}

/// Records of either encoding.
pub enum Records<R> {
    Lines(ElementReader<R>),
    Array(std::vec::IntoIter<Element>),
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Records::Lines(lines) => lines.next(),
            Records::Array(items) => items.next().map(Ok),
        }
    }
}

pub fn records<R: BufRead>(mut reader: R) -> Result<Records<R>> {
    let (format, skipped) = sniff(&mut reader).context("detect dump format")?;
    debug!("reading dump as {format:?}");
    match format {
        Format::Line => Ok(Records::Lines(
            ElementReader::new(reader).starting_after(skipped),
        )),
        Format::Json => {
            let items: Vec<Element> =
                serde_json::from_reader(reader).context("decode JSON array dump")?;
            Ok(Records::Array(items.into_iter()))
        }
    }
}

/// Raw records, unchecked. Feed them to the validator.
pub fn read_elements<R: BufRead>(reader: R) -> Result<Vec<Element>> {
    records(reader)?.collect()
}

/// Streams records into a fresh builder. Decoding errors always abort; the
/// `on_error` policy applies to records the builder rejects.
pub fn load<R: BufRead>(reader: R, options: LoadOptions) -> Result<LoadOutcome> {
    let mut builder = Builder::new();
    let mut rejected = Vec::new();
    for (index, record) in records(reader)?.enumerate() {
        let element = record?;
        let id = element.id().clone();
        if let Err(error) = builder.insert(element) {
            match options.on_error {
                OnError::Abort => {
                    return Err(error).with_context(|| format!("record {} (id {id})", index + 1));
                }
                OnError::Skip => {
                    warn!("lsifg: skipping record {} (id {id}): {error}", index + 1);
                    rejected.push(Rejected { id, error });
                }
            }
        }
    }
    info!(
        "loaded {} elements, rejected {}",
        builder.len(),
        rejected.len()
    );
    Ok(LoadOutcome {
        snapshot: builder.finish(),
        rejected,
    })
}

pub fn load_path(path: &Path, options: LoadOptions) -> Result<LoadOutcome> {
    let reader = util::open_reader(path)?;
    load(reader, options).with_context(|| format!("load {}", path.display()))
}

/// Writes every element in insertion order.
pub fn write<W: Write>(store: &Store, mut writer: W, format: Format) -> Result<()> {
    match format {
        Format::Line => {
            for element in store.elements() {
                serde_json::to_writer(&mut writer, element)
                    .with_context(|| format!("encode element {}", element.id()))?;
                writer.write_all(b"\n")?;
            }
        }
        Format::Json => {
            serde_json::to_writer(&mut writer, store.elements()).context("encode dump")?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush().context("flush dump")?;
    Ok(())
}

pub fn write_path(store: &Store, path: &Path, format: Format) -> Result<()> {
    let writer = util::create_writer(path)?;
    write(store, writer, format).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const META: &str = r#"{"id":1,"type":"vertex","label":"metaData","version":"0.4.0"}"#;
    const DOC: &str =
        r#"{"id":2,"type":"vertex","label":"document","uri":"file:///a.ts","languageId":"typescript"}"#;
    const RANGE: &str = r#"{"id":3,"type":"vertex","label":"range","start":{"line":0,"character":0},"end":{"line":0,"character":5}}"#;
    const CONTAINS: &str = r#"{"id":4,"type":"edge","label":"contains","outV":2,"inV":3}"#;

    fn dump(lines: &[&str]) -> Cursor<String> {
        Cursor::new(lines.join("\n"))
    }

    #[test]
    fn detect_sees_arrays_past_whitespace() {
        let mut reader = Cursor::new("  \n [ ]");
        assert_eq!(Format::detect(&mut reader).unwrap(), Format::Json);
        let mut reader = Cursor::new(META);
        assert_eq!(Format::detect(&mut reader).unwrap(), Format::Line);
        let mut reader = Cursor::new("");
        assert_eq!(Format::detect(&mut reader).unwrap(), Format::Line);
    }

    #[test]
    fn reader_skips_blank_lines() {
        let elements = read_elements(dump(&[META, "", "   ", DOC])).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].label(), "document");
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = read_elements(dump(&["", META, "{\"id\":"])).unwrap_err();
        assert!(format!("{err}").contains("line 3"), "{err}");
    }

    #[test]
    fn truncated_implementation_label_is_rejected() {
        let edge = r#"{"id":9,"type":"edge","label":"textDocument/implemen","outV":3,"inV":5}"#;
        assert!(read_elements(dump(&[META, edge])).is_err());
    }

    #[test]
    fn json_array_dumps_are_read() {
        let array = format!("[{META},{DOC}]");
        let elements = read_elements(Cursor::new(array)).unwrap();
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn abort_stops_at_first_rejection() {
        let dangling = r#"{"id":5,"type":"edge","label":"contains","outV":2,"inV":77}"#;
        let err = load(dump(&[META, DOC, dangling]), LoadOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("record 3"), "{err:#}");
    }

    #[test]
    fn skip_records_rejections_and_continues() {
        let dangling = r#"{"id":5,"type":"edge","label":"contains","outV":2,"inV":77}"#;
        let outcome = load(
            dump(&[META, DOC, dangling, RANGE, CONTAINS]),
            LoadOptions::default().on_error(OnError::Skip),
        )
        .unwrap();
        assert_eq!(outcome.snapshot.len(), 4);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].id, Id::Int(5));
        assert!(matches!(
            outcome.rejected[0].error,
            GraphError::UnknownVertex { .. }
        ));
    }

    #[test]
    fn line_and_json_writes_load_back_equal() {
        let outcome = load(dump(&[META, DOC, RANGE, CONTAINS]), LoadOptions::default()).unwrap();
        for format in [Format::Line, Format::Json] {
            let mut out = Vec::new();
            write(&outcome.snapshot, &mut out, format).unwrap();
            let again = load(Cursor::new(out), LoadOptions::default()).unwrap();
            assert_eq!(again.snapshot.elements(), outcome.snapshot.elements());
            assert_eq!(
                again.snapshot.digest().unwrap(),
                outcome.snapshot.digest().unwrap()
            );
        }
    }
}
