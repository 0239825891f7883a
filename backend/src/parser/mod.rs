//! Raw source parsing with format, encoding and delimiter auto-detection.
//!
//! Spreadsheet workbooks (xlsx, xls, ods) are recognized by their magic bytes
//! and read with `calamine`; anything else is treated as delimited text.
//! No cleaning happens here beyond trimming cells: column names are kept as
//! the export wrote them.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::models::{Cell, Table};

/// Kind of raw source.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

/// What was detected while reading a source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub format: SourceFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// One loaded raw source.
#[derive(Debug, Clone)]
pub struct RawSource {
    pub info: SourceInfo,
    pub table: Table,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// True for xlsx/ods (zip) and legacy xls (OLE2) containers.
pub fn is_spreadsheet(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

/// Read a source file, detecting its format.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> SourceResult<RawSource> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("source")
        .to_string();
    parse_bytes_auto(&name, &bytes)
}

/// Parse raw bytes, detecting spreadsheet vs delimited text.
pub fn parse_bytes_auto(name: &str, bytes: &[u8]) -> SourceResult<RawSource> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(SourceError::EmptyFile);
    }

    let (table, info) = if is_spreadsheet(bytes) {
        let table = parse_spreadsheet(bytes)?;
        let info = SourceInfo {
            name: name.to_string(),
            format: SourceFormat::Spreadsheet,
            encoding: None,
            delimiter: None,
            headers: table.columns().to_vec(),
            row_count: table.len(),
        };
        (table, info)
    } else {
        let encoding = detect_encoding(bytes);
        let content = decode_content(bytes, &encoding);
        let delimiter = detect_delimiter(&content);
        let table = parse_delimited(&content, delimiter)?;
        let info = SourceInfo {
            name: name.to_string(),
            format: SourceFormat::Delimited,
            encoding: Some(encoding),
            delimiter: Some(delimiter),
            headers: table.columns().to_vec(),
            row_count: table.len(),
        };
        (table, info)
    };

    if table.is_empty() {
        return Err(SourceError::EmptyFile);
    }

    Ok(RawSource { info, table })
}

/// Parse delimited text with an explicit delimiter.
///
/// Rows may be ragged; short rows are padded with absent cells.
pub fn parse_delimited(content: &str, delimiter: char) -> SourceResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SourceError::NoHeaders);
    }

    let mut table = Table::new(disambiguate_headers(headers));
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(Cell::text).collect());
    }

    Ok(table)
}

/// Parse the first worksheet of a workbook. The first row holds the headers.
pub fn parse_spreadsheet(bytes: &[u8]) -> SourceResult<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SourceError::Spreadsheet(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SourceError::Spreadsheet("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SourceError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or(SourceError::NoHeaders)?
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.clone(),
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SourceError::NoHeaders);
    }

    let mut table = Table::new(disambiguate_headers(headers));
    for row in rows {
        table.push_row(row.iter().map(cell_from_data).collect());
    }

    Ok(table)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            // Time-of-day cells (e.g. start_time) carry no date part.
            Some(ndt) if dt.as_f64() < 1.0 => Cell::Text(ndt.time().format("%H:%M:%S").to_string()),
            Some(ndt) if ndt.time() == chrono::NaiveTime::MIN => Cell::Date(ndt.date()),
            Some(ndt) => Cell::DateTime(ndt),
            None => Cell::Empty,
        },
    }
}

/// Name blank headers `Unnamed: i` and suffix repeated ones with `.1`, `.2`, ...
fn disambiguate_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() { format!("Unnamed: {}", i) } else { h };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 { base } else { format!("{}.{}", base, count) };
            *count += 1;
            name
        })
        .collect()
}
