//! Tabular export of a [`FetchOutcome`].
//!
//! The user columns are fixed; an `Error` column is appended only when the
//! outcome contains failed identifiers. Error rows leave every user column
//! except `User ID` empty.

use std::io::{self, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::fetch::{ErrorRecord, FetchOutcome, Row};
use crate::normalize::UserRecord;

/// Column order of a user row.
pub const USER_COLUMNS: [&str; 23] = [
    "User ID",
    "First Name",
    "Last Name",
    "Username",
    "Alternate Usernames",
    "Phone",
    "Is Bot",
    "Verified",
    "Premium",
    "Scam",
    "Fake",
    "Restricted",
    "Deleted",
    "Status",
    "Access Hash",
    "Photo ID",
    "Photo DC ID",
    "Support",
    "Contact",
    "Mutual Contact",
    "Close Friend",
    "Stories Hidden",
    "Language Code",
];

pub const ERROR_COLUMN: &str = "Error";

/// Marker after which a pasted public link names the peer.
const LINK_MARKER: &str = "t.me/";

// ─── Format ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick a format from a file extension; anything unknown is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self { Self::Csv => "csv", Self::Json => "json" }
    }
}

// ─── Naming ───────────────────────────────────────────────────────────────────

/// Turn free-form input (often a `t.me` link) into a safe column / file stem.
///
/// Everything up to and including the last `t.me/` is dropped, then each
/// character outside `[A-Za-z0-9_-]` becomes `_`.
pub fn clean_column_name(name: &str) -> String {
    let tail = match name.rfind(LINK_MARKER) {
        Some(idx) => &name[idx + LINK_MARKER.len()..],
        None      => name,
    };
    tail.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// `"https://t.me/example"` → `"example_users.csv"`.
pub fn export_file_name(label: &str, format: ExportFormat) -> String {
    let stem = clean_column_name(label);
    let stem = if stem.is_empty() { "tgforge".to_string() } else { stem };
    format!("{stem}_users.{}", format.extension())
}

// ─── Cells ────────────────────────────────────────────────────────────────────

impl UserRecord {
    /// Values in [`USER_COLUMNS`] order.
    pub fn cells(&self) -> Vec<Value> {
        let text = |s: &str| Value::String(s.to_string());
        let flag = |f: crate::normalize::Flag| Value::String(f.to_string());
        vec![
            Value::from(self.user_id),
            self.first_name.as_deref().map_or(Value::Null, text),
            self.last_name.as_deref().map_or(Value::Null, text),
            text(&self.username),
            text(&self.alternate_usernames),
            text(&self.phone),
            flag(self.is_bot),
            flag(self.verified),
            flag(self.premium),
            flag(self.scam),
            flag(self.fake),
            flag(self.restricted),
            flag(self.deleted),
            text(self.status.as_str()),
            self.access_hash.map_or(Value::Null, Value::from),
            self.photo.map_or(Value::Null, |p| Value::from(p.id)),
            self.photo.map_or(Value::Null, |p| Value::from(p.dc_id)),
            flag(self.support),
            flag(self.is_contact),
            flag(self.mutual_contact),
            flag(self.close_friend),
            flag(self.stories_hidden),
            text(&self.lang_code),
        ]
    }
}

fn raw_id_value(rec: &ErrorRecord) -> Value {
    serde_json::to_value(&rec.user_id).unwrap_or_else(|_| Value::String(rec.user_id.to_string()))
}

/// Column headers for `outcome`.
pub fn columns(outcome: &FetchOutcome) -> Vec<&'static str> {
    let mut cols = USER_COLUMNS.to_vec();
    if outcome.has_errors() {
        cols.push(ERROR_COLUMN);
    }
    cols
}

/// Cells of one row, padded to `width` columns.
fn row_cells(row: &Row, width: usize) -> Vec<Value> {
    let mut cells = match row {
        Row::User(u) => u.cells(),
        Row::Error(e) => {
            let mut cells = vec![Value::Null; USER_COLUMNS.len()];
            cells[0] = raw_id_value(e);
            cells.push(Value::String(e.error.clone()));
            cells
        }
    };
    cells.resize(width, Value::Null);
    cells
}

// ─── CSV ──────────────────────────────────────────────────────────────────────

fn csv_field(value: &Value) -> String {
    let s = match value {
        Value::Null      => return String::new(),
        Value::String(s) => s.clone(),
        other            => other.to_string(),
    };
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s
    }
}

fn write_csv_line<W: Write>(out: &mut W, fields: impl Iterator<Item = String>) -> io::Result<()> {
    let line: Vec<String> = fields.collect();
    out.write_all(line.join(",").as_bytes())?;
    out.write_all(b"\r\n")
}

/// Write `outcome` as RFC 4180 CSV with a header row.
pub fn write_csv<W: Write>(outcome: &FetchOutcome, mut out: W) -> io::Result<()> {
    let cols = columns(outcome);
    write_csv_line(&mut out, cols.iter().map(|c| csv_field(&Value::String((*c).to_string()))))?;
    for row in &outcome.rows {
        let cells = row_cells(row, cols.len());
        write_csv_line(&mut out, cells.iter().map(csv_field))?;
    }
    out.flush()
}

// ─── JSON ─────────────────────────────────────────────────────────────────────

/// One object per row, keyed by column name in column order.
pub fn to_json(outcome: &FetchOutcome) -> Value {
    let cols = columns(outcome);
    let rows = outcome.rows.iter().map(|row| {
        let cells = row_cells(row, cols.len());
        let obj: Map<String, Value> = cols.iter()
            .map(|c| (*c).to_string())
            .zip(cells)
            .collect();
        Value::Object(obj)
    });
    Value::Array(rows.collect())
}

pub fn write_json<W: Write>(outcome: &FetchOutcome, mut out: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, &to_json(outcome))?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Write `outcome` to `path`, choosing the format from its extension.
pub fn export_to_path(outcome: &FetchOutcome, path: &Path) -> io::Result<ExportFormat> {
    let format = ExportFormat::from_path(path);
    let file = io::BufWriter::new(std::fs::File::create(path)?);
    match format {
        ExportFormat::Csv  => write_csv(outcome, file)?,
        ExportFormat::Json => write_json(outcome, file)?,
    }
    tracing::info!("[tgforge] Exported {} rows to {}", outcome.len(), path.display());
    Ok(format)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
