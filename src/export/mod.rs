//! History export to CSV, XLSX and JSON, plus the matching readers.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::info;

use crate::domain::{DeliveryStatus, HistoryRecord, MessageId};
use crate::sheet::read_first_sheet;

/// Column order shared by the CSV and XLSX layouts.
pub const COLUMNS: [&str; 9] = [
    "id",
    "recipient",
    "message",
    "sender_id",
    "status",
    "created_at",
    "scheduled_at",
    "delivered_at",
    "credits",
];

const SHEET_NAME: &str = "History";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("cannot read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("unsupported export format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("exported sheet has no {column:?} column")]
    MissingColumn { column: &'static str },

    #[error("row {row}, column {column}: {reason}")]
    InvalidCell {
        row: usize,
        column: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    /// Pick the format from a file extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|it| it.to_str())
            .unwrap_or_default();
        extension.parse()
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "json" => Ok(Self::Json),
            other => Err(ExportError::UnsupportedFormat {
                extension: other.to_owned(),
            }),
        }
    }
}

/// Write `records` to `path`, replacing any existing file.
pub fn export_records(
    records: &[HistoryRecord],
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    match format {
        ExportFormat::Csv => {
            let mut file = BufWriter::new(File::create(path)?);
            write_csv(records, &mut file)?;
            file.flush()?;
        }
        ExportFormat::Json => {
            let mut file = BufWriter::new(File::create(path)?);
            write_json(records, &mut file)?;
            file.flush()?;
        }
        ExportFormat::Xlsx => write_xlsx(records, path)?,
    }

    info!(
        path = %path.display(),
        format = format.extension(),
        records = records.len(),
        "exported history"
    );
    Ok(())
}

pub fn write_csv<W: Write>(records: &[HistoryRecord], writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        writer.write_record(COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(records: &[HistoryRecord], writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

pub fn write_xlsx(records: &[HistoryRecord], path: impl AsRef<Path>) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, name) in (0u16..).zip(COLUMNS) {
        sheet.write_string_with_format(0, col, name, &bold)?;
    }

    for (row, record) in (1u32..).zip(records) {
        sheet.write_string(row, 0, record.id.as_str())?;
        sheet.write_string(row, 1, &record.recipient)?;
        sheet.write_string(row, 2, &record.message)?;
        if let Some(sender_id) = &record.sender_id {
            sheet.write_string(row, 3, sender_id)?;
        }
        sheet.write_string(row, 4, record.status.as_str())?;
        sheet.write_string(row, 5, timestamp(&record.created_at))?;
        if let Some(at) = &record.scheduled_at {
            sheet.write_string(row, 6, timestamp(at))?;
        }
        if let Some(at) = &record.delivered_at {
            sheet.write_string(row, 7, timestamp(at))?;
        }
        if let Some(credits) = record.credits {
            sheet.write_number(row, 8, credits as f64)?;
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}

/// Read records back from a file produced by [`export_records`].
pub fn read_records(
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<Vec<HistoryRecord>, ExportError> {
    let path = path.as_ref();
    match format {
        ExportFormat::Csv => read_csv(BufReader::new(File::open(path)?)),
        ExportFormat::Json => read_json(BufReader::new(File::open(path)?)),
        ExportFormat::Xlsx => read_xlsx(path),
    }
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<HistoryRecord>, ExportError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

pub fn read_json<R: Read>(reader: R) -> Result<Vec<HistoryRecord>, ExportError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_xlsx(path: impl AsRef<Path>) -> Result<Vec<HistoryRecord>, ExportError> {
    let sheet = read_first_sheet(path.as_ref())?;
    let mut rows = sheet.rows.into_iter().enumerate();

    let Some((_, header)) = rows.next() else {
        return Ok(Vec::new());
    };
    let positions = header
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_ascii_lowercase(), idx))
        .collect::<HashMap<_, _>>();
    let mut index = HashMap::new();
    for column in COLUMNS {
        let idx = positions
            .get(column)
            .copied()
            .ok_or(ExportError::MissingColumn { column })?;
        index.insert(column, idx);
    }

    let mut records = Vec::new();
    for (offset, cells) in rows {
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row = XlsxRow {
            number: sheet.first_row + offset + 1,
            cells: &cells,
            index: &index,
        };

        records.push(HistoryRecord {
            id: MessageId::new(row.text("id")).map_err(|err| row.invalid("id", err))?,
            recipient: row.text("recipient").to_owned(),
            message: row.text("message").to_owned(),
            sender_id: row.optional_text("sender_id"),
            status: DeliveryStatus::from_provider(row.text("status")),
            created_at: row
                .timestamp("created_at")?
                .ok_or_else(|| row.invalid("created_at", "missing value"))?,
            scheduled_at: row.timestamp("scheduled_at")?,
            delivered_at: row.timestamp("delivered_at")?,
            credits: row
                .optional_text("credits")
                .map(|value| value.parse::<u64>().map_err(|err| row.invalid("credits", err)))
                .transpose()?,
        });
    }
    Ok(records)
}

struct XlsxRow<'a> {
    number: usize,
    cells: &'a [String],
    index: &'a HashMap<&'static str, usize>,
}

impl XlsxRow<'_> {
    fn text(&self, column: &'static str) -> &str {
        self.index
            .get(column)
            .and_then(|idx| self.cells.get(*idx))
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn optional_text(&self, column: &'static str) -> Option<String> {
        Some(self.text(column))
            .filter(|it| !it.is_empty())
            .map(str::to_owned)
    }

    fn timestamp(&self, column: &'static str) -> Result<Option<DateTime<Utc>>, ExportError> {
        self.optional_text(column)
            .map(|value| {
                DateTime::parse_from_rfc3339(&value)
                    .map(|it| it.with_timezone(&Utc))
                    .map_err(|err| self.invalid(column, err))
            })
            .transpose()
    }

    fn invalid(&self, column: &'static str, reason: impl ToString) -> ExportError {
        ExportError::InvalidCell {
            row: self.number,
            column,
            reason: reason.to_string(),
        }
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
