//! Bulk contact import from spreadsheets and CSV files.
//!
//! The first non-blank row is the header. One column holds phone numbers;
//! an optional column holds the contact name and every other column is kept
//! as per-contact metadata for [`MessageTemplate`] placeholders.

mod template;

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::domain::{CountryCode, PhoneNumber};
use crate::sheet::read_first_sheet;

pub use template::MessageTemplate;

const PHONE_HEADERS: &[&str] = &[
    "phone",
    "phone_number",
    "phone number",
    "phonenumber",
    "number",
    "msisdn",
    "mobile",
];
const NAME_HEADERS: &[&str] = &["name", "names", "full_name", "full name", "fullname"];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read contact file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("cannot read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported contact file extension: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("contact file has no header row")]
    EmptySheet,

    #[error("contact file has no {column:?} column")]
    MissingColumn { column: String },

    #[error("row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// One imported recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// 1-based row number in the source file.
    pub row: usize,
    pub phone: PhoneNumber,
    pub name: Option<String>,
    /// Remaining columns keyed by lowercased header.
    pub metadata: BTreeMap<String, String>,
}

/// A row skipped in lenient mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactList {
    contacts: Vec<Contact>,
    rejected: Vec<RejectedRow>,
    duplicates: usize,
}

impl ContactList {
    /// Build a list from already-validated contacts, dropping repeated phones.
    pub fn from_contacts(contacts: Vec<Contact>) -> Self {
        let mut seen = HashSet::new();
        let mut list = Self::default();
        for contact in contacts {
            if seen.insert(contact.phone.clone()) {
                list.contacts.push(contact);
            } else {
                list.duplicates += 1;
            }
        }
        list
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    /// Rows dropped because their phone number already appeared earlier.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn phones(&self) -> Vec<PhoneNumber> {
        self.contacts.iter().map(|it| it.phone.clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contact> {
        self.contacts.iter()
    }
}

impl<'a> IntoIterator for &'a ContactList {
    type Item = &'a Contact;
    type IntoIter = std::slice::Iter<'a, Contact>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.iter()
    }
}

/// Reads contact files into a [`ContactList`].
///
/// By default the phone column is detected from common header names
/// (`phone`, `phone_number`, `number`, `msisdn`, `mobile`) and the first
/// malformed row aborts the import.
#[derive(Debug, Clone, Default)]
pub struct ContactImporter {
    phone_column: Option<String>,
    name_column: Option<String>,
    country: CountryCode,
    skip_invalid: bool,
}

impl ContactImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use exactly this header for phone numbers (case-insensitive).
    pub fn phone_column(mut self, column: impl Into<String>) -> Self {
        self.phone_column = Some(column.into());
        self
    }

    /// Use exactly this header for contact names (case-insensitive).
    pub fn name_column(mut self, column: impl Into<String>) -> Self {
        self.name_column = Some(column.into());
        self
    }

    /// Country code applied to numbers written in national format.
    pub fn country_code(mut self, country: CountryCode) -> Self {
        self.country = country;
        self
    }

    /// Collect malformed rows in [`ContactList::rejected`] instead of failing.
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    /// Import by file extension: `csv`, or `xlsx`/`xlsm`/`xlsb`/`xls`/`ods` (first sheet).
    pub fn import_path(&self, path: impl AsRef<Path>) -> Result<ContactList, ImportError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|it| it.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let list = match extension.as_str() {
            "csv" => self.import_csv(File::open(path)?)?,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
                let sheet = read_first_sheet(path)?;
                let first_row = sheet.first_row;
                let rows = sheet
                    .rows
                    .into_iter()
                    .enumerate()
                    .map(|(idx, cells)| (first_row + idx + 1, cells))
                    .collect();
                self.import_rows(rows)?
            }
            _ => return Err(ImportError::UnsupportedFormat { extension }),
        };

        info!(
            path = %path.display(),
            contacts = list.len(),
            rejected = list.rejected.len(),
            duplicates = list.duplicates,
            "imported contacts"
        );
        Ok(list)
    }

    pub fn import_csv<R: Read>(&self, reader: R) -> Result<ContactList, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        // The reader skips blank lines, so rows are numbered by source line.
        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .and_then(|it| usize::try_from(it.line()).ok())
                .unwrap_or(idx + 1);
            rows.push((line, record.iter().map(str::to_owned).collect()));
        }
        self.import_rows(rows)
    }

    /// `rows` pairs each row's cells with its 1-based row number in the source file.
    fn import_rows(&self, rows: Vec<(usize, Vec<String>)>) -> Result<ContactList, ImportError> {
        let mut rows = rows
            .into_iter()
            .filter(|(_, cells)| cells.iter().any(|cell| !cell.trim().is_empty()));

        let Some((_, header)) = rows.next() else {
            return Err(ImportError::EmptySheet);
        };
        let headers = header
            .iter()
            .map(|it| it.trim().to_lowercase())
            .collect::<Vec<_>>();

        let phone_idx = find_column(&headers, self.phone_column.as_deref(), PHONE_HEADERS)
            .ok_or_else(|| ImportError::MissingColumn {
                column: self
                    .phone_column
                    .clone()
                    .unwrap_or_else(|| PHONE_HEADERS[0].to_owned()),
            })?;
        let name_idx = find_column(&headers, self.name_column.as_deref(), NAME_HEADERS);
        if let (Some(column), None) = (&self.name_column, name_idx) {
            return Err(ImportError::MissingColumn {
                column: column.clone(),
            });
        }
        debug!(phone_idx, ?name_idx, columns = headers.len(), "contact columns resolved");

        let mut list = ContactList::default();
        let mut seen = HashSet::new();

        for (row, cells) in rows {
            let cell = |idx: usize| cells.get(idx).map(|it| it.trim()).unwrap_or_default();

            let phone = match PhoneNumber::parse(self.country, cell(phone_idx)) {
                Ok(phone) => phone,
                Err(err) if self.skip_invalid => {
                    list.rejected.push(RejectedRow {
                        row,
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => {
                    return Err(ImportError::MalformedRow {
                        row,
                        reason: err.to_string(),
                    });
                }
            };
            if !seen.insert(phone.clone()) {
                list.duplicates += 1;
                continue;
            }

            let name = name_idx
                .map(cell)
                .filter(|it| !it.is_empty())
                .map(str::to_owned);
            let metadata = headers
                .iter()
                .enumerate()
                .filter(|(idx, header)| {
                    *idx != phone_idx && Some(*idx) != name_idx && !header.is_empty()
                })
                .map(|(idx, header)| (header.clone(), cell(idx).to_owned()))
                .collect();

            list.contacts.push(Contact {
                row,
                phone,
                name,
                metadata,
            });
        }

        Ok(list)
    }
}

fn find_column(headers: &[String], explicit: Option<&str>, candidates: &[&str]) -> Option<usize> {
    match explicit {
        Some(column) => {
            let column = column.trim().to_lowercase();
            headers.iter().position(|it| *it == column)
        }
        None => candidates
            .iter()
            .find_map(|candidate| headers.iter().position(|it| it == candidate)),
    }
}
