//! Keyed, schema-checked tabular datasets.
//!
//! A [`Worksheet`] holds rows of one sheet kind. Each kind declares its
//! ordered columns as an enum through [`columns!`], so every column access
//! is checked at compile time instead of going through string lookups.
//! Columns declared in the `transient` block may be assigned but are never
//! exported.

pub mod date;
pub mod directory;
pub mod oec;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::Index;

use crate::error::{Error, Result};

/// Longest header snippet quoted in a schema mismatch error.
const SNIPPET_LEN: usize = 500;

/// A typed column of one sheet kind.
pub trait Column: Copy + Eq + Hash + Debug + 'static {
    /// Every column in declaration order, exported columns first.
    const ALL: &'static [Self];
    /// Number of leading columns included in exports.
    const EXPORTED: usize;

    /// Header text of this column.
    fn header(self) -> &'static str;

    /// Position of this column within [`Column::ALL`].
    fn index(self) -> usize;

    /// Whether the column is excluded from exports.
    fn is_transient(self) -> bool {
        self.index() >= Self::EXPORTED
    }

    /// Looks up a column by its header text.
    #[must_use]
    fn from_header(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.header() == name)
    }

    /// Header texts of the exported columns.
    #[must_use]
    fn exported_headers() -> Vec<&'static str> {
        Self::ALL[..Self::EXPORTED].iter().map(|c| c.header()).collect()
    }
}

/// Declares a column enum for a sheet kind.
///
/// ```ignore
/// columns! {
///     pub enum PairColumn {
///         CourseId => "COURSE_ID",
///         LdapUid => "LDAP_UID",
///     }
///     transient { SectionId => "SECTION_ID" }
/// }
/// ```
#[macro_export]
macro_rules! columns {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident => $header:literal ),+ $(,)?
        }
        $( transient { $( $tvariant:ident => $theader:literal ),+ $(,)? } )?
    ) => {
        $(#[$meta])*
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant, )+
            $( $( $tvariant, )+ )?
        }

        impl $crate::worksheet::Column for $name {
            const ALL: &'static [Self] = &[
                $( Self::$variant, )+
                $( $( Self::$tvariant, )+ )?
            ];
            const EXPORTED: usize = <[&str]>::len(&[ $( $header ),+ ]);

            fn header(self) -> &'static str {
                match self {
                    $( Self::$variant => $header, )+
                    $( $( Self::$tvariant => $theader, )+ )?
                }
            }

            fn index(self) -> usize {
                self as usize
            }
        }
    };
}

/// A row-level check: returns a message prefix when the value is unacceptable.
pub type RowCheck<C> = fn(&Row<C>) -> Option<&'static str>;

/// A validation attached to one column of a sheet kind.
#[derive(Debug, Clone, Copy)]
pub struct Validation<C: Column> {
    /// The column being checked.
    pub column: C,
    /// Second-order check run after the blank check.
    pub check: Option<RowCheck<C>>,
}

impl<C: Column> Validation<C> {
    /// A column that must merely be non-blank.
    #[must_use]
    pub const fn present(column: C) -> Self {
        Self { column, check: None }
    }

    /// A column that must be non-blank and pass `check`.
    #[must_use]
    pub const fn with(column: C, check: RowCheck<C>) -> Self {
        Self { column, check: Some(check) }
    }
}

/// Describes one sheet kind.
pub trait Schema: 'static {
    /// Typed columns of this sheet.
    type Column: Column;

    /// Default export (file) name.
    const EXPORT_NAME: &'static str;

    /// Whether pure-digit values are written with a leading `'` so that
    /// spreadsheet imports keep them as plain text.
    const SPREADSHEET_TEXT: bool = true;

    /// Row validations for this sheet kind.
    #[must_use]
    fn validations() -> &'static [Validation<Self::Column>] {
        &[]
    }

    /// Orders rows for export. Insertion order unless overridden.
    fn sort_rows(_rows: &mut [&Row<Self::Column>]) {}
}

/// One row of a sheet, holding a value for every declared column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row<C: Column> {
    values: Vec<String>,
    _columns: PhantomData<C>,
}

impl<C: Column> Default for Row<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Column> Row<C> {
    /// An empty row: every column blank.
    #[must_use]
    pub fn new() -> Self {
        Self { values: vec![String::new(); C::ALL.len()], _columns: PhantomData }
    }

    /// Builds a row from `(column, value)` pairs; unnamed columns stay blank.
    #[must_use]
    pub fn from_pairs<V: Into<String>>(pairs: impl IntoIterator<Item = (C, V)>) -> Self {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.set(column, value);
        }
        row
    }

    /// Value of `column`.
    #[must_use]
    pub fn get(&self, column: C) -> &str {
        &self.values[column.index()]
    }

    /// Assigns `column`.
    pub fn set(&mut self, column: C, value: impl Into<String>) {
        self.values[column.index()] = value.into();
    }

    /// Whether `column` is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self, column: C) -> bool {
        self.get(column).trim().is_empty()
    }

    /// Value of the column named `header`, if this sheet has it.
    #[must_use]
    pub fn get_by_header(&self, header: &str) -> Option<&str> {
        C::from_header(header).map(|c| self.get(c))
    }

    /// Iterates `(column, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (C, &str)> {
        C::ALL.iter().copied().map(move |c| (c, self.get(c)))
    }

    /// Copies every column this row shares (by header) with `source`.
    ///
    /// Values from `source` win, blank or not.
    pub fn overlay<D: Column>(&mut self, source: &Row<D>) {
        for (column, value) in source.iter() {
            if let Some(target) = C::from_header(column.header()) {
                self.set(target, value);
            }
        }
    }

    /// Builds a row of another sheet kind from the shared columns of this one.
    #[must_use]
    pub fn project<D: Column>(&self) -> Row<D> {
        let mut row = Row::<D>::new();
        row.overlay(self);
        row
    }
}

impl<C: Column> Index<C> for Row<C> {
    type Output = str;

    fn index(&self, column: C) -> &str {
        self.get(column)
    }
}

/// An ordered, keyed collection of rows of one sheet kind.
#[derive(Debug, Clone)]
pub struct Worksheet<S: Schema> {
    rows: Vec<(String, Row<S::Column>)>,
    positions: HashMap<String, usize>,
    export_name: Option<String>,
}

impl<S: Schema> Default for Worksheet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> Worksheet<S> {
    /// An empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self { rows: Vec::new(), positions: HashMap::new(), export_name: None }
    }

    /// An empty sheet exported under a custom name.
    #[must_use]
    pub fn with_export_name(name: impl Into<String>) -> Self {
        Self { export_name: Some(name.into()), ..Self::new() }
    }

    /// Parses delimited text into a sheet.
    ///
    /// Leading rows are skipped until one equals the exported header list.
    /// Data rows are keyed by their zero-based position after the header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] when no row matches the headers,
    /// [`Error::DateFormat`] when a date column cannot be parsed, and
    /// [`Error::Csv`] on malformed delimited text.
    pub fn from_csv(text: &str) -> Result<Self> {
        let (sheet, date_errors) = Self::from_csv_lenient(text)?;
        match date_errors.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(sheet),
        }
    }

    /// Like [`Worksheet::from_csv`], but a row whose date cannot be parsed
    /// is kept with the raw value and its error returned beside the sheet,
    /// paired with the row key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] when no row matches the headers and
    /// [`Error::Csv`] on malformed delimited text.
    pub fn from_csv_lenient(text: &str) -> Result<(Self, Vec<(String, Error)>)> {
        let headers = S::Column::exported_headers();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let mut found = false;
        for record in records.by_ref() {
            let record = record?;
            if record.iter().eq(headers.iter().copied()) {
                found = true;
                break;
            }
        }
        if !found {
            return Err(Error::SchemaMismatch {
                sheet: S::EXPORT_NAME.to_string(),
                snippet: snippet(text),
            });
        }

        let mut sheet = Self::new();
        let mut date_errors = Vec::new();
        for (index, record) in records.enumerate() {
            let record = record?;
            let key = index.to_string();
            let (row, errors) = parse_row::<S::Column>(record.iter());
            date_errors.extend(errors.into_iter().map(|e| (key.clone(), e)));
            sheet.insert(key, row);
        }
        Ok((sheet, date_errors))
    }

    /// Export name of this sheet.
    #[must_use]
    pub fn export_name(&self) -> &str {
        self.export_name.as_deref().unwrap_or(S::EXPORT_NAME)
    }

    /// Row stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Row<S::Column>> {
        self.positions.get(key).map(|&i| &self.rows[i].1)
    }

    /// Mutable row stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Row<S::Column>> {
        self.positions.get(key).map(|&i| &mut self.rows[i].1)
    }

    /// Stores `row` under `key`, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, row: Row<S::Column>) {
        let key = key.into();
        if let Some(&i) = self.positions.get(&key) {
            self.rows[i].1 = row;
        } else {
            self.positions.insert(key.clone(), self.rows.len());
            self.rows.push((key, row));
        }
    }

    /// Whether a row is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the sheet has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Row<S::Column>> {
        self.rows.iter().map(|(_, row)| row)
    }

    /// `(key, row)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Row<S::Column>)> {
        self.rows.iter().map(|(key, row)| (key.as_str(), row))
    }

    /// Rows in export order.
    #[must_use]
    pub fn sorted_rows(&self) -> Vec<&Row<S::Column>> {
        let mut rows: Vec<_> = self.iter().collect();
        S::sort_rows(&mut rows);
        rows
    }

    /// Rows whose `column` equals `value`.
    pub fn matching<'a>(
        &'a self,
        column: S::Column,
        value: &'a str,
    ) -> impl Iterator<Item = &'a Row<S::Column>> + 'a {
        self.iter().filter(move |row| row.get(column) == value)
    }

    /// Validation errors for `row`.
    ///
    /// The blank check runs first for every validated column; a failing
    /// second-order check is appended after it. Errors accumulate.
    #[must_use]
    pub fn errors_for_row(row: &Row<S::Column>) -> Vec<String> {
        Self::validation_failures(row).into_iter().map(|(_, message)| message).collect()
    }

    /// Validation errors for `row`, each paired with the offending column.
    #[must_use]
    pub fn validation_failures(row: &Row<S::Column>) -> Vec<(S::Column, String)> {
        let mut errors = Vec::new();
        for validation in S::validations() {
            let column = validation.column;
            let header = column.header();
            if row.is_blank(column) {
                errors.push((column, format!("Blank {header}")));
            }
            if let Some(message) = validation.check.and_then(|check| check(row)) {
                errors.push((column, format!("{message} {header} {}", row.get(column))));
            }
        }
        errors
    }

    /// Serializes the sheet for spreadsheet upload: header line, then rows
    /// in export order. Digit-only values of text sheets get a leading `'`
    /// so the spreadsheet keeps them as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Csv`] if the writer fails.
    pub fn to_csv_string(&self) -> Result<String> {
        self.write_csv(S::SPREADSHEET_TEXT)
    }

    /// Serializes the sheet with values exactly as stored, for files handed
    /// to downstream systems rather than spreadsheets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Csv`] if the writer fails.
    pub fn to_export_csv(&self) -> Result<String> {
        self.write_csv(false)
    }

    fn write_csv(&self, quote_digits: bool) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(S::Column::exported_headers())?;
        for row in self.sorted_rows() {
            let record = S::Column::ALL[..S::Column::EXPORTED].iter().map(|&column| {
                let value = row.get(column);
                if quote_digits && is_digits(value) {
                    format!("'{value}")
                } else {
                    value.to_string()
                }
            });
            writer.write_record(record)?;
        }
        let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// File name used when writing this sheet to disk.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.export_name())
    }
}

/// Builds a row from raw fields, padding missing columns and normalizing
/// dates. Unparseable dates stay raw and are returned as errors.
fn parse_row<'a, C: Column>(fields: impl Iterator<Item = &'a str>) -> (Row<C>, Vec<Error>) {
    let mut row = Row::<C>::new();
    for (column, value) in C::ALL[..C::EXPORTED].iter().copied().zip(fields) {
        let value = match value.strip_prefix('\'') {
            Some(rest) if is_digits(rest) => rest,
            _ => value,
        };
        row.set(column, value);
    }
    let mut errors = Vec::new();
    for header in date::DATE_COLUMNS {
        let Some(column) = C::from_header(header) else { continue };
        if row.is_blank(column) {
            continue;
        }
        match date::normalize(row.get(column)) {
            Some(normalized) => row.set(column, normalized),
            None => errors.push(Error::DateFormat {
                column: header.to_string(),
                value: row.get(column).to_string(),
            }),
        }
    }
    (row, errors)
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_LEN {
        let mut s: String = text.chars().take(SNIPPET_LEN).collect();
        s.push_str("...");
        s
    } else {
        text.to_string()
    }
}

/// Converts a one-based row and column to spreadsheet notation (`[1, 4]` → `D1`).
#[must_use]
pub fn string_coords(row: usize, column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = u8::try_from((n - 1) % 26).unwrap_or(0);
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{row}", letters.into_iter().collect::<String>())
}
