//! Merging department confirmations onto the SIS import.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use log::info;

use super::backfill::backfill_sis_ids;
use super::dates::{disambiguate, DateRange};
use super::errors::ValidationLog;
use super::infer::InferredFields;
use crate::config::OecSettings;
use crate::error::{Error, Result};
use crate::ports::CampusData;
use crate::worksheet::date;
use crate::worksheet::oec::{CourseConfirmation, CourseConfirmationColumn, SisImport, SisImportColumn};
use crate::worksheet::{Column, Row, Worksheet};

/// Sheet name under which merge errors are reported.
pub const MERGED_SHEET_NAME: &str = "Merged course confirmations";

/// Export name of the merged sheet.
pub const MERGED_EXPORT_NAME: &str = "merged_course_confirmations";

/// Error recorded for a confirmation with no import counterpart.
pub const NO_IMPORT_ROW: &str = "No SIS import row found matching confirmation row";

/// Merge settings derived from [`OecSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Default evaluation window start.
    pub term_start: Option<NaiveDate>,
    /// Default evaluation window end.
    pub term_end: Option<NaiveDate>,
    /// Largest gap between one instructor's ranges that is still one course.
    pub adjacency_days: i64,
    /// IDs per back-fill lookup.
    pub batch_size: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self { term_start: None, term_end: None, adjacency_days: 1, batch_size: 1000 }
    }
}

impl MergeOptions {
    /// Reads the merge knobs out of the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a term date is set but unparseable.
    pub fn from_settings(settings: &OecSettings) -> Result<Self> {
        let parse = |name: &str, value: &Option<String>| -> Result<Option<NaiveDate>> {
            value
                .as_deref()
                .map(|v| {
                    date::parse(v).ok_or_else(|| Error::Config { message: format!("oec.{name} is not a date: '{v}'") })
                })
                .transpose()
        };
        Ok(Self {
            term_start: parse("term_start", &settings.term_start)?,
            term_end: parse("term_end", &settings.term_end)?,
            adjacency_days: settings.adjacency_days,
            batch_size: settings.batch_size,
        })
    }
}

/// A confirmation row paired with whatever the import knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRow {
    /// The import has a row for the same course and instructor.
    Matched {
        /// Authoritative section data.
        import: Row<SisImportColumn>,
        /// The department's assertion.
        confirmation: Row<CourseConfirmationColumn>,
    },
    /// The department confirmed something the import does not know.
    Unmatched {
        /// The department's assertion.
        confirmation: Row<CourseConfirmationColumn>,
        /// Section breakdown recovered from the course name.
        inferred: Option<InferredFields>,
    },
}

impl MergeRow {
    /// Pairs a confirmation with its import row, if any.
    #[must_use]
    pub fn resolve(
        sections: &HashMap<String, &Row<SisImportColumn>>,
        confirmation: Row<CourseConfirmationColumn>,
    ) -> Self {
        let key = course_key(
            confirmation.get(CourseConfirmationColumn::CourseId),
            confirmation.get(CourseConfirmationColumn::LdapUid),
        );
        match sections.get(&key).copied() {
            Some(import) => Self::Matched { import: import.clone(), confirmation },
            None => {
                let inferred = InferredFields::from_course_name(confirmation.get(CourseConfirmationColumn::CourseName));
                Self::Unmatched { confirmation, inferred }
            }
        }
    }

    /// Merged row: the import row with every confirmation column laid over
    /// it, or the confirmation plus inferred columns.
    #[must_use]
    pub fn into_row(self) -> Row<SisImportColumn> {
        match self {
            Self::Matched { mut import, confirmation } => {
                import.overlay(&confirmation);
                import
            }
            Self::Unmatched { confirmation, inferred } => {
                let mut row: Row<SisImportColumn> = confirmation.project();
                let course_id = row.get(SisImportColumn::CourseId).to_string();
                row.set(SisImportColumn::CourseId2, course_id);
                if let Some(inferred) = inferred {
                    inferred.apply(&mut row);
                }
                row
            }
        }
    }
}

/// The merged sheet and everything found wrong along the way.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// One row per confirmed course and instructor, conflicting rows kept.
    pub merged: Worksheet<SisImport>,
    /// Errors under [`MERGED_SHEET_NAME`] and input sheet names.
    pub log: ValidationLog,
}

/// Collects confirmations from every department, then merges them.
pub struct ConfirmationMergeEngine<'a> {
    sections: HashMap<String, &'a Row<SisImportColumn>>,
    options: MergeOptions,
    rows: Vec<Row<SisImportColumn>>,
    log: ValidationLog,
}

impl<'a> ConfirmationMergeEngine<'a> {
    /// Starts a merge against the combined import sheet.
    #[must_use]
    pub fn new(imports: &'a Worksheet<SisImport>, options: MergeOptions) -> Self {
        Self { sections: imports.sections(), options, rows: Vec::new(), log: ValidationLog::default() }
    }

    /// Adds one department's confirmations, in submission order.
    pub fn add_confirmations(&mut self, dept: &str, sheet: &Worksheet<CourseConfirmation>) {
        let mut unmatched = 0;
        for confirmation in sheet.iter() {
            if confirmation.is_blank(CourseConfirmationColumn::CourseId)
                && confirmation.is_blank(CourseConfirmationColumn::LdapUid)
            {
                continue;
            }
            let merge_row = MergeRow::resolve(&self.sections, confirmation.clone());
            if matches!(merge_row, MergeRow::Unmatched { .. }) {
                let key = course_key(
                    confirmation.get(CourseConfirmationColumn::CourseId),
                    confirmation.get(CourseConfirmationColumn::LdapUid),
                );
                self.log.record(MERGED_SHEET_NAME, &key, NO_IMPORT_ROW);
                unmatched += 1;
            }
            self.rows.push(merge_row.into_row());
        }
        info!("Added {} confirmations from {dept} ({unmatched} without import rows)", sheet.len());
    }

    /// Records a problem found while reading an input sheet.
    pub fn record_input_error(&mut self, sheet: &str, key: &str, message: impl Into<String>) {
        self.log.record(sheet, key, message);
    }

    /// Runs the merge: collapse duplicates, split separate meeting periods,
    /// report conflicts, flag modular courses, back-fill SIS IDs, validate.
    pub fn finish(self, campus: &dyn CampusData) -> MergeOutcome {
        let Self { options, rows, mut log, .. } = self;

        let mut seen = HashSet::new();
        let mut rows: Vec<_> = rows.into_iter().filter(|row| seen.insert(row.clone())).collect();

        let renamed = disambiguate(&mut rows, options.adjacency_days);
        if renamed > 0 {
            info!("Suffixed {renamed} course IDs to separate meeting periods");
        }
        report_conflicts(&rows, &mut log);

        if let (Some(start), Some(end)) = (options.term_start, options.term_end) {
            for row in &mut rows {
                set_modular_flag(row, start, end);
            }
        }
        backfill_sis_ids(&mut rows, campus, options.batch_size);

        let mut merged = Worksheet::with_export_name(MERGED_EXPORT_NAME);
        for row in rows {
            let key = Worksheet::<SisImport>::row_key(&row);
            for message in Worksheet::<SisImport>::errors_for_row(&row) {
                log.record(MERGED_SHEET_NAME, &key, message);
            }
            let mut slot = key.clone();
            let mut n = 1;
            while merged.contains_key(&slot) {
                n += 1;
                slot = format!("{key} ({n})");
            }
            merged.insert(slot, row);
        }
        MergeOutcome { merged, log }
    }
}

/// Natural key of a confirmation: course ID and instructor ID.
#[must_use]
pub fn course_key(course_id: &str, ldap_uid: &str) -> String {
    format!("{course_id}-{ldap_uid}")
}

/// Records a conflict for every column whose non-blank values differ
/// between rows sharing a key. Rows are left as they are.
fn report_conflicts(rows: &[Row<SisImportColumn>], log: &mut ValidationLog) {
    let mut groups: Vec<(String, Vec<&Row<SisImportColumn>>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let key = Worksheet::<SisImport>::row_key(row);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }

    for (key, group) in groups.iter().filter(|(_, group)| group.len() > 1) {
        for &column in &SisImportColumn::ALL[..SisImportColumn::EXPORTED] {
            let mut values: Vec<&str> = Vec::new();
            for row in group {
                let value = row.get(column).trim();
                if !value.is_empty() && !values.contains(&value) {
                    values.push(value);
                }
            }
            if values.len() > 1 {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
                log.record(
                    MERGED_SHEET_NAME,
                    key,
                    format!("Conflicting values found under {}: {}", column.header(), quoted.join(", ")),
                );
            }
        }
    }
}

/// `Y` when the row's window differs from the term default, blank when it
/// matches. Rows with unparseable dates are left as they are.
fn set_modular_flag(row: &mut Row<SisImportColumn>, term_start: NaiveDate, term_end: NaiveDate) {
    if let Some(range) = DateRange::of(row) {
        let modular = range.start != term_start || range.end != term_end;
        row.set(SisImportColumn::ModularCourse, if modular { "Y" } else { "" });
    }
}
