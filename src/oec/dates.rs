//! Splitting one course ID into separate meeting periods.
//!
//! When rows sharing a course ID carry different date ranges, each range
//! is a separate course unless the same instructor's ranges touch or
//! overlap. Separate courses get an `_YYYYMMDD` suffix from their end
//! date. Touching ranges of one instructor are left alone and surface as
//! a date conflict.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use log::debug;

use crate::worksheet::date;
use crate::worksheet::oec::SisImportColumn;
use crate::worksheet::Row;

/// A row's evaluation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl DateRange {
    /// Window of a merged row; `None` when either date is unparseable.
    #[must_use]
    pub fn of(row: &Row<SisImportColumn>) -> Option<Self> {
        Some(Self {
            start: date::parse(row.get(SisImportColumn::StartDate))?,
            end: date::parse(row.get(SisImportColumn::EndDate))?,
        })
    }

    /// Whether a gap of more than `adjacency_days` separates the ranges.
    #[must_use]
    pub fn is_separate_from(&self, other: &Self, adjacency_days: i64) -> bool {
        let after = |end: NaiveDate| -> Option<NaiveDate> {
            match u64::try_from(adjacency_days) {
                Ok(days) => end.checked_add_days(Days::new(days)),
                Err(_) => end.checked_sub_days(Days::new(adjacency_days.unsigned_abs())),
            }
        };
        let before = |a: &Self, b: &Self| after(a.end).is_some_and(|limit| limit < b.start);
        before(self, other) || before(other, self)
    }
}

/// How a group of rows sharing a course ID is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDecision {
    /// All rows share one window.
    Uniform,
    /// Windows differ and every pair is a genuinely separate course.
    Disambiguate,
    /// One instructor's windows touch or overlap.
    Conflict,
    /// Some window could not be parsed.
    Unparseable,
}

/// Decides how a group of rows sharing a course ID is treated.
#[must_use]
pub fn decide(rows: &[&Row<SisImportColumn>], adjacency_days: i64) -> GroupDecision {
    let Some(ranges) = rows.iter().map(|row| DateRange::of(row)).collect::<Option<Vec<_>>>() else {
        return GroupDecision::Unparseable;
    };
    if ranges.windows(2).all(|pair| pair[0] == pair[1]) {
        return GroupDecision::Uniform;
    }
    for (i, (row_a, range_a)) in rows.iter().zip(&ranges).enumerate() {
        for (row_b, range_b) in rows.iter().zip(&ranges).skip(i + 1) {
            let same_instructor = row_a.get(SisImportColumn::LdapUid) == row_b.get(SisImportColumn::LdapUid);
            if range_a != range_b && same_instructor && !range_a.is_separate_from(range_b, adjacency_days) {
                return GroupDecision::Conflict;
            }
        }
    }
    GroupDecision::Disambiguate
}

/// Suffixes course IDs of groups that turn out to be separate courses.
///
/// Returns the number of rows renamed.
pub fn disambiguate(rows: &mut [Row<SisImportColumn>], adjacency_days: i64) -> usize {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        let course_id = row.get(SisImportColumn::CourseId).to_string();
        let group = *index.entry(course_id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(i);
    }

    let mut renamed = 0;
    for members in groups.iter().filter(|m| m.len() > 1) {
        let course_id = rows[members[0]].get(SisImportColumn::CourseId).to_string();
        let group: Vec<&Row<SisImportColumn>> = members.iter().map(|&i| &rows[i]).collect();
        match decide(&group, adjacency_days) {
            GroupDecision::Disambiguate if course_id.contains('_') => {
                debug!("{course_id} already carries a suffix; leaving its date ranges as they are");
            }
            GroupDecision::Disambiguate => {
                for &i in members {
                    let Some(range) = DateRange::of(&rows[i]) else { continue };
                    let suffixed = format!("{course_id}_{}", date::stamp(range.end));
                    let row = &mut rows[i];
                    if row.get(SisImportColumn::CourseId2) == course_id {
                        row.set(SisImportColumn::CourseId2, suffixed.as_str());
                    }
                    row.set(SisImportColumn::CourseId, suffixed);
                    renamed += 1;
                }
            }
            GroupDecision::Conflict => {
                debug!("{course_id} has touching date ranges for one instructor; not splitting");
            }
            GroupDecision::Unparseable => {
                debug!("{course_id} has unparseable dates; not splitting");
            }
            GroupDecision::Uniform => {}
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(course_id: &str, uid: &str, start: &str, end: &str) -> Row<SisImportColumn> {
        Row::from_pairs([
            (SisImportColumn::CourseId, course_id),
            (SisImportColumn::CourseId2, course_id),
            (SisImportColumn::LdapUid, uid),
            (SisImportColumn::StartDate, start),
            (SisImportColumn::EndDate, end),
        ])
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange { start: date::parse(start).unwrap(), end: date::parse(end).unwrap() }
    }

    #[test]
    fn adjacency_threshold_separates_ranges() {
        let first = range("01-20-2015", "03-08-2015");
        assert!(first.is_separate_from(&range("03-20-2015", "05-08-2015"), 1));
        assert!(!first.is_separate_from(&range("03-09-2015", "05-08-2015"), 1));
        assert!(first.is_separate_from(&range("03-10-2015", "05-08-2015"), 1));
        assert!(!first.is_separate_from(&range("03-20-2015", "05-08-2015"), 14));
        assert!(!first.is_separate_from(&range("02-01-2015", "05-08-2015"), 0));
    }

    #[test]
    fn same_instructor_disjoint_ranges_get_suffixes() {
        let mut rows = vec![
            row("2015-B-91111", "100", "01-20-2015", "03-08-2015"),
            row("2015-B-91111", "100", "03-20-2015", "05-08-2015"),
            row("2015-B-92222", "100", "01-20-2015", "05-08-2015"),
        ];
        assert_eq!(disambiguate(&mut rows, 1), 2);
        assert_eq!(&rows[0][SisImportColumn::CourseId], "2015-B-91111_20150308");
        assert_eq!(&rows[0][SisImportColumn::CourseId2], "2015-B-91111_20150308");
        assert_eq!(&rows[1][SisImportColumn::CourseId], "2015-B-91111_20150508");
        assert_eq!(&rows[2][SisImportColumn::CourseId], "2015-B-92222");
    }

    #[test]
    fn different_instructors_split_even_when_overlapping() {
        let rows = [
            row("2015-B-91111", "100", "01-20-2015", "03-08-2015"),
            row("2015-B-91111", "200", "02-20-2015", "05-08-2015"),
        ];
        let group: Vec<_> = rows.iter().collect();
        assert_eq!(decide(&group, 1), GroupDecision::Disambiguate);
    }

    #[test]
    fn touching_ranges_of_one_instructor_conflict() {
        let mut rows = vec![
            row("2015-B-91111", "100", "01-20-2015", "03-08-2015"),
            row("2015-B-91111", "100", "03-09-2015", "05-08-2015"),
        ];
        assert_eq!(disambiguate(&mut rows, 1), 0);
        assert_eq!(&rows[1][SisImportColumn::CourseId], "2015-B-91111");
    }

    #[test]
    fn unparseable_or_uniform_groups_are_untouched() {
        let bad = [row("2015-B-1", "100", "spring", "03-08-2015"), row("2015-B-1", "100", "03-20-2015", "05-08-2015")];
        assert_eq!(decide(&bad.iter().collect::<Vec<_>>(), 1), GroupDecision::Unparseable);
        let same = [row("2015-B-1", "100", "01-20-2015", "05-08-2015"), row("2015-B-1", "200", "01-20-2015", "05-08-2015")];
        assert_eq!(decide(&same.iter().collect::<Vec<_>>(), 1), GroupDecision::Uniform);
    }

    #[test]
    fn suffixed_course_ids_are_not_suffixed_again() {
        let mut rows = vec![
            row("2015-B-1_GSI", "100", "01-20-2015", "03-08-2015"),
            row("2015-B-1_GSI", "100", "03-20-2015", "05-08-2015"),
        ];
        assert_eq!(disambiguate(&mut rows, 1), 0);
    }
}
