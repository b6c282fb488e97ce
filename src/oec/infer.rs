//! Section breakdown recovered from a composite course name.

use std::sync::LazyLock;

use regex::Regex;

use crate::worksheet::oec::SisImportColumn;
use crate::worksheet::Row;

static COURSE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?) ([A-Z]*\d+[A-Z]*) ([A-Z]{3}) (\d{3})\b").expect("valid regex")
});

/// Fields parsed from a name such as `GWS 165 LEC 001 MEIOSIS AND MITOSIS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredFields {
    /// Department abbreviation, e.g. `ENV DES`.
    pub dept_name: String,
    /// Catalog number, e.g. `C169B`.
    pub catalog_id: String,
    /// Three-letter format, e.g. `LEC`.
    pub instruction_format: String,
    /// Three-digit section, e.g. `001`.
    pub section_num: String,
}

impl InferredFields {
    /// Parses a course name; `None` when it has no section breakdown.
    #[must_use]
    pub fn from_course_name(course_name: &str) -> Option<Self> {
        let captures = COURSE_NAME.captures(course_name.trim())?;
        Some(Self {
            dept_name: captures[1].to_string(),
            catalog_id: captures[2].to_string(),
            instruction_format: captures[3].to_string(),
            section_num: captures[4].to_string(),
        })
    }

    /// Writes the fields into a merged row. Unmatched rows are assumed to
    /// be primary sections.
    pub fn apply(&self, row: &mut Row<SisImportColumn>) {
        row.set(SisImportColumn::DeptName, self.dept_name.as_str());
        row.set(SisImportColumn::CatalogId, self.catalog_id.as_str());
        row.set(SisImportColumn::InstructionFormat, self.instruction_format.as_str());
        row.set(SisImportColumn::SectionNum, self.section_num.as_str());
        row.set(SisImportColumn::PrimarySecondaryCd, "P");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_course_names() {
        let fields = InferredFields::from_course_name("GWS 165 LEC 001 MEIOSIS AND MITOSIS").unwrap();
        assert_eq!(fields.dept_name, "GWS");
        assert_eq!(fields.catalog_id, "165");
        assert_eq!(fields.instruction_format, "LEC");
        assert_eq!(fields.section_num, "001");
    }

    #[test]
    fn handles_multiword_departments_and_lettered_catalogs() {
        let fields = InferredFields::from_course_name("ENV DES C169B LEC 002").unwrap();
        assert_eq!(fields.dept_name, "ENV DES");
        assert_eq!(fields.catalog_id, "C169B");
        assert_eq!(fields.section_num, "002");
    }

    #[test]
    fn names_without_breakdown_are_not_inferred() {
        assert!(InferredFields::from_course_name("Special Topics in Gender").is_none());
        assert!(InferredFields::from_course_name("").is_none());
    }

    #[test]
    fn applied_rows_are_primary() {
        let mut row = Row::new();
        InferredFields::from_course_name("MCELLBI 32 LAB 101").unwrap().apply(&mut row);
        assert_eq!(&row[SisImportColumn::DeptName], "MCELLBI");
        assert_eq!(&row[SisImportColumn::InstructionFormat], "LAB");
        assert_eq!(&row[SisImportColumn::PrimarySecondaryCd], "P");
    }
}
