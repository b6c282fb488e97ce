//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI parser for `campus-sync`.
#[derive(Debug, Parser)]
#[command(name = "campus-sync", version, about = "Reconcile campus accounts and publish course evaluation sheets")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Sheet kinds accepted by `validate-sheet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SheetKind {
    /// SIS import or merged confirmation sheet.
    SisImport,
    /// A department's confirmations.
    CourseConfirmations,
    /// Published courses.
    Courses,
    /// Published instructors.
    Instructors,
    /// Published students.
    Students,
    /// Course-instructor pairings.
    CourseInstructors,
    /// Course-student pairings.
    CourseStudents,
    /// Department supervisors.
    Supervisors,
    /// Course-supervisor pairings.
    CourseSupervisors,
    /// Directory account import.
    UserImport,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile directory accounts with the campus feed.
    SyncUsers {
        /// Only accounts of this campus ID (repeatable).
        #[arg(long = "uid", value_name = "UID")]
        uids: Vec<String>,
        /// Reuse the newest stashed users report.
        #[arg(long)]
        cached: bool,
        /// Compute changes without applying them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Merge department confirmations onto the SIS import.
    MergeConfirmations {
        /// Term code, e.g. `2015-B`.
        #[arg(long)]
        term: String,
        /// Folder of `<DEPT>.csv` confirmation sheets.
        #[arg(long, value_name = "DIR")]
        confirmations: PathBuf,
        /// Folder of `<DEPT>.csv` SIS import sheets.
        #[arg(long, value_name = "DIR")]
        imports: PathBuf,
        /// Only this department (repeatable).
        #[arg(long = "dept", value_name = "DEPT")]
        depts: Vec<String>,
        /// Output file.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Build, validate and write the evaluation upload sheets.
    Publish {
        /// Term code, e.g. `2015-B`.
        #[arg(long)]
        term: String,
        /// Merged confirmation sheet.
        #[arg(long, value_name = "FILE")]
        merged: PathBuf,
        /// Supervisors sheet.
        #[arg(long, value_name = "FILE")]
        supervisors: PathBuf,
        /// Previous term's publish folder.
        #[arg(long, value_name = "DIR")]
        previous: Option<PathBuf>,
    },
    /// Print the row validation errors of one sheet.
    ValidateSheet {
        /// Kind of sheet.
        #[arg(value_enum)]
        kind: SheetKind,
        /// Sheet file.
        path: PathBuf,
    },
}
