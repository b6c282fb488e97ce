//! Course evaluation pipeline: merging department confirmations and
//! publishing the upload sheets.

pub mod backfill;
pub mod dates;
pub mod errors;
pub mod infer;
pub mod integrity;
pub mod merge;
pub mod publish;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, info};

pub use errors::ValidationLog;
pub use merge::{ConfirmationMergeEngine, MergeOptions, MergeOutcome, MergeRow};
pub use publish::{PreviousTerm, PublishOptions, PublishSheets};

use crate::config::OecSettings;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::ports::FileSystem;
use crate::worksheet::oec::{CourseConfirmation, CourseInstructors, Instructors, SisImport, Supervisors};
use crate::worksheet::{Schema, Worksheet};

/// Inputs of a merge run.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    /// Term code, e.g. `2015-B`.
    pub term: String,
    /// One `<DEPT>.csv` confirmation sheet per department.
    pub confirmations_dir: PathBuf,
    /// One `<DEPT>.csv` SIS import sheet per department.
    pub imports_dir: PathBuf,
    /// Only these departments, when set.
    pub depts: Option<HashSet<String>>,
    /// Output file; defaults under the term's export folder.
    pub out: Option<PathBuf>,
}

/// What a merge run produced.
#[derive(Debug)]
pub struct MergeSummary {
    /// Where the merged sheet was written.
    pub path: PathBuf,
    /// Rows in the merged sheet.
    pub rows: usize,
    /// Everything found wrong.
    pub log: ValidationLog,
}

/// Inputs of a publish run.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    /// Term code, e.g. `2015-B`.
    pub term: String,
    /// Merged confirmation sheet.
    pub merged: PathBuf,
    /// Supervisors sheet.
    pub supervisors: PathBuf,
    /// Folder of the previous term's published sheets.
    pub previous: Option<PathBuf>,
}

/// What a publish run produced.
#[derive(Debug)]
pub struct PublishSummary {
    /// Folder holding the written sheets.
    pub dir: PathBuf,
    /// Written sheet files.
    pub files: Vec<PathBuf>,
    /// Row validation errors.
    pub log: ValidationLog,
    /// Cross-sheet mismatches.
    pub integrity: Vec<String>,
}

/// Reads every `<DEPT>.csv` sheet in `dir`, sorted by department.
///
/// Date parse failures keep the row and are recorded under the file name.
///
/// # Errors
///
/// Returns [`Error::FatalSetup`] if the folder cannot be listed or a file
/// read, and [`Error::SchemaMismatch`] if a sheet has the wrong columns.
pub fn load_department_sheets<S: Schema>(
    fs: &dyn FileSystem,
    dir: &Path,
    depts: Option<&HashSet<String>>,
    log: &mut ValidationLog,
) -> Result<Vec<(String, Worksheet<S>)>> {
    let mut names = fs.list_dir(dir).map_err(|e| Error::fatal(format!("cannot list {}: {e}", dir.display())))?;
    names.sort();
    let mut sheets = Vec::new();
    for name in names {
        let Some(dept) = name.strip_suffix(".csv") else { continue };
        if depts.is_some_and(|wanted| !wanted.contains(dept)) {
            debug!("Skipping {name}: department not selected");
            continue;
        }
        let path = dir.join(&name);
        let text = fs.read_to_string(&path).map_err(|e| Error::fatal(format!("cannot read {}: {e}", path.display())))?;
        let (sheet, date_errors) = Worksheet::<S>::from_csv_lenient(&text)?;
        for (key, err) in date_errors {
            log.record(&name, &key, err.to_string());
        }
        sheets.push((dept.to_string(), sheet));
    }
    Ok(sheets)
}

fn read_sheet<S: Schema>(fs: &dyn FileSystem, path: &Path) -> Result<Worksheet<S>> {
    let text = fs.read_to_string(path).map_err(|e| Error::fatal(format!("cannot read {}: {e}", path.display())))?;
    Worksheet::from_csv(&text)
}

fn term_dir(settings: &OecSettings, term: &str) -> PathBuf {
    settings.export_dir.join(term)
}

/// Merges every department's confirmations and writes the merged sheet.
///
/// # Errors
///
/// Fails on unreadable or malformed inputs, bad term dates in the settings,
/// or when the merged sheet cannot be written. Row-level problems are
/// returned in the summary instead.
pub fn merge_confirmations(ctx: &ServiceContext, settings: &OecSettings, request: &MergeRequest) -> Result<MergeSummary> {
    let options = MergeOptions::from_settings(settings)?;
    let mut input_log = ValidationLog::default();

    let mut imports = Worksheet::<SisImport>::new();
    for (dept, sheet) in
        load_department_sheets::<SisImport>(ctx.fs.as_ref(), &request.imports_dir, request.depts.as_ref(), &mut input_log)?
    {
        for row in sheet.iter() {
            let key = Worksheet::<SisImport>::row_key(row);
            if imports.contains_key(&key) {
                debug!("{dept}: {key} already imported from another department");
                continue;
            }
            imports.insert(key, row.clone());
        }
    }
    info!("Loaded {} SIS import rows", imports.len());

    let confirmations = load_department_sheets::<CourseConfirmation>(
        ctx.fs.as_ref(),
        &request.confirmations_dir,
        request.depts.as_ref(),
        &mut input_log,
    )?;
    let mut engine = ConfirmationMergeEngine::new(&imports, options);
    for (dept, sheet) in &confirmations {
        engine.add_confirmations(dept, sheet);
    }
    let MergeOutcome { merged, mut log } = engine.finish(ctx.campus.as_ref());
    log.extend(&input_log);

    let path = request.out.clone().unwrap_or_else(|| term_dir(settings, &request.term).join(merged.file_name()));
    let csv = merged.to_csv_string()?;
    ctx.fs.write(&path, &csv).map_err(|e| Error::external(format!("write {}", path.display()), e))?;
    info!("Wrote {} merged rows to {}", merged.len(), path.display());
    log.log();
    Ok(MergeSummary { path, rows: merged.len(), log })
}

fn load_previous(fs: &dyn FileSystem, dir: &Path) -> Result<PreviousTerm> {
    let mut previous = PreviousTerm::default();
    let course_instructors = dir.join(format!("{}.csv", CourseInstructors::EXPORT_NAME));
    if fs.exists(&course_instructors) {
        previous.course_instructors = read_sheet(fs, &course_instructors)?;
    }
    let instructors = dir.join(format!("{}.csv", Instructors::EXPORT_NAME));
    if fs.exists(&instructors) {
        previous.instructors = read_sheet(fs, &instructors)?;
    }
    info!(
        "Loaded {} course instructors and {} instructors from {}",
        previous.course_instructors.len(),
        previous.instructors.len(),
        dir.display()
    );
    Ok(previous)
}

/// Builds, validates and writes the upload sheets for a term.
///
/// Validation failures are logged and returned; they never stop the
/// sheets from being written.
///
/// # Errors
///
/// Fails on unreadable or malformed inputs and on write failures.
pub fn publish(ctx: &ServiceContext, settings: &OecSettings, request: &PublishRequest) -> Result<PublishSummary> {
    let (merged, date_errors) = Worksheet::<SisImport>::from_csv_lenient(
        &ctx.fs
            .read_to_string(&request.merged)
            .map_err(|e| Error::fatal(format!("cannot read {}: {e}", request.merged.display())))?,
    )?;
    let supervisors = read_sheet::<Supervisors>(ctx.fs.as_ref(), &request.supervisors)?;
    let previous = request.previous.as_deref().map(|dir| load_previous(ctx.fs.as_ref(), dir)).transpose()?;

    let options = PublishOptions {
        term: request.term.clone(),
        hierarchy_root: settings.hierarchy_root.clone(),
        instructor_role: settings.instructor_role.clone(),
    };
    let sheets = PublishSheets::build(&merged, &supervisors, previous.as_ref(), ctx.campus.as_ref(), &options);

    let mut log = ValidationLog::default();
    for (key, err) in date_errors {
        log.record(merged.export_name(), &key, err.to_string());
    }
    sheets.validate(&mut log);
    log.log();
    let integrity = integrity::check(&sheets, &request.term);
    integrity::report(&integrity);

    let stamp = ctx.clock.now().format("%Y%m%d_%H%M%S");
    let dir = term_dir(settings, &request.term).join(format!("publish_{stamp}"));
    let files = sheets.write(ctx.fs.as_ref(), &dir)?;
    Ok(PublishSummary { dir, files, log, integrity })
}
