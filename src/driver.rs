//! Batch driver: enumerate target files, apply rules, aggregate results.

use std::path::Path;
use walkdir::WalkDir;

use crate::apply::{check_file, patch_file, ApplyResult, PatchError};
use crate::catalog::PatchCatalog;
use crate::rule::PatchRule;

/// Options shared by both enumeration modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Compute and report outcomes without writing any file.
    pub dry_run: bool,
}

/// Outcome record for one file in the batch.
#[derive(Debug)]
pub struct FileReport {
    /// Filename relative to the base directory.
    pub name: String,
    /// The applier outcome, or the I/O error that isolated this file.
    pub result: Result<ApplyResult, PatchError>,
}

/// Aggregate report for one driver invocation.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn updated(&self) -> usize {
        self.count(|r| matches!(r, Ok(ApplyResult::Updated { .. })))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, Ok(ApplyResult::Skipped)))
    }

    pub fn missing(&self) -> usize {
        self.count(|r| matches!(r, Ok(ApplyResult::Missing)))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| r.is_err())
    }

    /// Names of the files the batch actually rewrote, in batch order.
    pub fn updated_names(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| matches!(f.result, Ok(ApplyResult::Updated { .. })))
            .map(|f| f.name.as_str())
            .collect()
    }

    fn count(&self, pred: impl Fn(&Result<ApplyResult, PatchError>) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.result)).count()
    }
}

/// Explicit-list mode: process every catalog target under `base`, in
/// declared order.
///
/// A missing file is recorded and the batch continues; so is a per-file
/// I/O error (read or write failures never abort the remaining files).
pub fn run_explicit(base: &Path, catalog: &PatchCatalog, opts: BatchOptions) -> BatchReport {
    let mut report = BatchReport::default();

    for target in &catalog.targets {
        let path = base.join(&target.file);
        let result = if opts.dry_run {
            check_file(&path, &target.rules)
        } else {
            patch_file(&path, &target.rules)
        };
        report.files.push(FileReport {
            name: target.file.clone(),
            result,
        });
    }

    report
}

/// Glob mode: apply one shared rule set to every file directly under
/// `base` whose name ends with `suffix`, in name order.
pub fn run_glob(
    base: &Path,
    suffix: &str,
    rules: &[PatchRule],
    opts: BatchOptions,
) -> BatchReport {
    let mut names: Vec<String> = WalkDir::new(base)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .filter(|name| name.ends_with(suffix))
        .collect();
    names.sort();

    let mut report = BatchReport::default();

    for name in names {
        let path = base.join(&name);
        let result = if opts.dry_run {
            check_file(&path, rules)
        } else {
            patch_file(&path, rules)
        };
        report.files.push(FileReport { name, result });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FileTarget, TEST_FILE_SUFFIX};
    use std::fs;

    fn catalog() -> PatchCatalog {
        PatchCatalog {
            targets: vec![
                FileTarget {
                    file: "First.t.sol".to_string(),
                    rules: vec![PatchRule::literal("alpha", "beta")],
                },
                FileTarget {
                    file: "Absent.t.sol".to_string(),
                    rules: vec![PatchRule::literal("alpha", "beta")],
                },
                FileTarget {
                    file: "Untouched.t.sol".to_string(),
                    rules: vec![PatchRule::literal("alpha", "beta")],
                },
            ],
        }
    }

    #[test]
    fn explicit_mode_records_each_outcome() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("First.t.sol"), "alpha here").unwrap();
        fs::write(dir.path().join("Untouched.t.sol"), "nothing").unwrap();

        let report = run_explicit(dir.path(), &catalog(), BatchOptions::default());

        assert_eq!(report.total(), 3);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.missing(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.updated_names(), vec!["First.t.sol"]);

        let first = fs::read_to_string(dir.path().join("First.t.sol")).unwrap();
        assert_eq!(first, "beta here");
    }

    #[test]
    fn explicit_mode_continues_past_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        // Only the last target exists.
        fs::write(dir.path().join("Untouched.t.sol"), "alpha").unwrap();

        let report = run_explicit(dir.path(), &catalog(), BatchOptions::default());
        assert_eq!(report.missing(), 2);
        assert_eq!(report.updated(), 1);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("First.t.sol"), "alpha here").unwrap();

        let report = run_explicit(dir.path(), &catalog(), BatchOptions { dry_run: true });
        assert_eq!(report.updated(), 1);

        let content = fs::read_to_string(dir.path().join("First.t.sol")).unwrap();
        assert_eq!(content, "alpha here");
    }

    #[test]
    fn glob_mode_enumerates_matching_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("B.t.sol"), "alpha").unwrap();
        fs::write(dir.path().join("A.t.sol"), "alpha").unwrap();
        fs::write(dir.path().join("NotATest.sol"), "alpha").unwrap();

        let rules = vec![PatchRule::literal("alpha", "beta")];
        let report = run_glob(dir.path(), TEST_FILE_SUFFIX, &rules, BatchOptions::default());

        assert_eq!(report.total(), 2);
        assert_eq!(report.updated_names(), vec!["A.t.sol", "B.t.sol"]);

        // Non-matching file is left alone.
        let other = fs::read_to_string(dir.path().join("NotATest.sol")).unwrap();
        assert_eq!(other, "alpha");
    }

    #[test]
    fn glob_mode_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("Deep.t.sol"), "alpha").unwrap();

        let rules = vec![PatchRule::literal("alpha", "beta")];
        let report = run_glob(dir.path(), TEST_FILE_SUFFIX, &rules, BatchOptions::default());
        assert_eq!(report.total(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_isolated() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("First.t.sol"), "alpha").unwrap();
        let locked = dir.path().join("Untouched.t.sol");
        fs::write(&locked, "alpha").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores file modes; nothing to assert in that case.
        if fs::read(&locked).is_ok() {
            return;
        }

        let report = run_explicit(dir.path(), &catalog(), BatchOptions::default());

        // The unreadable file fails, the rest of the batch still ran.
        assert_eq!(report.failed(), 1);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.missing(), 1);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    }
}
