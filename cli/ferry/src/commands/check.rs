//! `ferry check`: completeness check of component versions.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::info;

use ferry_check::{format_json, format_table, CheckEntry, CheckOptions, Checker};
use ferry_core::Repository;
use ferry_repo::ExternalArtifacts;

/// Report layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Wide,
    Json,
}

impl OutputFormat {
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.unwrap_or("table") {
            "table" => Ok(OutputFormat::Table),
            "wide" => Ok(OutputFormat::Wide),
            "json" => Ok(OutputFormat::Json),
            other => bail!("unknown output format '{other}' (expected table, wide or json)"),
        }
    }
}

/// Check the given roots (or every version) of the repository at
/// `repo_path` and print the report. With `fail_on_error` the report is
/// still printed, then any root that is not OK fails the command.
pub fn run(
    repo_path: &Path,
    lookup: &[PathBuf],
    roots: &[String],
    options: CheckOptions,
    output: Option<&str>,
    fail_on_error: bool,
) -> Result<()> {
    let format = OutputFormat::parse(output)?;
    let entries = check(repo_path, lookup, roots, options)?;
    print!("{}", render(&entries, format)?);
    if fail_on_error {
        ensure_ok(&entries)?;
    }
    Ok(())
}

/// Fail if any entry did not pass every enabled check.
pub fn ensure_ok(entries: &[CheckEntry]) -> Result<()> {
    let failed: Vec<String> = entries
        .iter()
        .filter(|e| !e.is_ok())
        .map(|e| format!("{} ({})", e.component_version, e.status))
        .collect();
    if !failed.is_empty() {
        bail!(
            "{} of {} component version(s) failed the check: {}",
            failed.len(),
            entries.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

/// Check without printing.
pub fn check(
    repo_path: &Path,
    lookup: &[PathBuf],
    roots: &[String],
    options: CheckOptions,
) -> Result<Vec<CheckEntry>> {
    let artifacts = ExternalArtifacts::new();
    let repo = super::open_repository(repo_path, &artifacts, false)?;
    let (resolver, lookups) = super::lookup_resolver(lookup, &artifacts)?;
    let roots = super::select_roots(&*repo, roots)?;
    info!(
        repository = %repo.description(),
        roots = roots.len(),
        lookups = lookups.len(),
        "checking component versions"
    );

    let mut checker = Checker::new(options);
    if !resolver.is_empty() {
        checker = checker.with_fallback(&resolver);
    }
    let entries = checker.check_versions(&*repo, &roots);

    super::close_all(&lookups)?;
    super::close_all(std::slice::from_ref(&repo))?;
    Ok(entries)
}

pub fn render(entries: &[CheckEntry], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Table => format_table(entries, false),
        OutputFormat::Wide => format_table(entries, true),
        OutputFormat::Json => format_json(entries)? + "\n",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_formats() {
        assert_eq!(OutputFormat::parse(None).unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::parse(Some("wide")).unwrap(), OutputFormat::Wide);
        assert_eq!(OutputFormat::parse(Some("json")).unwrap(), OutputFormat::Json);
        let err = OutputFormat::parse(Some("yaml")).unwrap_err();
        assert!(err.to_string().contains("unknown output format 'yaml'"));
    }

    #[test]
    fn empty_report_has_header_only() {
        assert_eq!(
            render(&[], OutputFormat::Table).unwrap(),
            "COMPONENT VERSION STATUS ERROR\n"
        );
        assert_eq!(render(&[], OutputFormat::Json).unwrap(), "{\n  \"items\": []\n}\n");
    }

    #[test]
    fn only_failed_entries_are_reported() {
        let entry = |name: &str, status: &str| CheckEntry {
            status: status.to_string(),
            component_version: ferry_core::NameVersion::new(name, "v1"),
            result: Default::default(),
            error: None,
        };
        ensure_ok(&[]).unwrap();
        ensure_ok(&[entry("acme.org/a", "OK")]).unwrap();

        let err = ensure_ok(&[
            entry("acme.org/a", "OK"),
            entry("acme.org/b", "Incomplete"),
            entry("acme.org/c", "Error"),
        ])
        .err()
        .expect("failed entries accepted");
        assert_eq!(
            err.to_string(),
            "2 of 3 component version(s) failed the check: acme.org/b:v1 (Incomplete), acme.org/c:v1 (Error)"
        );
    }
}
