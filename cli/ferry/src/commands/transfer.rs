//! `ferry transfer`: copy component versions between directory repositories.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use ferry_core::{NameVersion, Printer, Repository, VersionGuard};
use ferry_repo::ExternalArtifacts;
use ferry_transfer::{StandardHandler, TransferEngine, TransferOptions};

/// Split `name[=bool]` into an option name and value.
pub fn parse_option(spec: &str) -> Result<(&str, bool)> {
    match spec.split_once('=') {
        None => Ok((spec, true)),
        Some((name, value)) => {
            let value = value
                .parse::<bool>()
                .with_context(|| format!("invalid value for transfer option '{name}'"))?;
            Ok((name, value))
        }
    }
}

/// Layer command-line settings over `options`: enabled switches first,
/// then named `--option` settings in order.
pub fn apply_overrides(
    mut options: TransferOptions,
    switches: &[(&str, bool)],
    named: &[String],
) -> Result<TransferOptions> {
    for (name, enabled) in switches {
        if *enabled {
            options.set_flag(name, true)?;
        }
    }
    for spec in named {
        let (name, value) = parse_option(spec)?;
        options.set_flag(name, value)?;
    }
    Ok(options)
}

/// Transfer `components` (or every version) from `source` into `target`.
/// Returns the versions written to the target.
pub fn run(
    source: &Path,
    target: &Path,
    lookup: &[PathBuf],
    components: &[String],
    options: &TransferOptions,
    printer: Printer,
) -> Result<Vec<NameVersion>> {
    if source == target {
        bail!("source and target repository are the same: {}", source.display());
    }

    let artifacts = ExternalArtifacts::new();
    let src = super::open_repository(source, &artifacts, false)?;
    let dst = super::open_repository(target, &artifacts, true)?;
    let (resolver, lookups) = super::lookup_resolver(lookup, &artifacts)?;
    let roots = super::select_roots(&*src, components)?;
    info!(
        source = %src.description(),
        target = %dst.description(),
        roots = roots.len(),
        "starting transfer"
    );

    let handler = StandardHandler::new(options.clone());
    let mut engine = TransferEngine::new(dst.clone(), &handler).with_printer(printer);
    if !resolver.is_empty() {
        engine = engine.with_fallback(&resolver);
    }
    for nv in &roots {
        let cv = VersionGuard::new(
            src.lookup_component_version(nv.name(), nv.version())
                .with_context(|| format!("looking up {nv}"))?,
        );
        engine
            .transfer(&*cv)
            .with_context(|| format!("transferring {nv}"))?;
        cv.close()?;
    }
    let copied = engine.copied().to_vec();
    info!(run = %engine.run_id(), copied = copied.len(), "transfer finished");

    super::close_all(&lookups)?;
    super::close_all(&[src, dst])?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_specs() {
        assert_eq!(parse_option("overwrite").unwrap(), ("overwrite", true));
        assert_eq!(parse_option("skip-update=false").unwrap(), ("skip-update", false));
        assert!(parse_option("overwrite=maybe").is_err());
    }

    #[test]
    fn overrides_layer_over_config() {
        let base = TransferOptions::new().overwrite(true);
        let options = apply_overrides(
            base,
            &[("recursive", true), ("resources-by-value", false)],
            &["overwrite=false".to_string(), "keep-global-access".to_string()],
        )
        .unwrap();
        assert!(options.recursive);
        assert!(!options.resources_by_value);
        assert!(!options.overwrite);
        assert!(options.keep_global_access);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = apply_overrides(TransferOptions::new(), &[], &["recursiv".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "unknown transfer option \"recursiv\"");
    }

    #[test]
    fn same_source_and_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), dir.path(), &[], &[], &TransferOptions::new(), Printer::null())
            .unwrap_err();
        assert!(err.to_string().contains("are the same"));
    }
}
