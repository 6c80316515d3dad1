//! Recursive transfer of component versions into a target repository.
//!
//! The engine walks the reference graph depth first in descriptor order.
//! Every version is handled at most once per run, even when several
//! references lead to it, and revisiting a version on its own path fails
//! with a recursion error. Each open version is owned by a [`VersionGuard`],
//! so it is closed on every exit path. The first error aborts the run; it is
//! wrapped with the traversal path at every level it passes through. Content
//! already written to the target is not rolled back.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use ferry_core::{
    lookup_in, resolve_reference, AccessSpec, ComponentDescriptor, ComponentVersionAccess,
    CoreError, History, NameVersion, Printer, Repository, Resolver, Resource, Result,
    VersionGuard, KIND_COMPONENT_VERSION,
};

use crate::handler::{Decision, Element, TransferHandler};

/// What to do with one version, given what the target already holds.
enum Plan {
    /// Write a fresh copy. `previous` is the replaced target descriptor.
    Copy { previous: Option<ComponentDescriptor> },
    /// Update volatile metadata of the equivalent target version.
    UpdateMeta(VersionGuard),
    /// Leave the target version untouched.
    Skip,
    /// Leave the target version untouched and do not descend.
    Done,
}

/// Copies component versions into one target repository.
pub struct TransferEngine<'a> {
    target: Arc<dyn Repository>,
    handler: &'a dyn TransferHandler,
    fallback: Option<&'a dyn Resolver>,
    printer: Printer,
    interrupt: Option<Arc<AtomicBool>>,
    visited: HashSet<NameVersion>,
    copied: Vec<NameVersion>,
    run: Uuid,
}

impl<'a> TransferEngine<'a> {
    pub fn new(target: Arc<dyn Repository>, handler: &'a dyn TransferHandler) -> Self {
        TransferEngine {
            target,
            handler,
            fallback: None,
            printer: Printer::null(),
            interrupt: None,
            visited: HashSet::new(),
            copied: Vec::new(),
            run: Uuid::new_v4(),
        }
    }

    /// Resolve references missing from the source repository here.
    pub fn with_fallback(mut self, resolver: &'a dyn Resolver) -> Self {
        self.fallback = Some(resolver);
        self
    }

    /// Print progress to `printer`.
    pub fn with_printer(mut self, printer: Printer) -> Self {
        self.printer = printer;
        self
    }

    /// Abort with [`CoreError::Cancelled`] once `flag` is raised.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Identifier of this run, as recorded in log spans.
    pub fn run_id(&self) -> Uuid {
        self.run
    }

    /// Versions written to the target so far, in commit order.
    pub fn copied(&self) -> &[NameVersion] {
        &self.copied
    }

    /// Whether `nv` has been handled in this run.
    pub fn is_visited(&self, nv: &NameVersion) -> bool {
        self.visited.contains(nv)
    }

    /// Transfer `source` and, per policy, everything it references.
    pub fn transfer(&mut self, source: &dyn ComponentVersionAccess) -> Result<()> {
        self.transfer_with_history(source, &History::new())
    }

    /// Transfer `source` as if reached along `history`.
    pub fn transfer_with_history(
        &mut self,
        source: &dyn ComponentVersionAccess,
        history: &History,
    ) -> Result<()> {
        let span = info_span!("transfer", run = %self.run);
        let _entered = span.enter();
        let printer = self.printer.clone();
        self.transfer_version(source, history, &printer)
    }

    fn transfer_version(
        &mut self,
        source: &dyn ComponentVersionAccess,
        history: &History,
        printer: &Printer,
    ) -> Result<()> {
        if self.interrupted() {
            printer.println("transfer cancelled by caller");
            return Err(CoreError::Cancelled);
        }

        let nv = source.name_version();
        let history = history.add(KIND_COMPONENT_VERSION, &nv)?;
        if !self.visited.insert(nv.clone()) {
            debug!(
                version = %nv,
                source = %source.repository().description(),
                "version already handled in this run"
            );
            return Ok(());
        }

        info!(version = %nv, history = %history, "transferring version");
        printer.println(format!("transferring version \"{nv}\"..."));

        match self.plan(source, &nv, &history, printer)? {
            Plan::Done => Ok(()),
            Plan::Skip => {
                if self.handler.stop_on_existing() {
                    return Ok(());
                }
                self.transfer_references(source, None, &history, printer)
            }
            Plan::UpdateMeta(mut existing) => {
                existing
                    .set_meta(source.descriptor().meta())
                    .map_err(|e| e.wrap(format!("{history}: updating target version")))?;
                self.transfer_references(source, None, &history, printer)?;
                self.commit(&nv, existing, &history, printer)
            }
            Plan::Copy { previous } => {
                let mut target = VersionGuard::new(
                    self.target
                        .new_component_version(nv.name(), nv.version())
                        .map_err(|e| e.wrap(format!("{history}: creating target version")))?,
                );
                target.set_meta(source.descriptor().meta())?;
                self.copy_resources(source, &mut *target, previous.as_ref(), &history, printer)?;
                self.copy_sources(source, &mut *target, &history, printer)?;
                self.transfer_references(source, Some(&mut *target), &history, printer)?;
                self.commit(&nv, target, &history, printer)
            }
        }
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn plan(
        &self,
        source: &dyn ComponentVersionAccess,
        nv: &NameVersion,
        history: &History,
        printer: &Printer,
    ) -> Result<Plan> {
        let Some(existing) = lookup_in(self.target.as_ref(), nv)? else {
            return Ok(Plan::Copy { previous: None });
        };
        let src = source.descriptor();
        let current = existing.descriptor().clone();

        if self.handler.enforce_transport(src, &current) {
            debug!(version = %nv, "transport enforced for present version");
            existing.close()?;
            return Ok(Plan::Copy {
                previous: Some(current),
            });
        }

        if !src.is_equivalent(&current) {
            existing.close()?;
            if self.handler.should_overwrite(src, &current) {
                printer.println(format!(
                    "warning: version \"{nv}\" already present, but differs (transport enforced by overwrite option)"
                ));
                return Ok(Plan::Copy {
                    previous: Some(current),
                });
            }
            warn!(version = %nv, "present version differs, transport aborted");
            printer.println(format!(
                "version \"{nv}\" already present, but differs -> transport aborted (use overwrite option to enforce transport)"
            ));
            return Err(CoreError::AlreadyExists {
                kind: KIND_COMPONENT_VERSION.to_string(),
                name: nv.to_string(),
            }
            .wrap(history.to_string()));
        }

        if src.labels == current.labels {
            existing.close()?;
            if self.needs_resource_transport(src, &current) {
                printer.println(format!(
                    "version \"{nv}\" already present -> but requires resource transport"
                ));
                return Ok(Plan::Copy {
                    previous: Some(current),
                });
            }
            printer.println(format!("version \"{nv}\" already present -> skip transport"));
            return Ok(Plan::Skip);
        }

        if !self.handler.update_version(src, &current) {
            existing.close()?;
            printer.println(format!(
                "version \"{nv}\" requires update of volatile data, but skipped"
            ));
            return Ok(Plan::Done);
        }

        if self.handler.should_overwrite(src, &current) {
            existing.close()?;
            printer.println(format!(
                "warning: version \"{nv}\" already present, but transport enforced by overwrite option"
            ));
            return Ok(Plan::Copy {
                previous: Some(current),
            });
        }

        printer.println(format!("updating volatile properties of \"{nv}\""));
        Ok(Plan::UpdateMeta(existing))
    }

    fn copy_resources(
        &self,
        source: &dyn ComponentVersionAccess,
        target: &mut dyn ComponentVersionAccess,
        previous: Option<&ComponentDescriptor>,
        history: &History,
        printer: &Printer,
    ) -> Result<()> {
        for (index, resource) in source.descriptor().resources.iter().enumerate() {
            let context = || format!("{history}: transferring resource {index} {}", resource.identity());
            let access = if self.by_value(&resource.access, Element::Resource(resource)) {
                let hint = resource.access.reference_hint();
                match previous.and_then(|p| reusable_access(p, resource)) {
                    Some(access) => {
                        notify(printer, "resource", index, &resource.meta.name, &resource.kind, hint.as_deref(), Some("already present"));
                        access
                    }
                    None => {
                        notify(printer, "resource", index, &resource.meta.name, &resource.kind, hint.as_deref(), None);
                        self.copy_blob(source, target, &resource.access, hint.as_deref())
                            .map_err(|e| e.wrap(context()))?
                    }
                }
            } else {
                resource.access.clone()
            };
            target
                .set_resource(resource.with_access(access))
                .map_err(|e| e.wrap(context()))?;
        }
        Ok(())
    }

    fn copy_sources(
        &self,
        source: &dyn ComponentVersionAccess,
        target: &mut dyn ComponentVersionAccess,
        history: &History,
        printer: &Printer,
    ) -> Result<()> {
        for (index, src) in source.descriptor().sources.iter().enumerate() {
            let context = || format!("{history}: transferring source {index} {}", src.identity());
            let access = if self.by_value(&src.access, Element::Source(src)) {
                let hint = src.access.reference_hint();
                notify(printer, "source", index, &src.meta.name, &src.kind, hint.as_deref(), None);
                self.copy_blob(source, target, &src.access, hint.as_deref())
                    .map_err(|e| e.wrap(context()))?
            } else {
                src.access.clone()
            };
            target
                .set_source(src.with_access(access))
                .map_err(|e| e.wrap(context()))?;
        }
        Ok(())
    }

    /// Whether the policy wants an element by value that `current` does not
    /// hold as a local blob.
    fn needs_resource_transport(
        &self,
        src: &ComponentDescriptor,
        current: &ComponentDescriptor,
    ) -> bool {
        let resources = src.resources.iter().any(|r| {
            self.by_value(&r.access, Element::Resource(r))
                && current
                    .resource_by_identity(&r.identity())
                    .map_or(true, |old| !old.access.is_local())
        });
        resources
            || src.sources.iter().any(|s| {
                self.by_value(&s.access, Element::Source(s))
                    && current
                        .source_by_identity(&s.identity())
                        .map_or(true, |old| !old.access.is_local())
            })
    }

    /// Local blobs always travel by value; `none` accesses never do.
    fn by_value(&self, access: &AccessSpec, element: Element<'_>) -> bool {
        if access.is_local() {
            return true;
        }
        if access.is_none() {
            return false;
        }
        self.handler.decide(element) == Decision::ByValue
    }

    fn copy_blob(
        &self,
        source: &dyn ComponentVersionAccess,
        target: &mut dyn ComponentVersionAccess,
        access: &AccessSpec,
        hint: Option<&str>,
    ) -> Result<AccessSpec> {
        let blob = source.access_method(access)?.get()?;
        let global = if !self.handler.keep_global_access() {
            None
        } else if access.is_local() {
            access.global_access().cloned()
        } else {
            Some(access.clone())
        };
        debug!(digest = %blob.digest(), size = blob.size(), "copying blob");
        target.add_blob(&blob, hint, global)
    }

    fn transfer_references(
        &mut self,
        source: &dyn ComponentVersionAccess,
        mut target: Option<&mut dyn ComponentVersionAccess>,
        history: &History,
        printer: &Printer,
    ) -> Result<()> {
        for reference in &source.descriptor().references {
            let id = reference.target();
            let context = || format!("{history}: nested component {}[{id}]", reference.meta.name);
            if let Some(target) = target.as_deref_mut() {
                target
                    .set_reference(reference.clone())
                    .map_err(|e| e.wrap(context()))?;
            }
            if self.handler.decide(Element::Reference(reference)) != Decision::ByValue {
                continue;
            }

            let cv = resolve_reference(source, &id, self.fallback)
                .map_err(|e| e.wrap(context()))?
                .ok_or_else(|| {
                    CoreError::not_found(KIND_COMPONENT_VERSION, id.to_string()).wrap(context())
                })?;
            self.transfer_version(&*cv, history, &printer.section("  "))
                .map_err(|e| e.wrap(context()))?;
            cv.close().map_err(|e| e.wrap(context()))?;
        }
        Ok(())
    }

    fn commit(
        &mut self,
        nv: &NameVersion,
        target: VersionGuard,
        history: &History,
        printer: &Printer,
    ) -> Result<()> {
        printer.println("...adding component version...");
        info!(version = %nv, "adding component version");
        self.target
            .add_component_version(&*target)
            .map_err(|e| e.wrap(format!("{history}: adding component version")))?;
        target.close()?;
        self.copied.push(nv.clone());
        Ok(())
    }
}

/// Transfer `source` into `target` with a fresh run state.
pub fn transfer_version(
    source: &dyn ComponentVersionAccess,
    target: Arc<dyn Repository>,
    handler: &dyn TransferHandler,
    history: &History,
) -> Result<()> {
    TransferEngine::new(target, handler).transfer_with_history(source, history)
}

/// The access of a previous target resource with the same identity and a
/// known, equal digest.
fn reusable_access(previous: &ComponentDescriptor, resource: &Resource) -> Option<AccessSpec> {
    let old = previous.resource_by_identity(&resource.identity())?;
    match (&old.digest, &resource.digest) {
        (Some(a), Some(b)) if a == b && old.access.is_local() => Some(old.access.clone()),
        _ => None,
    }
}

fn notify(
    printer: &Printer,
    kind: &str,
    index: usize,
    name: &str,
    artifact_type: &str,
    hint: Option<&str>,
    note: Option<&str>,
) {
    let note = note.map(|n| format!(" ({n})")).unwrap_or_else(|| "...".to_string());
    match hint {
        Some(hint) => printer.println(format!("...{kind} {index} {name}[{artifact_type}]({hint}){note}")),
        None => printer.println(format!("...{kind} {index} {name}[{artifact_type}]{note}")),
    }
}
