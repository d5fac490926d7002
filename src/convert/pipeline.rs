//! Full conversion run over an explicitly passed target collection.

use log::info;

use crate::convert::binder::{bind_category, BindTargets, ScriptCatalog};
use crate::convert::compiler::ScriptCompiler;
use crate::convert::index::RecordIndex;
use crate::convert::placement::add_speak_as_actors;
use crate::convert::report::ConversionReport;
use crate::convert::templates::add_package_templates;
use crate::records::{Collection, ContainerId, StoreError, BOUND_CATEGORIES};

/// The three target containers a run works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRoles {
    /// Successor base game; source of stock package templates.
    pub base: ContainerId,
    /// Records already converted from the legacy game.
    pub master: ContainerId,
    /// Container receiving every new or changed record.
    pub output: ContainerId,
}

impl TargetRoles {
    /// Look the roles up by container name.
    pub fn find(
        collection: &Collection,
        base: &str,
        master: &str,
        output: &str,
    ) -> Result<Self, StoreError> {
        let lookup = |name: &str| {
            collection
                .find_container(name)
                .ok_or_else(|| StoreError::NotFound(format!("container: {}", name)))
        };
        Ok(Self {
            base: lookup(base)?,
            master: lookup(master)?,
            output: lookup(output)?,
        })
    }
}

/// Run every pass in order: speak-as placement, package templates, then
/// script binding for each target category. Per-record problems end up in
/// the report; only store errors abort.
pub fn run_conversion<C>(
    legacy: &Collection,
    target: &mut Collection,
    roles: &TargetRoles,
    compiler: &mut C,
    speak_as: &[String],
) -> Result<ConversionReport, StoreError>
where
    C: ScriptCompiler + ?Sized,
{
    let mut report = ConversionReport::new();
    let mut index = RecordIndex::build(target.records());

    info!("placing {} speak-as actors", speak_as.len());
    report.merge(add_speak_as_actors(target, roles.output, &mut index, speak_as)?);

    info!("adding lock-gated package templates");
    report.merge(add_package_templates(target, roles, &mut index)?);

    let scripts = ScriptCatalog::build(legacy);
    info!("binding scripts ({} legacy scripts available)", scripts.len());
    let targets = BindTargets {
        lookup: vec![roles.master, roles.output],
        output: roles.output,
    };
    for category in BOUND_CATEGORIES {
        report.merge(bind_category(
            category, legacy, &scripts, target, &targets, compiler,
        )?);
    }

    info!(
        "conversion finished: {} converted, {} created, {} skipped",
        report.converted,
        report.created,
        report.skipped.len()
    );
    Ok(report)
}
