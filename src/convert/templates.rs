//! Lock-gated package templates.
//!
//! Each catalog entry names an existing package template and the key of the
//! lock-gated copy built from it with the lock/unlock extension.

use log::info;

use crate::convert::augment::{augment_with_report, lock_gating_procedures, lock_gating_slots, AugmentMiss};
use crate::convert::index::RecordIndex;
use crate::convert::pipeline::TargetRoles;
use crate::convert::report::{ConversionReport, SkipReason};
use crate::records::{Category, Collection, ContainerId, FormId, Record, RecordBody, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource {
    /// Converted master (templates already ported from the legacy game).
    Master,
    /// Successor base game.
    Base,
}

#[derive(Debug, Clone, Copy)]
pub struct PackageTemplate {
    pub source: TemplateSource,
    pub source_key: &'static str,
    pub new_key: &'static str,
    /// Procedure node whose flags are cleared on the copy.
    pub clear_flags_at: Option<usize>,
}

const fn template(
    source: TemplateSource,
    source_key: &'static str,
    new_key: &'static str,
) -> PackageTemplate {
    PackageTemplate {
        source,
        source_key,
        new_key,
        clear_flags_at: None,
    }
}

pub const PACKAGE_TEMPLATES: [PackageTemplate; 6] = [
    template(
        TemplateSource::Master,
        "TES4FindPackageTemplate",
        "TES4FindLockPackageTemplate",
    ),
    template(
        TemplateSource::Master,
        "TES4UseItemAtPackageTemplate",
        "TES4UseItemAtLockPackageTemplate",
    ),
    template(TemplateSource::Base, "Eat", "TES4EatLockTemplate"),
    template(TemplateSource::Base, "Sleep", "TES4SleepLockTemplate"),
    template(TemplateSource::Base, "Sandbox", "TES4SandboxLockTemplate"),
    PackageTemplate {
        source: TemplateSource::Base,
        source_key: "Travel",
        new_key: "TES4TravelLockTemplate",
        clear_flags_at: Some(3),
    },
];

fn source_container(roles: &TargetRoles, source: TemplateSource) -> ContainerId {
    match source {
        TemplateSource::Master => roles.master,
        TemplateSource::Base => roles.base,
    }
}

fn build_copy(
    entry: &PackageTemplate,
    target: &Collection,
    roles: &TargetRoles,
    index: &RecordIndex,
) -> Result<(Record, Vec<AugmentMiss>), SkipReason> {
    if index.find_by_key(entry.new_key, Category::Package).is_some() {
        return Err(SkipReason::AlreadyPresent {
            key: entry.new_key.to_string(),
        });
    }
    let source = target
        .container(source_container(roles, entry.source))
        .and_then(|container| {
            container
                .records_of(Category::Package)
                .filter(|record| {
                    record
                        .editor_key
                        .as_ref()
                        .is_some_and(|key| key.matches(entry.source_key))
                })
                .last()
        })
        .ok_or(SkipReason::KeyResolutionMiss {
            key: entry.source_key.to_string(),
        })?;

    let (mut package, misses) = augment_with_report(
        source.package()?,
        &lock_gating_slots(),
        &lock_gating_procedures(),
    );
    if let Some(node) = entry
        .clear_flags_at
        .and_then(|at| package.procedures.get_mut(at))
    {
        node.flags = 0;
    }
    let record = Record::new(FormId(0), Category::Package, RecordBody::Package(package))
        .with_key(entry.new_key);
    Ok((record, misses))
}

/// Create every catalog copy in the output container and register its key.
pub fn add_package_templates(
    target: &mut Collection,
    roles: &TargetRoles,
    index: &mut RecordIndex,
) -> Result<ConversionReport, StoreError> {
    let mut report = ConversionReport::new();
    for entry in PACKAGE_TEMPLATES.iter() {
        match build_copy(entry, target, roles, index) {
            Ok((record, misses)) => {
                let id = target.add_record(roles.output, record)?;
                index.insert_key(entry.new_key, Category::Package, id);
                report.add_created(1);
                report.add_success();
                info!("added package template {} as {}", entry.new_key, id);
                for miss in misses {
                    report.add_skip(Category::Package, entry.new_key, miss.into());
                }
            }
            Err(reason) => report.add_skip(Category::Package, entry.new_key, reason),
        }
    }
    Ok(report)
}
