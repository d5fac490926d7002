//! Test utilities & fixtures.
//! Builds small legacy/target collections laid out like a real run: one legacy
//! master, then base game, converted master and output plugin on the target side.
#![allow(dead_code)]

use formport::convert::{CompileError, TargetRoles};
use formport::records::{
    Category, Collection, Container, FormId, LegacyFields, PackageRecord, ProcedureNode, Record,
    RecordBody, ScriptHandle, SourceScript, TargetFields,
};

pub const LEGACY_ORDER: u8 = 0;
pub const BASE_ORDER: u8 = 0;
pub const MASTER_ORDER: u8 = 1;
pub const OUTPUT_ORDER: u8 = 2;

pub struct Fixture {
    pub legacy: Collection,
    pub target: Collection,
    pub roles: TargetRoles,
}

/// Empty legacy master plus empty base, master and output containers.
pub fn fixture() -> Fixture {
    let mut legacy = Collection::new();
    legacy.add_container(Container::new("Oblivion.esm", LEGACY_ORDER));

    let mut target = Collection::new();
    let roles = TargetRoles {
        base: target.add_container(Container::new("Skyrim.esm", BASE_ORDER)),
        master: target.add_container(Container::new("Skyblivion.esm", MASTER_ORDER)),
        output: target.add_container(Container::new("GECK.esp", OUTPUT_ORDER)),
    };
    Fixture {
        legacy,
        target,
        roles,
    }
}

impl Fixture {
    pub fn add_legacy(&mut self, record: Record) {
        let id = self.legacy.find_container("Oblivion.esm").expect("legacy");
        self.legacy.container_mut(id).expect("legacy").insert(record);
    }

    pub fn add_base(&mut self, record: Record) {
        let id = self.roles.base;
        self.target.container_mut(id).expect("base").insert(record);
    }

    pub fn add_master(&mut self, record: Record) {
        let id = self.roles.master;
        self.target.container_mut(id).expect("master").insert(record);
    }

    pub fn output(&self) -> &Container {
        self.target.container(self.roles.output).expect("output")
    }
}

/// Legacy object with an optional attached script.
pub fn legacy(object_id: u32, category: Category, script: Option<u32>) -> Record {
    Record::new(
        FormId::new(LEGACY_ORDER, object_id),
        category,
        RecordBody::Legacy(LegacyFields {
            script: script.map(|id| FormId::new(LEGACY_ORDER, id)),
        }),
    )
}

pub fn script(object_id: u32, key: &str, text: &str) -> Record {
    Record::new(
        FormId::new(LEGACY_ORDER, object_id),
        Category::Script,
        RecordBody::Script(SourceScript {
            text: text.to_string(),
        }),
    )
    .with_key(key)
}

/// Converted record in the master, sharing the legacy object id.
pub fn converted(object_id: u32, category: Category) -> Record {
    Record::new(
        FormId::new(MASTER_ORDER, object_id),
        category,
        RecordBody::Target(TargetFields::default()),
    )
}

pub fn package(load_order: u8, object_id: u32, key: &str, procedures: &[&str]) -> Record {
    let mut tree = PackageRecord::new("Sequence");
    for name in procedures {
        tree.push_top_level(ProcedureNode::procedure(*name));
    }
    Record::new(
        FormId::new(load_order, object_id),
        Category::Package,
        RecordBody::Package(tree),
    )
    .with_key(key)
}

/// Compiler that names handles `TES4<key>` and fails on scripts containing `FAIL`.
pub fn prefix_compiler() -> impl FnMut(&Record) -> Result<ScriptHandle, CompileError> {
    |script: &Record| -> Result<ScriptHandle, CompileError> {
        let text = script
            .script()
            .map_err(|e| CompileError(e.to_string()))?
            .text
            .clone();
        if text.contains("FAIL") {
            return Err(CompileError(format!("cannot translate {}", script.label())));
        }
        Ok(ScriptHandle::new(
            format!("TES4{}", script.label()),
            script.form_id,
        ))
    }
}

pub fn bound_names(record: &Record) -> Vec<String> {
    record
        .target()
        .expect("target body")
        .behavior
        .as_ref()
        .map(|binding| binding.handles().iter().map(|h| h.name.clone()).collect())
        .unwrap_or_default()
}
