//! Script binding.
//!
//! For one target category, every legacy record carrying a script is
//! correlated with its converted counterpart, the script is compiled into a
//! handle, and the handle is bound to the counterpart's behavior slot. Bound
//! records are copied into the output container under their own ids.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use thiserror::Error;

use crate::convert::compiler::{ScriptCompiler, CONVERTED_PREFIX};
use crate::convert::index::RecordIndex;
use crate::convert::report::{skip_and_continue, ConversionReport, SkipReason};
use crate::records::{
    BehaviorBinding, Category, Collection, ContainerId, FormId, Record, RecordError, ScriptHandle,
    StoreError,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("{category} records have no behavior slot")]
    UnsupportedCategory { category: Category },

    #[error(transparent)]
    Record(#[from] RecordError),
}

fn check_slot(target: &Record) -> Result<(), BindError> {
    if target.category.supports_behavior() {
        Ok(())
    } else {
        Err(BindError::UnsupportedCategory {
            category: target.category,
        })
    }
}

/// Both [`bind`] and [`bind_appending`] succeed on a record that passes this.
fn check_bindable(target: &Record) -> Result<(), BindError> {
    check_slot(target)?;
    target.target()?;
    Ok(())
}

/// Replace the target's binding with exactly `[handle]`.
pub fn bind(target: &mut Record, handle: ScriptHandle) -> Result<(), BindError> {
    check_slot(target)?;
    let fields = target.target_mut()?;
    fields.behavior = Some(BehaviorBinding::single(handle));
    target.mark_dirty();
    Ok(())
}

/// Add `handle` to the target's binding, creating one if needed. A handle
/// with the same name already bound is not added twice.
pub fn bind_appending(target: &mut Record, handle: ScriptHandle) -> Result<(), BindError> {
    check_slot(target)?;
    let fields = target.target_mut()?;
    match &mut fields.behavior {
        Some(binding) => {
            if !binding.handles().iter().any(|bound| bound.name == handle.name) {
                binding.push(handle);
            }
        }
        None => fields.behavior = Some(BehaviorBinding::single(handle)),
    }
    target.mark_dirty();
    Ok(())
}

/// Legacy source scripts by exact form id.
pub struct ScriptCatalog<'a> {
    scripts: HashMap<FormId, &'a Record>,
}

impl<'a> ScriptCatalog<'a> {
    pub fn build(legacy: &'a Collection) -> Self {
        let scripts = legacy
            .records_of(Category::Script)
            .filter(|record| record.script().is_ok())
            .map(|record| (record.form_id, record))
            .collect();
        Self { scripts }
    }

    pub fn get(&self, id: FormId) -> Option<&'a Record> {
        self.scripts.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Where a binding pass looks for counterparts and where it writes results.
#[derive(Debug, Clone)]
pub struct BindTargets {
    /// Containers searched for counterparts, in load order.
    pub lookup: Vec<ContainerId>,
    pub output: ContainerId,
}

struct Pass<'a, C: ?Sized> {
    category: Category,
    view: &'a Collection,
    index: &'a RecordIndex,
    scripts: &'a ScriptCatalog<'a>,
    compiler: &'a mut C,
    pending: BTreeMap<FormId, Record>,
}

impl<'a, C: ScriptCompiler + ?Sized> Pass<'a, C> {
    fn script_for(&self, record: &Record) -> Result<&'a Record, SkipReason> {
        let script_id = record.legacy()?.script.ok_or(SkipReason::ScriptResolutionMiss {
            script: FormId(0),
        })?;
        self.scripts
            .get(script_id)
            .ok_or(SkipReason::ScriptResolutionMiss { script: script_id })
    }

    /// Working copy of a counterpart; the first request clones the winning version.
    /// A counterpart that cannot take a binding is never staged.
    fn stage(&mut self, category: Category, id: FormId) -> Result<&mut Record, SkipReason> {
        match self.pending.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let record = self.view.resolve(category, id).ok_or(SkipReason::CorrelationMiss {
                    masked: id.masked(),
                    by_template: false,
                })?;
                check_bindable(record)?;
                Ok(entry.insert(record.clone()))
            }
        }
    }

    fn bind_direct(&mut self, record: &Record) -> Result<(), SkipReason> {
        let script = self.script_for(record)?;
        let target_id = self
            .index
            .correlate(record, self.category)
            .ok_or(SkipReason::CorrelationMiss {
                masked: record.masked_id(),
                by_template: false,
            })?;
        let handle = self.compiler.compile(script)?;
        let target = self.stage(self.category, target_id)?;
        bind(target, handle)?;
        debug!("bound {} to {}", record.label(), target_id);
        Ok(())
    }

    /// Leveled lists bind through the actor generated from the converted list.
    fn bind_leveled(&mut self, record: &Record) -> Result<(), SkipReason> {
        let script = self.script_for(record)?;
        let key = record
            .editor_key
            .as_ref()
            .ok_or(SkipReason::KeyResolutionMiss {
                key: record.label(),
            })?;
        let list_key = format!("{}{}", CONVERTED_PREFIX, key);
        let list = self
            .index
            .find_by_key(&list_key, Category::LeveledNpc)
            .ok_or(SkipReason::KeyResolutionMiss { key: list_key })?;
        let actor = self
            .index
            .correlate_by_template(list)
            .ok_or(SkipReason::CorrelationMiss {
                masked: list.masked(),
                by_template: true,
            })?;
        let handle = self.compiler.compile(script)?;
        let target = self.stage(Category::Npc, actor)?;
        bind_appending(target, handle)?;
        debug!("appended script of {} to actor {}", record.label(), actor);
        Ok(())
    }
}

fn has_script(record: &Record) -> bool {
    matches!(record.legacy(), Ok(fields) if fields.script.is_some())
}

/// Bind every scripted legacy record feeding `category`. Skips are logged
/// and reported; only a missing output container fails the pass.
pub fn bind_category<C>(
    category: Category,
    legacy: &Collection,
    scripts: &ScriptCatalog<'_>,
    target: &mut Collection,
    targets: &BindTargets,
    compiler: &mut C,
) -> Result<ConversionReport, StoreError>
where
    C: ScriptCompiler + ?Sized,
{
    let mut report = ConversionReport::new();
    if !category.supports_behavior() {
        report.add_skip(
            category,
            category.code(),
            BindError::UnsupportedCategory { category }.into(),
        );
        return Ok(report);
    }

    let pending = {
        let view: &Collection = target;
        let index = RecordIndex::build(view.records_in(&targets.lookup));
        let mut pass = Pass {
            category,
            view,
            index: &index,
            scripts,
            compiler,
            pending: BTreeMap::new(),
        };
        for &source in category.legacy_sources() {
            skip_and_continue(
                source,
                legacy.records_of(source).filter(|record| has_script(record)),
                &mut report,
                |record| record.label(),
                |record| {
                    if source == Category::LeveledCreature {
                        pass.bind_leveled(record)
                    } else {
                        pass.bind_direct(record)
                    }
                },
            );
        }
        pass.pending
    };

    let bound = pending.len();
    for (_, record) in pending {
        target.upsert(targets.output, record)?;
    }
    let marked = target.mark_category_dirty(targets.output, category);
    info!(
        "{}: {} converted, {} records bound, {} skipped, {} output records marked",
        category,
        report.converted,
        bound,
        report.skipped.len(),
        marked
    );
    Ok(report)
}
