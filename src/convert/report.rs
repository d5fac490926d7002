//! Per-pass outcome bookkeeping.
//!
//! No per-record failure stops a pass. Each one becomes a [`SkipReason`] in
//! the [`ConversionReport`] and a log line at the reason's level.

use log::Level;
use thiserror::Error;

use crate::convert::augment::AugmentMiss;
use crate::convert::binder::BindError;
use crate::convert::compiler::CompileError;
use crate::logutil::escape_log;
use crate::records::{Category, FormId, RecordError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SkipReason {
    /// `by_template` marks a miss on the leveled-list template reference.
    #[error("cannot find target record with object id {masked:06X}")]
    CorrelationMiss { masked: u32, by_template: bool },

    #[error("cannot find source script {script}")]
    ScriptResolutionMiss { script: FormId },

    #[error("script compile failed: {0}")]
    CompileFailure(String),

    #[error("{0}")]
    StructuralSearchMiss(AugmentMiss),

    #[error("cannot find actor {actor}")]
    DirectiveResolutionMiss { actor: String },

    #[error("cannot find editor key {key}")]
    KeyResolutionMiss { key: String },

    #[error("{key} already exists")]
    AlreadyPresent { key: String },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Bind(#[from] BindError),
}

impl From<CompileError> for SkipReason {
    fn from(err: CompileError) -> Self {
        SkipReason::CompileFailure(err.0)
    }
}

impl From<AugmentMiss> for SkipReason {
    fn from(miss: AugmentMiss) -> Self {
        SkipReason::StructuralSearchMiss(miss)
    }
}

impl SkipReason {
    /// Log level for this kind of skip.
    pub fn level(&self) -> Level {
        match self {
            SkipReason::AlreadyPresent { .. } => Level::Info,
            SkipReason::StructuralSearchMiss(_) => Level::Warn,
            SkipReason::CorrelationMiss {
                by_template: true, ..
            } => Level::Warn,
            _ => Level::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub category: Category,
    /// Editor key or form id of the item that was skipped.
    pub item: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default, Clone)]
pub struct ConversionReport {
    /// Records that received a converted binding or extension.
    pub converted: usize,
    /// Records newly created in the output container.
    pub created: usize,
    pub skipped: Vec<SkippedItem>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self) {
        self.converted += 1;
    }

    pub fn add_created(&mut self, count: usize) {
        self.created += count;
    }

    /// Record and log one skipped item.
    pub fn add_skip(&mut self, category: Category, item: impl Into<String>, reason: SkipReason) {
        let item = item.into();
        log::log!(
            reason.level(),
            "{} {}: {}",
            category,
            escape_log(&item),
            reason
        );
        self.skipped.push(SkippedItem {
            category,
            item,
            reason,
        });
    }

    pub fn merge(&mut self, other: ConversionReport) {
        self.converted += other.converted;
        self.created += other.created;
        self.skipped.extend(other.skipped);
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn skips_in(&self, category: Category) -> impl Iterator<Item = &SkippedItem> {
        self.skipped
            .iter()
            .filter(move |skip| skip.category == category)
    }
}

/// Run `step` over every item. Failures are recorded in `report` and the
/// loop moves on to the next item.
pub fn skip_and_continue<T, I, L, F>(
    category: Category,
    items: I,
    report: &mut ConversionReport,
    label: L,
    mut step: F,
) where
    I: IntoIterator<Item = T>,
    L: Fn(&T) -> String,
    F: FnMut(&T) -> Result<(), SkipReason>,
{
    for item in items {
        match step(&item) {
            Ok(()) => report.add_success(),
            Err(reason) => report.add_skip(category, label(&item), reason),
        }
    }
}
