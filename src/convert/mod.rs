//! Conversion passes.
//! - `index`: masked-id and editor-key lookups over target records
//! - `binder`: attaches compiled scripts to correlated records
//! - `augment`: extends package decision trees and data inputs
//! - `templates`, `placement`: records created by a run
//! - `pipeline`: runs all passes in order

pub mod augment;
pub mod binder;
pub mod compiler;
pub mod directives;
pub mod index;
pub mod pipeline;
pub mod placement;
pub mod report;
pub mod templates;

pub use augment::{augment, augment_with_report, AugmentMiss, Placement, ProcedureSpec, SlotSpec};
pub use binder::{bind, bind_appending, bind_category, BindError, BindTargets, ScriptCatalog};
pub use compiler::{BuildDirCompiler, CompileError, ScriptCompiler};
pub use index::RecordIndex;
pub use pipeline::{run_conversion, TargetRoles};
pub use report::{skip_and_continue, ConversionReport, SkipReason, SkippedItem};
