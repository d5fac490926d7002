//! # Formport - Game-Data Record Migration
//!
//! Formport migrates authored content records from a legacy game-data format
//! into the record set of its successor, carrying embedded behavior across:
//! attached scripts are rebound to the converted records, and AI package
//! templates gain lock/unlock gating procedures.
//!
//! ## Features
//!
//! - **Cross-format correlation**: records are matched on the low 24 bits of their form id,
//!   which survive the change of owning container.
//! - **Script binding**: legacy scripts are resolved, compiled into handles and bound to the
//!   converted records of thirteen categories, with folded legacy categories and leveled lists.
//! - **Package augmentation**: decision trees are extended while slot tables, descriptors and
//!   aggregate counters stay consistent.
//! - **Skip and continue**: a record that cannot be converted is logged and reported; the run goes on.
//! - **Persistence**: containers live in a Sled database and can be imported from or exported to JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formport::convert::{run_conversion, BuildDirCompiler, TargetRoles};
//! use formport::records::RecordStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = RecordStore::open("./data/records")?;
//!     let legacy = store.load_collection(&["Oblivion.esm"])?;
//!     let mut target = store.load_collection(&["Skyrim.esm", "Skyblivion.esm", "GECK.esp"])?;
//!     let roles = TargetRoles::find(&target, "Skyrim.esm", "Skyblivion.esm", "GECK.esp")?;
//!     let mut compiler = BuildDirCompiler::new("./build/scripts");
//!
//!     let report = run_conversion(&legacy, &mut target, &roles, &mut compiler, &[])?;
//!     println!("{} converted, {} skipped", report.converted, report.skipped.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`records`] - Record model, in-memory collection and Sled-backed store
//! - [`convert`] - Index, binder, augmenter and the conversion pipeline
//! - [`config`] - Configuration management and validation
//! - [`logutil`] - Log setup and escaping of authored strings

pub mod config;
pub mod convert;
pub mod logutil;
pub mod records;
