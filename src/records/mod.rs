//! Record model and storage.
//! Typed game-data records shared by both formats, the in-memory collection
//! that owns them during a conversion run, and the Sled-backed store that
//! persists containers between runs.

pub mod errors;
pub mod package;
pub mod storage;
pub mod store;
pub mod types;

pub use errors::{PackageError, RecordError, StoreError};
pub use package::{
    AggregateCounters, Condition, DataSlotTable, NodeKind, PackageRecord, ProcedureNode,
    SlotDescriptor, SlotValue, LOCATION_NEAR_SELF, PACKAGE_DATA_BOOL_TRUE,
};
pub use storage::{export_container_json, import_container_json, ContainerDump, RecordStore};
pub use store::{Collection, Container, ContainerId, RecordPool};
pub use types::*;
