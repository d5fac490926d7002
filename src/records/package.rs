//! AI package records.
//!
//! A package carries its decision tree flattened into a list of
//! [`ProcedureNode`]s (a branch is followed by its children), the package
//! data inputs as three index-aligned columns in [`DataSlotTable`], one
//! [`SlotDescriptor`] per input, and two bookkeeping counters.
//!
//! Invariants kept by every mutator on [`PackageRecord`]:
//! - slot table columns, descriptor table and `counters.count` have equal length
//! - `counters.watermark` is one past the highest slot index
//! - the root branch's child count equals the number of top-level nodes

use serde::{Deserialize, Serialize};

use crate::records::errors::PackageError;

/// Condition function testing that a package data input of type Bool is true.
pub const PACKAGE_DATA_BOOL_TRUE: u16 = 612;

/// Location kind for "near package owner's current location".
pub const LOCATION_NEAR_SELF: u32 = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Number of direct children that follow this node in the flattened list.
    Branch { child_count: u32 },
    Procedure,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub function: u16,
    pub param: u32,
    pub comparison: f32,
}

impl Condition {
    /// `slot == true`
    pub fn slot_is_true(slot: u32) -> Self {
        Self {
            function: PACKAGE_DATA_BOOL_TRUE,
            param: slot,
            comparison: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcedureNode {
    pub kind: NodeKind,
    /// Branch type for branches ("Sequence", "Stack", ...), procedure type otherwise.
    pub name: String,
    pub flags: u32,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Data slots the procedure reads its parameters from.
    #[serde(default)]
    pub slot_refs: Vec<u32>,
}

impl ProcedureNode {
    pub fn branch(name: impl Into<String>, child_count: u32) -> Self {
        Self {
            kind: NodeKind::Branch { child_count },
            name: name.into(),
            flags: 0,
            conditions: Vec::new(),
            slot_refs: Vec::new(),
        }
    }

    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Procedure,
            name: name.into(),
            flags: 0,
            conditions: Vec::new(),
            slot_refs: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_slot_ref(mut self, slot: u32) -> Self {
        self.slot_refs.push(slot);
        self
    }

    pub fn is_procedure_named(&self, name: &str) -> bool {
        self.kind == NodeKind::Procedure && self.name == name
    }

    pub fn child_count(&self) -> Option<u32> {
        match self.kind {
            NodeKind::Branch { child_count } => Some(child_count),
            NodeKind::Procedure => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SlotValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Location { kind: u32, radius: u32 },
}

impl SlotValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SlotValue::Bool(_) => "Bool",
            SlotValue::Int(_) => "Int",
            SlotValue::Float(_) => "Float",
            SlotValue::Location { .. } => "Location",
        }
    }
}

/// Three parallel columns describing package data inputs. Only grows through
/// [`DataSlotTable::push`], which keeps the columns aligned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataSlotTable {
    indices: Vec<u32>,
    type_names: Vec<String>,
    values: Vec<SlotValue>,
}

impl DataSlotTable {
    pub fn push(&mut self, index: u32, value: SlotValue) {
        self.indices.push(index);
        self.type_names.push(value.type_name().to_string());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_aligned(&self) -> bool {
        self.indices.len() == self.type_names.len() && self.indices.len() == self.values.len()
    }

    pub fn max_index(&self) -> Option<u32> {
        self.indices.iter().copied().max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, &SlotValue)> {
        self.indices
            .iter()
            .zip(&self.type_names)
            .zip(&self.values)
            .map(|((index, type_name), value)| (*index, type_name.as_str(), value))
    }

    pub fn value_of(&self, index: u32) -> Option<&SlotValue> {
        self.indices
            .iter()
            .position(|i| *i == index)
            .and_then(|pos| self.values.get(pos))
    }
}

/// Display entry for one data slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotDescriptor {
    pub slot: u32,
    pub public: bool,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateCounters {
    /// Number of package data inputs.
    pub count: u32,
    /// One past the highest assigned slot index.
    pub watermark: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageRecord {
    pub procedures: Vec<ProcedureNode>,
    pub slots: DataSlotTable,
    pub descriptors: Vec<SlotDescriptor>,
    pub counters: AggregateCounters,
}

impl PackageRecord {
    /// Empty package whose tree is a single root branch.
    pub fn new(root_branch: impl Into<String>) -> Self {
        Self {
            procedures: vec![ProcedureNode::branch(root_branch, 0)],
            slots: DataSlotTable::default(),
            descriptors: Vec::new(),
            counters: AggregateCounters::default(),
        }
    }

    /// Append a data input at the watermark, with its descriptor. Returns the slot index.
    pub fn push_slot(&mut self, value: SlotValue, descriptor: impl Into<String>) -> u32 {
        let index = self.counters.watermark;
        self.slots.push(index, value);
        self.descriptors.push(SlotDescriptor {
            slot: index,
            public: true,
            name: descriptor.into(),
        });
        self.counters.count += 1;
        self.counters.watermark = index + 1;
        index
    }

    /// Append a node as a direct child of the root branch.
    pub fn push_top_level(&mut self, node: ProcedureNode) {
        let len = self.procedures.len();
        self.insert_top_level(len, node);
    }

    /// Insert a node at `position` and count it as a direct child of the root.
    /// Returns false (and inserts nothing) when the tree has no root branch.
    pub fn insert_top_level(&mut self, position: usize, node: ProcedureNode) -> bool {
        let Some(root) = self.procedures.first_mut() else {
            return false;
        };
        let NodeKind::Branch { child_count } = &mut root.kind else {
            return false;
        };
        *child_count += 1;
        let position = position.clamp(1, self.procedures.len());
        self.procedures.insert(position, node);
        true
    }

    pub fn root_child_count(&self) -> Option<u32> {
        self.procedures.first().and_then(ProcedureNode::child_count)
    }

    /// Number of direct children of the root found by walking the tree.
    pub fn top_level_count(&self) -> usize {
        let mut count = 0;
        let mut i = 1;
        while i < self.procedures.len() {
            count += 1;
            i += subtree_len(&self.procedures, i);
        }
        count
    }

    pub fn check_invariants(&self) -> Result<(), PackageError> {
        let slots = self.slots.len();
        let descriptors = self.descriptors.len();
        if !self.slots.is_aligned()
            || slots != descriptors
            || slots != self.counters.count as usize
        {
            return Err(PackageError::TableLengthMismatch {
                slots,
                descriptors,
                count: self.counters.count,
            });
        }

        let expected = self.slots.max_index().map_or(0, |max| max + 1);
        if self.counters.watermark != expected {
            return Err(PackageError::WatermarkMismatch {
                watermark: self.counters.watermark,
                expected,
            });
        }

        let declared = self.root_child_count().ok_or(PackageError::MissingRoot)?;
        let actual = self.top_level_count();
        if declared as usize != actual {
            return Err(PackageError::ChildCountMismatch { declared, actual });
        }
        Ok(())
    }
}

/// Number of list entries taken by the node at `start` and everything below it.
fn subtree_len(nodes: &[ProcedureNode], start: usize) -> usize {
    let mut len = 1;
    if let NodeKind::Branch { child_count } = nodes[start].kind {
        for _ in 0..child_count {
            if start + len >= nodes.len() {
                break;
            }
            len += subtree_len(nodes, start + len);
        }
    }
    len
}
