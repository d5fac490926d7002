//! Package template augmentation.
//!
//! [`augment`] clones a package, appends new data inputs, and splices new
//! procedure nodes into the flattened decision tree. Each new node is gated
//! by a condition on one of the new boolean inputs and takes one of the new
//! inputs as its location parameter.

use thiserror::Error;

use crate::records::{
    Condition, PackageRecord, ProcedureNode, SlotValue, LOCATION_NEAR_SELF,
};

/// Procedure after which at-location nodes are inserted.
pub const TRAVEL_PROCEDURE: &str = "Travel";

/// Radius used by the standard near-self location input.
pub const NEAR_SELF_RADIUS: u32 = 1000;

/// Node flags for procedures that run when the package completes.
pub const RUN_ON_END: u32 = 1;

/// One new data input: its value and the descriptor shown to authors.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpec {
    pub name: String,
    pub value: SlotValue,
}

impl SlotSpec {
    pub fn new(name: impl Into<String>, value: SlotValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Directly after the root branch.
    AtStart,
    /// Directly after the first top-level Travel procedure.
    AtLocation,
    /// After the last node.
    AtEnd,
}

/// One new procedure node. Slot positions index into the `SlotSpec` list
/// passed alongside, not into the package's table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureSpec {
    pub procedure: String,
    pub placement: Placement,
    pub gate_slot: usize,
    pub scope_slot: usize,
    pub flags: u32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AugmentMiss {
    #[error("no {anchor} procedure to place {procedure} after")]
    NoAnchor {
        procedure: String,
        anchor: &'static str,
    },

    #[error("tree has no root branch; {procedure} not inserted")]
    NoRootBranch { procedure: String },

    #[error("{procedure} refers to new slot {slot}, which was not supplied")]
    UnknownSlot { procedure: String, slot: usize },
}

/// Next scan position after `nodes[i]`: a branch is passed over together
/// with its `child_count` following entries.
pub fn scan_next(nodes: &[ProcedureNode], i: usize) -> usize {
    match nodes.get(i).and_then(ProcedureNode::child_count) {
        Some(children) => i + 1 + children as usize,
        None => i + 1,
    }
}

/// Index of the first top-level procedure named `name`, scanning from the
/// element after the root.
pub fn find_anchor(nodes: &[ProcedureNode], name: &str) -> Option<usize> {
    let mut i = 1;
    while i < nodes.len() {
        if nodes[i].is_procedure_named(name) {
            return Some(i);
        }
        i = scan_next(nodes, i);
    }
    None
}

/// Clone `template` and apply the extension. Structural misses are dropped
/// silently; use [`augment_with_report`] to see them.
pub fn augment(
    template: &PackageRecord,
    slots: &[SlotSpec],
    procedures: &[ProcedureSpec],
) -> PackageRecord {
    augment_with_report(template, slots, procedures).0
}

pub fn augment_with_report(
    template: &PackageRecord,
    slots: &[SlotSpec],
    procedures: &[ProcedureSpec],
) -> (PackageRecord, Vec<AugmentMiss>) {
    let mut package = template.clone();
    let mut misses = Vec::new();

    let assigned: Vec<u32> = slots
        .iter()
        .map(|spec| package.push_slot(spec.value.clone(), spec.name.clone()))
        .collect();

    for spec in procedures {
        let (Some(&gate), Some(&scope)) = (assigned.get(spec.gate_slot), assigned.get(spec.scope_slot))
        else {
            let slot = if spec.gate_slot >= assigned.len() {
                spec.gate_slot
            } else {
                spec.scope_slot
            };
            misses.push(AugmentMiss::UnknownSlot {
                procedure: spec.procedure.clone(),
                slot,
            });
            continue;
        };

        let position = match spec.placement {
            Placement::AtStart => 1,
            Placement::AtEnd => package.procedures.len(),
            Placement::AtLocation => match find_anchor(&package.procedures, TRAVEL_PROCEDURE) {
                Some(anchor) => anchor + 1,
                None => {
                    misses.push(AugmentMiss::NoAnchor {
                        procedure: spec.procedure.clone(),
                        anchor: TRAVEL_PROCEDURE,
                    });
                    continue;
                }
            },
        };

        let node = ProcedureNode::procedure(spec.procedure.clone())
            .with_flags(spec.flags)
            .with_slot_ref(scope)
            .with_condition(Condition::slot_is_true(gate));
        if !package.insert_top_level(position, node) {
            misses.push(AugmentMiss::NoRootBranch {
                procedure: spec.procedure.clone(),
            });
        }
    }

    (package, misses)
}

/// Inputs of the lock/unlock gating extension: six switches and the
/// location the doors are searched around.
pub fn lock_gating_slots() -> Vec<SlotSpec> {
    let switches = [
        "Lock at Start?",
        "Lock at Location?",
        "Lock at End?",
        "Unlock at Start?",
        "Unlock at Location?",
        "Unlock at End?",
    ];
    let mut slots: Vec<SlotSpec> = switches
        .iter()
        .map(|name| SlotSpec::new(*name, SlotValue::Bool(false)))
        .collect();
    slots.push(SlotSpec::new(
        "Near Self",
        SlotValue::Location {
            kind: LOCATION_NEAR_SELF,
            radius: NEAR_SELF_RADIUS,
        },
    ));
    slots
}

pub fn lock_gating_procedures() -> Vec<ProcedureSpec> {
    const SCOPE: usize = 6;
    let mut procedures = Vec::with_capacity(6);
    for (offset, procedure) in ["LockDoors", "UnlockDoors"].iter().enumerate() {
        let placements = [
            (Placement::AtStart, 0),
            (Placement::AtLocation, 0),
            (Placement::AtEnd, RUN_ON_END),
        ];
        for (step, (placement, flags)) in placements.into_iter().enumerate() {
            procedures.push(ProcedureSpec {
                procedure: procedure.to_string(),
                placement,
                gate_slot: offset * 3 + step,
                scope_slot: SCOPE,
                flags,
            });
        }
    }
    procedures
}
