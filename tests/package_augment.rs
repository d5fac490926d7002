//! Integration tests for package tree augmentation.

use formport::convert::augment::{lock_gating_procedures, lock_gating_slots, NEAR_SELF_RADIUS, RUN_ON_END};
use formport::convert::{augment, augment_with_report, AugmentMiss, Placement, ProcedureSpec, SlotSpec};
use formport::records::{
    Condition, PackageRecord, ProcedureNode, SlotValue, LOCATION_NEAR_SELF, PACKAGE_DATA_BOOL_TRUE,
};

fn names(package: &PackageRecord) -> Vec<&str> {
    package.procedures.iter().map(|node| node.name.as_str()).collect()
}

/// Sequence with a nested Travel inside a Stack, then a top-level Travel,
/// and two existing data inputs.
fn nested_template() -> PackageRecord {
    let mut package = PackageRecord::new("Sequence");
    package.push_slot(SlotValue::Location { kind: 1, radius: 500 }, "Place to Travel");
    package.push_slot(SlotValue::Int(2), "Hours");
    package.push_top_level(ProcedureNode::branch("Stack", 2));
    package.procedures.push(ProcedureNode::procedure("Travel"));
    package.procedures.push(ProcedureNode::procedure("Sit"));
    package.push_top_level(ProcedureNode::procedure("Travel"));
    package
}

#[test]
fn lock_extension_skips_nested_travel_and_continues_slot_numbering() {
    let template = nested_template();
    template.check_invariants().expect("template is consistent");

    let package = augment(&template, &lock_gating_slots(), &lock_gating_procedures());

    assert_eq!(
        names(&package),
        vec![
            "Sequence",
            "UnlockDoors",
            "LockDoors",
            "Stack",
            "Travel",
            "Sit",
            "Travel",
            "UnlockDoors",
            "LockDoors",
            "LockDoors",
            "UnlockDoors",
        ]
    );
    assert_eq!(package.root_child_count(), Some(8));
    package.check_invariants().expect("augmented package is consistent");

    // new inputs start at the old watermark
    assert_eq!(package.counters.count, 9);
    assert_eq!(package.counters.watermark, 9);
    assert_eq!(
        package.slots.value_of(8),
        Some(&SlotValue::Location {
            kind: LOCATION_NEAR_SELF,
            radius: NEAR_SELF_RADIUS
        })
    );
    assert_eq!(package.descriptors[2].name, "Lock at Start?");
    assert_eq!(package.descriptors[8].name, "Near Self");

    let gate = |at: usize| package.procedures[at].conditions[0].param;
    assert_eq!(gate(2), 2, "lock at start");
    assert_eq!(gate(8), 3, "lock at location");
    assert_eq!(gate(9), 4, "lock at end");
    assert_eq!(gate(1), 5, "unlock at start");
    assert_eq!(gate(7), 6, "unlock at location");
    assert_eq!(gate(10), 7, "unlock at end");
    for at in [1, 2, 7, 8, 9, 10] {
        let node = &package.procedures[at];
        assert_eq!(node.slot_refs, vec![8]);
        assert_eq!(node.conditions[0].function, PACKAGE_DATA_BOOL_TRUE);
    }
    assert_eq!(package.procedures[9].flags, RUN_ON_END);
    assert_eq!(package.procedures[10].flags, RUN_ON_END);
    assert_eq!(package.procedures[1].flags, 0);

    // the template itself is left alone
    assert_eq!(template.procedures.len(), 5);
    assert_eq!(template.counters.watermark, 2);
}

#[test]
fn missing_travel_drops_location_nodes_only() {
    let mut template = PackageRecord::new("Sequence");
    template.push_top_level(ProcedureNode::procedure("Eat"));

    let (package, misses) =
        augment_with_report(&template, &lock_gating_slots(), &lock_gating_procedures());

    assert_eq!(
        misses,
        vec![
            AugmentMiss::NoAnchor {
                procedure: "LockDoors".to_string(),
                anchor: "Travel"
            },
            AugmentMiss::NoAnchor {
                procedure: "UnlockDoors".to_string(),
                anchor: "Travel"
            },
        ]
    );
    assert_eq!(
        names(&package),
        vec!["Sequence", "UnlockDoors", "LockDoors", "Eat", "LockDoors", "UnlockDoors"]
    );
    // slots are added even for the dropped nodes
    assert_eq!(package.counters.count, 7);
    package.check_invariants().expect("consistent");
}

#[test]
fn tree_without_root_branch_gets_slots_but_no_nodes() {
    let template = PackageRecord {
        procedures: vec![ProcedureNode::procedure("Travel")],
        ..PackageRecord::new("unused")
    };

    let (package, misses) =
        augment_with_report(&template, &lock_gating_slots(), &lock_gating_procedures());

    assert_eq!(package.procedures, template.procedures);
    assert_eq!(package.counters.count, 7);
    let no_root = misses
        .iter()
        .filter(|miss| matches!(miss, AugmentMiss::NoRootBranch { .. }))
        .count();
    let no_anchor = misses
        .iter()
        .filter(|miss| matches!(miss, AugmentMiss::NoAnchor { .. }))
        .count();
    assert_eq!((no_root, no_anchor), (4, 2));
}

#[test]
fn custom_extension_places_single_gated_node() {
    let template = nested_template();
    let slots = vec![
        SlotSpec::new("Whistle?", SlotValue::Bool(true)),
        SlotSpec::new("Volume", SlotValue::Float(0.5)),
    ];
    let procedures = vec![ProcedureSpec {
        procedure: "Whistle".to_string(),
        placement: Placement::AtLocation,
        gate_slot: 0,
        scope_slot: 1,
        flags: 0,
    }];

    let package = augment(&template, &slots, &procedures);

    let whistle = &package.procedures[5];
    assert_eq!(whistle.name, "Whistle");
    assert_eq!(package.procedures[4].name, "Travel");
    assert_eq!(whistle.conditions, vec![Condition::slot_is_true(2)]);
    assert_eq!(whistle.slot_refs, vec![3]);
    assert_eq!(package.slots.value_of(3), Some(&SlotValue::Float(0.5)));
    let types: Vec<_> = package.slots.iter().map(|(_, type_name, _)| type_name).collect();
    assert_eq!(types, vec!["Location", "Int", "Bool", "Float"]);
    package.check_invariants().expect("consistent");
}

#[test]
fn augmented_package_survives_json() {
    let package = augment(&nested_template(), &lock_gating_slots(), &lock_gating_procedures());
    let json = serde_json::to_string(&package).expect("serialize");
    let back: PackageRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, package);
    back.check_invariants().expect("consistent after reload");
}
