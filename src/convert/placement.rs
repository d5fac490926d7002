//! Speak-as actor placement.
//!
//! Actors named by `ADD_SPEAK_AS_ACTOR` directives get one persistent placed
//! reference each, parked in a dedicated holding cell, so dialogue can be
//! spoken through them without them appearing in the world.

use std::collections::HashSet;

use log::info;

use crate::convert::compiler::CONVERTED_PREFIX;
use crate::convert::index::RecordIndex;
use crate::convert::report::{ConversionReport, SkipReason};
use crate::records::{
    normalize_key, ActorRefFields, CellFields, Category, Collection, ContainerId, FormId, Position,
    Record, RecordBody, StoreError,
};

pub const HOLDING_CELL_KEY: &str = "TES4SpeakAsHoldingCell";

/// Placed-reference flag keeping the reference loaded at all times.
pub const PERSISTENT_REF_FLAG: u32 = 0x400;

pub fn reference_key(actor: &str) -> String {
    format!("{}{}Ref", CONVERTED_PREFIX, actor)
}

/// Holding cell in the output container, created on first use.
fn holding_cell(
    target: &mut Collection,
    output: ContainerId,
    index: &mut RecordIndex,
    report: &mut ConversionReport,
) -> Result<FormId, StoreError> {
    if let Some(id) = index.find_by_key(HOLDING_CELL_KEY, Category::Cell) {
        if target.record_mut(output, Category::Cell, id).is_some() {
            return Ok(id);
        }
    }
    let cell = Record::new(FormId(0), Category::Cell, RecordBody::Cell(CellFields::default()))
        .with_key(HOLDING_CELL_KEY);
    let id = target.add_record(output, cell)?;
    index.insert_key(HOLDING_CELL_KEY, Category::Cell, id);
    report.add_created(1);
    info!("created holding cell {} as {}", HOLDING_CELL_KEY, id);
    Ok(id)
}

fn place_actor(
    target: &mut Collection,
    output: ContainerId,
    index: &mut RecordIndex,
    cell: FormId,
    actor: &str,
) -> Result<Result<FormId, SkipReason>, StoreError> {
    let ref_key = reference_key(actor);
    if index.find_by_key(&ref_key, Category::PlacedActor).is_some() {
        return Ok(Err(SkipReason::AlreadyPresent { key: ref_key }));
    }
    let Some(base) = index.find_by_key(&format!("{}{}", CONVERTED_PREFIX, actor), Category::Npc)
    else {
        return Ok(Err(SkipReason::DirectiveResolutionMiss {
            actor: actor.to_string(),
        }));
    };

    if let Some(cell_record) = target.record_mut(output, Category::Cell, cell) {
        if let Err(err) = cell_record.cell_mut() {
            return Ok(Err(err.into()));
        }
    }

    let placed = Record::new(
        FormId(0),
        Category::PlacedActor,
        RecordBody::ActorRef(ActorRefFields {
            base,
            cell,
            flags: PERSISTENT_REF_FLAG,
            position: Position::default(),
        }),
    )
    .with_key(ref_key.as_str());
    let id = target.add_record(output, placed)?;
    index.insert_key(&ref_key, Category::PlacedActor, id);

    if let Some(cell_record) = target.record_mut(output, Category::Cell, cell) {
        if let Ok(fields) = cell_record.cell_mut() {
            fields.placed.push(id);
        }
        cell_record.mark_dirty();
    }
    Ok(Ok(id))
}

/// Place one reference per distinct actor name. Names compare
/// case-insensitively; the first spelling is kept.
pub fn add_speak_as_actors(
    target: &mut Collection,
    output: ContainerId,
    index: &mut RecordIndex,
    actors: &[String],
) -> Result<ConversionReport, StoreError> {
    let mut report = ConversionReport::new();
    if actors.is_empty() {
        return Ok(report);
    }
    let cell = holding_cell(target, output, index, &mut report)?;

    let mut seen = HashSet::new();
    for actor in actors {
        if !seen.insert(normalize_key(actor)) {
            continue;
        }
        match place_actor(target, output, index, cell, actor)? {
            Ok(id) => {
                report.add_created(1);
                report.add_success();
                info!("placed speak-as actor {} as {}", actor, id);
            }
            Err(reason) => report.add_skip(Category::PlacedActor, actor.as_str(), reason),
        }
    }
    Ok(report)
}
