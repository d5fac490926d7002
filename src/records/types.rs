use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::errors::RecordError;
use crate::records::package::PackageRecord;

pub const RECORD_SCHEMA_VERSION: u8 = 1;

/// Low 24 bits of a form id: the part that survives a change of owning container.
pub const OBJECT_ID_MASK: u32 = 0x00FF_FFFF;

/// First object id handed out for new records in a container. Lower ids are
/// reserved by the engine.
pub const FIRST_OBJECT_ID: u32 = 0x800;

/// 32-bit record identifier. The top byte is the owning container's load-order
/// index, the low 24 bits identify the record inside that container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct FormId(pub u32);

impl FormId {
    pub fn new(load_order: u8, object_id: u32) -> Self {
        Self((u32::from(load_order) << 24) | (object_id & OBJECT_ID_MASK))
    }

    /// Id with the container byte stripped, used to correlate records across formats.
    pub fn masked(self) -> u32 {
        self.0 & OBJECT_ID_MASK
    }

    pub fn load_order(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Human-readable record name. Compared case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct EditorKey(String);

impl EditorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used as a lookup key.
    pub fn normalized(&self) -> String {
        normalize_key(&self.0)
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for EditorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Record category tag. Both formats share the four-letter codes; some codes
/// exist only in one of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "ACTI")]
    Activator,
    #[serde(rename = "CONT")]
    Container,
    #[serde(rename = "DOOR")]
    Door,
    #[serde(rename = "NPC_")]
    Npc,
    #[serde(rename = "WEAP")]
    Weapon,
    #[serde(rename = "ARMO")]
    Armor,
    #[serde(rename = "BOOK")]
    Book,
    #[serde(rename = "INGR")]
    Ingredient,
    #[serde(rename = "KEYM")]
    Key,
    #[serde(rename = "MISC")]
    Misc,
    #[serde(rename = "FLOR")]
    Flora,
    #[serde(rename = "FURN")]
    Furniture,
    #[serde(rename = "LIGH")]
    Light,
    /// Legacy only; folded into NPC_.
    #[serde(rename = "CREA")]
    Creature,
    /// Legacy leveled creature list.
    #[serde(rename = "LVLC")]
    LeveledCreature,
    /// Target leveled actor list.
    #[serde(rename = "LVLN")]
    LeveledNpc,
    /// Legacy only; folded into ARMO.
    #[serde(rename = "CLOT")]
    Clothing,
    /// Legacy only; folded into MISC.
    #[serde(rename = "SGST")]
    SigilStone,
    #[serde(rename = "SCPT")]
    Script,
    #[serde(rename = "PACK")]
    Package,
    #[serde(rename = "CELL")]
    Cell,
    #[serde(rename = "ACHR")]
    PlacedActor,
}

/// Target categories whose records carry a behavior slot, in conversion order.
pub const BOUND_CATEGORIES: [Category; 13] = [
    Category::Activator,
    Category::Container,
    Category::Door,
    Category::Npc,
    Category::Weapon,
    Category::Armor,
    Category::Book,
    Category::Ingredient,
    Category::Key,
    Category::Misc,
    Category::Flora,
    Category::Furniture,
    Category::Light,
];

impl Category {
    pub fn code(self) -> &'static str {
        match self {
            Category::Activator => "ACTI",
            Category::Container => "CONT",
            Category::Door => "DOOR",
            Category::Npc => "NPC_",
            Category::Weapon => "WEAP",
            Category::Armor => "ARMO",
            Category::Book => "BOOK",
            Category::Ingredient => "INGR",
            Category::Key => "KEYM",
            Category::Misc => "MISC",
            Category::Flora => "FLOR",
            Category::Furniture => "FURN",
            Category::Light => "LIGH",
            Category::Creature => "CREA",
            Category::LeveledCreature => "LVLC",
            Category::LeveledNpc => "LVLN",
            Category::Clothing => "CLOT",
            Category::SigilStone => "SGST",
            Category::Script => "SCPT",
            Category::Package => "PACK",
            Category::Cell => "CELL",
            Category::PlacedActor => "ACHR",
        }
    }

    pub fn supports_behavior(self) -> bool {
        BOUND_CATEGORIES.contains(&self)
    }

    /// Legacy categories whose records are converted into this target category.
    pub fn legacy_sources(self) -> &'static [Category] {
        match self {
            Category::Npc => &[Category::Npc, Category::Creature, Category::LeveledCreature],
            Category::Armor => &[Category::Armor, Category::Clothing],
            Category::Misc => &[Category::Misc, Category::SigilStone],
            Category::Activator => &[Category::Activator],
            Category::Container => &[Category::Container],
            Category::Door => &[Category::Door],
            Category::Weapon => &[Category::Weapon],
            Category::Book => &[Category::Book],
            Category::Ingredient => &[Category::Ingredient],
            Category::Key => &[Category::Key],
            Category::Flora => &[Category::Flora],
            Category::Furniture => &[Category::Furniture],
            Category::Light => &[Category::Light],
            _ => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Converted, target-format executable script attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptHandle {
    pub name: String,
    /// Legacy script the handle was compiled from.
    pub source: FormId,
}

impl ScriptHandle {
    pub fn new(name: impl Into<String>, source: FormId) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Script handles attached to a record's behavior slot. Never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BehaviorBinding {
    scripts: Vec<ScriptHandle>,
}

impl BehaviorBinding {
    pub fn single(handle: ScriptHandle) -> Self {
        Self {
            scripts: vec![handle],
        }
    }

    pub fn push(&mut self, handle: ScriptHandle) {
        self.scripts.push(handle);
    }

    pub fn handles(&self) -> &[ScriptHandle] {
        &self.scripts
    }
}

/// Legacy-format object: at most one attached source script.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LegacyFields {
    pub script: Option<FormId>,
}

/// Target-format object with a behavior slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetFields {
    pub behavior: Option<BehaviorBinding>,
    /// Leveled list this actor is generated from (NPC_ only).
    #[serde(default)]
    pub template: Option<FormId>,
}

/// Legacy source script as stored in the legacy set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceScript {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CellFields {
    /// Placed references living in this cell.
    pub placed: Vec<FormId>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rot_x: f32,
    pub rot_y: f32,
    pub rot_z: f32,
}

/// Placed instance of an actor base record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorRefFields {
    pub base: FormId,
    pub cell: FormId,
    pub flags: u32,
    pub position: Position,
}

/// Category-specific payload. The variant is the discriminant checked by the
/// accessors on [`Record`]; the category tag alone does not decide it because
/// both formats reuse most codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RecordBody {
    Legacy(LegacyFields),
    Target(TargetFields),
    Script(SourceScript),
    Package(PackageRecord),
    Cell(CellFields),
    ActorRef(ActorRefFields),
    /// Records whose fields the converter never touches.
    Plain,
}

impl RecordBody {
    pub fn kind_name(&self) -> &'static str {
        match self {
            RecordBody::Legacy(_) => "legacy",
            RecordBody::Target(_) => "target",
            RecordBody::Script(_) => "script",
            RecordBody::Package(_) => "package",
            RecordBody::Cell(_) => "cell",
            RecordBody::ActorRef(_) => "actor_ref",
            RecordBody::Plain => "plain",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    pub form_id: FormId,
    #[serde(default)]
    pub editor_key: Option<EditorKey>,
    pub category: Category,
    pub body: RecordBody,
    /// Set when the record must be written back by the store.
    #[serde(skip)]
    dirty: bool,
}

fn default_schema_version() -> u8 {
    RECORD_SCHEMA_VERSION
}

impl Record {
    pub fn new(form_id: FormId, category: Category, body: RecordBody) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            form_id,
            editor_key: None,
            category,
            body,
            dirty: false,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.editor_key = Some(EditorKey::new(key));
        self
    }

    pub fn masked_id(&self) -> u32 {
        self.form_id.masked()
    }

    /// Editor key for log lines; falls back to the form id.
    pub fn label(&self) -> String {
        match &self.editor_key {
            Some(key) => key.to_string(),
            None => self.form_id.to_string(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn mismatch(&self, expected: &'static str) -> RecordError {
        RecordError::BodyMismatch {
            form_id: self.form_id,
            category: self.category,
            expected,
            found: self.body.kind_name(),
        }
    }

    pub fn legacy(&self) -> Result<&LegacyFields, RecordError> {
        match &self.body {
            RecordBody::Legacy(fields) => Ok(fields),
            _ => Err(self.mismatch("legacy")),
        }
    }

    pub fn target(&self) -> Result<&TargetFields, RecordError> {
        match &self.body {
            RecordBody::Target(fields) => Ok(fields),
            _ => Err(self.mismatch("target")),
        }
    }

    pub fn target_mut(&mut self) -> Result<&mut TargetFields, RecordError> {
        let err = self.mismatch("target");
        match &mut self.body {
            RecordBody::Target(fields) => Ok(fields),
            _ => Err(err),
        }
    }

    pub fn script(&self) -> Result<&SourceScript, RecordError> {
        match &self.body {
            RecordBody::Script(script) => Ok(script),
            _ => Err(self.mismatch("script")),
        }
    }

    pub fn package(&self) -> Result<&PackageRecord, RecordError> {
        match &self.body {
            RecordBody::Package(package) => Ok(package),
            _ => Err(self.mismatch("package")),
        }
    }

    pub fn cell_mut(&mut self) -> Result<&mut CellFields, RecordError> {
        let err = self.mismatch("cell");
        match &mut self.body {
            RecordBody::Cell(cell) => Ok(cell),
            _ => Err(err),
        }
    }

    pub fn actor_ref(&self) -> Result<&ActorRefFields, RecordError> {
        match &self.body {
            RecordBody::ActorRef(fields) => Ok(fields),
            _ => Err(self.mismatch("actor_ref")),
        }
    }
}
