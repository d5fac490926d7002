use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sled::IVec;

use crate::records::errors::StoreError;
use crate::records::store::{Collection, Container};
use crate::records::types::{Category, FormId, Record, RECORD_SCHEMA_VERSION};

const TREE_PREFIX: &str = "container:";
const META_KEY: &[u8] = b"meta";
const RECORD_PREFIX: &[u8] = b"records:";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContainerMeta {
    schema_version: u8,
    load_order: u8,
    next_object: u32,
}

/// Sled-backed persistence for record containers. One tree per container.
pub struct RecordStore {
    db: sled::Db,
}

impl RecordStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        Ok(Self { db })
    }

    fn tree_name(container: &str) -> String {
        format!("{}{}", TREE_PREFIX, container.to_ascii_lowercase())
    }

    fn record_key(category: Category, form_id: FormId) -> Vec<u8> {
        format!("records:{}:{}", category.code(), form_id).into_bytes()
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Names of all stored containers (lower-cased).
    pub fn list_containers(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for raw in self.db.tree_names() {
            let text = String::from_utf8_lossy(&raw);
            if let Some(name) = text.strip_prefix(TREE_PREFIX) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let tree_name = Self::tree_name(name);
        Ok(self
            .db
            .tree_names()
            .iter()
            .any(|raw| raw.as_ref() == tree_name.as_bytes()))
    }

    /// Load one container with all of its records. Loaded records are clean.
    pub fn load_container(&self, name: &str) -> Result<Container, StoreError> {
        if !self.contains(name)? {
            return Err(StoreError::NotFound(format!("container: {}", name)));
        }
        let tree = self.db.open_tree(Self::tree_name(name))?;
        let Some(bytes) = tree.get(META_KEY)? else {
            return Err(StoreError::NotFound(format!("container metadata: {}", name)));
        };
        let meta: ContainerMeta = Self::deserialize(bytes)?;
        if meta.schema_version != RECORD_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "container",
                expected: RECORD_SCHEMA_VERSION,
                found: meta.schema_version,
            });
        }

        let mut container = Container::new(name, meta.load_order).with_next_object(meta.next_object);
        for entry in tree.scan_prefix(RECORD_PREFIX) {
            let (_, bytes) = entry?;
            let record: Record = Self::deserialize(bytes)?;
            if record.schema_version != RECORD_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    entity: "record",
                    expected: RECORD_SCHEMA_VERSION,
                    found: record.schema_version,
                });
            }
            container.insert(record);
        }
        log::debug!("loaded container {} ({} records)", name, container.len());
        Ok(container)
    }

    /// Load several containers into one collection, in the given order.
    pub fn load_collection<S: AsRef<str>>(&self, names: &[S]) -> Result<Collection, StoreError> {
        let mut collection = Collection::new();
        for name in names {
            collection.add_container(self.load_container(name.as_ref())?);
        }
        Ok(collection)
    }

    /// Persist dirty records of a container and clear their flags. Returns the
    /// number of records written.
    pub fn save_container(&self, container: &mut Container) -> Result<usize, StoreError> {
        let tree = self.db.open_tree(Self::tree_name(&container.name))?;
        let meta = ContainerMeta {
            schema_version: RECORD_SCHEMA_VERSION,
            load_order: container.load_order,
            next_object: container.next_object(),
        };
        tree.insert(META_KEY, Self::serialize(&meta)?)?;

        let mut written = 0;
        for record in container.records_mut().filter(|record| record.is_dirty()) {
            record.schema_version = RECORD_SCHEMA_VERSION;
            let key = Self::record_key(record.category, record.form_id);
            tree.insert(key, Self::serialize(&*record)?)?;
            record.clear_dirty();
            written += 1;
        }
        tree.flush()?;
        log::debug!("saved container {} ({} records written)", container.name, written);
        Ok(written)
    }

    /// Remove a container and all of its records.
    pub fn drop_container(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.db.drop_tree(Self::tree_name(name))?)
    }
}

/// JSON form of a container, used to bring records in and out of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDump {
    pub name: String,
    pub load_order: u8,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl ContainerDump {
    pub fn from_container(container: &Container) -> Self {
        Self {
            name: container.name.clone(),
            load_order: container.load_order,
            records: container.records().cloned().collect(),
        }
    }

    /// Build a container whose records are all dirty, ready for a first save.
    pub fn into_container(self) -> Container {
        let mut container = Container::new(self.name, self.load_order);
        for mut record in self.records {
            record.mark_dirty();
            container.insert(record);
        }
        container
    }
}

/// Read a container dump written by [`export_container_json`] or by hand.
pub fn import_container_json<P: AsRef<Path>>(path: P) -> Result<Container, StoreError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let dump: ContainerDump = serde_json::from_str(&contents)?;
    log::info!(
        "read {} records for container {} from {}",
        dump.records.len(),
        dump.name,
        path.display()
    );
    Ok(dump.into_container())
}

pub fn export_container_json<P: AsRef<Path>>(container: &Container, path: P) -> Result<(), StoreError> {
    let dump = ContainerDump::from_container(container);
    let json = serde_json::to_string_pretty(&dump)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::types::{LegacyFields, RecordBody};
    use tempfile::TempDir;

    fn scripted(id: u32, script: u32) -> Record {
        Record::new(
            FormId(id),
            Category::Door,
            RecordBody::Legacy(LegacyFields {
                script: Some(FormId(script)),
            }),
        )
        .with_key("GateDoor")
    }

    #[test]
    fn save_writes_only_dirty_records() {
        let dir = TempDir::new().expect("tempdir");
        let store = RecordStore::open(dir.path()).expect("store");

        let mut container = Container::new("Legacy.esm", 0);
        let mut first = scripted(0x0000_1000, 0x0000_2000);
        first.mark_dirty();
        container.insert(first);
        container.insert(scripted(0x0000_1001, 0x0000_2000));

        assert_eq!(store.save_container(&mut container).expect("save"), 1);
        assert_eq!(container.dirty_count(), 0);
        assert_eq!(store.save_container(&mut container).expect("save"), 0);

        let loaded = store.load_container("Legacy.esm").expect("load");
        assert_eq!(loaded.len(), 1);
        let record = loaded
            .get(Category::Door, FormId(0x0000_1000))
            .expect("record");
        assert_eq!(record.legacy().expect("legacy").script, Some(FormId(0x0000_2000)));
        assert!(!record.is_dirty());
    }

    #[test]
    fn missing_container_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = RecordStore::open(dir.path()).expect("store");
        assert!(matches!(
            store.load_container("nowhere.esp"),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list_containers().expect("list").is_empty());
    }

    #[test]
    fn json_dump_imports_as_dirty() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("legacy.json");
        let mut container = Container::new("Legacy.esm", 0);
        container.insert(scripted(0x0000_1000, 0x0000_2000));
        export_container_json(&container, &path).expect("export");

        let imported = import_container_json(&path).expect("import");
        assert_eq!(imported.name, "Legacy.esm");
        assert_eq!(imported.dirty_count(), 1);
    }
}
