//! In-memory record collection used during a conversion run.
//!
//! A [`Collection`] holds containers in load order. Each [`Container`] owns a
//! [`RecordPool`] per category; a record belongs to exactly one pool. Lookups
//! that span containers let the later container win, mirroring how the engine
//! applies overrides.

use std::collections::BTreeMap;

use crate::records::errors::StoreError;
use crate::records::types::{Category, FormId, Record, FIRST_OBJECT_ID, OBJECT_ID_MASK};

/// Position of a container inside its [`Collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub(crate) usize);

#[derive(Debug, Clone, Default)]
pub struct RecordPool {
    records: BTreeMap<FormId, Record>,
}

impl RecordPool {
    pub fn get(&self, id: FormId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: FormId) -> Option<&mut Record> {
        self.records.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.form_id, record)
    }
}

#[derive(Debug, Clone)]
pub struct Container {
    pub name: String,
    pub load_order: u8,
    pools: BTreeMap<Category, RecordPool>,
    next_object: u32,
}

impl Container {
    pub fn new(name: impl Into<String>, load_order: u8) -> Self {
        Self {
            name: name.into(),
            load_order,
            pools: BTreeMap::new(),
            next_object: FIRST_OBJECT_ID,
        }
    }

    /// Restore a container with a persisted id counter.
    pub(crate) fn with_next_object(mut self, next_object: u32) -> Self {
        self.next_object = self.next_object.max(next_object);
        self
    }

    pub fn next_object(&self) -> u32 {
        self.next_object
    }

    pub fn pool(&self, category: Category) -> Option<&RecordPool> {
        self.pools.get(&category)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.pools.values().flat_map(RecordPool::iter)
    }

    pub fn records_of(&self, category: Category) -> impl Iterator<Item = &Record> {
        self.pools.get(&category).into_iter().flat_map(RecordPool::iter)
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.pools.values_mut().flat_map(RecordPool::iter_mut)
    }

    pub fn get(&self, category: Category, id: FormId) -> Option<&Record> {
        self.pools.get(&category).and_then(|pool| pool.get(id))
    }

    pub fn get_mut(&mut self, category: Category, id: FormId) -> Option<&mut Record> {
        self.pools.get_mut(&category).and_then(|pool| pool.get_mut(id))
    }

    pub fn len(&self) -> usize {
        self.pools.values().map(RecordPool::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Place a record under its own form id, replacing any record already there.
    /// The id counter moves past records native to this container.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        if record.form_id.load_order() == self.load_order {
            let object = record.form_id.masked();
            if object >= self.next_object {
                self.next_object = object + 1;
            }
        }
        self.pools.entry(record.category).or_default().insert(record)
    }

    /// Next free id. Fails once the 24-bit object space is used up.
    fn allocate(&mut self) -> Result<FormId, StoreError> {
        if self.next_object > OBJECT_ID_MASK {
            return Err(StoreError::IdSpaceExhausted {
                container: self.name.clone(),
            });
        }
        let id = FormId::new(self.load_order, self.next_object);
        self.next_object += 1;
        Ok(id)
    }

    /// Mark every record of one category dirty. Returns how many were marked.
    pub fn mark_category_dirty(&mut self, category: Category) -> usize {
        let Some(pool) = self.pools.get_mut(&category) else {
            return 0;
        };
        let mut marked = 0;
        for record in pool.iter_mut() {
            record.mark_dirty();
            marked += 1;
        }
        marked
    }

    pub fn dirty_count(&self) -> usize {
        self.records().filter(|record| record.is_dirty()).count()
    }
}

/// All containers taking part in a run, in load order.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    containers: Vec<Container>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_container(&mut self, container: Container) -> ContainerId {
        self.containers.push(container);
        ContainerId(self.containers.len() - 1)
    }

    /// Look a container up by name (case-insensitive).
    pub fn find_container(&self, name: &str) -> Option<ContainerId> {
        self.containers
            .iter()
            .position(|container| container.name.eq_ignore_ascii_case(name))
            .map(ContainerId)
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(id.0)
    }

    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(id.0)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.containers.iter().flat_map(Container::records)
    }

    /// Records of the selected containers, in the order the ids are given.
    pub fn records_in<'a>(&'a self, ids: &'a [ContainerId]) -> impl Iterator<Item = &'a Record> {
        ids.iter()
            .filter_map(|id| self.containers.get(id.0))
            .flat_map(Container::records)
    }

    pub fn records_of(&self, category: Category) -> impl Iterator<Item = &Record> + '_ {
        self.containers
            .iter()
            .flat_map(move |container| container.records_of(category))
    }

    /// Winning version of a record: the last container that holds it.
    pub fn resolve(&self, category: Category, id: FormId) -> Option<&Record> {
        self.containers
            .iter()
            .rev()
            .find_map(|container| container.get(category, id))
    }

    fn slot_mut(&mut self, container: ContainerId) -> Result<&mut Container, StoreError> {
        self.containers
            .get_mut(container.0)
            .ok_or_else(|| StoreError::NotFound(format!("container #{}", container.0)))
    }

    /// Insert a new record with a fresh id from the container's namespace.
    pub fn add_record(&mut self, container: ContainerId, mut record: Record) -> Result<FormId, StoreError> {
        let target = self.slot_mut(container)?;
        let id = target.allocate()?;
        record.form_id = id;
        record.mark_dirty();
        target.insert(record);
        Ok(id)
    }

    /// Write a record into a container under its existing id (an override when
    /// the id belongs to another container).
    pub fn upsert(&mut self, container: ContainerId, mut record: Record) -> Result<(), StoreError> {
        let target = self.slot_mut(container)?;
        record.mark_dirty();
        target.insert(record);
        Ok(())
    }

    pub fn record_mut(
        &mut self,
        container: ContainerId,
        category: Category,
        id: FormId,
    ) -> Option<&mut Record> {
        self.containers
            .get_mut(container.0)
            .and_then(|target| target.get_mut(category, id))
    }

    pub fn mark_category_dirty(&mut self, container: ContainerId, category: Category) -> usize {
        self.containers
            .get_mut(container.0)
            .map_or(0, |target| target.mark_category_dirty(category))
    }
}
