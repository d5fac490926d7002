//! Lookup tables over a record collection.
//!
//! Records in the two formats carry independently assigned ids whose top
//! byte differs, so correlation goes through the masked object id. The index
//! only hands back [`FormId`]s; callers resolve them against the collection
//! they already hold.

use std::collections::HashMap;

use crate::records::{normalize_key, Category, FormId, Record};

#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    by_masked: HashMap<(Category, u32), FormId>,
    by_template: HashMap<u32, FormId>,
    by_key: HashMap<(Category, String), FormId>,
}

impl RecordIndex {
    /// Index records in load order. On a masked-id or key clash the later
    /// record wins; for template references the first actor found wins.
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut index = Self::default();
        for record in records {
            index.add(record);
        }
        log::debug!(
            "indexed {} ids, {} keys, {} templates",
            index.by_masked.len(),
            index.by_key.len(),
            index.by_template.len()
        );
        index
    }

    fn add(&mut self, record: &Record) {
        self.by_masked
            .insert((record.category, record.masked_id()), record.form_id);
        if let Some(key) = &record.editor_key {
            self.by_key
                .insert((record.category, key.normalized()), record.form_id);
        }
        if record.category == Category::Npc {
            if let Ok(fields) = record.target() {
                if let Some(template) = fields.template {
                    self.by_template
                        .entry(template.masked())
                        .or_insert(record.form_id);
                }
            }
        }
    }

    /// Target record of `target_category` whose masked id equals the legacy record's.
    pub fn correlate(&self, legacy: &Record, target_category: Category) -> Option<FormId> {
        self.by_masked
            .get(&(target_category, legacy.masked_id()))
            .copied()
    }

    /// Actor generated from the leveled list with this id.
    pub fn correlate_by_template(&self, list: FormId) -> Option<FormId> {
        self.by_template.get(&list.masked()).copied()
    }

    /// Case-insensitive editor key lookup.
    pub fn find_by_key(&self, key: &str, category: Category) -> Option<FormId> {
        self.by_key.get(&(category, normalize_key(key))).copied()
    }

    /// Register a record created after the index was built.
    pub fn insert_key(&mut self, key: &str, category: Category, form_id: FormId) {
        self.by_key.insert((category, normalize_key(key)), form_id);
    }

    pub fn len(&self) -> usize {
        self.by_masked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_masked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LegacyFields, RecordBody, TargetFields};

    fn target(id: u32, category: Category) -> Record {
        Record::new(FormId(id), category, RecordBody::Target(TargetFields::default()))
    }

    #[test]
    fn correlates_on_low_bits_within_category() {
        let index = RecordIndex::build(&[
            target(0x0100_0ABC, Category::Door),
            target(0x0100_0ABD, Category::Container),
        ]);
        let legacy = Record::new(
            FormId(0x0000_0ABC),
            Category::Door,
            RecordBody::Legacy(LegacyFields::default()),
        );
        assert_eq!(index.correlate(&legacy, Category::Door), Some(FormId(0x0100_0ABC)));
        assert_eq!(index.correlate(&legacy, Category::Container), None);
    }

    #[test]
    fn later_record_wins_on_clash() {
        let index = RecordIndex::build(&[
            target(0x0100_0ABC, Category::Door).with_key("GateA"),
            target(0x0200_0ABC, Category::Door).with_key("GateA"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.find_by_key("gatea", Category::Door), Some(FormId(0x0200_0ABC)));
    }

    #[test]
    fn template_lookup_keeps_first_actor() {
        let mut first = target(0x0100_0010, Category::Npc);
        first.target_mut().expect("target").template = Some(FormId(0x0100_0500));
        let mut second = target(0x0100_0011, Category::Npc);
        second.target_mut().expect("target").template = Some(FormId(0x0200_0500));

        let index = RecordIndex::build(&[first, second]);
        assert_eq!(
            index.correlate_by_template(FormId(0x0000_0500)),
            Some(FormId(0x0100_0010))
        );
    }

    #[test]
    fn inserted_keys_are_found_case_insensitively() {
        let mut index = RecordIndex::default();
        assert!(index.is_empty());
        index.insert_key("TES4SpeakAsHoldingCell", Category::Cell, FormId(0x0300_0800));
        assert_eq!(
            index.find_by_key("tes4speakasholdingcell", Category::Cell),
            Some(FormId(0x0300_0800))
        );
        assert_eq!(index.find_by_key("tes4speakasholdingcell", Category::Npc), None);
    }
}
