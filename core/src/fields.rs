//! Field name → ordinal id, and ordinal id → boost weight.

use crate::error::{Result, SearchError};
use crate::index::FieldId;
use crate::persist::{decode_boost, decode_u32, Store, FIELD_SEQ_KEY};
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use sled::{Transactional, Tree};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_BOOST: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub id: FieldId,
    pub boost: f32,
}

#[derive(Clone)]
pub struct FieldRegistry {
    ids: Tree,
    boosts: Tree,
    meta: Tree,
}

fn decode_id(raw: &[u8]) -> Result<FieldId> {
    decode_u32(raw).ok_or_else(|| SearchError::corrupt("field_ids", "field id is not a u32"))
}

fn decode_sequence(raw: &[u8]) -> Result<FieldId> {
    decode_u32(raw).ok_or_else(|| SearchError::corrupt("meta", "field sequence is not a u32"))
}

impl FieldRegistry {
    pub fn new(store: &Store) -> Self {
        Self {
            ids: store.field_ids.clone(),
            boosts: store.field_boosts.clone(),
            meta: store.meta.clone(),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Option<FieldId>> {
        self.ids.get(name)?.map(|raw| decode_id(&raw)).transpose()
    }

    /// Returns the id for `name`, assigning the next ordinal if unseen. The
    /// lookup, the id and the default boost are committed in one transaction,
    /// so concurrent first uses agree on a single id.
    pub fn resolve_or_register(&self, name: &str) -> Result<FieldId> {
        if let Some(id) = self.resolve(name)? {
            return Ok(id);
        }
        let abort = |e: SearchError| ConflictableTransactionError::Abort(e);
        let (id, created) = (&self.ids, &self.boosts, &self.meta).transaction(
            |(ids, boosts, meta)| -> ConflictableTransactionResult<(FieldId, bool), SearchError> {
                if let Some(raw) = ids.get(name)? {
                    return Ok((decode_id(&raw).map_err(abort)?, false));
                }
                let next = match meta.get(FIELD_SEQ_KEY)? {
                    Some(raw) => decode_sequence(&raw).map_err(abort)?,
                    None => 0,
                };
                ids.insert(name, next.to_be_bytes().to_vec())?;
                boosts.insert(next.to_be_bytes().to_vec(), DEFAULT_BOOST.to_be_bytes().to_vec())?;
                meta.insert(FIELD_SEQ_KEY, (next + 1).to_be_bytes().to_vec())?;
                Ok((next, true))
            },
        )?;
        if created {
            debug!(field = name, id, "registered field");
        }
        Ok(id)
    }

    /// Overwrites the boost of each named field, registering unseen ones.
    /// Weights are validated up front so a bad entry changes nothing.
    pub fn set_boosts(&self, weights: &BTreeMap<String, f32>) -> Result<()> {
        if let Some((name, weight)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(SearchError::Validation(format!(
                "boost for field {name:?} must be a finite non-negative number, got {weight}"
            )));
        }
        for (name, weight) in weights {
            let id = self.resolve_or_register(name)?;
            self.boosts.insert(id.to_be_bytes(), weight.to_be_bytes().to_vec())?;
            debug!(field = %name, id, boost = weight, "set field boost");
        }
        Ok(())
    }

    pub fn boost_of(&self, id: FieldId) -> Result<f32> {
        match self.boosts.get(id.to_be_bytes())? {
            Some(raw) => decode_boost(&raw),
            None => Ok(DEFAULT_BOOST),
        }
    }

    /// Every registered field, ordered by id.
    pub fn list(&self) -> Result<Vec<FieldInfo>> {
        let mut fields = Vec::new();
        for entry in self.ids.iter() {
            let (name, raw) = entry?;
            let id = decode_id(&raw)?;
            fields.push(FieldInfo {
                name: String::from_utf8_lossy(&name).into_owned(),
                id,
                boost: self.boost_of(id)?,
            });
        }
        fields.sort_by_key(|f| f.id);
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FieldRegistry {
        FieldRegistry::new(&Store::temporary().unwrap())
    }

    #[test]
    fn ids_are_assigned_in_order_of_first_use() {
        let fields = registry();
        let ids: Vec<_> = ["title", "body", "title", "tags"]
            .iter()
            .map(|n| fields.resolve_or_register(n).unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 0, 2]);
        assert_eq!(fields.resolve("tags").unwrap(), Some(2));
        assert_eq!(fields.resolve("missing").unwrap(), None);
    }

    #[test]
    fn boosts_default_to_one() {
        let fields = registry();
        let id = fields.resolve_or_register("title").unwrap();
        assert_eq!(fields.boost_of(id).unwrap(), 1.0);
        assert_eq!(fields.boost_of(99).unwrap(), 1.0);
    }

    #[test]
    fn set_boosts_registers_and_overwrites() {
        let fields = registry();
        fields.resolve_or_register("title").unwrap();
        fields
            .set_boosts(&BTreeMap::from([("body".to_string(), 3.0)]))
            .unwrap();
        let body = fields.resolve("body").unwrap().unwrap();
        assert_eq!(body, 1);
        assert_eq!(fields.boost_of(body).unwrap(), 3.0);
        assert_eq!(fields.boost_of(0).unwrap(), 1.0);

        let listed = fields.list().unwrap();
        assert_eq!(listed.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(), vec!["title", "body"]);
    }

    #[test]
    fn invalid_boost_changes_nothing() {
        let fields = registry();
        let weights = BTreeMap::from([("a".to_string(), 2.0), ("b".to_string(), f32::NAN)]);
        assert!(matches!(fields.set_boosts(&weights), Err(SearchError::Validation(_))));
        assert_eq!(fields.resolve("a").unwrap(), None);
    }

    #[test]
    fn corrupt_sequence_is_reported_against_meta() {
        let store = Store::temporary().unwrap();
        store.meta.insert(FIELD_SEQ_KEY, &b"bad"[..]).unwrap();
        let fields = FieldRegistry::new(&store);
        match fields.resolve_or_register("title") {
            Err(SearchError::Corrupt { namespace, .. }) => assert_eq!(namespace, "meta"),
            other => panic!("expected corrupt meta, got {other:?}"),
        }
        assert_eq!(fields.resolve("title").unwrap(), None);
    }

    #[test]
    fn concurrent_registration_agrees() {
        let fields = registry();
        let names = ["title", "body", "tags", "author"];
        std::thread::scope(|s| {
            for _ in 0..8 {
                let fields = &fields;
                s.spawn(move || {
                    for name in names {
                        fields.resolve_or_register(name).unwrap();
                    }
                });
            }
        });
        let mut ids: Vec<_> = fields.list().unwrap().into_iter().map(|f| f.id).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
