//! In-memory KV engine.
//!
//! An ordered map behind a read-write lock, with the key-structure
//! generation counter the scan-invalidation contract requires. This is
//! the test engine; a production deployment plugs a durable engine into
//! the same traits.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use grove_common::constants::{MAX_KEY_SIZE, MAX_VALUE_SIZE};
use grove_common::error::{GroveError, GroveResult};
use grove_common::types::{Key, Value};

use super::{KeyRange, KvEngine, KvIterator, KvTransaction};

/// An in-memory ordered KV engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    entries: RwLock<BTreeMap<Key, Value>>,
    key_generation: AtomicU64,
}

impl MemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_sizes(key: &Key, value: &Value) -> GroveResult<()> {
        if key.len() > MAX_KEY_SIZE {
            return Err(GroveError::KeyTooLarge {
                size: key.len(),
                max_size: MAX_KEY_SIZE,
            });
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(GroveError::ValueTooLarge {
                size: value.len(),
                max_size: MAX_VALUE_SIZE,
            });
        }
        Ok(())
    }

    fn bump_generation(&self) {
        self.key_generation.fetch_add(1, Ordering::SeqCst);
    }
}

// BTreeMap::range panics on inverted bounds; an inverted range is simply
// empty to callers of this engine.
fn bounds_ordered(start: &Bound<Key>, end: &Bound<Key>) -> bool {
    let (Bound::Included(s) | Bound::Excluded(s)) = start else {
        return true;
    };
    let (Bound::Included(e) | Bound::Excluded(e)) = end else {
        return true;
    };
    match s.cmp(e) {
        CmpOrdering::Less => true,
        CmpOrdering::Greater => false,
        CmpOrdering::Equal => {
            !(matches!(start, Bound::Excluded(_)) && matches!(end, Bound::Excluded(_)))
        }
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &Key) -> GroveResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: Key, value: Value) -> GroveResult<()> {
        Self::check_sizes(&key, &value)?;
        let inserted = self.entries.write().insert(key, value).is_none();
        if inserted {
            self.bump_generation();
        }
        Ok(())
    }

    fn delete(&self, key: &Key) -> GroveResult<bool> {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.bump_generation();
        }
        Ok(removed)
    }

    fn delete_range(&self, range: &KeyRange) -> GroveResult<u64> {
        if !bounds_ordered(&range.start, &range.end) {
            return Ok(0);
        }
        let mut entries = self.entries.write();
        let doomed: Vec<Key> = entries
            .range((range.start.clone(), range.end.clone()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.remove(key);
        }
        if !doomed.is_empty() {
            self.bump_generation();
        }
        Ok(doomed.len() as u64)
    }

    fn iter<'a>(&'a self, range: KeyRange) -> GroveResult<Box<dyn KvIterator + 'a>> {
        Ok(Box::new(MemoryIterator {
            engine: self,
            range,
            last: None,
        }))
    }

    fn begin<'a>(&'a self) -> Box<dyn KvTransaction + 'a> {
        Box::new(MemoryTransaction {
            engine: self,
            writes: Vec::new(),
        })
    }

    fn key_generation(&self) -> u64 {
        self.key_generation.load(Ordering::SeqCst)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Iterator that re-seeks past its last delivered key on every step, so
/// it never holds the engine lock between calls.
struct MemoryIterator<'a> {
    engine: &'a MemoryEngine,
    range: KeyRange,
    last: Option<Key>,
}

impl KvIterator for MemoryIterator<'_> {
    fn next(&mut self) -> GroveResult<Option<(Key, Value)>> {
        let start = match &self.last {
            Some(key) => Bound::Excluded(key.clone()),
            None => self.range.start.clone(),
        };
        if !bounds_ordered(&start, &self.range.end) {
            return Ok(None);
        }
        let entries = self.engine.entries.read();
        let next = entries
            .range((start, self.range.end.clone()))
            .next()
            .map(|(key, value)| (key.clone(), value.clone()));
        if let Some((key, _)) = &next {
            self.last = Some(key.clone());
        }
        Ok(next)
    }
}

/// Buffered transaction applied atomically under one write lock.
struct MemoryTransaction<'a> {
    engine: &'a MemoryEngine,
    writes: Vec<(Key, Option<Value>)>,
}

impl KvTransaction for MemoryTransaction<'_> {
    fn put(&mut self, key: Key, value: Value) {
        self.writes.push((key, Some(value)));
    }

    fn delete(&mut self, key: Key) {
        self.writes.push((key, None));
    }

    fn commit(self: Box<Self>) -> GroveResult<()> {
        for (key, value) in &self.writes {
            if let Some(value) = value {
                MemoryEngine::check_sizes(key, value)?;
            }
        }
        let mut entries = self.engine.entries.write();
        let mut structure_changed = false;
        for (key, value) in self.writes {
            match value {
                Some(value) => {
                    if entries.insert(key, value).is_none() {
                        structure_changed = true;
                    }
                }
                None => {
                    if entries.remove(&key).is_some() {
                        structure_changed = true;
                    }
                }
            }
        }
        if structure_changed {
            self.engine.bump_generation();
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Key {
        Key::from_vec(vec![byte])
    }

    fn value(byte: u8) -> Value {
        Value::from_vec(vec![byte])
    }

    #[test]
    fn test_put_get_delete() {
        let engine = MemoryEngine::new();
        engine.put(key(1), value(10)).unwrap();

        assert_eq!(engine.get(&key(1)).unwrap(), Some(value(10)));
        assert_eq!(engine.len(), 1);

        assert!(engine.delete(&key(1)).unwrap());
        assert!(!engine.delete(&key(1)).unwrap());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_generation_tracks_key_structure_only() {
        let engine = MemoryEngine::new();
        let before = engine.key_generation();

        engine.put(key(1), value(10)).unwrap();
        let after_insert = engine.key_generation();
        assert!(after_insert > before);

        // overwriting the same key changes no key structure
        engine.put(key(1), value(11)).unwrap();
        assert_eq!(engine.key_generation(), after_insert);

        engine.delete(&key(1)).unwrap();
        assert!(engine.key_generation() > after_insert);
    }

    #[test]
    fn test_iterator_order_and_bounds() {
        let engine = MemoryEngine::new();
        for byte in [4u8, 1, 3, 2, 9] {
            engine.put(key(byte), value(byte)).unwrap();
        }

        let mut iter = engine
            .iter(KeyRange::new(key(2), key(9)))
            .unwrap();
        let mut seen = Vec::new();
        while let Some((k, _)) = iter.next().unwrap() {
            seen.push(k.as_bytes()[0]);
        }
        assert_eq!(seen, vec![2, 3, 4]);
    }

    #[test]
    fn test_delete_range() {
        let engine = MemoryEngine::new();
        for byte in 0..10u8 {
            engine.put(key(byte), value(byte)).unwrap();
        }

        let removed = engine
            .delete_range(&KeyRange::new(key(3), key(7)))
            .unwrap();
        assert_eq!(removed, 4);
        assert_eq!(engine.len(), 6);
        assert!(engine.get(&key(3)).unwrap().is_none());
        assert!(engine.get(&key(7)).unwrap().is_some());
    }

    #[test]
    fn test_transaction_commit_is_atomic() {
        let engine = MemoryEngine::new();
        engine.put(key(1), value(1)).unwrap();

        let before = engine.key_generation();
        let mut txn = engine.begin();
        txn.put(key(2), value(2));
        txn.put(key(3), value(3));
        txn.delete(key(1));
        txn.commit().unwrap();

        assert_eq!(engine.len(), 2);
        assert!(engine.get(&key(1)).unwrap().is_none());
        // one structural bump for the whole transaction
        assert_eq!(engine.key_generation(), before + 1);
    }

    #[test]
    fn test_transaction_rollback_discards() {
        let engine = MemoryEngine::new();
        let mut txn = engine.begin();
        txn.put(key(2), value(2));
        txn.rollback();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_oversized_key_rejected() {
        let engine = MemoryEngine::new();
        let huge = Key::from_vec(vec![0; MAX_KEY_SIZE + 1]);
        let err = engine.put(huge, value(0)).unwrap_err();
        assert!(matches!(err, GroveError::KeyTooLarge { .. }));
    }
}
