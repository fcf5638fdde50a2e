use indexmap::IndexMap;
use parking_lot::RwLock;
use radiant_hashes::Hash;
use rand::Rng;
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

/// A bounded map shared between verifying threads. Once full, inserting evicts a random
/// entry.
#[derive(Clone)]
pub struct Cache<TKey: Clone + std::hash::Hash + Eq + Send + Sync, TData: Clone + Send + Sync, S = RandomState> {
    // IndexMap makes removing a random element cheap
    map: Arc<RwLock<IndexMap<TKey, TData, S>>>,
    size: usize,
}

impl<TKey: Clone + std::hash::Hash + Eq + Send + Sync, TData: Clone + Send + Sync, S: BuildHasher + Default> Cache<TKey, TData, S> {
    pub fn new(size: u64) -> Self {
        Self { map: Arc::new(RwLock::new(IndexMap::with_capacity_and_hasher(size as usize, S::default()))), size: size as usize }
    }

    pub fn get(&self, key: &TKey) -> Option<TData> {
        self.map.read().get(key).cloned()
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.size == 0 {
            return;
        }
        let mut write_guard = self.map.write();
        if write_guard.len() == self.size {
            write_guard.swap_remove_index(rand::thread_rng().gen_range(0..self.size));
        }
        write_guard.insert(key, data);
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identifies one signature verification: the raw signature (hash type byte stripped),
/// the serialized public key and the signed digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SigCacheKey {
    pub signature: Vec<u8>,
    pub pub_key: Vec<u8>,
    pub message: Hash,
}

/// Verification outcomes keyed by [`SigCacheKey`].
pub type SigCache = Cache<SigCacheKey, bool>;
