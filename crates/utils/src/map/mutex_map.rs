/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::hash::{BuildHasher, Hash};

use ahash::RandomState;
use tokio::sync::{Mutex, MutexGuard};

/// Fixed set of async mutexes addressed by key hash. Distinct keys may
/// share a shard, in which case they are serialized together.
pub struct MutexMap<T: Default> {
    map: Box<[Mutex<T>]>,
    mask: u64,
    hasher: RandomState,
}

impl<T: Default> MutexMap<T> {
    pub fn with_capacity(size: usize) -> MutexMap<T> {
        let size = size.max(1).next_power_of_two();
        MutexMap {
            map: (0..size)
                .map(|_| T::default().into())
                .collect::<Vec<Mutex<T>>>()
                .into_boxed_slice(),
            mask: (size - 1) as u64,
            hasher: RandomState::new(),
        }
    }

    pub async fn lock_hash<U>(&self, key: U) -> MutexGuard<'_, T>
    where
        U: Hash,
    {
        self.map[self.shard(key)].lock().await
    }

    pub fn try_lock_hash<U>(&self, key: U) -> Option<MutexGuard<'_, T>>
    where
        U: Hash,
    {
        self.map[self.shard(key)].try_lock().ok()
    }

    pub fn shards(&self) -> usize {
        self.map.len()
    }

    fn shard<U: Hash>(&self, key: U) -> usize {
        (self.hasher.hash_one(key) & self.mask) as usize
    }
}
