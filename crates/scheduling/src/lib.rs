/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod autorespond;
pub mod backend;
pub mod cache;
pub mod changes;
pub mod config;
pub mod entity;
pub mod itip;
pub mod recurrence;

use backend::{Principal, SchedulingBackend};
use cache::DirectoryCache;
use config::{SchedulingConfig, SchedulingPreferences};
use itip::{attendee::AttendeeUpdateProcessor, inbox::InboxRouter};
use recurrence::RecurrenceReconciler;
use tokio::sync::MutexGuard;
use utils::map::mutex_map::MutexMap;

/// Scheduling engine for one host process. Holds the collaborators, the
/// directory cache and the per-entity locks shared by all processors.
pub struct Scheduler<B: SchedulingBackend> {
    pub backend: B,
    pub config: SchedulingConfig,
    pub directory: DirectoryCache,
    locks: MutexMap<()>,
}

impl<B: SchedulingBackend> Scheduler<B> {
    pub fn new(backend: B, config: SchedulingConfig) -> Self {
        Scheduler {
            directory: DirectoryCache::new(&config),
            locks: MutexMap::with_capacity(config.lock_shards),
            backend,
            config,
        }
    }

    pub fn router(&self) -> InboxRouter<'_, B> {
        InboxRouter::new(self)
    }

    pub fn attendee_updates(&self) -> AttendeeUpdateProcessor<'_, B> {
        AttendeeUpdateProcessor::new(self)
    }

    /// Serializes every read-modify-write cycle on the copy of `uid` owned
    /// by `account_id`.
    pub async fn lock_entity(&self, account_id: u32, uid: &str) -> MutexGuard<'_, ()> {
        self.locks.lock_hash((account_id, uid)).await
    }

    pub fn preferences(&self, principal: &Principal) -> SchedulingPreferences {
        principal.preferences.unwrap_or(self.config.defaults)
    }

    pub fn reconciler(&self) -> RecurrenceReconciler<'_, B> {
        RecurrenceReconciler::new(
            &self.backend,
            self.config.max_years,
            self.config.max_instances,
        )
    }
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
