/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::{sync::Arc, time::Duration};

use utils::cache::CacheWithTtl;

use crate::{
    backend::{DirectoryLookup, Principal},
    config::SchedulingConfig,
    entity::CalAddress,
};

/// Directory lookups shared by all processors, owned by the scheduler
/// instance rather than the process.
pub struct DirectoryCache {
    principals: CacheWithTtl<u32, Arc<Principal>>,
    addresses: CacheWithTtl<CalAddress, Option<u32>>,
    ttl: Duration,
}

impl DirectoryCache {
    pub fn new(config: &SchedulingConfig) -> Self {
        let size = config.directory_cache_size.max(1024);
        DirectoryCache {
            principals: CacheWithTtl::new((size / 256) as usize, size / 2),
            addresses: CacheWithTtl::new((size / 64) as usize, size / 2),
            ttl: config.directory_cache_ttl,
        }
    }

    pub async fn principal(
        &self,
        directory: &impl DirectoryLookup,
        account_id: u32,
    ) -> trc::Result<Option<Arc<Principal>>> {
        if let Some(principal) = self.principals.get(&account_id) {
            trc::event!(
                Directory(trc::DirectoryEvent::CacheHit),
                AccountId = account_id,
            );
            return Ok(Some(principal));
        }

        trc::event!(
            Directory(trc::DirectoryEvent::CacheMiss),
            AccountId = account_id,
        );
        match directory.principal(account_id).await? {
            Some(principal) => {
                let principal = Arc::new(principal);
                self.principals
                    .insert(account_id, principal.clone(), self.ttl);
                Ok(Some(principal))
            }
            None => {
                trc::event!(
                    Directory(trc::DirectoryEvent::PrincipalNotFound),
                    AccountId = account_id,
                );
                Ok(None)
            }
        }
    }

    pub async fn calendar_address_to_principal(
        &self,
        directory: &impl DirectoryLookup,
        address: &CalAddress,
    ) -> trc::Result<Option<u32>> {
        if let Some(account_id) = self.addresses.get(address) {
            return Ok(account_id);
        }

        let account_id = directory.calendar_address_to_principal(address).await?;
        self.addresses.insert(address.clone(), account_id, self.ttl);
        Ok(account_id)
    }

    pub async fn principal_to_calendar_address(
        &self,
        directory: &impl DirectoryLookup,
        account_id: u32,
    ) -> trc::Result<Option<CalAddress>> {
        self.principal(directory, account_id)
            .await
            .map(|principal| principal.and_then(|p| p.addresses.first().cloned()))
    }

    pub fn invalidate(&self, account_id: u32) {
        if let Some(principal) = self.principals.remove(&account_id) {
            for address in &principal.addresses {
                self.addresses.remove(address);
            }
        }
    }
}
