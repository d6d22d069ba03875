/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::future::Future;

use utils::cache::CacheItemWeight;

use crate::{
    config::SchedulingPreferences,
    entity::{CalAddress, CalendarEntity, EntityType},
    itip::ItipMessage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: u32,
    pub name: Option<String>,
    pub addresses: Vec<CalAddress>,
    pub preferences: Option<SchedulingPreferences>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusyType {
    Free,
    Busy,
    BusyUnavailable,
    BusyTentative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyPeriod {
    pub busy_type: BusyType,
    pub start: i64,
    pub end: i64,
}

/// One expanded occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub recurrence_id: i64,
    pub start: i64,
    pub end: i64,
}

pub trait CalendarStore: Sync + Send {
    fn find_stored_meeting(
        &self,
        principal: &Principal,
        uid: &str,
    ) -> impl Future<Output = trc::Result<Option<CalendarEntity>>> + Send;

    fn default_collection(
        &self,
        principal: &Principal,
        entity_type: EntityType,
    ) -> impl Future<Output = trc::Result<Option<u32>>> + Send;

    /// Stores a new entity, returning its document id.
    fn create_entity(
        &self,
        principal: &Principal,
        collection_id: u32,
        entity: &CalendarEntity,
    ) -> impl Future<Output = trc::Result<u32>> + Send;

    fn update_entity(
        &self,
        principal: &Principal,
        entity: &CalendarEntity,
        suppress_notifications: bool,
        on_behalf_of: Option<&CalAddress>,
    ) -> impl Future<Output = trc::Result<()>> + Send;

    fn delete_entity(
        &self,
        principal: &Principal,
        entity: &CalendarEntity,
        force: bool,
    ) -> impl Future<Output = trc::Result<()>> + Send;

    fn delete_inbox_entry(
        &self,
        principal: &Principal,
        message_id: u32,
    ) -> impl Future<Output = trc::Result<()>> + Send;

    fn mark_inbox_processed(
        &self,
        principal: &Principal,
        message_id: u32,
    ) -> impl Future<Output = trc::Result<()>> + Send;
}

pub trait FreeBusyLookup: Sync + Send {
    fn query_free_busy(
        &self,
        principal: &Principal,
        start: i64,
        end: i64,
        organizer: Option<&CalAddress>,
        uid: &str,
        exclude_uid: bool,
    ) -> impl Future<Output = trc::Result<Vec<BusyPeriod>>> + Send;
}

pub trait RecurrenceExpansion: Sync + Send {
    /// Occurrences of `entity` starting within `[from, to)`, limited to
    /// `max_years` past the first occurrence and `max_instances` items.
    fn expand(
        &self,
        entity: &CalendarEntity,
        max_years: u32,
        max_instances: usize,
        from: i64,
        to: i64,
    ) -> impl Future<Output = trc::Result<Vec<Recurrence>>> + Send;
}

pub trait DirectoryLookup: Sync + Send {
    fn principal(
        &self,
        account_id: u32,
    ) -> impl Future<Output = trc::Result<Option<Principal>>> + Send;

    fn calendar_address_to_principal(
        &self,
        address: &CalAddress,
    ) -> impl Future<Output = trc::Result<Option<u32>>> + Send;
}

pub trait ItipTransport: Sync + Send {
    fn send(&self, message: &ItipMessage) -> impl Future<Output = trc::Result<()>> + Send;
}

pub trait SchedulingBackend:
    CalendarStore + FreeBusyLookup + RecurrenceExpansion + DirectoryLookup + ItipTransport
{
}

impl<T> SchedulingBackend for T where
    T: CalendarStore + FreeBusyLookup + RecurrenceExpansion + DirectoryLookup + ItipTransport
{
}

impl BusyType {
    pub fn is_free(&self) -> bool {
        matches!(self, BusyType::Free)
    }
}

impl Principal {
    pub fn is_self(&self, address: &CalAddress) -> bool {
        self.addresses.contains(address)
    }
}

impl CacheItemWeight for Principal {
    fn weight(&self) -> u64 {
        (std::mem::size_of::<Principal>()
            + self.name.as_ref().map_or(0, |name| name.len())
            + self
                .addresses
                .iter()
                .map(|address| address.as_str().len() + std::mem::size_of::<CalAddress>())
                .sum::<usize>()) as u64
    }
}
