/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::fmt::Display;

use calcard::icalendar::{
    ICalendarParticipationRole, ICalendarParticipationStatus, ICalendarUserTypes,
};
use compact_str::{CompactString, format_compact};
use utils::cache::CacheItemWeight;

pub const SCHEDULE_STATUS_DELIVERED: &str = "1.2";
pub const SCHEDULE_STATUS_SUCCESS: &str = "2.0";
pub const SCHEDULE_STATUS_DELIVERY_FAILED: &str = "5.1";

/// Calendar user address, stored lowercase and without the `mailto:` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalAddress(CompactString);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticipantKind {
    #[default]
    Attendee,
    Voter,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Participant {
    pub address: CalAddress,
    pub name: Option<String>,
    pub kind: ParticipantKind,
    pub part_stat: ICalendarParticipationStatus,
    pub role: Option<ICalendarParticipationRole>,
    pub cu_type: Option<ICalendarUserTypes>,
    pub delegated_to: Vec<CalAddress>,
    pub delegated_from: Vec<CalAddress>,
    pub sent_by: Option<CalAddress>,
    pub expect_reply: bool,
    pub schedule_status: Option<CompactString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchedulingOwner {
    pub address: CalAddress,
    pub name: Option<String>,
    pub schedule_status: Option<CompactString>,
    pub dtstamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchedulingInfo {
    pub owner: Option<SchedulingOwner>,
    pub participants: Vec<Participant>,
}

impl CalAddress {
    pub fn parse(address: &str) -> Option<Self> {
        let address = address.trim();
        let address = address
            .get(..7)
            .filter(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
            .map_or(address, |_| &address[7..])
            .trim();

        if !address.is_empty() {
            Some(CalAddress(CompactString::from(address.to_lowercase())))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn to_uri(&self) -> CompactString {
        format_compact!("mailto:{}", self.0)
    }

    pub fn is_any_of(&self, addresses: &[CalAddress]) -> bool {
        addresses.contains(self)
    }
}

impl Display for CalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mailto:{}", self.0)
    }
}

impl CacheItemWeight for CalAddress {
    fn weight(&self) -> u64 {
        self.0.weight()
    }
}

impl Participant {
    pub fn new(address: CalAddress) -> Self {
        Participant {
            address,
            name: None,
            kind: ParticipantKind::Attendee,
            part_stat: ICalendarParticipationStatus::NeedsAction,
            role: None,
            cu_type: None,
            delegated_to: Vec::new(),
            delegated_from: Vec::new(),
            sent_by: None,
            expect_reply: true,
            schedule_status: None,
        }
    }

    pub fn voter(address: CalAddress) -> Self {
        Participant {
            kind: ParticipantKind::Voter,
            ..Participant::new(address)
        }
    }

    pub fn is_needs_action(&self) -> bool {
        self.part_stat == ICalendarParticipationStatus::NeedsAction
    }

    pub fn is_accepted(&self) -> bool {
        self.part_stat == ICalendarParticipationStatus::Accepted
    }

    /// Whether `other` carries a different response than this record.
    /// Delivery bookkeeping (schedule status) is not part of the response.
    pub fn response_differs(&self, other: &Participant) -> bool {
        self.part_stat != other.part_stat
            || self.role != other.role
            || self.delegated_to != other.delegated_to
            || self.delegated_from != other.delegated_from
            || self.expect_reply != other.expect_reply
            || self.sent_by != other.sent_by
    }
}

impl SchedulingOwner {
    pub fn new(address: CalAddress) -> Self {
        SchedulingOwner {
            address,
            name: None,
            schedule_status: None,
            dtstamp: None,
        }
    }
}

impl SchedulingInfo {
    pub fn find(&self, address: &CalAddress) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.address == address)
    }

    pub fn find_mut(&mut self, address: &CalAddress) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.address == address)
    }

    pub fn find_any(&self, addresses: &[CalAddress]) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.address.is_any_of(addresses))
    }

    pub fn find_any_mut(&mut self, addresses: &[CalAddress]) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.address.is_any_of(addresses))
    }

    pub fn is_owner(&self, addresses: &[CalAddress]) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.address.is_any_of(addresses))
    }

    pub fn owner_address(&self) -> Option<&CalAddress> {
        self.owner.as_ref().map(|owner| &owner.address)
    }

    /// Inserts the participant, replacing any record with the same address.
    pub fn upsert(&mut self, participant: Participant) {
        if let Some(existing) = self.find_mut(&participant.address) {
            *existing = participant;
        } else {
            self.participants.push(participant);
        }
    }

    /// Copies the owner and merges the participants of `other` into this set.
    /// Records present in both are replaced by the incoming version, local
    /// records missing from `other` are kept.
    pub fn merge_from(&mut self, other: &SchedulingInfo) {
        if other.owner.is_some() {
            self.owner = other.owner.clone();
        }
        for participant in &other.participants {
            self.upsert(participant.clone());
        }
    }

    pub fn clear(&mut self) {
        self.owner = None;
        self.participants.clear();
    }

    pub fn rebuild_from(&mut self, other: &SchedulingInfo) {
        self.clear();
        self.merge_from(other);
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.participants.is_empty()
    }
}
