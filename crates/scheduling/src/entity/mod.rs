/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod participant;
pub mod property;

use ahash::AHashMap;
use calcard::icalendar::{ICalendarRecurrenceRule, ICalendarStatus, ICalendarTransparency};
use compact_str::CompactString;

pub use participant::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Event,
    Task,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstanceId {
    Main,
    Recurrence(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalDateTime {
    pub timestamp: i64,
    pub tz_id: Option<CompactString>,
    pub date_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum EventEnd {
    #[default]
    None,
    At(CalDateTime),
    Duration(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndKind {
    None,
    Date,
    Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecurrenceSet {
    pub rrules: Vec<ICalendarRecurrenceRule>,
    pub exrules: Vec<ICalendarRecurrenceRule>,
    pub rdates: Vec<CalDateTime>,
    pub exdates: Vec<CalDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PollVote {
    pub voter: Option<CalAddress>,
    pub response: u32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PollItem {
    pub id: u32,
    pub summary: Option<String>,
    pub start: Option<CalDateTime>,
    pub end: EventEnd,
    pub votes: Vec<PollVote>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PollInfo {
    pub status: Option<String>,
    pub winner: Option<u32>,
    pub items: Vec<PollItem>,
}

/// Properties shared by the master and its overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceData {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub status: Option<ICalendarStatus>,
    pub transparency: Option<ICalendarTransparency>,
    pub priority: Option<u32>,
    pub sequence: u32,
    pub dtstamp: Option<i64>,
    pub start: Option<CalDateTime>,
    pub end: EventEnd,
    pub due: Option<CalDateTime>,
    pub percent_complete: Option<u32>,
    pub completed: Option<i64>,
    pub categories: Vec<String>,
    pub comments: Vec<String>,
    pub resources: Vec<String>,
    pub attachments: Vec<String>,
    pub request_status: Vec<String>,
    pub scheduling: SchedulingInfo,
    pub poll: Option<PollInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Master {
    pub data: InstanceData,
    pub recurrence: RecurrenceSet,
    /// Present only to anchor overrides, has no occurrence of its own.
    pub suppressed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub recurrence_id: i64,
    pub data: InstanceData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntity {
    pub uid: String,
    pub entity_type: EntityType,
    pub collection_id: Option<u32>,
    pub document_id: Option<u32>,
    pub master: Master,
    pub overrides: AHashMap<i64, Override>,
}

/// A resolved view over one instance. Overrides fall back to the master
/// for values they do not carry themselves.
#[derive(Debug, Clone, Copy)]
pub enum Instance<'x> {
    Master(&'x Master),
    Override {
        item: &'x Override,
        master: &'x Master,
    },
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Event => "event",
            EntityType::Task => "task",
            EntityType::Poll => "poll",
        }
    }
}

impl CalDateTime {
    pub fn utc(timestamp: i64) -> Self {
        CalDateTime {
            timestamp,
            tz_id: None,
            date_only: false,
        }
    }

    pub fn date(timestamp: i64) -> Self {
        CalDateTime {
            timestamp,
            tz_id: None,
            date_only: true,
        }
    }

    /// Same zone and precision as `self`, at another point in time.
    pub fn with_timestamp(&self, timestamp: i64) -> Self {
        CalDateTime {
            timestamp,
            tz_id: self.tz_id.clone(),
            date_only: self.date_only,
        }
    }
}

impl EventEnd {
    pub fn kind(&self) -> EndKind {
        match self {
            EventEnd::None => EndKind::None,
            EventEnd::At(_) => EndKind::Date,
            EventEnd::Duration(_) => EndKind::Duration,
        }
    }

    /// Absolute end timestamp for an instance starting at `start`.
    pub fn resolve(&self, start: &CalDateTime) -> i64 {
        match self {
            EventEnd::At(end) => end.timestamp,
            EventEnd::Duration(duration) => start.timestamp + duration,
            EventEnd::None if start.date_only => start.timestamp + 86400,
            EventEnd::None => start.timestamp,
        }
    }
}

impl RecurrenceSet {
    pub fn is_recurring(&self) -> bool {
        !self.rrules.is_empty() || !self.rdates.is_empty()
    }

    pub fn is_excluded(&self, recurrence_id: i64) -> bool {
        self.exdates.iter().any(|dt| dt.timestamp == recurrence_id)
    }
}

impl InstanceData {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, Some(ICalendarStatus::Cancelled))
    }

    /// Start and end of this instance, using the due date for tasks
    /// without an explicit end.
    pub fn window(&self) -> Option<(i64, i64)> {
        match (&self.start, &self.due) {
            (Some(start), due) => {
                let end = match (&self.end, due) {
                    (EventEnd::None, Some(due)) => due.timestamp,
                    (end, _) => end.resolve(start),
                };
                Some((start.timestamp, end.max(start.timestamp)))
            }
            (None, Some(due)) => Some((due.timestamp, due.timestamp)),
            (None, None) => None,
        }
    }
}

impl Override {
    pub fn new(recurrence_id: i64) -> Self {
        Override {
            recurrence_id,
            data: InstanceData::default(),
        }
    }
}

impl CalendarEntity {
    pub fn new(uid: impl Into<String>, entity_type: EntityType) -> Self {
        CalendarEntity {
            uid: uid.into(),
            entity_type,
            collection_id: None,
            document_id: None,
            master: Master::default(),
            overrides: AHashMap::new(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.master.recurrence.is_recurring() || !self.overrides.is_empty()
    }

    pub fn instance(&self, id: InstanceId) -> Option<Instance<'_>> {
        match id {
            InstanceId::Main => Some(Instance::Master(&self.master)),
            InstanceId::Recurrence(recurrence_id) => {
                self.overrides
                    .get(&recurrence_id)
                    .map(|item| Instance::Override {
                        item,
                        master: &self.master,
                    })
            }
        }
    }

    /// Instances carried by this entity, master first unless suppressed,
    /// then overrides in recurrence order.
    pub fn instances(&self) -> impl Iterator<Item = Instance<'_>> {
        let mut overrides = self.overrides.values().collect::<Vec<_>>();
        overrides.sort_unstable_by_key(|item| item.recurrence_id);

        (!self.master.suppressed)
            .then_some(Instance::Master(&self.master))
            .into_iter()
            .chain(overrides.into_iter().map(|item| Instance::Override {
                item,
                master: &self.master,
            }))
    }

    pub fn data_mut(&mut self, id: InstanceId) -> Option<&mut InstanceData> {
        match id {
            InstanceId::Main => Some(&mut self.master.data),
            InstanceId::Recurrence(recurrence_id) => self
                .overrides
                .get_mut(&recurrence_id)
                .map(|item| &mut item.data),
        }
    }

    pub fn organizer(&self) -> Option<&SchedulingOwner> {
        self.instances()
            .find_map(|instance| instance.data().scheduling.owner.as_ref())
    }

    pub fn sequence(&self) -> u32 {
        self.instances()
            .map(|instance| instance.data().sequence)
            .max()
            .unwrap_or_default()
    }
}

impl<'x> Instance<'x> {
    pub fn id(&self) -> InstanceId {
        match *self {
            Instance::Master(_) => InstanceId::Main,
            Instance::Override { item, .. } => InstanceId::Recurrence(item.recurrence_id),
        }
    }

    pub fn data(&self) -> &'x InstanceData {
        match *self {
            Instance::Master(master) => &master.data,
            Instance::Override { item, .. } => &item.data,
        }
    }

    pub fn master(&self) -> &'x Master {
        match *self {
            Instance::Master(master) => master,
            Instance::Override { master, .. } => master,
        }
    }

    pub fn recurrence_id(&self) -> Option<i64> {
        match *self {
            Instance::Master(_) => None,
            Instance::Override { item, .. } => Some(item.recurrence_id),
        }
    }

    pub fn participant(&self, address: &CalAddress) -> Option<&'x Participant> {
        self.scheduling().find(address)
    }

    pub fn participant_any(&self, addresses: &[CalAddress]) -> Option<&'x Participant> {
        self.scheduling().find_any(addresses)
    }

    /// Participant set in effect for this instance.
    pub fn scheduling(&self) -> &'x SchedulingInfo {
        match *self {
            Instance::Override { item, master } if item.data.scheduling.is_empty() => {
                &master.data.scheduling
            }
            _ => &self.data().scheduling,
        }
    }

    pub fn status(&self) -> Option<&'x ICalendarStatus> {
        self.data()
            .status
            .as_ref()
            .or_else(|| self.master().data.status.as_ref())
    }

    pub fn transparency(&self) -> Option<&'x ICalendarTransparency> {
        self.data()
            .transparency
            .as_ref()
            .or_else(|| self.master().data.transparency.as_ref())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status(), Some(ICalendarStatus::Cancelled))
    }

    /// Occurrence window. An override without its own start is placed at
    /// its recurrence id with the master's duration.
    pub fn window(&self) -> Option<(i64, i64)> {
        match *self {
            Instance::Master(master) => master.data.window(),
            Instance::Override { item, master } => item.data.window().or_else(|| {
                let (start, end) = master.data.window()?;
                Some((item.recurrence_id, item.recurrence_id + (end - start)))
            }),
        }
    }
}
