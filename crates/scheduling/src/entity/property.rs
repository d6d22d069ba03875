/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::{ICalendarRecurrenceRule, ICalendarStatus, ICalendarTransparency};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Summary,
    Description,
    Location,
    Url,
    Status,
    Transparency,
    Priority,
    Sequence,
    Dtstamp,
    Start,
    End,
    EndType,
    Due,
    PercentComplete,
    Completed,
    Categories,
    Comments,
    Resources,
    Attachments,
    RequestStatus,
    Organizer,
    Participants,
    Rrule,
    Exrule,
    Rdate,
    Exdate,
    PollStatus,
    PollWinner,
    PollItems,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(Option<String>),
    TextList(Vec<String>),
    Integer(Option<i64>),
    DateTime(Option<CalDateTime>),
    DateTimeList(Vec<CalDateTime>),
    End(EventEnd),
    EndKind(EndKind),
    Status(Option<ICalendarStatus>),
    Transparency(Option<ICalendarTransparency>),
    Rules(Vec<ICalendarRecurrenceRule>),
    Owner(Option<SchedulingOwner>),
    Participants(Vec<Participant>),
    PollItems(Vec<PollItem>),
}

/// One element of a multi-valued property, as reported in a change entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeItem {
    Text(String),
    DateTime(CalDateTime),
    Rule(ICalendarRecurrenceRule),
    Address(CalAddress),
    PollItem(u32),
}

/// Read/write access to the tracked properties of an instance. `get`
/// returns `None` for properties the instance cannot carry.
pub trait Tracked {
    fn get(&self, property: Property) -> Option<PropertyValue>;
    fn set(&mut self, property: Property, value: PropertyValue);
}

impl Property {
    pub const ALL: [Property; 29] = [
        Property::Summary,
        Property::Description,
        Property::Location,
        Property::Url,
        Property::Status,
        Property::Transparency,
        Property::Priority,
        Property::Sequence,
        Property::Dtstamp,
        Property::Start,
        Property::End,
        Property::EndType,
        Property::Due,
        Property::PercentComplete,
        Property::Completed,
        Property::Categories,
        Property::Comments,
        Property::Resources,
        Property::Attachments,
        Property::RequestStatus,
        Property::Organizer,
        Property::Participants,
        Property::Rrule,
        Property::Exrule,
        Property::Rdate,
        Property::Exdate,
        Property::PollStatus,
        Property::PollWinner,
        Property::PollItems,
    ];

    pub fn applies_to(&self, entity_type: EntityType) -> bool {
        match self {
            Property::Due | Property::PercentComplete | Property::Completed => {
                entity_type == EntityType::Task
            }
            Property::Transparency => entity_type != EntityType::Task,
            Property::PollStatus | Property::PollWinner | Property::PollItems => {
                entity_type == EntityType::Poll
            }
            _ => true,
        }
    }

    /// Bookkeeping properties that never require notifying anyone.
    pub fn is_cosmetic(&self) -> bool {
        matches!(
            self,
            Property::Sequence | Property::Dtstamp | Property::RequestStatus
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Summary => "SUMMARY",
            Property::Description => "DESCRIPTION",
            Property::Location => "LOCATION",
            Property::Url => "URL",
            Property::Status => "STATUS",
            Property::Transparency => "TRANSP",
            Property::Priority => "PRIORITY",
            Property::Sequence => "SEQUENCE",
            Property::Dtstamp => "DTSTAMP",
            Property::Start => "DTSTART",
            Property::End => "DTEND",
            Property::EndType => "X-END-TYPE",
            Property::Due => "DUE",
            Property::PercentComplete => "PERCENT-COMPLETE",
            Property::Completed => "COMPLETED",
            Property::Categories => "CATEGORIES",
            Property::Comments => "COMMENT",
            Property::Resources => "RESOURCES",
            Property::Attachments => "ATTACH",
            Property::RequestStatus => "REQUEST-STATUS",
            Property::Organizer => "ORGANIZER",
            Property::Participants => "ATTENDEE",
            Property::Rrule => "RRULE",
            Property::Exrule => "EXRULE",
            Property::Rdate => "RDATE",
            Property::Exdate => "EXDATE",
            Property::PollStatus => "POLL-COMPLETION",
            Property::PollWinner => "POLL-WINNER",
            Property::PollItems => "VOTER",
        }
    }
}

impl PropertyValue {
    /// Elements of a multi-valued property, `None` for single values.
    pub fn items(&self) -> Option<Vec<ChangeItem>> {
        match self {
            PropertyValue::TextList(values) => {
                Some(values.iter().cloned().map(ChangeItem::Text).collect())
            }
            PropertyValue::DateTimeList(values) => {
                Some(values.iter().cloned().map(ChangeItem::DateTime).collect())
            }
            PropertyValue::Rules(values) => {
                Some(values.iter().cloned().map(ChangeItem::Rule).collect())
            }
            PropertyValue::Participants(values) => Some(
                values
                    .iter()
                    .map(|p| ChangeItem::Address(p.address.clone()))
                    .collect(),
            ),
            PropertyValue::PollItems(values) => {
                Some(values.iter().map(|item| ChangeItem::PollItem(item.id)).collect())
            }
            _ => None,
        }
    }
}

impl Tracked for InstanceData {
    fn get(&self, property: Property) -> Option<PropertyValue> {
        Some(match property {
            Property::Summary => PropertyValue::Text(self.summary.clone()),
            Property::Description => PropertyValue::Text(self.description.clone()),
            Property::Location => PropertyValue::Text(self.location.clone()),
            Property::Url => PropertyValue::Text(self.url.clone()),
            Property::Status => PropertyValue::Status(self.status.clone()),
            Property::Transparency => PropertyValue::Transparency(self.transparency.clone()),
            Property::Priority => PropertyValue::Integer(self.priority.map(i64::from)),
            Property::Sequence => PropertyValue::Integer(Some(self.sequence.into())),
            Property::Dtstamp => PropertyValue::Integer(self.dtstamp),
            Property::Start => PropertyValue::DateTime(self.start.clone()),
            Property::End => PropertyValue::End(self.end.clone()),
            Property::EndType => PropertyValue::EndKind(self.end.kind()),
            Property::Due => PropertyValue::DateTime(self.due.clone()),
            Property::PercentComplete => {
                PropertyValue::Integer(self.percent_complete.map(i64::from))
            }
            Property::Completed => PropertyValue::Integer(self.completed),
            Property::Categories => PropertyValue::TextList(self.categories.clone()),
            Property::Comments => PropertyValue::TextList(self.comments.clone()),
            Property::Resources => PropertyValue::TextList(self.resources.clone()),
            Property::Attachments => PropertyValue::TextList(self.attachments.clone()),
            Property::RequestStatus => PropertyValue::TextList(self.request_status.clone()),
            Property::Organizer => PropertyValue::Owner(self.scheduling.owner.clone()),
            Property::Participants => {
                PropertyValue::Participants(self.scheduling.participants.clone())
            }
            Property::PollStatus => {
                PropertyValue::Text(self.poll.as_ref().and_then(|poll| poll.status.clone()))
            }
            Property::PollWinner => PropertyValue::Integer(
                self.poll
                    .as_ref()
                    .and_then(|poll| poll.winner)
                    .map(i64::from),
            ),
            Property::PollItems => PropertyValue::PollItems(
                self.poll
                    .as_ref()
                    .map(|poll| poll.items.clone())
                    .unwrap_or_default(),
            ),
            Property::Rrule | Property::Exrule | Property::Rdate | Property::Exdate => {
                return None;
            }
        })
    }

    fn set(&mut self, property: Property, value: PropertyValue) {
        match (property, value) {
            (Property::Summary, PropertyValue::Text(value)) => self.summary = value,
            (Property::Description, PropertyValue::Text(value)) => self.description = value,
            (Property::Location, PropertyValue::Text(value)) => self.location = value,
            (Property::Url, PropertyValue::Text(value)) => self.url = value,
            (Property::Status, PropertyValue::Status(value)) => self.status = value,
            (Property::Transparency, PropertyValue::Transparency(value)) => {
                self.transparency = value
            }
            (Property::Priority, PropertyValue::Integer(value)) => {
                self.priority = value.and_then(|v| u32::try_from(v).ok())
            }
            (Property::Sequence, PropertyValue::Integer(value)) => {
                self.sequence = value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
            }
            (Property::Dtstamp, PropertyValue::Integer(value)) => self.dtstamp = value,
            (Property::Start, PropertyValue::DateTime(value)) => self.start = value,
            (Property::End, PropertyValue::End(value)) => self.end = value,
            (Property::Due, PropertyValue::DateTime(value)) => self.due = value,
            (Property::PercentComplete, PropertyValue::Integer(value)) => {
                self.percent_complete = value.and_then(|v| u32::try_from(v).ok())
            }
            (Property::Completed, PropertyValue::Integer(value)) => self.completed = value,
            (Property::Categories, PropertyValue::TextList(value)) => self.categories = value,
            (Property::Comments, PropertyValue::TextList(value)) => self.comments = value,
            (Property::Resources, PropertyValue::TextList(value)) => self.resources = value,
            (Property::Attachments, PropertyValue::TextList(value)) => self.attachments = value,
            (Property::RequestStatus, PropertyValue::TextList(value)) => {
                self.request_status = value
            }
            (Property::Organizer, PropertyValue::Owner(value)) => self.scheduling.owner = value,
            (Property::Participants, PropertyValue::Participants(value)) => {
                self.scheduling.participants = value
            }
            (Property::PollStatus, PropertyValue::Text(value)) => {
                self.poll.get_or_insert_with(Default::default).status = value
            }
            (Property::PollWinner, PropertyValue::Integer(value)) => {
                self.poll.get_or_insert_with(Default::default).winner =
                    value.and_then(|v| u32::try_from(v).ok())
            }
            (Property::PollItems, PropertyValue::PollItems(value)) => {
                self.poll.get_or_insert_with(Default::default).items = value
            }
            // The end kind follows from the end value itself.
            _ => {}
        }
    }
}

impl Tracked for Master {
    fn get(&self, property: Property) -> Option<PropertyValue> {
        match property {
            Property::Rrule => Some(PropertyValue::Rules(self.recurrence.rrules.clone())),
            Property::Exrule => Some(PropertyValue::Rules(self.recurrence.exrules.clone())),
            Property::Rdate => Some(PropertyValue::DateTimeList(
                self.recurrence.rdates.clone(),
            )),
            Property::Exdate => Some(PropertyValue::DateTimeList(
                self.recurrence.exdates.clone(),
            )),
            property => self.data.get(property),
        }
    }

    fn set(&mut self, property: Property, value: PropertyValue) {
        match (property, value) {
            (Property::Rrule, PropertyValue::Rules(value)) => self.recurrence.rrules = value,
            (Property::Exrule, PropertyValue::Rules(value)) => self.recurrence.exrules = value,
            (Property::Rdate, PropertyValue::DateTimeList(value)) => {
                self.recurrence.rdates = value
            }
            (Property::Exdate, PropertyValue::DateTimeList(value)) => {
                self.recurrence.exdates = value
            }
            (property, value) => self.data.set(property, value),
        }
    }
}

impl Tracked for Override {
    fn get(&self, property: Property) -> Option<PropertyValue> {
        self.data.get(property)
    }

    fn set(&mut self, property: Property, value: PropertyValue) {
        self.data.set(property, value);
    }
}
