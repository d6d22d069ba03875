/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::{fmt::Display, future::Future};

use crate::{
    backend::Principal,
    entity::{CalAddress, CalendarEntity, EntityType},
};

pub mod attendee;
pub mod cancel;
pub mod counter;
pub mod export;
pub mod inbox;
pub mod poll_status;
pub mod reply;
pub mod request;
pub mod refresh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulingMethod {
    Request,
    Reply,
    Cancel,
    Refresh,
    Counter,
    DeclineCounter,
    Add,
    PollStatus,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItipError {
    MissingOriginator,
    ExpectOneAttendee,
    UnknownAttendee(CalAddress),
    NotParticipant,
    NotOrganizer,
    UnsupportedMethod {
        method: SchedulingMethod,
        entity_type: EntityType,
    },
    NoDefaultCollection(EntityType),
    MissingUid,
    MissingStart,
    EventNotFound,
    NothingToSend,
}

#[derive(Debug)]
pub enum ItipIngestError {
    Message(ItipError),
    Internal(trc::Error),
}

/// An outbound scheduling message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItipMessage {
    pub method: SchedulingMethod,
    pub from: CalAddress,
    pub from_organizer: bool,
    pub to: Vec<CalAddress>,
    pub entity: CalendarEntity,
}

/// A scheduling message delivered to a principal's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    pub id: u32,
    pub account_id: u32,
    pub method: SchedulingMethod,
    pub originator: Option<CalAddress>,
    pub recipients: Vec<CalAddress>,
    pub entity: CalendarEntity,
}

/// Mutation a processor wants committed. Nothing is persisted by the
/// processors themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntityChange {
    #[default]
    None,
    Create {
        collection_id: u32,
        entity: Box<CalendarEntity>,
    },
    Update {
        entity: Box<CalendarEntity>,
        suppress_notifications: bool,
        on_behalf_of: Option<CalAddress>,
    },
    Delete {
        entity: Box<CalendarEntity>,
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessOutcome {
    Added,
    Updated,
    Deleted,
    #[default]
    NoAction,
    Ignored,
    Sent,
}

#[derive(Debug, Default)]
pub struct ProcessResult {
    pub error: Option<ItipIngestError>,
    /// Delete the inbox message regardless of notification preferences.
    pub remove_inbox_entry: bool,
    /// Leave the inbox message exactly as it is.
    pub no_inbox_change: bool,
    /// The recipient accepted, used by the unless-accepted preference.
    pub attendee_accepting: bool,
    pub outcome: ProcessOutcome,
    pub change: EntityChange,
    pub messages: Vec<ItipMessage>,
}

pub trait MessageProcessor: Sync + Send {
    fn process(
        &self,
        principal: &Principal,
        message: &InboxMessage,
    ) -> impl Future<Output = ProcessResult> + Send;
}

impl SchedulingMethod {
    pub fn parse(value: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(value.as_bytes(),
            "REQUEST" => SchedulingMethod::Request,
            "REPLY" => SchedulingMethod::Reply,
            "CANCEL" => SchedulingMethod::Cancel,
            "REFRESH" => SchedulingMethod::Refresh,
            "COUNTER" => SchedulingMethod::Counter,
            "DECLINECOUNTER" => SchedulingMethod::DeclineCounter,
            "ADD" => SchedulingMethod::Add,
            "POLLSTATUS" => SchedulingMethod::PollStatus,
            "PUBLISH" => SchedulingMethod::Publish,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingMethod::Request => "REQUEST",
            SchedulingMethod::Reply => "REPLY",
            SchedulingMethod::Cancel => "CANCEL",
            SchedulingMethod::Refresh => "REFRESH",
            SchedulingMethod::Counter => "COUNTER",
            SchedulingMethod::DeclineCounter => "DECLINECOUNTER",
            SchedulingMethod::Add => "ADD",
            SchedulingMethod::PollStatus => "POLLSTATUS",
            SchedulingMethod::Publish => "PUBLISH",
        }
    }
}

impl ItipError {
    pub fn code(&self) -> &'static str {
        match self {
            ItipError::MissingOriginator => "schedulingNoOriginator",
            ItipError::ExpectOneAttendee => "schedulingExpectOneAttendee",
            ItipError::UnknownAttendee(_) => "schedulingUnknownAttendee",
            ItipError::NotParticipant => "schedulingNotParticipant",
            ItipError::NotOrganizer => "schedulingNotOrganizer",
            ItipError::UnsupportedMethod { .. } => "schedulingBadMethod",
            ItipError::NoDefaultCollection(_) => "schedulingNoCalendar",
            ItipError::MissingUid => "missingUid",
            ItipError::MissingStart => "missingStart",
            ItipError::EventNotFound => "schedulingUnknownEvent",
            ItipError::NothingToSend => "schedulingNothingToSend",
        }
    }
}

impl ItipIngestError {
    pub fn code(&self) -> &'static str {
        match self {
            ItipIngestError::Message(err) => err.code(),
            ItipIngestError::Internal(_) => "schedulingInternalError",
        }
    }

    pub fn as_itip(&self) -> Option<&ItipError> {
        match self {
            ItipIngestError::Message(err) => Some(err),
            ItipIngestError::Internal(_) => None,
        }
    }
}

impl ProcessResult {
    pub fn error(error: impl Into<ItipIngestError>) -> Self {
        ProcessResult {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn code(&self) -> Option<&'static str> {
        self.error.as_ref().map(ItipIngestError::code)
    }
}

impl From<Result<ProcessResult, ItipIngestError>> for ProcessResult {
    fn from(result: Result<ProcessResult, ItipIngestError>) -> Self {
        result.unwrap_or_else(ProcessResult::error)
    }
}

impl From<ItipError> for ItipIngestError {
    fn from(err: ItipError) -> Self {
        ItipIngestError::Message(err)
    }
}

impl From<trc::Error> for ItipIngestError {
    fn from(err: trc::Error) -> Self {
        ItipIngestError::Internal(err)
    }
}

impl Display for ItipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItipError::MissingOriginator => write!(f, "Scheduling message has no originator"),
            ItipError::ExpectOneAttendee => {
                write!(f, "Expected exactly one attendee in the reply")
            }
            ItipError::UnknownAttendee(address) => write!(f, "Unknown attendee: {address}"),
            ItipError::NotParticipant => write!(f, "Principal is not a participant"),
            ItipError::NotOrganizer => write!(f, "Principal is not the organizer"),
            ItipError::UnsupportedMethod {
                method,
                entity_type,
            } => write!(
                f,
                "Unsupported method {} for {} entities",
                method.as_str(),
                entity_type.as_str()
            ),
            ItipError::NoDefaultCollection(entity_type) => write!(
                f,
                "No default collection configured for {} entities",
                entity_type.as_str()
            ),
            ItipError::MissingUid => write!(f, "Missing UID"),
            ItipError::MissingStart => write!(f, "Missing start date"),
            ItipError::EventNotFound => write!(f, "Scheduled entity not found"),
            ItipError::NothingToSend => write!(f, "No scheduling messages to send"),
        }
    }
}

impl Display for ItipIngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItipIngestError::Message(err) => err.fmt(f),
            ItipIngestError::Internal(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ItipError {}
