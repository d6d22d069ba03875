/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::{fmt::Display, str::FromStr};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Disable,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl EventType {
    pub fn level(&self) -> Level {
        match self {
            EventType::Scheduling(event) => match event {
                SchedulingEvent::MessageReceived | SchedulingEvent::InboxEntryProcessed => {
                    Level::Debug
                }
                SchedulingEvent::InboxEntryDeleted | SchedulingEvent::MessageIgnored => {
                    Level::Debug
                }
                SchedulingEvent::InvitationAdded
                | SchedulingEvent::InvitationUpdated
                | SchedulingEvent::ReplyApplied
                | SchedulingEvent::CounterReceived
                | SchedulingEvent::CancelApplied
                | SchedulingEvent::RefreshSent
                | SchedulingEvent::PollStatusApplied
                | SchedulingEvent::AutoAccepted
                | SchedulingEvent::AutoDeclined
                | SchedulingEvent::ReplySent
                | SchedulingEvent::DelegationSent => Level::Info,
                SchedulingEvent::MessageRejected => Level::Warn,
            },
            EventType::Store(event) => match event {
                StoreEvent::DataWrite => Level::Trace,
                StoreEvent::NotFound => Level::Debug,
                StoreEvent::AssertValueFailed
                | StoreEvent::DataCorruption
                | StoreEvent::UnexpectedError => Level::Error,
            },
            EventType::Config(event) => match event {
                ConfigEvent::ParseError => Level::Error,
                ConfigEvent::ParseWarning | ConfigEvent::MissingSetting => Level::Warn,
                ConfigEvent::DefaultApplied => Level::Debug,
            },
            EventType::Directory(event) => match event {
                DirectoryEvent::CacheHit | DirectoryEvent::CacheMiss => Level::Trace,
                DirectoryEvent::PrincipalNotFound => Level::Debug,
                DirectoryEvent::LookupError => Level::Error,
            },
        }
    }
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Disable => "disable",
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }

    pub fn is_contained(&self, other: Self) -> bool {
        *self >= other
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "disable" | "off" => Ok(Level::Disable),
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(format!("Invalid log level {s:?}")),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
