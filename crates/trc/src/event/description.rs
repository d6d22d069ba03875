/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use super::*;

impl EventType {
    pub fn description(&self) -> &'static str {
        match self {
            EventType::Scheduling(event) => event.description(),
            EventType::Store(event) => event.description(),
            EventType::Config(event) => event.description(),
            EventType::Directory(event) => event.description(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventType::Scheduling(event) => event.name(),
            EventType::Store(event) => event.name(),
            EventType::Config(event) => event.name(),
            EventType::Directory(event) => event.name(),
        }
    }
}

impl SchedulingEvent {
    pub fn description(&self) -> &'static str {
        match self {
            SchedulingEvent::MessageReceived => "Scheduling message received",
            SchedulingEvent::InvitationAdded => "Invitation added to calendar",
            SchedulingEvent::InvitationUpdated => "Invitation updated",
            SchedulingEvent::ReplyApplied => "Attendee reply applied",
            SchedulingEvent::CounterReceived => "Counter proposal received",
            SchedulingEvent::CancelApplied => "Cancellation applied",
            SchedulingEvent::RefreshSent => "Refresh answered",
            SchedulingEvent::PollStatusApplied => "Poll status applied",
            SchedulingEvent::AutoAccepted => "Invitation accepted automatically",
            SchedulingEvent::AutoDeclined => "Invitation declined automatically",
            SchedulingEvent::ReplySent => "Attendee reply sent",
            SchedulingEvent::DelegationSent => "Delegation request sent",
            SchedulingEvent::InboxEntryDeleted => "Inbox entry deleted",
            SchedulingEvent::InboxEntryProcessed => "Inbox entry marked as processed",
            SchedulingEvent::MessageRejected => "Scheduling message rejected",
            SchedulingEvent::MessageIgnored => "Scheduling message ignored",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchedulingEvent::MessageReceived => "scheduling.message-received",
            SchedulingEvent::InvitationAdded => "scheduling.invitation-added",
            SchedulingEvent::InvitationUpdated => "scheduling.invitation-updated",
            SchedulingEvent::ReplyApplied => "scheduling.reply-applied",
            SchedulingEvent::CounterReceived => "scheduling.counter-received",
            SchedulingEvent::CancelApplied => "scheduling.cancel-applied",
            SchedulingEvent::RefreshSent => "scheduling.refresh-sent",
            SchedulingEvent::PollStatusApplied => "scheduling.poll-status-applied",
            SchedulingEvent::AutoAccepted => "scheduling.auto-accepted",
            SchedulingEvent::AutoDeclined => "scheduling.auto-declined",
            SchedulingEvent::ReplySent => "scheduling.reply-sent",
            SchedulingEvent::DelegationSent => "scheduling.delegation-sent",
            SchedulingEvent::InboxEntryDeleted => "scheduling.inbox-entry-deleted",
            SchedulingEvent::InboxEntryProcessed => "scheduling.inbox-entry-processed",
            SchedulingEvent::MessageRejected => "scheduling.message-rejected",
            SchedulingEvent::MessageIgnored => "scheduling.message-ignored",
        }
    }
}

impl StoreEvent {
    pub fn description(&self) -> &'static str {
        match self {
            StoreEvent::NotFound => "Record not found",
            StoreEvent::DataWrite => "Data written",
            StoreEvent::DataCorruption => "Data corruption detected",
            StoreEvent::AssertValueFailed => "Another process modified the record",
            StoreEvent::UnexpectedError => "Unexpected store error",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::NotFound => "store.not-found",
            StoreEvent::DataWrite => "store.data-write",
            StoreEvent::DataCorruption => "store.data-corruption",
            StoreEvent::AssertValueFailed => "store.assert-value-failed",
            StoreEvent::UnexpectedError => "store.unexpected-error",
        }
    }
}

impl ConfigEvent {
    pub fn description(&self) -> &'static str {
        match self {
            ConfigEvent::ParseError => "Configuration parse error",
            ConfigEvent::ParseWarning => "Configuration warning",
            ConfigEvent::DefaultApplied => "Default configuration value applied",
            ConfigEvent::MissingSetting => "Missing configuration setting",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfigEvent::ParseError => "config.parse-error",
            ConfigEvent::ParseWarning => "config.parse-warning",
            ConfigEvent::DefaultApplied => "config.default-applied",
            ConfigEvent::MissingSetting => "config.missing-setting",
        }
    }
}

impl DirectoryEvent {
    pub fn description(&self) -> &'static str {
        match self {
            DirectoryEvent::PrincipalNotFound => "Principal not found",
            DirectoryEvent::CacheHit => "Directory cache hit",
            DirectoryEvent::CacheMiss => "Directory cache miss",
            DirectoryEvent::LookupError => "Directory lookup failed",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DirectoryEvent::PrincipalNotFound => "directory.principal-not-found",
            DirectoryEvent::CacheHit => "directory.cache-hit",
            DirectoryEvent::CacheMiss => "directory.cache-miss",
            DirectoryEvent::LookupError => "directory.lookup-error",
        }
    }
}
