/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod conv;
pub mod event;
pub mod macros;

pub use event::level::Level;

pub type Result<T> = std::result::Result<T, Error>;
pub type Error = Event<EventType>;

#[derive(Debug, Clone)]
pub struct Event<T> {
    pub inner: T,
    pub keys: Vec<(Key, Value)>,
}

#[derive(Debug, Default, Clone)]
pub enum Value {
    String(compact_str::CompactString),
    UInt(u64),
    Int(i64),
    Bool(bool),
    Timestamp(i64),
    Event(Box<Event<EventType>>),
    Array(Vec<Value>),
    #[default]
    None,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    #[default]
    CausedBy,
    Reason,
    Details,
    Code,
    Id,
    Key,
    Value,
    Type,
    Result,
    Total,
    AccountId,
    DocumentId,
    Collection,
    Uid,
    From,
    To,
    Method,
    Status,
    Start,
    End,
    Elapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Scheduling(SchedulingEvent),
    Store(StoreEvent),
    Config(ConfigEvent),
    Directory(DirectoryEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulingEvent {
    MessageReceived,
    InvitationAdded,
    InvitationUpdated,
    ReplyApplied,
    CounterReceived,
    CancelApplied,
    RefreshSent,
    PollStatusApplied,
    AutoAccepted,
    AutoDeclined,
    ReplySent,
    DelegationSent,
    InboxEntryDeleted,
    InboxEntryProcessed,
    MessageRejected,
    MessageIgnored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    NotFound,
    DataWrite,
    DataCorruption,
    AssertValueFailed,
    UnexpectedError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigEvent {
    ParseError,
    ParseWarning,
    DefaultApplied,
    MissingSetting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryEvent {
    PrincipalNotFound,
    CacheHit,
    CacheMiss,
    LookupError,
}

pub trait AddContext<T> {
    fn caused_by(self, location: &'static str) -> Result<T>;
    fn add_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce(Error) -> Error;
}
