/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod description;
pub mod level;

use std::fmt::Display;

use crate::*;

impl<T> Event<T> {
    pub fn with_keys(inner: T, keys: Vec<(Key, Value)>) -> Self {
        Self { inner, keys }
    }

    pub fn new(inner: T) -> Self {
        Self {
            inner,
            keys: Vec::with_capacity(5),
        }
    }

    pub fn value(&self, key: Key) -> Option<&Value> {
        self.keys
            .iter()
            .find_map(|(k, v)| if *k == key { Some(v) } else { None })
    }

    pub fn value_as_str(&self, key: Key) -> Option<&str> {
        self.value(key).and_then(|v| v.as_str())
    }

    pub fn value_as_uint(&self, key: Key) -> Option<u64> {
        self.value(key).and_then(|v| v.to_uint())
    }

    pub fn take_value(&mut self, key: Key) -> Option<Value> {
        self.keys.iter_mut().find_map(|(k, v)| {
            if *k == key {
                Some(std::mem::take(v))
            } else {
                None
            }
        })
    }
}

impl Event<EventType> {
    #[inline(always)]
    pub fn ctx(mut self, key: Key, value: impl Into<Value>) -> Self {
        self.keys.push((key, value.into()));
        self
    }

    #[inline(always)]
    pub fn ctx_unique(mut self, key: Key, value: impl Into<Value>) -> Self {
        if self.keys.iter().all(|(k, _)| *k != key) {
            self.keys.push((key, value.into()));
        }
        self
    }

    #[inline(always)]
    pub fn ctx_opt(self, key: Key, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.ctx(key, value),
            None => self,
        }
    }

    #[inline(always)]
    pub fn matches(&self, inner: EventType) -> bool {
        self.inner == inner
    }

    #[inline(always)]
    pub fn caused_by(self, error: impl Into<Value>) -> Self {
        self.ctx(Key::CausedBy, error)
    }

    #[inline(always)]
    pub fn details(self, error: impl Into<Value>) -> Self {
        self.ctx(Key::Details, error)
    }

    #[inline(always)]
    pub fn code(self, error: impl Into<Value>) -> Self {
        self.ctx(Key::Code, error)
    }

    #[inline(always)]
    pub fn id(self, id: impl Into<Value>) -> Self {
        self.ctx(Key::Id, id)
    }

    #[inline(always)]
    pub fn reason(self, error: impl Display) -> Self {
        self.ctx(Key::Reason, error.to_string())
    }

    #[inline(always)]
    pub fn document_id(self, id: u32) -> Self {
        self.ctx(Key::DocumentId, id)
    }

    #[inline(always)]
    pub fn account_id(self, id: u32) -> Self {
        self.ctx(Key::AccountId, id)
    }

    #[inline(always)]
    pub fn uid(self, uid: impl Into<Value>) -> Self {
        self.ctx(Key::Uid, uid)
    }

    #[inline(always)]
    pub fn wrap(self, cause: EventType) -> Self {
        Error::new(cause).caused_by(self)
    }

    #[inline(always)]
    pub fn is_assertion_failure(&self) -> bool {
        self.inner == EventType::Store(StoreEvent::AssertValueFailed)
    }

    pub fn level(&self) -> Level {
        self.inner.level()
    }

    /// Forwards the event to the `tracing` facade at the level assigned
    /// to its type.
    pub fn send(self) {
        let name = self.inner.name();
        match self.inner.level() {
            Level::Error => tracing::error!(event = name, "{}", self),
            Level::Warn => tracing::warn!(event = name, "{}", self),
            Level::Info => tracing::info!(event = name, "{}", self),
            Level::Debug => tracing::debug!(event = name, "{}", self),
            Level::Trace => tracing::trace!(event = name, "{}", self),
            Level::Disable => {}
        }
    }
}

impl EventType {
    #[inline(always)]
    pub fn ctx(self, key: Key, value: impl Into<Value>) -> Error {
        self.into_err().ctx(key, value)
    }

    #[inline(always)]
    pub fn ctx_opt(self, key: Key, value: Option<impl Into<Value>>) -> Error {
        self.into_err().ctx_opt(key, value)
    }

    #[inline(always)]
    pub fn caused_by(self, error: impl Into<Value>) -> Error {
        self.into_err().caused_by(error)
    }

    #[inline(always)]
    pub fn reason(self, error: impl Display) -> Error {
        self.into_err().reason(error)
    }

    #[inline(always)]
    pub fn into_err(self) -> Error {
        Error::new(self)
    }
}

macro_rules! impl_into_err {
    ($($event:ident => $variant:ident),* $(,)?) => {
        $(
            impl $event {
                #[inline(always)]
                pub fn ctx(self, key: Key, value: impl Into<Value>) -> Error {
                    self.into_err().ctx(key, value)
                }

                #[inline(always)]
                pub fn caused_by(self, error: impl Into<Value>) -> Error {
                    self.into_err().caused_by(error)
                }

                #[inline(always)]
                pub fn reason(self, error: impl Display) -> Error {
                    self.into_err().reason(error)
                }

                #[inline(always)]
                pub fn details(self, details: impl Into<Value>) -> Error {
                    self.into_err().details(details)
                }

                #[inline(always)]
                pub fn into_err(self) -> Error {
                    Error::new(EventType::$variant(self))
                }
            }

            impl From<$event> for EventType {
                fn from(event: $event) -> Self {
                    EventType::$variant(event)
                }
            }
        )*
    };
}

impl_into_err!(
    SchedulingEvent => Scheduling,
    StoreEvent => Store,
    ConfigEvent => Config,
    DirectoryEvent => Directory,
);

impl<T> AddContext<T> for Result<T> {
    #[inline(always)]
    fn caused_by(self, location: &'static str) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.ctx(Key::CausedBy, location)),
        }
    }

    #[inline(always)]
    fn add_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce(Error) -> Error,
    {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(f(err)),
        }
    }
}

impl Display for Event<EventType> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.inner.description())?;
        for (idx, (key, value)) in self.keys.iter().enumerate() {
            f.write_str(if idx == 0 { ": " } else { ", " })?;
            write!(f, "{key:?} = {value}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Event<EventType> {}
