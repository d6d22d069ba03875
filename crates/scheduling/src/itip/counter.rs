/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use trc::AddContext;

use crate::{
    Scheduler,
    backend::{Principal, SchedulingBackend},
    itip::{
        InboxMessage, ItipError, ItipIngestError, MessageProcessor, ProcessResult,
        reply::single_attendee,
    },
};

/// Checks a counter proposal and leaves it in the organizer's inbox for a
/// decision. The stored copy is never changed.
pub struct CounterProcessor<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl<B: SchedulingBackend> MessageProcessor for CounterProcessor<'_, B> {
    async fn process(&self, principal: &Principal, message: &InboxMessage) -> ProcessResult {
        self.try_process(principal, message).await.into()
    }
}

impl<'x, B: SchedulingBackend> CounterProcessor<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        CounterProcessor { scheduler }
    }

    async fn try_process(
        &self,
        principal: &Principal,
        message: &InboxMessage,
    ) -> Result<ProcessResult, ItipIngestError> {
        if message.originator.is_none() {
            return Err(ItipError::MissingOriginator.into());
        }
        let proposer = single_attendee(&message.entity)?;

        let stored = self
            .scheduler
            .backend
            .find_stored_meeting(principal, &message.entity.uid)
            .await
            .caused_by(trc::location!())?
            .ok_or(ItipError::EventNotFound)?;
        if !stored
            .organizer()
            .is_some_and(|owner| owner.address.is_any_of(&principal.addresses))
        {
            return Err(ItipError::NotOrganizer.into());
        }
        if !stored
            .instances()
            .any(|instance| instance.participant(&proposer).is_some())
        {
            return Err(ItipError::UnknownAttendee(proposer).into());
        }

        trc::event!(
            Scheduling(trc::SchedulingEvent::CounterReceived),
            AccountId = principal.account_id,
            Uid = stored.uid.as_str(),
            From = proposer.as_str(),
        );

        Ok(ProcessResult::default())
    }
}
