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
        InboxMessage, ItipError, ItipIngestError, MessageProcessor, ProcessOutcome, ProcessResult,
        export::request_message, reply::single_attendee,
    },
};

/// Resends the organizer's current copy to the attendee asking for it.
pub struct RefreshProcessor<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl<B: SchedulingBackend> MessageProcessor for RefreshProcessor<'_, B> {
    async fn process(&self, principal: &Principal, message: &InboxMessage) -> ProcessResult {
        self.try_process(principal, message).await.into()
    }
}

impl<'x, B: SchedulingBackend> RefreshProcessor<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        RefreshProcessor { scheduler }
    }

    async fn try_process(
        &self,
        principal: &Principal,
        message: &InboxMessage,
    ) -> Result<ProcessResult, ItipIngestError> {
        let attendee = single_attendee(&message.entity)?;

        let stored = self
            .scheduler
            .backend
            .find_stored_meeting(principal, &message.entity.uid)
            .await
            .caused_by(trc::location!())?;
        let Some((stored, organizer)) = stored.and_then(|stored| {
            let organizer = stored
                .organizer()
                .filter(|owner| owner.address.is_any_of(&principal.addresses))
                .map(|owner| owner.address.clone())?;
            (!stored.master.data.is_cancelled()).then_some((stored, organizer))
        }) else {
            return Ok(ProcessResult {
                no_inbox_change: true,
                ..Default::default()
            });
        };

        if !stored
            .instances()
            .any(|instance| instance.participant(&attendee).is_some())
        {
            return Err(ItipError::UnknownAttendee(attendee).into());
        }

        trc::event!(
            Scheduling(trc::SchedulingEvent::RefreshSent),
            AccountId = principal.account_id,
            Uid = stored.uid.as_str(),
            To = attendee.as_str(),
        );

        // The inbox entry goes away only once the router delivered this.
        Ok(ProcessResult {
            remove_inbox_entry: true,
            outcome: ProcessOutcome::Sent,
            messages: vec![request_message(&stored, organizer, vec![attendee])],
            ..Default::default()
        })
    }
}
