/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use trc::AddContext;

use crate::{
    Scheduler,
    backend::{Principal, SchedulingBackend},
    changes::{ChangeTable, ReconcileContext},
    entity::property::Property,
    itip::{
        EntityChange, InboxMessage, ItipError, ItipIngestError, MessageProcessor, ProcessOutcome,
        ProcessResult,
    },
};

/// Updates the outcome and voter list of a poll, leaving the candidates as
/// they are.
pub struct PollStatusProcessor<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl<B: SchedulingBackend> MessageProcessor for PollStatusProcessor<'_, B> {
    async fn process(&self, principal: &Principal, message: &InboxMessage) -> ProcessResult {
        self.try_process(principal, message).await.into()
    }
}

impl<'x, B: SchedulingBackend> PollStatusProcessor<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        PollStatusProcessor { scheduler }
    }

    async fn try_process(
        &self,
        principal: &Principal,
        message: &InboxMessage,
    ) -> Result<ProcessResult, ItipIngestError> {
        let incoming = &message.entity;
        if incoming.uid.is_empty() {
            return Err(ItipError::MissingUid.into());
        }

        let Some(mut entity) = self
            .scheduler
            .backend
            .find_stored_meeting(principal, &incoming.uid)
            .await
            .caused_by(trc::location!())?
        else {
            trc::event!(
                Scheduling(trc::SchedulingEvent::MessageIgnored),
                AccountId = principal.account_id,
                Uid = incoming.uid.as_str(),
                Reason = "Poll not found",
            );
            return Ok(ProcessResult {
                remove_inbox_entry: true,
                outcome: ProcessOutcome::Ignored,
                ..Default::default()
            });
        };

        let ctx = ReconcileContext {
            entity_type: entity.entity_type,
            self_addresses: &principal.addresses,
        };
        let table = ChangeTable::diff_properties(
            &entity.master,
            &incoming.master,
            &[Property::PollStatus, Property::PollWinner],
            &ctx,
        );
        table.apply(&mut entity.master);

        let voters_changed = entity.master.data.scheduling != incoming.master.data.scheduling;
        if voters_changed {
            entity
                .master
                .data
                .scheduling
                .rebuild_from(&incoming.master.data.scheduling);
        }

        trc::event!(
            Scheduling(trc::SchedulingEvent::PollStatusApplied),
            AccountId = principal.account_id,
            Uid = entity.uid.as_str(),
            Status = entity
                .master
                .data
                .poll
                .as_ref()
                .and_then(|poll| poll.status.clone()),
            Details = voters_changed,
        );

        if table.is_empty() && !voters_changed {
            return Ok(ProcessResult {
                remove_inbox_entry: true,
                ..Default::default()
            });
        }

        Ok(ProcessResult {
            outcome: ProcessOutcome::Updated,
            change: EntityChange::Update {
                entity: Box::new(entity),
                suppress_notifications: true,
                on_behalf_of: None,
            },
            ..Default::default()
        })
    }
}
