/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::{ICalendarStatus, ICalendarTransparency};
use trc::AddContext;

use crate::{
    Scheduler,
    backend::{Principal, SchedulingBackend},
    config::CancelPreference,
    entity::{EntityType, InstanceData},
    itip::{
        EntityChange, InboxMessage, ItipError, ItipIngestError, MessageProcessor, ProcessOutcome,
        ProcessResult,
    },
};

/// Applies an organizer's cancellation to the recipient's copy.
pub struct CancelProcessor<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl<B: SchedulingBackend> MessageProcessor for CancelProcessor<'_, B> {
    async fn process(&self, principal: &Principal, message: &InboxMessage) -> ProcessResult {
        self.try_process(principal, message).await.into()
    }
}

impl<'x, B: SchedulingBackend> CancelProcessor<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        CancelProcessor { scheduler }
    }

    async fn try_process(
        &self,
        principal: &Principal,
        message: &InboxMessage,
    ) -> Result<ProcessResult, ItipIngestError> {
        if message.originator.is_none() {
            return Err(ItipError::MissingOriginator.into());
        }
        let incoming = &message.entity;

        let Some(mut entity) = self
            .scheduler
            .backend
            .find_stored_meeting(principal, &incoming.uid)
            .await
            .caused_by(trc::location!())?
        else {
            return Ok(ProcessResult {
                remove_inbox_entry: true,
                ..Default::default()
            });
        };

        let whole = !incoming.master.suppressed;
        let preference = self.scheduler.preferences(principal).cancel;
        let change = if whole && preference == CancelPreference::Delete {
            EntityChange::Delete {
                entity: Box::new(entity),
                force: true,
            }
        } else {
            let entity_type = entity.entity_type;
            if whole {
                cancel_instance(&mut entity.master.data, entity_type);
                for item in entity.overrides.values_mut() {
                    cancel_instance(&mut item.data, entity_type);
                }
            } else {
                let reconciler = self.scheduler.reconciler();
                let mut recurrence_ids = incoming.overrides.keys().copied().collect::<Vec<_>>();
                recurrence_ids.sort_unstable();
                for recurrence_id in recurrence_ids {
                    let item = reconciler
                        .find_or_create_override(&mut entity, recurrence_id)
                        .await
                        .caused_by(trc::location!())?;
                    cancel_instance(&mut item.data, entity_type);
                }
            }
            EntityChange::Update {
                entity: Box::new(entity),
                suppress_notifications: true,
                on_behalf_of: None,
            }
        };

        trc::event!(
            Scheduling(trc::SchedulingEvent::CancelApplied),
            AccountId = principal.account_id,
            Uid = incoming.uid.as_str(),
            Details = if matches!(change, EntityChange::Delete { .. }) {
                "delete"
            } else {
                "set-status"
            },
        );

        Ok(ProcessResult {
            remove_inbox_entry: true,
            outcome: if matches!(change, EntityChange::Delete { .. }) {
                ProcessOutcome::Deleted
            } else {
                ProcessOutcome::Updated
            },
            change,
            ..Default::default()
        })
    }
}

fn cancel_instance(data: &mut InstanceData, entity_type: EntityType) {
    data.status = Some(ICalendarStatus::Cancelled);
    if entity_type != EntityType::Task {
        data.transparency = Some(ICalendarTransparency::Transparent);
    }
}
