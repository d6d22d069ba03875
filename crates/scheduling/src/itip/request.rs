/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::{ICalendarParticipationStatus, ICalendarTransparency};
use trc::AddContext;

use crate::{
    Scheduler,
    autorespond::AutoResponder,
    backend::{Principal, SchedulingBackend},
    changes::{ChangeTable, ReconcileContext},
    config::SchedulingPreferences,
    entity::{CalendarEntity, EntityType, InstanceData, InstanceId, property::Property},
    itip::{
        EntityChange, InboxMessage, ItipError, ItipIngestError, ItipMessage, MessageProcessor,
        ProcessOutcome, ProcessResult, SchedulingMethod, export::reply_message,
    },
    recurrence::backfill_override,
};

/// Brings an organizer's invitation into the recipient's calendar.
pub struct RequestProcessor<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl<B: SchedulingBackend> MessageProcessor for RequestProcessor<'_, B> {
    async fn process(&self, principal: &Principal, message: &InboxMessage) -> ProcessResult {
        self.try_process(principal, message).await.into()
    }
}

impl<'x, B: SchedulingBackend> RequestProcessor<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        RequestProcessor { scheduler }
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
        if incoming.entity_type == EntityType::Event
            && !incoming.master.suppressed
            && incoming.master.data.start.is_none()
        {
            return Err(ItipError::MissingStart.into());
        }

        let preferences = self.scheduler.preferences(principal);
        match self
            .scheduler
            .backend
            .find_stored_meeting(principal, &incoming.uid)
            .await
            .caused_by(trc::location!())?
        {
            None => self.create(principal, incoming, preferences).await,
            Some(stored) => {
                self.update(principal, incoming, stored, preferences)
                    .await
            }
        }
    }

    async fn create(
        &self,
        principal: &Principal,
        incoming: &CalendarEntity,
        preferences: SchedulingPreferences,
    ) -> Result<ProcessResult, ItipIngestError> {
        let collection_id = self
            .scheduler
            .backend
            .default_collection(principal, incoming.entity_type)
            .await
            .caused_by(trc::location!())?
            .ok_or(ItipError::NoDefaultCollection(incoming.entity_type))?;

        let mut entity = incoming.clone();
        entity.collection_id = Some(collection_id);
        entity.document_id = None;
        let master = &entity.master;
        for item in entity.overrides.values_mut() {
            backfill_override(item, master);
        }

        // Nothing is decided yet, so the invitation must not block time.
        let mut pending = false;
        let entity_type = entity.entity_type;
        let instance_data = std::iter::once(&mut entity.master.data)
            .chain(entity.overrides.values_mut().map(|item| &mut item.data));
        for data in instance_data {
            pending |= reset_own_response(data, principal, entity_type);
        }

        let mut result = ProcessResult {
            outcome: ProcessOutcome::Added,
            ..Default::default()
        };
        if preferences.auto_respond && pending {
            pending = !self
                .auto_respond(principal, &mut entity, &mut result.messages)
                .await?;
        }

        trc::event!(
            Scheduling(trc::SchedulingEvent::InvitationAdded),
            AccountId = principal.account_id,
            Uid = entity.uid.as_str(),
            Id = collection_id,
            Details = pending,
        );

        result.attendee_accepting = is_accepting(&entity, principal);
        result.remove_inbox_entry = !preferences.scheduling_assistant && !pending;
        result.change = EntityChange::Create {
            collection_id,
            entity: Box::new(entity),
        };
        Ok(result)
    }

    async fn update(
        &self,
        principal: &Principal,
        incoming: &CalendarEntity,
        stored: CalendarEntity,
        preferences: SchedulingPreferences,
    ) -> Result<ProcessResult, ItipIngestError> {
        if stored
            .instances()
            .any(|instance| instance.scheduling().is_owner(&principal.addresses))
        {
            return Err(ItipError::NotParticipant.into());
        }

        if is_out_of_sequence(&stored, incoming) {
            trc::event!(
                Scheduling(trc::SchedulingEvent::MessageIgnored),
                AccountId = principal.account_id,
                Uid = incoming.uid.as_str(),
                Reason = "Out of sequence",
            );
            return Ok(ProcessResult {
                remove_inbox_entry: true,
                outcome: ProcessOutcome::Ignored,
                ..Default::default()
            });
        }

        // Reconciled in memory only, the stored copy is replaced once the
        // whole message has been applied.
        let mut entity = stored;
        let ctx = ReconcileContext {
            entity_type: entity.entity_type,
            self_addresses: &principal.addresses,
        };
        let mut significant = false;
        let mut pending = false;
        let mut changed = false;

        if !incoming.master.suppressed {
            let table = ChangeTable::diff(&entity.master, &incoming.master, &ctx);
            table.apply(&mut entity.master);
            entity.master.suppressed = false;
            significant |= table.is_significant();
            pending |= table.reply_owed;
            changed |= !table.is_empty();
        }

        let reconciler = self.scheduler.reconciler();
        let mut overrides = incoming.overrides.values().collect::<Vec<_>>();
        overrides.sort_unstable_by_key(|item| item.recurrence_id);
        for item in overrides {
            let mut item = item.clone();
            backfill_override(&mut item, &incoming.master);

            let existed = entity.overrides.contains_key(&item.recurrence_id);
            let local = reconciler
                .find_or_create_override(&mut entity, item.recurrence_id)
                .await
                .caused_by(trc::location!())?;
            let table = ChangeTable::diff(&*local, &item, &ctx);
            table.apply(local);
            significant |= !existed || table.is_significant();
            pending |= table.reply_owed;
            changed |= !existed || !table.is_empty();
        }

        if !incoming.master.suppressed {
            let mut table = ChangeTable::default();
            reconciler
                .reconcile_exdates(&mut entity, &incoming.master.recurrence.exdates, &mut table)
                .await
                .caused_by(trc::location!())?;
            significant |= table.changed(Property::Exdate);
            changed |= !table.is_empty();
        }

        let mut result = ProcessResult::default();
        if preferences.auto_respond && pending {
            pending = !self
                .auto_respond(principal, &mut entity, &mut result.messages)
                .await?;
            changed = true;
        }

        trc::event!(
            Scheduling(trc::SchedulingEvent::InvitationUpdated),
            AccountId = principal.account_id,
            Uid = entity.uid.as_str(),
            DocumentId = entity.document_id,
            Details = significant,
        );

        result.attendee_accepting = is_accepting(&entity, principal);
        result.remove_inbox_entry = !(significant || pending);
        if changed {
            result.outcome = ProcessOutcome::Updated;
            result.change = EntityChange::Update {
                entity: Box::new(entity),
                suppress_notifications: true,
                on_behalf_of: None,
            };
        }
        Ok(result)
    }

    /// Runs the auto responder and queues the resulting reply. Returns
    /// whether a decision was made.
    async fn auto_respond(
        &self,
        principal: &Principal,
        entity: &mut CalendarEntity,
        messages: &mut Vec<ItipMessage>,
    ) -> Result<bool, ItipIngestError> {
        let Some(response) = AutoResponder::new(self.scheduler, principal)
            .respond(entity)
            .await
            .caused_by(trc::location!())?
        else {
            return Ok(false);
        };

        let instances = entity
            .instances()
            .filter(|instance| instance.participant_any(&principal.addresses).is_some())
            .map(|instance| instance.id())
            .collect::<Vec<InstanceId>>();
        match reply_message(
            entity,
            &principal.addresses,
            Some(&instances),
            SchedulingMethod::Reply,
        ) {
            Ok(message) => messages.push(message),
            Err(err) => {
                trc::event!(
                    Scheduling(trc::SchedulingEvent::MessageIgnored),
                    AccountId = principal.account_id,
                    Uid = entity.uid.as_str(),
                    Code = err.code(),
                    Details = response.accepted,
                );
            }
        }

        Ok(true)
    }
}

/// Marks the recipient's own record on `data` as undecided. Returns whether
/// the organizer expects an answer.
fn reset_own_response(data: &mut InstanceData, principal: &Principal, entity_type: EntityType) -> bool {
    let Some(participant) = data.scheduling.find_any_mut(&principal.addresses) else {
        return false;
    };
    participant.part_stat = ICalendarParticipationStatus::NeedsAction;
    let expects_reply = participant.expect_reply;
    if entity_type != EntityType::Task {
        data.transparency = Some(ICalendarTransparency::Transparent);
    }
    expects_reply
}

fn is_out_of_sequence(stored: &CalendarEntity, incoming: &CalendarEntity) -> bool {
    incoming.instances().any(|instance| {
        stored
            .instance(instance.id())
            .is_some_and(|local| instance.data().sequence < local.data().sequence)
    })
}

fn is_accepting(entity: &CalendarEntity, principal: &Principal) -> bool {
    entity
        .instances()
        .find_map(|instance| instance.participant_any(&principal.addresses))
        .is_some_and(|participant| participant.is_accepted())
}
