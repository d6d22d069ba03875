/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::ICalendarParticipationStatus;
use compact_str::CompactString;
use trc::AddContext;

use crate::{
    Scheduler,
    backend::{Principal, SchedulingBackend},
    entity::{
        CalAddress, CalendarEntity, InstanceId, Participant, SCHEDULE_STATUS_DELIVERED,
        SCHEDULE_STATUS_DELIVERY_FAILED,
    },
    itip::{
        ItipError, ItipIngestError, ItipMessage, ProcessOutcome, ProcessResult, SchedulingMethod,
        export::{reply_message, request_message},
    },
};

/// A change the attendee made to their own copy that the organizer has to
/// hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeUpdate {
    pub method: SchedulingMethod,
    /// Instances the change touches, every instance when `None`.
    pub instances: Option<Vec<InstanceId>>,
    pub delegate_to: Option<CalAddress>,
}

/// Sends the attendee's response to the organizer, and the invitation to a
/// delegate when the attendee handed over their seat.
pub struct AttendeeUpdateProcessor<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl AttendeeUpdate {
    pub fn reply() -> Self {
        AttendeeUpdate {
            method: SchedulingMethod::Reply,
            instances: None,
            delegate_to: None,
        }
    }

    pub fn counter() -> Self {
        AttendeeUpdate {
            method: SchedulingMethod::Counter,
            ..AttendeeUpdate::reply()
        }
    }

    pub fn with_instances(mut self, instances: Vec<InstanceId>) -> Self {
        self.instances = Some(instances);
        self
    }

    pub fn with_delegate(mut self, delegate: CalAddress) -> Self {
        self.delegate_to = Some(delegate);
        self
    }
}

impl<'x, B: SchedulingBackend> AttendeeUpdateProcessor<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        AttendeeUpdateProcessor { scheduler }
    }

    /// `entity` is the principal's copy including the local edit. It is
    /// stored once the messages went out.
    pub async fn process(
        &self,
        principal: &Principal,
        entity: CalendarEntity,
        update: AttendeeUpdate,
    ) -> ProcessResult {
        let _lock = self
            .scheduler
            .lock_entity(principal.account_id, &entity.uid)
            .await;
        self.try_process(principal, entity, update).await.into()
    }

    async fn try_process(
        &self,
        principal: &Principal,
        mut entity: CalendarEntity,
        update: AttendeeUpdate,
    ) -> Result<ProcessResult, ItipIngestError> {
        if !matches!(
            update.method,
            SchedulingMethod::Reply | SchedulingMethod::Counter
        ) {
            return Err(ItipError::UnsupportedMethod {
                method: update.method,
                entity_type: entity.entity_type,
            }
            .into());
        }

        let instances = match update.instances {
            Some(instances) => instances,
            None => entity.instances().map(|instance| instance.id()).collect(),
        };
        for id in &instances {
            if entity
                .instance(*id)
                .and_then(|instance| instance.participant_any(&principal.addresses))
                .is_none()
            {
                return Err(ItipError::NotParticipant.into());
            }
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(delegate) = &update.delegate_to {
            let from = delegate_instances(&mut entity, &instances, &principal.addresses, delegate)?;
            messages.push(request_message(&entity, from, vec![delegate.clone()]));
        }
        messages.insert(
            0,
            reply_message(
                &entity,
                &principal.addresses,
                Some(&instances),
                update.method,
            )?,
        );

        let delivery = self.send(principal, &entity, &messages).await;
        let status = if delivery.is_ok() {
            SCHEDULE_STATUS_DELIVERED
        } else {
            SCHEDULE_STATUS_DELIVERY_FAILED
        };
        for id in &instances {
            if let Some(owner) = entity
                .data_mut(*id)
                .and_then(|data| data.scheduling.owner.as_mut())
            {
                owner.schedule_status = Some(CompactString::const_new(status));
            }
        }

        self.scheduler
            .backend
            .update_entity(principal, &entity, true, None)
            .await
            .caused_by(trc::location!())?;
        delivery?;

        Ok(ProcessResult {
            outcome: ProcessOutcome::Sent,
            attendee_accepting: entity
                .instances()
                .find_map(|instance| instance.participant_any(&principal.addresses))
                .is_some_and(Participant::is_accepted),
            messages,
            ..Default::default()
        })
    }

    async fn send(
        &self,
        principal: &Principal,
        entity: &CalendarEntity,
        messages: &[ItipMessage],
    ) -> trc::Result<()> {
        for message in messages {
            self.scheduler
                .backend
                .send(message)
                .await
                .caused_by(trc::location!())?;

            let event = if message.method == SchedulingMethod::Request {
                trc::SchedulingEvent::DelegationSent
            } else {
                trc::SchedulingEvent::ReplySent
            };
            trc::event!(
                Scheduling(event),
                AccountId = principal.account_id,
                Uid = entity.uid.as_str(),
                Method = message.method.as_str(),
                To = message
                    .to
                    .iter()
                    .map(|to| to.as_str().to_string())
                    .collect::<Vec<_>>(),
            );
        }
        Ok(())
    }
}

/// Hands the principal's seat on `instances` over to `delegate`. Returns the
/// delegating address.
fn delegate_instances(
    entity: &mut CalendarEntity,
    instances: &[InstanceId],
    addresses: &[CalAddress],
    delegate: &CalAddress,
) -> Result<CalAddress, ItipError> {
    if delegate.is_any_of(addresses) {
        return Err(ItipError::NothingToSend);
    }

    let master_scheduling = entity.master.data.scheduling.clone();
    let mut from = None;
    for id in instances {
        let data = entity.data_mut(*id).ok_or(ItipError::NotParticipant)?;
        if data.scheduling.is_empty() {
            data.scheduling = master_scheduling.clone();
        }

        let delegator = data
            .scheduling
            .find_any_mut(addresses)
            .ok_or(ItipError::NotParticipant)?;
        delegator.part_stat = ICalendarParticipationStatus::Delegated;
        if !delegator.delegated_to.contains(delegate) {
            delegator.delegated_to.push(delegate.clone());
        }
        let address = delegator.address.clone();
        let role = delegator.role.clone();

        match data.scheduling.find_mut(delegate) {
            Some(existing) => {
                if !existing.delegated_from.contains(&address) {
                    existing.delegated_from.push(address.clone());
                }
            }
            None => {
                let mut participant = Participant::new(delegate.clone());
                participant.delegated_from = vec![address.clone()];
                participant.role = role;
                data.scheduling.participants.push(participant);
            }
        }
        from.get_or_insert(address);
    }

    from.ok_or(ItipError::NothingToSend)
}
