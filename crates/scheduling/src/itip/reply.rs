/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use compact_str::CompactString;
use trc::AddContext;

use crate::{
    Scheduler,
    backend::{Principal, SchedulingBackend},
    entity::{
        CalAddress, CalendarEntity, EntityType, Instance, InstanceData, InstanceId, Participant,
        PollVote, SCHEDULE_STATUS_SUCCESS,
    },
    itip::{
        EntityChange, InboxMessage, ItipError, ItipIngestError, MessageProcessor, ProcessOutcome,
        ProcessResult,
    },
};

/// Applies an attendee's answer to the organizer's copy.
pub struct ReplyProcessor<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl<B: SchedulingBackend> MessageProcessor for ReplyProcessor<'_, B> {
    async fn process(&self, principal: &Principal, message: &InboxMessage) -> ProcessResult {
        self.try_process(principal, message).await.into()
    }
}

impl<'x, B: SchedulingBackend> ReplyProcessor<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        ReplyProcessor { scheduler }
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
        let attendee = single_attendee(incoming)?;

        let mut entity = self
            .scheduler
            .backend
            .find_stored_meeting(principal, &incoming.uid)
            .await
            .caused_by(trc::location!())?
            .ok_or(ItipError::EventNotFound)?;
        if !entity
            .organizer()
            .is_some_and(|owner| owner.address.is_any_of(&principal.addresses))
        {
            return Err(ItipError::NotOrganizer.into());
        }

        let changed = if entity.entity_type == EntityType::Poll {
            apply_votes(&mut entity, incoming, &attendee)?
        } else {
            self.apply_responses(&mut entity, incoming, &attendee)
                .await?
        };

        let accepting = incoming
            .instances()
            .find_map(|instance| instance.participant(&attendee))
            .is_some_and(Participant::is_accepted);

        trc::event!(
            Scheduling(trc::SchedulingEvent::ReplyApplied),
            AccountId = principal.account_id,
            Uid = entity.uid.as_str(),
            From = attendee.as_str(),
            Details = changed,
        );

        Ok(ProcessResult {
            attendee_accepting: accepting,
            outcome: ProcessOutcome::Updated,
            change: EntityChange::Update {
                entity: Box::new(entity),
                suppress_notifications: !changed,
                on_behalf_of: Some(attendee),
            },
            ..Default::default()
        })
    }

    async fn apply_responses(
        &self,
        entity: &mut CalendarEntity,
        incoming: &CalendarEntity,
        attendee: &CalAddress,
    ) -> Result<bool, ItipIngestError> {
        let reconciler = self.scheduler.reconciler();
        let entity_type = entity.entity_type;
        let mut changed = false;

        for instance in incoming.instances() {
            let Some(response) = instance.participant(attendee) else {
                continue;
            };
            let status = schedule_status(instance);

            let target = match instance.id() {
                InstanceId::Main => &mut entity.master.data,
                InstanceId::Recurrence(recurrence_id) => {
                    let master_scheduling = entity.master.data.scheduling.clone();
                    let Some(item) = reconciler
                        .find_occurrence_override(entity, recurrence_id)
                        .await
                        .caused_by(trc::location!())?
                    else {
                        // Attendees cannot add dates to the organizer's series.
                        trc::event!(
                            Scheduling(trc::SchedulingEvent::MessageIgnored),
                            Uid = incoming.uid.as_str(),
                            Details = recurrence_id,
                            Reason = "Not an occurrence",
                        );
                        continue;
                    };
                    if item.data.scheduling.is_empty() {
                        item.data.scheduling = master_scheduling;
                    }
                    &mut item.data
                }
            };

            changed |= apply_response(target, response, attendee, status)?;
            if entity_type == EntityType::Task {
                changed |= apply_progress(target, instance.data());
            }
        }

        Ok(changed)
    }
}

/// The single responding attendee, which must be the same on every
/// instance of the reply.
pub(crate) fn single_attendee(incoming: &CalendarEntity) -> Result<CalAddress, ItipError> {
    let mut attendee: Option<&CalAddress> = None;
    for instance in incoming.instances() {
        match instance.scheduling().participants.as_slice() {
            [participant] if attendee.is_none_or(|a| a == &participant.address) => {
                attendee = Some(&participant.address);
            }
            _ => return Err(ItipError::ExpectOneAttendee),
        }
    }
    attendee.cloned().ok_or(ItipError::ExpectOneAttendee)
}

fn schedule_status(instance: Instance<'_>) -> CompactString {
    instance
        .data()
        .request_status
        .first()
        .and_then(|status| status.split(';').next())
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map_or_else(|| CompactString::const_new(SCHEDULE_STATUS_SUCCESS), CompactString::from)
}

fn apply_response(
    target: &mut InstanceData,
    response: &Participant,
    attendee: &CalAddress,
    status: CompactString,
) -> Result<bool, ItipError> {
    let stored = target
        .scheduling
        .find_mut(attendee)
        .ok_or_else(|| ItipError::UnknownAttendee(attendee.clone()))?;

    let mut changed = false;
    if stored.response_differs(response) {
        let previous = std::mem::replace(stored, response.clone());
        stored.kind = previous.kind;
        stored.name = stored.name.take().or(previous.name);
        stored.role = stored.role.take().or(previous.role);
        stored.cu_type = stored.cu_type.take().or(previous.cu_type);
        changed = true;
    }
    stored.schedule_status = Some(status);

    let delegates = response
        .delegated_to
        .iter()
        .filter(|delegate| target.scheduling.find(delegate).is_none())
        .cloned()
        .collect::<Vec<_>>();
    for delegate in delegates {
        let mut participant = Participant::new(delegate);
        participant.delegated_from = vec![attendee.clone()];
        participant.role = response.role.clone();
        target.scheduling.participants.push(participant);
        changed = true;
    }

    Ok(changed)
}

fn apply_progress(target: &mut InstanceData, incoming: &InstanceData) -> bool {
    let mut changed = false;
    if incoming.percent_complete.is_some() && target.percent_complete != incoming.percent_complete
    {
        target.percent_complete = incoming.percent_complete;
        changed = true;
    }
    if incoming.completed.is_some() && target.completed != incoming.completed {
        target.completed = incoming.completed;
        changed = true;
    }
    changed
}

/// Replaces the voter's entries on every candidate the reply addresses and
/// rebuilds the stored item list.
fn apply_votes(
    entity: &mut CalendarEntity,
    incoming: &CalendarEntity,
    voter: &CalAddress,
) -> Result<bool, ItipError> {
    let Some(votes) = incoming.master.data.poll.as_ref() else {
        return Ok(false);
    };
    let data = &mut entity.master.data;
    let mut changed = false;

    if let Some(response) = incoming.master.data.scheduling.find(voter) {
        changed |= apply_response(
            data,
            response,
            voter,
            CompactString::const_new(SCHEDULE_STATUS_SUCCESS),
        )?;
    } else if data.scheduling.find(voter).is_none() {
        return Err(ItipError::UnknownAttendee(voter.clone()));
    }

    let poll = data.poll.get_or_insert_with(Default::default);
    for candidate in &votes.items {
        let vote = candidate
            .votes
            .iter()
            .find(|vote| vote.voter.as_ref().is_none_or(|v| v == voter));
        let idx = match poll.items.iter().position(|item| item.id == candidate.id) {
            Some(idx) => idx,
            None => {
                let mut item = candidate.clone();
                item.votes.clear();
                poll.items.push(item);
                changed = true;
                poll.items.len() - 1
            }
        };
        let item = &mut poll.items[idx];

        let previous = item
            .votes
            .iter()
            .position(|vote| vote.voter.as_ref() == Some(voter));
        match (vote, previous) {
            (Some(vote), Some(idx)) => {
                let vote = PollVote {
                    voter: Some(voter.clone()),
                    ..vote.clone()
                };
                if item.votes[idx] != vote {
                    item.votes[idx] = vote;
                    changed = true;
                }
            }
            (Some(vote), None) => {
                item.votes.push(PollVote {
                    voter: Some(voter.clone()),
                    ..vote.clone()
                });
                changed = true;
            }
            (None, _) => {}
        }
    }
    poll.items.sort_unstable_by_key(|item| item.id);

    Ok(changed)
}
