/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use ahash::AHashMap;

use crate::{
    entity::{CalAddress, CalendarEntity, InstanceData, InstanceId, Master, Override},
    itip::{ItipError, ItipMessage, SchedulingMethod},
    now,
};

/// Copy of `entity` limited to `instances`, carrying only the participant
/// records of `addresses`. Delegates travel in their `delegated_to` lists.
pub fn participant_copy(
    entity: &CalendarEntity,
    addresses: &[CalAddress],
    instances: &[InstanceId],
) -> CalendarEntity {
    let dtstamp = now();
    let filter = |data: &InstanceData, effective: &InstanceData| {
        let mut data = data.clone();
        data.scheduling.owner = effective.scheduling.owner.clone();
        data.scheduling.participants = effective
            .scheduling
            .participants
            .iter()
            .filter(|p| p.address.is_any_of(addresses))
            .cloned()
            .collect();
        data.request_status.clear();
        data.dtstamp = Some(dtstamp);
        data
    };

    let overrides = entity
        .overrides
        .values()
        .filter(|item| instances.contains(&InstanceId::Recurrence(item.recurrence_id)))
        .map(|item| {
            let effective = if item.data.scheduling.is_empty() {
                &entity.master.data
            } else {
                &item.data
            };
            (
                item.recurrence_id,
                Override {
                    recurrence_id: item.recurrence_id,
                    data: filter(&item.data, effective),
                },
            )
        })
        .collect::<AHashMap<_, _>>();

    CalendarEntity {
        uid: entity.uid.clone(),
        entity_type: entity.entity_type,
        collection_id: None,
        document_id: None,
        master: Master {
            data: filter(&entity.master.data, &entity.master.data),
            recurrence: entity.master.recurrence.clone(),
            suppressed: entity.master.suppressed || !instances.contains(&InstanceId::Main),
        },
        overrides,
    }
}

/// Builds the attendee response for `instances`, or for every instance
/// when none are given.
pub fn reply_message(
    entity: &CalendarEntity,
    addresses: &[CalAddress],
    instances: Option<&[InstanceId]>,
    method: SchedulingMethod,
) -> Result<ItipMessage, ItipError> {
    let organizer = entity
        .organizer()
        .map(|owner| owner.address.clone())
        .ok_or(ItipError::NothingToSend)?;
    if organizer.is_any_of(addresses) {
        return Err(ItipError::NotParticipant);
    }

    let instances = match instances {
        Some(instances) => instances.to_vec(),
        None => entity.instances().map(|instance| instance.id()).collect(),
    };
    let mut from = None;
    for id in &instances {
        let participant = entity
            .instance(*id)
            .and_then(|instance| instance.participant_any(addresses))
            .ok_or(ItipError::NotParticipant)?;
        from.get_or_insert_with(|| participant.address.clone());
    }

    Ok(ItipMessage {
        method,
        from: from.ok_or(ItipError::NothingToSend)?,
        from_organizer: false,
        to: vec![organizer],
        entity: participant_copy(entity, addresses, &instances),
    })
}

/// Full organizer copy, as sent to attendees on refresh or to delegates.
pub fn request_message(entity: &CalendarEntity, from: CalAddress, to: Vec<CalAddress>) -> ItipMessage {
    let mut copy = entity.clone();
    copy.collection_id = None;
    copy.document_id = None;
    let from_organizer = copy
        .organizer()
        .is_some_and(|owner| owner.address == from);
    let dtstamp = now();
    copy.master.data.dtstamp = Some(dtstamp);
    for item in copy.overrides.values_mut() {
        item.data.dtstamp = Some(dtstamp);
    }

    ItipMessage {
        method: SchedulingMethod::Request,
        from,
        from_organizer,
        to,
        entity: copy,
    }
}
