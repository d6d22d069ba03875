/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::ICalendarParticipationStatus;
use scheduling::{
    entity::InstanceId,
    itip::{ProcessOutcome, SchedulingMethod, attendee::AttendeeUpdate},
};

use super::*;

/// Bill's copy of jane's meeting with bill's local answer applied.
fn answered(uid: &str, part_stat: ICalendarParticipationStatus) -> CalendarEntity {
    let mut entity = meeting(uid, days_ahead(8), &["bill@example.com", "mike@example.com"]);
    entity
        .master
        .data
        .scheduling
        .find_mut(&address("bill@example.com"))
        .unwrap()
        .part_stat = part_stat;
    entity
}

fn owner_status(entity: &CalendarEntity) -> Option<String> {
    entity
        .master
        .data
        .scheduling
        .owner
        .as_ref()
        .and_then(|owner| owner.schedule_status.as_ref())
        .map(|status| status.to_string())
}

#[tokio::test]
async fn reply_goes_to_organizer() {
    let scheduler = scheduler();
    let principal = scheduler.backend.principal(BILL);
    let entity = scheduler.backend.store(
        BILL,
        answered("a-reply", ICalendarParticipationStatus::Accepted),
    );

    let result = scheduler
        .attendee_updates()
        .process(&principal, entity, AttendeeUpdate::reply())
        .await;
    assert_eq!(result.code(), None);
    assert_eq!(result.outcome, ProcessOutcome::Sent);
    assert!(result.attendee_accepting);

    let sent = scheduler.backend.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, SchedulingMethod::Reply);
    assert_eq!(sent[0].to, vec![address("jane@example.com")]);
    let participants = &sent[0].entity.master.data.scheduling.participants;
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].address, address("bill@example.com"));
    assert_eq!(
        participants[0].part_stat,
        ICalendarParticipationStatus::Accepted
    );

    let stored = scheduler.backend.stored(BILL, "a-reply").unwrap();
    assert_eq!(owner_status(&stored).as_deref(), Some("1.2"));
    assert!(scheduler.backend.updates.lock()[0].suppress_notifications);
}

#[tokio::test]
async fn delegation_invites_delegate() {
    let scheduler = scheduler();
    let principal = scheduler.backend.principal(BILL);
    let entity = scheduler.backend.store(
        BILL,
        answered("a-delegate", ICalendarParticipationStatus::NeedsAction),
    );

    let result = scheduler
        .attendee_updates()
        .process(
            &principal,
            entity,
            AttendeeUpdate::reply().with_delegate(address("lisa@example.com")),
        )
        .await;
    assert_eq!(result.code(), None);

    let sent = scheduler.backend.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].method, SchedulingMethod::Reply);
    assert_eq!(sent[0].to, vec![address("jane@example.com")]);
    assert_eq!(sent[0].entity.master.data.scheduling.participants.len(), 1);
    assert_eq!(sent[1].method, SchedulingMethod::Request);
    assert!(!sent[1].from_organizer);
    assert_eq!(sent[1].from, address("bill@example.com"));
    assert_eq!(sent[1].to, vec![address("lisa@example.com")]);

    let stored = scheduler.backend.stored(BILL, "a-delegate").unwrap();
    let scheduling = &stored.master.data.scheduling;
    let bill = scheduling.find(&address("bill@example.com")).unwrap();
    assert_eq!(bill.part_stat, ICalendarParticipationStatus::Delegated);
    assert_eq!(bill.delegated_to, vec![address("lisa@example.com")]);
    assert_eq!(
        scheduling
            .find(&address("lisa@example.com"))
            .unwrap()
            .delegated_from,
        vec![address("bill@example.com")]
    );
}

#[tokio::test]
async fn delegation_reply_reaches_organizer() {
    let scheduler = scheduler();
    let principal = scheduler.backend.principal(BILL);
    scheduler.backend.store(
        JANE,
        meeting(
            "a-relay",
            days_ahead(8),
            &["bill@example.com", "mike@example.com"],
        ),
    );
    let entity = scheduler.backend.store(
        BILL,
        answered("a-relay", ICalendarParticipationStatus::NeedsAction),
    );

    let result = scheduler
        .attendee_updates()
        .process(
            &principal,
            entity,
            AttendeeUpdate::reply().with_delegate(address("lisa@example.com")),
        )
        .await;
    assert_eq!(result.code(), None);
    let reply = scheduler.backend.sent().remove(0);
    assert_eq!(reply.method, SchedulingMethod::Reply);

    let outcome = scheduler
        .router()
        .route(&inbox(
            30,
            JANE,
            SchedulingMethod::Reply,
            "bill@example.com",
            reply.entity,
        ))
        .await;
    assert_eq!(outcome.result.code(), None);
    assert_eq!(outcome.result.outcome, ProcessOutcome::Updated);

    let organizer = scheduler.backend.stored(JANE, "a-relay").unwrap();
    let scheduling = &organizer.master.data.scheduling;
    assert_eq!(
        scheduling
            .find(&address("bill@example.com"))
            .unwrap()
            .part_stat,
        ICalendarParticipationStatus::Delegated
    );
    let lisa = scheduling.find(&address("lisa@example.com")).unwrap();
    assert_eq!(lisa.delegated_from, vec![address("bill@example.com")]);
}

#[tokio::test]
async fn instance_counter_proposal() {
    let scheduler = scheduler();
    let principal = scheduler.backend.principal(BILL);
    let start = days_ahead(8);
    let mut entity = weekly(
        answered("a-counter", ICalendarParticipationStatus::Tentative),
        3,
    );
    let mut item = scheduling::entity::Override::new(start + WEEK);
    item.data = entity.master.data.clone();
    item.data.start = Some(CalDateTime::utc(start + WEEK + HOUR));
    entity.overrides.insert(item.recurrence_id, item);
    let entity = scheduler.backend.store(BILL, entity);

    let result = scheduler
        .attendee_updates()
        .process(
            &principal,
            entity,
            AttendeeUpdate::counter().with_instances(vec![InstanceId::Recurrence(start + WEEK)]),
        )
        .await;
    assert_eq!(result.code(), None);

    let sent = scheduler.backend.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, SchedulingMethod::Counter);
    assert!(sent[0].entity.master.suppressed);
    assert_eq!(
        sent[0].entity.overrides.keys().copied().collect::<Vec<_>>(),
        vec![start + WEEK]
    );
}

#[tokio::test]
async fn outbound_rejections() {
    let scheduler = scheduler();

    // Mike's copy does not list him.
    let mike = scheduler.backend.principal(MIKE);
    let result = scheduler
        .attendee_updates()
        .process(
            &mike,
            meeting("a-stranger", days_ahead(8), &["bill@example.com"]),
            AttendeeUpdate::reply(),
        )
        .await;
    assert_eq!(result.code(), Some("schedulingNotParticipant"));

    // The organizer has nobody to reply to.
    let jane = scheduler.backend.principal(JANE);
    let result = scheduler
        .attendee_updates()
        .process(
            &jane,
            meeting("a-organizer", days_ahead(8), &["bill@example.com"]),
            AttendeeUpdate::reply(),
        )
        .await;
    assert_eq!(result.code(), Some("schedulingNotParticipant"));

    // Delegating to oneself.
    let bill = scheduler.backend.principal(BILL);
    let result = scheduler
        .attendee_updates()
        .process(
            &bill,
            answered("a-self", ICalendarParticipationStatus::NeedsAction),
            AttendeeUpdate::reply().with_delegate(address("bill@example.com")),
        )
        .await;
    assert_eq!(result.code(), Some("schedulingNothingToSend"));

    // Only responses travel from attendees.
    let result = scheduler
        .attendee_updates()
        .process(
            &bill,
            answered("a-method", ICalendarParticipationStatus::Accepted),
            AttendeeUpdate {
                method: SchedulingMethod::Cancel,
                ..AttendeeUpdate::reply()
            },
        )
        .await;
    assert_eq!(result.code(), Some("schedulingBadMethod"));
    assert!(scheduler.backend.sent().is_empty());
}

#[tokio::test]
async fn failed_delivery_is_recorded() {
    let scheduler = scheduler();
    let principal = scheduler.backend.principal(BILL);
    let entity = scheduler.backend.store(
        BILL,
        answered("a-fail", ICalendarParticipationStatus::Declined),
    );
    scheduler.backend.fail_send.store(true, Ordering::Relaxed);

    let result = scheduler
        .attendee_updates()
        .process(&principal, entity, AttendeeUpdate::reply())
        .await;
    assert_eq!(result.code(), Some("schedulingInternalError"));

    let stored = scheduler.backend.stored(BILL, "a-fail").unwrap();
    assert_eq!(owner_status(&stored).as_deref(), Some("5.1"));
}
