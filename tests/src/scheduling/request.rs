/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::{ICalendarParticipationStatus, ICalendarTransparency};
use scheduling::{
    config::SchedulingPreferences,
    entity::{CalDateTime, EntityType, Override},
    itip::{
        EntityChange, MessageProcessor, ProcessOutcome, SchedulingMethod,
        inbox::InboxDisposition, request::RequestProcessor,
    },
};

use super::*;

fn accepted_copy(entity: CalendarEntity, attendee: &str) -> CalendarEntity {
    let mut entity = entity;
    let data = &mut entity.master.data;
    if let Some(participant) = data.scheduling.find_mut(&address(attendee)) {
        participant.part_stat = ICalendarParticipationStatus::Accepted;
    }
    data.transparency = Some(ICalendarTransparency::Opaque);
    entity
}

#[tokio::test]
async fn new_invitation_is_added() {
    let scheduler = scheduler();
    let backend = &scheduler.backend;
    let invite = meeting("new-invite", days_ahead(3), &["bill@example.com"]);

    let outcome = scheduler
        .router()
        .route(&inbox(
            1,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            invite,
        ))
        .await;
    assert!(outcome.result.error.is_none());
    assert_eq!(outcome.result.outcome, ProcessOutcome::Added);
    // Bill still owes an answer, so the message stays as a notification.
    assert!(!outcome.result.remove_inbox_entry);
    assert!(!outcome.result.attendee_accepting);
    assert_eq!(outcome.disposition, InboxDisposition::Processed);
    assert_eq!(*backend.inbox_processed.lock(), vec![1]);
    assert!(backend.inbox_deleted.lock().is_empty());

    let stored = backend.stored(BILL, "new-invite").unwrap();
    assert_eq!(stored.collection_id, Some(100 + BILL));
    assert_eq!(outcome.document_id, stored.document_id);
    assert!(
        stored
            .master
            .data
            .scheduling
            .find(&address("bill@example.com"))
            .unwrap()
            .is_needs_action()
    );
    assert_eq!(
        stored.master.data.transparency,
        Some(ICalendarTransparency::Transparent)
    );
    assert!(backend.sent().is_empty());
}

#[tokio::test]
async fn new_invitation_without_pending_reply() {
    let scheduler = scheduler();
    let mut invite = meeting("no-rsvp", days_ahead(3), &["bill@example.com"]);
    invite
        .master
        .data
        .scheduling
        .find_mut(&address("bill@example.com"))
        .unwrap()
        .expect_reply = false;
    let message = inbox(
        2,
        BILL,
        SchedulingMethod::Request,
        "jane@example.com",
        invite,
    );

    let principal = scheduler.backend.principal(BILL);
    let result = RequestProcessor::new(&scheduler)
        .process(&principal, &message)
        .await;
    assert_eq!(result.outcome, ProcessOutcome::Added);
    assert!(result.remove_inbox_entry);

    // The scheduling assistant keeps every invitation visible.
    scheduler.backend.set_preferences(
        BILL,
        SchedulingPreferences {
            scheduling_assistant: true,
            ..Default::default()
        },
    );
    let principal = scheduler.backend.principal(BILL);
    let result = RequestProcessor::new(&scheduler)
        .process(&principal, &message)
        .await;
    assert_eq!(result.outcome, ProcessOutcome::Added);
    assert!(!result.remove_inbox_entry);
}

#[tokio::test]
async fn missing_default_collection() {
    let scheduler = scheduler();
    scheduler
        .backend
        .collections
        .lock()
        .remove(&(BILL, EntityType::Task));
    let mut task = meeting("todo", days_ahead(2), &["bill@example.com"]);
    task.entity_type = EntityType::Task;

    let outcome = scheduler
        .router()
        .route(&inbox(
            3,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            task,
        ))
        .await;
    assert_eq!(outcome.result.code(), Some("schedulingNoCalendar"));
    assert_eq!(outcome.disposition, InboxDisposition::Retained);
    assert!(scheduler.backend.stored(BILL, "todo").is_none());
    assert!(scheduler.backend.inbox_deleted.lock().is_empty());
    assert!(scheduler.backend.inbox_processed.lock().is_empty());
}

#[tokio::test]
async fn missing_uid_or_start() {
    let scheduler = scheduler();
    let principal = scheduler.backend.principal(BILL);
    let processor = RequestProcessor::new(&scheduler);

    let invite = meeting("", days_ahead(2), &["bill@example.com"]);
    let message = inbox(4, BILL, SchedulingMethod::Request, "jane@example.com", invite);
    assert_eq!(
        processor.process(&principal, &message).await.code(),
        Some("missingUid")
    );

    let mut invite = meeting("no-start", days_ahead(2), &["bill@example.com"]);
    invite.master.data.start = None;
    let message = inbox(5, BILL, SchedulingMethod::Request, "jane@example.com", invite);
    assert_eq!(
        processor.process(&principal, &message).await.code(),
        Some("missingStart")
    );
}

#[tokio::test]
async fn repeated_request_is_idempotent() {
    let scheduler = scheduler();
    let start = days_ahead(3);
    let mut invite = weekly(meeting("repeat", start, &["bill@example.com"]), 4);
    let mut moved = Override {
        recurrence_id: start + WEEK,
        data: invite.master.data.clone(),
    };
    moved.data.summary = Some("Quarterly planning (room B)".into());
    moved.data.start = Some(CalDateTime::utc(start + WEEK + 2 * HOUR));
    invite.overrides.insert(moved.recurrence_id, moved);

    let message = inbox(
        6,
        BILL,
        SchedulingMethod::Request,
        "jane@example.com",
        invite,
    );
    let first = scheduler.router().route(&message).await;
    assert_eq!(first.result.outcome, ProcessOutcome::Added);
    let after_first = scheduler.backend.stored(BILL, "repeat").unwrap();
    assert_eq!(after_first.overrides.len(), 1);

    let second = scheduler.router().route(&message).await;
    assert!(second.result.error.is_none());
    assert_eq!(second.result.outcome, ProcessOutcome::NoAction);
    assert_eq!(second.result.change, EntityChange::None);

    let after_second = scheduler.backend.stored(BILL, "repeat").unwrap();
    assert_eq!(after_second, after_first);
    assert!(scheduler.backend.updates.lock().is_empty());
}

#[tokio::test]
async fn significant_update() {
    let scheduler = scheduler();
    let start = days_ahead(5);
    scheduler.backend.store(
        BILL,
        accepted_copy(
            meeting("update", start, &["bill@example.com", "mike@example.com"]),
            "bill@example.com",
        ),
    );

    // Moving the meeting and inviting lisa has to be shown to bill.
    let mut update = accepted_copy(
        meeting("update", start + HOUR, &["bill@example.com", "mike@example.com"]),
        "bill@example.com",
    );
    update.master.data.transparency = None;
    update.master.data.sequence = 1;
    update
        .master
        .data
        .scheduling
        .participants
        .push(Participant::new(address("lisa@example.com")));

    let outcome = scheduler
        .router()
        .route(&inbox(
            7,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            update,
        ))
        .await;
    assert_eq!(outcome.result.outcome, ProcessOutcome::Updated);
    assert!(!outcome.result.remove_inbox_entry);
    assert!(outcome.result.attendee_accepting);
    assert_eq!(outcome.disposition, InboxDisposition::Processed);

    let stored = scheduler.backend.stored(BILL, "update").unwrap();
    assert_eq!(stored.master.data.start, Some(CalDateTime::utc(start + HOUR)));
    assert_eq!(stored.master.data.sequence, 1);
    assert_eq!(stored.master.data.scheduling.participants.len(), 4);
    // Bill's own answer and free/busy choice survive the update.
    assert_eq!(
        stored.master.data.transparency,
        Some(ICalendarTransparency::Opaque)
    );
    assert_eq!(
        scheduler.backend.updates.lock()[0],
        StoredUpdate {
            account_id: BILL,
            uid: "update".into(),
            suppress_notifications: true,
            on_behalf_of: None,
        }
    );
}

#[tokio::test]
async fn cosmetic_update_removes_inbox_entry() {
    let scheduler = scheduler();
    let start = days_ahead(5);
    scheduler.backend.store(
        BILL,
        accepted_copy(
            meeting("cosmetic", start, &["bill@example.com", "mike@example.com"]),
            "bill@example.com",
        ),
    );

    // Only mike's answer and the sequence changed.
    let mut update = accepted_copy(
        meeting("cosmetic", start, &["bill@example.com", "mike@example.com"]),
        "bill@example.com",
    );
    update.master.data.transparency = None;
    update.master.data.sequence = 1;
    update
        .master
        .data
        .scheduling
        .find_mut(&address("mike@example.com"))
        .unwrap()
        .part_stat = ICalendarParticipationStatus::Declined;

    let outcome = scheduler
        .router()
        .route(&inbox(
            8,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            update,
        ))
        .await;
    assert_eq!(outcome.result.outcome, ProcessOutcome::Updated);
    assert!(outcome.result.remove_inbox_entry);
    assert_eq!(outcome.disposition, InboxDisposition::Deleted);
    assert_eq!(*scheduler.backend.inbox_deleted.lock(), vec![8]);
    assert_eq!(
        scheduler
            .backend
            .stored(BILL, "cosmetic")
            .unwrap()
            .master
            .data
            .scheduling
            .find(&address("mike@example.com"))
            .unwrap()
            .part_stat,
        ICalendarParticipationStatus::Declined
    );
}

#[tokio::test]
async fn out_of_sequence_request_is_ignored() {
    let scheduler = scheduler();
    let start = days_ahead(5);
    let mut stored = meeting("stale", start, &["bill@example.com"]);
    stored.master.data.sequence = 3;
    let stored = scheduler.backend.store(BILL, stored);

    let mut old = meeting("stale", start - DAY, &["bill@example.com"]);
    old.master.data.sequence = 2;
    let outcome = scheduler
        .router()
        .route(&inbox(
            9,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            old,
        ))
        .await;
    assert_eq!(outcome.result.outcome, ProcessOutcome::Ignored);
    assert_eq!(outcome.disposition, InboxDisposition::Deleted);
    assert_eq!(scheduler.backend.stored(BILL, "stale").unwrap(), stored);
}

#[tokio::test]
async fn new_exdate_becomes_cancelled_override() {
    let scheduler = scheduler();
    let start = days_ahead(4);
    let series = accepted_copy(
        weekly(meeting("exdate-added", start, &["bill@example.com"]), 4),
        "bill@example.com",
    );
    scheduler.backend.store(BILL, series.clone());

    let mut update = series.clone();
    update.master.data.sequence = 1;
    update
        .master
        .recurrence
        .exdates
        .push(CalDateTime::utc(start + WEEK));
    let message = inbox(
        10,
        BILL,
        SchedulingMethod::Request,
        "jane@example.com",
        update,
    );

    let outcome = scheduler.router().route(&message).await;
    assert_eq!(outcome.result.outcome, ProcessOutcome::Updated);
    assert!(!outcome.result.remove_inbox_entry);

    let stored = scheduler.backend.stored(BILL, "exdate-added").unwrap();
    assert_eq!(stored.overrides.len(), 1);
    let cancelled = &stored.overrides[&(start + WEEK)];
    assert!(cancelled.data.is_cancelled());
    assert_eq!(
        cancelled.data.start,
        Some(CalDateTime::utc(start + WEEK))
    );
    assert!(stored.master.recurrence.exdates.is_empty());

    // Applying the same message again changes nothing.
    let again = scheduler.router().route(&message).await;
    assert_eq!(again.result.outcome, ProcessOutcome::NoAction);
    assert_eq!(
        scheduler.backend.stored(BILL, "exdate-added").unwrap(),
        stored
    );
}

#[tokio::test]
async fn dropped_exdate_becomes_cancelled_override() {
    let scheduler = scheduler();
    let start = days_ahead(4);
    let mut series = accepted_copy(
        weekly(meeting("exdate-removed", start, &["bill@example.com"]), 4),
        "bill@example.com",
    );
    series
        .master
        .recurrence
        .exdates
        .push(CalDateTime::utc(start + 2 * WEEK));
    scheduler.backend.store(BILL, series.clone());

    let mut update = series.clone();
    update.master.data.sequence = 1;
    update.master.recurrence.exdates.clear();
    let outcome = scheduler
        .router()
        .route(&inbox(
            11,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            update,
        ))
        .await;
    assert_eq!(outcome.result.outcome, ProcessOutcome::Updated);

    let stored = scheduler.backend.stored(BILL, "exdate-removed").unwrap();
    assert!(stored.master.recurrence.exdates.is_empty());
    assert!(stored.overrides[&(start + 2 * WEEK)].data.is_cancelled());
}

#[tokio::test]
async fn override_only_update() {
    let scheduler = scheduler();
    let start = days_ahead(4);
    let series = accepted_copy(
        weekly(meeting("partial", start, &["bill@example.com"]), 4),
        "bill@example.com",
    );
    scheduler.backend.store(BILL, series.clone());

    // Organizer sends just the third occurrence, without its times.
    let mut update = series.clone();
    update.master.suppressed = true;
    let mut item = Override::new(start + 2 * WEEK);
    item.data.summary = Some("Quarterly planning (remote)".into());
    item.data.sequence = 1;
    item.data.scheduling = series.master.data.scheduling.clone();
    update.overrides.insert(item.recurrence_id, item);

    let outcome = scheduler
        .router()
        .route(&inbox(
            12,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            update,
        ))
        .await;
    assert_eq!(outcome.result.outcome, ProcessOutcome::Updated);

    let stored = scheduler.backend.stored(BILL, "partial").unwrap();
    assert_eq!(stored.master, series.master);
    let item = &stored.overrides[&(start + 2 * WEEK)];
    assert_eq!(item.data.summary.as_deref(), Some("Quarterly planning (remote)"));
    assert_eq!(item.data.start, Some(CalDateTime::utc(start + 2 * WEEK)));
    assert_eq!(item.data.end, EventEnd::Duration(HOUR));
}

#[tokio::test]
async fn override_without_scheduling_inherits_it() {
    let scheduler = scheduler();
    let start = days_ahead(4);
    let series = accepted_copy(
        weekly(meeting("inherited", start, &["bill@example.com"]), 4),
        "bill@example.com",
    );
    scheduler.backend.store(BILL, series.clone());

    // The exception names no organizer or attendees of its own.
    let mut update = series.clone();
    update.master.suppressed = true;
    let mut item = Override::new(start + 2 * WEEK);
    item.data.summary = Some("Moved to the big room".into());
    item.data.sequence = 1;
    update.overrides.insert(item.recurrence_id, item);

    let outcome = scheduler
        .router()
        .route(&inbox(
            13,
            BILL,
            SchedulingMethod::Request,
            "jane@example.com",
            update,
        ))
        .await;
    assert!(outcome.result.error.is_none());
    assert_eq!(outcome.result.outcome, ProcessOutcome::Updated);

    let stored = scheduler.backend.stored(BILL, "inherited").unwrap();
    let item = &stored.overrides[&(start + 2 * WEEK)];
    assert_eq!(item.data.summary.as_deref(), Some("Moved to the big room"));
    assert_eq!(
        item.data.scheduling.owner.as_ref().map(|owner| &owner.address),
        Some(&address("jane@example.com"))
    );
    assert!(
        item.data
            .scheduling
            .find(&address("bill@example.com"))
            .is_some()
    );
}
