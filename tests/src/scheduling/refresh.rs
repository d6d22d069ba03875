/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::{ICalendarParticipationStatus, ICalendarStatus};
use scheduling::itip::{ProcessOutcome, SchedulingMethod, inbox::InboxDisposition};

use super::*;

fn refresh_request(entity: &CalendarEntity, attendee: &str) -> CalendarEntity {
    reply_from(entity, attendee, ICalendarParticipationStatus::NeedsAction)
}

#[tokio::test]
async fn refresh_resends_organizer_copy() {
    let scheduler = scheduler();
    let stored = scheduler.backend.store(
        JANE,
        meeting(
            "f-send",
            days_ahead(6),
            &["bill@example.com", "mike@example.com"],
        ),
    );

    let outcome = scheduler
        .router()
        .route(&inbox(
            40,
            JANE,
            SchedulingMethod::Refresh,
            "bill@example.com",
            refresh_request(&stored, "bill@example.com"),
        ))
        .await;
    assert_eq!(outcome.result.code(), None);
    assert_eq!(outcome.result.outcome, ProcessOutcome::Sent);
    assert_eq!(outcome.disposition, InboxDisposition::Deleted);

    let sent = scheduler.backend.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, SchedulingMethod::Request);
    assert!(sent[0].from_organizer);
    assert_eq!(sent[0].from, address("jane@example.com"));
    assert_eq!(sent[0].to, vec![address("bill@example.com")]);
    assert_eq!(sent[0].entity.master.data.scheduling.participants.len(), 3);
    assert_eq!(sent[0].entity.document_id, None);
    assert!(scheduler.backend.updates.lock().is_empty());
}

#[tokio::test]
async fn refresh_with_two_attendees_sends_nothing() {
    let scheduler = scheduler();
    let stored = scheduler.backend.store(
        JANE,
        meeting(
            "f-two",
            days_ahead(6),
            &["bill@example.com", "mike@example.com"],
        ),
    );
    let mut refresh = refresh_request(&stored, "bill@example.com");
    refresh
        .master
        .data
        .scheduling
        .participants
        .push(Participant::new(address("mike@example.com")));

    let outcome = scheduler
        .router()
        .route(&inbox(
            41,
            JANE,
            SchedulingMethod::Refresh,
            "bill@example.com",
            refresh,
        ))
        .await;
    assert_eq!(outcome.result.code(), Some("schedulingExpectOneAttendee"));
    assert_eq!(outcome.disposition, InboxDisposition::Retained);
    assert!(scheduler.backend.sent().is_empty());
}

#[tokio::test]
async fn failed_resend_keeps_inbox_entry() {
    let scheduler = scheduler();
    let stored = scheduler.backend.store(
        JANE,
        meeting("f-fail", days_ahead(6), &["bill@example.com"]),
    );
    scheduler.backend.fail_send.store(true, Ordering::Relaxed);

    let outcome = scheduler
        .router()
        .route(&inbox(
            42,
            JANE,
            SchedulingMethod::Refresh,
            "bill@example.com",
            refresh_request(&stored, "bill@example.com"),
        ))
        .await;
    assert_eq!(outcome.disposition, InboxDisposition::Retained);
    assert!(scheduler.backend.inbox_deleted.lock().is_empty());
    assert!(scheduler.backend.inbox_processed.lock().is_empty());
}

#[tokio::test]
async fn refresh_is_ignored_unless_organizing() {
    let scheduler = scheduler();
    let stored = scheduler.backend.store(
        JANE,
        meeting("f-ignored", days_ahead(6), &["bill@example.com"]),
    );

    // Bill only holds an attendee copy.
    scheduler.backend.store(BILL, stored.clone());
    let outcome = scheduler
        .router()
        .route(&inbox(
            43,
            BILL,
            SchedulingMethod::Refresh,
            "mike@example.com",
            refresh_request(&stored, "mike@example.com"),
        ))
        .await;
    assert_eq!(outcome.result.code(), None);
    assert!(outcome.result.no_inbox_change);
    assert_eq!(outcome.disposition, InboxDisposition::Retained);

    // Cancelled meetings are not resent.
    let mut cancelled = stored.clone();
    cancelled.master.data.status = Some(ICalendarStatus::Cancelled);
    scheduler.backend.store(JANE, cancelled);
    let outcome = scheduler
        .router()
        .route(&inbox(
            44,
            JANE,
            SchedulingMethod::Refresh,
            "bill@example.com",
            refresh_request(&stored, "bill@example.com"),
        ))
        .await;
    assert!(outcome.result.no_inbox_change);
    assert!(scheduler.backend.sent().is_empty());
}

#[tokio::test]
async fn refresh_from_stranger_is_rejected() {
    let scheduler = scheduler();
    let stored = scheduler.backend.store(
        JANE,
        meeting("f-stranger", days_ahead(6), &["bill@example.com"]),
    );

    let outcome = scheduler
        .router()
        .route(&inbox(
            45,
            JANE,
            SchedulingMethod::Refresh,
            "lisa@example.com",
            refresh_request(&stored, "lisa@example.com"),
        ))
        .await;
    assert_eq!(outcome.result.code(), Some("schedulingUnknownAttendee"));
    assert!(scheduler.backend.sent().is_empty());
}
