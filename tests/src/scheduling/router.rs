/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::time::Duration;

use calcard::icalendar::ICalendarParticipationStatus;
use scheduling::{
    config::NotificationPreference,
    itip::{
        ProcessOutcome, SchedulingMethod,
        inbox::{InboxDisposition, InboxRouter},
    },
};

use super::*;

fn notify(scheduler: &Scheduler<MemoryBackend>, account_id: u32, notify: NotificationPreference) {
    scheduler.backend.set_preferences(
        account_id,
        SchedulingPreferences {
            notify,
            ..Default::default()
        },
    );
}

#[test]
fn method_support() {
    for entity_type in [EntityType::Event, EntityType::Task, EntityType::Poll] {
        for method in [
            SchedulingMethod::Request,
            SchedulingMethod::Reply,
            SchedulingMethod::Cancel,
        ] {
            assert!(InboxRouter::<MemoryBackend>::is_supported(method, entity_type));
        }
        for method in [
            SchedulingMethod::Add,
            SchedulingMethod::DeclineCounter,
            SchedulingMethod::Publish,
        ] {
            assert!(!InboxRouter::<MemoryBackend>::is_supported(method, entity_type));
        }
    }
    for method in [SchedulingMethod::Refresh, SchedulingMethod::Counter] {
        assert!(InboxRouter::<MemoryBackend>::is_supported(method, EntityType::Event));
        assert!(!InboxRouter::<MemoryBackend>::is_supported(method, EntityType::Poll));
    }
    assert!(InboxRouter::<MemoryBackend>::is_supported(
        SchedulingMethod::PollStatus,
        EntityType::Poll
    ));
    assert!(!InboxRouter::<MemoryBackend>::is_supported(
        SchedulingMethod::PollStatus,
        EntityType::Task
    ));
}

#[tokio::test]
async fn unsupported_method_is_retained() {
    let scheduler = scheduler();
    let outcome = scheduler
        .router()
        .route(&inbox(
            50,
            BILL,
            SchedulingMethod::Add,
            "jane@example.com",
            meeting("u-add", days_ahead(2), &["bill@example.com"]),
        ))
        .await;
    assert_eq!(outcome.result.code(), Some("schedulingBadMethod"));
    assert_eq!(outcome.disposition, InboxDisposition::Retained);
    assert_eq!(scheduler.backend.stored(BILL, "u-add"), None);
    assert!(scheduler.backend.inbox_deleted.lock().is_empty());
    assert!(scheduler.backend.inbox_processed.lock().is_empty());
}

#[tokio::test]
async fn unknown_account_is_an_internal_error() {
    let scheduler = scheduler();
    let outcome = scheduler
        .router()
        .route(&inbox(
            51,
            99,
            SchedulingMethod::Request,
            "jane@example.com",
            meeting("u-nobody", days_ahead(2), &["nobody@example.com"]),
        ))
        .await;
    assert_eq!(outcome.result.code(), Some("schedulingInternalError"));
    assert_eq!(outcome.disposition, InboxDisposition::Retained);
}

#[tokio::test]
async fn notification_preference_decides_disposition() {
    let scheduler = scheduler();
    notify(&scheduler, JANE, NotificationPreference::UnlessAccepted);
    notify(&scheduler, MIKE, NotificationPreference::Never);

    let stored = scheduler.backend.store(
        JANE,
        meeting(
            "n-meeting",
            days_ahead(2),
            &["bill@example.com", "mike@example.com"],
        ),
    );

    let accepted = scheduler
        .router()
        .route(&inbox(
            52,
            JANE,
            SchedulingMethod::Reply,
            "bill@example.com",
            reply_from(
                &stored,
                "bill@example.com",
                ICalendarParticipationStatus::Accepted,
            ),
        ))
        .await;
    assert_eq!(accepted.disposition, InboxDisposition::Deleted);

    let declined = scheduler
        .router()
        .route(&inbox(
            53,
            JANE,
            SchedulingMethod::Reply,
            "mike@example.com",
            reply_from(
                &stored,
                "mike@example.com",
                ICalendarParticipationStatus::Declined,
            ),
        ))
        .await;
    assert_eq!(declined.disposition, InboxDisposition::Processed);

    // An invitation that still owes a reply is dropped when mike never
    // wants to see processed messages.
    let invited = scheduler
        .router()
        .route(&inbox(
            54,
            MIKE,
            SchedulingMethod::Request,
            "jane@example.com",
            meeting("n-invite", days_ahead(2), &["mike@example.com"]),
        ))
        .await;
    assert!(!invited.result.remove_inbox_entry);
    assert_eq!(invited.disposition, InboxDisposition::Deleted);

    assert_eq!(scheduler.backend.inbox_deleted.lock().as_slice(), &[52, 54]);
    assert_eq!(scheduler.backend.inbox_processed.lock().as_slice(), &[53]);
}

#[tokio::test]
async fn principals_come_from_the_cache() {
    let scheduler = scheduler();
    for (id, uid) in [(55, "d-one"), (56, "d-two"), (57, "d-three")] {
        scheduler
            .router()
            .route(&inbox(
                id,
                BILL,
                SchedulingMethod::Request,
                "jane@example.com",
                meeting(uid, days_ahead(2), &["bill@example.com"]),
            ))
            .await;
    }
    assert_eq!(scheduler.backend.principal_lookups.load(Ordering::Relaxed), 1);

    let backend = &scheduler.backend;
    assert_eq!(
        scheduler
            .directory
            .calendar_address_to_principal(backend, &address("mailto:mike@example.com"))
            .await
            .unwrap(),
        Some(MIKE)
    );
    assert_eq!(
        scheduler
            .directory
            .principal_to_calendar_address(backend, JANE)
            .await
            .unwrap(),
        Some(address("jane@example.com"))
    );

    scheduler.directory.invalidate(BILL);
    scheduler
        .directory
        .principal(backend, BILL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(scheduler.backend.principal_lookups.load(Ordering::Relaxed), 3);
}

#[tokio::test]
async fn processing_waits_for_entity_lock() {
    let scheduler = scheduler();
    let message = inbox(
        58,
        BILL,
        SchedulingMethod::Request,
        "jane@example.com",
        meeting("l-locked", days_ahead(2), &["bill@example.com"]),
    );

    let guard = scheduler.lock_entity(BILL, "l-locked").await;
    let router = scheduler.router();
    let route = router.route(&message);
    tokio::pin!(route);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), &mut route)
            .await
            .is_err()
    );
    assert_eq!(scheduler.backend.stored(BILL, "l-locked"), None);

    drop(guard);
    let outcome = route.await;
    assert_eq!(outcome.result.outcome, ProcessOutcome::Added);
    assert!(scheduler.backend.stored(BILL, "l-locked").is_some());
}

#[tokio::test]
async fn concurrent_deliveries_create_once() {
    let scheduler = scheduler();
    let invite = meeting("l-twice", days_ahead(2), &["bill@example.com"]);
    let first = inbox(
        59,
        BILL,
        SchedulingMethod::Request,
        "jane@example.com",
        invite.clone(),
    );
    let second = inbox(60, BILL, SchedulingMethod::Request, "jane@example.com", invite);

    let router = scheduler.router();
    let (first, second) = futures::join!(router.route(&first), router.route(&second));
    let mut outcomes = [first.result.outcome, second.result.outcome];
    outcomes.sort_by_key(|outcome| *outcome != ProcessOutcome::Added);
    assert_eq!(outcomes, [ProcessOutcome::Added, ProcessOutcome::NoAction]);
    assert_eq!(first.result.code(), None);
    assert_eq!(second.result.code(), None);
}

#[tokio::test]
async fn counter_proposal_is_kept_for_the_organizer() {
    let scheduler = scheduler();
    let stored = scheduler.backend.store(
        JANE,
        meeting("k-counter", days_ahead(2), &["bill@example.com"]),
    );
    let mut proposal = reply_from(
        &stored,
        "bill@example.com",
        ICalendarParticipationStatus::Tentative,
    );
    proposal.master.data.start = Some(CalDateTime::utc(days_ahead(3)));

    let outcome = scheduler
        .router()
        .route(&inbox(
            61,
            JANE,
            SchedulingMethod::Counter,
            "bill@example.com",
            proposal.clone(),
        ))
        .await;
    assert_eq!(outcome.result.code(), None);
    assert_eq!(outcome.disposition, InboxDisposition::Processed);
    assert_eq!(scheduler.backend.stored(JANE, "k-counter").unwrap(), stored);

    proposal.master.data.scheduling.participants[0] = Participant::new(address("lisa@example.com"));
    let outcome = scheduler
        .router()
        .route(&inbox(
            62,
            JANE,
            SchedulingMethod::Counter,
            "lisa@example.com",
            proposal,
        ))
        .await;
    assert_eq!(outcome.result.code(), Some("schedulingUnknownAttendee"));
}
