/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::{ICalendarParticipationStatus, ICalendarTransparency};
use futures::future::join_all;
use trc::AddContext;

use crate::{
    Scheduler,
    backend::{Principal, SchedulingBackend},
    entity::{CalAddress, CalendarEntity, InstanceData, SchedulingInfo},
    now,
};

const YEAR: i64 = 365 * 86400;

/// Accepts or declines an invitation on behalf of its recipient.
pub struct AutoResponder<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
    principal: &'x Principal,
    double_booking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoResponse {
    /// Decision applied to the master instance.
    pub accepted: bool,
    pub instances: usize,
    pub declined_instances: usize,
    pub overrides_created: usize,
}

struct Window {
    recurrence_id: i64,
    start: i64,
    end: i64,
}

impl<'x, B: SchedulingBackend> AutoResponder<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>, principal: &'x Principal) -> Self {
        AutoResponder {
            scheduler,
            principal,
            double_booking: scheduler.preferences(principal).double_booking,
        }
    }

    pub fn with_double_booking(mut self, allowed: bool) -> Self {
        self.double_booking = allowed;
        self
    }

    /// Returns `None` when there was nothing left to answer, such as an
    /// invitation that already ended.
    pub async fn respond(&self, entity: &mut CalendarEntity) -> trc::Result<Option<AutoResponse>> {
        if entity
            .master
            .data
            .scheduling
            .find_any(&self.principal.addresses)
            .is_none()
            && !entity.overrides.values().any(|item| {
                item.data
                    .scheduling
                    .find_any(&self.principal.addresses)
                    .is_some()
            })
        {
            return Ok(None);
        }

        let response = if entity.is_recurring() {
            self.respond_recurring(entity).await
        } else {
            self.respond_single(entity).await
        }
        .caused_by(trc::location!())?;

        if let Some(response) = &response {
            let event = if response.accepted {
                trc::SchedulingEvent::AutoAccepted
            } else {
                trc::SchedulingEvent::AutoDeclined
            };
            trc::event!(
                Scheduling(event),
                AccountId = self.principal.account_id,
                Uid = entity.uid.as_str(),
                Total = response.instances,
                Details = response.declined_instances,
            );
        }

        Ok(response)
    }

    async fn respond_single(&self, entity: &mut CalendarEntity) -> trc::Result<Option<AutoResponse>> {
        let window = entity.master.data.window();
        if window.is_some_and(|(_, end)| end < now()) {
            return Ok(None);
        }

        let busy = match window {
            Some((start, end)) => self.is_busy(entity, start, end).await?,
            None => false,
        };
        apply_decision(&mut entity.master.data, &self.principal.addresses, !busy);

        Ok(Some(AutoResponse {
            accepted: !busy,
            instances: 1,
            declined_instances: usize::from(busy),
            overrides_created: 0,
        }))
    }

    async fn respond_recurring(
        &self,
        entity: &mut CalendarEntity,
    ) -> trc::Result<Option<AutoResponse>> {
        let from = now();
        let to = from + YEAR * i64::from(self.scheduler.config.max_years.max(1));
        let windows = self.windows(entity, from, to).await?;
        if windows.is_empty() {
            return Ok(None);
        }

        // All free/busy reads complete before anything is written.
        let snapshot: &CalendarEntity = entity;
        let decisions = join_all(
            windows
                .iter()
                .map(|window| self.is_busy(snapshot, window.start, window.end)),
        )
        .await
        .into_iter()
        .map(|busy| busy.map(|busy| !busy))
        .collect::<trc::Result<Vec<bool>>>()?;

        let accepted_count = decisions.iter().filter(|accepted| **accepted).count();
        let declined_count = decisions.len() - accepted_count;
        let master_accepts = accepted_count >= declined_count;

        apply_decision(
            &mut entity.master.data,
            &self.principal.addresses,
            master_accepts,
        );
        let master_scheduling = entity.master.data.scheduling.clone();
        let mut response = AutoResponse {
            accepted: master_accepts,
            instances: decisions.len(),
            declined_instances: declined_count,
            overrides_created: 0,
        };

        if accepted_count == 0 || declined_count == 0 {
            for item in entity.overrides.values_mut() {
                if !item.data.is_cancelled() {
                    self.apply_override(&mut item.data, &master_scheduling, master_accepts);
                }
            }
            return Ok(Some(response));
        }

        let reconciler = self.scheduler.reconciler();
        for (window, accepts) in windows.iter().zip(decisions) {
            let existed = entity.overrides.contains_key(&window.recurrence_id);
            if accepts == master_accepts && !existed {
                continue;
            }
            let item = reconciler
                .find_or_create_override(entity, window.recurrence_id)
                .await?;
            self.apply_override(&mut item.data, &master_scheduling, accepts);
            if !existed {
                response.overrides_created += 1;
            }
        }

        Ok(Some(response))
    }

    fn apply_override(&self, data: &mut InstanceData, master: &SchedulingInfo, accepts: bool) {
        if data.scheduling.is_empty() {
            data.scheduling = master.clone();
        }
        apply_decision(data, &self.principal.addresses, accepts);
    }

    /// Upcoming occurrences that are still active, using an override's own
    /// times where it moved the occurrence.
    async fn windows(&self, entity: &CalendarEntity, from: i64, to: i64) -> trc::Result<Vec<Window>> {
        let mut windows = Vec::new();
        for occurrence in self.scheduler.reconciler().expand(entity, from, to).await? {
            if entity.master.recurrence.is_excluded(occurrence.recurrence_id) {
                continue;
            }
            let (start, end) = match entity.overrides.get(&occurrence.recurrence_id) {
                Some(item) if item.data.is_cancelled() => continue,
                Some(item) => item
                    .data
                    .window()
                    .unwrap_or((occurrence.start, occurrence.end)),
                None => (occurrence.start, occurrence.end),
            };
            windows.push(Window {
                recurrence_id: occurrence.recurrence_id,
                start,
                end,
            });
        }

        for item in entity.overrides.values() {
            if item.data.is_cancelled()
                || windows.iter().any(|w| w.recurrence_id == item.recurrence_id)
            {
                continue;
            }
            if let Some((start, end)) = item.data.window()
                && end >= from
                && start < to
            {
                windows.push(Window {
                    recurrence_id: item.recurrence_id,
                    start,
                    end,
                });
            }
        }
        windows.sort_unstable_by_key(|w| w.recurrence_id);
        windows.truncate(self.scheduler.config.max_instances);

        Ok(windows)
    }

    async fn is_busy(&self, entity: &CalendarEntity, start: i64, end: i64) -> trc::Result<bool> {
        if self.double_booking {
            return Ok(false);
        }
        let organizer: Option<&CalAddress> = entity.organizer().map(|owner| &owner.address);
        self.scheduler
            .backend
            .query_free_busy(self.principal, start, end, organizer, &entity.uid, true)
            .await
            .map(|periods| periods.iter().any(|period| !period.busy_type.is_free()))
            .caused_by(trc::location!())
    }
}

fn apply_decision(data: &mut InstanceData, addresses: &[CalAddress], accepts: bool) {
    if let Some(participant) = data.scheduling.find_any_mut(addresses) {
        participant.part_stat = if accepts {
            ICalendarParticipationStatus::Accepted
        } else {
            ICalendarParticipationStatus::Declined
        };
        participant.expect_reply = false;
    }
    data.transparency = Some(if accepts {
        ICalendarTransparency::Opaque
    } else {
        ICalendarTransparency::Transparent
    });
}
