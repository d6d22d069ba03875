/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::ICalendarStatus;
use trc::AddContext;

use crate::{
    backend::{Recurrence, RecurrenceExpansion},
    changes::ChangeTable,
    entity::{
        CalDateTime, CalendarEntity, EventEnd, Master, Override,
        property::{ChangeItem, Property, PropertyValue},
    },
};

pub struct RecurrenceReconciler<'x, E: RecurrenceExpansion> {
    expander: &'x E,
    max_years: u32,
    max_instances: usize,
}

impl<'x, E: RecurrenceExpansion> RecurrenceReconciler<'x, E> {
    pub fn new(expander: &'x E, max_years: u32, max_instances: usize) -> Self {
        RecurrenceReconciler {
            expander,
            max_years,
            max_instances,
        }
    }

    /// Returns the override for `recurrence_id`, creating an unsaved one
    /// seeded from the master when the entity has none yet.
    pub async fn find_or_create_override<'e>(
        &self,
        entity: &'e mut CalendarEntity,
        recurrence_id: i64,
    ) -> trc::Result<&'e mut Override> {
        if !entity.overrides.contains_key(&recurrence_id) {
            let occurrence = self
                .occurrence(entity, recurrence_id)
                .await
                .caused_by(trc::location!())?;
            if occurrence.is_none() {
                // Not produced by the rules, keep it as an explicit extra date.
                let rdate = entity
                    .master
                    .data
                    .start
                    .as_ref()
                    .map_or_else(|| CalDateTime::utc(recurrence_id), |start| {
                        start.with_timestamp(recurrence_id)
                    });
                entity.master.recurrence.rdates.push(rdate);
            }
            let item = seed_override(&entity.master, recurrence_id, occurrence.as_ref());
            entity.overrides.insert(recurrence_id, item);
        }

        Ok(entity
            .overrides
            .entry(recurrence_id)
            .or_insert_with(|| Override::new(recurrence_id)))
    }

    /// Returns the override for `recurrence_id` when one is stored or the
    /// master produces that occurrence. The master's dates are left alone.
    pub async fn find_occurrence_override<'e>(
        &self,
        entity: &'e mut CalendarEntity,
        recurrence_id: i64,
    ) -> trc::Result<Option<&'e mut Override>> {
        if !entity.overrides.contains_key(&recurrence_id) {
            let Some(occurrence) = self
                .occurrence(entity, recurrence_id)
                .await
                .caused_by(trc::location!())?
            else {
                return Ok(None);
            };
            let item = seed_override(&entity.master, recurrence_id, Some(&occurrence));
            entity.overrides.insert(recurrence_id, item);
        }

        Ok(entity.overrides.get_mut(&recurrence_id))
    }

    async fn occurrence(
        &self,
        entity: &CalendarEntity,
        recurrence_id: i64,
    ) -> trc::Result<Option<Recurrence>> {
        if !entity.master.recurrence.is_recurring() {
            return Ok(None);
        }
        self.expander
            .expand(
                entity,
                self.max_years,
                self.max_instances,
                recurrence_id,
                recurrence_id + 1,
            )
            .await
            .map(|occurrences| {
                occurrences
                    .into_iter()
                    .find(|occurrence| occurrence.recurrence_id == recurrence_id)
            })
    }

    /// Occurrences starting within `[from, to)`.
    pub async fn expand(
        &self,
        entity: &CalendarEntity,
        from: i64,
        to: i64,
    ) -> trc::Result<Vec<Recurrence>> {
        self.expander
            .expand(entity, self.max_years, self.max_instances, from, to)
            .await
    }

    /// Turns every exception date that differs between the stored copy and
    /// the incoming message into a cancelled override, so that cancelled
    /// occurrences stay visible. Returns the recurrence ids that were newly
    /// cancelled.
    pub async fn reconcile_exdates(
        &self,
        entity: &mut CalendarEntity,
        incoming: &[CalDateTime],
        changes: &mut ChangeTable,
    ) -> trc::Result<Vec<i64>> {
        let stored = entity.master.recurrence.exdates.clone();
        let mut converted = Vec::new();
        for exdate in incoming.iter().chain(stored.iter()) {
            let in_stored = stored.iter().any(|dt| dt.timestamp == exdate.timestamp);
            let in_incoming = incoming.iter().any(|dt| dt.timestamp == exdate.timestamp);
            if in_stored != in_incoming && !converted.contains(&exdate.timestamp) {
                converted.push(exdate.timestamp);
            }
        }
        if converted.is_empty() {
            return Ok(Vec::new());
        }

        // The occurrence has to exist again before an override can point at it.
        entity
            .master
            .recurrence
            .exdates
            .retain(|dt| !converted.contains(&dt.timestamp));

        let mut cancelled = Vec::new();
        for recurrence_id in &converted {
            let item = self
                .find_or_create_override(entity, *recurrence_id)
                .await
                .caused_by(trc::location!())?;
            if !item.data.is_cancelled() {
                item.data.status = Some(ICalendarStatus::Cancelled);
                cancelled.push(*recurrence_id);
            }
        }

        let removed = stored
            .iter()
            .filter(|dt| converted.contains(&dt.timestamp))
            .cloned()
            .map(ChangeItem::DateTime)
            .collect::<Vec<_>>();
        if !cancelled.is_empty() || !removed.is_empty() {
            changes.record(
                Property::Exdate,
                PropertyValue::DateTimeList(entity.master.recurrence.exdates.clone()),
                cancelled
                    .iter()
                    .map(|id| ChangeItem::DateTime(CalDateTime::utc(*id)))
                    .collect(),
                removed,
            );
        }

        Ok(cancelled)
    }
}

/// Builds an override for `recurrence_id` from the master, placing it on
/// the expanded occurrence when one is known.
pub fn seed_override(master: &Master, recurrence_id: i64, occurrence: Option<&Recurrence>) -> Override {
    let mut data = master.data.clone();
    let (start, end) = occurrence.map_or_else(
        || {
            let duration = master
                .data
                .window()
                .map_or(0, |(start, end)| end - start);
            (recurrence_id, recurrence_id + duration)
        },
        |occurrence| (occurrence.start, occurrence.end),
    );

    data.start = Some(match &master.data.start {
        Some(master_start) => master_start.with_timestamp(start),
        None => CalDateTime::utc(start),
    });
    data.end = match &master.data.end {
        EventEnd::None => EventEnd::None,
        EventEnd::Duration(_) => EventEnd::Duration(end - start),
        EventEnd::At(master_end) => EventEnd::At(master_end.with_timestamp(end)),
    };
    if let (Some(due), Some(master_start)) = (&master.data.due, &master.data.start) {
        data.due = Some(due.with_timestamp(start + (due.timestamp - master_start.timestamp)));
    }

    Override {
        recurrence_id,
        data,
    }
}

/// Fills in what an incoming override inherits from its master: the
/// scheduling information when it carries none, and the start and end.
pub fn backfill_override(item: &mut Override, master: &Master) {
    if item.data.scheduling.is_empty() {
        item.data.scheduling = master.data.scheduling.clone();
    }
    if item.data.start.is_some() && item.data.end != EventEnd::None {
        return;
    }
    let seeded = seed_override(master, item.recurrence_id, None);
    if item.data.start.is_none() {
        item.data.start = seeded.data.start;
    }
    if item.data.end == EventEnd::None {
        item.data.end = seeded.data.end;
    }
}
