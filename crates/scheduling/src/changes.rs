/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::icalendar::ICalendarTransparency;

use crate::entity::{
    CalAddress, EntityType, Participant,
    property::{ChangeItem, Property, PropertyValue, Tracked},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub property: Property,
    pub value: PropertyValue,
    pub added: Vec<ChangeItem>,
    pub removed: Vec<ChangeItem>,
}

/// Property-level delta between a stored instance and its incoming version.
/// Built by diffing, then applied to the stored copy in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeTable {
    entries: Vec<ChangeEntry>,
    /// The recipient's own participant is still waiting for an answer.
    pub reply_owed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'x> {
    pub entity_type: EntityType,
    pub self_addresses: &'x [CalAddress],
}

impl ChangeTable {
    pub fn diff<T: Tracked>(stored: &T, incoming: &T, ctx: &ReconcileContext<'_>) -> Self {
        Self::diff_properties(stored, incoming, &Property::ALL, ctx)
    }

    pub fn diff_properties<T: Tracked>(
        stored: &T,
        incoming: &T,
        properties: &[Property],
        ctx: &ReconcileContext<'_>,
    ) -> Self {
        let mut table = ChangeTable::default();

        for property in properties {
            if !property.applies_to(ctx.entity_type) {
                continue;
            }
            match property {
                // Exception dates are turned into cancelled overrides by the
                // recurrence reconciler instead of being copied.
                Property::Exdate => {}
                Property::Participants => table.diff_participants(stored, incoming, ctx),
                Property::Transparency => {}
                property => {
                    if let (Some(old), Some(new)) = (stored.get(*property), incoming.get(*property))
                    {
                        table.compare(*property, old, new);
                    }
                }
            }
        }

        if properties.contains(&Property::Transparency)
            && Property::Transparency.applies_to(ctx.entity_type)
            && let (Some(PropertyValue::Transparency(old)), Some(PropertyValue::Transparency(new))) = (
                stored.get(Property::Transparency),
                incoming.get(Property::Transparency),
            )
        {
            // Transparency is the recipient's own, the organizer's value only
            // seeds copies that have none yet.
            let new = if table.reply_owed {
                Some(ICalendarTransparency::Transparent)
            } else {
                old.clone().or(new)
            };
            table.compare(
                Property::Transparency,
                PropertyValue::Transparency(old),
                PropertyValue::Transparency(new),
            );
        }

        table
    }

    fn diff_participants<T: Tracked>(
        &mut self,
        stored: &T,
        incoming: &T,
        ctx: &ReconcileContext<'_>,
    ) {
        let (
            Some(PropertyValue::Participants(old)),
            Some(PropertyValue::Participants(mut participants)),
        ) = (
            stored.get(Property::Participants),
            incoming.get(Property::Participants),
        )
        else {
            return;
        };

        // The organizer may be listed as an attendee of its own meeting and
        // must not vanish because an update omitted it.
        let organizer = [incoming, stored].into_iter().find_map(|instance| {
            match instance.get(Property::Organizer) {
                Some(PropertyValue::Owner(Some(owner))) => Some(owner.address),
                _ => None,
            }
        });
        if let Some(organizer) = organizer
            && !participants.iter().any(|p| p.address == organizer)
            && let Some(kept) = old.iter().find(|p| p.address == organizer)
        {
            participants.push(kept.clone());
        }

        self.reply_owed = participants
            .iter()
            .find(|p| p.address.is_any_of(ctx.self_addresses))
            .is_some_and(Participant::is_needs_action);

        self.compare(
            Property::Participants,
            PropertyValue::Participants(old),
            PropertyValue::Participants(participants),
        );
    }

    fn compare(&mut self, property: Property, old: PropertyValue, new: PropertyValue) {
        if old == new {
            return;
        }
        let (added, removed) = match (old.items(), new.items()) {
            (Some(old), Some(new)) => (
                new.iter().filter(|item| !old.contains(item)).cloned().collect(),
                old.iter().filter(|item| !new.contains(item)).cloned().collect(),
            ),
            _ => (Vec::new(), Vec::new()),
        };
        self.entries.push(ChangeEntry {
            property,
            value: new,
            added,
            removed,
        });
    }

    /// Records a change computed outside of `diff`.
    pub fn record(
        &mut self,
        property: Property,
        value: PropertyValue,
        added: Vec<ChangeItem>,
        removed: Vec<ChangeItem>,
    ) {
        self.entries.retain(|entry| entry.property != property);
        self.entries.push(ChangeEntry {
            property,
            value,
            added,
            removed,
        });
    }

    pub fn entry(&self, property: Property) -> Option<&ChangeEntry> {
        self.entries.iter().find(|entry| entry.property == property)
    }

    pub fn changed(&self, property: Property) -> bool {
        self.entry(property).is_some()
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A change needs downstream notification when a non-cosmetic property
    /// changed, or when attendees were added or removed. Participation
    /// status edits alone are not significant.
    pub fn is_significant(&self) -> bool {
        self.entries.iter().any(|entry| match entry.property {
            Property::Participants => !entry.added.is_empty() || !entry.removed.is_empty(),
            Property::Transparency => false,
            property => !property.is_cosmetic(),
        })
    }

    pub fn apply<T: Tracked>(&self, target: &mut T) {
        for entry in &self.entries {
            target.set(entry.property, entry.value.clone());
        }
    }
}
