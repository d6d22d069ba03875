/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::time::Duration;

use utils::config::{Config, ParseValue};

#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub max_years: u32,
    pub max_instances: usize,
    pub defaults: SchedulingPreferences,
    pub lock_shards: usize,
    pub directory_cache_size: u64,
    pub directory_cache_ttl: Duration,
}

/// Per-principal scheduling behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPreferences {
    pub notify: NotificationPreference,
    pub cancel: CancelPreference,
    pub auto_respond: bool,
    pub double_booking: bool,
    pub scheduling_assistant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPreference {
    #[default]
    Always,
    Never,
    UnlessAccepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPreference {
    #[default]
    SetStatus,
    Delete,
}

impl SchedulingConfig {
    pub fn parse(config: &mut Config) -> Self {
        SchedulingConfig {
            max_years: config
                .property("calendar.scheduling.auto-respond.max-years")
                .unwrap_or(2),
            max_instances: config
                .property("calendar.scheduling.auto-respond.max-instances")
                .unwrap_or(500),
            defaults: SchedulingPreferences {
                notify: config
                    .property("calendar.scheduling.defaults.notify")
                    .unwrap_or_default(),
                cancel: config
                    .property("calendar.scheduling.defaults.cancel")
                    .unwrap_or_default(),
                auto_respond: config
                    .property("calendar.scheduling.defaults.auto-respond")
                    .unwrap_or(false),
                double_booking: config
                    .property("calendar.scheduling.defaults.double-booking")
                    .unwrap_or(false),
                scheduling_assistant: config
                    .property("calendar.scheduling.defaults.assistant")
                    .unwrap_or(false),
            },
            lock_shards: config
                .property("calendar.scheduling.lock.shards")
                .unwrap_or(1024),
            directory_cache_size: config
                .property("cache.scheduling.directory.size")
                .unwrap_or(1024 * 1024),
            directory_cache_ttl: config
                .property_or_default::<Duration>("cache.scheduling.directory.ttl", "1h")
                .unwrap_or(Duration::from_secs(3600)),
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        SchedulingConfig::parse(&mut Config::default())
    }
}

impl Default for SchedulingPreferences {
    fn default() -> Self {
        SchedulingPreferences {
            notify: NotificationPreference::Always,
            cancel: CancelPreference::SetStatus,
            auto_respond: false,
            double_booking: false,
            scheduling_assistant: false,
        }
    }
}

impl ParseValue for NotificationPreference {
    fn parse_value(value: &str) -> Result<Self, String> {
        hashify::tiny_map_ignore_case!(value.as_bytes(),
            "always" => NotificationPreference::Always,
            "never" => NotificationPreference::Never,
            "unless-accepted" => NotificationPreference::UnlessAccepted,
        )
        .ok_or_else(|| format!("Invalid notification preference {value:?}."))
    }
}

impl ParseValue for CancelPreference {
    fn parse_value(value: &str) -> Result<Self, String> {
        hashify::tiny_map_ignore_case!(value.as_bytes(),
            "set-status" => CancelPreference::SetStatus,
            "delete" => CancelPreference::Delete,
        )
        .ok_or_else(|| format!("Invalid cancel preference {value:?}."))
    }
}
