/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod utils;

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::Serialize;

pub use utils::{AsKey, ParseValue};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    #[serde(skip)]
    pub keys: BTreeMap<String, String>,
    pub warnings: AHashMap<String, ConfigWarning>,
    pub errors: AHashMap<String, ConfigError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ConfigWarning {
    Missing,
    AppliedDefault { default: String },
    Parse { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ConfigError {
    Parse { error: String },
    Build { error: String },
}

pub(crate) type Result<T> = std::result::Result<T, String>;

impl Config {
    /// Parses a TOML document, flattening nested tables into dotted keys.
    /// Array items are keyed by their zero-padded position.
    pub fn new(toml: impl AsRef<str>) -> Result<Self> {
        let table = toml
            .as_ref()
            .parse::<toml::Table>()
            .map_err(|err| format!("Failed to parse TOML: {err}"))?;
        let mut config = Config::default();
        for (key, value) in table {
            config.flatten(key, value);
        }
        Ok(config)
    }

    fn flatten(&mut self, key: String, value: toml::Value) {
        match value {
            toml::Value::Table(table) => {
                for (sub_key, value) in table {
                    self.flatten(format!("{key}.{sub_key}"), value);
                }
            }
            toml::Value::Array(items) => {
                for (idx, value) in items.into_iter().enumerate() {
                    self.flatten(format!("{key}.{idx:04}"), value);
                }
            }
            toml::Value::String(value) => {
                self.keys.insert(key, value);
            }
            value => {
                self.keys.insert(key, value.to_string());
            }
        }
    }

    pub fn update(&mut self, settings: Vec<(String, String)>) {
        self.keys.extend(settings);
    }

    pub fn log_errors(&self) {
        for (key, err) in &self.errors {
            let message = match err {
                ConfigError::Parse { error } => {
                    format!("Failed to parse setting {key:?}: {error}")
                }
                ConfigError::Build { error } => format!("Build error for key {key:?}: {error}"),
            };
            trc::event!(Config(trc::ConfigEvent::ParseError), Details = message);
        }
    }

    pub fn log_warnings(&self) {
        for (key, warn) in &self.warnings {
            let (cause, message) = match warn {
                ConfigWarning::AppliedDefault { default } => (
                    trc::ConfigEvent::DefaultApplied,
                    format!("Missing setting {key:?}, applied default {default:?}"),
                ),
                ConfigWarning::Missing => (
                    trc::ConfigEvent::MissingSetting,
                    format!("Missing setting {key:?}"),
                ),
                ConfigWarning::Parse { error } => (
                    trc::ConfigEvent::ParseWarning,
                    format!("Failed to parse {key:?}: {error}"),
                ),
            };
            trc::event!(Config(cause), Details = message);
        }
    }
}
