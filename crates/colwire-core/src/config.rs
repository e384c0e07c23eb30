//! Settings map and pipeline configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CSV_DELIMITER: &str = "format_csv_delimiter";
pub const PRETTY_MAX_ROWS: &str = "output_format_pretty_max_rows";
pub const PRETTY_COLOR: &str = "output_format_pretty_color";

pub const DEFAULT_PRETTY_MAX_ROWS: usize = 10_000;

/// Named settings, as sent alongside a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; non-string values are stringified.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Config("settings must be a JSON object".into()))?;
        let values = obj
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect();
        Ok(Self { values })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// `format_csv_delimiter`: one literal byte, or a backslash escape.
    pub fn csv_delimiter(&self) -> Result<u8> {
        match self.get(CSV_DELIMITER) {
            None => Ok(b','),
            Some(raw) => parse_delimiter(raw),
        }
    }

    /// `output_format_pretty_max_rows`; `None` means unlimited.
    pub fn pretty_max_rows(&self) -> Result<Option<usize>> {
        match self.get(PRETTY_MAX_ROWS) {
            None => Ok(Some(DEFAULT_PRETTY_MAX_ROWS)),
            Some(raw) => {
                let n = raw.trim().parse::<usize>().map_err(|_| {
                    Error::Config(format!("{PRETTY_MAX_ROWS} must be a non-negative integer, got '{raw}'"))
                })?;
                Ok(if n == 0 { None } else { Some(n) })
            }
        }
    }

    pub fn pretty_color(&self) -> Result<bool> {
        match self.get(PRETTY_COLOR) {
            None => Ok(false),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(Error::Config(format!(
                    "{PRETTY_COLOR} must be 0/1 or true/false, got '{raw}'"
                ))),
            },
        }
    }
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    let bytes = raw.as_bytes();
    match bytes {
        [b] => Ok(*b),
        [b'\\', esc] => Ok(match esc {
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'a' => 0x07,
            b'b' => 0x08,
            b'0' => 0,
            other => *other,
        }),
        _ => Err(Error::Config(format!(
            "invalid {CSV_DELIMITER} '{raw}': delimiter must be a single byte or a backslash escape"
        ))),
    }
}

/// Sizing for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rows per batch (and so per emitted block).
    pub batch_size: usize,
    /// Parallel conversion workers.
    pub workers: usize,
    /// Capacity of the channels between stages.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 65_536,
            workers: 1,
            channel_capacity: 1,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `COLWIRE_BATCH_SIZE`, `COLWIRE_WORKERS` and
    /// `COLWIRE_CHANNEL_CAPACITY` when set.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_usize("COLWIRE_BATCH_SIZE") {
            cfg.batch_size = v;
        }
        if let Some(v) = env_usize("COLWIRE_WORKERS") {
            cfg.workers = v;
        }
        if let Some(v) = env_usize("COLWIRE_CHANNEL_CAPACITY") {
            cfg.channel_capacity = v;
        }
        cfg
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse().ok()
}
