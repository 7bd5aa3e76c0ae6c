// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server timestamps.
//!
//! The server exchanges UTC timestamps without a zone designator, e.g.
//! `2024-01-01T00:00:01.000`. Values are totally ordered, which is what the
//! long-polling cursor relies on. Formatting keeps every fractional digit
//! that was parsed, with a minimum of three.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const FORMAT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const FORMAT_FRACTION: &str = "%Y-%m-%dT%H:%M:%S%.f";
const FORMAT_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const FORMAT_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const FORMAT_NANOS: &str = "%Y-%m-%dT%H:%M:%S%.9f";

/// A UTC timestamp in the server's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Wraps a naive UTC date-time.
    pub fn new(value: NaiveDateTime) -> Self {
        Timestamp(value)
    }

    /// Parses the server format. The fractional part is optional and a
    /// trailing `Z` is tolerated.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
        let format = if trimmed.contains('.') {
            FORMAT_FRACTION
        } else {
            FORMAT_SECONDS
        };
        NaiveDateTime::parse_from_str(trimmed, format)
            .map(Timestamp)
            .map_err(|_| Error::InvalidTimestamp(s.to_string()))
    }

    /// Returns the underlying naive UTC date-time.
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // At least milliseconds, more only when the value carries them, so a
        // cursor sent back to the server is never older than what it saw
        let nanos = self.0.nanosecond();
        let format = if nanos % 1_000_000 == 0 {
            FORMAT_MILLIS
        } else if nanos % 1_000 == 0 {
            FORMAT_MICROS
        } else {
            FORMAT_NANOS
        };
        write!(f, "{}", self.0.format(format))
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Timestamp::parse(s)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp(value.naive_utc())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
