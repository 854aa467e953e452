// Copyright 2024 tessera
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Human readable durations such as `5m`, `1h30m` or `20ms`.
//!
//! A bare number is read as seconds. Components are summed, so `30m1h`
//! parses to the same value as `1h30m`.

use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
    time::Duration,
};

use serde::{
    de::{self, Unexpected, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use snafu::ensure;

use crate::err::{InvalidDurationSnafu, ParseError};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000 * NANOS_PER_MICRO;
const NANOS_PER_SEC: u128 = 1_000 * NANOS_PER_MILLI;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: u128 = 24 * NANOS_PER_HOUR;

const UNITS: [(&str, u128); 7] = [
    ("d", NANOS_PER_DAY),
    ("h", NANOS_PER_HOUR),
    ("m", NANOS_PER_MINUTE),
    ("s", NANOS_PER_SEC),
    ("ms", NANOS_PER_MILLI),
    ("us", NANOS_PER_MICRO),
    ("ns", 1),
];

#[derive(Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct ReadableDuration(pub Duration);

impl ReadableDuration {
    pub const fn secs(secs: u64) -> ReadableDuration { ReadableDuration(Duration::from_secs(secs)) }

    pub const fn millis(millis: u64) -> ReadableDuration {
        ReadableDuration(Duration::from_millis(millis))
    }
}

impl From<Duration> for ReadableDuration {
    fn from(value: Duration) -> Self { Self(value) }
}

impl From<ReadableDuration> for Duration {
    fn from(value: ReadableDuration) -> Self { value.0 }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    UNITS.iter().find(|(name, _)| *name == unit).map(|(_, nanos)| *nanos)
}

impl FromStr for ReadableDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<ReadableDuration, ParseError> {
        let input = s.trim();
        ensure!(
            !input.is_empty(),
            InvalidDurationSnafu { input: s, reason: "empty string" }
        );

        if let Ok(secs) = input.parse::<f64>() {
            ensure!(
                secs >= 0.0,
                InvalidDurationSnafu { input: s, reason: "duration must not be negative" }
            );
            return Duration::try_from_secs_f64(secs)
                .map(ReadableDuration)
                .map_err(|e| InvalidDurationSnafu { input: s, reason: e.to_string() }.build());
        }

        let mut total: f64 = 0.0;
        let mut rest = input;
        while !rest.is_empty() {
            let num_len = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .count();
            ensure!(
                num_len > 0,
                InvalidDurationSnafu { input: s, reason: "expected a number" }
            );
            let (num, tail) = rest.split_at(num_len);
            let unit_len = tail.chars().take_while(|c| c.is_ascii_alphabetic()).count();
            let (unit, tail) = tail.split_at(unit_len);

            let n = num
                .parse::<f64>()
                .map_err(|e| InvalidDurationSnafu { input: s, reason: e.to_string() }.build())?;
            let Some(nanos) = unit_nanos(unit) else {
                return InvalidDurationSnafu {
                    input:  s,
                    reason: format!("unknown unit {unit:?}, expected one of d, h, m, s, ms, us, ns"),
                }
                .fail();
            };
            total += n * nanos as f64;
            rest = tail;
        }

        ensure!(
            total.is_finite() && total < u64::MAX as f64,
            InvalidDurationSnafu { input: s, reason: "duration is too long" }
        );
        Ok(ReadableDuration(Duration::from_nanos(total as u64)))
    }
}

impl Display for ReadableDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut remaining = self.0.as_nanos();
        if remaining == 0 {
            return write!(f, "0s");
        }
        for (name, nanos) in UNITS {
            let count = remaining / nanos;
            if count > 0 {
                write!(f, "{}{}", count, name)?;
                remaining %= nanos;
            }
        }
        Ok(())
    }
}

impl Debug for ReadableDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self) }
}

impl Serialize for ReadableDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReadableDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = ReadableDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("valid duration")
            }

            fn visit_i64<E>(self, secs: i64) -> Result<ReadableDuration, E>
            where
                E: de::Error,
            {
                if secs >= 0 {
                    self.visit_u64(secs as u64)
                } else {
                    Err(E::invalid_value(Unexpected::Signed(secs), &self))
                }
            }

            fn visit_u64<E>(self, secs: u64) -> Result<ReadableDuration, E>
            where
                E: de::Error,
            {
                Ok(ReadableDuration::secs(secs))
            }

            fn visit_str<E>(self, dur_str: &str) -> Result<ReadableDuration, E>
            where
                E: de::Error,
            {
                dur_str.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

/// Serde adapter for plain [`Duration`] fields.
///
/// Use with `#[serde(with = "tessera_utils::readable_duration::duration")]`.
pub mod duration {
    use super::*;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ReadableDuration(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        ReadableDuration::deserialize(deserializer).map(|d| d.0)
    }
}
