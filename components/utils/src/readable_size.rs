// Copyright (c) 2017-present, PingCAP, Inc. Licensed under Apache-2.0.

// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
};

use serde::{
    de::{self, Unexpected, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use snafu::ensure;

use crate::err::{InvalidSizeSnafu, ParseError};

const UNIT: u64 = 1;

const BINARY_DATA_MAGNITUDE: u64 = 1024;
pub const B: u64 = UNIT;
pub const KIB: u64 = B * BINARY_DATA_MAGNITUDE;
pub const MIB: u64 = KIB * BINARY_DATA_MAGNITUDE;
pub const GIB: u64 = MIB * BINARY_DATA_MAGNITUDE;
pub const TIB: u64 = GIB * BINARY_DATA_MAGNITUDE;
pub const PIB: u64 = TIB * BINARY_DATA_MAGNITUDE;

/// Spelling of an unbounded size limit in config files and on the command
/// line.
pub const OFF: &str = "off";

#[derive(Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct ReadableSize(pub u64);

impl ReadableSize {
    pub const fn kb(count: u64) -> ReadableSize { ReadableSize(count * KIB) }

    pub const fn mb(count: u64) -> ReadableSize { ReadableSize(count * MIB) }

    pub const fn gb(count: u64) -> ReadableSize { ReadableSize(count * GIB) }

    pub const fn saturating_double(self) -> ReadableSize { ReadableSize(self.0.saturating_mul(2)) }
}

impl Serialize for ReadableSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let size = self.0;
        let buffer = if size == 0 {
            format!("{}KiB", size)
        } else if size % PIB == 0 {
            format!("{}PiB", size / PIB)
        } else if size % TIB == 0 {
            format!("{}TiB", size / TIB)
        } else if size % GIB == 0 {
            format!("{}GiB", size / GIB)
        } else if size % MIB == 0 {
            format!("{}MiB", size / MIB)
        } else if size % KIB == 0 {
            format!("{}KiB", size / KIB)
        } else {
            return serializer.serialize_u64(size);
        };
        serializer.serialize_str(&buffer)
    }
}

impl FromStr for ReadableSize {
    type Err = ParseError;

    // This method parses value in binary unit.
    fn from_str(s: &str) -> Result<ReadableSize, ParseError> {
        let size_str = s.trim();
        ensure!(
            !size_str.is_empty(),
            InvalidSizeSnafu { input: s, reason: "empty string" }
        );
        ensure!(
            size_str.is_ascii(),
            InvalidSizeSnafu { input: s, reason: "ASCII string is expected" }
        );

        // size: digits and '.' as decimal separator
        let size_len = size_str
            .chars()
            .take_while(|c| char::is_ascii_digit(c) || ['.', 'e', 'E', '-', '+'].contains(c))
            .count();

        // unit: alphabetic characters
        let (size, unit) = size_str.split_at(size_len);

        let unit = match unit.trim() {
            "K" | "KB" | "KiB" => KIB,
            "M" | "MB" | "MiB" => MIB,
            "G" | "GB" | "GiB" => GIB,
            "T" | "TB" | "TiB" => TIB,
            "P" | "PB" | "PiB" => PIB,
            "B" | "" => B,
            _ => {
                return InvalidSizeSnafu {
                    input:  s,
                    reason: "only B, KB, KiB, MB, MiB, GB, GiB, TB, TiB, PB, and PiB are supported",
                }
                .fail();
            }
        };

        let n = size
            .parse::<f64>()
            .map_err(|e| InvalidSizeSnafu { input: s, reason: e.to_string() }.build())?;
        ensure!(
            n >= 0.0,
            InvalidSizeSnafu { input: s, reason: "size must not be negative" }
        );
        let bytes = n * unit as f64;
        ensure!(
            bytes.is_finite() && bytes < u64::MAX as f64,
            InvalidSizeSnafu { input: s, reason: "size does not fit in 64 bits" }
        );
        Ok(ReadableSize(bytes as u64))
    }
}

impl Debug for ReadableSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self) }
}

impl Display for ReadableSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= PIB {
            write!(f, "{:.1}PiB", self.0 as f64 / PIB as f64)
        } else if self.0 >= TIB {
            write!(f, "{:.1}TiB", self.0 as f64 / TIB as f64)
        } else if self.0 >= GIB {
            write!(f, "{:.1}GiB", self.0 as f64 / GIB as f64)
        } else if self.0 >= MIB {
            write!(f, "{:.1}MiB", self.0 as f64 / MIB as f64)
        } else if self.0 >= KIB {
            write!(f, "{:.1}KiB", self.0 as f64 / KIB as f64)
        } else {
            write!(f, "{}B", self.0)
        }
    }
}

impl<'de> Deserialize<'de> for ReadableSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SizeVisitor;

        impl<'de> Visitor<'de> for SizeVisitor {
            type Value = ReadableSize;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("valid size")
            }

            fn visit_i64<E>(self, size: i64) -> Result<ReadableSize, E>
            where
                E: de::Error,
            {
                if size >= 0 {
                    self.visit_u64(size as u64)
                } else {
                    Err(E::invalid_value(Unexpected::Signed(size), &self))
                }
            }

            fn visit_u64<E>(self, size: u64) -> Result<ReadableSize, E>
            where
                E: de::Error,
            {
                Ok(ReadableSize(size))
            }

            fn visit_str<E>(self, size_str: &str) -> Result<ReadableSize, E>
            where
                E: de::Error,
            {
                size_str.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

/// Parses an optional size limit. `off` and `-1` mean "no limit" and map
/// to `None`.
pub fn parse_limit(s: &str) -> Result<Option<ReadableSize>, ParseError> {
    match s.trim() {
        OFF | "-1" => Ok(None),
        other => other.parse().map(Some),
    }
}

/// Serde adapter for `Option<ReadableSize>` fields where `None` means
/// unbounded.
///
/// Use with `#[serde(with = "tessera_utils::readable_size::limit")]`.
pub mod limit {
    use super::*;

    pub fn serialize<S>(value: &Option<ReadableSize>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(size) => size.serialize(serializer),
            None => serializer.serialize_str(OFF),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<ReadableSize>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LimitVisitor;

        impl<'de> Visitor<'de> for LimitVisitor {
            type Value = Option<ReadableSize>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("valid size, \"off\" or -1")
            }

            fn visit_i64<E>(self, size: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match size {
                    -1 => Ok(None),
                    s if s >= 0 => Ok(Some(ReadableSize(s as u64))),
                    s => Err(E::invalid_value(Unexpected::Signed(s), &self)),
                }
            }

            fn visit_u64<E>(self, size: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Some(ReadableSize(size)))
            }

            fn visit_str<E>(self, size_str: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                parse_limit(size_str).map_err(E::custom)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }
        }

        deserializer.deserialize_any(LimitVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_size() {
        let s = ReadableSize::kb(2);
        assert_eq!(s.0, 2048);
        let s = ReadableSize::mb(2);
        assert_eq!(s.0, 2 * 1024 * 1024);
        let s = ReadableSize::gb(2);
        assert_eq!(s.0, 2 * 1024 * 1024 * 1024);
        assert_eq!(ReadableSize(u64::MAX).saturating_double(), ReadableSize(u64::MAX));
    }

    #[test]
    fn test_parse() {
        assert_eq!("128M".parse::<ReadableSize>().unwrap(), ReadableSize::mb(128));
        assert_eq!("1GiB".parse::<ReadableSize>().unwrap(), ReadableSize::gb(1));
        assert_eq!(" 4096 ".parse::<ReadableSize>().unwrap(), ReadableSize::kb(4));
        assert_eq!("0.5K".parse::<ReadableSize>().unwrap(), ReadableSize(512));
        assert!("".parse::<ReadableSize>().is_err());
        assert!("12parsecs".parse::<ReadableSize>().is_err());
        assert!("-1".parse::<ReadableSize>().is_err());
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!("16383P".parse::<ReadableSize>().unwrap(), ReadableSize(16383 * PIB));
        for input in ["16384P", "1e30P", "1e400"] {
            assert!(
                matches!(input.parse::<ReadableSize>(), Err(ParseError::InvalidSize { .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("off").unwrap(), None);
        assert_eq!(parse_limit("-1").unwrap(), None);
        assert_eq!(parse_limit("10G").unwrap(), Some(ReadableSize::gb(10)));
        assert!(parse_limit("-2").is_err());
    }

    #[test]
    fn test_serde_limit() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Holder {
            #[serde(with = "limit")]
            max: Option<ReadableSize>,
        }

        let h: Holder = serde_json::from_str(r#"{"max": -1}"#).unwrap();
        assert_eq!(h.max, None);
        let h: Holder = serde_json::from_str(r#"{"max": "off"}"#).unwrap();
        assert_eq!(h.max, None);
        let h: Holder = serde_json::from_str(r#"{"max": "2MiB"}"#).unwrap();
        assert_eq!(h.max, Some(ReadableSize::mb(2)));
        assert!(serde_json::from_str::<Holder>(r#"{"max": -7}"#).is_err());

        let out = serde_json::to_string(&Holder { max: None }).unwrap();
        assert_eq!(out, r#"{"max":"off"}"#);
        let out = serde_json::to_string(&Holder { max: Some(ReadableSize::mb(3)) }).unwrap();
        assert_eq!(out, r#"{"max":"3MiB"}"#);
    }
}
