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

//! Loading [`Options`] from config files and the environment.
//!
//! Sources are layered, later ones win:
//! defaults → TOML file → `TESSERA_VFS_*` environment → command line.

use std::path::Path;

use snafu::ResultExt;
use tessera_common::VFS_ENV_PREFIX;
use tessera_utils::env::env_key;
use tracing::debug;

use crate::{
    config::Options,
    err::{InvalidValueSnafu, ParseConfigSnafu, ReadConfigFileSnafu, ReadEnvSnafu, Result},
};

/// Parsers for option values given as text, shared by the environment
/// loader and the command line.
pub mod parse {
    use std::time::Duration;

    use tessera_common::Mode;
    use tessera_utils::{readable_duration::ReadableDuration, readable_size, ReadableSize};

    use crate::{cache_mode::CacheMode, exclude::split_glob_list};

    pub fn parse_bool(s: &str) -> Result<bool, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(format!("{other:?} is not a boolean")),
        }
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        s.parse::<ReadableDuration>()
            .map(Duration::from)
            .map_err(|e| e.to_string())
    }

    pub fn parse_size(s: &str) -> Result<ReadableSize, String> {
        s.parse::<ReadableSize>().map_err(|e| e.to_string())
    }

    /// A size where `off` or `-1` means unbounded.
    pub fn parse_limit(s: &str) -> Result<Option<ReadableSize>, String> {
        readable_size::parse_limit(s).map_err(|e| e.to_string())
    }

    /// Octal permission bits: `022`, `0022`, `0o022`.
    pub fn parse_mode(s: &str) -> Result<Mode, String> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0o")
            .or_else(|| trimmed.strip_prefix("0O"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(format!("{s:?} is not an octal mode"));
        }
        Mode::from_str_radix(digits, 8).map_err(|e| format!("{s:?} is not an octal mode: {e}"))
    }

    /// A user or group id. `inherit`, `-1` and the all ones value mean
    /// "use the id of the current process".
    pub fn parse_id(s: &str) -> Result<Option<u32>, String> {
        match s.trim() {
            "inherit" | "-1" => Ok(None),
            other => match other.parse::<u32>() {
                Ok(u32::MAX) => Ok(None),
                Ok(id) => Ok(Some(id)),
                Err(e) => Err(format!("{other:?} is not an id: {e}")),
            },
        }
    }

    pub fn parse_cache_mode(s: &str) -> Result<CacheMode, String> {
        s.parse::<CacheMode>().map_err(|e| e.to_string())
    }

    pub fn parse_globs(s: &str) -> Result<Vec<String>, String> { Ok(split_glob_list(s)) }
}

use parse::*;

macro_rules! override_field {
    ($opt:ident, $lookup:ident, $prefix:ident, $field:ident, $parse:expr) => {{
        let key = env_key($prefix, stringify!($field));
        if let Some(value) = $lookup(&key)? {
            debug!("overriding vfs option {} from {}", stringify!($field), key);
            $opt.$field = $parse(&value).map_err(|reason| {
                InvalidValueSnafu {
                    key:    key.clone(),
                    value:  value.clone(),
                    reason,
                }
                .build()
            })?;
        }
    }};
}

impl Options {
    /// Parses options from TOML. Keys that are not present keep their
    /// default value, unknown keys are an error.
    pub fn from_toml_str(content: &str) -> Result<Options> {
        toml::from_str(content).context(ParseConfigSnafu { origin: "string" })
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Options> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context(ReadConfigFileSnafu { path })?;
        let opt: Options = toml::from_str(&content).context(ParseConfigSnafu {
            origin: path.display().to_string(),
        })?;
        debug!("loaded vfs options from {}", path.display());
        Ok(opt)
    }

    /// Applies `TESSERA_VFS_<FIELD>` environment variables, reading `.env`
    /// files as well.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(VFS_ENV_PREFIX, |key| {
            tessera_utils::env::var(key).context(ReadEnvSnafu { key })
        })
    }

    /// Overrides every field for which `lookup` returns a value. The key
    /// asked for is `prefix` followed by the upper cased field name.
    pub fn apply_overrides<F>(&mut self, prefix: &str, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<Option<String>>,
    {
        override_field!(self, lookup, prefix, no_seek, parse_bool);
        override_field!(self, lookup, prefix, no_checksum, parse_bool);
        override_field!(self, lookup, prefix, read_only, parse_bool);
        override_field!(self, lookup, prefix, no_mod_time, parse_bool);
        override_field!(self, lookup, prefix, case_insensitive, parse_bool);
        override_field!(self, lookup, prefix, used_is_size, parse_bool);
        override_field!(self, lookup, prefix, fast_fingerprint, parse_bool);

        override_field!(self, lookup, prefix, dir_cache_time, parse_duration);
        override_field!(self, lookup, prefix, poll_interval, parse_duration);
        override_field!(self, lookup, prefix, cache_max_age, parse_duration);
        override_field!(self, lookup, prefix, cache_poll_interval, parse_duration);
        override_field!(self, lookup, prefix, write_wait, parse_duration);
        override_field!(self, lookup, prefix, read_wait, parse_duration);
        override_field!(self, lookup, prefix, write_back, parse_duration);

        override_field!(self, lookup, prefix, chunk_size, parse_size);
        override_field!(self, lookup, prefix, chunk_size_limit, parse_limit);
        override_field!(self, lookup, prefix, cache_max_size, parse_limit);
        override_field!(self, lookup, prefix, cache_min_free_space, parse_limit);
        override_field!(self, lookup, prefix, read_ahead, parse_size);
        override_field!(self, lookup, prefix, disk_space_total_size, parse_limit);

        override_field!(self, lookup, prefix, umask, parse_mode);
        override_field!(self, lookup, prefix, uid, parse_id);
        override_field!(self, lookup, prefix, gid, parse_id);
        override_field!(self, lookup, prefix, dir_perms, parse_mode);
        override_field!(self, lookup, prefix, file_perms, parse_mode);

        override_field!(self, lookup, prefix, cache_mode, parse_cache_mode);
        override_field!(self, lookup, prefix, upload_exclude, parse_globs);
        Ok(())
    }
}
