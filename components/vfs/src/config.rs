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

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_common::{
    Gid, Mode, Uid, CACHE_MAX_AGE, CACHE_POLL_INTERVAL, CASE_INSENSITIVE_OS, CHUNK_SIZE,
    DEFAULT_DIR_PERMS, DEFAULT_FILE_PERMS, DIR_CACHE_TIME, MODE_DIR, POLL_INTERVAL, READ_WAIT,
    WRITE_BACK, WRITE_WAIT,
};
use tessera_utils::readable_size::ReadableSize;
use tracing::debug;

use crate::{
    cache_mode::CacheMode,
    exclude::{compile_exclude_patterns, ExcludePattern},
};

/// Options for creating the VFS.
///
/// Build one from [`Options::default`] plus overrides, then call
/// [`Options::init`] exactly once to get the [`VfsOptions`] the overlay
/// runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Don't allow seeking in files.
    pub no_seek:          bool,
    /// Don't compare checksums on up/download.
    pub no_checksum:      bool,
    pub read_only:        bool,
    /// Don't read/write the modification time.
    pub no_mod_time:      bool,
    pub case_insensitive: bool,
    /// Report used space as the total size of all files.
    pub used_is_size:     bool,
    /// Use fast (less accurate) fingerprints for change detection.
    pub fast_fingerprint: bool,

    // ========Timing ===>
    /// How long a directory listing is considered valid.
    #[serde(with = "tessera_utils::readable_duration::duration")]
    pub dir_cache_time:      Duration,
    /// How often the backend is polled for changes.
    #[serde(with = "tessera_utils::readable_duration::duration")]
    pub poll_interval:       Duration,
    /// Max time since last access of objects in the cache.
    #[serde(with = "tessera_utils::readable_duration::duration")]
    pub cache_max_age:       Duration,
    /// How often the cache is polled for stale objects.
    #[serde(with = "tessera_utils::readable_duration::duration")]
    pub cache_poll_interval: Duration,
    /// Time to wait for in-sequence writes before giving up.
    #[serde(with = "tessera_utils::readable_duration::duration")]
    pub write_wait:          Duration,
    /// Time to wait for in-sequence reads before seeking.
    #[serde(with = "tessera_utils::readable_duration::duration")]
    pub read_wait:           Duration,
    /// Time to wait after the last close before uploading a dirty file.
    #[serde(with = "tessera_utils::readable_duration::duration")]
    pub write_back:          Duration,

    // ========Sizing ===>
    /// Files are read in chunks of this size, zero disables chunked reads.
    pub chunk_size:            ReadableSize,
    /// If greater than `chunk_size`, the chunk size doubles after each
    /// chunk read until this limit. `None` lets it grow without bound.
    #[serde(with = "tessera_utils::readable_size::limit")]
    pub chunk_size_limit:      Option<ReadableSize>,
    /// Max total size of objects in the cache, `None` is unbounded.
    #[serde(with = "tessera_utils::readable_size::limit")]
    pub cache_max_size:        Option<ReadableSize>,
    /// Target minimum free space on the cache disk, `None` is unset.
    #[serde(with = "tessera_utils::readable_size::limit")]
    pub cache_min_free_space:  Option<ReadableSize>,
    /// Extra read ahead over `chunk_size`, only used with [`CacheMode::Full`].
    pub read_ahead:            ReadableSize,
    /// Total size reported for the disk, `None` asks the backend.
    #[serde(with = "tessera_utils::readable_size::limit")]
    pub disk_space_total_size: Option<ReadableSize>,

    // ========Permissions ===>
    #[serde(with = "mode")]
    pub umask:      Mode,
    /// Owner reported for every file, `None` inherits the current user.
    #[serde(with = "id")]
    pub uid:        Option<Uid>,
    /// Group reported for every file, `None` inherits the current group.
    #[serde(with = "id")]
    pub gid:        Option<Gid>,
    #[serde(with = "mode")]
    pub dir_perms:  Mode,
    #[serde(with = "mode")]
    pub file_perms: Mode,

    pub cache_mode: CacheMode,

    /// Globs of paths that are never uploaded from the cache, see
    /// [`crate::exclude`] for the syntax.
    pub upload_exclude: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            no_seek:               false,
            no_checksum:           false,
            read_only:             false,
            no_mod_time:           false,
            case_insensitive:      case_insensitive_default(std::env::consts::OS),
            used_is_size:          false,
            fast_fingerprint:      false,
            dir_cache_time:        DIR_CACHE_TIME,      // 5m
            poll_interval:         POLL_INTERVAL,       // 1m
            cache_max_age:         CACHE_MAX_AGE,       // 1h
            cache_poll_interval:   CACHE_POLL_INTERVAL, // 1m
            write_wait:            WRITE_WAIT,          // 1s
            read_wait:             READ_WAIT,           // 20ms
            write_back:            WRITE_BACK,          // 5s
            chunk_size:            ReadableSize(CHUNK_SIZE), // 128MiB
            chunk_size_limit:      None,
            cache_max_size:        None,
            cache_min_free_space:  None,
            read_ahead:            ReadableSize(0),
            disk_space_total_size: None,
            umask:                 0,
            uid:                   None,
            gid:                   None,
            dir_perms:             DEFAULT_DIR_PERMS,  // 0777
            file_perms:            DEFAULT_FILE_PERMS, // 0666
            cache_mode:            CacheMode::Off,
            upload_exclude:        vec![],
        }
    }
}

/// Whether paths are case insensitive by default on the host `os`, named
/// as in [`std::env::consts::OS`].
pub fn case_insensitive_default(os: &str) -> bool { CASE_INSENSITIVE_OS.contains(&os) }

impl Options {
    /// Normalizes the options:
    ///
    /// 1. masks `dir_perms` and `file_perms` with `umask`,
    /// 2. sets the directory type bit on `dir_perms`,
    /// 3. compiles `upload_exclude`; globs that fail to compile are logged
    ///    and skipped.
    ///
    /// Nothing here is fatal. Consuming `self` keeps a second pass from
    /// compiling the globs twice.
    pub fn init(mut self) -> VfsOptions {
        self.dir_perms &= !self.umask;
        self.file_perms &= !self.umask;

        // Directories must always look like directories, whatever the umask.
        self.dir_perms |= MODE_DIR;

        let exclude_patterns = compile_exclude_patterns(&self.upload_exclude);
        debug!(
            "vfs options initialized: dir_perms={:o}, file_perms={:o}, {} of {} exclusion globs compiled",
            self.dir_perms,
            self.file_perms,
            exclude_patterns.len(),
            self.upload_exclude.len()
        );

        VfsOptions {
            opt: self,
            exclude_patterns,
        }
    }
}

/// Normalized [`Options`], read only for the lifetime of a mount.
#[derive(Debug, Clone, Serialize)]
pub struct VfsOptions {
    #[serde(flatten)]
    opt:              Options,
    #[serde(skip)]
    exclude_patterns: Vec<ExcludePattern>,
}

impl VfsOptions {
    pub fn options(&self) -> &Options { &self.opt }

    /// Compiled `upload_exclude` globs, in the order they were given.
    pub fn exclude_patterns(&self) -> &[ExcludePattern] { &self.exclude_patterns }

    /// Whether the path, relative to the root of the overlay, must not be
    /// uploaded.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|p| p.is_match(path))
    }

    /// Owner for files and directories, resolving "inherit" to the uid of
    /// this process.
    pub fn uid(&self) -> Uid { self.opt.uid.unwrap_or_else(current_uid) }

    /// Group for files and directories, resolving "inherit" to the gid of
    /// this process.
    pub fn gid(&self) -> Gid { self.opt.gid.unwrap_or_else(current_gid) }

    /// Size of the chunk to read after one of `current` bytes.
    ///
    /// The size doubles up to `chunk_size_limit`, without bound when no
    /// limit is set, and stays put when the limit does not exceed
    /// `chunk_size`.
    pub fn next_chunk_size(&self, current: ReadableSize) -> ReadableSize {
        match self.opt.chunk_size_limit {
            None => current.saturating_double(),
            Some(limit) if limit > self.opt.chunk_size && current < limit => {
                current.saturating_double().min(limit)
            }
            Some(_) => current,
        }
    }
}

#[cfg(unix)]
fn current_uid() -> Uid { rustix::process::getuid().as_raw() }

#[cfg(unix)]
fn current_gid() -> Gid { rustix::process::getgid().as_raw() }

// Platforms without POSIX ids take all ones as "the current user".
#[cfg(not(unix))]
fn current_uid() -> Uid { Uid::MAX }

#[cfg(not(unix))]
fn current_gid() -> Gid { Gid::MAX }

/// Serde adapter writing modes as octal strings such as `"0755"`. Integers
/// are accepted as they are.
mod mode {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use tessera_common::Mode;

    use crate::loader::parse::parse_mode;

    pub fn serialize<S>(value: &Mode, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&format_args!("{:04o}", value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Mode, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(Mode),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(mode) => Ok(mode),
            Raw::Str(s) => parse_mode(&s).map_err(de::Error::custom),
        }
    }
}

/// Serde adapter for user and group ids. `None` is written as `"inherit"`;
/// `"inherit"`, `-1` and the all ones id read back as `None`.
mod id {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::loader::parse::parse_id;

    const INHERIT: &str = "inherit";

    pub fn serialize<S>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(id) => serializer.serialize_u32(*id),
            None => serializer.serialize_str(INHERIT),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Int(id)) => parse_id(&id.to_string()).map_err(de::Error::custom),
            Some(Raw::Str(s)) => parse_id(&s).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_common::{MODE_PERM_MASK, MODE_TYPE_MASK};

    use super::*;

    fn globs(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn defaults() {
        let opt = Options::default();
        assert_eq!(opt.dir_cache_time, Duration::from_secs(300));
        assert_eq!(opt.poll_interval, Duration::from_secs(60));
        assert_eq!(opt.cache_max_age, Duration::from_secs(3600));
        assert_eq!(opt.cache_poll_interval, Duration::from_secs(60));
        assert_eq!(opt.write_wait, Duration::from_millis(1000));
        assert_eq!(opt.read_wait, Duration::from_millis(20));
        assert_eq!(opt.write_back, Duration::from_secs(5));
        assert_eq!(opt.chunk_size, ReadableSize::mb(128));
        assert_eq!(opt.chunk_size_limit, None);
        assert_eq!(opt.cache_max_size, None);
        assert_eq!(opt.cache_min_free_space, None);
        assert_eq!(opt.disk_space_total_size, None);
        assert_eq!(opt.read_ahead, ReadableSize(0));
        assert_eq!(opt.umask, 0);
        assert_eq!((opt.uid, opt.gid), (None, None));
        assert_eq!((opt.dir_perms, opt.file_perms), (0o777, 0o666));
        assert_eq!(opt.cache_mode, CacheMode::Off);
        assert!(opt.upload_exclude.is_empty());
        assert!(!opt.no_seek && !opt.no_checksum && !opt.read_only && !opt.no_mod_time);
        assert!(!opt.used_is_size && !opt.fast_fingerprint);
    }

    #[test]
    fn defaults_are_fresh_values() {
        let mut a = Options::default();
        a.upload_exclude.push("*.tmp".into());
        a.read_only = true;
        assert_eq!(Options::default().upload_exclude.len(), 0);
        assert!(!Options::default().read_only);
    }

    #[test]
    fn case_insensitive_by_platform() {
        assert!(case_insensitive_default("windows"));
        assert!(case_insensitive_default("macos"));
        assert!(!case_insensitive_default("linux"));
        assert!(!case_insensitive_default("freebsd"));

        let expected = cfg!(any(target_os = "windows", target_os = "macos"));
        assert_eq!(Options::default().case_insensitive, expected);
    }

    #[test]
    fn umask_022() {
        let opt = Options {
            umask: 0o022,
            ..Default::default()
        }
        .init();
        assert_eq!(opt.options().dir_perms, 0o755 | MODE_DIR);
        assert_eq!(opt.options().file_perms, 0o644);
    }

    #[test]
    fn directory_bit_always_set() {
        for umask in [0, 0o022, 0o077, 0o777, 0o7777, u32::MAX] {
            for perms in [0, 0o700, 0o777, 0o4755] {
                let opt = Options {
                    umask,
                    dir_perms: perms,
                    file_perms: perms,
                    ..Default::default()
                }
                .init();
                let o = opt.options();
                assert_eq!(o.dir_perms & MODE_DIR, MODE_DIR, "umask {umask:o} perms {perms:o}");
                assert_eq!(o.dir_perms & MODE_TYPE_MASK, MODE_DIR);
                assert_eq!(o.dir_perms & MODE_PERM_MASK, perms & !umask & MODE_PERM_MASK);
                // the umask never adds bits back
                assert_eq!(o.file_perms & umask, 0);
                assert_eq!(o.file_perms, perms & !umask);
            }
        }
    }

    #[test]
    fn init_leaves_other_fields_alone() {
        let raw = Options {
            umask: 0o027,
            chunk_size_limit: None,
            cache_max_size: Some(ReadableSize::gb(10)),
            uid: Some(1000),
            cache_mode: CacheMode::Writes,
            ..Default::default()
        };
        let opt = raw.clone().init();
        let o = opt.options();
        assert_eq!(o.chunk_size_limit, None);
        assert_eq!(o.cache_max_size, Some(ReadableSize::gb(10)));
        assert_eq!(o.uid, Some(1000));
        assert_eq!(o.umask, 0o027);
        assert_eq!(o.cache_mode, CacheMode::Writes);
        assert_eq!(o.upload_exclude, raw.upload_exclude);
    }

    #[test]
    fn exclude_patterns_keep_order() {
        let opt = Options {
            upload_exclude: globs(&["*.tmp", "/build/**", "*.{o,a}", ".git/**"]),
            ..Default::default()
        }
        .init();
        let compiled: Vec<&str> = opt.exclude_patterns().iter().map(|p| p.glob()).collect();
        assert_eq!(compiled, vec!["*.tmp", "/build/**", "*.{o,a}", ".git/**"]);
    }

    #[test]
    fn malformed_glob_is_skipped() {
        let opt = Options {
            upload_exclude: globs(&["*.tmp", "[", "cache/**"]),
            ..Default::default()
        }
        .init();
        let compiled: Vec<&str> = opt.exclude_patterns().iter().map(|p| p.glob()).collect();
        assert_eq!(compiled, vec!["*.tmp", "cache/**"]);
        assert_eq!(opt.options().upload_exclude.len(), 3);

        assert!(opt.is_excluded("a/b.tmp"));
        assert!(opt.is_excluded("cache/blob"));
        assert!(!opt.is_excluded("notes.txt"));
    }

    #[test]
    fn blank_glob_excludes_nothing() {
        let opt = Options {
            upload_exclude: globs(&["", "*.tmp", "  "]),
            ..Default::default()
        }
        .init();
        assert_eq!(opt.exclude_patterns().len(), 1);
        assert!(opt.is_excluded("a.tmp"));
        assert!(!opt.is_excluded("a"));
        assert!(!opt.is_excluded("dir/notes.txt"));

        let only_blank = Options {
            upload_exclude: globs(&[""]),
            ..Default::default()
        }
        .init();
        assert!(only_blank.exclude_patterns().is_empty());
        assert!(!only_blank.is_excluded("a"));
        assert!(!only_blank.is_excluded(""));
    }

    #[test]
    fn explicit_ids_win() {
        let opt = Options {
            uid: Some(42),
            gid: Some(7),
            ..Default::default()
        }
        .init();
        assert_eq!((opt.uid(), opt.gid()), (42, 7));
    }

    #[cfg(unix)]
    #[test]
    fn inherited_ids_resolve_to_process() {
        let opt = Options::default().init();
        assert_eq!(opt.uid(), rustix::process::getuid().as_raw());
        assert_eq!(opt.gid(), rustix::process::getgid().as_raw());
    }

    #[test]
    fn chunk_growth() {
        let limited = Options {
            chunk_size: ReadableSize::mb(128),
            chunk_size_limit: Some(ReadableSize::mb(512)),
            ..Default::default()
        }
        .init();
        assert_eq!(limited.next_chunk_size(ReadableSize::mb(128)), ReadableSize::mb(256));
        assert_eq!(limited.next_chunk_size(ReadableSize::mb(256)), ReadableSize::mb(512));
        assert_eq!(limited.next_chunk_size(ReadableSize::mb(384)), ReadableSize::mb(512));
        assert_eq!(limited.next_chunk_size(ReadableSize::mb(512)), ReadableSize::mb(512));

        let unbounded = Options::default().init();
        assert_eq!(unbounded.next_chunk_size(ReadableSize::mb(128)), ReadableSize::mb(256));

        // a limit below the chunk size is stored as given and disables growth
        let below = Options {
            chunk_size: ReadableSize::mb(128),
            chunk_size_limit: Some(ReadableSize::mb(64)),
            ..Default::default()
        }
        .init();
        assert_eq!(below.options().chunk_size_limit, Some(ReadableSize::mb(64)));
        assert_eq!(below.next_chunk_size(ReadableSize::mb(128)), ReadableSize::mb(128));
    }

    #[test]
    fn serialize_normalized() {
        let opt = Options {
            umask: 0o022,
            upload_exclude: globs(&["*.tmp"]),
            ..Default::default()
        }
        .init();
        let json: serde_json::Value = serde_json::to_value(&opt).unwrap();
        assert_eq!(json["umask"], "0022");
        assert_eq!(json["file_perms"], "0644");
        assert_eq!(json["dir_perms"], "40755");
        assert_eq!(json["chunk_size"], "128MiB");
        assert_eq!(json["chunk_size_limit"], "off");
        assert_eq!(json["dir_cache_time"], "5m");
        assert_eq!(json["cache_mode"], "off");
        assert_eq!(json["uid"], "inherit");
        assert_eq!(json["upload_exclude"][0], "*.tmp");
        assert!(json.get("exclude_patterns").is_none());
    }

    #[test]
    fn options_round_trip_through_json() {
        let opt = Options {
            umask: 0o002,
            uid: Some(1000),
            cache_min_free_space: Some(ReadableSize::gb(1)),
            ..Default::default()
        };
        let back: Options = serde_json::from_str(&serde_json::to_string(&opt).unwrap()).unwrap();
        assert_eq!(back, opt);
    }
}
