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

use std::{path::PathBuf, time::Duration};

use clap::Args;
use snafu::{ResultExt, Whatever};
use tessera_common::TESSERA;
use tessera_utils::{
    logger::{init_global_logging, LogGuards, LoggingOptions},
    ReadableSize,
};
use tessera_vfs::{
    parse::{
        parse_bool, parse_cache_mode, parse_duration, parse_id, parse_limit, parse_mode,
        parse_size,
    },
    CacheMode, Options, VfsOptions,
};
use tracing::{debug, info};

const VFS_OPTIONS_HEADER: &str = "VFS options";
const CACHE_OPTIONS_HEADER: &str = "VFS cache options";
const PERMISSION_OPTIONS_HEADER: &str = "Permission options";
const LOGGING_OPTIONS_HEADER: &str = "Logging options";

/// `Option<ReadableSize>` where `None` is "unbounded". Wrapped so clap does
/// not read `Option<Option<_>>` as an optional flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimit(pub Option<ReadableSize>);

fn parse_size_limit(s: &str) -> Result<SizeLimit, String> { parse_limit(s).map(SizeLimit) }

/// `None` inherits the id of the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id(pub Option<u32>);

fn parse_user_id(s: &str) -> Result<Id, String> { parse_id(s).map(Id) }

/// Command line overrides for every VFS option. Flags that are not given
/// leave the value from the config file or environment alone.
#[derive(Debug, Clone, Default, Args)]
pub struct VfsArgs {
    #[arg(long, help = "Don't allow seeking in files", help_heading = VFS_OPTIONS_HEADER,
        value_parser = parse_bool, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub no_seek: Option<bool>,

    #[arg(long, help = "Don't compare checksums on up/download", help_heading = VFS_OPTIONS_HEADER,
        value_parser = parse_bool, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub no_checksum: Option<bool>,

    #[arg(long, help = "Only allow read-only access", help_heading = VFS_OPTIONS_HEADER,
        value_parser = parse_bool, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub read_only: Option<bool>,

    #[arg(long = "no-modtime", help = "Don't read/write the modification time",
        help_heading = VFS_OPTIONS_HEADER,
        value_parser = parse_bool, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub no_mod_time: Option<bool>,

    #[arg(long = "vfs-case-insensitive", help = "If a file name not found, find a case insensitive match",
        help_heading = VFS_OPTIONS_HEADER,
        value_parser = parse_bool, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub case_insensitive: Option<bool>,

    #[arg(long = "vfs-used-is-size", help = "Report used space as the total size of all files",
        help_heading = VFS_OPTIONS_HEADER,
        value_parser = parse_bool, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub used_is_size: Option<bool>,

    #[arg(long = "vfs-fast-fingerprint", help = "Use fast (less accurate) fingerprints for change detection",
        help_heading = VFS_OPTIONS_HEADER,
        value_parser = parse_bool, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub fast_fingerprint: Option<bool>,

    #[arg(long, help = "Time to cache directory entries for", help_heading = VFS_OPTIONS_HEADER,
        value_name = "DURATION", value_parser = parse_duration)]
    pub dir_cache_time: Option<Duration>,

    #[arg(long, help = "Time to wait between polling for changes", help_heading = VFS_OPTIONS_HEADER,
        value_name = "DURATION", value_parser = parse_duration)]
    pub poll_interval: Option<Duration>,

    #[arg(long = "vfs-write-wait", help = "Time to wait for in-sequence write before giving error",
        help_heading = VFS_OPTIONS_HEADER, value_name = "DURATION", value_parser = parse_duration)]
    pub write_wait: Option<Duration>,

    #[arg(long = "vfs-read-wait", help = "Time to wait for in-sequence read before seeking",
        help_heading = VFS_OPTIONS_HEADER, value_name = "DURATION", value_parser = parse_duration)]
    pub read_wait: Option<Duration>,

    #[arg(long = "vfs-read-chunk-size", help = "Read the source objects in chunks",
        help_heading = VFS_OPTIONS_HEADER, value_name = "SIZE", value_parser = parse_size)]
    pub chunk_size: Option<ReadableSize>,

    #[arg(long = "vfs-read-chunk-size-limit",
        help = "If greater than --vfs-read-chunk-size, double the chunk size after each chunk read, until the limit is reached ('off' is unlimited)",
        help_heading = VFS_OPTIONS_HEADER, value_name = "SIZE", value_parser = parse_size_limit)]
    pub chunk_size_limit: Option<SizeLimit>,

    #[arg(long = "vfs-disk-space-total-size", help = "Specify the total space of disk ('off' asks the backend)",
        help_heading = VFS_OPTIONS_HEADER, value_name = "SIZE", value_parser = parse_size_limit)]
    pub disk_space_total_size: Option<SizeLimit>,

    #[arg(long = "vfs-upload-exclude", help = "Glob of paths never uploaded from the cache, may be repeated",
        help_heading = VFS_OPTIONS_HEADER, value_name = "GLOB")]
    pub upload_exclude: Vec<String>,

    // ========Cache ===>
    #[arg(long = "vfs-cache-mode", help = "Cache mode off|minimal|writes|full",
        help_heading = CACHE_OPTIONS_HEADER, value_name = "MODE", value_parser = parse_cache_mode)]
    pub cache_mode: Option<CacheMode>,

    #[arg(long = "vfs-cache-max-age", help = "Max time since last access of objects in the cache",
        help_heading = CACHE_OPTIONS_HEADER, value_name = "DURATION", value_parser = parse_duration)]
    pub cache_max_age: Option<Duration>,

    #[arg(long = "vfs-cache-poll-interval", help = "Interval to poll the cache for stale objects",
        help_heading = CACHE_OPTIONS_HEADER, value_name = "DURATION", value_parser = parse_duration)]
    pub cache_poll_interval: Option<Duration>,

    #[arg(long = "vfs-write-back", help = "Time to writeback files after last use when using cache",
        help_heading = CACHE_OPTIONS_HEADER, value_name = "DURATION", value_parser = parse_duration)]
    pub write_back: Option<Duration>,

    #[arg(long = "vfs-cache-max-size", help = "Max total size of objects in the cache ('off' is unlimited)",
        help_heading = CACHE_OPTIONS_HEADER, value_name = "SIZE", value_parser = parse_size_limit)]
    pub cache_max_size: Option<SizeLimit>,

    #[arg(long = "vfs-cache-min-free-space", help = "Target minimum free space on the disk containing the cache",
        help_heading = CACHE_OPTIONS_HEADER, value_name = "SIZE", value_parser = parse_size_limit)]
    pub cache_min_free_space: Option<SizeLimit>,

    #[arg(long = "vfs-read-ahead", help = "Extra read ahead over --vfs-read-chunk-size when using cache-mode full",
        help_heading = CACHE_OPTIONS_HEADER, value_name = "SIZE", value_parser = parse_size)]
    pub read_ahead: Option<ReadableSize>,

    // ========Permissions ===>
    #[arg(long, help = "Override the permission bits set by the filesystem (octal)",
        help_heading = PERMISSION_OPTIONS_HEADER, value_name = "MODE", value_parser = parse_mode)]
    pub umask: Option<u32>,

    #[arg(long, help = "Override the uid field set by the filesystem ('inherit' uses the current user)",
        help_heading = PERMISSION_OPTIONS_HEADER, value_name = "ID", value_parser = parse_user_id)]
    pub uid: Option<Id>,

    #[arg(long, help = "Override the gid field set by the filesystem ('inherit' uses the current group)",
        help_heading = PERMISSION_OPTIONS_HEADER, value_name = "ID", value_parser = parse_user_id)]
    pub gid: Option<Id>,

    #[arg(long, help = "Directory permissions (octal)", help_heading = PERMISSION_OPTIONS_HEADER,
        value_name = "MODE", value_parser = parse_mode)]
    pub dir_perms: Option<u32>,

    #[arg(long, help = "File permissions (octal)", help_heading = PERMISSION_OPTIONS_HEADER,
        value_name = "MODE", value_parser = parse_mode)]
    pub file_perms: Option<u32>,
}

macro_rules! set_if_given {
    ($args:ident, $opt:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $args.$field {
                $opt.$field = value;
            }
        )+
    };
}

impl VfsArgs {
    pub fn apply(&self, opt: &mut Options) {
        set_if_given!(
            self,
            opt,
            no_seek,
            no_checksum,
            read_only,
            no_mod_time,
            case_insensitive,
            used_is_size,
            fast_fingerprint,
            dir_cache_time,
            poll_interval,
            write_wait,
            read_wait,
            chunk_size,
            cache_mode,
            cache_max_age,
            cache_poll_interval,
            write_back,
            read_ahead,
            umask,
            dir_perms,
            file_perms,
        );

        for (limit, field) in [
            (self.chunk_size_limit, &mut opt.chunk_size_limit),
            (self.disk_space_total_size, &mut opt.disk_space_total_size),
            (self.cache_max_size, &mut opt.cache_max_size),
            (self.cache_min_free_space, &mut opt.cache_min_free_space),
        ] {
            if let Some(SizeLimit(value)) = limit {
                *field = value;
            }
        }

        if let Some(Id(uid)) = self.uid {
            opt.uid = uid;
        }
        if let Some(Id(gid)) = self.gid {
            opt.gid = gid;
        }

        if !self.upload_exclude.is_empty() {
            opt.upload_exclude = self.upload_exclude.clone();
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LoggingArgs {
    #[arg(
        short,
        long,
        help = "Log level, RUST_LOG takes precedence",
        help_heading = LOGGING_OPTIONS_HEADER,
        value_name = "LEVEL",
        default_value = "info"
    )]
    pub level: Option<String>,

    #[arg(
        long,
        help = "Write log files to a directory [default: logs written to stderr]",
        help_heading = LOGGING_OPTIONS_HEADER,
        value_name = "DIRECTORY"
    )]
    pub log_directory: Option<String>,

    #[arg(
        long,
        help = "Disable all logging",
        help_heading = LOGGING_OPTIONS_HEADER,
        conflicts_with_all(["level", "log_directory"])
    )]
    pub no_log: bool,
}

impl LoggingArgs {
    fn load_logging_opts(&self) -> Option<LoggingOptions> {
        if self.no_log {
            return None;
        }
        Some(LoggingOptions {
            dir:           self.log_directory.clone(),
            level:         self.level.clone(),
            append_stdout: true,
        })
    }

    /// Keep the returned guards alive until the command finishes.
    pub fn init(&self) -> LogGuards {
        match self.load_logging_opts() {
            Some(opts) => init_global_logging(TESSERA, &opts),
            None => vec![],
        }
    }
}

/// Everything needed to build the VFS options of a command.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    #[arg(long, short, help = "TOML file with VFS options", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub vfs: VfsArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

impl CommonArgs {
    /// Layers defaults, the config file, `TESSERA_VFS_*` variables and the
    /// command line, then normalizes the result.
    pub fn load_options(&self) -> Result<VfsOptions, Whatever> {
        let mut opt = match &self.config {
            Some(path) => Options::from_toml_file(path)
                .with_whatever_context(|e| format!("failed to load {}; {}", path.display(), e))?,
            None => Options::default(),
        };
        opt.apply_env()
            .whatever_context("failed to read VFS options from the environment")?;
        self.vfs.apply(&mut opt);
        debug!("vfs options before init: {:?}", opt);

        let opt = opt.init();
        info!(
            "vfs options ready: cache mode {}, {} upload exclusion patterns",
            opt.options().cache_mode,
            opt.exclude_patterns().len()
        );
        Ok(opt)
    }
}
