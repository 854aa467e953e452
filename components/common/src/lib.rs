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

pub const TESSERA: &str = "tessera";

/// Prefix of every environment variable that overrides a VFS option,
/// e.g. `TESSERA_VFS_CACHE_MODE`.
pub const VFS_ENV_PREFIX: &str = "TESSERA_VFS_";

// POSIX file type bits, see inode(7).
pub const MODE_TYPE_MASK: u32 = 0o170_000;
pub const MODE_DIR: u32 = 0o040_000;
pub const MODE_PERM_MASK: u32 = 0o7_777;

pub const DEFAULT_DIR_PERMS: u32 = 0o777;
pub const DEFAULT_FILE_PERMS: u32 = 0o666;

// Files are read from the backend in chunks of this size.
pub const CHUNK_SIZE: u64 = 128 << 20; // 128 MiB

pub const DIR_CACHE_TIME: Duration = Duration::from_secs(5 * 60);
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(3600);
pub const CACHE_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const WRITE_WAIT: Duration = Duration::from_millis(1000);
pub const READ_WAIT: Duration = Duration::from_millis(20);
pub const WRITE_BACK: Duration = Duration::from_secs(5);

/// Host operating systems whose native filesystems are case insensitive
/// by default, as reported by [`std::env::consts::OS`].
pub const CASE_INSENSITIVE_OS: [&str; 2] = ["windows", "macos"];

pub type Uid = u32;
pub type Gid = u32;
pub type Mode = u32;
