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

//! Options of the tessera VFS overlay.
//!
//! ```
//! use tessera_vfs::Options;
//!
//! let opt = Options {
//!     umask: 0o022,
//!     upload_exclude: vec!["*.tmp".to_string()],
//!     ..Default::default()
//! }
//! .init();
//!
//! assert_eq!(opt.options().file_perms, 0o644);
//! assert!(opt.is_excluded("scratch/a.tmp"));
//! ```

mod cache_mode;
mod config;
pub mod err;
pub mod exclude;
mod loader;

pub use cache_mode::CacheMode;
pub use config::{case_insensitive_default, Options, VfsOptions};
pub use err::{Error, Result};
pub use exclude::ExcludePattern;
pub use loader::parse;
