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

//! Upload exclusion patterns.
//!
//! Globs follow the usual filter rules:
//! - `*` and `?` never match `/`, `**` matches across directories.
//! - `[abc]` character classes, `{a,b}` alternation and `\` escapes.
//! - A glob starting with `/` is anchored at the root of the overlay,
//!   anything else may match at any directory depth, so `*.tmp` matches
//!   both `a.tmp` and `dir/a.tmp`.
//! - Matching is case sensitive.

use std::fmt::Debug;

use globset::{GlobBuilder, GlobMatcher};
use snafu::{ensure, ResultExt};
use tracing::warn;

use crate::err::{EmptyExclusionPatternSnafu, InvalidExclusionPatternSnafu, Result};

/// A compiled upload exclusion glob.
#[derive(Clone)]
pub struct ExcludePattern {
    glob:    String,
    matcher: GlobMatcher,
}

impl ExcludePattern {
    /// Compiles `glob` into a matcher. A glob that is blank, or only `/`,
    /// is rejected.
    pub fn new(glob: &str) -> Result<Self> {
        let (anchored, body) = match glob.strip_prefix('/') {
            Some(body) => (true, body),
            None => (false, glob),
        };
        ensure!(!body.trim().is_empty(), EmptyExclusionPatternSnafu { pattern: glob });

        let pattern = if anchored { body.to_string() } else { format!("**/{body}") };
        let matcher = GlobBuilder::new(&pattern)
            .case_insensitive(false)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .context(InvalidExclusionPatternSnafu { pattern: glob })?
            .compile_matcher();
        Ok(Self {
            glob: glob.to_string(),
            matcher,
        })
    }

    /// The glob as it was supplied.
    pub fn glob(&self) -> &str { &self.glob }

    /// Tests a path relative to the root of the overlay. A leading `/` is
    /// ignored.
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path.trim_start_matches('/'))
    }
}

impl Debug for ExcludePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExcludePattern").field(&self.glob).finish()
    }
}

/// Compiles every glob that can be compiled, keeping their order.
///
/// A glob that fails to compile is dropped with a warning; the others are
/// still compiled.
pub(crate) fn compile_exclude_patterns(globs: &[String]) -> Vec<ExcludePattern> {
    globs
        .iter()
        .filter_map(|glob| match ExcludePattern::new(glob) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(
                    pattern = %glob,
                    error = %snafu::Report::from_error(e),
                    "could not compile glob for VFS upload exclusion, ignoring it"
                );
                None
            }
        })
        .collect()
}

/// Splits a comma separated list of globs, leaving commas inside `{...}`
/// alternations alone. Empty entries are skipped.
pub fn split_glob_list(list: &str) -> Vec<String> {
    let mut globs = vec![];
    let mut current = String::new();
    let mut depth = 0usize;
    let mut escaped = false;
    for c in list.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                globs.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    globs.push(current);
    globs
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}
