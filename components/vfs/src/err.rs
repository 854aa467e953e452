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

use std::path::PathBuf;

use snafu::{Location, Snafu, Whatever};

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    /// An upload exclusion glob could not be compiled. [`crate::Options::init`]
    /// recovers from this by dropping the glob.
    #[snafu(display("invalid exclusion pattern {pattern:?}"))]
    InvalidExclusionPattern {
        pattern:  String,
        #[snafu(implicit)]
        location: Location,
        source:   globset::Error,
    },

    /// An upload exclusion glob with nothing to match, which would otherwise
    /// match every path. Recovered from like [`Error::InvalidExclusionPattern`].
    #[snafu(display("empty exclusion pattern {pattern:?}"))]
    EmptyExclusionPattern {
        pattern:  String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("unknown cache mode {value:?}, expected one of off, minimal, writes, full"))]
    InvalidCacheMode {
        value:    String,
        #[snafu(implicit)]
        location: Location,
    },

    // ====Config loading====
    #[snafu(display("failed to read config file {}", path.display()))]
    ReadConfigFile {
        path:     PathBuf,
        #[snafu(implicit)]
        location: Location,
        source:   std::io::Error,
    },

    #[snafu(display("failed to parse config from {origin}"))]
    ParseConfig {
        origin:   String,
        #[snafu(implicit)]
        location: Location,
        source:   toml::de::Error,
    },

    #[snafu(display("failed to read {key}"))]
    ReadEnv {
        key:      String,
        #[snafu(implicit)]
        location: Location,
        source:   Whatever,
    },

    #[snafu(display("invalid value {value:?} for {key}: {reason}"))]
    InvalidValue {
        key:      String,
        value:    String,
        reason:   String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
