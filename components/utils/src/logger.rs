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

use std::sync::Once;

use tracing_appender::{non_blocking::WorkerGuard, rolling::RollingFileAppender, rolling::Rotation};
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, EnvFilter, Registry};

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub type LogGuards = Vec<WorkerGuard>;

#[derive(Clone, Debug)]
pub struct LoggingOptions {
    /// Directory for the daily rolling log file, `None` logs to stderr only.
    pub dir:           Option<String>,
    pub level:         Option<String>,
    /// Also write to stderr when logging to a directory.
    pub append_stdout: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            dir:           None,
            level:         None,
            append_stdout: true,
        }
    }
}

/// Installs the global tracing subscriber. Only the first call has any
/// effect.
///
/// `RUST_LOG` takes precedence over [`LoggingOptions::level`]. The returned
/// guards flush the non-blocking writers on drop and must be kept alive for
/// the lifetime of the process.
pub fn init_global_logging(app_name: &str, opts: &LoggingOptions) -> LogGuards {
    static START: Once = Once::new();
    let mut guards = vec![];

    START.call_once(|| {
        let level = opts.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let stdout_layer = if opts.dir.is_none() || opts.append_stdout {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            guards.push(guard);
            Some(Layer::new().with_target(false).with_writer(writer))
        } else {
            None
        };

        let file_layer = opts.dir.as_ref().map(|dir| {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, app_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            Layer::new().with_ansi(false).with_writer(writer)
        });

        let subscriber = Registry::default()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("a global tracing subscriber is already installed");
        }
    });

    guards
}
