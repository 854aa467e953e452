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

use std::sync::{Arc, Mutex};

use tessera_utils::ReadableSize;
use tessera_vfs::{Options, VfsOptions};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, prelude::*, Layer};

/// Records the `pattern` field of every warning.
#[derive(Clone, Default)]
struct WarnCapture {
    patterns: Arc<Mutex<Vec<String>>>,
}

struct PatternVisitor(Option<String>);

impl Visit for PatternVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "pattern" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "pattern" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for WarnCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = PatternVisitor(None);
        event.record(&mut visitor);
        self.patterns
            .lock()
            .unwrap()
            .push(visitor.0.unwrap_or_default());
    }
}

fn init_capturing(opt: Options) -> (VfsOptions, Vec<String>) {
    let capture = WarnCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let opt = tracing::subscriber::with_default(subscriber, || opt.init());
    let patterns = capture.patterns.lock().unwrap().clone();
    (opt, patterns)
}

fn globs(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

#[test]
fn one_diagnostic_per_malformed_glob() {
    let (opt, warnings) = init_capturing(Options {
        upload_exclude: globs(&["*.tmp", "[", "cache/**"]),
        ..Default::default()
    });

    assert_eq!(opt.exclude_patterns().len(), 2);
    assert_eq!(opt.exclude_patterns()[0].glob(), "*.tmp");
    assert_eq!(opt.exclude_patterns()[1].glob(), "cache/**");
    assert_eq!(warnings, vec!["[".to_string()]);
}

#[test]
fn no_diagnostics_for_valid_globs() {
    let list = globs(&["*.tmp", "/build/**", "?.log", "*.{jpg,png}"]);
    let (opt, warnings) = init_capturing(Options {
        upload_exclude: list.clone(),
        ..Default::default()
    });

    assert!(warnings.is_empty());
    let compiled: Vec<String> = opt
        .exclude_patterns()
        .iter()
        .map(|p| p.glob().to_string())
        .collect();
    assert_eq!(compiled, list);
}

#[test]
fn every_malformed_glob_is_reported() {
    let (opt, warnings) = init_capturing(Options {
        upload_exclude: globs(&["[", "ok/*", "a{b", "[z-"]),
        ..Default::default()
    });

    assert_eq!(opt.exclude_patterns().len(), 1);
    assert_eq!(opt.exclude_patterns()[0].glob(), "ok/*");
    assert_eq!(warnings, vec!["[", "a{b", "[z-"]);
}

#[test]
fn blank_glob_is_dropped_with_a_diagnostic() {
    let mut opt = Options::from_toml_str(r#"upload_exclude = ["", "*.part"]"#).unwrap();
    opt.upload_exclude.push("   ".to_string());
    let (opt, warnings) = init_capturing(opt);

    assert_eq!(opt.exclude_patterns().len(), 1);
    assert_eq!(opt.exclude_patterns()[0].glob(), "*.part");
    assert_eq!(warnings, vec!["", "   "]);
    assert!(!opt.is_excluded("movie.mkv"));
    assert!(opt.is_excluded("dl/movie.part"));
}

#[test]
fn layered_config_then_init() {
    let mut opt = Options::from_toml_str(
        r#"
        umask = "022"
        chunk_size = "64M"
        upload_exclude = ["*.part"]
        "#,
    )
    .unwrap();
    opt.apply_overrides("X_", |key| {
        Ok(match key {
            "X_UPLOAD_EXCLUDE" => Some("*.part,[,.cache/**".to_string()),
            "X_FILE_PERMS" => Some("0640".to_string()),
            _ => None,
        })
    })
    .unwrap();

    let (opt, warnings) = init_capturing(opt);
    let o = opt.options();
    assert_eq!(o.file_perms, 0o640);
    assert_eq!(o.dir_perms & 0o7777, 0o755);
    assert_eq!(o.chunk_size, ReadableSize::mb(64));
    assert_eq!(o.chunk_size_limit, None);
    assert_eq!(warnings.len(), 1);
    assert!(opt.is_excluded("dl/movie.part"));
    assert!(opt.is_excluded(".cache/x/y"));
    assert!(!opt.is_excluded("movie.mkv"));
}

#[test]
fn normalized_options_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<VfsOptions>();

    let opt = Arc::new(
        Options {
            upload_exclude: globs(&["*.tmp"]),
            ..Default::default()
        }
        .init(),
    );
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let opt = Arc::clone(&opt);
            std::thread::spawn(move || opt.is_excluded(&format!("dir{i}/f.tmp")))
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
}
