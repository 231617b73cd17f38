// Copyright 2025 Google LLC
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

//! Tracing subscriber setup for the CLI

use clap_verbosity_flag::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::EnvFilter;

/// Map `-v` flags to a global tracing level; `None` leaves the default
fn level_for(filter: LevelFilter) -> Option<Level> {
    match filter {
        LevelFilter::Off => None,
        LevelFilter::Error => Some(Level::ERROR),
        LevelFilter::Warn => Some(Level::WARN),
        LevelFilter::Info => Some(Level::INFO),
        LevelFilter::Debug => Some(Level::DEBUG),
        LevelFilter::Trace => Some(Level::TRACE),
    }
}

/// Install the global subscriber
///
/// With `RUST_LOG` set, an `EnvFilter` drives filtering and targets are
/// shown. Otherwise the `-v` count picks one global level. `log` records from
/// the discovery crates come through the subscriber's `log` bridge.
pub fn init(verbosity: LevelFilter) {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_timer(ChronoUtc::default())
            .with_target(true)
            .with_env_filter(EnvFilter::from_default_env())
            .init();
        return;
    }

    let subscriber = tracing_subscriber::fmt()
        .with_timer(ChronoUtc::default())
        .with_target(false);
    match level_for(verbosity) {
        Some(level) => subscriber.with_max_level(level).init(),
        None => subscriber.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(level_for(LevelFilter::Off), None);
        assert_eq!(level_for(LevelFilter::Warn), Some(Level::WARN));
        assert_eq!(level_for(LevelFilter::Trace), Some(Level::TRACE));
    }

    #[derive(clap::Parser)]
    struct Args {
        #[command(flatten)]
        verbose: clap_verbosity_flag::Verbosity,
    }

    fn level_from(args: &[&str]) -> Option<Level> {
        use clap::Parser;
        let argv = std::iter::once("thread-commission").chain(args.iter().copied());
        let args = Args::parse_from(argv);
        level_for(args.verbose.log_level_filter())
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(level_from(&[]), Some(Level::ERROR));
        assert_eq!(level_from(&["-vv"]), Some(Level::INFO));
        assert_eq!(level_from(&["-vvv"]), Some(Level::DEBUG));
        assert_eq!(level_from(&["-q"]), None);
    }
}
