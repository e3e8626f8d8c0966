//! Diagnostic logging shared by both stages
//!
//! Both stages write to the same stderr, so every line carries the stage
//! that produced it.

use console::{StyledObject, style};
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

use crate::execution::Stage;

fn level_label(level: Level) -> StyledObject<&'static str> {
    match level {
        Level::Error => style("ERROR").red().bold(),
        Level::Warn => style("WARN ").yellow().bold(),
        Level::Info => style("INFO ").green(),
        Level::Debug => style("DEBUG").cyan(),
        Level::Trace => style("TRACE").dim(),
    }
}

fn stage_tag(stage: Stage) -> &'static str {
    match stage {
        Stage::Outer => "jail",
        Stage::Inner => "jail/setup",
    }
}

/// Initialize the logger for `stage`.
///
/// `-v` raises the default from `warn` to `debug`; `RUST_LOG` overrides
/// both. Calling it twice is harmless.
pub fn init_logger(verbose: bool, stage: Stage) {
    let default = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let tag = stage_tag(stage);

    let mut builder = Builder::new();
    builder
        .filter_level(default)
        .parse_env(Env::default().filter_or("RUST_LOG", default.as_str()))
        .format(move |buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                level_label(record.level()),
                style(tag).dim(),
                record.args()
            )
        });

    let _ = builder.try_init();
}
