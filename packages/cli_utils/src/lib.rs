#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for `scout build`.
//!
//! The infrastructure aggregator is the only build stage long enough to
//! need a bar; it reports one tick per catalogue category through
//! [`ProgressCallback`]. Stage timings from the pipeline go through `log`
//! and share the terminal with the bar via [`init_logger`].

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use scout_features::ProgressCallback;

pub use indicatif::MultiProgress;

/// Progress of one build stage, drawn as an `indicatif` bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Used once the category count is known.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Spinner labelled `message` while the geometry indexes are built.
    /// Turns into a `categories done/total` bar when the aggregator calls
    /// [`ProgressCallback::set_total()`].
    #[must_use]
    pub fn stage_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} [{bar:40.cyan/dim}] {pos}/{len} categories ({elapsed})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Stage bars must be added to the returned [`MultiProgress`] or log lines
/// will tear them.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Fails only if a logger is already installed.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
