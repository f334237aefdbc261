use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Service;
use crate::utils::formatting::format_duration;

/// Spinner shown while the backends are being collected.
pub struct CollectionSpinner {
    bar: ProgressBar,
}

impl CollectionSpinner {
    pub fn start(services: &[Service]) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        let names: Vec<&str> = services.iter().map(Service::display_name).collect();
        bar.set_message(format!("Collecting {}...", names.join(" and ")));
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(self, succeeded: bool) {
        let elapsed = format_duration(self.bar.elapsed().as_millis() as u64);
        let message = if succeeded {
            format!("{} Collection complete in {}", style("\u{2714}").green().bold(), elapsed)
        } else {
            format!("{} Collection failed after {}", style("\u{2718}").red().bold(), elapsed)
        };
        self.bar.finish_with_message(message);
    }
}
