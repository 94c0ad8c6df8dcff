//! Terminal progress for `build`

use butterfly_routing::{Progress, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};

/// Creates the contraction progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} vertices ({percent}%) {msg} ETA: {eta}",
        )
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Drives an indicatif bar from contraction events
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            create_progress_bar(0)
        };
        Self { pb }
    }
}

impl Progress for BarProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Initialized { vertices } => {
                self.pb.set_length(vertices as u64);
                self.pb.set_position(0);
            }
            ProgressEvent::Contracted { done, shortcuts, .. } => {
                // Redrawing per vertex is wasted work on large graphs
                if done % 1024 == 0 {
                    self.pb.set_position(done as u64);
                    self.pb.set_message(format!("{shortcuts} shortcuts"));
                }
            }
            ProgressEvent::Recalculated { remaining } => {
                self.pb.set_message(format!("recalculated {remaining} priorities"));
            }
            ProgressEvent::Finished(stats) => {
                self.pb.set_position(stats.contracted as u64);
                self.pb.finish_with_message(format!("{} shortcuts", stats.shortcuts_added));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butterfly_routing::ContractionStats;

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(1000);
        assert_eq!(pb.length(), Some(1000));
        pb.set_position(100);
        pb.finish();
    }

    #[test]
    fn test_bar_follows_events() {
        let progress = BarProgress::new(true);
        progress.report(ProgressEvent::Initialized { vertices: 2048 });
        assert_eq!(progress.pb.length(), Some(2048));

        progress.report(ProgressEvent::Contracted {
            done: 1024,
            total: 2048,
            shortcuts: 10,
        });
        assert_eq!(progress.pb.position(), 1024);

        progress.report(ProgressEvent::Finished(ContractionStats {
            contracted: 2048,
            ..ContractionStats::default()
        }));
        assert_eq!(progress.pb.position(), 2048);
        assert!(progress.pb.is_finished());
    }
}
