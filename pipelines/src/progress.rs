use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::info;

pub struct ProgressTracker {
    bar: ProgressBar,
    start_time: Instant,
    completed: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) - {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);

        Self {
            bar,
            start_time: Instant::now(),
            completed: 0,
        }
    }

    pub fn update(&mut self, message: impl Into<String>) {
        self.completed += 1;
        self.bar.inc(1);

        let msg = format!("{} - {:.2} sentences/sec", message.into(), self.rate());
        self.bar.set_message(msg);
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_and_clear();

        info!(
            "{}: {} sentences in {:.2}s ({:.2} sentences/sec)",
            message.into(),
            self.completed,
            self.start_time.elapsed().as_secs_f64(),
            self.rate()
        );
    }

    fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.completed as f64 / elapsed
        } else {
            0.0
        }
    }
}
