use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

fn default_style() -> ProgressStyle {
    match ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {prefix} {pos} files {msg}")
    {
        Ok(style) => style,
        Err(_) => ProgressStyle::default_spinner(),
    }
}

/// Spinner that advances every `every` candidate files; `every == 0` keeps it silent.
pub struct ScanProgress {
    bar: ProgressBar,
    every: u64,
    seen: u64,
}

impl ScanProgress {
    pub fn new(label: &str, every: u64, visible: bool) -> Self {
        let target = if visible && every > 0 {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(default_style());
        bar.set_prefix(format!("scanning {label}"));
        Self { bar, every, seen: 0 }
    }

    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::new("", 0, false)
    }

    pub fn tick(&mut self) {
        self.seen += 1;
        if self.every > 0 && self.seen % self.every == 0 {
            self.bar.set_position(self.seen);
        }
    }

    #[cfg(test)]
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn finish(&self) {
        self.bar.set_position(self.seen);
        self.bar.finish_with_message("done");
    }
}
