use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Render progress receiver. The film reports through this instead of
/// touching any process-global session state.
pub trait ProgressSink: Send {
    fn init(&mut self, total_work: usize);
    fn update(&mut self, num: usize);
    fn done(&mut self);
    fn set_tag(&mut self, tag: &str);
    fn percent(&self) -> f32;
}

/// Console progress bar.
pub struct ConsoleProgress {
    pb: Option<ProgressBar>,
    total: u64,
    count: u64,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        ConsoleProgress {
            pb: None,
            total: 0,
            count: 0,
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        ConsoleProgress::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn init(&mut self, total_work: usize) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        let pb = ProgressBar::new(total_work as u64);
        let template = "{spinner:.bold.green} {msg} [{wide_bar:.cyan}]  ({elapsed_precise}|{eta_precise}) ";
        pb.set_style(
            ProgressStyle::with_template(template)
                .unwrap()
                .progress_chars("█▇▆▅▄▃▂▁  "),
        );
        pb.tick();
        self.pb = Some(pb);
        self.total = total_work as u64;
        self.count = 0;
    }

    fn update(&mut self, num: usize) {
        if num != 0 {
            self.count += num as u64;
            if let Some(pb) = &self.pb {
                pb.inc(num as u64);
            }
        }
    }

    fn done(&mut self) {
        self.count = self.total;
        if let Some(pb) = &self.pb {
            pb.finish();
        }
    }

    fn set_tag(&mut self, tag: &str) {
        if let Some(pb) = &self.pb {
            pb.set_message(String::from(tag));
        }
    }

    fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        return 100.0 * self.count as f32 / self.total as f32;
    }
}

/// Progress sink that discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn init(&mut self, _total_work: usize) {}
    fn update(&mut self, _num: usize) {}
    fn done(&mut self) {}
    fn set_tag(&mut self, _tag: &str) {}
    fn percent(&self) -> f32 {
        return 0.0;
    }
}

/// Monotonic time source for the autosave timers.
pub trait Clock: Send + Sync {
    fn now_seconds(&self) -> f64;
}

/// Wall clock measured from construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        return self.origin.elapsed().as_secs_f64();
    }
}

/// Hand-driven clock for tests.
pub struct ManualClock {
    seconds: std::sync::Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            seconds: std::sync::Mutex::new(0.0),
        }
    }

    pub fn advance(&self, seconds: f64) {
        *self.seconds.lock().unwrap() += seconds;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new()
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        return *self.seconds.lock().unwrap();
    }
}
