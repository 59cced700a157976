use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::Method;
use url::Url;

pub struct Progress {
    enabled: bool,
    start: Instant,
    bar: ProgressBar,

    http_in_flight: AtomicU64,
    http_done: AtomicU64,
    http_failed: AtomicU64,
    http_bytes: AtomicU64,

    stage: Mutex<String>,
    last_http_label: Mutex<String>,
}

impl Progress {
    pub fn new(enabled: bool) -> Arc<Self> {
        let bar = if enabled {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}  [{elapsed_precise}]")
            {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };

        Arc::new(Self {
            enabled,
            start: Instant::now(),
            bar,
            http_in_flight: AtomicU64::new(0),
            http_done: AtomicU64::new(0),
            http_failed: AtomicU64::new(0),
            http_bytes: AtomicU64::new(0),
            stage: Mutex::new(String::new()),
            last_http_label: Mutex::new(String::new()),
        })
    }

    pub fn set_stage(&self, msg: impl Into<String>) {
        if !self.enabled {
            return;
        }
        if let Ok(mut stage) = self.stage.lock() {
            *stage = msg.into();
        }
        self.refresh();
    }

    pub fn http_start(&self, method: &Method, url: &Url) {
        self.http_in_flight.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            if let Ok(mut last) = self.last_http_label.lock() {
                *last = format!("{method} {}", url.path());
            }
            self.refresh();
        }
    }

    pub fn http_ok(&self, url: &Url, bytes: usize) {
        self.http_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.http_done.fetch_add(1, Ordering::Relaxed);
        self.http_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        if self.enabled {
            if let Ok(mut last) = self.last_http_label.lock() {
                *last = format!("{} ok {}", url.path(), HumanBytes(bytes as u64));
            }
            self.refresh();
        }
    }

    pub fn http_err(&self, url: &Url) {
        self.http_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.http_failed.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            if let Ok(mut last) = self.last_http_label.lock() {
                *last = format!("{} failed", url.path());
            }
            self.refresh();
        }
    }

    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        self.bar.finish_and_clear();
        tracing::debug!(
            elapsed = %HumanDuration(self.start.elapsed()),
            requests = self.http_done.load(Ordering::Relaxed),
            failed = self.http_failed.load(Ordering::Relaxed),
            "done"
        );
    }

    fn refresh(&self) {
        let stage = self.stage.lock().map(|s| s.clone()).unwrap_or_default();
        let last = self
            .last_http_label
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        self.bar.set_message(format!(
            "{stage} | in-flight {in_flight} done {done} failed {failed} | {bytes} | {last}",
            in_flight = self.http_in_flight.load(Ordering::Relaxed),
            done = self.http_done.load(Ordering::Relaxed),
            failed = self.http_failed.load(Ordering::Relaxed),
            bytes = HumanBytes(self.http_bytes.load(Ordering::Relaxed)),
        ));
    }
}
