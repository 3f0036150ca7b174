//! Download progress throttling and formatting.

use std::time::{Duration, Instant};

/// Default minimum gap between two progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

const UNIT: u64 = 1024;
const PREFIXES: &[char] = &['K', 'M', 'G', 'T', 'P', 'E'];

/// Rate limiter for progress callbacks.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_report: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: None,
        }
    }

    /// Returns true (and records `now`) if a report is due.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = match self.last_report {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        };
        if due {
            self.last_report = Some(now);
        }
        due
    }
}

/// Format a byte count with binary units, e.g. `512 B`, `1.5KB`, `3.0MB`.
pub fn human_bytes(bytes: u64) -> String {
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut exp = 0usize;
    let mut scaled = bytes;
    while scaled >= UNIT && exp < PREFIXES.len() {
        scaled /= UNIT;
        exp += 1;
    }
    let value = bytes as f64 / (UNIT as f64).powi(exp as i32);
    format!("{value:.1}{}B", PREFIXES[exp - 1])
}

/// Render one progress line. `total` is `None` when the server sent no length.
pub fn format_progress(read: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let percent = read as f64 / total as f64 * 100.0;
            format!(
                "Downloading: [{percent:.2}%] {}/{}",
                human_bytes(read),
                human_bytes(total)
            )
        }
        _ => format!("Downloading: {}", human_bytes(read)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_reports_first_then_waits_for_interval() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_millis(100));

        assert!(throttle.ready(start));
        assert!(!throttle.ready(start + Duration::from_millis(50)));
        assert!(!throttle.ready(start + Duration::from_millis(100)));
        assert!(throttle.ready(start + Duration::from_millis(101)));
        assert!(!throttle.ready(start + Duration::from_millis(150)));
    }

    #[test]
    fn human_bytes_uses_binary_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1023), "1023 B");
        assert_eq!(human_bytes(1024), "1.0KB");
        assert_eq!(human_bytes(1536), "1.5KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0MB");
        assert_eq!(human_bytes(5 * 1024 * 1024 * 1024), "5.0GB");
    }

    #[test]
    fn human_bytes_handles_max_value() {
        assert_eq!(human_bytes(u64::MAX), "16.0EB");
    }

    #[test]
    fn progress_line_includes_percent_when_total_known() {
        assert_eq!(
            format_progress(512, Some(2048)),
            "Downloading: [25.00%] 512 B/2.0KB"
        );
    }

    #[test]
    fn progress_line_without_total_shows_bytes_only() {
        assert_eq!(format_progress(2048, None), "Downloading: 2.0KB");
        assert_eq!(format_progress(10, Some(0)), "Downloading: 10 B");
    }
}
