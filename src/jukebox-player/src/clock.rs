use std::time::{Duration, Instant};

/// Wall-clock position within the current track.
///
/// Time accumulates only while running; pausing freezes the position.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    running_since: Option<Instant>,
    accumulated: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart from zero and run.
    pub fn start(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(Instant::now());
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn reset(&mut self) {
        self.running_since = None;
        self.accumulated = Duration::ZERO;
    }

    /// Jump to `position`, keeping the running/paused state.
    pub fn seek(&mut self, position: Duration) {
        self.accumulated = position;
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn position(&self) -> Duration {
        self.accumulated
            + self
                .running_since
                .map(|since| since.elapsed())
                .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn paused_clock_does_not_advance() {
        let mut clock = PlaybackClock::new();
        clock.start();
        clock.seek(Duration::from_secs(30));
        clock.pause();
        let frozen = clock.position();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.position(), frozen);
        assert!(frozen >= Duration::from_secs(30));
    }

    #[test]
    fn running_clock_advances() {
        let mut clock = PlaybackClock::new();
        clock.start();
        thread::sleep(Duration::from_millis(20));
        assert!(clock.position() >= Duration::from_millis(20));
        clock.reset();
        assert_eq!(clock.position(), Duration::ZERO);
        assert!(!clock.is_running());
    }
}
