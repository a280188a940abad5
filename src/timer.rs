//! Performance measurement tools.

use std::{
    fmt,
    time::{Duration, Instant},
};

use itertools::Itertools;

/// Weight of the newest sample in a [`Timer`]'s moving average.
const ALPHA: f32 = 0.1;

/// A timer that measures how long an operation takes, as an exponential moving average.
///
/// Displaying the timer with `{}` prints its name, the number of samples recorded since it was
/// last displayed, and the current average.
pub struct Timer {
    name: &'static str,
    avg_ms: Option<f32>,
    samples: u32,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            avg_ms: None,
            samples: 0,
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&mut self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is recorded.
    pub fn start(&mut self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Records a sample measured elsewhere.
    pub fn record(&mut self, duration: Duration) {
        let ms = duration.as_secs_f32() * 1000.0;
        self.avg_ms = Some(match self.avg_ms {
            Some(avg) => avg + ALPHA * (ms - avg),
            None => ms,
        });
        self.samples += 1;
    }

    /// Returns the current moving average, or [`None`] if nothing was recorded yet.
    pub fn average(&self) -> Option<Duration> {
        self.avg_ms.map(|ms| Duration::from_secs_f32(ms / 1000.0))
    }

    /// Resets the sample count shown by the [`fmt::Display`] impl.
    pub fn reset_count(&mut self) {
        self.samples = 0;
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.avg_ms {
            Some(avg) => write!(f, "{}: {}x{avg:.01}ms", self.name, self.samples),
            None => write!(f, "{}: -", self.name),
        }
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Logs frames per second, plus the state of some [`Timer`]s, once per second.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    pub fn tick(&mut self) {
        self.tick_with(&mut []);
    }

    /// Advances the frame counter by 1 and logs FPS and `timers` if one second has passed.
    ///
    /// The sample count of every logged timer is reset afterwards.
    pub fn tick_with(&mut self, timers: &mut [&mut Timer]) {
        self.frames += 1;
        if self.start.elapsed() < Duration::from_secs(1) {
            return;
        }

        if timers.is_empty() {
            log::debug!("{}: {} FPS", self.name, self.frames);
        } else {
            let extra = timers.iter().join(", ");
            log::debug!("{}: {} FPS ({extra})", self.name, self.frames);
        }
        for timer in timers {
            timer.reset_count();
        }

        self.frames = 0;
        self.start = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn moving_average() {
        let mut timer = Timer::new("t");
        assert_eq!(timer.to_string(), "t: -");

        timer.record(Duration::from_millis(10));
        assert_relative_eq!(timer.avg_ms.unwrap(), 10.0);
        timer.record(Duration::from_millis(20));
        assert_relative_eq!(timer.avg_ms.unwrap(), 11.0, epsilon = 1e-4);
        assert_eq!(timer.to_string(), "t: 2x11.0ms");

        timer.reset_count();
        assert_eq!(timer.to_string(), "t: 0x11.0ms");
    }

    #[test]
    fn time_records_a_sample() {
        let mut timer = Timer::new("t");
        let value = timer.time(|| 5);
        assert_eq!(value, 5);
        assert!(timer.average().is_some());
    }
}
