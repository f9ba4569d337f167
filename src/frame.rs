//! Frame loop driver
//!
//! The driver never blocks. The host calls [`FrameDriver::tick`] from its
//! per-frame callback; each tick advances the camera controls, renders, and
//! asks the host for the next frame. Ticks stop when the host stops
//! delivering callbacks.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Something that can schedule another frame callback
pub trait FrameHost {
    fn request_frame(&self);
}

/// Per-frame work, called by the driver in a fixed order
pub trait FrameHandler {
    type Error;

    /// Advance time-dependent state (camera damping).
    fn on_update(&mut self, delta_time: f32);

    /// Draw the frame.
    fn on_draw(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Before the first frame was requested
    Idle,
    Running,
}

const FPS_WINDOW: usize = 60;

/// Frame timing shown in the debug panel
#[derive(Debug, Clone)]
pub struct FrameStats {
    frame_count: u64,
    elapsed: Duration,
    recent: VecDeque<Duration>,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            frame_count: 0,
            elapsed: Duration::ZERO,
            recent: VecDeque::with_capacity(FPS_WINDOW),
        }
    }
}

impl FrameStats {
    pub fn record(&mut self, delta: Duration) {
        self.frame_count += 1;
        self.elapsed += delta;
        if self.recent.len() == FPS_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(delta);
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Time since the driver started
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Frames per second averaged over the last 60 frames
    pub fn fps(&self) -> f32 {
        let total: Duration = self.recent.iter().sum();
        if total.is_zero() {
            0.0
        } else {
            self.recent.len() as f32 / total.as_secs_f32()
        }
    }
}

#[derive(Debug)]
pub struct FrameDriver {
    state: DriverState,
    last_tick: Option<Instant>,
    stats: FrameStats,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Idle,
            last_tick: None,
            stats: FrameStats::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Idle -> Running, requesting the first frame. No-op when running.
    pub fn start(&mut self, host: &impl FrameHost) {
        if self.state == DriverState::Running {
            return;
        }
        log::debug!("Frame driver started");
        self.state = DriverState::Running;
        host.request_frame();
    }

    /// Run one frame: controls, then render, then schedule the next frame.
    /// Ignored while idle. The next frame is requested even when drawing
    /// fails, so a lost surface recovers on the following tick.
    pub fn tick<H: FrameHandler>(
        &mut self,
        now: Instant,
        handler: &mut H,
        host: &impl FrameHost,
    ) -> Result<(), H::Error> {
        if self.state == DriverState::Idle {
            return Ok(());
        }

        let delta = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);
        self.stats.record(delta);

        handler.on_update(delta.as_secs_f32());
        let drawn = handler.on_draw();
        host.request_frame();
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<&'static str>>,
        fail_draw: bool,
    }

    impl FrameHost for Recorder {
        fn request_frame(&self) {
            self.log.borrow_mut().push("request");
        }
    }

    struct Handler<'a>(&'a Recorder);

    impl FrameHandler for Handler<'_> {
        type Error = &'static str;

        fn on_update(&mut self, _delta_time: f32) {
            self.0.log.borrow_mut().push("update");
        }

        fn on_draw(&mut self) -> Result<(), Self::Error> {
            self.0.log.borrow_mut().push("draw");
            if self.0.fail_draw {
                Err("surface lost")
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_idle_ignores_ticks() {
        let host = Recorder::default();
        let mut driver = FrameDriver::new();
        driver.tick(Instant::now(), &mut Handler(&host), &host).unwrap();
        assert!(host.log.borrow().is_empty());
        assert_eq!(driver.stats().frame_count(), 0);
    }

    #[test]
    fn test_tick_order() {
        let host = Recorder::default();
        let mut driver = FrameDriver::new();
        driver.start(&host);
        driver.start(&host);
        assert_eq!(driver.state(), DriverState::Running);

        driver.tick(Instant::now(), &mut Handler(&host), &host).unwrap();
        assert_eq!(*host.log.borrow(), ["request", "update", "draw", "request"]);
    }

    #[test]
    fn test_failed_draw_still_schedules() {
        let host = Recorder {
            fail_draw: true,
            ..Default::default()
        };
        let mut driver = FrameDriver::new();
        driver.start(&host);
        assert!(driver.tick(Instant::now(), &mut Handler(&host), &host).is_err());
        assert_eq!(host.log.borrow().last(), Some(&"request"));
    }

    #[test]
    fn test_fps_averages_recent_frames() {
        let mut stats = FrameStats::default();
        for _ in 0..100 {
            stats.record(Duration::from_millis(50));
        }
        for _ in 0..FPS_WINDOW {
            stats.record(Duration::from_millis(10));
        }
        assert_eq!(stats.frame_count(), 160);
        assert!((stats.fps() - 100.0).abs() < 0.5);
    }
}
