use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Outcome of vetting a raw frame delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameDelta {
    /// Usable delta, possibly clamped down to the configured maximum.
    Step(f32),
    /// Delta was non-finite or negative; simulation must skip this frame.
    Skip,
}

/// Clamps a raw delta into `[0, max_dt]`, rejecting values that would poison
/// simulation state.
pub fn sanitize_dt(raw_dt: f32, max_dt: f32) -> FrameDelta {
    if !raw_dt.is_finite() || raw_dt < 0.0 {
        return FrameDelta::Skip;
    }
    if raw_dt > max_dt {
        log::debug!(
            "Frame took {:.1}ms, clamping simulation step to {:.1}ms",
            raw_dt * 1000.0,
            max_dt * 1000.0
        );
        return FrameDelta::Step(max_dt);
    }
    FrameDelta::Step(raw_dt)
}

/// Wall-clock frame timing: one variable step per display refresh.
pub struct FrameClock {
    last_instant: Option<Instant>,
    pub real_dt: f32,
    pub total_time: f64,
    pub frame_count: u64,

    fps_samples: [f32; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f32,
    pub smoothed_frame_time_ms: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_instant: None,
            real_dt: 0.0,
            total_time: 0.0,
            frame_count: 0,
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    pub fn begin_frame(&mut self) -> f32 {
        self.begin_frame_at(Instant::now())
    }

    /// Records a frame boundary at `now` and returns seconds since the previous
    /// one. The first frame has no predecessor and yields zero.
    pub fn begin_frame_at(&mut self, now: Instant) -> f32 {
        self.real_dt = match self.last_instant {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f32(),
            None => 0.0,
        };
        self.last_instant = Some(now);
        self.total_time += f64::from(self.real_dt);
        self.frame_count += 1;

        if self.frame_count > 1 {
            self.fps_samples[self.fps_sample_index] = self.real_dt;
            self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
            let avg_dt: f32 = self.fps_samples.iter().sum::<f32>() / FPS_SAMPLE_COUNT as f32;
            self.smoothed_frame_time_ms = avg_dt * 1000.0;
            self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
        }

        self.real_dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_frame_has_zero_delta() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.begin_frame_at(Instant::now()), 0.0);
        assert_eq!(clock.frame_count, 1);
    }

    #[test]
    fn subsequent_frames_measure_elapsed_time() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.begin_frame_at(start);
        let dt = clock.begin_frame_at(start + Duration::from_millis(20));
        assert!((dt - 0.020).abs() < 1e-6);
        assert!((clock.total_time - 0.020).abs() < 1e-6);
    }

    #[test]
    fn smoothed_fps_tracks_steady_rate() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        for i in 0..=120u64 {
            clock.begin_frame_at(start + Duration::from_millis(i * 10));
        }
        assert!((clock.smoothed_fps - 100.0).abs() < 0.5);
    }

    #[test]
    fn sanitize_rejects_non_finite_and_negative() {
        assert_eq!(sanitize_dt(f32::NAN, 0.25), FrameDelta::Skip);
        assert_eq!(sanitize_dt(f32::INFINITY, 0.25), FrameDelta::Skip);
        assert_eq!(sanitize_dt(-0.01, 0.25), FrameDelta::Skip);
    }

    #[test]
    fn sanitize_clamps_long_frames() {
        assert_eq!(sanitize_dt(3.0, 0.25), FrameDelta::Step(0.25));
        assert_eq!(sanitize_dt(0.016, 0.25), FrameDelta::Step(0.016));
        assert_eq!(sanitize_dt(0.0, 0.25), FrameDelta::Step(0.0));
    }
}
