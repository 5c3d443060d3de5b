//! Fixed-timestep clock.
//!
//! Wall-clock frame time feeds an accumulator that is drained in fixed
//! `FIXED_DT_US` slices. The simulation only ever sees `now_us()`, a
//! monotonically increasing timestamp that advances by exactly one fixed step
//! per `should_step()`.

use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// One 60 Hz simulation step in microseconds.
pub const FIXED_DT_US: u64 = 16_667;

pub struct TimeState {
    pub fixed_dt_us: u64,
    pub max_accumulator_us: u64,
    accumulator_us: u64,
    sim_time_us: u64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl TimeState {
    pub fn new() -> Self {
        Self {
            fixed_dt_us: FIXED_DT_US,
            max_accumulator_us: 250_000,
            accumulator_us: 0,
            sim_time_us: 0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.feed(real_dt);
    }

    /// Add `real_dt` seconds of wall-clock time to the accumulator.
    pub fn feed(&mut self, real_dt: f64) {
        self.real_dt = real_dt.max(0.0);
        let max_dt = self.max_accumulator_us as f64 / 1_000_000.0;

        // Spiral-of-death cap
        if self.real_dt > max_dt {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms",
                self.real_dt * 1000.0,
                self.max_accumulator_us / 1000
            );
            self.real_dt = max_dt;
        }

        self.accumulator_us += (self.real_dt * 1_000_000.0).round() as u64;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        // FPS smoothing
        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator_us >= self.fixed_dt_us {
            self.accumulator_us -= self.fixed_dt_us;
            self.sim_time_us += self.fixed_dt_us;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    /// Simulation timestamp of the current step.
    pub fn now_us(&self) -> u64 {
        self.sim_time_us
    }

    /// Restart simulation time, e.g. when a level session is replaced.
    pub fn reset_simulation(&mut self) {
        self.accumulator_us = 0;
        self.sim_time_us = 0;
        self.fixed_step_count = 0;
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new()
    }
}
