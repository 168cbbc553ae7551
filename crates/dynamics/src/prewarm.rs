//! Settling a structure before its first visible frame.

use crate::hierarchy::Hierarchy;
use crate::math;
use crate::structure::Structure;

/// Largest step the prewarm schedule starts with.
pub const MAX_PREWARM_STEP: f32 = 0.125;

const MAX_SCHEDULE_LEN: usize = 100_000;

/// Step lengths covering `duration` seconds.
///
/// Steps start coarse (up to [`MAX_PREWARM_STEP`]) and ease into
/// `native_dt` along a smoothstep, so the structure settles quickly and
/// ends in the regime it will run in. The last step is clipped so the
/// steps sum to `duration`.
#[must_use]
pub fn prewarm_schedule(duration: f32, native_dt: f32) -> Vec<f32> {
    if !(duration.is_finite() && duration > 0.0 && native_dt.is_finite() && native_dt > 0.0) {
        return Vec::new();
    }
    let native = native_dt.min(duration);
    let coarse = MAX_PREWARM_STEP.min(duration).max(native);
    let mut schedule = Vec::new();
    let mut elapsed = 0.0_f32;
    while duration - elapsed > 1e-6 && schedule.len() < MAX_SCHEDULE_LEN {
        let progress = (elapsed / duration).clamp(0.0, 1.0);
        let eased = progress * progress * (3.0 - 2.0 * progress);
        let dt = (coarse + (native - coarse) * eased).min(duration - elapsed);
        schedule.push(dt);
        elapsed += dt;
    }
    schedule
}

impl Structure {
    /// Restarts from home and simulates `settings.prewarm_time` seconds,
    /// then writes the settled pose back once.
    ///
    /// Does nothing while paused or disabled. The result depends only on
    /// the home pose, so repeating a prewarm reproduces the same pose.
    pub fn prewarm(&mut self, hierarchy: &mut Hierarchy) {
        if self.is_paused() || !self.is_enabled() {
            return;
        }
        self.reset_to_home(hierarchy);
        let fps = self.settings.fps;
        let native = if fps.is_finite() && fps > 0.0 {
            1.0 / fps
        } else {
            tracing::debug!(fps, "no usable fps for prewarm, stepping at the reference rate");
            1.0 / math::REFERENCE_FPS
        };
        let schedule = prewarm_schedule(self.settings.prewarm_time, native);
        if schedule.is_empty() {
            return;
        }
        for dt in &schedule {
            self.simulate(hierarchy, *dt);
        }
        self.write_back(hierarchy);
        tracing::debug!(
            steps = schedule.len(),
            seconds = self.settings.prewarm_time,
            "prewarmed structure"
        );
    }
}
