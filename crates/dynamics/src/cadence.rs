//! When a structure steps relative to host callbacks.

/// Upper bound on catch-up steps for one frame in [`UpdateMethod::SpecifiedFps`].
pub const MAX_CATCH_UP_STEPS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateMethod {
    /// One step per host physics tick.
    FixedCadence,
    /// One step per rendered frame.
    #[default]
    PerFrame,
    /// Steps at a chosen rate, accumulated across frames. Write-back waits
    /// for the post-simulation callback.
    SpecifiedFps,
}

/// Events delivered by the host loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostCallback {
    PhysicsTick(f32),
    Frame(f32),
    PostSimulation,
}

/// What a structure should do for one callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plan {
    pub step_dt: f32,
    pub steps: u32,
    pub write_back: bool,
}

/// Per-structure time bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Cadence {
    accumulator: f32,
}

impl Cadence {
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Maps `callback` to steps under `method`. `fps` only matters for
    /// [`UpdateMethod::SpecifiedFps`].
    pub fn plan(&mut self, method: UpdateMethod, fps: f32, callback: HostCallback) -> Plan {
        match (method, callback) {
            (UpdateMethod::FixedCadence, HostCallback::PhysicsTick(dt))
            | (UpdateMethod::PerFrame, HostCallback::Frame(dt)) => Plan {
                step_dt: dt,
                steps: 1,
                write_back: true,
            },
            (UpdateMethod::SpecifiedFps, HostCallback::Frame(dt)) => self.accumulate(fps, dt),
            (UpdateMethod::SpecifiedFps, HostCallback::PostSimulation) => Plan {
                write_back: true,
                ..Plan::default()
            },
            _ => Plan::default(),
        }
    }

    fn accumulate(&mut self, fps: f32, dt: f32) -> Plan {
        if !(fps.is_finite() && fps > 0.0 && dt.is_finite() && dt > 0.0) {
            return Plan::default();
        }
        let step_dt = 1.0 / fps;
        self.accumulator += dt;
        // Truncation is intended: whole steps only.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let due = (self.accumulator / step_dt).floor() as u32;
        let steps = if due > MAX_CATCH_UP_STEPS {
            tracing::debug!(due, "dropping simulation time beyond the catch-up limit");
            self.accumulator = 0.0;
            MAX_CATCH_UP_STEPS
        } else {
            #[allow(clippy::cast_precision_loss)]
            let consumed = due as f32 * step_dt;
            self.accumulator -= consumed;
            due
        };
        Plan {
            step_dt,
            steps,
            write_back: false,
        }
    }
}
