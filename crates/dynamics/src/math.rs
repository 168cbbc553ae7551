//! Shared numeric helpers for the simulation steps.

use glam::Vec3;

/// Squared lengths below this are degenerate; the correction that needed
/// the direction is skipped for the step.
pub const EPSILON: f32 = compute::kernels::collide::DEGENERATE_EPSILON;

/// Rate the ease and decay constants are tuned against.
pub const REFERENCE_FPS: f32 = 60.0;

/// Anchor weights above this snap instead of easing.
pub const FULL_ANCHOR: f32 = 0.99;

/// Step length expressed in reference frames.
#[inline]
#[must_use]
pub fn dt_scale(dt: f32) -> f32 {
    dt * REFERENCE_FPS
}

/// Blend factor toward a target for an anchor weight in `[0, 1]`.
#[must_use]
pub fn anchor_ease(weight: f32, dt_scale: f32) -> f32 {
    if weight > FULL_ANCHOR {
        1.0
    } else if weight <= 0.0 {
        0.0
    } else {
        1.0 - (-(weight * weight) * dt_scale).exp()
    }
}

/// Fraction of the length error a link removes in one step.
///
/// Zero stretchiness restores the rest length exactly, one never corrects.
#[must_use]
pub fn stretch_strength(stretchiness: f32, dt_scale: f32) -> f32 {
    if stretchiness <= 1e-4 {
        return 1.0;
    }
    if stretchiness >= 1.0 {
        return 0.0;
    }
    let stiffness = 1.0 / stretchiness - 1.0;
    1.0 - (-stiffness * dt_scale).exp()
}

/// Velocity multiplier for one step of friction.
#[inline]
#[must_use]
pub fn friction_decay(friction: f32, dt_scale: f32) -> f32 {
    (-friction.max(0.0) * dt_scale).exp()
}

/// Unit direction and length of `v`, or `None` when `v` is degenerate.
#[must_use]
pub fn try_direction(v: Vec3) -> Option<(Vec3, f32)> {
    let length_sq = v.length_squared();
    if !length_sq.is_finite() || length_sq < EPSILON {
        return None;
    }
    let length = length_sq.sqrt();
    Some((v / length, length))
}

/// How far each of two particles may move, from their position anchors.
///
/// Returns the shares of a shared correction `(a, b)`, summing to one, or
/// `None` when both are fully anchored.
#[must_use]
pub fn free_weights(anchor_a: f32, anchor_b: f32) -> Option<(f32, f32)> {
    let free = |anchor: f32| {
        if anchor > FULL_ANCHOR {
            0.0
        } else {
            1.0 - anchor.clamp(0.0, 1.0)
        }
    };
    let (a, b) = (free(anchor_a), free(anchor_b));
    let total = a + b;
    if total < EPSILON {
        return None;
    }
    Some((a / total, b / total))
}
