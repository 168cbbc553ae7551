use super::pair_mut;
use crate::link::Link;
use crate::math;
use crate::particle::Particle;
use glam::Quat;
use std::f32::consts::PI;

/// Applies every enabled link in order: length, rotation anchor, then
/// rotation propagation.
pub fn solve_links(particles: &mut [Particle], links: &[Link], dt: f32) {
    let dt_scale = math::dt_scale(dt);
    for link in links.iter().filter(|l| l.is_enabled()) {
        let Some((start, end)) = pair_mut(particles, link.start.0, link.end.0) else {
            continue;
        };
        correct_length(start, end, link, dt_scale);
        anchor_to_start_rotation(start, end, link, dt_scale);
        propagate_rotation(start, end, link);
    }
}

/// Moves both endpoints along the link toward `rest_length * start.scale`.
fn correct_length(start: &mut Particle, end: &mut Particle, link: &Link, dt_scale: f32) {
    let Some((direction, length)) = math::try_direction(end.current_position - start.current_position) else {
        return;
    };
    let Some((share_start, share_end)) =
        math::free_weights(start.settings.position_anchor, end.settings.position_anchor)
    else {
        return;
    };
    let strength = math::stretch_strength(link.settings.stretchiness, dt_scale);
    if strength <= 0.0 {
        return;
    }
    let target = link.rest_length() * start.scale;
    let correction = direction * ((length - target) * strength);
    start.current_position += correction * share_start;
    end.current_position -= correction * share_end;
}

/// Pulls the end toward its rest direction in the start's frame, keeping
/// its implied velocity.
fn anchor_to_start_rotation(start: &Particle, end: &mut Particle, link: &Link, dt_scale: f32) {
    let strength = link.settings.rotation_anchor_strength;
    if strength <= 0.0 || end.is_position_anchored() {
        return;
    }
    let Some((rest_direction, _)) = math::try_direction(start.rotation * link.start_local_direction()) else {
        return;
    };
    let Some((_, length)) = math::try_direction(end.current_position - start.current_position) else {
        return;
    };
    let target = start.current_position + rest_direction * length;
    let shift = (target - end.current_position) * math::anchor_ease(strength, dt_scale);
    end.current_position += shift;
    end.last_position += shift;
}

fn propagate_rotation(start: &mut Particle, end: &mut Particle, link: &Link) {
    if link.settings.propagate_rotation_to_start && !start.is_rotation_anchored() {
        if let Some((direction, _)) = math::try_direction(end.current_position - start.current_position) {
            let current = (start.rotation * link.start_local_direction()).normalize();
            let swing = Quat::from_rotation_arc(current, direction);
            start.rotation = (swing * start.rotation).normalize();
        }
    }
    if link.settings.propagate_rotation_to_end && !end.is_rotation_anchored() {
        end.rotation = (start.rotation * link.relative_rotation()).normalize();
    }
}

/// Keeps each link's direction within a cone around its home direction.
///
/// The cone's half-angle is `PI * (1 - angle_limiting)`. The end is rotated
/// back onto the cone about the start, keeping its implied velocity.
pub fn limit_angles(particles: &mut [Particle], links: &[Link]) {
    for link in links.iter().filter(|l| l.is_enabled() && l.settings.angle_limiting > 0.0) {
        let max_angle = PI * (1.0 - link.settings.angle_limiting.min(1.0));
        let Some((start, end)) = pair_mut(particles, link.start.0, link.end.0) else {
            continue;
        };
        if end.is_position_anchored() {
            continue;
        }
        let Some((home_direction, _)) = math::try_direction(end.home_position - start.home_position) else {
            continue;
        };
        let Some((direction, length)) = math::try_direction(end.current_position - start.current_position) else {
            continue;
        };
        if home_direction.angle_between(direction) <= max_angle {
            continue;
        }
        let axis = math::try_direction(home_direction.cross(direction))
            .map_or_else(|| home_direction.any_orthonormal_vector(), |(axis, _)| axis);
        let limited = Quat::from_axis_angle(axis, max_angle) * home_direction;
        let shift = start.current_position + limited * length - end.current_position;
        end.current_position += shift;
        end.last_position += shift;
    }
}
