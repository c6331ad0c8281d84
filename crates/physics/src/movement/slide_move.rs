//! Sweep-and-slide collision response.
//!
//! Every move is swept through the world. A blocked move can be deflected
//! along the surface it hit, and a move that starts inside geometry first
//! pushes the character out along the minimum translation vector.
//!
//! The vector math is kept in free functions so it can be tested without a
//! world; [`MoveContext`] applies it to the character.

use glam::Vec3;

use crate::collision::HitResult;

use super::config::MovementConfig;
use super::context::{MoveContext, KINDA_SMALL_NUMBER};
use super::events::MovementEvent;
use super::floor::{is_walkable, MIN_FLOOR_DIST};

/// Extra distance added when pushing out of penetration.
pub const PENETRATION_PULLBACK: f32 = 0.125;

/// Depth assumed when a penetrating hit reports none.
const DEFAULT_PENETRATION_DEPTH: f32 = 0.125;

/// Push applied when the same wall is hit twice in a row.
const SAME_WALL_NUDGE: f32 = 0.01;

/// Project `delta` onto the plane of `normal`, scaled by `time`.
#[inline]
pub fn compute_slide_vector(delta: Vec3, time: f32, normal: Vec3) -> Vec3 {
    (delta - normal * delta.dot(normal)) * time
}

/// Keep a deflected fall from climbing higher than the original move.
///
/// `slide` is the deflection of `delta` off `normal`. Any height above
/// `delta.z * time` is removed by shrinking the whole vector (or dropping it
/// when the move was heading down), and the cut-off part is re-added
/// horizontally along the surface.
pub fn handle_slope_boosting(slide: Vec3, delta: Vec3, time: f32, normal: Vec3) -> Vec3 {
    let mut result = slide;
    if result.z <= 0.0 {
        return result;
    }

    let z_limit = delta.z * time;
    if result.z - z_limit > KINDA_SMALL_NUMBER {
        if z_limit > 0.0 {
            // Rescale all of it so the direction still leaves the surface
            result *= z_limit / result.z;
        } else {
            result = Vec3::ZERO;
        }

        let remainder = slide - result;
        let remainder_xy = Vec3::new(remainder.x, remainder.y, 0.0);
        let normal_xy = Vec3::new(normal.x, normal.y, 0.0).normalize_or_zero();
        result += compute_slide_vector(remainder_xy, 1.0, normal_xy);
    }

    result
}

/// Adjust a slide after hitting a second surface.
///
/// Two surfaces meeting at 90 degrees or less form a corner: slide along
/// their crease. Otherwise slide along the new surface, stopping if that
/// would reverse the move.
pub fn two_wall_adjust(delta: Vec3, hit_normal: Vec3, old_hit_normal: Vec3, hit_time: f32) -> Vec3 {
    let desired = delta;

    if old_hit_normal.dot(hit_normal) <= 0.0 {
        let crease = hit_normal.cross(old_hit_normal).normalize_or_zero();
        let adjusted = crease * delta.dot(crease) * (1.0 - hit_time);
        if desired.dot(adjusted) < 0.0 {
            -adjusted
        } else {
            adjusted
        }
    } else {
        let adjusted = compute_slide_vector(delta, 1.0 - hit_time, hit_normal);
        if adjusted.dot(desired) <= 0.0 {
            Vec3::ZERO
        } else if (hit_normal.dot(old_hit_normal) - 1.0).abs() < KINDA_SMALL_NUMBER {
            adjusted + hit_normal * SAME_WALL_NUDGE
        } else {
            adjusted
        }
    }
}

/// Horizontal `delta` bent to follow a walkable ramp.
///
/// The horizontal part is kept; only height is added so ground speed does
/// not change on slopes. Flat floors, line-trace floors and unwalkable hits
/// leave `delta` unchanged.
pub fn ground_movement_delta(delta: Vec3, ramp: &HitResult, from_line_trace: bool, config: &MovementConfig) -> Vec3 {
    let normal = ramp.normal;
    let is_ramp = normal.z > KINDA_SMALL_NUMBER && normal.z < 1.0 - KINDA_SMALL_NUMBER;

    if is_ramp && !from_line_trace && is_walkable(ramp, config) {
        let floor_dot_delta = normal.dot(delta);
        Vec3::new(delta.x, delta.y, -floor_dot_delta / normal.z)
    } else {
        delta
    }
}

#[inline]
fn is_nearly_zero(v: Vec3, tolerance: f32) -> bool {
    v.abs().max_element() <= tolerance
}

impl MoveContext<'_> {
    /// Sweep the character by `delta` and stop at the first blocking hit.
    ///
    /// A sweep that starts inside geometry does not move.
    pub(crate) fn move_updated(&mut self, delta: Vec3) -> HitResult {
        let start = self.state.position;
        if delta == Vec3::ZERO {
            return HitResult::no_hit(start, start);
        }

        let hit = self.world.sweep(self.shape(), start, start + delta, &self.params());
        if !hit.start_penetrating {
            self.state.position = hit.location;
        }
        hit
    }

    /// [`move_updated`](Self::move_updated), resolving an initial overlap
    /// and retrying once. Blocking hits are reported as impacts.
    pub(crate) fn safe_move(&mut self, delta: Vec3) -> HitResult {
        let mut hit = self.move_updated(delta);

        if hit.start_penetrating {
            let adjustment = self.penetration_adjustment(&hit);
            if self.resolve_penetration(adjustment, &hit) {
                hit = self.move_updated(delta);
            }
        }

        if hit.blocking_hit {
            self.emit(MovementEvent::Impact {
                surface: hit.surface,
                normal: hit.normal,
                contents: hit.contents,
            });
        }
        hit
    }

    /// Minimum translation out of a penetrating hit, limited by
    /// `max_depenetration`.
    pub(crate) fn penetration_adjustment(&self, hit: &HitResult) -> Vec3 {
        if !hit.start_penetrating {
            return Vec3::ZERO;
        }

        let depth = if hit.penetration_depth > 0.0 {
            hit.penetration_depth
        } else {
            DEFAULT_PENETRATION_DEPTH
        };
        let adjustment = self.constrain_direction(hit.normal * (depth + PENETRATION_PULLBACK));
        adjustment.clamp_length_max(self.config.max_depenetration)
    }

    /// Try to push the character out of geometry.
    ///
    /// Tries the adjustment alone, then combined with the adjustment out of
    /// whatever it overlaps next, then combined with the attempted move.
    /// Success marks the character as teleported.
    pub(crate) fn resolve_penetration(&mut self, adjustment: Vec3, hit: &HitResult) -> bool {
        let adjustment = self.constrain_direction(adjustment);
        if adjustment == Vec3::ZERO {
            return false;
        }

        let start = self.state.position;
        let shape = self.shape();
        let params = self.params();

        let first = self.world.sweep(shape, start + adjustment, start + adjustment, &params);
        let mut candidates = vec![adjustment];
        if first.start_penetrating {
            let second = self.penetration_adjustment(&first);
            if second != adjustment {
                candidates.push(adjustment + second);
            }
            let move_delta = self.constrain_direction(hit.trace_end - hit.trace_start);
            if move_delta != Vec3::ZERO {
                candidates.push(adjustment + move_delta);
            }
        }

        for candidate in candidates {
            let target = start + candidate;
            if !self.world.sweep(shape, target, target, &params).start_penetrating {
                log::debug!("Resolved penetration by {:?}", candidate);
                self.state.position = target;
                self.state.just_teleported = true;
                return true;
            }
        }

        log::trace!("Could not resolve penetration at {:?}", start);
        false
    }

    /// Deflection of `delta` off `normal` in the movement plane.
    ///
    /// While falling the deflection may not climb.
    pub(crate) fn slide_vector(&self, delta: Vec3, time: f32, normal: Vec3) -> Vec3 {
        let normal = self.constrain_normal(normal);
        let result = self.constrain_direction(compute_slide_vector(delta, time, normal));

        if self.state.is_falling() {
            handle_slope_boosting(result, delta, time, normal)
        } else {
            result
        }
    }

    /// Slide along the surface of `hit` for the remaining `time` of `delta`.
    ///
    /// Handles one follow-up hit with [`two_wall_adjust`]. Returns the
    /// fraction of the slide that was completed. `hit` is updated to the
    /// last sweep's result.
    pub(crate) fn slide_along_surface(&mut self, delta: Vec3, time: f32, normal: Vec3, hit: &mut HitResult) -> f32 {
        if !hit.blocking_hit {
            return 0.0;
        }

        let mut normal = normal;
        if self.state.is_walking() {
            if normal.z > 0.0 {
                // Not pushed up unwalkable surfaces
                if !is_walkable(hit, self.config) {
                    normal = Vec3::new(normal.x, normal.y, 0.0).normalize_or_zero();
                }
            } else if normal.z < -KINDA_SMALL_NUMBER {
                // Not pushed down into the floor by a ceiling
                let floor = &self.state.current_floor;
                if floor.sweep_distance < MIN_FLOOR_DIST && floor.blocking_hit {
                    let floor_normal = floor.hit_normal();
                    let floor_opposes_move = delta.dot(floor_normal) < 0.0 && floor_normal.z < 1.0 - 1.0e-5;
                    if floor_opposes_move {
                        normal = floor_normal;
                    }
                    normal = Vec3::new(normal.x, normal.y, 0.0).normalize_or_zero();
                }
            }
        }

        let old_hit_normal = normal;
        let mut slide = self.slide_vector(delta, time, normal);
        if slide.dot(delta) <= 0.0 {
            return 0.0;
        }

        *hit = self.safe_move(slide);
        let first_hit_percent = hit.time;
        let mut percent_applied = first_hit_percent;

        if hit.is_valid_blocking_hit() {
            slide = self.constrain_direction(two_wall_adjust(slide, hit.normal, old_hit_normal, hit.time));

            if !is_nearly_zero(slide, 1.0e-3) && slide.dot(delta) > 0.0 {
                *hit = self.safe_move(slide);
                percent_applied += hit.time * (1.0 - first_hit_percent);
            }
        }

        percent_applied.clamp(0.0, 1.0)
    }

    /// The character could not be freed from geometry this step.
    pub(crate) fn on_stuck(&mut self, hit: &HitResult) {
        log::debug!("Stuck in {:?} at {:?}", hit.surface, self.state.position);
        self.state.just_teleported = true;
    }
}
