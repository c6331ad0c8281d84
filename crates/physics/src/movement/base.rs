//! Base tracking.
//!
//! The base is the surface a walking character stands on. It is held as a
//! [`SurfaceId`] and re-resolved on every use, so a platform removed from
//! the world simply stops resolving.
//!
//! Movable bases carry the character: after the base moves, the character
//! follows by the same translation and rotation. Jumping or walking off a
//! movable base adds its velocity to the character's.

use glam::Vec3;
use thiserror::Error;

use crate::collision::{CollisionQuery, Surface, SurfaceId};

use super::config::MovementConfig;
use super::context::MoveContext;
use super::events::MovementEvent;
use super::state::MovementMode;

/// Fraction of the current speed cap used to push a character off a
/// surface that refuses to be a base.
const JUMP_OFF_SPEED_FRACTION: f32 = 0.85;

/// Errors from changing a character's base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BaseError {
    /// The candidate's own base chain leads back to the character.
    #[error("basing on surface {base} would create a cycle")]
    Cycle { base: SurfaceId },
}

/// Check that standing on `candidate` cannot make `body` its own base.
///
/// Walks the candidate's base chain for at most one step per registered
/// surface. Reaching `body`, or a chain longer than the registry (which can
/// only be a loop), is a cycle.
pub fn check_base_chain(
    world: &dyn CollisionQuery,
    candidate: SurfaceId,
    body: Option<SurfaceId>,
) -> Result<(), BaseError> {
    let mut current = Some(candidate);

    for _ in 0..=world.surface_count() {
        match current {
            None => return Ok(()),
            Some(id) if Some(id) == body => return Err(BaseError::Cycle { base: candidate }),
            Some(id) => current = world.surface(id).and_then(|surface| surface.base),
        }
    }

    Err(BaseError::Cycle { base: candidate })
}

/// Velocity a character standing at `feet` inherits from `surface`.
///
/// Static surfaces impart nothing. Each axis can be masked off.
pub fn imparted_velocity(surface: &Surface, feet: Vec3, config: &MovementConfig) -> Vec3 {
    if !surface.is_dynamic() {
        return Vec3::ZERO;
    }

    let mut velocity = surface.velocity;
    if config.impart_base_angular_velocity {
        velocity += surface.angular_velocity.cross(feet - surface.position);
    }

    Vec3::new(
        if config.impart_base_velocity_x { velocity.x } else { 0.0 },
        if config.impart_base_velocity_y { velocity.y } else { 0.0 },
        if config.impart_base_velocity_z { velocity.z } else { 0.0 },
    )
}

impl MoveContext<'_> {
    /// Stand on `new_base`, or on nothing.
    ///
    /// A base whose chain leads back to this character is rejected and the
    /// current base is kept.
    pub(crate) fn set_base(&mut self, new_base: Option<SurfaceId>) -> Result<(), BaseError> {
        if new_base == self.state.based.base {
            return Ok(());
        }

        if let Some(id) = new_base {
            if let Err(err) = check_base_chain(self.world, id, self.state.body) {
                log::warn!("Set base failed: {}", err);
                return Err(err);
            }
        }

        self.change_base(new_base);
        Ok(())
    }

    /// Base the character on the current floor's surface, if it is walkable.
    pub(crate) fn set_base_from_floor(&mut self) {
        let floor = &self.state.current_floor;
        let base = if floor.is_walkable_floor() { floor.hit_surface() } else { None };

        // A rejected cycle keeps the old base and has been logged
        let _ = self.set_base(base);
    }

    fn change_base(&mut self, new_base: Option<SurfaceId>) {
        let old_base = self.state.based.base;
        self.state.based.base = new_base;

        if new_base.is_some() {
            self.save_base_location();
        } else {
            self.state.based.has_relative_rotation = false;
            self.state.current_floor.clear();
        }

        log::debug!("Base changed from {:?} to {:?}", old_base, new_base);
        self.emit(MovementEvent::BaseChanged { base: new_base });

        if let Some(id) = new_base {
            let refuses = self.world.surface(id).is_some_and(|surface| !surface.can_be_base);
            if refuses {
                self.jump_off(id);
            }
        }
    }

    /// Record the base transform and the character's offset from it.
    ///
    /// Only movable bases need this; static ones never carry the character.
    pub(crate) fn save_base_location(&mut self) {
        if !self.has_valid_data() {
            return;
        }

        let Some(surface) = self.state.based.base.and_then(|id| self.world.surface(id)) else {
            return;
        };
        if !surface.is_dynamic() {
            return;
        }

        self.state.old_base_location = surface.position;
        self.state.old_base_rotation = surface.rotation;
        self.state.based.location = self.state.position - surface.position;

        if self.config.ignore_base_rotation {
            self.state.based.rotation = self.state.rotation;
            self.state.based.has_relative_rotation = false;
        } else {
            self.state.based.rotation = surface.rotation.inverse() * self.state.rotation;
            self.state.based.has_relative_rotation = true;
        }
    }

    /// Carry the character along with its base's motion since the last save.
    pub(crate) fn update_based_movement(&mut self) {
        if !self.has_valid_data() {
            return;
        }

        let Some(id) = self.state.based.base else {
            return;
        };

        let Some(surface) = self.world.surface(id) else {
            self.on_base_removed(id);
            return;
        };
        if !surface.is_dynamic() {
            return;
        }

        let new_location = surface.position;
        let new_rotation = surface.rotation;
        let old_location = self.state.old_base_location;
        let old_rotation = self.state.old_base_rotation;

        let location_changed = new_location != old_location;
        let rotation_changed = !new_rotation.abs_diff_eq(old_rotation, 1.0e-6);
        if !location_changed && !rotation_changed {
            return;
        }

        let delta_rotation = new_rotation * old_rotation.inverse();
        if rotation_changed && !self.config.ignore_base_rotation {
            self.state.rotation = (delta_rotation * self.state.rotation).normalize();
        }

        // Follow with the feet so a rotating base keeps its contact point
        let feet_offset = Vec3::new(0.0, 0.0, self.config.half_extents.z);
        let feet = self.state.position - feet_offset;
        let local_feet = old_rotation.inverse() * (feet - old_location);
        let target = new_location + new_rotation * local_feet + feet_offset;
        let delta = self.constrain_direction(target - self.state.position);

        self.state.old_base_location = new_location;
        self.state.old_base_rotation = new_rotation;

        if delta == Vec3::ZERO {
            return;
        }

        log::trace!("Base {} carried character by {:?}", id, delta);

        let start = self.state.position;
        let hit = self.world.sweep(self.shape(), start, start + delta, &self.params());
        if hit.start_penetrating && hit.surface == Some(id) {
            // The base moved into us; the offset from it is still clear
            self.state.position = start + delta;
        } else {
            self.safe_move(delta);
        }
    }

    fn on_base_removed(&mut self, id: SurfaceId) {
        log::debug!("Base {} was removed", id);
        self.change_base(None);
        self.state.force_next_floor_check = true;

        if self.state.is_walking() {
            let floor = self.find_floor(self.state.position, false);
            self.state.current_floor = floor;

            if self.state.current_floor.is_walkable_floor() {
                self.adjust_floor_height();
                self.set_base_from_floor();
            } else {
                self.set_movement_mode(MovementMode::Falling);
            }
        }
    }

    /// Velocity inherited from the current base.
    pub(crate) fn imparted_base_velocity(&self) -> Vec3 {
        self.state
            .based
            .base
            .and_then(|id| self.world.surface(id))
            .map(|surface| imparted_velocity(surface, self.state.feet_position(self.config), self.config))
            .unwrap_or(Vec3::ZERO)
    }

    /// Push the character off a surface it may not stand on.
    pub(crate) fn jump_off(&mut self, id: SurfaceId) {
        let Some(surface) = self.world.surface(id) else {
            return;
        };

        let (lo, hi) = surface.world_bounds();
        let center_x = (lo.x + hi.x) * 0.5;
        let side = if self.state.position.x >= center_x { 1.0 } else { -1.0 };
        let direction = Vec3::new(side, 0.0, 0.5).normalize();

        let max_speed = self.state.max_walk_speed * JUMP_OFF_SPEED_FRACTION;
        let mut velocity = self.state.velocity + direction * max_speed;
        if Vec3::new(velocity.x, velocity.y, 0.0).length() > max_speed {
            velocity = velocity.normalize_or_zero() * max_speed;
        }
        velocity.z = self.config.jump_off_jump_z_factor * self.config.jump_z_velocity;
        self.state.velocity = velocity;

        log::debug!("Jumping off surface {}", id);
        self.set_movement_mode(MovementMode::Falling);
    }
}
