//! The collision interface the movement code consumes.

use glam::Vec3;

use super::surface::{Surface, SurfaceId};
use super::trace::{HitResult, QueryParams, TraceShape};

/// Read-only collision queries against a world.
///
/// Movement only ever reads through this trait, so several characters can
/// share one world while each owns its own movement state.
pub trait CollisionQuery {
    /// Sweep `shape` from `start` to `end` and report the first blocking hit.
    fn sweep(&self, shape: TraceShape, start: Vec3, end: Vec3, params: &QueryParams) -> HitResult;

    /// Trace a line from `start` to `end` and report the first blocking hit.
    fn line_trace(&self, start: Vec3, end: Vec3, params: &QueryParams) -> HitResult {
        self.sweep(TraceShape::Point, start, end, params)
    }

    /// Every surface crossed by the line, nearest first.
    fn line_trace_multi(&self, start: Vec3, end: Vec3, params: &QueryParams) -> Vec<HitResult>;

    /// Resolve a surface handle. `None` once the surface has been removed.
    fn surface(&self, id: SurfaceId) -> Option<&Surface>;

    /// Upper bound on the number of surfaces, used to bound base-chain walks.
    fn surface_count(&self) -> usize;
}
