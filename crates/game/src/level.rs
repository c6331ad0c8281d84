//! Level loading and management.
//!
//! Levels are ASCII tile maps. Each character is one square tile; the
//! first line is the top row.
//!
//! | Glyph | Tile |
//! |-------|------|
//! | `#` | solid |
//! | `/` | slope rising to the right |
//! | `\` | slope rising to the left |
//! | `^` | spike hazard |
//! | `=` | moving platform (consecutive glyphs form one platform) |
//! | `P` | player spawn |
//! | `.` or space | empty |

use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilerunner_physics::collision::Mobility;
use tilerunner_physics::{CollisionWorld, ContentFlags, Surface, SurfaceId};

/// Error produced while parsing a level map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelError {
    #[error("level map is empty")]
    Empty,

    #[error("row {row} has {found} tiles, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },

    #[error("unknown glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph { glyph: char, row: usize, column: usize },

    #[error("level has no spawn point")]
    NoSpawn,

    #[error("tile size must be positive, got {0}")]
    TileSize(f32),
}

/// How a map is turned into geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSettings {
    /// Edge length of one tile in world units.
    pub tile_size: f32,

    /// How far platforms travel to the right, in tiles.
    pub platform_travel_tiles: f32,

    /// Seconds for a platform to go out and back.
    pub platform_period: f32,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            tile_size: 16.0,
            platform_travel_tiles: 3.0,
            platform_period: 4.0,
        }
    }
}

/// A platform that eases back and forth between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingPlatform {
    pub surface: SurfaceId,

    /// Position at time zero.
    pub origin: Vec3,

    /// Offset of the far end from `origin`.
    pub travel: Vec3,

    /// Seconds for a full round trip.
    pub period: f32,
}

impl MovingPlatform {
    pub fn position_at(&self, time: f32) -> Vec3 {
        if self.period <= 0.0 {
            return self.origin;
        }
        let phase = TAU * time / self.period;
        self.origin + self.travel * (0.5 - 0.5 * phase.cos())
    }

    pub fn velocity_at(&self, time: f32) -> Vec3 {
        if self.period <= 0.0 {
            return Vec3::ZERO;
        }
        let phase = TAU * time / self.period;
        self.travel * (PI / self.period) * phase.sin()
    }

    /// Move the platform's surface to where it is at `time`.
    pub fn update(&self, world: &mut CollisionWorld, time: f32) {
        world.set_transform(self.surface, self.position_at(time), Quat::IDENTITY);
        if let Some(surface) = world.surface_mut(self.surface) {
            surface.velocity = self.velocity_at(time);
        }
    }
}

/// Built-in level: a ramp up to a plateau split by spikes, with a platform
/// overhead.
pub const DEMO_MAP: &str = "\
........................................
........................................
........................................
...................====.................
........................................
........................................
.P......./######^^^^^^#####\\............
########################################
";

/// A game level containing collision geometry and spawn points.
#[derive(Debug)]
pub struct Level {
    pub name: String,

    /// Collision world for physics.
    pub collision: CollisionWorld,

    pub tile_size: f32,

    /// Size in tiles.
    pub width: usize,
    pub height: usize,

    /// Player spawn points, one tile above the spawn tile's floor.
    pub spawn_points: Vec<Vec3>,

    pub platforms: Vec<MovingPlatform>,
}

impl Level {
    /// Parse an ASCII map.
    pub fn parse(name: &str, map: &str, settings: &LevelSettings) -> Result<Self, LevelError> {
        if !(settings.tile_size > 0.0) {
            return Err(LevelError::TileSize(settings.tile_size));
        }

        let lines: Vec<&str> = map.lines().map(|line| line.trim_end_matches('\r')).collect();
        let first = lines
            .iter()
            .position(|line| !line.trim().is_empty())
            .ok_or(LevelError::Empty)?;
        let last = lines
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .unwrap_or(first);
        let rows: Vec<Vec<char>> = lines[first..=last].iter().map(|line| line.chars().collect()).collect();

        let width = rows[0].len();
        let height = rows.len();
        for (row, glyphs) in rows.iter().enumerate() {
            if glyphs.len() != width {
                return Err(LevelError::Ragged {
                    row,
                    expected: width,
                    found: glyphs.len(),
                });
            }
        }

        let mut level = Self {
            name: name.to_string(),
            collision: CollisionWorld::new(),
            tile_size: settings.tile_size,
            width,
            height,
            spawn_points: Vec::new(),
            platforms: Vec::new(),
        };

        for (row, glyphs) in rows.iter().enumerate() {
            let mut column = 0;
            while column < width {
                let glyph = glyphs[column];
                match glyph {
                    '.' | ' ' => column += 1,
                    '#' | '^' | '=' => {
                        let run = glyphs[column..].iter().take_while(|&&g| g == glyph).count();
                        level.add_run(glyph, row, column, run, settings);
                        column += run;
                    }
                    '/' | '\\' => {
                        level.add_slope(row, column, glyph == '/');
                        column += 1;
                    }
                    'P' => {
                        let (x0, z0) = level.tile_origin(row, column);
                        level
                            .spawn_points
                            .push(Vec3::new(x0 + level.tile_size * 0.5, 0.0, z0 + level.tile_size));
                        column += 1;
                    }
                    other => {
                        return Err(LevelError::UnknownGlyph {
                            glyph: other,
                            row,
                            column,
                        })
                    }
                }
            }
        }

        if level.spawn_points.is_empty() {
            return Err(LevelError::NoSpawn);
        }

        log::debug!(
            "Parsed level {} ({}x{} tiles, {} surfaces, {} platforms)",
            level.name,
            width,
            height,
            level.collision.live_count(),
            level.platforms.len()
        );
        Ok(level)
    }

    /// The built-in demo level.
    pub fn demo(settings: &LevelSettings) -> Result<Self, LevelError> {
        Self::parse("demo", DEMO_MAP, settings)
    }

    /// Bottom-left corner of a tile in world XZ.
    fn tile_origin(&self, row: usize, column: usize) -> (f32, f32) {
        let x = column as f32 * self.tile_size;
        let z = (self.height - 1 - row) as f32 * self.tile_size;
        (x, z)
    }

    fn add_run(&mut self, glyph: char, row: usize, column: usize, run: usize, settings: &LevelSettings) {
        let size = self.tile_size;
        let (x0, z0) = self.tile_origin(row, column);
        let half_width = run as f32 * size * 0.5;
        let center_x = x0 + half_width;

        match glyph {
            '=' => {
                let half_height = size / 8.0;
                let origin = Vec3::new(center_x, 0.0, z0 + size - half_height);
                let surface = self.collision.add_surface(
                    Surface::rect(format!("platform{}", self.platforms.len()), origin, half_width, half_height, ContentFlags::PLATFORM)
                        .with_mobility(Mobility::Movable),
                );
                self.platforms.push(MovingPlatform {
                    surface,
                    origin,
                    travel: Vec3::new(settings.platform_travel_tiles * size, 0.0, 0.0),
                    period: settings.platform_period,
                });
            }
            _ => {
                let contents = if glyph == '^' {
                    ContentFlags::HAZARD
                } else {
                    ContentFlags::SOLID
                };
                self.collision.add_box(
                    Vec3::new(center_x, 0.0, z0 + size * 0.5),
                    Vec3::new(half_width, size * 0.5, size * 0.5),
                    contents,
                );
            }
        }
    }

    fn add_slope(&mut self, row: usize, column: usize, rising_right: bool) {
        let (x0, z0) = self.tile_origin(row, column);
        let x1 = x0 + self.tile_size;
        let z1 = z0 + self.tile_size;
        let peak = if rising_right { Vec2::new(x1, z1) } else { Vec2::new(x0, z1) };
        self.collision
            .add_convex_hull(&[Vec2::new(x0, z0), Vec2::new(x1, z0), peak], ContentFlags::SOLID);
    }

    /// Get a player spawn point.
    pub fn spawn_point(&self, index: usize) -> Option<Vec3> {
        self.spawn_points.get(index % self.spawn_points.len().max(1)).copied()
    }

    /// Move every platform to where it is at `time`.
    pub fn advance_platforms(&mut self, time: f32) {
        for platform in &self.platforms {
            platform.update(&mut self.collision, time);
        }
    }
}
