use std::time::Instant;

use glam::Vec3;

use super::{Direction, SyncConfig};

/// Shortest interval used when judging broadcast speed, one frame at 60Hz.
const MIN_BROADCAST_INTERVAL: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Idle,
    Walking,
    Running,
}

/// Per-tick result of sampling a tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub heading: Direction,
    pub movement: MovementState,
    pub animation_speed: f32,
}

/// What the map underneath an actor does to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileEffect {
    /// Forced facing, e.g. a conveyor.
    pub heading: Option<Direction>,
    pub speed_multiplier: f32,
}

/// World map lookup, implemented by the host.
pub trait TileEffects {
    fn effect_at(&self, position: Vec3) -> Option<TileEffect>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BroadcastOutcome {
    /// Same position as before; the segment is pinned at its end.
    Stationary,
    /// New interpolation target accepted.
    Interpolate,
    /// Too fast to be movement. The tracker holds at `from` until
    /// [`ActorSyncTracker::force_position`] is called with `to`.
    Teleport { from: Vec3, to: Vec3 },
    /// A teleport is already in flight; its destination was moved.
    Held,
}

/// Smooths sparse position broadcasts into per-frame motion.
///
/// Pure state: callers supply `now` and the config on every call, so the
/// tracker can be driven by a fake clock.
#[derive(Debug, Clone)]
pub struct ActorSyncTracker {
    start: Vec3,
    end: Vec3,
    last_broadcast: Instant,
    last_movement: Instant,
    lag_window: f32,
    heading: Direction,
    moving_heading: Direction,
    pending_teleport: Option<Vec3>,
}

impl ActorSyncTracker {
    pub fn new(position: Vec3, heading: Direction, now: Instant, config: &SyncConfig) -> Self {
        Self {
            start: position,
            end: position,
            last_broadcast: now,
            // starts idle
            last_movement: now.checked_sub(config.idle_threshold()).unwrap_or(now),
            lag_window: config.initial_lag_window_secs.max(MIN_BROADCAST_INTERVAL),
            heading,
            moving_heading: heading,
            pending_teleport: None,
        }
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn end(&self) -> Vec3 {
        self.end
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    /// Smoothed seconds between broadcasts.
    pub fn lag_window(&self) -> f32 {
        self.lag_window
    }

    pub fn pending_teleport(&self) -> Option<Vec3> {
        self.pending_teleport
    }

    pub fn is_idle(&self, now: Instant, config: &SyncConfig) -> bool {
        now.saturating_duration_since(self.last_movement) > config.idle_threshold()
    }

    pub fn push(
        &mut self,
        position: Vec3,
        heading: Direction,
        now: Instant,
        config: &SyncConfig,
    ) -> BroadcastOutcome {
        let interval = now
            .saturating_duration_since(self.last_broadcast)
            .as_secs_f32();
        let was_idle = self.is_idle(now, config);
        self.last_broadcast = now;

        // only the broadcast time moves; heading and movement time are kept
        let distance = self.end.distance(position);
        if self.pending_teleport.is_none() && distance <= f32::EPSILON {
            self.start = self.end;
            return BroadcastOutcome::Stationary;
        }

        self.heading = heading;

        if let Some(target) = self.pending_teleport.as_mut() {
            *target = position;
            return BroadcastOutcome::Held;
        }

        let speed = distance / interval.max(MIN_BROADCAST_INTERVAL);
        if speed > config.teleport_speed() {
            let from = self.end;
            self.start = from;
            self.pending_teleport = Some(position);
            return BroadcastOutcome::Teleport { from, to: position };
        }

        if !was_idle {
            let sample = interval.clamp(MIN_BROADCAST_INTERVAL, config.max_lag_window_secs);
            let alpha = config.lag_window_alpha.clamp(0.0, 1.0);
            self.lag_window = alpha * sample + (1.0 - alpha) * self.lag_window;
        }

        let delta = position - self.end;
        self.moving_heading = match Direction::from_offset(delta.truncate()) {
            Direction::None => heading,
            direction => direction,
        };
        self.start = self.end;
        self.end = position;
        self.last_movement = now;

        BroadcastOutcome::Interpolate
    }

    /// Jumps straight to `position`, ending any teleport in flight.
    pub fn force_position(&mut self, position: Vec3, now: Instant, config: &SyncConfig) {
        self.start = position;
        self.end = position;
        self.pending_teleport = None;
        self.last_broadcast = now;
        self.last_movement = now.checked_sub(config.idle_threshold()).unwrap_or(now);
    }

    pub fn sample(
        &self,
        now: Instant,
        config: &SyncConfig,
        tiles: Option<&dyn TileEffects>,
    ) -> Pose {
        let idle = Pose {
            position: self.end,
            heading: self.heading,
            movement: MovementState::Idle,
            animation_speed: 1.0,
        };

        let mut pose = if self.pending_teleport.is_some()
            || self.is_idle(now, config)
            || self.start == self.end
        {
            idle
        } else {
            let elapsed = now
                .saturating_duration_since(self.last_broadcast)
                .as_secs_f32();
            let alpha = (elapsed / self.lag_window).clamp(0.0, 1.0);
            let segment = self.start.distance(self.end);

            Pose {
                position: self.start.lerp(self.end, alpha),
                heading: self.moving_heading,
                movement: if segment <= config.walk_speed * self.lag_window {
                    MovementState::Walking
                } else {
                    MovementState::Running
                },
                animation_speed: 1.0,
            }
        };

        if let Some(effect) = tiles.and_then(|tiles| tiles.effect_at(pose.position)) {
            if let Some(heading) = effect.heading {
                pose.heading = heading;
            }
            pose.animation_speed *= effect.speed_multiplier;
        }

        pose
    }
}
