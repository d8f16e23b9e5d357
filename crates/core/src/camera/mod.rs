//! Queued camera directives.
//!
//! A [`CameraDirector`] runs one event at a time against a [`CameraControl`].
//! The session owns two of them, one fed by the server and one by local warp
//! sequences, and [`CameraDirectors`] decides which one drives the camera.

use std::collections::VecDeque;
use std::time::Duration;

use glam::Vec3;

use crate::codec::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum CameraTarget {
    Player,
    Actor(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    /// Snap to `position` and hold there.
    Place { position: Vec3, hold: Duration },
    /// Linear slide.
    Move { position: Vec3, duration: Duration },
    /// Eased slide that slows on arrival.
    Wane { position: Vec3, duration: Duration },
    Shake { strength: f32, duration: Duration },
    Fade { color: Color, duration: Duration },
    Track { target: CameraTarget },
    Unlock,
}

/// The camera as seen by a director.
pub trait CameraControl {
    fn place(&mut self, position: Vec3);
    fn slide(&mut self, position: Vec3, duration: Duration);
    fn wane(&mut self, position: Vec3, duration: Duration);
    fn shake(&mut self, strength: f32, duration: Duration);
    fn fade(&mut self, color: Color, duration: Duration);
    fn track(&mut self, target: &CameraTarget);
    /// Hand control back to default player-follow.
    fn release(&mut self);
}

/// Recorded form of a [`CameraControl`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    Place(Vec3),
    Slide { position: Vec3, duration: Duration },
    Wane { position: Vec3, duration: Duration },
    Shake { strength: f32, duration: Duration },
    Fade { color: Color, duration: Duration },
    Track(CameraTarget),
    Release,
}

impl CameraControl for Vec<CameraCommand> {
    fn place(&mut self, position: Vec3) {
        self.push(CameraCommand::Place(position));
    }

    fn slide(&mut self, position: Vec3, duration: Duration) {
        self.push(CameraCommand::Slide { position, duration });
    }

    fn wane(&mut self, position: Vec3, duration: Duration) {
        self.push(CameraCommand::Wane { position, duration });
    }

    fn shake(&mut self, strength: f32, duration: Duration) {
        self.push(CameraCommand::Shake { strength, duration });
    }

    fn fade(&mut self, color: Color, duration: Duration) {
        self.push(CameraCommand::Fade { color, duration });
    }

    fn track(&mut self, target: &CameraTarget) {
        self.push(CameraCommand::Track(target.clone()));
    }

    fn release(&mut self) {
        self.push(CameraCommand::Release);
    }
}

#[derive(Debug, Default)]
pub struct CameraDirector {
    queue: VecDeque<CameraEvent>,
    locked: bool,
    hold: Duration,
}

impl CameraDirector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Queuing always locks the camera.
    pub fn enqueue(&mut self, event: CameraEvent) {
        self.locked = true;
        self.queue.push_back(event);
    }

    pub fn unlock(&mut self) {
        self.locked = false;
        self.queue.clear();
        self.hold = Duration::ZERO;
    }

    /// Advances the hold timer and applies every event that becomes due. An
    /// event's duration blocks the next one, except shake and track.
    pub fn update(&mut self, elapsed: Duration, camera: &mut dyn CameraControl) {
        self.hold = self.hold.saturating_sub(elapsed);

        while self.hold.is_zero() {
            let Some(event) = self.queue.pop_front() else {
                break;
            };

            match event {
                CameraEvent::Place { position, hold } => {
                    camera.place(position);
                    self.hold = hold;
                }
                CameraEvent::Move { position, duration } => {
                    camera.slide(position, duration);
                    self.hold = duration;
                }
                CameraEvent::Wane { position, duration } => {
                    camera.wane(position, duration);
                    self.hold = duration;
                }
                CameraEvent::Shake { strength, duration } => {
                    camera.shake(strength, duration);
                }
                CameraEvent::Fade { color, duration } => {
                    camera.fade(color, duration);
                    self.hold = duration;
                }
                CameraEvent::Track { target } => camera.track(&target),
                CameraEvent::Unlock => {
                    camera.release();
                    self.unlock();
                }
            }
        }
    }
}

/// Server and warp directors over one camera. The server wins whenever it
/// holds a lock; the two never run on the same tick.
#[derive(Debug, Default)]
pub struct CameraDirectors {
    pub server: CameraDirector,
    pub warp: CameraDirector,
}

impl CameraDirectors {
    pub fn is_locked(&self) -> bool {
        self.server.is_locked() || self.warp.is_locked()
    }

    pub fn update(&mut self, elapsed: Duration, camera: &mut dyn CameraControl) {
        if self.server.is_locked() {
            self.server.update(elapsed, camera);
        } else {
            self.warp.update(elapsed, camera);
        }
    }

    pub fn reset(&mut self) {
        self.server.unlock();
        self.warp.unlock();
    }
}
