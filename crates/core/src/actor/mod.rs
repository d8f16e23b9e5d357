mod config;
mod direction;
mod remote;
mod tracker;

pub use config::SyncConfig;
pub use direction::Direction;
pub use remote::{
    ActorFlags, ActorTable, Disconnect, ExclusionCounter, PendingWarp, RemoteActor, WarpKind,
};
pub use tracker::{
    ActorSyncTracker, BroadcastOutcome, MovementState, Pose, TileEffect, TileEffects,
};
