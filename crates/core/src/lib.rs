pub mod actor;
pub mod assets;
pub mod camera;
pub mod codec;
pub mod net;
pub mod session;

pub use actor::{
    ActorSyncTracker, ActorTable, Direction, MovementState, Pose, RemoteActor, SyncConfig,
    TileEffect, TileEffects,
};
pub use assets::{AssetError, AssetPayload, AssetProvider, AssetStreamCache, AssetType};
pub use camera::{CameraCommand, CameraControl, CameraDirector, CameraDirectors, CameraEvent};
pub use codec::{BufferReader, BufferWriter, CodecError, Color};
pub use net::{
    LossSimulation, NetworkStats, PacketProcessor, ProcessorConfig, ProtocolError, Reliability,
};
pub use session::{
    ClientMessage, ConnectionState, OnlineSession, ServerMessage, SessionConfig, SessionError,
    SessionEvent,
};
