//! The online overworld session: signal codecs, dispatch and the connection
//! lifecycle on top of [`crate::net::PacketProcessor`].

mod config;
mod dispatch;
mod error;
mod events;
mod inbound;
mod online;
mod outbound;
mod responses;
mod signals;
mod types;

pub use config::SessionConfig;
pub use error::SessionError;
pub use events::{DialogRequest, DisconnectReason, SessionEvent, Transition};
pub use inbound::{ActorConnected, ServerMessage};
pub use online::{AvatarInfo, ConnectionState, OnlineSession, PlayerState, split_address};
pub use outbound::{ASSET_STREAM_OVERHEAD, ClientMessage, asset_chunk_size};
pub use responses::AvatarUpload;
pub use signals::{ClientSignal, ServerSignal, VERSION_ID, VERSION_ITERATION};
pub use types::{
    BattleResults, BoardPost, Ease, Item, Keyframe, KeyframeProperty, KeyframeStep, Mugshot,
    PackageCategory, RemotePlayer, ShopItem, WireField,
};
