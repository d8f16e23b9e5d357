use glam::Vec3;

use super::signals::ClientSignal;
use super::types::{BattleResults, WireField, read_direction};
use crate::actor::Direction;
use crate::assets::UploadAssetType;
use crate::codec::{BufferReader, BufferWriter};
use crate::net::{FRAME_HEADER_SIZE, ProtocolError, Reliability};

/// Bytes of an `asset_stream` body ahead of the blob: signal id, upload type
/// and the blob's length prefix.
pub const ASSET_STREAM_OVERHEAD: usize = 2 + 1 + 2;

/// Largest avatar chunk that still fits one datagram of `max_payload_size`.
pub fn asset_chunk_size(max_payload_size: usize) -> usize {
    max_payload_size
        .saturating_sub(FRAME_HEADER_SIZE + ASSET_STREAM_OVERHEAD)
        .max(1)
}

/// Everything a client can tell a server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Repeated until the server answers with `version_info`.
    VersionRequest,
    Login {
        username: String,
        identity: Vec<u8>,
        data: String,
    },
    Logout,
    RequestJoin,
    Ready {
        time_ms: u64,
    },
    Position {
        creation_ms: u64,
        position: Vec3,
        heading: Direction,
    },
    AvatarChange {
        name: String,
        element: String,
        max_health: i32,
    },
    AssetFound {
        path: String,
        last_modified: u64,
    },
    AssetStream {
        asset_type: UploadAssetType,
        bytes: Vec<u8>,
    },
    Emote(u8),
    ObjectInteraction {
        object_id: u32,
        button: u8,
    },
    ActorInteraction {
        ticket: String,
        button: u8,
    },
    TileInteraction {
        position: Vec3,
        button: u8,
    },
    TextboxResponse(u8),
    PromptResponse(String),
    BoardOpen,
    BoardClose,
    PostRequest,
    PostSelection {
        id: String,
    },
    ShopClose,
    ShopPurchase {
        name: String,
    },
    BattleResults(BattleResults),
    Authorize {
        origin_address: String,
        identity: Vec<u8>,
        data: Vec<u8>,
    },
    TransferredOut,
}

impl ClientMessage {
    pub fn signal(&self) -> ClientSignal {
        use ClientMessage as M;
        use ClientSignal as S;

        match self {
            M::VersionRequest => S::VersionRequest,
            M::Login { .. } => S::Login,
            M::Logout => S::Logout,
            M::RequestJoin => S::RequestJoin,
            M::Ready { .. } => S::Ready,
            M::Position { .. } => S::Position,
            M::AvatarChange { .. } => S::AvatarChange,
            M::AssetFound { .. } => S::AssetFound,
            M::AssetStream { .. } => S::AssetStream,
            M::Emote(_) => S::Emote,
            M::ObjectInteraction { .. } => S::ObjectInteraction,
            M::ActorInteraction { .. } => S::ActorInteraction,
            M::TileInteraction { .. } => S::TileInteraction,
            M::TextboxResponse(_) => S::TextboxResponse,
            M::PromptResponse(_) => S::PromptResponse,
            M::BoardOpen => S::BoardOpen,
            M::BoardClose => S::BoardClose,
            M::PostRequest => S::PostRequest,
            M::PostSelection { .. } => S::PostSelection,
            M::ShopClose => S::ShopClose,
            M::ShopPurchase { .. } => S::ShopPurchase,
            M::BattleResults(_) => S::BattleResults,
            M::Authorize { .. } => S::Authorize,
            M::TransferredOut => S::TransferredOut,
        }
    }

    /// Position is latest-wins and emotes may arrive out of order; everything
    /// else must apply in send order.
    pub fn reliability(&self) -> Reliability {
        match self {
            Self::Position { .. } => Reliability::UnreliableSequenced,
            Self::Emote(_) => Reliability::Reliable,
            Self::VersionRequest => Reliability::Unreliable,
            _ => Reliability::ReliableOrdered,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        use ClientMessage as M;

        let mut w = BufferWriter::with_capacity(32);
        w.write(self.signal().id());

        match self {
            M::Login {
                username,
                identity,
                data,
            } => {
                w.write_str8(username)
                    .write_bytes16(identity)
                    .write_str16(data);
            }
            M::VersionRequest
            | M::Logout
            | M::RequestJoin
            | M::BoardOpen
            | M::BoardClose
            | M::PostRequest
            | M::ShopClose
            | M::TransferredOut => {}
            M::Ready { time_ms } => {
                w.write(*time_ms);
            }
            M::Position {
                creation_ms,
                position,
                heading,
            } => {
                w.write(*creation_ms)
                    .write_vec3(*position)
                    .write(*heading as u8);
            }
            M::AvatarChange {
                name,
                element,
                max_health,
            } => {
                w.write_str8(name).write_str8(element).write(*max_health);
            }
            M::AssetFound {
                path,
                last_modified,
            } => {
                w.write_str16(path).write(*last_modified);
            }
            M::AssetStream { asset_type, bytes } => {
                w.write(*asset_type as u8).write_bytes16(bytes);
            }
            M::Emote(emote) | M::TextboxResponse(emote) => {
                w.write(*emote);
            }
            M::ObjectInteraction { object_id, button } => {
                w.write(*object_id).write(*button);
            }
            M::ActorInteraction { ticket, button } => {
                w.write_str8(ticket).write(*button);
            }
            M::TileInteraction { position, button } => {
                w.write_vec3(*position).write(*button);
            }
            M::PromptResponse(text) => {
                w.write_str16(text);
            }
            M::PostSelection { id } => {
                w.write_str8(id);
            }
            M::ShopPurchase { name } => {
                w.write_str8(name);
            }
            M::BattleResults(results) => results.write_to(&mut w),
            M::Authorize {
                origin_address,
                identity,
                data,
            } => {
                w.write_str16(origin_address)
                    .write_bytes16(identity)
                    .write_bytes16(data);
            }
        }

        w.into_inner()
    }

    /// Server-side decoding, the exact inverse of [`encode`](Self::encode).
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        use ClientMessage as M;
        use ClientSignal as S;

        let mut r = BufferReader::new(body);
        let signal = ClientSignal::try_from(r.read::<u16>()?)?;
        let r = &mut r;

        let message = match signal {
            S::Login => M::Login {
                username: r.read_str8()?,
                identity: r.read_bytes16()?,
                data: r.read_str16()?,
            },
            S::VersionRequest => M::VersionRequest,
            S::Logout => M::Logout,
            S::RequestJoin => M::RequestJoin,
            S::Ready => M::Ready { time_ms: r.read()? },
            S::Position => M::Position {
                creation_ms: r.read()?,
                position: r.read_vec3()?,
                heading: read_direction(r)?,
            },
            S::AvatarChange => M::AvatarChange {
                name: r.read_str8()?,
                element: r.read_str8()?,
                max_health: r.read()?,
            },
            S::AssetFound => M::AssetFound {
                path: r.read_str16()?,
                last_modified: r.read()?,
            },
            S::AssetStream => {
                let value = r.read::<u8>()?;
                let asset_type =
                    UploadAssetType::from_u8(value).ok_or(ProtocolError::InvalidValue {
                        field: "upload_asset_type",
                        value: value as u64,
                    })?;
                M::AssetStream {
                    asset_type,
                    bytes: r.read_bytes16()?,
                }
            }
            S::Emote => M::Emote(r.read()?),
            S::ObjectInteraction => M::ObjectInteraction {
                object_id: r.read()?,
                button: r.read()?,
            },
            S::ActorInteraction => M::ActorInteraction {
                ticket: r.read_str8()?,
                button: r.read()?,
            },
            S::TileInteraction => M::TileInteraction {
                position: r.read_vec3()?,
                button: r.read()?,
            },
            S::TextboxResponse => M::TextboxResponse(r.read()?),
            S::PromptResponse => M::PromptResponse(r.read_str16()?),
            S::BoardOpen => M::BoardOpen,
            S::BoardClose => M::BoardClose,
            S::PostRequest => M::PostRequest,
            S::PostSelection => M::PostSelection {
                id: r.read_str8()?,
            },
            S::ShopClose => M::ShopClose,
            S::ShopPurchase => M::ShopPurchase {
                name: r.read_str8()?,
            },
            S::BattleResults => M::BattleResults(BattleResults::read_from(r)?),
            S::Authorize => M::Authorize {
                origin_address: r.read_str16()?,
                identity: r.read_bytes16()?,
                data: r.read_bytes16()?,
            },
            S::TransferredOut => M::TransferredOut,
        };

        Ok(message)
    }
}
