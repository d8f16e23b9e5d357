use glam::Vec3;

use super::signals::ServerSignal;
use super::types::{
    BoardPost, Item, Keyframe, Mugshot, PackageCategory, RemotePlayer, ShopItem, WireField,
    read_direction, read_list, read_opt_str8, read_opt_str16, write_list, write_opt_str8,
    write_opt_str16,
};
use crate::actor::Direction;
use crate::assets::AssetType;
use crate::codec::{BufferReader, BufferWriter, Color};
use crate::net::ProtocolError;

/// Everything a server can tell a client, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Answer to `version_request`; also carries the largest frame body the
    /// server accepts.
    VersionInfo {
        version_id: String,
        version_iteration: u64,
        max_payload_size: u16,
    },
    Authorize {
        address: String,
        data: Vec<u8>,
    },
    Login {
        ticket: String,
        warp_in: bool,
        position: Vec3,
        heading: Direction,
    },
    ConnectionComplete,
    TransferWarp,
    TransferStart,
    TransferComplete {
        warp_in: bool,
        heading: Direction,
    },
    TransferServer {
        address: String,
        data: String,
        warp_out: bool,
    },
    Kick {
        reason: String,
    },
    RemoveAsset {
        path: String,
    },
    AssetStreamStart {
        path: String,
        last_modified: u64,
        cachable: bool,
        asset_type: AssetType,
        size: u64,
    },
    AssetStream {
        bytes: Vec<u8>,
    },
    Preload {
        path: String,
        asset_type: AssetType,
    },
    CustomEmotesPath {
        path: String,
    },
    MapUpdate {
        path: String,
    },
    Health(i32),
    BaseHealth(i32),
    Emotion(u8),
    Money(u32),
    AddItem(Item),
    RemoveItem {
        id: String,
    },
    PlaySound {
        path: String,
    },
    ExcludeObject(u32),
    IncludeObject(u32),
    ExcludeActor {
        ticket: String,
    },
    IncludeActor {
        ticket: String,
    },
    MoveCamera {
        position: Vec3,
        hold: f32,
    },
    SlideCamera {
        position: Vec3,
        duration: f32,
    },
    ShakeCamera {
        strength: f32,
        duration: f32,
    },
    FadeCamera {
        color: Color,
        duration: f32,
    },
    /// `None` tracks the local player.
    TrackWithCamera {
        ticket: Option<String>,
    },
    UnlockCamera,
    LockInput,
    UnlockInput,
    Teleport {
        warp: bool,
        position: Vec3,
        heading: Direction,
    },
    Message {
        text: String,
        mugshot: Mugshot,
    },
    Question {
        text: String,
        mugshot: Mugshot,
    },
    Quiz {
        options: [String; 3],
        mugshot: Mugshot,
    },
    Prompt {
        character_limit: u16,
        default_text: Option<String>,
    },
    TextboxResponseAck,
    OpenBoard {
        topic: String,
        color: Color,
        posts: Vec<BoardPost>,
        open_instantly: bool,
    },
    PrependPosts {
        reference: Option<String>,
        posts: Vec<BoardPost>,
    },
    AppendPosts {
        reference: Option<String>,
        posts: Vec<BoardPost>,
    },
    RemovePost {
        id: String,
    },
    PostSelectionAck,
    CloseBoard,
    ShopInventory(Vec<ShopItem>),
    OpenShop {
        mugshot: Mugshot,
    },
    LoadPackage {
        category: PackageCategory,
        path: String,
    },
    PackageOffer {
        name: String,
        id: String,
        category: PackageCategory,
        path: String,
    },
    ModWhitelist {
        path: Option<String>,
    },
    ModBlacklist {
        path: Option<String>,
    },
    InitiateMob {
        package_path: String,
        data: Option<String>,
        health: i32,
        base_health: i32,
    },
    InitiatePvp {
        package_path: Option<String>,
        data: Option<String>,
        players: Vec<RemotePlayer>,
        health: i32,
        base_health: i32,
    },
    ActorConnected(ActorConnected),
    ActorDisconnected {
        ticket: String,
        warp_out: bool,
    },
    ActorSetName {
        ticket: String,
        name: String,
    },
    ActorMoveTo {
        ticket: String,
        position: Vec3,
        heading: Direction,
    },
    ActorSetAvatar {
        ticket: String,
        texture_path: String,
        animation_path: String,
    },
    ActorEmote {
        ticket: String,
        emote: u8,
        use_custom: bool,
    },
    ActorAnimate {
        ticket: String,
        state: String,
        looped: bool,
    },
    ActorKeyframes {
        ticket: String,
        keyframes: Vec<Keyframe>,
    },
    ActorMinimapColor {
        ticket: String,
        color: Color,
    },
    SynchronizeUpdates,
    EndSynchronization,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActorConnected {
    pub ticket: String,
    pub name: String,
    pub texture_path: String,
    pub animation_path: String,
    pub heading: Direction,
    pub position: Vec3,
    pub solid: bool,
    pub warp_in: bool,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub minimap_color: Color,
    pub animation: Option<String>,
}

impl WireField for ActorConnected {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer
            .write_str8(&self.ticket)
            .write_str8(&self.name)
            .write_str16(&self.texture_path)
            .write_str16(&self.animation_path)
            .write(self.heading as u8)
            .write_vec3(self.position)
            .write(self.solid)
            .write(self.warp_in)
            .write(self.scale_x)
            .write(self.scale_y)
            .write(self.rotation)
            .write_rgba(self.minimap_color);
        write_opt_str8(writer, self.animation.as_deref());
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            ticket: reader.read_str8()?,
            name: reader.read_str8()?,
            texture_path: reader.read_str16()?,
            animation_path: reader.read_str16()?,
            heading: read_direction(reader)?,
            position: reader.read_vec3()?,
            solid: reader.read()?,
            warp_in: reader.read()?,
            scale_x: reader.read()?,
            scale_y: reader.read()?,
            rotation: reader.read()?,
            minimap_color: reader.read_rgba()?,
            animation: read_opt_str8(reader)?,
        })
    }
}

fn read_asset_type(reader: &mut BufferReader<'_>) -> Result<AssetType, ProtocolError> {
    let value = reader.read::<u8>()?;
    AssetType::from_u8(value).ok_or(ProtocolError::InvalidValue {
        field: "asset_type",
        value: value as u64,
    })
}

impl ServerMessage {
    pub fn signal(&self) -> ServerSignal {
        use ServerMessage as M;
        use ServerSignal as S;

        match self {
            M::VersionInfo { .. } => S::VersionInfo,
            M::Authorize { .. } => S::Authorize,
            M::Login { .. } => S::Login,
            M::ConnectionComplete => S::ConnectionComplete,
            M::TransferWarp => S::TransferWarp,
            M::TransferStart => S::TransferStart,
            M::TransferComplete { .. } => S::TransferComplete,
            M::TransferServer { .. } => S::TransferServer,
            M::Kick { .. } => S::Kick,
            M::RemoveAsset { .. } => S::RemoveAsset,
            M::AssetStreamStart { .. } => S::AssetStreamStart,
            M::AssetStream { .. } => S::AssetStream,
            M::Preload { .. } => S::Preload,
            M::CustomEmotesPath { .. } => S::CustomEmotesPath,
            M::MapUpdate { .. } => S::MapUpdate,
            M::Health(_) => S::Health,
            M::BaseHealth(_) => S::BaseHealth,
            M::Emotion(_) => S::Emotion,
            M::Money(_) => S::Money,
            M::AddItem(_) => S::AddItem,
            M::RemoveItem { .. } => S::RemoveItem,
            M::PlaySound { .. } => S::PlaySound,
            M::ExcludeObject(_) => S::ExcludeObject,
            M::IncludeObject(_) => S::IncludeObject,
            M::ExcludeActor { .. } => S::ExcludeActor,
            M::IncludeActor { .. } => S::IncludeActor,
            M::MoveCamera { .. } => S::MoveCamera,
            M::SlideCamera { .. } => S::SlideCamera,
            M::ShakeCamera { .. } => S::ShakeCamera,
            M::FadeCamera { .. } => S::FadeCamera,
            M::TrackWithCamera { .. } => S::TrackWithCamera,
            M::UnlockCamera => S::UnlockCamera,
            M::LockInput => S::LockInput,
            M::UnlockInput => S::UnlockInput,
            M::Teleport { .. } => S::Teleport,
            M::Message { .. } => S::Message,
            M::Question { .. } => S::Question,
            M::Quiz { .. } => S::Quiz,
            M::Prompt { .. } => S::Prompt,
            M::TextboxResponseAck => S::TextboxResponseAck,
            M::OpenBoard { .. } => S::OpenBoard,
            M::PrependPosts { .. } => S::PrependPosts,
            M::AppendPosts { .. } => S::AppendPosts,
            M::RemovePost { .. } => S::RemovePost,
            M::PostSelectionAck => S::PostSelectionAck,
            M::CloseBoard => S::CloseBoard,
            M::ShopInventory(_) => S::ShopInventory,
            M::OpenShop { .. } => S::OpenShop,
            M::LoadPackage { .. } => S::LoadPackage,
            M::PackageOffer { .. } => S::PackageOffer,
            M::ModWhitelist { .. } => S::ModWhitelist,
            M::ModBlacklist { .. } => S::ModBlacklist,
            M::InitiateMob { .. } => S::InitiateMob,
            M::InitiatePvp { .. } => S::InitiatePvp,
            M::ActorConnected(_) => S::ActorConnected,
            M::ActorDisconnected { .. } => S::ActorDisconnected,
            M::ActorSetName { .. } => S::ActorSetName,
            M::ActorMoveTo { .. } => S::ActorMoveTo,
            M::ActorSetAvatar { .. } => S::ActorSetAvatar,
            M::ActorEmote { .. } => S::ActorEmote,
            M::ActorAnimate { .. } => S::ActorAnimate,
            M::ActorKeyframes { .. } => S::ActorKeyframes,
            M::ActorMinimapColor { .. } => S::ActorMinimapColor,
            M::SynchronizeUpdates => S::SynchronizeUpdates,
            M::EndSynchronization => S::EndSynchronization,
        }
    }

    /// Decodes a frame body (signal id included). Trailing bytes are ignored.
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        use ServerMessage as M;
        use ServerSignal as S;

        let mut r = BufferReader::new(body);
        let signal = ServerSignal::try_from(r.read::<u16>()?)?;
        let r = &mut r;

        let message = match signal {
            S::VersionInfo => M::VersionInfo {
                version_id: r.read_str8()?,
                version_iteration: r.read()?,
                max_payload_size: r.read()?,
            },
            S::Authorize => M::Authorize {
                address: r.read_str16()?,
                data: r.read_bytes16()?,
            },
            S::Login => M::Login {
                ticket: r.read_str8()?,
                warp_in: r.read()?,
                position: r.read_vec3()?,
                heading: read_direction(r)?,
            },
            S::ConnectionComplete => M::ConnectionComplete,
            S::TransferWarp => M::TransferWarp,
            S::TransferStart => M::TransferStart,
            S::TransferComplete => M::TransferComplete {
                warp_in: r.read()?,
                heading: read_direction(r)?,
            },
            S::TransferServer => M::TransferServer {
                address: r.read_str16()?,
                data: r.read_str16()?,
                warp_out: r.read()?,
            },
            S::Kick => M::Kick {
                reason: r.read_str16()?,
            },
            S::RemoveAsset => M::RemoveAsset {
                path: r.read_str16()?,
            },
            S::AssetStreamStart => M::AssetStreamStart {
                path: r.read_str16()?,
                last_modified: r.read()?,
                cachable: r.read()?,
                asset_type: read_asset_type(r)?,
                size: r.read()?,
            },
            S::AssetStream => M::AssetStream {
                bytes: r.read_bytes16()?,
            },
            S::Preload => M::Preload {
                path: r.read_str16()?,
                asset_type: read_asset_type(r)?,
            },
            S::CustomEmotesPath => M::CustomEmotesPath {
                path: r.read_str16()?,
            },
            S::MapUpdate => M::MapUpdate {
                path: r.read_str16()?,
            },
            S::Health => M::Health(r.read()?),
            S::BaseHealth => M::BaseHealth(r.read()?),
            S::Emotion => M::Emotion(r.read()?),
            S::Money => M::Money(r.read()?),
            S::AddItem => M::AddItem(Item::read_from(r)?),
            S::RemoveItem => M::RemoveItem {
                id: r.read_str8()?,
            },
            S::PlaySound => M::PlaySound {
                path: r.read_str16()?,
            },
            S::ExcludeObject => M::ExcludeObject(r.read()?),
            S::IncludeObject => M::IncludeObject(r.read()?),
            S::ExcludeActor => M::ExcludeActor {
                ticket: r.read_str8()?,
            },
            S::IncludeActor => M::IncludeActor {
                ticket: r.read_str8()?,
            },
            S::MoveCamera => M::MoveCamera {
                position: r.read_vec3()?,
                hold: r.read()?,
            },
            S::SlideCamera => M::SlideCamera {
                position: r.read_vec3()?,
                duration: r.read()?,
            },
            S::ShakeCamera => M::ShakeCamera {
                strength: r.read()?,
                duration: r.read()?,
            },
            S::FadeCamera => M::FadeCamera {
                color: r.read_rgba()?,
                duration: r.read()?,
            },
            S::TrackWithCamera => M::TrackWithCamera {
                ticket: read_opt_str8(r)?,
            },
            S::UnlockCamera => M::UnlockCamera,
            S::LockInput => M::LockInput,
            S::UnlockInput => M::UnlockInput,
            S::Teleport => M::Teleport {
                warp: r.read()?,
                position: r.read_vec3()?,
                heading: read_direction(r)?,
            },
            S::Message => M::Message {
                text: r.read_str16()?,
                mugshot: Mugshot::read_from(r)?,
            },
            S::Question => M::Question {
                text: r.read_str16()?,
                mugshot: Mugshot::read_from(r)?,
            },
            S::Quiz => M::Quiz {
                options: [r.read_str16()?, r.read_str16()?, r.read_str16()?],
                mugshot: Mugshot::read_from(r)?,
            },
            S::Prompt => M::Prompt {
                character_limit: r.read()?,
                default_text: read_opt_str16(r)?,
            },
            S::TextboxResponseAck => M::TextboxResponseAck,
            S::OpenBoard => M::OpenBoard {
                topic: r.read_str16()?,
                color: r.read_rgb()?,
                posts: read_list(r)?,
                open_instantly: r.read()?,
            },
            S::PrependPosts => M::PrependPosts {
                reference: read_opt_str8(r)?,
                posts: read_list(r)?,
            },
            S::AppendPosts => M::AppendPosts {
                reference: read_opt_str8(r)?,
                posts: read_list(r)?,
            },
            S::RemovePost => M::RemovePost {
                id: r.read_str8()?,
            },
            S::PostSelectionAck => M::PostSelectionAck,
            S::CloseBoard => M::CloseBoard,
            S::ShopInventory => M::ShopInventory(read_list(r)?),
            S::OpenShop => M::OpenShop {
                mugshot: Mugshot::read_from(r)?,
            },
            S::LoadPackage => M::LoadPackage {
                category: PackageCategory::try_from(r.read::<u8>()?)?,
                path: r.read_str16()?,
            },
            S::PackageOffer => M::PackageOffer {
                name: r.read_str16()?,
                id: r.read_str8()?,
                category: PackageCategory::try_from(r.read::<u8>()?)?,
                path: r.read_str16()?,
            },
            S::ModWhitelist => M::ModWhitelist {
                path: read_opt_str16(r)?,
            },
            S::ModBlacklist => M::ModBlacklist {
                path: read_opt_str16(r)?,
            },
            S::InitiateMob => M::InitiateMob {
                package_path: r.read_str16()?,
                data: read_opt_str16(r)?,
                health: r.read()?,
                base_health: r.read()?,
            },
            S::InitiatePvp => M::InitiatePvp {
                package_path: read_opt_str16(r)?,
                data: read_opt_str16(r)?,
                players: read_list(r)?,
                health: r.read()?,
                base_health: r.read()?,
            },
            S::ActorConnected => M::ActorConnected(ActorConnected::read_from(r)?),
            S::ActorDisconnected => M::ActorDisconnected {
                ticket: r.read_str8()?,
                warp_out: r.read()?,
            },
            S::ActorSetName => M::ActorSetName {
                ticket: r.read_str8()?,
                name: r.read_str8()?,
            },
            S::ActorMoveTo => M::ActorMoveTo {
                ticket: r.read_str8()?,
                position: r.read_vec3()?,
                heading: read_direction(r)?,
            },
            S::ActorSetAvatar => M::ActorSetAvatar {
                ticket: r.read_str8()?,
                texture_path: r.read_str16()?,
                animation_path: r.read_str16()?,
            },
            S::ActorEmote => M::ActorEmote {
                ticket: r.read_str8()?,
                emote: r.read()?,
                use_custom: r.read()?,
            },
            S::ActorAnimate => M::ActorAnimate {
                ticket: r.read_str8()?,
                state: r.read_str8()?,
                looped: r.read()?,
            },
            S::ActorKeyframes => M::ActorKeyframes {
                ticket: r.read_str8()?,
                keyframes: read_list(r)?,
            },
            S::ActorMinimapColor => M::ActorMinimapColor {
                ticket: r.read_str8()?,
                color: r.read_rgba()?,
            },
            S::SynchronizeUpdates => M::SynchronizeUpdates,
            S::EndSynchronization => M::EndSynchronization,
        };

        Ok(message)
    }

    /// Server-side encoding, the exact inverse of [`decode`](Self::decode).
    pub fn encode(&self) -> Vec<u8> {
        use ServerMessage as M;

        let mut w = BufferWriter::with_capacity(64);
        w.write(self.signal().id());

        match self {
            M::VersionInfo {
                version_id,
                version_iteration,
                max_payload_size,
            } => {
                w.write_str8(version_id)
                    .write(*version_iteration)
                    .write(*max_payload_size);
            }
            M::Authorize { address, data } => {
                w.write_str16(address).write_bytes16(data);
            }
            M::Login {
                ticket,
                warp_in,
                position,
                heading,
            } => {
                w.write_str8(ticket)
                    .write(*warp_in)
                    .write_vec3(*position)
                    .write(*heading as u8);
            }
            M::ConnectionComplete
            | M::TransferWarp
            | M::TransferStart
            | M::UnlockCamera
            | M::LockInput
            | M::UnlockInput
            | M::TextboxResponseAck
            | M::PostSelectionAck
            | M::CloseBoard
            | M::SynchronizeUpdates
            | M::EndSynchronization => {}
            M::TransferComplete { warp_in, heading } => {
                w.write(*warp_in).write(*heading as u8);
            }
            M::TransferServer {
                address,
                data,
                warp_out,
            } => {
                w.write_str16(address).write_str16(data).write(*warp_out);
            }
            M::Kick { reason } => {
                w.write_str16(reason);
            }
            M::RemoveAsset { path }
            | M::CustomEmotesPath { path }
            | M::MapUpdate { path }
            | M::PlaySound { path } => {
                w.write_str16(path);
            }
            M::AssetStreamStart {
                path,
                last_modified,
                cachable,
                asset_type,
                size,
            } => {
                w.write_str16(path)
                    .write(*last_modified)
                    .write(*cachable)
                    .write(*asset_type as u8)
                    .write(*size);
            }
            M::AssetStream { bytes } => {
                w.write_bytes16(bytes);
            }
            M::Preload { path, asset_type } => {
                w.write_str16(path).write(*asset_type as u8);
            }
            M::Health(value) | M::BaseHealth(value) => {
                w.write(*value);
            }
            M::Emotion(value) => {
                w.write(*value);
            }
            M::Money(value) => {
                w.write(*value);
            }
            M::AddItem(item) => item.write_to(&mut w),
            M::RemoveItem { id } | M::RemovePost { id } => {
                w.write_str8(id);
            }
            M::ExcludeObject(id) | M::IncludeObject(id) => {
                w.write(*id);
            }
            M::ExcludeActor { ticket } | M::IncludeActor { ticket } => {
                w.write_str8(ticket);
            }
            M::MoveCamera { position, hold } => {
                w.write_vec3(*position).write(*hold);
            }
            M::SlideCamera { position, duration } => {
                w.write_vec3(*position).write(*duration);
            }
            M::ShakeCamera { strength, duration } => {
                w.write(*strength).write(*duration);
            }
            M::FadeCamera { color, duration } => {
                w.write_rgba(*color).write(*duration);
            }
            M::TrackWithCamera { ticket } => write_opt_str8(&mut w, ticket.as_deref()),
            M::Teleport {
                warp,
                position,
                heading,
            } => {
                w.write(*warp).write_vec3(*position).write(*heading as u8);
            }
            M::Message { text, mugshot } | M::Question { text, mugshot } => {
                w.write_str16(text);
                mugshot.write_to(&mut w);
            }
            M::Quiz { options, mugshot } => {
                for option in options {
                    w.write_str16(option);
                }
                mugshot.write_to(&mut w);
            }
            M::Prompt {
                character_limit,
                default_text,
            } => {
                w.write(*character_limit);
                write_opt_str16(&mut w, default_text.as_deref());
            }
            M::OpenBoard {
                topic,
                color,
                posts,
                open_instantly,
            } => {
                w.write_str16(topic).write_rgb(*color);
                write_list(&mut w, posts);
                w.write(*open_instantly);
            }
            M::PrependPosts { reference, posts } | M::AppendPosts { reference, posts } => {
                write_opt_str8(&mut w, reference.as_deref());
                write_list(&mut w, posts);
            }
            M::ShopInventory(items) => write_list(&mut w, items),
            M::OpenShop { mugshot } => mugshot.write_to(&mut w),
            M::LoadPackage { category, path } => {
                w.write(*category as u8).write_str16(path);
            }
            M::PackageOffer {
                name,
                id,
                category,
                path,
            } => {
                w.write_str16(name)
                    .write_str8(id)
                    .write(*category as u8)
                    .write_str16(path);
            }
            M::ModWhitelist { path } | M::ModBlacklist { path } => {
                write_opt_str16(&mut w, path.as_deref());
            }
            M::InitiateMob {
                package_path,
                data,
                health,
                base_health,
            } => {
                w.write_str16(package_path);
                write_opt_str16(&mut w, data.as_deref());
                w.write(*health).write(*base_health);
            }
            M::InitiatePvp {
                package_path,
                data,
                players,
                health,
                base_health,
            } => {
                write_opt_str16(&mut w, package_path.as_deref());
                write_opt_str16(&mut w, data.as_deref());
                write_list(&mut w, players);
                w.write(*health).write(*base_health);
            }
            M::ActorConnected(actor) => actor.write_to(&mut w),
            M::ActorDisconnected { ticket, warp_out } => {
                w.write_str8(ticket).write(*warp_out);
            }
            M::ActorSetName { ticket, name } => {
                w.write_str8(ticket).write_str8(name);
            }
            M::ActorMoveTo {
                ticket,
                position,
                heading,
            } => {
                w.write_str8(ticket)
                    .write_vec3(*position)
                    .write(*heading as u8);
            }
            M::ActorSetAvatar {
                ticket,
                texture_path,
                animation_path,
            } => {
                w.write_str8(ticket)
                    .write_str16(texture_path)
                    .write_str16(animation_path);
            }
            M::ActorEmote {
                ticket,
                emote,
                use_custom,
            } => {
                w.write_str8(ticket).write(*emote).write(*use_custom);
            }
            M::ActorAnimate {
                ticket,
                state,
                looped,
            } => {
                w.write_str8(ticket).write_str8(state).write(*looped);
            }
            M::ActorKeyframes { ticket, keyframes } => {
                w.write_str8(ticket);
                write_list(&mut w, keyframes);
            }
            M::ActorMinimapColor { ticket, color } => {
                w.write_str8(ticket).write_rgba(*color);
            }
        }

        w.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;

    fn actor_connected() -> ActorConnected {
        ActorConnected {
            ticket: "xyz".to_string(),
            name: "Lan".to_string(),
            texture_path: "/server/assets/lan.png".to_string(),
            animation_path: "/server/assets/lan.animation".to_string(),
            heading: Direction::DownLeft,
            position: Vec3::new(4.0, 2.5, 1.0),
            solid: true,
            warp_in: true,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            minimap_color: Color::rgba(10, 20, 30, 255),
            animation: None,
        }
    }

    #[test]
    fn test_login_layout() {
        let mut w = BufferWriter::new();
        w.write(ServerSignal::Login.id())
            .write_str8("abc")
            .write(true)
            .write_vec3(Vec3::new(1.0, 2.0, 0.0))
            .write(Direction::Up as u8);

        assert_eq!(
            ServerMessage::decode(w.as_bytes()),
            Ok(ServerMessage::Login {
                ticket: "abc".to_string(),
                warp_in: true,
                position: Vec3::new(1.0, 2.0, 0.0),
                heading: Direction::Up,
            })
        );
    }

    #[test]
    fn test_version_info_layout() {
        let mut w = BufferWriter::new();
        w.write(ServerSignal::VersionInfo.id())
            .write_str8("overnet")
            .write(3u64)
            .write(900u16);

        assert_eq!(
            ServerMessage::decode(w.as_bytes()),
            Ok(ServerMessage::VersionInfo {
                version_id: "overnet".to_string(),
                version_iteration: 3,
                max_payload_size: 900,
            })
        );
    }

    #[test]
    fn test_actor_connected_decodes() {
        let message = ServerMessage::ActorConnected(actor_connected());
        assert_eq!(ServerMessage::decode(&message.encode()), Ok(message));
    }

    #[test]
    fn test_truncated_body_is_rejected() {
        let body = ServerMessage::ActorConnected(actor_connected()).encode();

        let result = ServerMessage::decode(&body[..body.len() - 3]);
        assert!(matches!(
            result,
            Err(ProtocolError::Codec(CodecError::UnexpectedEnd { .. }))
        ));
    }

    #[test]
    fn test_empty_and_unknown_signal() {
        assert!(ServerMessage::decode(&[]).is_err());
        assert!(ServerMessage::decode(&[7]).is_err());
        assert_eq!(
            ServerMessage::decode(&[0xE8, 0x03]),
            Err(ProtocolError::UnknownSignal(1000))
        );
    }

    #[test]
    fn test_invalid_direction_is_rejected() {
        let mut w = BufferWriter::new();
        w.write(ServerSignal::TransferComplete.id())
            .write(false)
            .write(42u8);

        assert_eq!(
            ServerMessage::decode(w.as_bytes()),
            Err(ProtocolError::InvalidValue {
                field: "direction",
                value: 42
            })
        );
    }

    #[test]
    fn test_optional_fields() {
        let tracked = ServerMessage::TrackWithCamera { ticket: None };
        assert_eq!(tracked.encode().len(), 3);
        assert_eq!(ServerMessage::decode(&tracked.encode()), Ok(tracked));

        let prompt = ServerMessage::Prompt {
            character_limit: 12,
            default_text: Some("hello".to_string()),
        };
        assert_eq!(ServerMessage::decode(&prompt.encode()), Ok(prompt));
    }

    #[test]
    fn test_board_posts() {
        let message = ServerMessage::OpenBoard {
            topic: "News".to_string(),
            color: Color::rgb(0, 128, 255),
            posts: vec![BoardPost {
                id: "1".to_string(),
                read: false,
                title: "Welcome".to_string(),
                author: "admin".to_string(),
            }],
            open_instantly: true,
        };

        assert_eq!(ServerMessage::decode(&message.encode()), Ok(message));
    }
}
