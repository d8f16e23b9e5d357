use glam::Vec3;

use super::types::{BoardPost, Item, Keyframe, Mugshot, PackageCategory, RemotePlayer, ShopItem};
use crate::actor::{Direction, WarpKind};
use crate::assets::AssetType;
use crate::camera::CameraCommand;
use crate::codec::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Kicked,
    TimedOut,
    /// Closed locally through [`OnlineSession::disconnect`](super::OnlineSession::disconnect).
    Closed,
    /// The server runs a different protocol version.
    VersionMismatch,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kicked => "kicked",
            Self::TimedOut => "timed out",
            Self::Closed => "closed",
            Self::VersionMismatch => "version mismatch",
        }
    }
}

/// Scene change the host should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Enter a battle on top of the overworld.
    Push,
    /// Leave the online scene.
    Pop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogRequest {
    Message {
        text: String,
        mugshot: Mugshot,
    },
    /// Yes/no, answered with `respond_textbox(1)` for yes.
    Question {
        text: String,
        mugshot: Mugshot,
    },
    /// Answered with the chosen option's index.
    Quiz {
        options: [String; 3],
        mugshot: Mugshot,
    },
    /// Answered through `respond_prompt`.
    Prompt {
        character_limit: u16,
        default_text: Option<String>,
    },
}

/// A request or notification for the host, drained once per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected {
        ticket: String,
    },
    Kicked {
        reason: String,
    },
    Disconnected {
        reason: DisconnectReason,
    },
    Transition(Transition),
    TransferFailed {
        address: String,
        reason: String,
    },
    PlayerSpawned {
        position: Vec3,
        heading: Direction,
    },
    PlayerTeleported {
        position: Vec3,
        heading: Direction,
        warp: bool,
    },
    /// The host plays the animation and reports back through
    /// `finish_player_warp`.
    PlayerWarp {
        kind: WarpKind,
        position: Vec3,
    },
    MapChanged {
        path: String,
    },
    HealthChanged(i32),
    BaseHealthChanged(i32),
    EmotionChanged(u8),
    MoneyChanged(u32),
    ItemAdded(Item),
    ItemRemoved {
        id: String,
    },
    PlaySound {
        path: String,
    },
    ObjectVisibility {
        id: u32,
        visible: bool,
    },
    ActorVisibility {
        ticket: String,
        visible: bool,
    },
    Camera(CameraCommand),
    InputLocked(bool),
    Dialog(DialogRequest),
    TextboxAcknowledged,
    BoardOpened {
        topic: String,
        color: Color,
        posts: Vec<BoardPost>,
        open_instantly: bool,
    },
    BoardPostsPrepended {
        reference: Option<String>,
        posts: Vec<BoardPost>,
    },
    BoardPostsAppended {
        reference: Option<String>,
        posts: Vec<BoardPost>,
    },
    BoardPostRemoved {
        id: String,
    },
    BoardClosed,
    PostSelectionAcknowledged,
    ShopInventory(Vec<ShopItem>),
    ShopOpened {
        mugshot: Mugshot,
    },
    LoadPackage {
        category: PackageCategory,
        path: String,
    },
    /// Answered through `package_installed` once the host has it.
    PackageOffered {
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
    MobBattle {
        package_path: String,
        data: Option<String>,
        health: i32,
        base_health: i32,
    },
    PvpBattle {
        package_path: Option<String>,
        data: Option<String>,
        players: Vec<RemotePlayer>,
        health: i32,
        base_health: i32,
    },
    ActorAdded {
        ticket: String,
    },
    ActorRemoved {
        ticket: String,
    },
    ActorRenamed {
        ticket: String,
        name: String,
    },
    ActorAvatar {
        ticket: String,
        texture_path: String,
        animation_path: String,
    },
    ActorEmote {
        ticket: String,
        emote: u8,
        use_custom: bool,
    },
    ActorAnimation {
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
    /// The host plays the animation and reports back through `finish_warp`.
    ActorWarp {
        ticket: String,
        kind: WarpKind,
        position: Vec3,
    },
    AssetReady {
        path: String,
        asset_type: AssetType,
    },
    AssetRemoved {
        path: String,
    },
    Preload {
        path: String,
        asset_type: AssetType,
    },
    CustomEmotes {
        path: String,
    },
}
