use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use glam::Vec3;

use super::config::SessionConfig;
use super::error::SessionError;
use super::events::{DisconnectReason, SessionEvent, Transition};
use super::inbound::ServerMessage;
use super::outbound::ClientMessage;
use super::signals::{VERSION_ID, VERSION_ITERATION};
use super::types::Item;
use crate::actor::{
    ActorFlags, ActorTable, Direction, ExclusionCounter, Pose, TileEffects, WarpKind,
};
use crate::assets::{AssetStreamCache, DiskCache};
use crate::camera::{CameraCommand, CameraDirectors, CameraEvent};
use crate::net::{NetworkStats, PacketProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Version check and login, until `connection_complete`.
    Connecting,
    Connected,
    /// Between `transfer_warp`/`transfer_start` and `transfer_complete`.
    Transferring,
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Transferring => "transferring",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Local player state as last set by the server.
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub position: Vec3,
    pub heading: Direction,
    pub health: i32,
    pub base_health: i32,
    pub emotion: u8,
    pub money: u32,
    pub items: Vec<Item>,
    pub input_locked: bool,
    pub map_path: Option<String>,
    pub custom_emotes_path: Option<String>,
}

/// Avatar announced through `avatar_change`, kept for re-announcing after a
/// server transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarInfo {
    pub name: String,
    pub element: String,
    pub max_health: i32,
}

/// What happens once the host finishes the player's warp animation.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum WarpFollowup {
    None,
    TransferredOut,
    TransferServer { address: String, data: String },
}

/// Login held back until the server confirms a matching version.
#[derive(Debug, Clone)]
struct VersionHandshake {
    join_data: String,
    last_request: Option<Instant>,
}

#[derive(Debug, Clone)]
pub(super) struct PlayerWarp {
    pub kind: WarpKind,
    pub started: Instant,
    pub followup: WarpFollowup,
}

/// A client's connection to one overworld server.
///
/// Poll-driven: call [`update`](Self::update) once per frame, then drain the
/// events it produced with [`drain_events`](Self::drain_events). Host
/// decisions flow back through the response methods.
pub struct OnlineSession {
    pub(super) config: SessionConfig,
    pub(super) address: String,
    pub(super) processor: PacketProcessor,
    pub(super) state: ConnectionState,
    pub(super) ticket: Option<String>,
    pub(super) player: PlayerState,
    pub(super) player_warp: Option<PlayerWarp>,
    pub(super) avatar: Option<AvatarInfo>,
    pub(super) actors: ActorTable,
    pub(super) excluded_objects: ExclusionCounter<u32>,
    pub(super) assets: AssetStreamCache,
    pub(super) cameras: CameraDirectors,
    pub(super) events: Vec<SessionEvent>,
    pub(super) sync_buffer: Option<Vec<ServerMessage>>,
    pub(super) keyframe_expiry: HashMap<String, Instant>,
    pub(super) loaded_packages: HashSet<String>,
    pub(super) installed_packages: HashSet<String>,
    pub(super) kick_reason: Option<String>,
    poses: HashMap<String, Pose>,
    handshake: Option<VersionHandshake>,
    last_update: Option<Instant>,
    last_position_send: Option<Instant>,
}

/// Splits `host:port?data` into the address and the join data after `?`.
pub fn split_address(address: &str) -> (&str, Option<&str>) {
    match address.split_once('?') {
        Some((address, data)) => (address, Some(data)),
        None => (address, None),
    }
}

pub(super) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

impl OnlineSession {
    /// Binds a socket to `address`. Nothing is sent until the first `update`,
    /// which starts the version check; login follows a matching
    /// `version_info`.
    pub fn connect(address: &str, config: SessionConfig) -> Result<Self, SessionError> {
        let (host, data) = split_address(address);
        let processor = open_processor(host, &config)?;
        let assets = open_assets(host, &config);

        log::info!(
            "Connecting to {} as {} ({} cached assets)",
            processor.remote_addr(),
            config.username,
            assets.len()
        );

        let join_data = data.unwrap_or(&config.join_data).to_string();

        let mut session = Self {
            address: host.to_string(),
            processor,
            state: ConnectionState::Connecting,
            ticket: None,
            player: PlayerState::default(),
            player_warp: None,
            avatar: None,
            actors: ActorTable::new(),
            excluded_objects: ExclusionCounter::default(),
            assets,
            cameras: CameraDirectors::default(),
            events: Vec::new(),
            sync_buffer: None,
            keyframe_expiry: HashMap::new(),
            loaded_packages: HashSet::new(),
            installed_packages: HashSet::new(),
            kick_reason: None,
            poses: HashMap::new(),
            handshake: None,
            last_update: None,
            last_position_send: None,
            config,
        };

        session.begin_handshake(join_data);
        Ok(session)
    }

    fn begin_handshake(&mut self, join_data: String) {
        self.handshake = Some(VersionHandshake {
            join_data,
            last_request: None,
        });
    }

    pub fn awaiting_version(&self) -> bool {
        self.handshake.is_some()
    }

    /// `version_request` is unreliable, so it repeats until answered.
    fn request_version(&mut self, now: Instant) {
        let retry = self.config.version_retry();
        let Some(handshake) = self.handshake.as_mut() else {
            return;
        };
        if handshake
            .last_request
            .is_some_and(|last| now.saturating_duration_since(last) < retry)
        {
            return;
        }

        handshake.last_request = Some(now);
        self.send(ClientMessage::VersionRequest);
    }

    fn on_version_info(
        &mut self,
        version_id: String,
        version_iteration: u64,
        max_payload_size: u16,
    ) {
        let Some(handshake) = self.handshake.take() else {
            log::debug!("Ignoring late version_info");
            return;
        };

        if version_id != VERSION_ID {
            log::warn!("Server speaks {:?}, expected {:?}", version_id, VERSION_ID);
            self.end(DisconnectReason::VersionMismatch);
            return;
        }

        if version_iteration != VERSION_ITERATION {
            let newer = if version_iteration > VERSION_ITERATION {
                "server"
            } else {
                "client"
            };
            log::warn!(
                "Version mismatch (server {}, client {}), the {} is newer",
                version_iteration,
                VERSION_ITERATION,
                newer
            );
            self.end(DisconnectReason::VersionMismatch);
            return;
        }

        let max_payload_size = usize::from(max_payload_size);
        log::debug!(
            "Server version {} {}, payload limit {}",
            version_id,
            version_iteration,
            max_payload_size
        );
        self.config.processor.max_payload_size = max_payload_size;
        self.processor.set_max_payload_size(max_payload_size);

        self.send_login(handshake.join_data);
    }

    /// Login, the asset announcements and the join request, in that order.
    pub(super) fn send_login(&mut self, data: String) {
        self.send(ClientMessage::Login {
            username: self.config.username.clone(),
            identity: self.config.identity.as_bytes().to_vec(),
            data,
        });

        for (path, last_modified) in self.assets.announcements() {
            self.send(ClientMessage::AssetFound {
                path,
                last_modified,
            });
        }

        if let Some(avatar) = self.avatar.clone() {
            self.send(ClientMessage::AvatarChange {
                name: avatar.name,
                element: avatar.element,
                max_health: avatar.max_health,
            });
        }

        self.send(ClientMessage::RequestJoin);
    }

    pub fn update(&mut self, tiles: Option<&dyn TileEffects>) -> Result<(), SessionError> {
        self.update_at(Instant::now(), tiles)
    }

    /// One tick: network in, dispatch, actors, camera, network out. Returns
    /// [`SessionError::NotConnected`] once the session has ended.
    pub fn update_at(
        &mut self,
        now: Instant,
        tiles: Option<&dyn TileEffects>,
    ) -> Result<(), SessionError> {
        if self.state == ConnectionState::Disconnected {
            return Err(SessionError::NotConnected);
        }

        for body in self.processor.receive(now) {
            match ServerMessage::decode(&body) {
                Ok(message) => self.route(message, now),
                Err(e) => log::warn!("Dropping server signal: {}", e),
            }
        }

        self.request_version(now);

        self.expire_warps(now);
        self.expire_keyframes(now);
        self.sample_actors(now, tiles);
        self.update_camera(now);
        self.send_position(now);

        self.processor.update(now);
        self.last_update = Some(now);

        if let Some(reason) = self.kick_reason.take() {
            log::info!("Kicked: {}", reason);
            self.end(DisconnectReason::Kicked);
        } else if self.processor.timed_out(now) {
            log::warn!(
                "No response from {} for {:.1}s",
                self.address,
                self.processor.silence(now).as_secs_f32()
            );
            self.end(DisconnectReason::TimedOut);
        }

        Ok(())
    }

    /// Applies the synchronized-batch markers, then dispatches.
    fn route(&mut self, message: ServerMessage, now: Instant) {
        if self.handshake.is_some() {
            match message {
                ServerMessage::VersionInfo {
                    version_id,
                    version_iteration,
                    max_payload_size,
                } => self.on_version_info(version_id, version_iteration, max_payload_size),
                message @ ServerMessage::Kick { .. } => self.dispatch(message, now),
                message => log::trace!("{:?} before version_info dropped", message.signal()),
            }
            return;
        }

        match message {
            ServerMessage::VersionInfo { .. } => log::debug!("Ignoring late version_info"),
            ServerMessage::SynchronizeUpdates => {
                if self.sync_buffer.is_some() {
                    log::warn!("Nested synchronize_updates ignored");
                } else {
                    self.sync_buffer = Some(Vec::new());
                }
            }
            ServerMessage::EndSynchronization => match self.sync_buffer.take() {
                Some(buffered) => {
                    log::trace!("Applying {} synchronized signals", buffered.len());
                    for message in buffered {
                        self.dispatch(message, now);
                    }
                }
                None => log::warn!("end_synchronization without a batch"),
            },
            message => match self.sync_buffer.as_mut() {
                Some(buffer) => buffer.push(message),
                None => self.dispatch(message, now),
            },
        }
    }

    fn expire_warps(&mut self, now: Instant) {
        let timeout = self.config.sync.warp_timeout();

        for ticket in self.actors.expired_warps(now, timeout) {
            log::debug!("Warp for {} timed out", ticket);
            self.complete_actor_warp(&ticket, now);
        }

        if self
            .player_warp
            .as_ref()
            .is_some_and(|warp| now.saturating_duration_since(warp.started) >= timeout)
        {
            log::debug!("Player warp timed out");
            self.complete_player_warp();
        }
    }

    fn expire_keyframes(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .keyframe_expiry
            .iter()
            .filter(|&(_, &expiry)| expiry <= now)
            .map(|(ticket, _)| ticket.clone())
            .collect();

        for ticket in expired {
            self.keyframe_expiry.remove(&ticket);
            if let Some(actor) = self.actors.get_mut(&ticket) {
                actor.flags.remove(ActorFlags::KEYFRAMES_ACTIVE);
            }
        }
    }

    fn sample_actors(&mut self, now: Instant, tiles: Option<&dyn TileEffects>) {
        let sync = &self.config.sync;
        self.poses.clear();
        for actor in self.actors.iter() {
            self.poses.insert(
                actor.ticket.clone(),
                actor.tracker.sample(now, sync, tiles),
            );
        }
    }

    fn update_camera(&mut self, now: Instant) {
        let elapsed = self
            .last_update
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);

        let mut commands: Vec<CameraCommand> = Vec::new();
        self.cameras.update(elapsed, &mut commands);
        self.events
            .extend(commands.into_iter().map(SessionEvent::Camera));
    }

    fn send_position(&mut self, now: Instant) {
        if self.state != ConnectionState::Connected {
            return;
        }
        let Some(interval) = self.config.position_interval() else {
            return;
        };
        if self
            .last_position_send
            .is_some_and(|last| now.saturating_duration_since(last) < interval)
        {
            return;
        }

        self.last_position_send = Some(now);
        self.send(ClientMessage::Position {
            creation_ms: unix_millis(),
            position: self.player.position,
            heading: self.player.heading,
        });
    }

    /// Moves to `Disconnected` and asks the host to leave the scene.
    pub(super) fn end(&mut self, reason: DisconnectReason) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        log::info!("Session with {} ended: {}", self.address, reason.as_str());
        self.state = ConnectionState::Disconnected;
        self.cameras.reset();
        self.sync_buffer = None;
        self.handshake = None;
        self.events.push(SessionEvent::Disconnected { reason });
        self.events.push(SessionEvent::Transition(Transition::Pop));
    }

    pub(super) fn send(&mut self, message: ClientMessage) {
        if self.state == ConnectionState::Disconnected {
            log::debug!("Not sending {:?} on a closed session", message.signal());
            return;
        }
        self.processor
            .send(message.reliability(), &message.encode());
    }

    /// Swaps the connection to a new server. On failure the current one is
    /// kept and the player is put back where they were.
    pub(super) fn transfer_server(&mut self, address: String, data: String) {
        let (host, query) = split_address(&address);
        let data = query.map(str::to_string).unwrap_or(data);

        let processor = match open_processor(host, &self.config) {
            Ok(processor) => processor,
            Err(e) => {
                log::warn!("Transfer to {} failed: {}", address, e);
                self.restore_after_failed_transfer(address, e.to_string());
                return;
            }
        };

        log::info!("Transferring from {} to {}", self.address, host);

        self.send(ClientMessage::Logout);
        self.processor = processor;
        self.address = host.to_string();
        self.assets = open_assets(host, &self.config);
        self.clear_world();
        self.ticket = None;
        self.state = ConnectionState::Connecting;
        self.last_position_send = None;

        self.begin_handshake(data);
    }

    fn restore_after_failed_transfer(&mut self, address: String, reason: String) {
        let position = self.player.position;
        self.events
            .push(SessionEvent::TransferFailed { address, reason });
        self.events.push(SessionEvent::PlayerTeleported {
            position,
            heading: self.player.heading,
            warp: false,
        });
        self.cameras.warp.enqueue(CameraEvent::Place {
            position,
            hold: Duration::ZERO,
        });
        self.cameras.warp.enqueue(CameraEvent::Unlock);

        if self.state == ConnectionState::Transferring {
            self.state = ConnectionState::Connected;
        }
    }

    /// Drops every remote actor and exclusion, announcing the removals.
    pub(super) fn clear_world(&mut self) {
        let tickets: Vec<String> = self.actors.iter().map(|a| a.ticket.clone()).collect();
        for ticket in tickets {
            self.events.push(SessionEvent::ActorRemoved { ticket });
        }

        self.actors.clear();
        self.excluded_objects.clear();
        self.keyframe_expiry.clear();
        self.poses.clear();
        self.sync_buffer = None;
    }

    pub(super) fn complete_actor_warp(&mut self, ticket: &str, now: Instant) {
        let Some((kind, removed)) = self.actors.finish_warp(ticket, now, &self.config.sync) else {
            return;
        };

        log::trace!("Warp {:?} finished for {}", kind, ticket);
        if removed {
            self.keyframe_expiry.remove(ticket);
            self.events.push(SessionEvent::ActorRemoved {
                ticket: ticket.to_string(),
            });
        }
    }

    pub(super) fn complete_player_warp(&mut self) {
        let Some(warp) = self.player_warp.take() else {
            return;
        };

        match warp.followup {
            WarpFollowup::None => {}
            WarpFollowup::TransferredOut => self.send(ClientMessage::TransferredOut),
            WarpFollowup::TransferServer { address, data } => self.transfer_server(address, data),
        }
    }

    pub(super) fn start_player_warp(&mut self, kind: WarpKind, followup: WarpFollowup, now: Instant) {
        // a warp cut short still runs its followup
        if self.player_warp.is_some() {
            self.complete_player_warp();
        }

        self.events.push(SessionEvent::PlayerWarp {
            kind,
            position: self.player.position,
        });
        self.player_warp = Some(PlayerWarp {
            kind,
            started: now,
            followup,
        });
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn ticket(&self) -> Option<&str> {
        self.ticket.as_deref()
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn avatar(&self) -> Option<&AvatarInfo> {
        self.avatar.as_ref()
    }

    pub fn actors(&self) -> &ActorTable {
        &self.actors
    }

    /// Pose of every remote actor as of the last update.
    pub fn poses(&self) -> &HashMap<String, Pose> {
        &self.poses
    }

    pub fn is_object_excluded(&self, id: u32) -> bool {
        self.excluded_objects.is_excluded(&id)
    }

    pub fn assets(&self) -> &AssetStreamCache {
        &self.assets
    }

    pub fn installed_packages(&self) -> &HashSet<String> {
        &self.installed_packages
    }

    pub fn camera_locked(&self) -> bool {
        self.cameras.is_locked()
    }

    pub fn stats(&self) -> &NetworkStats {
        self.processor.stats()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

fn open_processor(address: &str, config: &SessionConfig) -> Result<PacketProcessor, SessionError> {
    use std::net::ToSocketAddrs;

    let remote = address
        .to_socket_addrs()
        .map_err(|e| SessionError::AddressResolution(format!("{}: {}", address, e)))?
        .next()
        .ok_or_else(|| SessionError::AddressResolution(address.to_string()))?;

    Ok(PacketProcessor::connect(remote, config.processor.clone())?)
}

fn open_assets(address: &str, config: &SessionConfig) -> AssetStreamCache {
    let local_root = config.local_asset_root.clone();

    let Some(root) = config.cache_root.as_deref() else {
        return AssetStreamCache::new(local_root);
    };

    match DiskCache::open(Path::new(root), address) {
        Ok(disk) => AssetStreamCache::with_disk(disk, local_root),
        Err(e) => {
            log::warn!(
                "Asset cache under {} unavailable, keeping assets in memory: {}",
                root.display(),
                e
            );
            AssetStreamCache::new(local_root)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;

    use super::*;

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("localhost:8765"), ("localhost:8765", None));
        assert_eq!(
            split_address("localhost:8765?area=2"),
            ("localhost:8765", Some("area=2"))
        );
    }

    fn session() -> (OnlineSession, UdpSocket) {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let address = server.local_addr().unwrap().to_string();
        let session = OnlineSession::connect(&address, SessionConfig::default()).unwrap();
        (session, server)
    }

    fn version_info(version_iteration: u64, max_payload_size: u16) -> ServerMessage {
        ServerMessage::VersionInfo {
            version_id: VERSION_ID.to_string(),
            version_iteration,
            max_payload_size,
        }
    }

    fn login(ticket: &str) -> ServerMessage {
        ServerMessage::Login {
            ticket: ticket.to_string(),
            warp_in: false,
            position: Vec3::ZERO,
            heading: Direction::Down,
        }
    }

    #[test]
    fn test_login_waits_for_version_info() {
        let (mut session, _server) = session();
        let now = Instant::now();
        assert!(session.awaiting_version());

        session.route(login("abc"), now);
        assert_eq!(session.ticket(), None);

        session.route(version_info(VERSION_ITERATION, 600), now);
        assert!(!session.awaiting_version());
        assert_eq!(session.processor.config().max_payload_size, 600);
        assert_eq!(session.config().processor.max_payload_size, 600);
        assert_eq!(session.state(), ConnectionState::Connecting);

        session.route(login("abc"), now);
        assert_eq!(session.ticket(), Some("abc"));
    }

    #[test]
    fn test_version_mismatch_disconnects() {
        let (mut session, _server) = session();
        let now = Instant::now();

        session.route(version_info(VERSION_ITERATION + 1, 600), now);

        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(session.drain_events().contains(&SessionEvent::Disconnected {
            reason: DisconnectReason::VersionMismatch
        }));
        assert_ne!(session.processor.config().max_payload_size, 600);
    }

    #[test]
    fn test_foreign_version_id_disconnects() {
        let (mut session, _server) = session();

        session.route(
            ServerMessage::VersionInfo {
                version_id: "other".to_string(),
                version_iteration: VERSION_ITERATION,
                max_payload_size: 600,
            },
            Instant::now(),
        );
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_kick_during_version_check() {
        let (mut session, _server) = session();
        let now = Instant::now();

        session.route(
            ServerMessage::Kick {
                reason: "full".to_string(),
            },
            now,
        );
        session.update_at(now, None).unwrap();

        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(session.drain_events().contains(&SessionEvent::Disconnected {
            reason: DisconnectReason::Kicked
        }));
    }

    #[test]
    fn test_late_version_info_ignored() {
        let (mut session, _server) = session();
        let now = Instant::now();
        session.route(version_info(VERSION_ITERATION, 600), now);

        session.route(version_info(VERSION_ITERATION, 700), now);
        assert_eq!(session.processor.config().max_payload_size, 600);
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_unresolvable_address() {
        let result = OnlineSession::connect("not an address", SessionConfig::default());
        assert!(matches!(result, Err(SessionError::AddressResolution(_))));
    }
}
