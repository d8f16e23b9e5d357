use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};

use super::events::{DialogRequest, SessionEvent, Transition};
use super::inbound::{ActorConnected, ServerMessage};
use super::online::{ConnectionState, OnlineSession, WarpFollowup, unix_millis};
use super::outbound::ClientMessage;
use crate::actor::{ActorFlags, BroadcastOutcome, Direction, Disconnect, RemoteActor, WarpKind};
use crate::assets::AssetType;
use crate::camera::{CameraEvent, CameraTarget};
use crate::net::secs;

impl OnlineSession {
    /// Applies one server signal. Nothing here fails the session: bad input
    /// is logged and dropped.
    pub(super) fn dispatch(&mut self, message: ServerMessage, now: Instant) {
        use ServerMessage as M;

        match message {
            // answered in `route` while the version check is pending
            M::VersionInfo { .. } => log::debug!("Ignoring late version_info"),
            M::Authorize { address, data } => {
                log::debug!("Authorizing {} for {}", self.address, address);
                self.send(ClientMessage::Authorize {
                    origin_address: self.address.clone(),
                    identity: self.config.identity.as_bytes().to_vec(),
                    data,
                });
            }
            M::Login {
                ticket,
                warp_in,
                position,
                heading,
            } => self.on_login(ticket, warp_in, position, heading, now),
            M::ConnectionComplete => self.ready(),
            M::TransferWarp => {
                self.state = ConnectionState::Transferring;
                self.start_player_warp(WarpKind::Out, WarpFollowup::TransferredOut, now);
            }
            M::TransferStart => {
                log::info!("Transfer started");
                self.state = ConnectionState::Transferring;
                self.clear_world();
            }
            M::TransferComplete { warp_in, heading } => {
                if heading != Direction::None {
                    self.player.heading = heading;
                }
                if warp_in {
                    self.start_player_warp(WarpKind::In, WarpFollowup::None, now);
                }
                self.ready();
            }
            M::TransferServer {
                address,
                data,
                warp_out,
            } => {
                if warp_out {
                    self.state = ConnectionState::Transferring;
                    self.start_player_warp(
                        WarpKind::Out,
                        WarpFollowup::TransferServer { address, data },
                        now,
                    );
                } else {
                    self.transfer_server(address, data);
                }
            }
            M::Kick { reason } => {
                self.events.push(SessionEvent::Kicked {
                    reason: reason.clone(),
                });
                self.kick_reason = Some(reason);
            }

            M::RemoveAsset { path } => {
                self.assets.remove(&path);
                self.events.push(SessionEvent::AssetRemoved { path });
            }
            M::AssetStreamStart {
                path,
                last_modified,
                cachable,
                asset_type,
                size,
            } => {
                let result = self
                    .assets
                    .begin_stream(path, last_modified, cachable, asset_type, size);
                self.on_asset_progress(result);
            }
            M::AssetStream { bytes } => {
                let result = self.assets.append_chunk(&bytes);
                self.on_asset_progress(result);
            }
            M::Preload { path, asset_type } => {
                if self.assets.get(&path).is_none() {
                    log::debug!("Preload for {} before it was streamed", path);
                }
                self.events.push(SessionEvent::Preload { path, asset_type });
            }
            M::CustomEmotesPath { path } => {
                self.player.custom_emotes_path = Some(path.clone());
                self.events.push(SessionEvent::CustomEmotes { path });
            }
            M::MapUpdate { path } => {
                self.player.map_path = Some(path.clone());
                self.events.push(SessionEvent::MapChanged { path });
            }

            M::Health(health) => {
                self.player.health = health;
                self.events.push(SessionEvent::HealthChanged(health));
            }
            M::BaseHealth(base_health) => {
                self.player.base_health = base_health;
                self.events.push(SessionEvent::BaseHealthChanged(base_health));
            }
            M::Emotion(emotion) => {
                self.player.emotion = emotion;
                self.events.push(SessionEvent::EmotionChanged(emotion));
            }
            M::Money(money) => {
                self.player.money = money;
                self.events.push(SessionEvent::MoneyChanged(money));
            }
            M::AddItem(item) => {
                self.player.items.push(item.clone());
                self.events.push(SessionEvent::ItemAdded(item));
            }
            M::RemoveItem { id } => {
                if let Some(index) = self.player.items.iter().position(|item| item.id == id) {
                    self.player.items.remove(index);
                }
                self.events.push(SessionEvent::ItemRemoved { id });
            }
            M::PlaySound { path } => self.events.push(SessionEvent::PlaySound { path }),

            M::ExcludeObject(id) => {
                if self.excluded_objects.exclude(id) {
                    self.events
                        .push(SessionEvent::ObjectVisibility { id, visible: false });
                }
            }
            M::IncludeObject(id) => {
                if self.excluded_objects.include(id) {
                    self.events
                        .push(SessionEvent::ObjectVisibility { id, visible: true });
                }
            }
            M::ExcludeActor { ticket } => {
                if self.actors.exclude(&ticket) {
                    self.events.push(SessionEvent::ActorVisibility {
                        ticket,
                        visible: false,
                    });
                }
            }
            M::IncludeActor { ticket } => {
                if self.actors.include(&ticket) {
                    self.events.push(SessionEvent::ActorVisibility {
                        ticket,
                        visible: true,
                    });
                }
            }

            M::MoveCamera { position, hold } => self.cameras.server.enqueue(CameraEvent::Place {
                position,
                hold: secs(hold),
            }),
            M::SlideCamera { position, duration } => {
                self.cameras.server.enqueue(CameraEvent::Move {
                    position,
                    duration: secs(duration),
                })
            }
            M::ShakeCamera { strength, duration } => {
                self.cameras.server.enqueue(CameraEvent::Shake {
                    strength,
                    duration: secs(duration),
                })
            }
            M::FadeCamera { color, duration } => self.cameras.server.enqueue(CameraEvent::Fade {
                color,
                duration: secs(duration),
            }),
            M::TrackWithCamera { ticket } => {
                let target = match ticket {
                    Some(ticket) if self.ticket.as_deref() != Some(ticket.as_str()) => {
                        CameraTarget::Actor(ticket)
                    }
                    _ => CameraTarget::Player,
                };
                self.cameras.server.enqueue(CameraEvent::Track { target });
            }
            M::UnlockCamera => self.cameras.server.enqueue(CameraEvent::Unlock),
            M::LockInput => {
                self.player.input_locked = true;
                self.events.push(SessionEvent::InputLocked(true));
            }
            M::UnlockInput => {
                self.player.input_locked = false;
                self.events.push(SessionEvent::InputLocked(false));
            }
            M::Teleport {
                warp,
                position,
                heading,
            } => {
                self.player.position = position;
                if heading != Direction::None {
                    self.player.heading = heading;
                }
                self.events.push(SessionEvent::PlayerTeleported {
                    position,
                    heading: self.player.heading,
                    warp,
                });
            }

            M::Message { text, mugshot } => {
                self.events
                    .push(SessionEvent::Dialog(DialogRequest::Message { text, mugshot }));
            }
            M::Question { text, mugshot } => {
                self.events
                    .push(SessionEvent::Dialog(DialogRequest::Question { text, mugshot }));
            }
            M::Quiz { options, mugshot } => {
                self.events
                    .push(SessionEvent::Dialog(DialogRequest::Quiz { options, mugshot }));
            }
            M::Prompt {
                character_limit,
                default_text,
            } => self.events.push(SessionEvent::Dialog(DialogRequest::Prompt {
                character_limit,
                default_text,
            })),
            M::TextboxResponseAck => self.events.push(SessionEvent::TextboxAcknowledged),

            M::OpenBoard {
                topic,
                color,
                posts,
                open_instantly,
            } => self.events.push(SessionEvent::BoardOpened {
                topic,
                color,
                posts,
                open_instantly,
            }),
            M::PrependPosts { reference, posts } => {
                self.events
                    .push(SessionEvent::BoardPostsPrepended { reference, posts });
            }
            M::AppendPosts { reference, posts } => {
                self.events
                    .push(SessionEvent::BoardPostsAppended { reference, posts });
            }
            M::RemovePost { id } => self.events.push(SessionEvent::BoardPostRemoved { id }),
            M::PostSelectionAck => self.events.push(SessionEvent::PostSelectionAcknowledged),
            M::CloseBoard => self.events.push(SessionEvent::BoardClosed),
            M::ShopInventory(items) => self.events.push(SessionEvent::ShopInventory(items)),
            M::OpenShop { mugshot } => self.events.push(SessionEvent::ShopOpened { mugshot }),

            M::LoadPackage { category, path } => {
                if self.loaded_packages.insert(path.clone()) {
                    self.events.push(SessionEvent::LoadPackage { category, path });
                } else {
                    log::debug!("Package {} already loaded", path);
                }
            }
            M::PackageOffer {
                name,
                id,
                category,
                path,
            } => self.events.push(SessionEvent::PackageOffered {
                name,
                id,
                category,
                path,
            }),
            M::ModWhitelist { path } => self.events.push(SessionEvent::ModWhitelist { path }),
            M::ModBlacklist { path } => self.events.push(SessionEvent::ModBlacklist { path }),
            M::InitiateMob {
                package_path,
                data,
                health,
                base_health,
            } => {
                self.events.push(SessionEvent::MobBattle {
                    package_path,
                    data,
                    health,
                    base_health,
                });
                self.events.push(SessionEvent::Transition(Transition::Push));
            }
            M::InitiatePvp {
                package_path,
                data,
                players,
                health,
                base_health,
            } => {
                self.events.push(SessionEvent::PvpBattle {
                    package_path,
                    data,
                    players,
                    health,
                    base_health,
                });
                self.events.push(SessionEvent::Transition(Transition::Push));
            }

            M::ActorConnected(connected) => self.on_actor_connected(connected, now),
            M::ActorDisconnected { ticket, warp_out } => {
                self.on_actor_disconnected(ticket, warp_out, now)
            }
            M::ActorSetName { ticket, name } => {
                if let Some(actor) = self.actors.get_mut(&ticket) {
                    actor.name = name.clone();
                }
                self.events.push(SessionEvent::ActorRenamed { ticket, name });
            }
            M::ActorMoveTo {
                ticket,
                position,
                heading,
            } => self.on_actor_moved(ticket, position, heading, now),
            M::ActorSetAvatar {
                ticket,
                texture_path,
                animation_path,
            } => {
                if let Some(actor) = self.actors.get_mut(&ticket) {
                    actor.texture_path = texture_path.clone();
                    actor.animation_path = animation_path.clone();
                }
                self.events.push(SessionEvent::ActorAvatar {
                    ticket,
                    texture_path,
                    animation_path,
                });
            }
            M::ActorEmote {
                ticket,
                emote,
                use_custom,
            } => self.events.push(SessionEvent::ActorEmote {
                ticket,
                emote,
                use_custom,
            }),
            M::ActorAnimate {
                ticket,
                state,
                looped,
            } => {
                if let Some(actor) = self.actors.get_mut(&ticket) {
                    actor.animation = Some(state.clone());
                }
                self.events.push(SessionEvent::ActorAnimation {
                    ticket,
                    state,
                    looped,
                });
            }
            M::ActorKeyframes { ticket, keyframes } => {
                let total: f32 = keyframes.iter().map(|k| k.duration.max(0.0)).sum();
                if let Some(actor) = self.actors.get_mut(&ticket) {
                    actor.flags.insert(ActorFlags::KEYFRAMES_ACTIVE);
                    self.keyframe_expiry
                        .insert(ticket.clone(), now + secs(total).min(Duration::from_secs(3600)));
                }
                self.events
                    .push(SessionEvent::ActorKeyframes { ticket, keyframes });
            }
            M::ActorMinimapColor { ticket, color } => {
                if let Some(actor) = self.actors.get_mut(&ticket) {
                    actor.minimap_color = color;
                }
                self.events
                    .push(SessionEvent::ActorMinimapColor { ticket, color });
            }

            M::SynchronizeUpdates | M::EndSynchronization => {
                log::warn!("Synchronization marker inside a synchronized batch");
            }
        }
    }

    fn on_login(
        &mut self,
        ticket: String,
        warp_in: bool,
        position: Vec3,
        heading: Direction,
        now: Instant,
    ) {
        log::info!("Logged in to {} as {}", self.address, ticket);

        // an actor entry for our own ticket would double-draw the player
        if self.actors.remove(&ticket).is_some() {
            self.keyframe_expiry.remove(&ticket);
            self.events.push(SessionEvent::ActorRemoved {
                ticket: ticket.clone(),
            });
        }

        self.ticket = Some(ticket);
        self.player.position = position;
        if heading != Direction::None {
            self.player.heading = heading;
        }

        self.events.push(SessionEvent::PlayerSpawned {
            position,
            heading: self.player.heading,
        });

        if warp_in {
            self.start_player_warp(WarpKind::In, WarpFollowup::None, now);
        }
    }

    /// Sends `ready`; the session counts as connected from here on.
    fn ready(&mut self) {
        self.send(ClientMessage::Ready {
            time_ms: unix_millis(),
        });

        if self.state != ConnectionState::Connected {
            self.state = ConnectionState::Connected;
            let ticket = self.ticket.clone().unwrap_or_default();
            log::info!("Connected to {}", self.address);
            self.events.push(SessionEvent::Connected { ticket });
        }
    }

    fn on_asset_progress(&mut self, result: Result<Option<String>, crate::assets::AssetError>) {
        match result {
            Ok(Some(path)) => {
                let asset_type = self
                    .assets
                    .get(&path)
                    .map(|record| record.asset_type())
                    .unwrap_or_else(|| AssetType::from_extension(&path));
                self.events
                    .push(SessionEvent::AssetReady { path, asset_type });
            }
            Ok(None) => {}
            Err(e) => log::warn!("Asset stream dropped: {}", e),
        }
    }

    fn is_self(&self, ticket: &str) -> bool {
        self.ticket.as_deref() == Some(ticket)
    }

    fn on_actor_connected(&mut self, connected: ActorConnected, now: Instant) {
        if self.is_self(&connected.ticket) {
            log::trace!("Ignoring actor_connected for the local player");
            return;
        }

        let mut actor = RemoteActor::new(
            connected.ticket.clone(),
            connected.position,
            connected.heading,
            now,
            &self.config.sync,
        );
        actor.name = connected.name;
        actor.texture_path = connected.texture_path;
        actor.animation_path = connected.animation_path;
        actor.animation = connected.animation;
        actor.scale = Vec2::new(connected.scale_x, connected.scale_y);
        actor.rotation = connected.rotation;
        actor.minimap_color = connected.minimap_color;
        actor.flags.set(ActorFlags::SOLID, connected.solid);

        let ticket = connected.ticket;
        log::debug!("Actor {} ({}) connected", ticket, actor.name);

        if self.actors.insert(actor).is_some() {
            log::debug!("Actor {} replaced", ticket);
        }
        self.keyframe_expiry.remove(&ticket);
        self.events.push(SessionEvent::ActorAdded {
            ticket: ticket.clone(),
        });

        if connected.warp_in && !self.actors.is_excluded(&ticket) {
            self.actors.start_warp(&ticket, WarpKind::In, now);
            self.events.push(SessionEvent::ActorWarp {
                ticket,
                kind: WarpKind::In,
                position: connected.position,
            });
        }
    }

    fn on_actor_disconnected(&mut self, ticket: String, warp_out: bool, now: Instant) {
        let Some((was_warping, position)) = self
            .actors
            .get(&ticket)
            .map(|actor| (actor.warp.is_some(), actor.tracker.end()))
        else {
            log::debug!("Disconnect for unknown actor {}", ticket);
            return;
        };

        match self.actors.disconnect(&ticket, warp_out, now) {
            Disconnect::Removed => {
                self.keyframe_expiry.remove(&ticket);
                self.events.push(SessionEvent::ActorRemoved { ticket });
            }
            Disconnect::Deferred if !was_warping => {
                self.events.push(SessionEvent::ActorWarp {
                    ticket,
                    kind: WarpKind::Out,
                    position,
                });
            }
            Disconnect::Deferred | Disconnect::Unknown => {}
        }
    }

    fn on_actor_moved(&mut self, ticket: String, position: Vec3, heading: Direction, now: Instant) {
        if self.is_self(&ticket) {
            return;
        }

        let sync = &self.config.sync;
        let Some(actor) = self.actors.get_mut(&ticket) else {
            log::trace!("Move for unknown actor {}", ticket);
            return;
        };

        if actor.flags.contains(ActorFlags::KEYFRAMES_ACTIVE) {
            actor.tracker.force_position(position, now, sync);
            return;
        }

        let BroadcastOutcome::Teleport { from, to } = actor.tracker.push(position, heading, now, sync)
        else {
            return;
        };

        if actor.is_excluded() || actor.warp.is_some() {
            actor.tracker.force_position(to, now, sync);
            return;
        }

        actor.warp = Some(crate::actor::PendingWarp {
            kind: WarpKind::Teleport { to },
            started: now,
        });
        self.events.push(SessionEvent::ActorWarp {
            ticket,
            kind: WarpKind::Teleport { to },
            position: from,
        });
    }
}
