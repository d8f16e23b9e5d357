use std::time::Instant;

use glam::Vec3;

use super::events::DisconnectReason;
use super::online::{AvatarInfo, OnlineSession};
use super::outbound::{ClientMessage, asset_chunk_size};
use super::types::BattleResults;
use crate::actor::Direction;
use crate::assets::{UploadAssetType, split_chunks};

/// Local avatar files, streamed to the server by
/// [`OnlineSession::set_avatar`].
#[derive(Debug, Clone, Default)]
pub struct AvatarUpload {
    pub name: String,
    pub element: String,
    pub max_health: i32,
    pub texture: Vec<u8>,
    pub animation: Vec<u8>,
    /// `(texture, animation)`
    pub mugshot: Option<(Vec<u8>, Vec<u8>)>,
}

/// Host-side answers to session events, and player actions.
impl OnlineSession {
    pub fn set_player_position(&mut self, position: Vec3, heading: Direction) {
        self.player.position = position;
        if heading != Direction::None {
            self.player.heading = heading;
        }
    }

    /// Streams the avatar files in payload-sized chunks, then announces it.
    pub fn set_avatar(&mut self, avatar: AvatarUpload) {
        let chunk_size = asset_chunk_size(self.config.processor.max_payload_size);

        let mut uploads = vec![
            (UploadAssetType::Texture, &avatar.texture),
            (UploadAssetType::Animation, &avatar.animation),
        ];
        if let Some((texture, animation)) = &avatar.mugshot {
            uploads.push((UploadAssetType::MugshotTexture, texture));
            uploads.push((UploadAssetType::MugshotAnimation, animation));
        }

        for (asset_type, data) in uploads {
            let chunks = split_chunks(data, chunk_size);
            log::debug!(
                "Uploading {:?}: {} bytes in {} chunks",
                asset_type,
                data.len(),
                chunks.len()
            );
            for chunk in chunks {
                self.send(ClientMessage::AssetStream {
                    asset_type,
                    bytes: chunk.to_vec(),
                });
            }
        }

        let info = AvatarInfo {
            name: avatar.name,
            element: avatar.element,
            max_health: avatar.max_health,
        };
        self.send(ClientMessage::AvatarChange {
            name: info.name.clone(),
            element: info.element.clone(),
            max_health: info.max_health,
        });
        self.avatar = Some(info);
    }

    pub fn send_emote(&mut self, emote: u8) {
        self.send(ClientMessage::Emote(emote));
    }

    pub fn interact_with_object(&mut self, object_id: u32, button: u8) {
        self.send(ClientMessage::ObjectInteraction { object_id, button });
    }

    pub fn interact_with_actor(&mut self, ticket: &str, button: u8) {
        self.send(ClientMessage::ActorInteraction {
            ticket: ticket.to_string(),
            button,
        });
    }

    pub fn interact_with_tile(&mut self, position: Vec3, button: u8) {
        self.send(ClientMessage::TileInteraction { position, button });
    }

    /// Closes a message (0), answers a question (1 for yes) or picks a quiz
    /// option by index.
    pub fn respond_textbox(&mut self, response: u8) {
        self.send(ClientMessage::TextboxResponse(response));
    }

    pub fn respond_prompt(&mut self, text: &str) {
        self.send(ClientMessage::PromptResponse(text.to_string()));
    }

    pub fn board_opened(&mut self) {
        self.send(ClientMessage::BoardOpen);
    }

    pub fn close_board(&mut self) {
        self.send(ClientMessage::BoardClose);
    }

    /// Asks for the posts after the ones already shown.
    pub fn request_posts(&mut self) {
        self.send(ClientMessage::PostRequest);
    }

    pub fn select_post(&mut self, id: &str) {
        self.send(ClientMessage::PostSelection { id: id.to_string() });
    }

    pub fn purchase(&mut self, item_name: &str) {
        self.send(ClientMessage::ShopPurchase {
            name: item_name.to_string(),
        });
    }

    pub fn close_shop(&mut self) {
        self.send(ClientMessage::ShopClose);
    }

    pub fn send_battle_results(&mut self, results: BattleResults) {
        self.send(ClientMessage::BattleResults(results));
    }

    /// Records that the host installed an offered package.
    pub fn package_installed(&mut self, id: &str) {
        log::info!("Package {} installed", id);
        self.installed_packages.insert(id.to_string());
    }

    /// Reports that the warp or teleport animation for `ticket` finished.
    pub fn finish_warp(&mut self, ticket: &str) {
        self.complete_actor_warp(ticket, Instant::now());
    }

    /// Reports that the local player's warp animation finished.
    pub fn finish_player_warp(&mut self) {
        self.complete_player_warp();
    }

    /// Stretches resends and stops heartbeats while the host is not in
    /// focus. The connection cannot time out in background.
    pub fn set_background(&mut self, background: bool) {
        self.processor.set_background(background, Instant::now());
    }

    /// Sends `logout` and ends the session.
    pub fn disconnect(&mut self) {
        self.send(ClientMessage::Logout);
        self.end(DisconnectReason::Closed);
    }
}
