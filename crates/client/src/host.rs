use overnet::session::{BattleResults, DialogRequest, SessionEvent, Transition};
use overnet::OnlineSession;

/// Stand-in for the overworld scene: no rendering, every request is logged
/// and answered with the default choice straight away.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    pub dialogs_answered: u32,
    pub battles_fled: u32,
    pub leave_requested: bool,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, session: &mut OnlineSession, event: SessionEvent) {
        match event {
            SessionEvent::Connected { ticket } => log::info!("Joined as {}", ticket),
            SessionEvent::Kicked { reason } => log::warn!("Kicked: {}", reason),
            SessionEvent::Disconnected { reason } => {
                log::info!("Disconnected ({})", reason.as_str())
            }
            SessionEvent::Transition(Transition::Pop) => self.leave_requested = true,
            SessionEvent::Transition(Transition::Push) => {}
            SessionEvent::TransferFailed { address, reason } => {
                log::warn!("Transfer to {} failed: {}", address, reason)
            }

            SessionEvent::PlayerWarp { .. } => session.finish_player_warp(),
            SessionEvent::ActorWarp { ticket, .. } => session.finish_warp(&ticket),
            SessionEvent::PlayerSpawned { position, heading }
            | SessionEvent::PlayerTeleported {
                position, heading, ..
            } => {
                log::info!(
                    "Player at ({:.1}, {:.1}, {:.1}) facing {}",
                    position.x,
                    position.y,
                    position.z,
                    heading.as_str()
                );
                session.set_player_position(position, heading);
            }

            SessionEvent::Dialog(request) => {
                self.dialogs_answered += 1;
                match request {
                    DialogRequest::Message { text, .. } => {
                        log::info!("Message: {}", text);
                        session.respond_textbox(0);
                    }
                    DialogRequest::Question { text, .. } => {
                        log::info!("Question: {} (answering no)", text);
                        session.respond_textbox(0);
                    }
                    DialogRequest::Quiz { options, .. } => {
                        log::info!("Quiz: {} (picking the first)", options.join(" / "));
                        session.respond_textbox(0);
                    }
                    DialogRequest::Prompt { default_text, .. } => {
                        session.respond_prompt(default_text.as_deref().unwrap_or_default());
                    }
                }
            }
            SessionEvent::BoardOpened { topic, posts, .. } => {
                log::info!("Board '{}' with {} posts", topic, posts.len());
                session.board_opened();
                session.close_board();
            }
            SessionEvent::ShopOpened { .. } => {
                log::info!("Shop opened");
                session.close_shop();
            }

            SessionEvent::MobBattle { health, .. } | SessionEvent::PvpBattle { health, .. } => {
                log::info!("Battle requested, running away");
                self.battles_fled += 1;
                session.send_battle_results(BattleResults {
                    health,
                    ran: true,
                    ..Default::default()
                });
            }
            SessionEvent::PackageOffered { name, id, .. } => {
                log::info!("Package offered: {} ({}), not installing", name, id)
            }

            SessionEvent::MapChanged { path } => log::info!("Map {}", path),
            SessionEvent::AssetReady { path, asset_type } => {
                log::debug!("Asset ready: {} ({})", path, asset_type.as_str())
            }
            SessionEvent::ActorAdded { ticket } => log::debug!("Actor {} added", ticket),
            SessionEvent::ActorRemoved { ticket } => log::debug!("Actor {} removed", ticket),
            SessionEvent::Camera(command) => log::trace!("Camera {:?}", command),
            other => log::trace!("{:?}", other),
        }
    }
}
