use std::collections::HashSet;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;

use overnet::actor::{Direction, MovementState, WarpKind};
use overnet::assets::AssetType;
use overnet::codec::Color;
use overnet::net::{ACK_SIGNAL, Frame, HEARTBEAT_SIGNAL, Reliability, encode_ack};
use overnet::session::{
    ActorConnected, AvatarUpload, ClientMessage, ConnectionState, DisconnectReason,
    OnlineSession, ServerMessage, SessionConfig, SessionError, SessionEvent, Transition,
    VERSION_ID, VERSION_ITERATION,
};

/// Just enough server to drive a session: answers version requests, acks
/// reliable frames, decodes client signals once each and sends everything
/// else reliable-ordered.
struct FakeServer {
    socket: UdpSocket,
    client: Option<SocketAddr>,
    next_ordered: u64,
    seen: HashSet<(u8, u64)>,
    version_iteration: u64,
    max_payload_size: u16,
}

impl FakeServer {
    fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_nonblocking(true).unwrap();
        Self {
            socket,
            client: None,
            next_ordered: 0,
            seen: HashSet::new(),
            version_iteration: VERSION_ITERATION,
            max_payload_size: 1000,
        }
    }

    fn address(&self) -> String {
        self.socket.local_addr().unwrap().to_string()
    }

    fn send(&mut self, message: ServerMessage) {
        let client = self.client.expect("client has not spoken yet");
        let frame = Frame::encode(
            Reliability::ReliableOrdered,
            self.next_ordered,
            &message.encode(),
        );
        self.next_ordered += 1;
        self.socket.send_to(&frame, client).unwrap();
    }

    fn poll(&mut self) -> Vec<ClientMessage> {
        let mut messages = Vec::new();
        let mut buffer = [0u8; 2048];

        while let Ok((len, from)) = self.socket.recv_from(&mut buffer) {
            self.client = Some(from);
            let frame = Frame::decode(&buffer[..len]).unwrap();

            if matches!(frame.signal(), Some(ACK_SIGNAL | HEARTBEAT_SIGNAL)) {
                continue;
            }
            if frame.reliability.is_reliable() {
                self.socket
                    .send_to(&encode_ack(frame.reliability, frame.id), from)
                    .unwrap();
            }
            if frame.reliability.has_id() && !self.seen.insert((frame.reliability as u8, frame.id))
            {
                continue;
            }

            let message = ClientMessage::decode(frame.body).unwrap();
            if matches!(message, ClientMessage::VersionRequest) {
                let info = ServerMessage::VersionInfo {
                    version_id: VERSION_ID.to_string(),
                    version_iteration: self.version_iteration,
                    max_payload_size: self.max_payload_size,
                };
                let reply = Frame::encode(Reliability::Unreliable, 0, &info.encode());
                self.socket.send_to(&reply, from).unwrap();
            }
            messages.push(message);
        }

        messages
    }
}

#[derive(Default)]
struct Pumped {
    messages: Vec<ClientMessage>,
    events: Vec<SessionEvent>,
}

/// Ticks the session until `done` holds or a second passes.
fn pump_until(
    server: &mut FakeServer,
    session: &mut OnlineSession,
    done: impl Fn(&Pumped, &OnlineSession) -> bool,
) -> Pumped {
    let mut pumped = Pumped::default();
    let start = Instant::now();

    while start.elapsed() < Duration::from_secs(1) {
        let _ = session.update(None);
        pumped.events.extend(session.drain_events());
        pumped.messages.extend(server.poll());

        if done(&pumped, session) {
            return pumped;
        }
        thread::sleep(Duration::from_millis(2));
    }

    panic!(
        "condition not reached; messages {:?}, events {:?}",
        pumped.messages, pumped.events
    );
}

fn config() -> SessionConfig {
    SessionConfig {
        username: "Lan".to_string(),
        identity: "1234".to_string(),
        ..Default::default()
    }
}

fn requested_join(pumped: &Pumped, _: &OnlineSession) -> bool {
    pumped
        .messages
        .iter()
        .any(|m| matches!(m, ClientMessage::RequestJoin))
}

/// Everything the client sent apart from the repeated version requests.
fn without_version_requests(messages: Vec<ClientMessage>) -> Vec<ClientMessage> {
    messages
        .into_iter()
        .filter(|m| !matches!(m, ClientMessage::VersionRequest))
        .collect()
}

/// Answers the join request that `session` already sent.
fn complete_login(server: &mut FakeServer, session: &mut OnlineSession) {
    server.send(ServerMessage::Login {
        ticket: "abc".to_string(),
        warp_in: false,
        position: Vec3::new(2.0, 3.0, 0.0),
        heading: Direction::Down,
    });
    server.send(ServerMessage::ConnectionComplete);

    pump_until(server, session, |_, session| session.is_connected());
}

/// Runs the version check and login through `connection_complete`.
fn connect(server: &mut FakeServer) -> OnlineSession {
    let mut session = OnlineSession::connect(&server.address(), config()).unwrap();
    pump_until(server, &mut session, requested_join);
    complete_login(server, &mut session);
    session
}

#[test]
fn test_login_handshake_and_idle_actor() {
    let mut server = FakeServer::bind();
    let mut session = OnlineSession::connect(&server.address(), config()).unwrap();
    assert_eq!(session.state(), ConnectionState::Connecting);

    let pumped = pump_until(&mut server, &mut session, requested_join);
    assert!(matches!(pumped.messages[0], ClientMessage::VersionRequest));
    assert!(!session.awaiting_version());
    assert_eq!(session.config().processor.max_payload_size, 1000);

    let messages = without_version_requests(pumped.messages);
    assert!(matches!(
        &messages[0],
        ClientMessage::Login { username, identity, .. }
            if username == "Lan" && identity == b"1234"
    ));

    server.send(ServerMessage::Authorize {
        address: "elsewhere:8765".to_string(),
        data: b"token".to_vec(),
    });
    server.send(ServerMessage::Login {
        ticket: "abc".to_string(),
        warp_in: true,
        position: Vec3::new(2.0, 3.0, 0.0),
        heading: Direction::Down,
    });
    server.send(ServerMessage::ConnectionComplete);

    let pumped = pump_until(&mut server, &mut session, |pumped, _| {
        pumped
            .messages
            .iter()
            .any(|m| matches!(m, ClientMessage::Ready { .. }))
    });

    assert!(pumped.messages.iter().any(|m| matches!(
        m,
        ClientMessage::Authorize { origin_address, data, .. }
            if origin_address == session.address() && data == b"token"
    )));
    assert!(pumped.events.contains(&SessionEvent::Connected {
        ticket: "abc".to_string()
    }));
    assert!(pumped.events.contains(&SessionEvent::PlayerWarp {
        kind: WarpKind::In,
        position: Vec3::new(2.0, 3.0, 0.0),
    }));
    assert_eq!(session.ticket(), Some("abc"));

    let spawn = Vec3::new(5.0, 5.0, 0.0);
    server.send(ServerMessage::ActorConnected(ActorConnected {
        ticket: "xyz".to_string(),
        name: "Mayl".to_string(),
        texture_path: "/server/assets/mayl.png".to_string(),
        animation_path: "/server/assets/mayl.animation".to_string(),
        heading: Direction::Down,
        position: spawn,
        solid: true,
        warp_in: false,
        scale_x: 1.0,
        scale_y: 1.0,
        rotation: 0.0,
        minimap_color: Color::WHITE,
        animation: None,
    }));
    pump_until(&mut server, &mut session, |_, session| {
        session.actors().get("xyz").is_some()
    });

    let moved = spawn + Vec3::new(0.1, 0.0, 0.0);
    server.send(ServerMessage::ActorMoveTo {
        ticket: "xyz".to_string(),
        position: moved,
        heading: Direction::Right,
    });
    pump_until(&mut server, &mut session, |_, session| {
        session
            .actors()
            .get("xyz")
            .is_some_and(|actor| actor.tracker.end() == moved)
    });

    // no broadcast for longer than the idle threshold
    session
        .update_at(Instant::now() + Duration::from_millis(1200), None)
        .unwrap();

    let pose = session.poses()["xyz"];
    assert_eq!(pose.movement, MovementState::Idle);
    assert_eq!(pose.position, moved);
    assert_eq!(pose.heading, Direction::Right);
}

#[test]
fn test_asset_stream_completes_across_chunks() {
    let mut server = FakeServer::bind();
    let mut session = connect(&mut server);
    let path = "/server/assets/level.bin";

    server.send(ServerMessage::AssetStreamStart {
        path: path.to_string(),
        last_modified: 7,
        cachable: false,
        asset_type: AssetType::Data,
        size: 1000,
    });
    server.send(ServerMessage::AssetStream {
        bytes: vec![1; 600],
    });
    server.send(ServerMessage::AssetStream {
        bytes: vec![2; 400],
    });

    let pumped = pump_until(&mut server, &mut session, |pumped, _| {
        pumped
            .events
            .iter()
            .any(|e| matches!(e, SessionEvent::AssetReady { .. }))
    });

    assert!(pumped.events.contains(&SessionEvent::AssetReady {
        path: path.to_string(),
        asset_type: AssetType::Data,
    }));

    let data = session.assets().data(path).unwrap();
    assert_eq!(data.len(), 1000);
    assert_eq!(data[599], 1);
    assert_eq!(data[600], 2);
    assert!(session.assets().has_fresh(path, 7));
}

#[test]
fn test_kick_ends_session() {
    let mut server = FakeServer::bind();
    let mut session = connect(&mut server);

    server.send(ServerMessage::Kick {
        reason: "server closing".to_string(),
    });

    let pumped = pump_until(&mut server, &mut session, |_, session| {
        session.state() == ConnectionState::Disconnected
    });

    let tail: Vec<_> = pumped
        .events
        .iter()
        .skip_while(|e| !matches!(e, SessionEvent::Kicked { .. }))
        .cloned()
        .collect();
    assert_eq!(
        tail,
        vec![
            SessionEvent::Kicked {
                reason: "server closing".to_string()
            },
            SessionEvent::Disconnected {
                reason: DisconnectReason::Kicked
            },
            SessionEvent::Transition(Transition::Pop),
        ]
    );

    assert!(matches!(
        session.update(None),
        Err(SessionError::NotConnected)
    ));
}

#[test]
fn test_silent_server_times_out() {
    let server = FakeServer::bind();
    let mut config = config();
    config.processor.timeout_secs = 0.5;
    let mut session = OnlineSession::connect(&server.address(), config).unwrap();

    session
        .update_at(Instant::now() + Duration::from_secs(1), None)
        .unwrap();

    assert_eq!(session.state(), ConnectionState::Disconnected);
    let events = session.drain_events();
    assert_eq!(
        &events[events.len() - 2..],
        &[
            SessionEvent::Disconnected {
                reason: DisconnectReason::TimedOut
            },
            SessionEvent::Transition(Transition::Pop),
        ]
    );
}

#[test]
fn test_failed_transfer_restores_player() {
    let mut server = FakeServer::bind();
    let mut session = connect(&mut server);

    server.send(ServerMessage::TransferServer {
        address: "no such host".to_string(),
        data: String::new(),
        warp_out: false,
    });

    let pumped = pump_until(&mut server, &mut session, |pumped, _| {
        pumped
            .events
            .iter()
            .any(|e| matches!(e, SessionEvent::TransferFailed { .. }))
    });

    assert!(pumped.events.contains(&SessionEvent::PlayerTeleported {
        position: Vec3::new(2.0, 3.0, 0.0),
        heading: Direction::Down,
        warp: false,
    }));
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[test]
fn test_synchronized_batch_applies_together() {
    let mut server = FakeServer::bind();
    let mut session = connect(&mut server);

    server.send(ServerMessage::SynchronizeUpdates);
    server.send(ServerMessage::Health(40));
    server.send(ServerMessage::Money(300));
    server.send(ServerMessage::EndSynchronization);

    let pumped = pump_until(&mut server, &mut session, |_, session| {
        session.player().money == 300
    });

    assert_eq!(session.player().health, 40);
    let changes: Vec<_> = pumped
        .events
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                SessionEvent::HealthChanged(_) | SessionEvent::MoneyChanged(_)
            )
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            SessionEvent::HealthChanged(40),
            SessionEvent::MoneyChanged(300)
        ]
    );
}

#[test]
fn test_newer_server_version_refused() {
    let mut server = FakeServer::bind();
    server.version_iteration = VERSION_ITERATION + 1;
    let mut session = OnlineSession::connect(&server.address(), config()).unwrap();

    let pumped = pump_until(&mut server, &mut session, |_, session| {
        session.state() == ConnectionState::Disconnected
    });

    assert!(pumped.events.contains(&SessionEvent::Disconnected {
        reason: DisconnectReason::VersionMismatch
    }));
    assert!(
        !pumped
            .messages
            .iter()
            .any(|m| matches!(m, ClientMessage::Login { .. }))
    );
}

#[test]
fn test_transfer_logs_in_to_new_server() {
    let mut first = FakeServer::bind();
    let mut second = FakeServer::bind();
    second.max_payload_size = 700;
    let mut session = connect(&mut first);

    first.send(ServerMessage::ActorConnected(ActorConnected {
        ticket: "xyz".to_string(),
        name: "Mayl".to_string(),
        texture_path: String::new(),
        animation_path: String::new(),
        heading: Direction::Down,
        position: Vec3::ZERO,
        solid: true,
        warp_in: false,
        scale_x: 1.0,
        scale_y: 1.0,
        rotation: 0.0,
        minimap_color: Color::WHITE,
        animation: None,
    }));
    pump_until(&mut first, &mut session, |_, session| {
        session.actors().get("xyz").is_some()
    });

    session.set_avatar(AvatarUpload {
        name: "Lan".to_string(),
        element: "elec".to_string(),
        max_health: 100,
        texture: vec![1; 2000],
        animation: vec![2; 300],
        mugshot: None,
    });
    pump_until(&mut first, &mut session, |pumped, _| {
        pumped
            .messages
            .iter()
            .any(|m| matches!(m, ClientMessage::AvatarChange { .. }))
    });

    first.send(ServerMessage::TransferServer {
        address: second.address(),
        data: "area=2".to_string(),
        warp_out: false,
    });

    let pumped = pump_until(&mut second, &mut session, requested_join);
    assert_eq!(session.address(), second.address());
    assert_eq!(session.state(), ConnectionState::Connecting);
    assert!(session.actors().is_empty());
    assert!(pumped.events.contains(&SessionEvent::ActorRemoved {
        ticket: "xyz".to_string()
    }));
    assert_eq!(session.config().processor.max_payload_size, 700);

    let messages = without_version_requests(pumped.messages);
    assert_eq!(messages.len(), 3, "{:?}", messages);
    assert!(matches!(
        &messages[0],
        ClientMessage::Login { username, data, .. } if username == "Lan" && data == "area=2"
    ));
    assert_eq!(
        messages[1],
        ClientMessage::AvatarChange {
            name: "Lan".to_string(),
            element: "elec".to_string(),
            max_health: 100,
        }
    );
    assert!(matches!(messages[2], ClientMessage::RequestJoin));

    complete_login(&mut second, &mut session);
    assert_eq!(session.ticket(), Some("abc"));
}

#[test]
fn test_transfer_warp_reports_transferred_out() {
    let mut server = FakeServer::bind();
    let mut session = connect(&mut server);

    server.send(ServerMessage::TransferWarp);
    let pumped = pump_until(&mut server, &mut session, |pumped, _| {
        pumped
            .events
            .iter()
            .any(|e| matches!(e, SessionEvent::PlayerWarp { .. }))
    });
    assert!(pumped.events.contains(&SessionEvent::PlayerWarp {
        kind: WarpKind::Out,
        position: Vec3::new(2.0, 3.0, 0.0),
    }));
    assert_eq!(session.state(), ConnectionState::Transferring);

    session.finish_player_warp();
    pump_until(&mut server, &mut session, |pumped, _| {
        pumped
            .messages
            .iter()
            .any(|m| matches!(m, ClientMessage::TransferredOut))
    });

    server.send(ServerMessage::TransferStart);
    server.send(ServerMessage::TransferComplete {
        warp_in: false,
        heading: Direction::Up,
    });
    let pumped = pump_until(&mut server, &mut session, |pumped, _| {
        pumped
            .messages
            .iter()
            .any(|m| matches!(m, ClientMessage::Ready { .. }))
    });
    assert!(pumped.messages.iter().all(|m| !matches!(m, ClientMessage::Login { .. })));
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(session.player().heading, Direction::Up);
}
