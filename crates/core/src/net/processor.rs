use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use super::config::ProcessorConfig;
use super::envelope::{
    ACK_SIGNAL, FRAME_HEADER_SIZE, Frame, HEARTBEAT_SIGNAL, MAX_DATAGRAM_SIZE, Reliability,
    decode_ack, encode_ack, encode_heartbeat, peek_signal,
};
use super::shipper::PacketShipper;
use super::sorter::PacketSorter;
use super::stats::NetworkStats;

/// One reliable link to one remote address over a non-blocking UDP socket.
///
/// Everything is poll-driven: [`receive`](Self::receive) drains whatever the
/// socket holds right now and [`update`](Self::update) runs resends and
/// heartbeats. Nothing here blocks.
pub struct PacketProcessor {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    config: ProcessorConfig,
    shipper: PacketShipper,
    sorter: PacketSorter,
    stats: NetworkStats,
    recv_buffer: Box<[u8]>,
    last_receive_time: Instant,
    last_send_time: Instant,
    background: bool,
}

impl PacketProcessor {
    /// Resolves `remote` and binds an ephemeral local port of the same family.
    pub fn connect<A: ToSocketAddrs>(remote: A, config: ProcessorConfig) -> io::Result<Self> {
        let remote_addr = remote.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")
        })?;

        let local: SocketAddr = if remote_addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        Self::bind(local, remote_addr, config)
    }

    pub fn bind<A: ToSocketAddrs>(
        local: A,
        remote_addr: SocketAddr,
        config: ProcessorConfig,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;
        let now = Instant::now();

        log::debug!("Packet processor bound {} -> {}", local_addr, remote_addr);

        Ok(Self {
            socket,
            local_addr,
            remote_addr,
            shipper: PacketShipper::new(config.retry_delay(), config.max_retry_delay()),
            sorter: PacketSorter::new(),
            stats: NetworkStats::default(),
            recv_buffer: vec![0u8; MAX_DATAGRAM_SIZE].into_boxed_slice(),
            last_receive_time: now,
            last_send_time: now,
            background: false,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Adopts the payload limit the server announced.
    pub fn set_max_payload_size(&mut self, size: usize) {
        self.config.max_payload_size = size;
    }

    /// Room left for a signal body once the envelope is added.
    pub fn max_body_size(&self) -> usize {
        self.config
            .max_payload_size
            .saturating_sub(FRAME_HEADER_SIZE)
    }

    pub fn send(&mut self, reliability: Reliability, body: &[u8]) {
        self.send_at(reliability, body, Instant::now());
    }

    pub fn send_at(&mut self, reliability: Reliability, body: &[u8], now: Instant) {
        let data = self.shipper.ship(reliability, body, now);
        self.stats.pending_reliable = self.shipper.unacked_count();
        self.transmit(&data, now);
    }

    /// Send failures are logged and otherwise ignored; a dead link surfaces
    /// through [`timed_out`](Self::timed_out).
    fn transmit(&mut self, data: &[u8], now: Instant) {
        self.last_send_time = now;
        self.stats.packets_sent += 1;

        if self
            .config
            .loss_simulation
            .as_ref()
            .is_some_and(|sim| sim.should_drop())
        {
            self.stats.packets_dropped += 1;
            return;
        }

        match self.socket.send_to(data, self.remote_addr) {
            Ok(bytes) => self.stats.bytes_sent += bytes as u64,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                log::debug!("Socket busy, frame left to the resend path");
            }
            Err(e) => log::warn!("Send to {} failed: {}", self.remote_addr, e),
        }
    }

    /// Drains every datagram currently queued on the socket and returns the
    /// signal bodies ready for dispatch, in delivery order.
    pub fn receive(&mut self, now: Instant) -> Vec<Vec<u8>> {
        let mut bodies = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, addr)) => {
                    if addr != self.remote_addr {
                        log::debug!("Ignoring datagram from unknown peer {}", addr);
                        continue;
                    }
                    let data = self.recv_buffer[..size].to_vec();
                    bodies.extend(self.handle_datagram(&data, now));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("Receive from {} failed: {}", self.remote_addr, e);
                    break;
                }
            }
        }

        bodies
    }

    /// Feeds one raw datagram through the sorter. Acks and heartbeats are
    /// consumed here and never returned.
    pub fn handle_datagram(&mut self, data: &[u8], now: Instant) -> Vec<Vec<u8>> {
        if self
            .config
            .loss_simulation
            .as_ref()
            .is_some_and(|sim| sim.should_drop())
        {
            self.stats.packets_dropped += 1;
            return Vec::new();
        }

        let frame = match Frame::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.malformed_received += 1;
                log::warn!("Dropping malformed datagram ({} bytes): {}", data.len(), e);
                return Vec::new();
            }
        };

        self.stats.packets_received += 1;
        self.stats.bytes_received += data.len() as u64;
        self.last_receive_time = now;

        let sorted = self.sorter.sort(frame);
        if let Some((reliability, id)) = sorted.ack {
            let ack = encode_ack(reliability, id);
            self.transmit(&ack, now);
        }

        let mut bodies = Vec::with_capacity(sorted.bodies.len());
        for body in sorted.bodies {
            match peek_signal(&body) {
                Some(ACK_SIGNAL) => self.handle_ack(&body, now),
                Some(HEARTBEAT_SIGNAL) => {}
                _ => bodies.push(body),
            }
        }
        bodies
    }

    fn handle_ack(&mut self, body: &[u8], now: Instant) {
        match decode_ack(body) {
            Ok((reliability, id)) => {
                if !self.shipper.acknowledge(reliability, id, now) {
                    log::trace!("Duplicate ack for {} #{}", reliability.as_str(), id);
                }
                self.stats.pending_reliable = self.shipper.unacked_count();
                self.stats.rtt_ms = self.shipper.srtt();
                self.stats.rtt_variance = self.shipper.rtt_var();
            }
            Err(e) => {
                self.stats.malformed_received += 1;
                log::warn!("Dropping malformed ack: {}", e);
            }
        }
    }

    /// Resends overdue reliable frames and keeps the link alive.
    pub fn update(&mut self, now: Instant) {
        let stretch = if self.background {
            self.config.background_retry_factor
        } else {
            1.0
        };

        let resends = self.shipper.collect_resends(now, stretch);
        if !resends.is_empty() {
            log::debug!("Resending {} reliable frames", resends.len());
        }
        for data in resends {
            self.stats.packets_resent += 1;
            self.transmit(&data, now);
        }

        if !self.background
            && now.saturating_duration_since(self.last_send_time) >= self.config.heartbeat_interval()
        {
            self.transmit(&encode_heartbeat(), now);
        }

        self.stats.refresh_loss();
    }

    /// Never true while backgrounded; a suspended app is not a dead link.
    pub fn timed_out(&self, now: Instant) -> bool {
        !self.background && self.silence(now) > self.config.timeout()
    }

    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_receive_time)
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Only changes the resend/heartbeat pace. Sequence state is kept.
    pub fn set_background(&mut self, background: bool, now: Instant) {
        if self.background == background {
            return;
        }
        self.background = background;
        if !background {
            // the remote could not be heard while suspended
            self.last_receive_time = now;
        }
        log::debug!(
            "Packet processor moved to {}",
            if background { "background" } else { "foreground" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (PacketProcessor, UdpSocket) {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.set_nonblocking(true).unwrap();
        let processor = PacketProcessor::bind(
            "127.0.0.1:0",
            peer.local_addr().unwrap(),
            ProcessorConfig::default(),
        )
        .unwrap();
        (processor, peer)
    }

    fn recv_all(peer: &UdpSocket) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 2048];
        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            match peer.recv_from(&mut buf) {
                Ok((size, _)) => out.push(buf[..size].to_vec()),
                Err(_) if !out.is_empty() => break,
                Err(_) => std::thread::sleep(Duration::from_millis(1)),
            }
        }
        out
    }

    #[test]
    fn test_reliable_frame_is_acked() {
        let (mut processor, peer) = pair();
        let now = Instant::now();

        let body = [9u8, 0, 1, 2];
        let frame = Frame::encode(Reliability::Reliable, 0, &body);
        let bodies = processor.handle_datagram(&frame, now);
        assert_eq!(bodies, vec![body.to_vec()]);

        let sent = recv_all(&peer);
        let ack = Frame::decode(&sent[0]).unwrap();
        assert_eq!(ack.signal(), Some(ACK_SIGNAL));
        assert_eq!(decode_ack(ack.body), Ok((Reliability::Reliable, 0)));
    }

    #[test]
    fn test_transport_signals_not_returned() {
        let (mut processor, _peer) = pair();
        let now = Instant::now();

        assert!(processor.handle_datagram(&encode_heartbeat(), now).is_empty());
        assert!(
            processor
                .handle_datagram(&encode_ack(Reliability::Reliable, 3), now)
                .is_empty()
        );
    }

    #[test]
    fn test_malformed_datagram_counted_and_dropped() {
        let (mut processor, _peer) = pair();
        let start = processor.last_receive_time;

        assert!(processor.handle_datagram(&[7, 1, 2], Instant::now()).is_empty());
        assert_eq!(processor.stats().malformed_received, 1);
        assert_eq!(processor.last_receive_time, start);
    }

    #[test]
    fn test_ack_clears_pending() {
        let (mut processor, _peer) = pair();
        let now = Instant::now();

        processor.send_at(Reliability::ReliableOrdered, &[5, 0], now);
        assert_eq!(processor.stats().pending_reliable, 1);

        processor.handle_datagram(&encode_ack(Reliability::ReliableOrdered, 0), now);
        assert_eq!(processor.stats().pending_reliable, 0);
    }

    #[test]
    fn test_timeout_and_background() {
        let (mut processor, _peer) = pair();
        let start = Instant::now();
        processor.last_receive_time = start;
        let late = start + Duration::from_secs(16);

        assert!(processor.timed_out(late));

        processor.set_background(true, late);
        assert!(!processor.timed_out(late + Duration::from_secs(60)));

        let back = late + Duration::from_secs(61);
        processor.set_background(false, back);
        assert!(!processor.timed_out(back + Duration::from_secs(1)));
    }

    #[test]
    fn test_heartbeat_after_silence() {
        let (mut processor, peer) = pair();
        let start = processor.last_send_time;

        processor.update(start + Duration::from_millis(500));
        processor.update(start + Duration::from_millis(1100));

        let sent = recv_all(&peer);
        assert_eq!(sent.len(), 1);
        assert_eq!(Frame::decode(&sent[0]).unwrap().signal(), Some(HEARTBEAT_SIGNAL));
    }
}
