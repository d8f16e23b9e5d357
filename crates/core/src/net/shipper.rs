use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::envelope::{Frame, Reliability};

/// A reliable frame still waiting for its ack.
#[derive(Debug, Clone)]
struct BackedUpFrame {
    reliability: Reliability,
    id: u64,
    data: Vec<u8>,
    first_sent: Instant,
    next_retry: Instant,
    attempts: u32,
}

/// Send side of the transport: stamps ids per reliability class and keeps
/// reliable frames around until they are acknowledged.
#[derive(Debug)]
pub struct PacketShipper {
    next_sequenced_id: u64,
    next_reliable_id: u64,
    next_ordered_id: u64,
    backlog: VecDeque<BackedUpFrame>,
    retry_delay: Duration,
    max_retry_delay: Duration,
    srtt: f32,
    rtt_var: f32,
}

impl PacketShipper {
    pub fn new(retry_delay: Duration, max_retry_delay: Duration) -> Self {
        Self {
            next_sequenced_id: 0,
            next_reliable_id: 0,
            next_ordered_id: 0,
            backlog: VecDeque::new(),
            retry_delay,
            max_retry_delay: max_retry_delay.max(retry_delay),
            srtt: 100.0,
            rtt_var: 50.0,
        }
    }

    fn next_id(&mut self, reliability: Reliability) -> u64 {
        let counter = match reliability {
            Reliability::Unreliable => return 0,
            Reliability::UnreliableSequenced => &mut self.next_sequenced_id,
            Reliability::Reliable => &mut self.next_reliable_id,
            Reliability::ReliableOrdered => &mut self.next_ordered_id,
        };
        let id = *counter;
        *counter += 1;
        id
    }

    /// Wraps `body` in a frame ready for the socket. Reliable classes are
    /// retained for resending.
    pub fn ship(&mut self, reliability: Reliability, body: &[u8], now: Instant) -> Vec<u8> {
        let id = self.next_id(reliability);
        let data = Frame::encode(reliability, id, body);

        if reliability.is_reliable() {
            self.backlog.push_back(BackedUpFrame {
                reliability,
                id,
                data: data.clone(),
                first_sent: now,
                next_retry: now + self.retry_delay,
                attempts: 0,
            });
        }

        data
    }

    /// Frames whose retry deadline has passed. Each resend doubles that
    /// frame's delay up to the configured ceiling; `stretch` scales it
    /// further while the app is backgrounded.
    pub fn collect_resends(&mut self, now: Instant, stretch: f32) -> Vec<Vec<u8>> {
        let stretch = stretch.max(1.0);
        let mut resends = Vec::new();

        for frame in &mut self.backlog {
            if frame.next_retry > now {
                continue;
            }

            frame.attempts += 1;
            let backoff = self
                .retry_delay
                .saturating_mul(1u32 << frame.attempts.min(16))
                .min(self.max_retry_delay);
            frame.next_retry = now + backoff.mul_f32(stretch);
            resends.push(frame.data.clone());
        }

        resends
    }

    /// Removes the acknowledged frame. Returns false for unknown or
    /// duplicate acks.
    pub fn acknowledge(&mut self, reliability: Reliability, id: u64, now: Instant) -> bool {
        let Some(index) = self
            .backlog
            .iter()
            .position(|f| f.reliability == reliability && f.id == id)
        else {
            return false;
        };

        if let Some(frame) = self.backlog.remove(index) {
            // resent frames give ambiguous samples
            if frame.attempts == 0 {
                let rtt = now.saturating_duration_since(frame.first_sent).as_secs_f32() * 1000.0;
                self.update_rtt(rtt);
            }
        }
        true
    }

    fn update_rtt(&mut self, rtt: f32) {
        const ALPHA: f32 = 0.125;
        const BETA: f32 = 0.25;

        let diff = (rtt - self.srtt).abs();
        self.rtt_var = (1.0 - BETA) * self.rtt_var + BETA * diff;
        self.srtt = (1.0 - ALPHA) * self.srtt + ALPHA * rtt;
    }

    pub fn srtt(&self) -> f32 {
        self.srtt
    }

    pub fn rtt_var(&self) -> f32 {
        self.rtt_var
    }

    pub fn unacked_count(&self) -> usize {
        self.backlog.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipper() -> PacketShipper {
        PacketShipper::new(Duration::from_millis(50), Duration::from_millis(400))
    }

    #[test]
    fn test_ids_are_per_class() {
        let mut shipper = shipper();
        let now = Instant::now();

        let a = shipper.ship(Reliability::Reliable, &[], now);
        let b = shipper.ship(Reliability::ReliableOrdered, &[], now);
        let c = shipper.ship(Reliability::Reliable, &[], now);

        assert_eq!(Frame::decode(&a).unwrap().id, 0);
        assert_eq!(Frame::decode(&b).unwrap().id, 0);
        assert_eq!(Frame::decode(&c).unwrap().id, 1);
    }

    #[test]
    fn test_only_reliable_frames_are_retained() {
        let mut shipper = shipper();
        let now = Instant::now();

        shipper.ship(Reliability::Unreliable, &[1], now);
        shipper.ship(Reliability::UnreliableSequenced, &[2], now);
        shipper.ship(Reliability::Reliable, &[3], now);
        shipper.ship(Reliability::ReliableOrdered, &[4], now);

        assert_eq!(shipper.unacked_count(), 2);
    }

    #[test]
    fn test_resend_backs_off_until_acked() {
        let mut shipper = shipper();
        let start = Instant::now();
        shipper.ship(Reliability::Reliable, &[7], start);

        assert!(shipper.collect_resends(start, 1.0).is_empty());

        let t1 = start + Duration::from_millis(50);
        assert_eq!(shipper.collect_resends(t1, 1.0).len(), 1);
        // next retry is 100ms out
        assert!(shipper.collect_resends(t1 + Duration::from_millis(60), 1.0).is_empty());
        let t2 = t1 + Duration::from_millis(100);
        assert_eq!(shipper.collect_resends(t2, 1.0).len(), 1);

        assert!(shipper.acknowledge(Reliability::Reliable, 0, t2));
        assert!(!shipper.acknowledge(Reliability::Reliable, 0, t2));
        assert!(shipper.collect_resends(t2 + Duration::from_secs(5), 1.0).is_empty());
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut shipper = shipper();
        let mut now = Instant::now();
        shipper.ship(Reliability::ReliableOrdered, &[], now);

        for _ in 0..10 {
            now += Duration::from_millis(400);
            assert_eq!(shipper.collect_resends(now, 1.0).len(), 1);
        }
    }

    #[test]
    fn test_background_stretches_delay() {
        let mut shipper = shipper();
        let start = Instant::now();
        shipper.ship(Reliability::Reliable, &[], start);

        let t1 = start + Duration::from_millis(50);
        assert_eq!(shipper.collect_resends(t1, 4.0).len(), 1);
        assert!(shipper.collect_resends(t1 + Duration::from_millis(300), 4.0).is_empty());
        assert_eq!(shipper.collect_resends(t1 + Duration::from_millis(400), 4.0).len(), 1);
    }

    #[test]
    fn test_ack_of_other_class_ignored() {
        let mut shipper = shipper();
        let now = Instant::now();
        shipper.ship(Reliability::Reliable, &[], now);

        assert!(!shipper.acknowledge(Reliability::ReliableOrdered, 0, now));
        assert_eq!(shipper.unacked_count(), 1);
    }

    #[test]
    fn test_ack_updates_rtt() {
        let mut shipper = shipper();
        let start = Instant::now();
        shipper.ship(Reliability::Reliable, &[], start);

        shipper.acknowledge(Reliability::Reliable, 0, start + Duration::from_millis(20));

        assert!(shipper.srtt() < 100.0);
        assert!(shipper.srtt() > 20.0);
    }
}
