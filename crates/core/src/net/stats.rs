use serde::Deserialize;

/// Drops outgoing datagrams at random, for exercising resend paths.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LossSimulation {
    pub enabled: bool,
    /// 0-100
    pub loss_percent: f32,
}

impl LossSimulation {
    pub fn new(loss_percent: f32) -> Self {
        Self {
            enabled: loss_percent > 0.0,
            loss_percent: loss_percent.clamp(0.0, 100.0),
        }
    }

    pub fn should_drop(&self) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        self.loss_percent >= 100.0 || rand_percent() * 100.0 < self.loss_percent
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_resent: u64,
    pub packets_dropped: u64,
    pub malformed_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub pending_reliable: usize,
    pub rtt_ms: f32,
    pub rtt_variance: f32,
    pub packet_loss_percent: f32,
}

impl NetworkStats {
    pub fn refresh_loss(&mut self) {
        self.packet_loss_percent = if self.packets_sent == 0 {
            0.0
        } else {
            self.packets_resent as f32 / self.packets_sent as f32 * 100.0
        };
    }
}

pub fn rand_percent() -> f32 {
    rand_u64() as f32 / u64::MAX as f32
}

pub fn rand_u64() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::time::Instant;

    let mut hasher = RandomState::new().build_hasher();
    std::hash::Hash::hash(&Instant::now(), &mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_simulation_never_drops() {
        let sim = LossSimulation::default();
        assert!((0..100).all(|_| !sim.should_drop()));
    }

    #[test]
    fn test_full_loss_always_drops() {
        let sim = LossSimulation::new(100.0);
        assert!((0..100).all(|_| sim.should_drop()));
    }

    #[test]
    fn test_loss_percent_from_resends() {
        let mut stats = NetworkStats {
            packets_sent: 200,
            packets_resent: 10,
            ..Default::default()
        };
        stats.refresh_loss();
        assert!((stats.packet_loss_percent - 5.0).abs() < f32::EPSILON);
    }
}
