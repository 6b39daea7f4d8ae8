//! Plate detection source
//!
//! The recognizer itself (camera capture, inference) lives outside this
//! process; the core only asks "do you have a new reading". The simulated
//! source stands in for the real pipeline and produces digit strings with
//! noisy confidence, including the malformed reads a real recognizer emits.

use crate::domain::types::DetectionEvent;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[async_trait]
pub trait DetectionSource: Send {
    /// Next reading, if the recognizer produced one since the last poll
    async fn poll(&mut self) -> Option<DetectionEvent>;
}

/// Simulated recognizer output
pub struct SimulatedCamera {
    rng: StdRng,
    /// Chance per poll that a vehicle is in frame at all
    hit_rate: f64,
}

impl SimulatedCamera {
    pub fn new(hit_rate: f64) -> Self {
        Self { rng: StdRng::from_entropy(), hit_rate }
    }

    #[cfg(test)]
    fn with_seed(seed: u64, hit_rate: f64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), hit_rate }
    }

    fn synth_reading(&mut self) -> DetectionEvent {
        // Known province prefixes weighted towards Baghdad, like real traffic
        const PREFIXES: &[&str] = &["11", "12", "13", "21", "31", "41", "51", "61"];
        let prefix = PREFIXES[self.rng.gen_range(0..PREFIXES.len())];
        let number: u32 = self.rng.gen_range(10000..100000);

        // A slice of reads come back mangled, as from a real CRNN
        let text = if self.rng.gen_bool(0.1) {
            format!("{}*{}", prefix, number % 100)
        } else {
            format!("{}{}", prefix, number)
        };

        let confidence: f64 = self.rng.gen_range(0.2..1.0);
        let x = self.rng.gen_range(0.0..1200.0);
        let y = self.rng.gen_range(0.0..600.0);

        DetectionEvent { text, confidence, bbox: [x, y, 160.0, 48.0] }
    }
}

#[async_trait]
impl DetectionSource for SimulatedCamera {
    async fn poll(&mut self) -> Option<DetectionEvent> {
        if self.rng.gen_bool(self.hit_rate) {
            Some(self.synth_reading())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_rate_zero_never_yields() {
        let mut camera = SimulatedCamera::with_seed(7, 0.0);
        for _ in 0..20 {
            assert!(camera.poll().await.is_none());
        }
    }

    #[tokio::test]
    async fn test_readings_are_plausible() {
        let mut camera = SimulatedCamera::with_seed(7, 1.0);
        for _ in 0..50 {
            let event = camera.poll().await.unwrap();
            assert!(!event.text.is_empty());
            assert!((0.0..=1.0).contains(&event.confidence));
            assert!(event.bbox[2] > 0.0 && event.bbox[3] > 0.0);
        }
    }
}
