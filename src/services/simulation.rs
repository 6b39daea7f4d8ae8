//! Timer-driven traffic simulation
//!
//! Feeds the orchestrator through the same command channel real triggers
//! use, so the core cannot tell simulated traffic from a live lot. Each tick
//! flips between a fresh arrival and a random exit; arrivals are confirmed
//! after a short delay when auto-confirm is on (a headless lot has no
//! operator to press print).

use crate::infra::config::Config;
use crate::services::orchestrator::Command;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info};

const PLATE_LETTERS: &[&str] = &["أ", "ب", "ج", "د", "هـ", "و", "ز", "ط", "ي", "م", "ن"];
const CITIES: &[&str] = &["بغداد", "البصرة", "أربيل", "النجف", "كربلاء", "نينوى"];

/// Generate a random license plate as `(code, region)`
pub fn random_plate(rng: &mut impl Rng) -> (String, String) {
    let letter = PLATE_LETTERS[rng.gen_range(0..PLATE_LETTERS.len())];
    let number: u32 = rng.gen_range(10000..100000);
    let city = CITIES[rng.gen_range(0..CITIES.len())];
    (format!("{} | {} | {}", city, letter, number), city.to_string())
}

pub struct SimulationDriver {
    cmd_tx: mpsc::Sender<Command>,
    interval_ms: u64,
    auto_confirm: bool,
    confirm_delay_ms: u64,
    rng: StdRng,
}

impl SimulationDriver {
    pub fn new(config: &Config, cmd_tx: mpsc::Sender<Command>) -> Self {
        Self {
            cmd_tx,
            interval_ms: config.simulation_interval_ms(),
            auto_confirm: config.simulation_auto_confirm(),
            confirm_delay_ms: config.simulation_confirm_delay_ms(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Run until shutdown is signalled
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_ms = %self.interval_ms,
            auto_confirm = %self.auto_confirm,
            "simulation_driver_started"
        );
        let mut tick = interval(Duration::from_millis(self.interval_ms.max(1)));
        // The first tick of a tokio interval fires immediately; skip it so
        // the lot does not get traffic before the daemon finishes wiring.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.step().await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("simulation_driver_stopped");
                        break;
                    }
                }
            }
        }
    }

    /// One simulation step: an arrival slightly more often than a departure
    async fn step(&mut self) {
        if self.rng.gen::<f64>() > 0.45 {
            let (plate_code, region) = random_plate(&mut self.rng);
            debug!(plate = %plate_code, "sim_entry");
            let _ = self
                .cmd_tx
                .send(Command::Entry { plate_code, region })
                .await;

            if self.auto_confirm {
                let cmd_tx = self.cmd_tx.clone();
                let delay = Duration::from_millis(self.confirm_delay_ms);
                tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = cmd_tx.send(Command::Confirm { accepted: true }).await;
                });
            }
        } else {
            debug!("sim_exit");
            let _ = self.cmd_tx.send(Command::Exit { plate_code: None }).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_plate_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let (code, region) = random_plate(&mut rng);
            let parts: Vec<&str> = code.split(" | ").collect();
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[0], region);
            assert!(CITIES.contains(&region.as_str()));
            let number: u32 = parts[2].parse().unwrap();
            assert!((10000..100000).contains(&number));
        }
    }

    #[tokio::test]
    async fn test_step_emits_commands() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let mut driver = SimulationDriver {
            cmd_tx,
            interval_ms: 1,
            auto_confirm: false,
            confirm_delay_ms: 0,
            rng: StdRng::seed_from_u64(1),
        };

        for _ in 0..10 {
            driver.step().await;
        }

        let mut received = 0;
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                Command::Entry { plate_code, .. } => assert!(!plate_code.is_empty()),
                Command::Exit { plate_code } => assert!(plate_code.is_none()),
                other => panic!("unexpected command {other:?}"),
            }
            received += 1;
        }
        assert_eq!(received, 10);
    }
}
