//! Item id generator.
//!
//! Base64url (unpadded) of 8 random bytes, produced by one background task
//! and drained through a bounded channel of capacity 4. Ids are
//! internal identifiers, not security tokens, so a non-cryptographic RNG
//! seeded from wall-clock at process start is sufficient; 64 bits of entropy
//! makes collisions astronomically unlikely over a queue lifetime of weeks.

use base64::Engine as _;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 4;

/// Handle to the id generator. Clone freely; internally just an `mpsc`
/// sender handle shared with nobody (the receiver lives here, consumers call
/// [`IdGenerator::next`]).
pub struct IdGenerator {
    rx: tokio::sync::Mutex<mpsc::Receiver<String>>,
}

impl IdGenerator {
    /// Spawns the background producer and returns a handle to drain it.
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut rng = seed_rng();
            loop {
                let id = generate(&mut rng);
                if tx.send(id).await.is_err() {
                    // No consumers left; stop producing.
                    break;
                }
            }
        });

        Self {
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Draws the next id. Only fails if the background producer has panicked,
    /// which is treated as an internal error by the caller.
    pub async fn next(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }
}

fn seed_rng() -> SmallRng {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    SmallRng::seed_from_u64(nanos)
}

fn generate(rng: &mut SmallRng) -> String {
    let mut bytes = [0u8; 8];
    rng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_url_safe_and_unpadded() {
        let mut rng = seed_rng();
        for _ in 0..100 {
            let id = generate(&mut rng);
            assert!(!id.contains('+'));
            assert!(!id.contains('/'));
            assert!(!id.contains('='));
        }
    }

    #[test]
    fn ids_are_effectively_unique() {
        let mut rng = seed_rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate(&mut rng)));
        }
    }

    #[tokio::test]
    async fn generator_streams_distinct_ids() {
        let gen = IdGenerator::spawn();
        let a = gen.next().await.expect("id");
        let b = gen.next().await.expect("id");
        assert_ne!(a, b);
    }
}
