//! Deterministic RNG streams segregated by engine.
use std::hash::Hasher;

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use twox_hash::XxHash64;

/// Independent `work` and `lottery` streams for one command invocation.
#[derive(Debug, Clone)]
pub struct RngBundle {
    work: CountingRng<SmallRng>,
    lottery: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a run-wide seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            work: CountingRng::new(derive_stream_seed(seed, b"work")),
            lottery: CountingRng::new(derive_stream_seed(seed, b"lottery")),
        }
    }

    /// Streams for one player at one record revision, so replaying a run
    /// against the same store contents reproduces every roll.
    #[must_use]
    pub fn for_player(seed: u64, user_id: &str, revision: u64) -> Self {
        Self::from_seed(player_seed(seed, user_id, revision))
    }

    pub fn work(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.work
    }

    pub fn lottery(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.lottery
    }
}

/// Counting wrapper for RNG streams.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn player_seed(seed: u64, user_id: &str, revision: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(user_id.as_bytes());
    hasher.write_u64(revision);
    hasher.finish()
}

fn derive_stream_seed(seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length; the fallback is unreachable.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()) else {
        return seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
