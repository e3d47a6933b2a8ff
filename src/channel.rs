//! Channel module - simulated unreliable medium
//!
//! Each transmitted unit, frame or acknowledgment, is an independent
//! Bernoulli trial: lost with probability `p`, delivered otherwise. No state
//! links successive trials, so a retransmission is exactly as likely to be
//! lost as the first attempt.
//!
//! The loss decision draws from an injected [`ProbabilitySource`] rather than
//! a global generator. `p = 0.0` always delivers and `p = 1.0` always drops
//! whatever the source returns.
use std::collections::VecDeque;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::contracts::Unit;
use crate::errors::{LinkError, Result};

/// Source of uniform samples in `[0.0, 1.0)`
pub trait ProbabilitySource {
    fn next_unit(&mut self) -> f64;
}

/// Adapter turning any `rand` generator into a [`ProbabilitySource`]
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Reproducible source for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> ProbabilitySource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when exhausted
///
/// With drop probability `p`, a sample below `p` is a loss. Scripting
/// `[0.0, 0.99]` against `p = 0.5` therefore yields lose, deliver, lose, ...
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    samples: VecDeque<f64>,
}

impl ScriptedSource {
    /// # Errors
    /// `EmptyScript` if `samples` yields nothing.
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Result<Self> {
        let samples: VecDeque<f64> = samples.into_iter().collect();
        if samples.is_empty() {
            return Err(LinkError::EmptyScript);
        }
        Ok(Self { samples })
    }

    /// Script expressed as outcomes: `true` delivers, `false` drops
    ///
    /// Meant for channels with `p = 0.5`.
    pub fn outcomes(delivered: impl IntoIterator<Item = bool>) -> Result<Self> {
        Self::new(
            delivered
                .into_iter()
                .map(|ok| if ok { 0.75 } else { 0.25 }),
        )
    }
}

impl ProbabilitySource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        let sample = self.samples.pop_front().unwrap_or(0.0);
        self.samples.push_back(sample);
        sample
    }
}

/// Medium the ARQ sender pushes frames and acknowledgments through
pub trait Channel {
    /// Returns `true` if `unit` was delivered, `false` if it was lost
    fn transmit(&mut self, unit: Unit<'_>) -> bool;

    /// Carry the encoded form of `unit`; the medium may alter `bytes` in flight
    ///
    /// Defaults to a loss-only medium that leaves the bytes intact.
    fn transmit_bytes(&mut self, unit: Unit<'_>, bytes: &mut [u8]) -> bool {
        let _ = bytes;
        self.transmit(unit)
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn transmit(&mut self, unit: Unit<'_>) -> bool {
        (**self).transmit(unit)
    }

    fn transmit_bytes(&mut self, unit: Unit<'_>, bytes: &mut [u8]) -> bool {
        (**self).transmit_bytes(unit, bytes)
    }
}

/// Independent-loss channel, optionally flipping one bit of delivered bytes
#[derive(Debug, Clone)]
pub struct LossyChannel<S: ProbabilitySource> {
    drop_probability: f64,
    corruption_probability: f64,
    source: S,
    transmitted: u64,
    dropped: u64,
    corrupted: u64,
}

fn check_probability(p: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(LinkError::InvalidDropProbability(p))
    }
}

impl<S: ProbabilitySource> LossyChannel<S> {
    /// Create a channel dropping each unit with `drop_probability`
    ///
    /// # Errors
    /// `InvalidDropProbability` if the value is NaN or outside `[0.0, 1.0]`.
    pub fn new(drop_probability: f64, source: S) -> Result<Self> {
        Ok(Self {
            drop_probability: check_probability(drop_probability)?,
            corruption_probability: 0.0,
            source,
            transmitted: 0,
            dropped: 0,
            corrupted: 0,
        })
    }

    /// Change the drop probability, keeping the source and counters
    pub fn with_probability(mut self, drop_probability: f64) -> Result<Self> {
        self.drop_probability = check_probability(drop_probability)?;
        Ok(self)
    }

    /// Flip one random bit of a delivered byte payload with this probability
    ///
    /// Only encoded frames are exposed to corruption; with the default of
    /// 0.0 no extra samples are drawn.
    pub fn with_corruption(mut self, corruption_probability: f64) -> Result<Self> {
        self.corruption_probability = check_probability(corruption_probability)?;
        Ok(self)
    }

    pub fn drop_probability(&self) -> f64 {
        self.drop_probability
    }

    pub fn corruption_probability(&self) -> f64 {
        self.corruption_probability
    }

    /// Units offered to the channel so far
    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    /// Units lost so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Byte payloads delivered with a flipped bit
    pub fn corrupted(&self) -> u64 {
        self.corrupted
    }

    /// `dropped / transmitted`, or 0.0 before the first transmission
    pub fn observed_drop_rate(&self) -> f64 {
        if self.transmitted == 0 {
            return 0.0;
        }
        self.dropped as f64 / self.transmitted as f64
    }

    /// One Bernoulli trial
    pub fn sample_loss(&mut self) -> bool {
        self.transmitted += 1;
        let lost = self.source.next_unit() < self.drop_probability;
        if lost {
            self.dropped += 1;
        }
        lost
    }

    /// Maybe flip one bit of `bytes`; returns the flipped bit index
    fn maybe_corrupt(&mut self, bytes: &mut [u8]) -> Option<usize> {
        if self.corruption_probability == 0.0 || bytes.is_empty() {
            return None;
        }
        if self.source.next_unit() >= self.corruption_probability {
            return None;
        }

        let bits = bytes.len() * 8;
        let bit = ((self.source.next_unit() * bits as f64) as usize).min(bits - 1);
        bytes[bit / 8] ^= 0x80 >> (bit % 8);
        self.corrupted += 1;
        Some(bit)
    }
}

impl LossyChannel<RngSource<StdRng>> {
    /// Channel with the default drop probability and an entropy-seeded RNG
    pub fn with_default_loss() -> Self {
        Self {
            drop_probability: crate::DEFAULT_DROP_PROBABILITY,
            corruption_probability: 0.0,
            source: RngSource::from_entropy(),
            transmitted: 0,
            dropped: 0,
            corrupted: 0,
        }
    }
}

impl<S: ProbabilitySource> Channel for LossyChannel<S> {
    fn transmit(&mut self, unit: Unit<'_>) -> bool {
        if self.sample_loss() {
            debug!("[channel] {} #{} LOST in transit", unit.kind(), unit.sequence_bit());
            false
        } else {
            debug!("[channel] {} #{} delivered", unit.kind(), unit.sequence_bit());
            true
        }
    }

    fn transmit_bytes(&mut self, unit: Unit<'_>, bytes: &mut [u8]) -> bool {
        if !self.transmit(unit) {
            return false;
        }
        if let Some(bit) = self.maybe_corrupt(bytes) {
            debug!("[channel] {} #{} CORRUPTED at bit {}", unit.kind(), unit.sequence_bit(), bit);
        }
        true
    }
}
