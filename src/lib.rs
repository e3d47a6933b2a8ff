//! dlink core - data-link reliability primitives
//!
//! A CRC-16/CCITT checksum engine and a Stop-and-Wait ARQ sender running
//! over a simulated lossy channel.
//!
//! # Design Principles
//! - Loss is an independent Bernoulli trial per unit, drawn from an
//!   injected probability source
//! - Every delay goes through a mockable pacer
//! - Retries are unbounded by default; an attempt ceiling is opt-in
//! - Frames can cross to the receiver CRC-protected
//!
//! # Modules
//! - [`checksum`] - CRC-CCITT calculate / append / verify
//! - [`contracts`] - frames, acknowledgments, sequence bits
//! - [`channel`] - lossy channel and probability sources
//! - [`pacing`] - delay functions and backoff policy
//! - [`receiver`] - receiver peer with duplicate discard
//! - [`stop_and_wait`] - the ARQ sender state machine
//! - [`simple`] - no-ARQ baseline
//! - [`input`] - parsing for the command-line front end

pub mod channel;
pub mod checksum;
pub mod contracts;
pub mod errors;
pub mod input;
pub mod pacing;
pub mod receiver;
pub mod simple;
pub mod stop_and_wait;

pub use channel::{Channel, LossyChannel, ProbabilitySource, RngSource, ScriptedSource};
pub use checksum::{append_crc, calculate_crc, Crc16, CrcParams, CRC_CCITT};
pub use contracts::{Acknowledgment, Frame, SequenceBit, Unit};
pub use errors::{LinkError, Result};
pub use pacing::{Backoff, LogicalClock, NoDelay, Pacer, ThreadSleep};
pub use receiver::FrameReceiver;
pub use simple::SimpleProtocol;
pub use stop_and_wait::{DeliveryReport, StopAndWaitArq, StopAndWaitBuilder};

/// Default per-unit drop probability of the simulated channel
pub const DEFAULT_DROP_PROBABILITY: f64 = 0.3;

/// Pause after a lost frame or ACK, in milliseconds
pub const RETRANSMIT_DELAY_MS: u64 = 1000;

/// Simulated wait for the ACK after a delivered frame, in milliseconds
pub const ACK_WAIT_DELAY_MS: u64 = 500;

/// Fixed transmission delay of the baseline protocol, in milliseconds
pub const SIMPLE_PROTOCOL_DELAY_MS: u64 = 1000;

/// Backoff multiplier for exponential retransmission pacing
pub const BACKOFF_MULTIPLIER: u64 = 2;
