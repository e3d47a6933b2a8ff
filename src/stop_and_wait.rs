//! Stop-and-Wait ARQ - sender-side state machine
//!
//! Exactly one frame is outstanding at a time. For each message the sender
//! loops over attempts: push the frame through the channel, and if it
//! arrives, push the receiver's acknowledgment back through the same
//! channel. Only when both legs succeed in one attempt is the message
//! delivered and the sequence bit flipped.
//!
//! Loss is decided synchronously by the channel, so there is no
//! retransmission timer: a lost frame, a frame the receiver rejects as
//! corrupted, or a lost ACK is followed by a backoff pause and an immediate
//! resend of the full frame. When the attempt ceiling is reached the sender
//! gives up without that final pause.
//!
//! # Termination
//! Retries are unbounded unless an attempt ceiling is configured. With drop
//! probability `p < 1` a message is delivered with probability 1 (the
//! attempt count is geometric with success probability `(1 - p)^2`); with
//! `p = 1` an unbounded sender never returns.
use std::num::NonZeroU32;
use std::time::Duration;

use log::{debug, info, warn};

use crate::channel::Channel;
use crate::contracts::{Acknowledgment, Frame, SequenceBit, Unit};
use crate::errors::{LinkError, Result};
use crate::pacing::{Backoff, Pacer};
use crate::receiver::FrameReceiver;

/// Where the current attempt stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArqPhase {
    /// No message in progress
    Idle,
    /// Frame handed to the channel, outcome not yet known
    AwaitingFrameDelivery,
    /// Frame accepted by the receiver, ACK on its way back
    AwaitingAckDelivery,
}

/// Sender state, mutated only by [`StopAndWaitArq`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolState {
    /// Bit carried by the current (or next) frame
    pub sequence_bit: SequenceBit,

    /// Attempts made for the current message; reset when a message starts
    pub attempt_count: u32,
}

/// Counters over the lifetime of one sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArqStats {
    /// Frame transmissions, including retransmissions
    pub frames_sent: u64,
    pub frames_lost: u64,
    pub acks_lost: u64,
    /// Frames rejected by the receiver's integrity check
    pub frames_rejected: u64,
    pub retransmissions: u64,
    pub messages_delivered: u64,
}

/// Outcome of one acknowledged message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Bit the message travelled with
    pub sequence_bit: SequenceBit,

    /// Attempts needed, 1 when nothing was lost
    pub attempts: u32,
}

/// Sender configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArqConfig {
    /// Pause after a lost frame or ACK
    pub retransmit_backoff: Backoff,

    /// Simulated wait for the ACK after a frame is delivered
    pub ack_wait: Duration,

    /// Attempt ceiling per message; `None` retries forever
    pub max_attempts: Option<NonZeroU32>,

    /// Carry frames as CRC-protected bytes the channel may corrupt; the
    /// receiver rejects any that fail verification
    pub crc_check: bool,
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self {
            retransmit_backoff: Backoff::default(),
            ack_wait: Duration::from_millis(crate::ACK_WAIT_DELAY_MS),
            max_attempts: None,
            crc_check: true,
        }
    }
}

/// StopAndWaitBuilder - Fluent interface for sender configuration
pub struct StopAndWaitBuilder {
    config: ArqConfig,
}

impl StopAndWaitBuilder {
    /// Create a builder with the defaults: fixed 1000 ms retransmit pacing,
    /// 500 ms ACK wait, unbounded retries, CRC check on
    pub fn new() -> Self {
        Self {
            config: ArqConfig::default(),
        }
    }

    /// Set the retransmission backoff policy
    pub fn with_retransmit_backoff(mut self, backoff: Backoff) -> Self {
        self.config.retransmit_backoff = backoff;
        self
    }

    /// Set the simulated ACK wait in milliseconds
    pub fn with_ack_wait_ms(mut self, ms: u64) -> Self {
        self.config.ack_wait = Duration::from_millis(ms);
        self
    }

    /// Give up after `attempts` attempts per message
    ///
    /// Every message gets at least one transmission, so zero is not
    /// representable.
    pub fn with_max_attempts(mut self, attempts: NonZeroU32) -> Self {
        self.config.max_attempts = Some(attempts);
        self
    }

    /// Retry forever (the default)
    pub fn unbounded(mut self) -> Self {
        self.config.max_attempts = None;
        self
    }

    pub fn with_crc_check(mut self, enable: bool) -> Self {
        self.config.crc_check = enable;
        self
    }

    pub fn config(&self) -> &ArqConfig {
        &self.config
    }

    pub fn build<C: Channel, P: Pacer>(self, channel: C, pacer: P) -> StopAndWaitArq<C, P> {
        StopAndWaitArq {
            state: ProtocolState::default(),
            phase: ArqPhase::Idle,
            config: self.config,
            channel,
            pacer,
            receiver: FrameReceiver::new(),
            stats: ArqStats::default(),
        }
    }
}

impl Default for StopAndWaitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stop-and-Wait sender driving a channel and a receiver peer
pub struct StopAndWaitArq<C: Channel, P: Pacer> {
    state: ProtocolState,
    phase: ArqPhase,
    config: ArqConfig,
    channel: C,
    pacer: P,
    receiver: FrameReceiver,
    stats: ArqStats,
}

impl<C: Channel, P: Pacer> StopAndWaitArq<C, P> {
    /// Sender with the default configuration
    pub fn new(channel: C, pacer: P) -> Self {
        StopAndWaitBuilder::new().build(channel, pacer)
    }

    /// Send one message, blocking until it is acknowledged
    ///
    /// On success the sequence bit has advanced and the report carries the
    /// bit used and the number of attempts.
    ///
    /// # Errors
    /// `RetryLimitExceeded` only when an attempt ceiling is configured and
    /// reached; the sequence bit is then left unchanged so the message can
    /// be retried. Without a ceiling this never returns an error, and never
    /// returns at all on a channel that drops everything.
    pub fn send_data(&mut self, message: &[u8]) -> Result<DeliveryReport> {
        self.state.attempt_count = 0;
        let frame = Frame::new(self.state.sequence_bit, message);

        loop {
            self.state.attempt_count += 1;
            self.stats.frames_sent += 1;
            if self.state.attempt_count > 1 {
                self.stats.retransmissions += 1;
            }

            self.phase = ArqPhase::AwaitingFrameDelivery;
            info!(
                "[stop-and-wait] attempt {} to send frame #{} ({} bytes)",
                self.state.attempt_count,
                frame.sequence_bit(),
                frame.payload().len()
            );

            let ack = match self.deliver_frame(&frame) {
                Some(Ok(ack)) => ack,
                Some(Err(e)) => {
                    self.stats.frames_rejected += 1;
                    debug!(
                        "[stop-and-wait] frame #{} rejected ({}), retransmitting",
                        frame.sequence_bit(),
                        e
                    );
                    self.retry_or_give_up(&frame)?;
                    continue;
                }
                None => {
                    self.stats.frames_lost += 1;
                    debug!("[stop-and-wait] frame #{} lost, retransmitting", frame.sequence_bit());
                    self.retry_or_give_up(&frame)?;
                    continue;
                }
            };
            debug_assert!(ack.acknowledges(&frame));

            self.phase = ArqPhase::AwaitingAckDelivery;
            self.pacer.pause(self.config.ack_wait);

            if !self.channel.transmit(Unit::Ack(&ack)) {
                self.stats.acks_lost += 1;
                debug!("[stop-and-wait] ACK #{} lost, retransmitting frame", ack.sequence_bit());
                self.retry_or_give_up(&frame)?;
                continue;
            }

            info!("[stop-and-wait] ACK received for frame #{}", ack.sequence_bit());
            self.stats.messages_delivered += 1;
            self.state.sequence_bit = self.state.sequence_bit.flipped();
            self.phase = ArqPhase::Idle;

            return Ok(DeliveryReport {
                sequence_bit: frame.sequence_bit(),
                attempts: self.state.attempt_count,
            });
        }
    }

    /// Send messages in order, stopping at the first error
    pub fn send_all<'m, I>(&mut self, messages: I) -> Result<Vec<DeliveryReport>>
    where
        I: IntoIterator<Item = &'m [u8]>,
    {
        messages
            .into_iter()
            .map(|message| self.send_data(message))
            .collect()
    }

    /// Push the frame through the channel and hand it to the receiver
    ///
    /// `None` if the channel lost it, `Some(Err)` if the receiver rejected
    /// the bytes that arrived.
    fn deliver_frame(&mut self, frame: &Frame) -> Option<Result<Acknowledgment>> {
        if !self.config.crc_check {
            if !self.channel.transmit(Unit::Frame(frame)) {
                return None;
            }
            return Some(Ok(self.receiver.on_frame(frame)));
        }

        let mut wire = frame.encode();
        if !self.channel.transmit_bytes(Unit::Frame(frame), &mut wire) {
            return None;
        }
        Some(self.receiver.on_encoded(&wire))
    }

    /// Fail the message if the ceiling is reached, otherwise pause for the
    /// next attempt
    fn retry_or_give_up(&mut self, frame: &Frame) -> Result<()> {
        if let Some(max) = self.config.max_attempts {
            if self.state.attempt_count >= max.get() {
                warn!(
                    "[stop-and-wait] giving up on frame #{} after {} attempts",
                    frame.sequence_bit(),
                    self.state.attempt_count
                );
                self.phase = ArqPhase::Idle;
                return Err(LinkError::RetryLimitExceeded {
                    attempts: self.state.attempt_count,
                });
            }
        }

        let delay = self
            .config
            .retransmit_backoff
            .delay(self.state.attempt_count.saturating_sub(1));
        self.pacer.pause(delay);
        Ok(())
    }

    /// Bit the next frame will carry
    pub fn sequence_bit(&self) -> SequenceBit {
        self.state.sequence_bit
    }

    /// Attempts made for the most recent message
    pub fn attempt_count(&self) -> u32 {
        self.state.attempt_count
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn phase(&self) -> ArqPhase {
        self.phase
    }

    pub fn config(&self) -> &ArqConfig {
        &self.config
    }

    pub fn stats(&self) -> ArqStats {
        self.stats
    }

    pub fn receiver(&self) -> &FrameReceiver {
        &self.receiver
    }

    /// Drain the payloads the receiver has accepted so far
    pub fn take_delivered(&mut self) -> Vec<Vec<u8>> {
        self.receiver.take_delivered()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{LossyChannel, RngSource, ScriptedSource};
    use crate::pacing::{LogicalClock, NoDelay};

    #[test]
    fn test_perfect_channel_single_attempt() {
        let channel = LossyChannel::new(0.0, RngSource::seeded(1)).unwrap();
        let mut arq = StopAndWaitArq::new(channel, NoDelay);

        let mut bits = Vec::new();
        for i in 0..6 {
            let report = arq.send_data(format!("msg {}", i).as_bytes()).unwrap();
            assert_eq!(report.attempts, 1);
            bits.push(report.sequence_bit.as_u8());
        }

        assert_eq!(bits, vec![0, 1, 0, 1, 0, 1]);
        assert_eq!(arq.stats().retransmissions, 0);
        assert_eq!(arq.receiver().delivered().len(), 6);
        assert_eq!(arq.phase(), ArqPhase::Idle);
    }

    #[test]
    fn test_frame_loss_then_delivery() {
        // frame lost, frame delivered, ACK delivered
        let source = ScriptedSource::outcomes([false, true, true]).unwrap();
        let channel = LossyChannel::new(0.5, source).unwrap();
        let mut arq = StopAndWaitArq::new(channel, LogicalClock::new());

        let report = arq.send_data(b"Frame 1: Hello").unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.sequence_bit, SequenceBit::Zero);
        assert_eq!(arq.sequence_bit(), SequenceBit::One);
        assert_eq!(arq.stats().frames_lost, 1);
        assert_eq!(arq.stats().frames_sent, 2);
        // one retransmit pause plus one ACK wait
        assert_eq!(arq.pacer().elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn test_ack_loss_resends_frame_and_receiver_discards_duplicate() {
        // frame ok, ACK lost, frame ok, ACK ok
        let source = ScriptedSource::outcomes([true, false, true, true]).unwrap();
        let channel = LossyChannel::new(0.5, source).unwrap();
        let mut arq = StopAndWaitArq::new(channel, NoDelay);

        let report = arq.send_data(b"Frame 2: World").unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(arq.stats().acks_lost, 1);
        assert_eq!(arq.receiver().delivered().len(), 1);
        assert_eq!(arq.receiver().duplicates(), 1);
    }

    #[test]
    fn test_attempt_count_resets_per_message() {
        let source = ScriptedSource::outcomes([false, false, true, true, true, true]).unwrap();
        let channel = LossyChannel::new(0.5, source).unwrap();
        let mut arq = StopAndWaitArq::new(channel, NoDelay);

        assert_eq!(arq.send_data(b"a").unwrap().attempts, 3);
        assert_eq!(arq.attempt_count(), 3);
        assert_eq!(arq.send_data(b"b").unwrap().attempts, 1);
        assert_eq!(arq.attempt_count(), 1);
    }

    fn ceiling(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_ceiling_on_dead_channel_keeps_sequence_bit() {
        let channel = LossyChannel::new(1.0, RngSource::seeded(9)).unwrap();
        let mut arq = StopAndWaitBuilder::new()
            .with_max_attempts(ceiling(25))
            .build(channel, NoDelay);

        let err = arq.send_data(b"Frame 4: Protocol").unwrap_err();

        assert_eq!(err, LinkError::RetryLimitExceeded { attempts: 25 });
        assert_eq!(arq.sequence_bit(), SequenceBit::Zero);
        assert_eq!(arq.stats().frames_lost, 25);
        assert_eq!(arq.stats().messages_delivered, 0);
        assert!(arq.receiver().delivered().is_empty());
    }

    #[test]
    fn test_ceiling_of_one_sends_once_without_pausing() {
        let channel = LossyChannel::new(1.0, RngSource::seeded(9)).unwrap();
        let mut arq = StopAndWaitBuilder::new()
            .with_max_attempts(ceiling(1))
            .build(channel, LogicalClock::new());

        let err = arq.send_data(b"Frame 1: Hello").unwrap_err();

        assert_eq!(err, LinkError::RetryLimitExceeded { attempts: 1 });
        assert_eq!(arq.stats().frames_sent, 1);
        assert!(arq.pacer().pauses().is_empty());
        assert_eq!(arq.phase(), ArqPhase::Idle);
    }

    #[test]
    fn test_no_backoff_after_final_attempt() {
        let channel = LossyChannel::new(1.0, RngSource::seeded(9)).unwrap();
        let mut arq = StopAndWaitBuilder::new()
            .with_retransmit_backoff(Backoff::exponential(100, 10_000))
            .with_max_attempts(ceiling(3))
            .build(channel, LogicalClock::new());

        arq.send_data(b"x").unwrap_err();

        // pauses between attempts 1-2 and 2-3 only
        assert_eq!(arq.pacer().elapsed(), Duration::from_millis(300));
        assert_eq!(arq.pacer().pauses().len(), 2);
    }

    #[test]
    fn test_zero_ceiling_unrepresentable() {
        assert!(NonZeroU32::new(0).is_none());
        let builder = StopAndWaitBuilder::new().with_max_attempts(ceiling(1));
        assert_eq!(builder.config().max_attempts.map(NonZeroU32::get), Some(1));
    }

    #[test]
    fn test_corrupted_frame_rejected_and_retransmitted() {
        // frame delivered + corrupted mid-payload, then frame and ACK clean
        let source = ScriptedSource::new([0.75, 0.25, 0.5, 0.75, 0.75, 0.75]).unwrap();
        let channel = LossyChannel::new(0.5, source)
            .unwrap()
            .with_corruption(0.5)
            .unwrap();
        let mut arq = StopAndWaitArq::new(channel, NoDelay);

        let report = arq.send_data(b"Frame 1: Hello").unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(arq.stats().frames_rejected, 1);
        assert_eq!(arq.stats().frames_lost, 0);
        assert_eq!(arq.stats().retransmissions, 1);
        assert_eq!(arq.channel().corrupted(), 1);
        assert_eq!(arq.receiver().rejected(), 1);
        assert_eq!(arq.take_delivered(), vec![b"Frame 1: Hello".to_vec()]);
    }

    #[test]
    fn test_frames_bypass_corruption_without_crc_check() {
        // without the byte path the channel never corrupts
        let source = ScriptedSource::new([0.75, 0.75]).unwrap();
        let channel = LossyChannel::new(0.5, source)
            .unwrap()
            .with_corruption(1.0)
            .unwrap();
        let mut arq = StopAndWaitBuilder::new()
            .with_crc_check(false)
            .build(channel, NoDelay);

        assert_eq!(arq.send_data(b"abc").unwrap().attempts, 1);
        assert_eq!(arq.channel().corrupted(), 0);
        assert_eq!(arq.stats().frames_rejected, 0);
    }

    #[test]
    fn test_take_delivered_bounds_receiver_buffer() {
        let channel = LossyChannel::new(0.0, RngSource::seeded(3)).unwrap();
        let mut arq = StopAndWaitArq::new(channel, NoDelay);

        for round in 0..10 {
            arq.send_data(format!("msg {}", round).as_bytes()).unwrap();
            assert_eq!(arq.take_delivered().len(), 1);
            assert!(arq.receiver().delivered().is_empty());
        }
        assert_eq!(arq.receiver().delivered_count(), 10);
    }

    #[test]
    fn test_exponential_backoff_pacing() {
        let source = ScriptedSource::outcomes([false, false, false, true, true]).unwrap();
        let channel = LossyChannel::new(0.5, source).unwrap();
        let mut arq = StopAndWaitBuilder::new()
            .with_retransmit_backoff(Backoff::exponential(100, 10_000))
            .with_ack_wait_ms(0)
            .build(channel, LogicalClock::new());

        arq.send_data(b"x").unwrap();

        let pauses: Vec<u64> = arq
            .pacer()
            .pauses()
            .iter()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(pauses, vec![100, 200, 400, 0]);
    }

    #[test]
    fn test_builder_defaults() {
        let builder = StopAndWaitBuilder::new();
        let config = builder.config();

        assert_eq!(config.max_attempts, None);
        assert_eq!(config.ack_wait, Duration::from_millis(crate::ACK_WAIT_DELAY_MS));
        assert_eq!(config.retransmit_backoff.delay_ms(3), crate::RETRANSMIT_DELAY_MS);
        assert!(config.crc_check);

        let builder = builder.with_max_attempts(ceiling(3)).unbounded();
        assert_eq!(builder.config().max_attempts, None);
    }

    #[test]
    fn test_send_all_collects_reports() {
        let channel = LossyChannel::new(0.0, RngSource::seeded(2)).unwrap();
        let mut arq = StopAndWaitBuilder::new()
            .with_crc_check(false)
            .build(channel, NoDelay);

        let messages: [&[u8]; 3] = [b"one", b"two", b"three"];
        let reports = arq.send_all(messages).unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2].sequence_bit, SequenceBit::Zero);
        assert!(!arq.config().crc_check);
    }
}
