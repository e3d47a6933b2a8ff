use std::mem;

use log::{debug, warn};

use crate::contracts::{Acknowledgment, Frame, SequenceBit};
use crate::errors::Result;

pub struct FrameReceiver {
    expected: SequenceBit,
    delivered: Vec<Vec<u8>>,
    delivered_count: u64,
    duplicates: u64,
    rejected: u64,
}

impl FrameReceiver {
    pub fn new() -> Self {
        ReceiverBuilder::new().build()
    }

    pub fn expected(&self) -> SequenceBit {
        self.expected
    }

    /// Payloads accepted since the last [`take_delivered`](Self::take_delivered)
    pub fn delivered(&self) -> &[Vec<u8>] {
        &self.delivered
    }

    /// Hand over the accepted payloads, leaving the buffer empty
    ///
    /// Long-running senders drain this periodically; the running total
    /// stays in [`delivered_count`](Self::delivered_count).
    pub fn take_delivered(&mut self) -> Vec<Vec<u8>> {
        mem::take(&mut self.delivered)
    }

    /// Payloads accepted over the receiver's lifetime
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn on_frame(&mut self, frame: &Frame) -> Acknowledgment {
        if frame.sequence_bit() == self.expected {
            debug!("[receiver] frame #{} received correctly", frame.sequence_bit());
            self.delivered.push(frame.payload().to_vec());
            self.delivered_count += 1;
            self.expected = self.expected.flipped();
        } else {
            debug!("[receiver] duplicate frame #{} discarded", frame.sequence_bit());
            self.duplicates += 1;
        }

        frame.acknowledgment()
    }

    pub fn on_encoded(&mut self, bytes: &[u8]) -> Result<Acknowledgment> {
        match Frame::decode(bytes) {
            Ok(frame) => Ok(self.on_frame(&frame)),
            Err(e) => {
                warn!("[receiver] rejected frame: {}", e);
                self.rejected += 1;
                Err(e)
            }
        }
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ReceiverBuilder {
    initial_expected: SequenceBit,
}

impl ReceiverBuilder {
    pub fn new() -> Self {
        Self {
            initial_expected: SequenceBit::Zero,
        }
    }

    pub fn with_initial_expected(mut self, bit: SequenceBit) -> Self {
        self.initial_expected = bit;
        self
    }

    pub fn get_initial_expected(&self) -> SequenceBit {
        self.initial_expected
    }

    pub fn build(self) -> FrameReceiver {
        FrameReceiver {
            expected: self.initial_expected,
            delivered: Vec::new(),
            delivered_count: 0,
            duplicates: 0,
            rejected: 0,
        }
    }
}

impl Default for ReceiverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
