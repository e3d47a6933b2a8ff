//! Simple protocol - baseline with no ARQ logic
//!
//! Every frame "succeeds": send, pause a fixed delay, report the ACK.
//! There is no channel, no loss and no sequence state, which is the point
//! of comparison with [`crate::stop_and_wait`].
use std::time::Duration;

use log::info;

use crate::contracts::SequenceBit;
use crate::pacing::Pacer;
use crate::stop_and_wait::DeliveryReport;

pub struct SimpleProtocol<P: Pacer> {
    pacer: P,
    delay: Duration,
    frames_sent: u64,
}

impl<P: Pacer> SimpleProtocol<P> {
    /// Baseline with the default transmission delay
    pub fn new(pacer: P) -> Self {
        Self::with_delay_ms(pacer, crate::SIMPLE_PROTOCOL_DELAY_MS)
    }

    pub fn with_delay_ms(pacer: P, delay_ms: u64) -> Self {
        Self {
            pacer,
            delay: Duration::from_millis(delay_ms),
            frames_sent: 0,
        }
    }

    /// Send one frame; always acknowledged after one attempt
    pub fn send_frame(&mut self, message: &[u8]) -> DeliveryReport {
        info!("[simple] sending frame ({} bytes)", message.len());
        self.pacer.pause(self.delay);
        self.frames_sent += 1;
        info!("[simple] ACK received, sending next frame");

        DeliveryReport {
            sequence_bit: SequenceBit::Zero,
            attempts: 1,
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::LogicalClock;

    #[test]
    fn test_always_succeeds_with_fixed_delay() {
        let mut simple = SimpleProtocol::new(LogicalClock::new());

        let messages: [&[u8]; 2] = [b"Frame 1: Hello", b"Frame 2: World"];
        for msg in messages {
            assert_eq!(simple.send_frame(msg).attempts, 1);
        }

        assert_eq!(simple.frames_sent(), 2);
        assert_eq!(
            simple.pacer().elapsed(),
            Duration::from_millis(2 * crate::SIMPLE_PROTOCOL_DELAY_MS)
        );
    }
}
