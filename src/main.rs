//! Entry point for `dlink`.
//!
//! Parses CLI arguments and dispatches to the checksum engine or one of the
//! protocol simulations. `main.rs` owns only process setup and console
//! output; set `RUST_LOG` to control protocol trace verbosity.

use std::num::NonZeroU32;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::error;

use dlink_core::checksum::{calculate_crc, check_with_crc};
use dlink_core::input::{binary_string_to_bytes, parse_crc_hex};
use dlink_core::{
    LossyChannel, NoDelay, Pacer, Result, RngSource, SimpleProtocol, StopAndWaitBuilder,
    ThreadSleep,
};

const DEMO_MESSAGES: [&str; 4] = [
    "Frame 1: Hello",
    "Frame 2: World",
    "Frame 3: Stop-and-Wait",
    "Frame 4: Protocol",
];

/// CRC-CCITT checksums and Stop-and-Wait ARQ over a lossy channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate the CRC-CCITT (16-bit) of the input.
    Crc {
        /// Text, or a string of 0s and 1s with --binary.
        data: String,
        /// Treat DATA as a binary string (e.g. 11001010).
        #[arg(short, long)]
        binary: bool,
    },
    /// Verify the input against a given CRC.
    Verify {
        /// Text, or a string of 0s and 1s with --binary.
        data: String,
        /// Expected CRC in hex (e.g. 29B1).
        crc: String,
        #[arg(short, long)]
        binary: bool,
    },
    /// Run a protocol over the simulated channel.
    Simulate {
        #[arg(short, long, value_enum, default_value_t = Protocol::StopAndWait)]
        protocol: Protocol,
        /// Per-unit drop probability of the channel.
        #[arg(short, long, default_value_t = dlink_core::DEFAULT_DROP_PROBABILITY)]
        drop_probability: f64,
        /// Probability that a delivered frame arrives with one bit flipped.
        #[arg(short, long, default_value_t = 0.0)]
        corruption_probability: f64,
        /// Give up on a message after this many attempts, at least 1 (default: never).
        #[arg(short, long)]
        max_attempts: Option<NonZeroU32>,
        /// Seed for a reproducible run.
        #[arg(short, long)]
        seed: Option<u64>,
        /// Skip the simulated delays.
        #[arg(long)]
        no_delay: bool,
        /// Messages to send (default: four demo frames).
        messages: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Protocol {
    Simple,
    StopAndWait,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Crc { data, binary } => {
            let bytes = read_data(&data, binary)?;
            println!("CRC-CCITT (16-bit) = 0x{:04X}", calculate_crc(&bytes));
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { data, crc, binary } => {
            let bytes = read_data(&data, binary)?;
            let given = parse_crc_hex(&crc)?;
            let check = check_with_crc(&bytes, given);

            if check == 0 {
                println!("CRC verification successful! Data is correct.");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("CRC verification failed! Data is corrupted.");
                println!("Check CRC result = 0x{check:04X}");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Simulate {
            protocol,
            drop_probability,
            corruption_probability,
            max_attempts,
            seed,
            no_delay,
            messages,
        } => {
            let messages = if messages.is_empty() {
                DEMO_MESSAGES.iter().map(|m| m.to_string()).collect()
            } else {
                messages
            };

            let sim = Simulation {
                drop_probability,
                corruption_probability,
                max_attempts,
                seed,
                messages,
            };

            match (protocol, no_delay) {
                (Protocol::Simple, true) => sim.run_simple(NoDelay),
                (Protocol::Simple, false) => sim.run_simple(ThreadSleep),
                (Protocol::StopAndWait, true) => sim.run_stop_and_wait(NoDelay),
                (Protocol::StopAndWait, false) => sim.run_stop_and_wait(ThreadSleep),
            }
        }
    }
}

fn read_data(data: &str, binary: bool) -> Result<Vec<u8>> {
    if binary {
        binary_string_to_bytes(data)
    } else {
        Ok(data.as_bytes().to_vec())
    }
}

struct Simulation {
    drop_probability: f64,
    corruption_probability: f64,
    max_attempts: Option<NonZeroU32>,
    seed: Option<u64>,
    messages: Vec<String>,
}

impl Simulation {
    fn run_simple<P: Pacer>(self, pacer: P) -> Result<ExitCode> {
        let mut simple = SimpleProtocol::new(pacer);
        for message in &self.messages {
            simple.send_frame(message.as_bytes());
        }
        println!("Sent {} frames", simple.frames_sent());
        Ok(ExitCode::SUCCESS)
    }

    fn run_stop_and_wait<P: Pacer>(self, pacer: P) -> Result<ExitCode> {
        let source = match self.seed {
            Some(seed) => RngSource::seeded(seed),
            None => RngSource::from_entropy(),
        };
        let channel = LossyChannel::new(self.drop_probability, source)?
            .with_corruption(self.corruption_probability)?;

        let mut builder = StopAndWaitBuilder::new();
        if let Some(max) = self.max_attempts {
            builder = builder.with_max_attempts(max);
        }
        let mut arq = builder.build(channel, pacer);

        for message in &self.messages {
            let report = arq.send_data(message.as_bytes())?;
            for payload in arq.take_delivered() {
                println!("receiver got {:?}", String::from_utf8_lossy(&payload));
            }
            println!(
                "{:?} delivered as frame #{} after {} attempt(s)",
                message, report.sequence_bit, report.attempts
            );
        }

        let stats = arq.stats();
        println!(
            "Delivered {} messages: {} frames sent, {} frames lost, {} frames rejected, {} ACKs lost, {} duplicates discarded",
            stats.messages_delivered,
            stats.frames_sent,
            stats.frames_lost,
            stats.frames_rejected,
            stats.acks_lost,
            arq.receiver().duplicates()
        );
        println!(
            "Observed channel drop rate: {:.3}",
            arq.channel().observed_drop_rate()
        );
        Ok(ExitCode::SUCCESS)
    }
}
