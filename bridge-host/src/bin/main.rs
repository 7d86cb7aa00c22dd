use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bridge_host::{
    EngineConfig, NusbTransport, ShortTransferPolicy, TransferEngine, UsbConfig,
    OUTBOUND_CAPACITY,
};
use clap::{Parser, Subcommand};
use log::{info, warn};

/// Drive the UART and boot strapping pins of a USB-to-UART bridge.
#[derive(Parser, Debug)]
#[command(name = "uart-bridge", version, long_about = None)]
struct Args {
    /// Enable verbose logging (repeat for per-transfer detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print write statistics before exiting
    #[arg(long, default_value_t = false)]
    stats: bool,

    /// Deadline for each flush, in milliseconds
    #[arg(long, default_value_t = 5000)]
    flush_timeout_ms: u64,

    /// Abort a flush when the device accepts fewer bytes than sent
    #[arg(long, default_value_t = false)]
    strict: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Strap the target into its serial download mode
    Boot,
    /// Reset the target into normal boot
    Reset,
    /// Set the bridge UART rate (74880 or 115200)
    Baud { rate: u32 },
    /// Send a file over the UART
    Send {
        file: PathBuf,
        /// Enter boot mode before sending
        #[arg(long, default_value_t = false)]
        boot: bool,
    },
    /// Read exactly COUNT bytes and write them to stdout
    Read {
        count: usize,
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
        /// Print as hex instead of raw bytes
        #[arg(long, default_value_t = false)]
        hex: bool,
    },
    /// Copy everything the target prints to stdout
    Monitor {
        /// Stop after this many milliseconds (default: run forever)
        #[arg(long)]
        duration_ms: Option<u64>,
        /// Reset the target before monitoring
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    /// Reboot the bridge itself into its USB bootloader
    Bootloader,
}

/// Pause between empty polls while monitoring.
const MONITOR_IDLE: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    let transport =
        NusbTransport::open(&UsbConfig::default()).context("Failed to open the bridge")?;

    let mut config =
        EngineConfig::default().with_flush_timeout(Duration::from_millis(args.flush_timeout_ms));
    if args.strict {
        config = config.with_short_transfers(ShortTransferPolicy::Fail);
    }
    let mut engine = TransferEngine::with_config(transport, config);

    match args.command {
        Cmd::Boot => engine.enter_boot_mode()?,
        Cmd::Reset => engine.reset_target()?,
        Cmd::Baud { rate } => {
            let selected = engine.set_baud_rate(rate)?;
            info!("Bridge UART now at {}", selected);
        }
        Cmd::Send { file, boot } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if boot {
                engine.enter_boot_mode()?;
            }
            let mut sent = 0;
            for block in data.chunks(OUTBOUND_CAPACITY) {
                engine.write(block)?;
                sent += engine.flush_all()?;
            }
            info!("Sent {} bytes from {}", sent, file.display());
        }
        Cmd::Read {
            count,
            timeout_ms,
            hex,
        } => {
            let mut buf = vec![0u8; count];
            engine.read(&mut buf, Duration::from_millis(timeout_ms))?;
            let mut stdout = std::io::stdout().lock();
            if hex {
                let line: Vec<String> = buf.iter().map(|b| format!("{b:02x}")).collect();
                writeln!(stdout, "{}", line.join(" "))?;
            } else {
                stdout.write_all(&buf)?;
            }
            stdout.flush()?;
        }
        Cmd::Monitor { duration_ms, reset } => {
            if reset {
                engine.reset_target()?;
            }
            let deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
            let mut stdout = std::io::stdout().lock();
            let mut buf = [0u8; bridge_host::bridge_proto::MAX_PACKET_LEN];
            while deadline.map_or(true, |d| Instant::now() < d) {
                let n = engine.read_available(&mut buf)?;
                if n == 0 {
                    std::thread::sleep(MONITOR_IDLE);
                    continue;
                }
                stdout.write_all(&buf[..n])?;
                stdout.flush()?;
            }
        }
        Cmd::Bootloader => {
            // The bridge reboots before acknowledging, so a failed status
            // stage is expected.
            if let Err(e) = engine.jump_to_bootloader() {
                warn!("No acknowledgement from bridge: {}", e);
            }
        }
    }

    if args.stats {
        print!("{}", engine.stats());
    }
    Ok(())
}
