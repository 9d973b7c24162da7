use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{info, warn};

use hsim_core::{PartitionId, ERASED_BYTE};
use hsim_hal::{FlashPartition, HalTimer};
use hsim_linux::{console_print, start_hal, CliOptions, FlashOptions, HostTimer, Options};

#[derive(Parser)]
#[command(about = "Drive the host-simulated flash partitions")]
struct Cli {
    /// Directory holding the partition files.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Give this process its own set of partitions.
    #[arg(long)]
    per_pid: bool,
    /// Bring up the debug console UART.
    #[arg(long)]
    cli: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Reset a range to 0xFF.
    Erase {
        #[arg(short, long, value_parser = parse_partition)]
        partition: PartitionId,
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
        #[arg(short, long)]
        len: u32,
    },
    /// Program hex bytes (bits can only be cleared).
    Write {
        #[arg(short, long, value_parser = parse_partition)]
        partition: PartitionId,
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
        data: String,
    },
    /// Dump a range as hex.
    Read {
        #[arg(short, long, value_parser = parse_partition)]
        partition: PartitionId,
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
        #[arg(short, long, default_value_t = 64)]
        len: usize,
    },
    /// Show where a partition lives on disk.
    Info {
        #[arg(short, long, value_parser = parse_partition)]
        partition: PartitionId,
    },
    /// Run a HAL timer and print each expiry.
    Timer {
        #[arg(long, default_value_t = 1_000_000)]
        period_us: u64,
        #[arg(long)]
        auto_reload: bool,
        /// Stop after this many expiries (0 = until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        count: u64,
    },
}

fn parse_partition(s: &str) -> Result<PartitionId, String> {
    if let Ok(raw) = s.parse::<u32>() {
        return Ok(PartitionId::new(raw));
    }
    (0..=12)
        .map(PartitionId::new)
        .find(|p| p.label() == Some(s))
        .ok_or_else(|| format!("unknown partition '{}'", s))
}

fn dump(offset: u32, bytes: &[u8]) {
    for (i, row) in bytes.chunks(16).enumerate() {
        let mut line = format!("{:08x}:", offset as usize + i * 16);
        for b in row {
            let cell = format!("{:02x}", b);
            if *b == ERASED_BYTE {
                line.push_str(&format!(" {}", cell.dimmed()));
            } else {
                line.push_str(&format!(" {}", cell));
            }
        }
        let _ = console_print!("{}\n", line);
    }
}

fn run_timer(period_us: u64, auto_reload: bool, count: u64) -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        warn!("Signal received. Stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let fired = Arc::new(AtomicU64::new(0));
    let f = fired.clone();
    let mut timer = HostTimer::new(period_us, auto_reload, move || {
        let n = f.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = console_print!("timer expired ({})\n", n);
    });
    info!("timer period {:?}, auto-reload {}", timer.period(), auto_reload);

    timer.start()?;
    while running.load(Ordering::SeqCst) {
        if count > 0 && fired.load(Ordering::SeqCst) >= count {
            break;
        }
        if !timer.is_running() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    timer.stop();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let options = Options {
        flash: FlashOptions { per_pid: cli.per_pid },
        cli: CliOptions { enable: cli.cli },
    };
    let mut hal = start_hal(&options, cli.root.clone())?;

    match cli.cmd {
        Cmd::Erase { partition, offset, len } => {
            hal.flash.erase(partition, offset, len)?;
            info!("erased {} bytes at {:#x} in partition {}", len, offset, partition);
        }
        Cmd::Write { partition, offset, data } => {
            let bytes = hex::decode(data.trim_start_matches("0x")).context("data must be hex")?;
            let mut cursor = offset;
            hal.flash.write(partition, &mut cursor, &bytes)?;
            info!("wrote {} bytes to partition {}, cursor now {:#x}", bytes.len(), partition, cursor);
        }
        Cmd::Read { partition, offset, len } => {
            let mut cursor = offset;
            let mut buf = vec![0u8; len];
            let n = hal.flash.read(partition, Some(&mut cursor), &mut buf)?;
            if n < len {
                info!("{} of {} bytes past the end of the region", len - n, len);
            }
            dump(offset, &buf);
        }
        Cmd::Info { partition } => {
            let path = hal.flash.region_path(partition);
            let size = std::fs::metadata(&path).map(|m| m.len()).ok();
            let _ = console_print!("partition {}\n  file: {}\n", partition, path.display());
            match size {
                Some(size) => {
                    let _ = console_print!("  size: {} bytes\n", size);
                }
                None => {
                    let _ = console_print!("  size: (not created yet)\n");
                }
            }
        }
        Cmd::Timer { period_us, auto_reload, count } => run_timer(period_us, auto_reload, count)?,
    }

    Ok(())
}
