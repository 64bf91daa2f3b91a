//! sdbridge — host runner for the inter-core SD-card bridge.
//!
//! Runs both cores' halves in one process:
//!
//! ```text
//! ┌──────────────────────────── main thread ──────────────────────────┐
//! │  RemoteDisk ─▶ BlockClient ─▶ LoopbackEndpoint("hl")              │
//! └───────────────────────────────────┬───────────────────────────────┘
//!                                     │ frame queues
//! ┌──────────────────────────── server thread ────────────────────────┐
//! │  LoopbackEndpoint("rt") ─▶ BlockServer ─▶ MemDisk / FileDisk       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `sdbridge [config.json] [disk.img]`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result, bail};
use log::{LevelFilter, info, warn};

use sdbridge::adapters::console_log;
use sdbridge::adapters::file_disk::FileDisk;
use sdbridge::adapters::loopback::{LoopbackEndpoint, loopback_pair};
use sdbridge::adapters::mem_disk::MemDisk;
use sdbridge::adapters::remote_disk::RemoteDisk;
use sdbridge::config::BridgeConfig;
use sdbridge::diagnostics::ServerStats;
use sdbridge::ports::BlockDevice;
use sdbridge::protocol::codec::BLOCK_SIZE;
use sdbridge::protocol::server::BlockServer;

/// Block exercised by the startup self-test.
const PROBE_BLOCK: u32 = 100;
const PROBE_BYTE: u8 = 0xAB;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            BridgeConfig::load(&path).map_err(|e| anyhow::anyhow!("config {path}: {e}"))?
        }
        None => BridgeConfig::default(),
    };
    let image = args.next();

    console_log::init(config.level_filter().unwrap_or(LevelFilter::Info))
        .map_err(|e| anyhow::anyhow!("installing logger: {e}"))?;
    info!("sdbridge v{}", env!("CARGO_PKG_VERSION"));

    let stop = Arc::new(AtomicBool::new(false));
    let (hl, rt) = loopback_pair();

    let server = match image {
        Some(path) => {
            let disk = FileDisk::open(&path).with_context(|| format!("opening image {path}"))?;
            spawn_server(disk, rt, &config, Arc::clone(&stop))
        }
        None => {
            let disk = MemDisk::try_new(config.block_count).context("building RAM disk")?;
            spawn_server(disk, rt, &config, Arc::clone(&stop))
        }
    }?;

    let outcome = self_test(hl, &config);

    stop.store(true, Ordering::Release);
    let server_stats = match server.join() {
        Ok(stats) => stats,
        Err(_) => bail!("server thread panicked"),
    };
    println!(
        "server: {}",
        serde_json::to_string(&server_stats).context("encoding server stats")?
    );
    outcome
}

fn spawn_server<D>(
    device: D,
    mut channel: LoopbackEndpoint,
    config: &BridgeConfig,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<ServerStats>>
where
    D: BlockDevice + Send + 'static,
{
    let trace = config.trace_blocks;
    let handle = thread::Builder::new()
        .name("rt-core".into())
        .spawn(move || {
            let mut server = BlockServer::new(device).with_block_trace(trace);
            if let Err(e) = server.run(&mut channel, &stop) {
                warn!("server: stopped on error: {}", e);
            }
            if let Err(e) = server.device_mut().sync() {
                warn!("server: final sync failed: {:?}", e);
            }
            server.stats().clone()
        })
        .context("spawning server thread")?;
    Ok(handle)
}

/// Write the probe block, read it back and compare.
fn self_test(channel: LoopbackEndpoint, config: &BridgeConfig) -> Result<()> {
    let mut disk = RemoteDisk::new(channel, config);

    let pattern = [PROBE_BYTE; BLOCK_SIZE];
    disk.write_block(PROBE_BLOCK, &pattern)
        .with_context(|| format!("writing block {PROBE_BLOCK}"))?;
    info!("self-test: wrote block {}", PROBE_BLOCK);

    let mut back = [0u8; BLOCK_SIZE];
    disk.read_block(PROBE_BLOCK, &mut back)
        .with_context(|| format!("reading block {PROBE_BLOCK}"))?;
    if back != pattern {
        bail!("self-test: block {PROBE_BLOCK} read back differs");
    }
    info!("self-test: block {} verified", PROBE_BLOCK);

    println!(
        "client: {}",
        serde_json::to_string(disk.client().stats()).context("encoding client stats")?
    );
    Ok(())
}
