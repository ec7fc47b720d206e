use anyhow::Context;
use clap::{Parser, Subcommand};
use mbus_sim::constants::{
    DEFAULT_ABORT_AFTER_CHUNKS, DEFAULT_CHUNK_SIZE, DEFAULT_LISTEN_PORT, DEFAULT_PRIMARY_ADDRESS,
    DEFAULT_RESPONSE_TIMEOUT,
};
use mbus_sim::mbus::client::{read_raw_frame, ClientConfig};
use mbus_sim::mbus::server::{MeterServer, ServerConfig};
use mbus_sim::util::hex::format_hex_compact;
use mbus_sim::{init_logger, log_info, MeterDevice, ResponseMode};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mbus-sim")]
#[command(about = "Simulated M-Bus slave device over TCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a simulated meter built from a description and a captured telegram
    Serve {
        /// Meter description JSON file
        description: PathBuf,
        /// Captured response telegram as hex text
        telegram: PathBuf,
        #[arg(short, long, default_value_t = DEFAULT_LISTEN_PORT)]
        port: u16,
        /// Replay the captured telegram verbatim instead of perturbing values
        #[arg(long = "static")]
        static_mode: bool,
        /// Abort chunked replies mid-telegram to simulate a broken link
        #[arg(long)]
        broken: bool,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Chunk count after which a broken reply stops
        #[arg(long, default_value_t = DEFAULT_ABORT_AFTER_CHUNKS)]
        abort_after: usize,
    },
    /// Read one raw response frame from a simulated meter
    Read {
        /// Primary address to request data from
        #[arg(default_value_t = DEFAULT_PRIMARY_ADDRESS)]
        address: u8,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, default_value_t = DEFAULT_LISTEN_PORT)]
        port: u16,
        /// Idle timeout while waiting for reply chunks, in milliseconds
        #[arg(long, default_value_t = DEFAULT_RESPONSE_TIMEOUT.as_millis() as u64)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            description,
            telegram,
            port,
            static_mode,
            broken,
            chunk_size,
            abort_after,
        } => {
            let mode = if static_mode {
                ResponseMode::Static
            } else {
                ResponseMode::Live
            };
            let device = MeterDevice::from_files(&description, &telegram, mode)
                .context("failed to load the simulated meter")?;
            print_device(&device)?;

            let config = ServerConfig {
                port,
                chunk_size,
                inject_fault: broken,
                abort_after_chunks: abort_after,
                ..ServerConfig::default()
            };
            let server = MeterServer::bind(device, config).await?;
            server.run().await?;
        }
        Commands::Read {
            address,
            host,
            port,
            timeout_ms,
        } => {
            let config = ClientConfig {
                host,
                port,
                address,
                response_timeout: Duration::from_millis(timeout_ms),
            };
            let frame = read_raw_frame(&config).await?;
            println!("{}", format_hex_compact(&frame));
        }
    }

    Ok(())
}

/// Logs the loaded meter description and telegram size at startup.
fn print_device(device: &MeterDevice) -> anyhow::Result<()> {
    let info = device.slave_information();
    log_info("Meter Slave Information:");
    log_info(&format!("  Id:            {}", info.id));
    log_info(&format!("  Manufacturer:  {}", info.manufacturer));
    log_info(&format!("  Version:       {}", info.version));
    log_info(&format!("  Medium:        {}", info.medium));
    log_info(&format!("  Access Number: {}", info.access_number));
    log_info(&format!("  Status:        {}", info.status));
    log_info(&format!("  Signature:     {}", info.signature));
    for record in device.records()? {
        log_info(&format!(
            "  [{}] {} ({}) = {}",
            record.id, record.quantity, record.unit, record.value
        ));
    }
    log_info(&format!(
        "Response telegram: {} bytes",
        device.template().len()
    ));
    Ok(())
}
