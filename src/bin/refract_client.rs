use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use refract_client::queue::DEFAULT_QUEUE_FILE;
use refract_client::transport::DEFAULT_SERVER_URL;
use refract_client::{
    flush_queue, submit_reading, HttpTransport, Reading, ReadingQueue, SubmitOutcome, Unit,
};

#[derive(Parser)]
#[command(name = "refract-client", version, about = "Submit refractometry readings with offline store-and-forward")]
struct Cli {
    /// Device identifier
    #[arg(short = 'd', long)]
    device_id: Option<String>,

    /// Reading value
    #[arg(short = 'v', long)]
    value: Option<f64>,

    /// Unit: 'RI' or 'Brix'
    #[arg(short = 'u', long)]
    unit: Option<Unit>,

    /// Temperature in Celsius
    #[arg(short = 't', long = "temp", default_value_t = 25.0)]
    temperature_c: f64,

    /// Ingest server base URL
    #[arg(short = 's', long, default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Path of the offline queue file
    #[arg(long, default_value = DEFAULT_QUEUE_FILE)]
    queue_path: PathBuf,

    /// Flush queued readings and exit
    #[arg(short = 'f', long)]
    flush: bool,

    /// Drop all queued readings and exit
    #[arg(long)]
    clear: bool,
}

fn main() {
    env_logger::init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let queue = ReadingQueue::new(&cli.queue_path);

    if cli.clear {
        queue.clear().context("failed to clear queue")?;
        println!("queue cleared");
        return Ok(());
    }

    let transport = HttpTransport::new(&cli.server)?;

    if cli.flush {
        let flushed = flush_queue(&queue, &transport)?;
        println!("flushed {flushed} queued reading(s)");
        let remaining = queue.count()?;
        if remaining > 0 {
            bail!("{remaining} reading(s) still queued");
        }
        return Ok(());
    }

    let device_id = cli.device_id.context("--device-id is required")?;
    let value = cli.value.context("--value is required")?;
    let unit = cli.unit.context("--unit is required")?;

    let reading = Reading::now(device_id, value, unit, cli.temperature_c);
    println!("sending reading: {}", reading.to_json_line()?);

    match submit_reading(&queue, &transport, &reading)? {
        SubmitOutcome::Sent => {
            println!("reading delivered");
            Ok(())
        }
        SubmitOutcome::Queued => {
            bail!("delivery failed, reading queued for retry")
        }
    }
}
