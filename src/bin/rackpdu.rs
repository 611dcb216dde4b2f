//! rackpdu: query and switch a rack PDU from the command line.
#![recursion_limit = "256"]

use clap::{Parser, Subcommand};
use rack_pdu::bulk;
use rack_pdu::catalog::Attribute;
use rack_pdu::{
    DeviceCommand, Oid, OutletCommand, PduBuilder, RackPdu, Reading, StringMode, UdpSession,
    Version,
};
use std::process::ExitCode;
use std::time::Duration;

/// Query and control an APC-style rack PDU over SNMP.
#[derive(Debug, Parser)]
#[command(name = "rackpdu", version, about)]
struct Args {
    /// Target host or host:port (default port 161).
    #[arg(value_name = "HOST")]
    host: String,

    /// SNMP version: 1 or 2c.
    #[arg(short = 'v', long = "snmp-version", default_value = "1")]
    snmp_version: Version,

    /// Request timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value = "10")]
    timeout: f64,

    /// Resends after a timeout.
    #[arg(short = 'r', long = "retries", default_value = "1")]
    retries: u32,

    /// Enable debug logging.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Enable trace logging (includes wire-level detail).
    #[arg(long = "trace")]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print identity and load summary.
    Info,
    /// Read one attribute by name (e.g. power-draw, uptime).
    Get { attribute: Attribute },
    /// List outlets with their names and states.
    Outlets,
    /// Print the state of one outlet.
    State { id: u32 },
    /// Send an outlet command (e.g. immediate-off) to some or all outlets.
    Command {
        command: OutletCommand,
        /// Outlet ids; none means every outlet.
        ids: Vec<u32>,
    },
    /// Send a command to the whole device.
    DeviceCommand { command: DeviceCommand },
    /// Reboot outlets whose names match any pattern (case-insensitive regex).
    Reboot {
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Exit with status 0 if the device answers.
    Alive,
    /// Read any OID as raw octets.
    Raw { oid: Oid },
}

impl Args {
    fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = if self.trace {
            "rack_pdu=trace"
        } else if self.debug {
            "rack_pdu=debug"
        } else {
            "rack_pdu=warn"
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .try_init();
    }

    fn builder(&self) -> PduBuilder {
        RackPdu::builder(self.host.clone())
            .version(self.snmp_version)
            .timeout(Duration::from_secs_f64(self.timeout.max(0.0)))
            .retries(self.retries)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.init_tracing();

    let result = match &args.command {
        Command::Reboot { patterns } => bulk::outlets_reboot_with(args.builder(), patterns)
            .await
            .map(|names| {
                for name in names {
                    println!("{}", name);
                }
            }),
        Command::Alive => {
            return if bulk::is_alive_with(args.builder()).await {
                println!("alive");
                ExitCode::SUCCESS
            } else {
                println!("not responding");
                ExitCode::FAILURE
            };
        }
        command => match args.builder().connect().await {
            Ok(pdu) => bulk::scoped(pdu, async |pdu| run(pdu, command).await).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(pdu: &RackPdu<UdpSession>, command: &Command) -> rack_pdu::Result<()> {
    match command {
        Command::Info => {
            println!("Name:         {}", pdu.get_name().await?);
            println!("Model:        {}", pdu.get_model_number().await?);
            println!("Serial:       {}", pdu.get_serial_number().await?);
            println!("Firmware:     {}", pdu.get_firmware_revision().await?);
            println!("Hardware:     {}", pdu.get_hardware_revision().await?);
            println!("Manufactured: {}", pdu.get_manufacture_date().await?);
            println!("Outlets:      {}", pdu.get_outlets_count().await?);
            println!("Uptime:       {} ms", pdu.get_uptime().await?);
            println!("Power draw:   {:.1} A", pdu.get_power_draw().await?);
            println!("Load state:   {}", pdu.get_load_state().await?);
        }
        Command::Get { attribute } => {
            let reading = pdu
                .query(&[attribute.oid()], StringMode::Text)
                .await?
                .into_iter()
                .next();
            if let Some(reading) = reading {
                println!("{}", reading);
            }
        }
        Command::Outlets => {
            let names = pdu.get_outlets_names().await?;
            let states = pdu.get_outlets_states().await?;
            for (id, name) in &names {
                let state = states
                    .get(id)
                    .map_or_else(|| "?".to_string(), |s| s.to_string());
                println!("{:>3}  {:<4} {}", id, state, name);
            }
        }
        Command::State { id } => {
            println!("{}", pdu.get_outlet_state(*id).await?);
        }
        Command::Command { command, ids } => {
            let accepted = pdu.run_outlets_command(*command, ids).await?;
            println!("{}: {} outlet(s) accepted", command, accepted.len());
        }
        Command::DeviceCommand { command } => {
            let accepted = pdu.run_device_command(*command).await?;
            println!("{}: accepted {}", command, accepted);
        }
        Command::Raw { oid } => {
            let data = pdu.get_raw(oid).await?;
            println!("{}", Reading::Octets(data));
        }
        Command::Reboot { .. } | Command::Alive => {}
    }
    Ok(())
}
