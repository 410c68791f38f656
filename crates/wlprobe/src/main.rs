use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use wlprobe_ctrl::{wait_for_authentication, AuthWaitConfig, BssInfo, ControlConnection};
use wlprobe_wext::{NetworkSummary, Scanner, WextDevice};

mod cli;
mod config;
mod output;

use cli::{Cli, Commands, CtrlArgs, CtrlCommand, ScanArgs};
use config::CliConfig;

fn main() {
    let cli = Cli::parse();
    if !(cli.journald && wlprobe_wext::logging::init_journald_logger()) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if let Err(err) = run(cli, CliConfig::from_env()) {
        eprintln!("Error: {}", err);
        for cause in err.chain().skip(1) {
            eprintln!("  -> {}", cause);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: CliConfig) -> Result<()> {
    match cli.command {
        Commands::Devices => devices(),
        Commands::Scan(args) => scan(args, &config),
        Commands::Ctrl(args) => ctrl(args, &config),
    }
}

fn devices() -> Result<()> {
    let names = wlprobe_wext::enumerate_devices().context("enumerating wireless interfaces")?;
    if names.is_empty() {
        warn!("No interfaces with wireless extensions found");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn scan(args: ScanArgs, config: &CliConfig) -> Result<()> {
    let device = WextDevice::open(&args.interface)
        .with_context(|| format!("opening {}", args.interface))?;
    if let Err(e) = device.bring_up() {
        warn!("Could not bring {} up: {}", args.interface, e);
    }

    let scanner = Scanner::with_config(device, config.scan_config(args.no_trigger_wait));
    let records = scanner
        .scan()
        .with_context(|| format!("scanning on {}", args.interface))?;
    info!("{} cell(s) on {}", records.len(), args.interface);

    if args.summary {
        let summaries: Vec<NetworkSummary> =
            records.iter().map(NetworkSummary::from_record).collect();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        } else {
            print!("{}", output::format_summaries(&summaries));
        }
    } else if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", output::format_cells(&args.interface, &records));
    }
    Ok(())
}

fn ctrl(args: CtrlArgs, config: &CliConfig) -> Result<()> {
    let path = config.resolve_socket(&args.socket);
    let mut conn = ControlConnection::open_with_config(&path, config.ctrl_config(args.timeout_ms))
        .with_context(|| format!("connecting to {}", path.display()))?;

    match args.command {
        CtrlCommand::Request { command } => {
            let command = command.join(" ");
            let reply = conn
                .request(&command)
                .with_context(|| format!("sending '{}'", command))?;
            print!("{}", reply);
            if !reply.ends_with('\n') {
                println!();
            }
        }
        CtrlCommand::Status { json } => {
            let status = conn.status().context("querying STATUS")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", output::format_status(&status));
            }
        }
        CtrlCommand::BssList { json } => {
            let entries: Vec<BssInfo> = conn
                .list_scan_results()
                .context("listing scan results")?
                .iter()
                .map(|reply| BssInfo::parse(reply))
                .collect();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output::bss_views(&entries))?
                );
            } else {
                print!("{}", output::format_bss_list(&entries));
            }
        }
        CtrlCommand::Monitor { count } => {
            conn.attach().context("attaching to event monitor")?;
            let mut seen = 0usize;
            while count.map_or(true, |limit| seen < limit) {
                let event = conn.recv().context("receiving event")?;
                println!("{}", event.trim_end());
                seen += 1;
            }
            conn.detach().context("detaching from event monitor")?;
        }
        CtrlCommand::WaitAuth => {
            let authenticated =
                wait_for_authentication(&conn, Instant::now(), &AuthWaitConfig::default())
                    .context("waiting for authentication")?;
            if !authenticated {
                bail!("authentication did not complete on {}", path.display());
            }
            println!("authenticated");
        }
    }

    conn.close();
    Ok(())
}
