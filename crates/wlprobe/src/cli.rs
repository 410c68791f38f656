use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "wlprobe",
    author,
    version,
    about = "Scan wireless cells and query wpa_supplicant"
)]
pub struct Cli {
    /// Send logs to the systemd journal (needs the `journald` feature)
    #[arg(long, global = true, env = "WLPROBE_JOURNALD")]
    pub journald: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List interfaces with wireless extensions
    Devices,
    /// Scan for cells on an interface
    Scan(ScanArgs),
    /// Talk to a wpa_supplicant control socket
    Ctrl(CtrlArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Wireless interface, e.g. wlan0
    pub interface: String,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the connection-manager summary of each cell
    #[arg(long)]
    pub summary: bool,

    /// Read results right after triggering the scan
    #[arg(long = "no-trigger-wait")]
    pub no_trigger_wait: bool,
}

#[derive(Args, Debug)]
pub struct CtrlArgs {
    /// Control socket path, or an interface name to look up under the control directory
    pub socket: String,

    /// Reply timeout in milliseconds
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: CtrlCommand,
}

#[derive(Subcommand, Debug)]
pub enum CtrlCommand {
    /// Send a raw command and print the reply
    Request {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Show the parsed STATUS reply
    Status {
        #[arg(long)]
        json: bool,
    },
    /// List every BSS the supplicant knows about
    BssList {
        #[arg(long)]
        json: bool,
    },
    /// Attach and print unsolicited events
    Monitor {
        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,
    },
    /// Wait for the supplicant to finish authenticating
    WaitAuth,
}
