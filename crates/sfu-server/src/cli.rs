use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sfu-server", about = "Selective forwarding unit for small-group voice chat")]
pub struct Args {
    /// Path to a TOML configuration file. Missing file falls back to defaults.
    #[arg(short, long, default_value = "config/sfu.toml")]
    pub config: String,

    /// Override the control (TCP) bind address from the config file.
    #[arg(long)]
    pub control_addr: Option<String>,

    /// Override the media (UDP) bind address from the config file.
    #[arg(long)]
    pub media_addr: Option<String>,
}
