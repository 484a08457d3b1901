use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sfu-demo-client", about = "Text-mode client for the control channel")]
pub struct Args {
    /// Control-channel address to connect to.
    #[arg(long, default_value = "127.0.0.1:8888")]
    pub control_addr: String,

    /// Display name to join with.
    #[arg(long)]
    pub name: String,

    /// Room to join.
    #[arg(long, default_value = "general")]
    pub room: String,
}
