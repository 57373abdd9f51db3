use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "accessd", version, about = "Access decision engine for multi-zone parking and facility gates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the TCP ingress dispatcher and the admin HTTP surface.
    Serve(ServeOpts),
    Config(ConfigOpts),
    Version,
}

#[derive(clap::Args)]
pub struct ServeOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    /// Override the TCP ingress port.
    #[arg(long)]
    pub port: Option<u16>,
    /// Override the admin HTTP port.
    #[arg(long)]
    pub admin_port: Option<u16>,
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}
