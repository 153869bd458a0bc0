use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bt2mqtt", version, about = "BLE smart blind to MQTT bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the Bluetooth adapters available on this system and exit.
    ListAdapters,
    /// Run the bridge: connect to BlueZ and the MQTT broker, and serve the configured blinds.
    Start {
        /// Path to the YAML configuration file.
        #[arg(long)]
        config: String,
        /// Raise the default log filter to `debug` for this crate's modules.
        #[arg(long)]
        debug: bool,
        /// Raise the default log filter to `trace` for this crate's modules.
        #[arg(long)]
        verbose: bool,
    },
}
