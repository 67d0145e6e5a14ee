use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devctl")]
#[command(version)]
#[command(about = "Start, stop and untangle the ports of a local backend + frontend dev environment")]
pub struct Cli {
    /// Config file path (defaults to devctl.yaml, searched upwards)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the config file's directory)
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Defaults to `start`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve ports, then start the backend and the frontend and supervise them
    Start {
        /// Do not open the frontend in a browser once it is up
        #[arg(long)]
        no_browser: bool,
    },
    /// Kill leftover dev processes
    Stop {
        /// What to kill [default: known dev ports and project processes]
        #[arg(value_enum)]
        scope: Option<StopScope>,
    },
    /// Port utilities
    #[command(subcommand)]
    Port(PortCommands),
    /// Write a starter devctl.yaml
    Init {
        /// Output file path
        #[arg(short, long, default_value = "devctl.yaml")]
        output: PathBuf,
        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Validate configuration without starting anything
    Validate,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum PortCommands {
    /// Show whether the preferred backend and frontend ports are free
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pick free ports and update the service config files
    Resolve {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Kill whatever holds the preferred backend and frontend ports
    Clean,
    /// Kill whatever holds PORT
    Kill {
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StopScope {
    /// Known dev ports only
    Ports,
    /// Every process matching reaper.node_pattern
    Node,
    /// Every process matching reaper.java_pattern
    Java,
    /// Ports, project processes, node and java
    Force,
}
