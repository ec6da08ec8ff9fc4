// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;

use bgctl::context::PromotionMode;
use bgctl::types::AppName;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bgctl")]
#[command(about = "Blue-green promotion controller for load-balanced services")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (discovered from the working directory otherwise)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bgctl.yml configuration file
    Init {
        /// Application to add next to the primary one
        #[arg(short, long)]
        application: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Promote an image to the idle environment and cut traffic over
    Promote {
        application: AppName,

        #[arg(value_enum, default_value_t = PromotionMode::Switch)]
        mode: PromotionMode,

        /// Image to promote (required for switch)
        #[arg(short, long)]
        image: Option<String>,

        /// Continue past failed smoke and drain health checks
        #[arg(short, long)]
        force: bool,

        /// Break a lock held by another run
        #[arg(long)]
        yes_break_lock: bool,
    },

    /// Show which environment is live for an application
    Status { application: AppName },

    /// List recorded promotions for an application
    History { application: AppName },

    /// Install and start the supervisor unit for an application
    Unit {
        application: AppName,

        #[arg(value_enum, default_value_t = PromotionMode::Switch)]
        mode: PromotionMode,
    },
}
