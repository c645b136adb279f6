use crate::config::ConfigOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pneumoscan")]
#[command(
    author,
    version,
    about = "Classify chest X-rays as normal or pneumonia"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        env = "PNEUMOSCAN_CONFIG",
        default_value = "./pneumoscan.yaml"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the local web page
    Serve {
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Listen address
        #[arg(short, long)]
        address: Option<String>,

        /// Directory holding model.json and model.safetensors
        #[arg(long, env = "PNEUMOSCAN_MODEL_DIR")]
        model_dir: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Classify one image file and print the result
    Classify {
        /// Image file to classify
        image: PathBuf,

        /// Directory holding model.json and model.safetensors
        #[arg(long, env = "PNEUMOSCAN_MODEL_DIR")]
        model_dir: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

impl Commands {
    pub fn verbose(&self) -> bool {
        match self {
            Self::Serve { verbose, .. } | Self::Classify { verbose, .. } => *verbose,
        }
    }

    /// Config values this command overrides
    pub fn overrides(&self) -> ConfigOverrides {
        match self {
            Self::Serve {
                port,
                address,
                model_dir,
                ..
            } => ConfigOverrides {
                model_dir: model_dir.clone(),
                address: address.clone(),
                port: *port,
            },
            Self::Classify { model_dir, .. } => ConfigOverrides {
                model_dir: model_dir.clone(),
                ..Default::default()
            },
        }
    }
}
