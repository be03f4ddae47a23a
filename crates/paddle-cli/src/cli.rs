use std::{path::PathBuf, process::ExitCode, str::FromStr};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use paddle_core::TrackerSettings;

use crate::commands::{
    init_settings::init_settings,
    mask::write_mask,
    track::{track, TrackArgs},
};

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the tracker over a directory of frames, in file name order.
    #[clap(name = "track")]
    Track {
        /// Directory containing the frames
        frames: PathBuf,

        /// y of the paddle line. Defaults to 80 px above the bottom of the frame.
        #[clap(long, allow_hyphen_values = true)]
        paddle_y: Option<f64>,

        /// Mirror frames horizontally before tracking, like a selfie camera.
        #[clap(long, default_value = "false", action)]
        mirror: bool,

        /// Print one JSON object per frame instead of a table.
        #[clap(long, default_value = "false", action)]
        json: bool,
    },

    /// Segment a single frame and save the mask, for tuning the color range.
    #[clap(name = "mask")]
    Mask {
        #[clap(short, long)]
        input: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        #[clap(long, default_value = "false", action)]
        mirror: bool,
    },

    /// Write the default settings to the settings file, overwriting it.
    #[clap(name = "init-settings")]
    InitSettings,
}

#[derive(Debug, Parser)]
#[command(name = "paddle")]
pub struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(long, short = 'f', default_value = "paddle-settings.json")]
    pub settings_file: PathBuf,

    #[clap(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn start(self) -> ExitCode {
        if let Err(err) = self.init_logger() {
            eprintln!("{:#}", err);
            return ExitCode::FAILURE;
        }

        match &self.command {
            Command::Track {
                frames,
                paddle_y,
                mirror,
                json,
            } => {
                let args = TrackArgs {
                    frames: frames.clone(),
                    paddle_y: *paddle_y,
                    mirror: *mirror,
                    json: *json,
                };
                match self.settings().and_then(|settings| track(&settings, &args)) {
                    Ok(_) => ExitCode::SUCCESS,
                    Err(err) => {
                        eprintln!("Error tracking frames: {:#}", err);
                        ExitCode::FAILURE
                    }
                }
            }
            Command::Mask {
                input,
                output,
                mirror,
            } => match self
                .settings()
                .and_then(|settings| write_mask(&settings, input, output, *mirror))
            {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("Error writing mask: {:#}", err);
                    ExitCode::FAILURE
                }
            },
            Command::InitSettings => match init_settings(&self.settings_file) {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("Error writing settings: {:#}", err);
                    ExitCode::FAILURE
                }
            },
        }
    }

    fn init_logger(&self) -> Result<()> {
        let level = LevelFilter::from_str(&self.log_level)
            .with_context(|| format!("Invalid log level: {}", self.log_level))?;
        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .format_module_path(false)
            .try_init()
            .context("Failed to install logger")
    }

    /// Load the tracker settings, writing the defaults if the file does not exist yet.
    fn settings(&self) -> Result<TrackerSettings> {
        let settings = TrackerSettings::load_or_insert(&self.settings_file)?;
        log::info!("Using settings from {}", self.settings_file.display());
        Ok(settings)
    }
}
