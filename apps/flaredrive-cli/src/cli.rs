use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "flaredrive", version)]
#[command(about = "Upload and manage files in a FlareDrive bucket", long_about = None)]
pub struct Cli {
    /// Deployment URL, overriding the config file.
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Remote directory to work in, overriding the config file.
    #[arg(long = "dir", global = true)]
    pub base_directory: Option<String>,

    /// Upload without rendering thumbnails.
    #[arg(long, global = true)]
    pub no_thumbnails: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload local files into the remote directory.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Create a folder in the remote directory.
    Mkdir { name: String },
    /// Copy an object server-side.
    Copy { source: String, target: String },
    /// Move (rename) an object.
    Move { source: String, target: String },
    /// Delete an object.
    Delete { key: String },
    /// Check whether the session is still valid.
    Probe,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(dir) = &self.base_directory {
            config.base_directory = dir.clone();
        }
        if self.no_thumbnails {
            config.thumbnails = false;
        }
    }
}
