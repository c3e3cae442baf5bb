use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::{DEFAULT_CAPTURE_EXTENSION, DEFAULT_CONFIG, DEFAULT_MERGECAP, DEFAULT_TSHARK};

#[derive(Parser, Debug)]
#[command(
    name = "packet-hunter",
    version,
    author = "Bristol Cyber Security Group (BCSG)",
    about = "Extract packet data for threat hunting",
    after_help = "packet-hunter -i capture.pcapng -d ./captures"
)]
pub struct Opts {
    #[arg(short = 'i', long = "input", help = "Path to a packet capture file (pcapng) or a folder of captures")]
    pub source: PathBuf,
    #[arg(short, long, help = "Path to store extracted files")]
    pub destination: PathBuf,
    #[arg(short, long, default_value = DEFAULT_CONFIG, help = "Path to configuration")]
    pub config: PathBuf,
    #[arg(
        short = 'f',
        long = "filter",
        num_args = 0..,
        help = "Specific filters from the filter config to apply (i.e. -f dns nmap-scan http)"
    )]
    pub filters: Option<Vec<String>>,
    #[arg(short, long)]
    pub verbosity: Option<String>,
    #[arg(long, default_value = DEFAULT_TSHARK, help = "tshark binary used to extract packets")]
    pub tshark: String,
    #[arg(long, default_value = DEFAULT_MERGECAP, help = "mergecap binary used to merge extracts")]
    pub mergecap: String,
    #[arg(long, default_value = DEFAULT_CAPTURE_EXTENSION, help = "Capture file extension to search for and merge into")]
    pub extension: String,
    #[arg(long, action, help = "Exit with an error if any tshark or mergecap invocation fails")]
    pub strict: bool,
}

/// The external tools and capture format a hunt runs with. These are injected into the hunter
/// rather than read from globals so that tests can point at anything.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct HuntSettings {
    pub tshark: String,
    pub mergecap: String,
    /// without the leading dot
    pub capture_extension: String,
}

impl Default for HuntSettings {
    fn default() -> Self {
        Self {
            tshark: DEFAULT_TSHARK.to_string(),
            mergecap: DEFAULT_MERGECAP.to_string(),
            capture_extension: DEFAULT_CAPTURE_EXTENSION.to_string(),
        }
    }
}

impl From<&Opts> for HuntSettings {
    fn from(opts: &Opts) -> Self {
        Self {
            tshark: opts.tshark.clone(),
            mergecap: opts.mergecap.clone(),
            capture_extension: opts.extension.trim_start_matches('.').to_string(),
        }
    }
}
