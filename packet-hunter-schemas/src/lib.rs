pub mod cli_models;
pub mod filter_config;

/// Where the filter definitions live when no `--config` is given
pub const DEFAULT_CONFIG: &str = "/etc/packhunt/packhunt.conf";
/// Captures are written and merged as pcapng unless told otherwise
pub const DEFAULT_CAPTURE_EXTENSION: &str = "pcapng";
pub const DEFAULT_TSHARK: &str = "tshark";
pub const DEFAULT_MERGECAP: &str = "mergecap";
