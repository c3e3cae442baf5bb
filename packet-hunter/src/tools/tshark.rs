use std::path::Path;
use crate::error::HunterError;
use crate::tools::path_str;
use crate::vec_of_strings;

/// `tshark -r <source> -Y <display filter> -w <output>`, reads the capture, keeps the packets
/// matching the display filter and writes them to the output capture.
pub fn extract_command(
    tshark: &str,
    source: &Path,
    expression: &str,
    output: &Path,
) -> Result<Vec<String>, HunterError> {
    Ok(vec_of_strings![
        tshark, "-r", path_str(source)?, "-Y", expression, "-w", path_str(output)?
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_command() {
        let cmd = extract_command(
            "tshark",
            Path::new("source"),
            "value_1",
            Path::new("destination/first/source-2024-01-01_00-00-00"),
        ).unwrap();
        let expected = vec_of_strings![
            "tshark", "-r", "source", "-Y", "value_1", "-w", "destination/first/source-2024-01-01_00-00-00"
        ];
        assert_eq!(cmd, expected);
    }

    #[test]
    fn test_extract_command_keeps_expression_whole() {
        let cmd = extract_command(
            "/usr/bin/tshark",
            Path::new("in.pcapng"),
            "tcp.flags.syn == 1 && tcp.window_size <= 1024",
            Path::new("out.pcapng"),
        ).unwrap();
        assert_eq!(cmd.len(), 7);
        assert_eq!(cmd[0], "/usr/bin/tshark");
        assert_eq!(cmd[4], "tcp.flags.syn == 1 && tcp.window_size <= 1024");
    }
}
