use crate::configuration::Config;

/// Wireshark arguments: start immediately, reading the capture from stdin.
const LIVE_STDIN_ARGS: [&str; 3] = ["-k", "-i", "-"];
const DISPLAY_FILTER_FLAG: &str = "-Y";

pub fn viewer_args(config: &Config) -> Vec<String> {
    let mut args: Vec<String> = LIVE_STDIN_ARGS.iter().map(|a| a.to_string()).collect();
    if let Some(filter) = config.display_filter.as_deref() {
        if !filter.trim().is_empty() {
            args.push(DISPLAY_FILTER_FLAG.to_string());
            args.push(filter.to_string());
        }
    }
    args
}
