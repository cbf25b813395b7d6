use std::env::consts::OS;

use tokio::process::Command;
use tracing::{debug, warn};

pub const UNKNOWN_SSID: &str = "Unknown";

const AIRPORT_PATH: &str =
    "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/Current/Resources/airport";

/// Windows: first `All User Profile : <name>` line of `netsh wlan show profiles`.
pub fn parse_netsh_profiles(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("All User Profile"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, ssid)| ssid.trim().to_string())
        .filter(|ssid| !ssid.is_empty())
}

/// Linux: `iwgetid -r` prints the bare SSID.
pub fn parse_iwgetid(output: &str) -> Option<String> {
    let ssid = output.trim();
    if ssid.is_empty() {
        None
    } else {
        Some(ssid.to_string())
    }
}

/// macOS: `airport -I` prints `key: value` lines; `BSSID:` must not match.
pub fn parse_airport(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("SSID:"))
        .map(|ssid| ssid.trim().to_string())
        .filter(|ssid| !ssid.is_empty())
}

async fn run(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output().await {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            debug!("{program} exited with {}", output.status);
            None
        }
        Err(err) => {
            debug!("Failed to run {program}: {err}");
            None
        }
    }
}

pub async fn detect_ssid() -> String {
    let ssid = match OS {
        "windows" => run("netsh", &["wlan", "show", "profiles"])
            .await
            .and_then(|output| parse_netsh_profiles(&output)),
        "linux" => run("iwgetid", &["-r"])
            .await
            .and_then(|output| parse_iwgetid(&output)),
        "macos" => run(AIRPORT_PATH, &["-I"])
            .await
            .and_then(|output| parse_airport(&output)),
        other => {
            warn!("WiFi detection is not supported on {other}");
            None
        }
    };
    ssid.unwrap_or_else(|| UNKNOWN_SSID.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netsh_takes_first_profile() {
        let output = "Profiles on interface Wi-Fi:\n\nUser profiles\n-------------\n    All User Profile     : HomeNet\n    All User Profile     : Office\n";
        assert_eq!(parse_netsh_profiles(output).as_deref(), Some("HomeNet"));
        assert_eq!(parse_netsh_profiles("no profiles here"), None);
    }

    #[test]
    fn iwgetid_trims_output() {
        assert_eq!(parse_iwgetid("CafeWifi\n").as_deref(), Some("CafeWifi"));
        assert_eq!(parse_iwgetid("\n"), None);
    }

    #[test]
    fn airport_skips_bssid_line() {
        let output = "     agrCtlRSSI: -52\n          BSSID: aa:bb:cc:dd:ee:ff\n           SSID: Lab Network\n        channel: 36,1\n";
        assert_eq!(parse_airport(output).as_deref(), Some("Lab Network"));
        assert_eq!(parse_airport("BSSID: 11:22:33:44:55:66"), None);
    }
}
