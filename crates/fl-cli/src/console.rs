//! Console-URL extraction: pull the managed-device and policy ids out of a
//! pasted admin-console deep link.

use std::sync::OnceLock;

use anyhow::{bail, Result};
use regex::Regex;

static DEVICE_ID: OnceLock<Regex> = OnceLock::new();
static POLICY_ID: OnceLock<Regex> = OnceLock::new();

/// Extracts the managed-device id (`mdmDeviceId/...` segment). A bare id is
/// accepted as-is.
pub fn extract_device_id(input: &str) -> Result<String> {
    let pattern = DEVICE_ID
        .get_or_init(|| Regex::new(r"(?i)mdmDeviceId/([\w-]+)").expect("valid pattern"));
    extract(input, pattern, "mdmDeviceId")
}

/// Extracts the policy/script id (`policyId/...` segment).
pub fn extract_policy_id(input: &str) -> Result<String> {
    let pattern =
        POLICY_ID.get_or_init(|| Regex::new(r"(?i)policyId/([\w-]+)").expect("valid pattern"));
    extract(input, pattern, "policyId")
}

fn extract(input: &str, pattern: &Regex, marker: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("no id or console URL provided");
    }
    // Not a URL: treat the whole argument as the id.
    if !input.contains('/') {
        return Ok(input.to_string());
    }
    match pattern.captures(input) {
        Some(captures) => Ok(captures[1].to_string()),
        None => bail!("no '{marker}/...' segment found in the console URL"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://intune.microsoft.com/#view/Microsoft_Intune_Devices/DeviceSettingsMenuBlade/~/overview/mdmDeviceId/3f2504e0-4f89-11d3-9a0c-0305e82c3301/primaryUserId/";

    #[test]
    fn finds_device_id_in_console_url() {
        let id = extract_device_id(URL).unwrap();
        assert_eq!(id, "3f2504e0-4f89-11d3-9a0c-0305e82c3301");
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        let id = extract_device_id("https://x/MDMDEVICEID/abc-123/rest").unwrap();
        assert_eq!(id, "abc-123");
    }

    #[test]
    fn bare_id_passes_through() {
        assert_eq!(extract_device_id(" dev-42 ").unwrap(), "dev-42");
    }

    #[test]
    fn url_without_marker_is_rejected() {
        assert!(extract_device_id("https://intune.microsoft.com/#home").is_err());
        assert!(extract_policy_id(URL).is_err());
        assert!(extract_device_id("   ").is_err());
    }

    #[test]
    fn finds_policy_id() {
        let url = "https://intune.microsoft.com/#blade/policyId/9b1f-22/settings";
        assert_eq!(extract_policy_id(url).unwrap(), "9b1f-22");
    }
}
