//! ChromeDriver download and lookup.

use serde_json::Value;
use std::error::Error;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Chrome-for-Testing index of the latest known-good builds
pub const VERSIONS_URL: &str = "https://googlechromelabs.github.io/chrome-for-testing/last-known-good-versions-with-downloads.json";

#[cfg(windows)]
const BINARY_NAME: &str = "chromedriver.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "chromedriver";

/// Chrome-for-Testing platform key for an OS/architecture pair as reported
/// by `std::env::consts`
pub fn platform_key(os: &str, arch: &str) -> Option<&'static str> {
    let arch = arch.to_lowercase();
    match os {
        "windows" => Some(if arch.contains("64") { "win64" } else { "win32" }),
        "linux" => Some("linux64"),
        "macos" if arch.contains("arm") || arch.contains("aarch") => Some("mac-arm64"),
        "macos" => Some("mac-x64"),
        _ => None,
    }
}

/// Stable-channel ChromeDriver download for `platform`
pub fn download_url(index: &Value, platform: &str) -> Option<String> {
    index
        .pointer("/channels/Stable/downloads/chromedriver")?
        .as_array()?
        .iter()
        .find(|item| item["platform"] == platform)
        .and_then(|item| item["url"].as_str())
        .map(|url| url.to_string())
}

/// Fetch the latest stable ChromeDriver and unpack it under `dir`.
/// Returns the path of the unpacked binary.
pub async fn update(dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    let platform =
        platform_key(os, arch).ok_or_else(|| format!("unsupported platform: {} ({})", os, arch))?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;

    let index: Value = http
        .get(VERSIONS_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let url = download_url(&index, platform)
        .ok_or_else(|| format!("no ChromeDriver download for platform {}", platform))?;

    ::log::info!("Downloading {}", url);
    let archive = http.get(&url).send().await?.error_for_status()?.bytes().await?;

    std::fs::create_dir_all(dir)?;
    zip::ZipArchive::new(Cursor::new(archive))?.extract(dir)?;
    ::log::info!("Extracted into {}", dir.display());

    let binary = find_in_dir(dir).ok_or_else(|| {
        format!("archive from {} held no {}", url, BINARY_NAME)
    })?;
    make_executable(&binary)?;
    ::log::info!("ChromeDriver ready: {}", binary.display());
    Ok(binary)
}

/// ChromeDriver under `dir` (searched recursively), else on `PATH`
pub fn find_binary(dir: &Path) -> Option<PathBuf> {
    find_in_dir(dir).or_else(find_on_path)
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == BINARY_NAME)
        .map(|entry| entry.into_path())
}

fn find_on_path() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(BINARY_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_key() {
        assert_eq!(platform_key("linux", "x86_64"), Some("linux64"));
        assert_eq!(platform_key("macos", "aarch64"), Some("mac-arm64"));
        assert_eq!(platform_key("macos", "x86_64"), Some("mac-x64"));
        assert_eq!(platform_key("windows", "x86_64"), Some("win64"));
        assert_eq!(platform_key("windows", "x86"), Some("win32"));
        assert_eq!(platform_key("freebsd", "x86_64"), None);
    }

    #[test]
    fn test_download_url() {
        let index = json!({
            "channels": {"Stable": {"version": "131.0.6778.85", "downloads": {"chromedriver": [
                {"platform": "linux64", "url": "https://cdn.example/linux64/chromedriver-linux64.zip"},
                {"platform": "mac-arm64", "url": "https://cdn.example/mac-arm64/chromedriver-mac-arm64.zip"}
            ]}}}
        });
        assert_eq!(
            download_url(&index, "mac-arm64").as_deref(),
            Some("https://cdn.example/mac-arm64/chromedriver-mac-arm64.zip")
        );
        assert_eq!(download_url(&index, "win32"), None);
        assert_eq!(download_url(&json!({}), "linux64"), None);
    }

    #[test]
    fn test_find_binary_in_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("chromedriver-linux64");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("LICENSE.chromedriver"), "license").unwrap();
        std::fs::write(nested.join(BINARY_NAME), "bin").unwrap();

        assert_eq!(find_in_dir(dir.path()), Some(nested.join(BINARY_NAME)));
    }

    #[test]
    fn test_empty_dir_has_no_binary() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_in_dir(dir.path()), None);
    }
}
