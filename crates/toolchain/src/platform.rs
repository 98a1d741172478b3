//! Platform detection for binary downloads.
//!
//! Maps the Rust target's OS/arch onto the names HashiCorp uses for its
//! release builds.
//!
//! ```
//! use toolchain::platform;
//!
//! let platform = platform::detect().expect("unsupported platform");
//! println!("Running on: {}", platform);
//! ```

use crate::error::{Error, Result};
use crate::types::Platform;

/// Detect the current platform.
///
/// | Rust OS   | Rust arch | Release OS | Release arch |
/// |-----------|-----------|------------|--------------|
/// | macos     | aarch64   | darwin     | arm64        |
/// | macos     | x86_64    | darwin     | amd64        |
/// | linux     | aarch64   | linux      | arm64        |
/// | linux     | x86_64    | linux      | amd64        |
/// | linux     | x86       | linux      | 386          |
/// | linux     | arm       | linux      | arm          |
/// | freebsd   | x86_64    | freebsd    | amd64        |
/// | windows   | x86_64    | windows    | amd64        |
///
/// # Errors
///
/// Returns `Error::UnsupportedPlatform` if the current platform is not supported.
pub fn detect() -> Result<Platform> {
    from_parts(std::env::consts::OS, std::env::consts::ARCH)
}

/// Map a Rust OS/arch pair to a release platform.
pub fn from_parts(os: &str, arch: &str) -> Result<Platform> {
    let (release_os, release_arch) = match (os, arch) {
        ("macos", "aarch64") => ("darwin", "arm64"),
        ("macos", "x86_64") => ("darwin", "amd64"),

        ("linux", "aarch64") => ("linux", "arm64"),
        ("linux", "x86_64") => ("linux", "amd64"),
        ("linux", "x86") => ("linux", "386"),
        ("linux", "arm") => ("linux", "arm"),

        ("freebsd", "x86_64") => ("freebsd", "amd64"),

        ("windows", "x86_64") => ("windows", "amd64"),
        ("windows", "x86") => ("windows", "386"),

        _ => {
            return Err(Error::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            });
        }
    };

    Ok(Platform::new(release_os, release_arch))
}

/// Get the file extension for executables on this platform.
///
/// Returns ".exe" on Windows, empty string on other platforms.
#[must_use]
pub fn executable_extension() -> &'static str {
    if std::env::consts::OS == "windows" {
        ".exe"
    } else {
        ""
    }
}
