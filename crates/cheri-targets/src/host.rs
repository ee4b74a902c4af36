//! Host platform detection.

use std::path::Path;
use std::process::Command;

/// The machine the build runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    /// FreeBSD, with the kernel release string when it could be read.
    FreeBsd {
        /// Output of `uname -r`, e.g. `11.1-RELEASE`.
        release: Option<String>,
    },
    /// Linux, with the contents of `/etc/os-release` when present.
    Linux {
        /// Raw `/etc/os-release`.
        os_release: String,
    },
    /// Anything else, by `std::env::consts::OS` name.
    Other(String),
}

impl HostPlatform {
    /// Detect the running host.
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "freebsd" => HostPlatform::FreeBsd {
                release: Command::new("uname")
                    .arg("-r")
                    .output()
                    .ok()
                    .filter(|o| o.status.success())
                    .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string()),
            },
            "linux" => {
                let os_release = Path::new("/etc/os-release");
                HostPlatform::Linux {
                    os_release: std::fs::read_to_string(os_release).unwrap_or_default(),
                }
            }
            other => HostPlatform::Other(other.to_string()),
        }
    }

    /// Whether the host is FreeBSD.
    pub fn is_freebsd(&self) -> bool {
        matches!(self, HostPlatform::FreeBsd { .. })
    }

    /// Whether the host is an Ubuntu Linux.
    pub fn is_ubuntu(&self) -> bool {
        matches!(self, HostPlatform::Linux { os_release } if os_release.contains("Ubuntu"))
    }

    /// Triple passed to `configure --build=`.
    pub fn build_triple(&self) -> String {
        match self {
            HostPlatform::FreeBsd { release } => {
                // Only the leading major number: "12-CURRENT" and "11.1-RELEASE" alike.
                let major: String = release
                    .as_deref()
                    .unwrap_or_default()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                format!("x86_64-unknown-freebsd{major}")
            }
            _ => "x86_64-unknown-linux-gnu".into(),
        }
    }
}
