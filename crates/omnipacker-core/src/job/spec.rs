//! What to download: app, platform, branch, login and archive options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform selector as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetOs {
    #[default]
    #[serde(rename = "Windows x64")]
    WindowsX64,
    #[serde(rename = "Windows x86")]
    WindowsX86,
    #[serde(rename = "Linux")]
    Linux,
    #[serde(rename = "macOS x64")]
    MacOsX64,
    #[serde(rename = "macOS arm64")]
    MacOsArm64,
}

impl TargetOs {
    pub fn label(self) -> &'static str {
        match self {
            TargetOs::WindowsX64 => "Windows x64",
            TargetOs::WindowsX86 => "Windows x86",
            TargetOs::Linux => "Linux",
            TargetOs::MacOsX64 => "macOS x64",
            TargetOs::MacOsArm64 => "macOS arm64",
        }
    }

    /// Downloader `-os` / `-osarch` values.
    pub fn downloader_os_arch(self) -> (&'static str, &'static str) {
        match self {
            TargetOs::WindowsX64 => ("windows", "64"),
            TargetOs::WindowsX86 => ("windows", "32"),
            TargetOs::Linux => ("linux", "64"),
            TargetOs::MacOsX64 => ("macos", "64"),
            TargetOs::MacOsArm64 => ("macos", "arm64"),
        }
    }

    /// Platform name used in output names and release notes.
    pub fn platform_name(self) -> &'static str {
        match self {
            TargetOs::WindowsX64 => "Win64",
            TargetOs::WindowsX86 => "Win32",
            TargetOs::Linux => "Linux64",
            TargetOs::MacOsX64 => "MacOS64",
            TargetOs::MacOsArm64 => "MacOSArm64",
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TargetOs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Windows x64" | "windows" | "win64" => Ok(TargetOs::WindowsX64),
            "Windows x86" | "win32" => Ok(TargetOs::WindowsX86),
            "Linux" | "linux" => Ok(TargetOs::Linux),
            "macOS x64" | "macOS" | "macos" => Ok(TargetOs::MacOsX64),
            "macOS arm64" | "macos-arm64" => Ok(TargetOs::MacOsArm64),
            other => Err(format!("unknown OS selector: {other}")),
        }
    }
}

/// Login fields captured when the job was queued.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub qr_enabled: bool,
    pub remember_password: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("qr_enabled", &self.qr_enabled)
            .field("remember_password", &self.remember_password)
            .finish()
    }
}

impl Credentials {
    pub fn is_anonymous(&self) -> bool {
        !self.qr_enabled && self.username.trim().is_empty()
    }
}

/// Archive step options.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// Leave the download as a plain directory.
    pub skip: bool,
    /// Optional archive password.
    pub password: Option<String>,
}

impl fmt::Debug for CompressionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionOptions")
            .field("skip", &self.skip)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// User-supplied job description, as queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub app_id: String,
    #[serde(default)]
    pub os: TargetOs,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub compression: CompressionOptions,
}

fn default_branch() -> String {
    "public".to_string()
}

impl JobSpec {
    pub fn new(app_id: impl Into<String>, os: TargetOs, branch: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            os,
            branch: branch.into(),
            credentials: Credentials::default(),
            compression: CompressionOptions::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_compression(mut self, compression: CompressionOptions) -> Self {
        self.compression = compression;
        self
    }

    /// Downloader arguments for this job and the given login snapshot.
    pub fn downloader_args(&self, credentials: &Credentials) -> Vec<String> {
        let mut args = Vec::new();

        if !self.app_id.is_empty() && self.app_id != "unknown" {
            args.push("-app".to_string());
            args.push(self.app_id.clone());
        }

        if !self.branch.is_empty() {
            args.push("-branch".to_string());
            args.push(self.branch.clone());
        }

        let (os, arch) = self.os.downloader_os_arch();
        args.push("-os".to_string());
        args.push(os.to_string());
        args.push("-osarch".to_string());
        args.push(arch.to_string());

        if credentials.qr_enabled {
            args.push("-qr".to_string());
        } else if !credentials.username.trim().is_empty() {
            args.push("-username".to_string());
            args.push(credentials.username.trim().to_string());
            if !credentials.password.is_empty() {
                args.push("-password".to_string());
                args.push(credentials.password.clone());
            }
            args.push("-remember-password".to_string());
        }

        args
    }
}

/// Copy of `args` safe for logs: the value after `-password` is masked.
pub fn redact_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            out.push("***".to_string());
            mask_next = false;
        } else if arg == "-password" {
            out.push(arg.clone());
            mask_next = true;
        } else if arg.len() > 2 && arg.starts_with("-p") {
            // 7z-style inline switch: -p<secret>
            out.push("-p***".to_string());
        } else {
            out.push(arg.clone());
        }
    }
    out
}
