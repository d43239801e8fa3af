// SPDX-License-Identifier: CEPL-1.0
use std::path::Path;
use std::{fs, io};

use anyhow::{Context, Result};
use cubic_present_vk::{DevicePolicy, NegotiationConfig, VkVsyncMode};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct AppCfg {
    #[serde(default)]
    pub window: WindowCfg,
    #[serde(default)]
    pub present: PresentCfg,
    #[serde(default)]
    pub debug: DebugCfg,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowCfg {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct PresentCfg {
    #[serde(default = "default_vsync")]
    pub vsync: bool,
    #[serde(default)]
    pub vsync_mode: VsyncMode,
    #[serde(default)]
    pub device_policy: DevicePolicyCfg,
    #[serde(default)]
    pub extra_device_extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugCfg {
    pub validation: bool,
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VsyncMode {
    Fifo,
    #[default]
    Mailbox,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DevicePolicyCfg {
    #[default]
    FirstSuitable,
    PreferDiscrete,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: "cubic".to_owned(),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for PresentCfg {
    fn default() -> Self {
        PresentCfg {
            vsync: true,
            vsync_mode: VsyncMode::Mailbox,
            device_policy: DevicePolicyCfg::FirstSuitable,
            extra_device_extensions: Vec::new(),
        }
    }
}

impl Default for DebugCfg {
    fn default() -> Self {
        DebugCfg {
            validation: cfg!(debug_assertions),
            log_filter: cubic_core::DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

fn default_vsync() -> bool {
    true
}

impl AppCfg {
    /// Negotiation parameters for this run. `force_validation` comes from the CLI.
    pub fn negotiation(&self, force_validation: bool) -> NegotiationConfig {
        let mut n = NegotiationConfig {
            app_name: self.window.title.clone(),
            validation: self.debug.validation || force_validation,
            device_policy: match self.present.device_policy {
                DevicePolicyCfg::FirstSuitable => DevicePolicy::FirstSuitable,
                DevicePolicyCfg::PreferDiscrete => DevicePolicy::PreferDiscrete,
            },
            vsync: self.present.vsync,
            vsync_mode: match self.present.vsync_mode {
                VsyncMode::Fifo => VkVsyncMode::Fifo,
                VsyncMode::Mailbox => VkVsyncMode::Mailbox,
            },
            ..NegotiationConfig::default()
        };
        for ext in &self.present.extra_device_extensions {
            n.require_extension(ext);
        }
        n
    }
}

/// Reads `path`. `Ok(None)` means the file does not exist; anything else
/// unreadable or malformed is an error the caller may choose to survive.
pub fn load_cfg(path: &Path) -> Result<Option<AppCfg>> {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    toml::from_str(&text)
        .map(Some)
        .with_context(|| format!("parsing {}", path.display()))
}

/// The configuration to run with, plus the reason when it is the defaults.
/// Callers log the reason once tracing is up.
pub fn load_or_default(path: &Path) -> (AppCfg, Option<String>) {
    match load_cfg(path) {
        Ok(Some(cfg)) => (cfg, None),
        Ok(None) => (
            AppCfg::default(),
            Some(format!("{} not found", path.display())),
        ),
        Err(e) => (AppCfg::default(), Some(format!("{e:#}"))),
    }
}
