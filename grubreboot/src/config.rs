// SPDX-License-Identifier: Mulan PSL v2
/*
 * Copyright (c) 2024 Huawei Technologies Co., Ltd.
 * grubreboot is licensed under Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *         http://license.coscl.org.cn/MulanPSL2
 *
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
 * EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
 * MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use grubreboot_common::fs;

const DEFAULT_FIRMWARE_MARKER: &str = "/sys/firmware/efi";
const DEFAULT_COMPAT_CONFIG: &str = "/etc/grub2-efi.cfg";
const DEFAULT_EFI_ROOT: &str = "/boot/efi";
const DEFAULT_LEGACY_CONFIG: &str = "/boot/grub/grub.cfg";

const DEFAULT_PKEXEC: &str = "/usr/bin/pkexec";
const DEFAULT_PKEXEC_USER: &str = "root";
const DEFAULT_GRUB_REBOOT: &str = "/usr/sbin/grub-reboot";

const DEFAULT_REBOOT_COMMAND: &[&str] = &["systemctl", "reboot"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Directory whose presence means the system booted in UEFI mode
    pub firmware_marker: PathBuf,
    /// Symlink used by some distributions to point at the EFI grub.cfg
    pub compat_config: PathBuf,
    /// Mount point of the EFI system partition
    pub efi_root: PathBuf,
    /// Fallback configuration
    pub legacy_config: PathBuf,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            firmware_marker: PathBuf::from(DEFAULT_FIRMWARE_MARKER),
            compat_config: PathBuf::from(DEFAULT_COMPAT_CONFIG),
            efi_root: PathBuf::from(DEFAULT_EFI_ROOT),
            legacy_config: PathBuf::from(DEFAULT_LEGACY_CONFIG),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub pkexec: PathBuf,
    pub user: String,
    pub grub_reboot: PathBuf,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            pkexec: PathBuf::from(DEFAULT_PKEXEC),
            user: DEFAULT_PKEXEC_USER.to_string(),
            grub_reboot: PathBuf::from(DEFAULT_GRUB_REBOOT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub reboot_command: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reboot_command: DEFAULT_REBOOT_COMMAND
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locator: LocatorConfig,
    pub helper: HelperConfig,
    pub session: SessionConfig,
}

impl Config {
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        let instance = serde_yaml::from_reader(fs::open_file(config_path)?)
            .map_err(|e| anyhow!("Failed to parse config {}, {}", config_path.display(), e))?;

        Ok(instance)
    }

    /// Reads the config file, or falls back to defaults if it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        if fs::symlink_metadata(config_path).is_err() {
            debug!(
                "Config {} does not exist, using default configuration",
                config_path.display()
            );
            return Ok(Self::default());
        }

        Self::parse(config_path)
    }
}
