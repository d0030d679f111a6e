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

use std::path::PathBuf;

use log::{debug, trace};

use grubreboot_common::fs;

use crate::config::LocatorConfig;

const GRUB_CFG_NAME: &str = "grub.cfg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootType {
    Csm,
    Uefi,
}

/// Resolves the grub.cfg which describes the current boot menu.
///
/// Nothing is cached, firmware mode and mounts may differ between runs.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    config: LocatorConfig,
}

impl ConfigLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn boot_type(&self) -> BootType {
        match fs::is_dir(&self.config.firmware_marker) {
            true => BootType::Uefi,
            false => BootType::Csm,
        }
    }

    /// Fedora derivatives link /etc/grub2-efi.cfg to the EFI install.
    fn uses_compat_link(&self) -> bool {
        fs::is_symlink(&self.config.compat_config)
    }

    fn find_efi_config(&self) -> Option<PathBuf> {
        let efi_root = &self.config.efi_root;

        match fs::find_file(efi_root, GRUB_CFG_NAME, fs::FindOptions { recursive: true }) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    /// Always yields a path, a missing file is reported by the parser.
    pub fn locate(&self) -> PathBuf {
        let boot_type = self.boot_type();
        debug!("Boot type: {:?}", boot_type);

        if boot_type == BootType::Uefi && self.uses_compat_link() {
            trace!(
                "Found {}, searching {}...",
                self.config.compat_config.display(),
                self.config.efi_root.display()
            );
            if let Some(path) = self.find_efi_config() {
                debug!("Using grub config {}", path.display());
                return path;
            }
        }

        let path = self.config.legacy_config.clone();
        debug!("Using grub config {}", path.display());

        path
    }
}
