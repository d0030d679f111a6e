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

use anyhow::Result;
use clap::{AppSettings, ColorChoice, Parser, Subcommand};

use grubreboot_common::fs;

use super::{CLI_ABOUT, CLI_NAME, CLI_VERSION};

const DEFAULT_CONFIG_FILE: &str = "/etc/grubreboot.yaml";

#[derive(Parser, Debug)]
#[clap(
    bin_name = CLI_NAME,
    version = CLI_VERSION,
    about = CLI_ABOUT,
    arg_required_else_help(true),
    color(ColorChoice::Never),
    disable_help_subcommand(true),
    global_setting(AppSettings::DeriveDisplayOrder),
    term_width(120),
)]
pub struct Arguments {
    /// Command name
    #[clap(subcommand)]
    pub subcommand: SubCommand,

    /// Path for configuration file
    #[clap(short, long, default_value=DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Provide more detailed info
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SubCommand {
    /// Show the grub configuration in use
    Locate,
    /// List boot entries
    List,
    /// Set the boot entry for the next boot
    Set {
        /// Boot entry title
        #[clap(required = true)]
        title: String,
        /// Reboot once the entry is set
        #[clap(short, long)]
        reboot: bool,
    },
    /// Choose the boot entry for the next boot interactively
    Pick {
        /// Reboot once the entry is set
        #[clap(short, long)]
        reboot: bool,
    },
}

impl Arguments {
    pub fn new() -> Result<Self> {
        Self::parse().normalize_path()
    }

    fn normalize_path(mut self) -> Result<Self> {
        self.config = fs::normalize(&self.config)?;

        Ok(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_set() {
        let args = Arguments::try_parse_from([CLI_NAME, "-v", "set", "Windows Boot Manager", "-r"])
            .expect("Failed to parse");

        assert!(args.verbose);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        match args.subcommand {
            SubCommand::Set { title, reboot } => {
                assert_eq!(title, "Windows Boot Manager");
                assert!(reboot);
            }
            other => panic!("Unexpected subcommand {:?}", other),
        }
    }

    #[test]
    fn test_parse_config() {
        let args = Arguments::try_parse_from([CLI_NAME, "--config", "./grubreboot.yaml", "list"])
            .expect("Failed to parse")
            .normalize_path()
            .expect("Failed to normalize");

        assert!(args.config.is_absolute());
        assert!(args.config.ends_with("grubreboot.yaml"));
        assert!(matches!(args.subcommand, SubCommand::List));
    }

    #[test]
    fn test_parse_missing_title() {
        assert!(Arguments::try_parse_from([CLI_NAME, "set"]).is_err());
    }
}
