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

use std::{io, sync::mpsc};

use anyhow::{bail, Context, Result};
use flexi_logger::{LogSpecification, Logger, WriteMode};
use log::{debug, error, info, LevelFilter};

use grubreboot::{
    config::Config,
    session::{self, BootTargetService, Session, ShutdownDialog, TerminalDialog},
};
use grubreboot_common::os;

mod args;

use self::args::{Arguments, SubCommand};

pub const CLI_NAME: &str = env!("CARGO_PKG_NAME");
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CLI_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");
pub const CLI_UMASK: u32 = 0o022;

fn reboot_command(config: &Config, reboot: bool) -> Option<Vec<String>> {
    match reboot {
        true => Some(config.session.reboot_command.clone()),
        false => None,
    }
}

fn main() -> Result<()> {
    // Parse arguments
    let args = Arguments::new()?;

    // Set up environments
    os::umask::set_umask(CLI_UMASK);

    // Initialize logger
    let max_log_level = if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    let log_spec = LogSpecification::builder().default(max_log_level).build();
    let _ = Logger::with(log_spec)
        .log_to_stdout()
        .format(|w, _, record| write!(w, "{}", record.args()))
        .write_mode(WriteMode::Direct)
        .start()
        .context("Failed to initialize logger")?;

    debug!("Start with {:#?}", args);
    let config = Config::load(&args.config)?;
    debug!("Using {:#?}", config);

    let service = BootTargetService::new(&config);
    match args.subcommand {
        SubCommand::Locate => {
            info!("{}", service.locate().display());
        }
        SubCommand::List => {
            let entries = match service.discover_entries() {
                Ok(entries) => entries,
                Err(e) => {
                    error!("{:#}", anyhow::Error::from(e));
                    bail!("No boot entries available");
                }
            };
            for entry in entries {
                info!("{}", entry);
            }
        }
        SubCommand::Set { title, reboot } => {
            let (sender, receiver) = mpsc::channel();
            service.select_entry(&title, move |succeeded| {
                sender.send(succeeded).ok();
            });
            if !receiver.recv().unwrap_or(false) {
                bail!("Failed to set next boot entry to \"{}\"", title);
            }

            let mut dialog = TerminalDialog::new(io::stdout(), reboot_command(&config, reboot));
            dialog.confirm_reboot()?;
        }
        SubCommand::Pick { reboot } => {
            let dialog = TerminalDialog::new(io::stdout(), reboot_command(&config, reboot));
            let mut session = Session::new(service, dialog);

            let stdin = io::stdin();
            session::run_picker(&mut session, stdin.lock())?;
            session.uninstall();
        }
    }

    Ok(())
}
