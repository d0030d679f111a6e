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

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use log::info;

use grubreboot_common::process::Command;

use super::{Session, ShutdownDialog};
use crate::boot::BootEntry;

/// Shutdown dialog rendered on a terminal.
pub struct TerminalDialog<W> {
    output: W,
    reboot_command: Option<Vec<String>>,
}

impl<W: Write> TerminalDialog<W> {
    /// `reboot_command` runs once an entry was applied, `None` only reports it.
    pub fn new(output: W, reboot_command: Option<Vec<String>>) -> Self {
        Self {
            output,
            reboot_command,
        }
    }
}

impl<W: Write> ShutdownDialog for TerminalDialog<W> {
    fn on_buttons_needed(&mut self, entries: &[BootEntry]) {
        if entries.is_empty() {
            writeln!(self.output, "No boot entries available").ok();
            return;
        }
        for entry in entries {
            writeln!(self.output, "{}", entry).ok();
        }
    }

    fn on_cancel(&mut self) {
        writeln!(self.output, "Cancelled").ok();
    }

    fn confirm_reboot(&mut self) -> Result<()> {
        let reboot_command = match &self.reboot_command {
            Some(command) => command,
            None => {
                writeln!(self.output, "Next boot entry is set, reboot to apply")?;
                return Ok(());
            }
        };
        let (program, args) = reboot_command
            .split_first()
            .context("Reboot command is empty")?;

        info!("Rebooting...");
        Command::new(program)
            .args(args)
            .run()?
            .exit_ok()
            .context("Failed to reboot")
    }
}

/// Interactive picker loop, returns whether an entry was applied.
///
/// Choices are entry ordinals; an empty line or end of input cancels.
pub fn run_picker<R, W>(session: &mut Session<TerminalDialog<W>>, mut input: R) -> Result<bool>
where
    R: BufRead,
    W: Write,
{
    session.install();
    session.toggle_menu()?;

    loop {
        let entries = match session.entries() {
            Some(entries) if !entries.is_empty() => entries.to_vec(),
            _ => {
                session.cancel();
                return Ok(false);
            }
        };

        write!(
            session.dialog.output,
            "Reboot to [0-{}, empty to cancel]: ",
            entries.len() - 1
        )?;
        session.dialog.output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 || line.trim().is_empty() {
            session.cancel();
            return Ok(false);
        }

        let entry = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|ordinal| entries.get(ordinal));
        let title = match entry {
            Some(entry) => entry.title.as_str(),
            None => {
                writeln!(session.dialog.output, "Invalid choice \"{}\"", line.trim())?;
                continue;
            }
        };

        session.pick(title)?;
        if let Some(result) = session.wait()? {
            if result.succeeded {
                return Ok(true);
            }
            writeln!(
                session.dialog.output,
                "Failed to set next boot entry, exit_code={}",
                result.exit_status
            )?;
        }
    }
}

#[cfg(test)]
mod test {
    use std::{fs::write, io::Cursor, path::PathBuf};

    use tempfile::TempDir;

    use super::*;
    use crate::{config::Config, session::BootTargetService};

    const SAMPLE_CONFIG: &str = "\
menuentry 'Ubuntu' {
}
menuentry \"Windows Boot Manager\" {
}
";

    fn new_session(
        tmp_dir: &TempDir,
        pkexec: &str,
        reboot_command: Option<Vec<String>>,
    ) -> Session<TerminalDialog<Vec<u8>>> {
        let legacy_config = tmp_dir.path().join("grub.cfg");
        write(&legacy_config, SAMPLE_CONFIG).expect("Failed to write config");

        let mut config = Config::default();
        config.locator.firmware_marker = tmp_dir.path().join("efi");
        config.locator.legacy_config = legacy_config;
        config.helper.pkexec = PathBuf::from(pkexec);

        Session::new(
            BootTargetService::new(&config),
            TerminalDialog::new(Vec::new(), reboot_command),
        )
    }

    fn output(session: &Session<TerminalDialog<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&session.dialog.output).into_owned()
    }

    #[test]
    fn test_pick_entry() {
        let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut session = new_session(&tmp_dir, "true", None);

        let applied = run_picker(&mut session, Cursor::new("1\n")).expect("Picker failed");
        assert!(applied);

        let output = output(&session);
        assert!(output.contains("0\tUbuntu\n1\tWindows Boot Manager\n"));
        assert!(output.contains("Next boot entry is set"));
    }

    #[test]
    fn test_pick_and_reboot() {
        let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut session = new_session(&tmp_dir, "true", Some(vec![String::from("true")]));
        assert!(run_picker(&mut session, Cursor::new("0\n")).expect("Picker failed"));

        let mut session = new_session(&tmp_dir, "true", Some(vec![String::from("false")]));
        assert!(run_picker(&mut session, Cursor::new("0\n")).is_err());

        let mut session = new_session(&tmp_dir, "true", Some(Vec::new()));
        assert!(run_picker(&mut session, Cursor::new("0\n")).is_err());
    }

    #[test]
    fn test_cancel() {
        let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut session = new_session(&tmp_dir, "true", None);
        assert!(!run_picker(&mut session, Cursor::new("\n")).expect("Picker failed"));
        assert!(output(&session).ends_with("Cancelled\n"));

        let mut session = new_session(&tmp_dir, "true", None);
        assert!(!run_picker(&mut session, Cursor::new("")).expect("Picker failed"));
    }

    #[test]
    fn test_invalid_choice() {
        let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut session = new_session(&tmp_dir, "true", None);

        let applied = run_picker(&mut session, Cursor::new("9\nfoo\n\n")).expect("Picker failed");
        assert!(!applied);

        let output = output(&session);
        assert!(output.contains("Invalid choice \"9\""));
        assert!(output.contains("Invalid choice \"foo\""));
    }

    #[test]
    fn test_failure_allows_retry() {
        let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut session = new_session(&tmp_dir, "false", None);

        let applied = run_picker(&mut session, Cursor::new("0\n\n")).expect("Picker failed");
        assert!(!applied);

        let output = output(&session);
        assert!(output.contains("Failed to set next boot entry, exit_code=1"));
        assert_eq!(output.matches("0\tUbuntu\n").count(), 2);
        assert!(output.ends_with("Cancelled\n"));
    }

    #[test]
    fn test_no_entries() {
        let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.locator.firmware_marker = tmp_dir.path().join("efi");
        config.locator.legacy_config = tmp_dir.path().join("missing.cfg");

        let mut session = Session::new(
            BootTargetService::new(&config),
            TerminalDialog::new(Vec::new(), None),
        );
        assert!(!run_picker(&mut session, Cursor::new("0\n")).expect("Picker failed"));
        assert!(output(&session).starts_with("No boot entries available\n"));
    }
}
