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

use std::{
    ffi::OsString,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread::{self, JoinHandle},
};

use log::{debug, error, info, Level};

use grubreboot_common::process::Command;

use crate::config::HelperConfig;

/// Exit status reported when the helper could not be started at all.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionResult {
    pub exit_status: i32,
    pub succeeded: bool,
}

impl SelectionResult {
    pub fn from_exit_code(exit_status: i32) -> Self {
        Self {
            exit_status,
            succeeded: exit_status == 0,
        }
    }

    pub fn launch_failure() -> Self {
        Self::from_exit_code(LAUNCH_FAILURE_EXIT_CODE)
    }
}

/// Handle of an outstanding apply.
pub struct PendingSelection {
    title: String,
    receiver: Receiver<SelectionResult>,
}

impl PendingSelection {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the result once the helper has exited, without blocking.
    pub fn try_result(&self) -> Option<SelectionResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(SelectionResult::launch_failure()),
        }
    }

    pub fn wait(self) -> SelectionResult {
        self.receiver
            .recv()
            .unwrap_or_else(|_| SelectionResult::launch_failure())
    }
}

/// Sets the next boot entry through `pkexec --user root grub-reboot <title>`.
///
/// The title travels as a single argv element and no shell is involved.
#[derive(Debug, Clone)]
pub struct SelectionApplier {
    config: HelperConfig,
}

impl SelectionApplier {
    pub fn new(config: HelperConfig) -> Self {
        Self { config }
    }

    pub fn command_line(&self, title: &str) -> Vec<OsString> {
        vec![
            self.config.pkexec.clone().into_os_string(),
            OsString::from("--user"),
            OsString::from(&self.config.user),
            self.config.grub_reboot.clone().into_os_string(),
            OsString::from(title),
        ]
    }

    fn display_command_line(&self, title: &str) -> String {
        let args = self
            .command_line(title)
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>();

        shlex::try_join(args.iter().map(String::as_str)).unwrap_or_else(|_| format!("{:?}", args))
    }

    fn run(&self, title: &str) -> SelectionResult {
        let mut args = self.command_line(title).into_iter();
        let program = match args.next() {
            Some(program) => program,
            None => return SelectionResult::launch_failure(),
        };

        let output = Command::new(program)
            .args(args)
            .stdout(Level::Debug)
            .stderr(Level::Error)
            .run_with_output();

        match output {
            Ok(output) => SelectionResult::from_exit_code(output.exit_code()),
            Err(e) => {
                error!("{:#}", e);
                SelectionResult::launch_failure()
            }
        }
    }

    /// Launches the helper on a worker thread and hands its result to
    /// `on_complete` exactly once.
    pub fn apply_with<F>(&self, title: &str, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(SelectionResult) + Send + 'static,
    {
        debug!("Executing {}", self.display_command_line(title));

        let applier = self.clone();
        let title = title.to_owned();
        thread::spawn(move || {
            let result = applier.run(&title);
            match result.succeeded {
                true => info!("Next boot entry set to \"{}\"", title),
                false => error!(
                    "Failed to set next boot entry to \"{}\", exit_code={}",
                    title, result.exit_status
                ),
            }
            on_complete(result);
        })
    }

    pub fn apply(&self, title: &str) -> PendingSelection {
        let (sender, receiver) = mpsc::channel();
        self.apply_with(title, move |result| {
            // Receiver may already be gone if the picker was dismissed
            let _ = sender.send(result);
        });

        PendingSelection {
            title: title.to_owned(),
            receiver,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use super::*;

    fn applier(pkexec: &str) -> SelectionApplier {
        SelectionApplier::new(HelperConfig {
            pkexec: PathBuf::from(pkexec),
            ..HelperConfig::default()
        })
    }

    #[test]
    fn test_command_line() {
        let args = SelectionApplier::new(HelperConfig::default()).command_line("Ubuntu");

        assert_eq!(
            args,
            vec![
                "/usr/bin/pkexec",
                "--user",
                "root",
                "/usr/sbin/grub-reboot",
                "Ubuntu"
            ]
        );
    }

    #[test]
    fn test_command_line_keeps_title_as_one_argument() {
        let title = "Ubuntu'; rm -rf / #$(reboot)";
        let args = applier("true").command_line(title);

        assert_eq!(args.len(), 5);
        assert_eq!(args[4], title);
    }

    #[test]
    fn test_display_command_line_quotes_title() {
        let title = "Windows Boot Manager 'quoted' $(title)";
        let line = applier("/usr/bin/pkexec").display_command_line(title);

        let args = shlex::split(&line).expect("Failed to split");
        assert_eq!(
            args,
            vec![
                "/usr/bin/pkexec",
                "--user",
                "root",
                "/usr/sbin/grub-reboot",
                title
            ]
        );
    }

    #[test]
    fn test_apply_success() {
        let result = applier("true").apply("Ubuntu").wait();

        assert_eq!(
            result,
            SelectionResult {
                exit_status: 0,
                succeeded: true,
            }
        );
    }

    #[test]
    fn test_apply_failure() {
        let result = applier("false").apply("Ubuntu").wait();

        assert_eq!(result.exit_status, 1);
        assert!(!result.succeeded);
    }

    #[test]
    fn test_apply_missing_binary() {
        let result = applier("/nonexistent/pkexec").apply("Ubuntu").wait();

        assert_eq!(result.exit_status, LAUNCH_FAILURE_EXIT_CODE);
        assert!(!result.succeeded);
    }

    #[test]
    fn test_apply_title_with_nul() {
        let result = applier("true").apply("Ubuntu\0").wait();
        assert!(!result.succeeded);
    }

    #[test]
    fn test_apply_with_callback_once() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let results_clone = results.clone();

        applier("true")
            .apply_with("Ubuntu", move |result| {
                results_clone.lock().unwrap().push(result)
            })
            .join()
            .expect("Worker panicked");

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].succeeded);
    }

    #[test]
    fn test_try_result_eventually_ready() {
        let pending = applier("true").apply("Ubuntu");
        assert_eq!(pending.title(), "Ubuntu");

        let result = loop {
            if let Some(result) = pending.try_result() {
                break result;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        };
        assert!(result.succeeded);
    }

    #[test]
    fn test_concurrent_applies() {
        let first = applier("true").apply("Ubuntu");
        let second = applier("false").apply("Windows Boot Manager");

        assert!(!second.wait().succeeded);
        assert!(first.wait().succeeded);
    }
}
