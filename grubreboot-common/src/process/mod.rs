// SPDX-License-Identifier: Mulan PSL v2
/*
 * Copyright (c) 2024 Huawei Technologies Co., Ltd.
 * grubreboot-common is licensed under Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *         http://license.coscl.org.cn/MulanPSL2
 *
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
 * EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
 * MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::{ffi::OsStr, path::Path, process};

use anyhow::{Context, Result};
use log::{trace, Level};

mod child;
mod stdio;

pub use child::{Child, ExitStatus, Output};
pub use stdio::StdioLevel;

pub struct Command {
    inner: process::Command,
    stdio_level: StdioLevel,
}

impl Command {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            inner: process::Command::new(program),
            stdio_level: StdioLevel::default(),
        }
    }

    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg.as_ref());
        }
        self
    }

    pub fn stdout(&mut self, level: Level) -> &mut Self {
        self.stdio_level.stdout = Some(level);
        self
    }

    pub fn stderr(&mut self, level: Level) -> &mut Self {
        self.stdio_level.stderr = Some(level);
        self
    }

    pub fn pipe_output(&mut self) -> &mut Self {
        self.inner
            .stdout(process::Stdio::piped())
            .stderr(process::Stdio::piped());
        self
    }

    pub fn ignore_output(&mut self) -> &mut Self {
        self.inner
            .stdout(process::Stdio::null())
            .stderr(process::Stdio::null());
        self
    }

    pub fn spawn(&mut self) -> Result<Child> {
        let name = Path::new(self.inner.get_program())
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        trace!("Executing {:?}", self.inner);
        let inner = self
            .inner
            .spawn()
            .with_context(|| format!("Failed to start {}", name))?;

        Ok(Child {
            id: inner.id(),
            name,
            stdio_level: self.stdio_level,
            inner,
        })
    }

    pub fn run(&mut self) -> Result<ExitStatus> {
        self.ignore_output().spawn()?.wait()
    }

    pub fn run_with_output(&mut self) -> Result<Output> {
        self.pipe_output().spawn()?.wait_with_output()
    }
}
