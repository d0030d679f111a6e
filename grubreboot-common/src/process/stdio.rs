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

use std::{
    ffi::OsString,
    io::{BufReader, Read},
    os::unix::ffi::OsStringExt,
    process::{ChildStderr, ChildStdout},
    thread::JoinHandle,
};

use anyhow::{Context, Result};
use log::{log, Level};

use crate::io::BufReadOsLines;

#[derive(Debug, Clone, Copy)]
pub struct StdioLevel {
    pub(super) stdout: Option<Level>,
    pub(super) stderr: Option<Level>,
}

impl Default for StdioLevel {
    fn default() -> Self {
        Self {
            stdout: None,
            stderr: Some(Level::Error),
        }
    }
}

pub struct Stdio {
    name: String,
    stdout: ChildStdout,
    stderr: ChildStderr,
    level: StdioLevel,
}

impl Stdio {
    pub fn new(name: String, stdout: ChildStdout, stderr: ChildStderr, level: StdioLevel) -> Self {
        Self {
            name,
            stdout,
            stderr,
            level,
        }
    }

    fn read_stream<R: Read>(stream: R, level: Option<Level>) -> OsString {
        let mut buf = Vec::new();

        for line in BufReader::new(stream).os_lines().flatten() {
            if let Some(level) = level {
                log!(level, "{}", line.to_string_lossy());
            }
            buf.extend(line.into_vec());
            buf.push(b'\n');
        }
        if buf.ends_with(b"\n") {
            buf.pop();
        }

        OsString::from_vec(buf)
    }

    /// Drains stdout and stderr on background threads until both pipes close.
    pub fn capture(self) -> Result<JoinHandle<(OsString, OsString)>> {
        let Self {
            name,
            stdout,
            stderr,
            level,
        } = self;

        let thread_name = format!("{}-stdio", name);
        let thread = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || -> (OsString, OsString) {
                let stderr_thread =
                    std::thread::spawn(move || Self::read_stream(stderr, level.stderr));
                let stdout_buf = Self::read_stream(stdout, level.stdout);
                let stderr_buf = stderr_thread.join().unwrap_or_default();

                (stdout_buf, stderr_buf)
            })
            .with_context(|| format!("Failed to create thread {}", thread_name))?;

        Ok(thread)
    }
}
