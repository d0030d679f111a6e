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
    ffi::OsStr,
    io::{BufRead, BufReader},
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::bytes::Regex;

use grubreboot_common::{
    fs,
    io::{BufReadOsLines, OsLines},
};

use super::BootEntry;

pub const MAX_SCANNED_LINES: usize = 600;

/// The grub config could not be opened.
#[derive(Debug)]
pub struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cannot read boot entries from {}", self.path.display())
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Streams top-level `menuentry` titles out of a grub config.
///
/// Only lines starting with `menuentry` qualify, so indented entries inside
/// a `submenu` block and commented-out entries are skipped. The title runs
/// from the opening quote up to the next `'` or `"`, whichever style it is;
/// escapes are not interpreted. Scanning stops after [`MAX_SCANNED_LINES`]
/// lines.
pub struct EntryParser<R> {
    lines: OsLines<R>,
    scanned_lines: usize,
    next_ordinal: usize,
    is_finished: bool,
}

impl<R: BufRead> EntryParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.os_lines(),
            scanned_lines: 0,
            next_ordinal: 0,
            is_finished: false,
        }
    }

    pub fn scanned_lines(&self) -> usize {
        self.scanned_lines
    }

    #[inline(always)]
    fn parse_title(line: &OsStr) -> Option<String> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r#"(?-u)^menuentry\s+['"]([^'"]+)"#).unwrap();
        }
        RE.captures(line.as_bytes())
            .and_then(|captures| captures.get(1))
            .map(|matched| String::from_utf8_lossy(matched.as_bytes()).into_owned())
    }
}

impl<R: BufRead> Iterator for EntryParser<R> {
    type Item = BootEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.is_finished && self.scanned_lines < MAX_SCANNED_LINES {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    warn!("Failed to read line {}, {}", self.scanned_lines + 1, e);
                    self.is_finished = true;
                    break;
                }
                None => {
                    self.is_finished = true;
                    break;
                }
            };
            self.scanned_lines += 1;

            if let Some(title) = Self::parse_title(&line) {
                let entry = BootEntry {
                    title,
                    ordinal: self.next_ordinal,
                };
                self.next_ordinal += 1;

                return Some(entry);
            }
        }

        None
    }
}

pub fn parse_reader<R: BufRead>(reader: R) -> Vec<BootEntry> {
    let mut parser = EntryParser::new(reader);
    let entries = parser.by_ref().collect::<Vec<_>>();

    if parser.scanned_lines() >= MAX_SCANNED_LINES {
        debug!("Stopped scanning after {} lines", parser.scanned_lines());
    }
    entries
}

pub fn parse<P: AsRef<Path>>(path: P) -> Result<Vec<BootEntry>, ReadError> {
    let config_path = path.as_ref();
    let file = fs::open_file(config_path).map_err(|source| ReadError {
        path: config_path.to_path_buf(),
        source,
    })?;

    let entries = parse_reader(BufReader::new(file));
    debug!(
        "Found {} boot entries in {}",
        entries.len(),
        config_path.display()
    );

    Ok(entries)
}
