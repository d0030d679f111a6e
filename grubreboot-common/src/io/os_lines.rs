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

use std::{ffi::OsString, io::BufRead, os::unix::prelude::OsStringExt};

/// Line iterator yielding raw bytes, so non UTF-8 content never aborts reading.
pub struct OsLines<R> {
    buf: R,
}

impl<R: BufRead> Iterator for OsLines<R> {
    type Item = std::io::Result<OsString>;

    fn next(&mut self) -> Option<Self::Item> {
        const CHAR_LF: [u8; 1] = [b'\n'];
        const CHAR_CR: [u8; 1] = [b'\r'];

        let mut buf = Vec::new();
        match self.buf.read_until(CHAR_LF[0], &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                // Drop "\n" or "\r\n" on the buf tail
                if buf.ends_with(&CHAR_LF) {
                    buf.pop();
                    if buf.ends_with(&CHAR_CR) {
                        buf.pop();
                    }
                }
                buf.shrink_to_fit();
                Some(Ok(OsString::from_vec(buf)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: BufRead> From<R> for OsLines<R> {
    fn from(buf: R) -> Self {
        Self { buf }
    }
}

pub trait BufReadOsLines: BufRead {
    fn os_lines(self) -> OsLines<Self>
    where
        Self: Sized,
    {
        OsLines::from(self)
    }
}

impl<R: BufRead> BufReadOsLines for R {}

#[cfg(test)]
mod test {
    use std::{ffi::OsStr, io::Cursor, os::unix::ffi::OsStrExt};

    use super::*;

    #[test]
    fn test_line_endings() {
        let lines = Cursor::new("first\r\nsecond\n\nlast")
            .os_lines()
            .collect::<std::io::Result<Vec<_>>>()
            .expect("Failed to read lines");

        assert_eq!(lines, vec!["first", "second", "", "last"]);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut lines = Cursor::new(b"menuentry '\xff'\nnext\n".to_vec()).os_lines();

        let first = lines.next().expect("No line").expect("Read failed");
        assert_eq!(first, OsStr::from_bytes(b"menuentry '\xff'"));
        assert_eq!(lines.next().expect("No line").expect("Read failed"), "next");
        assert!(lines.next().is_none());
    }
}
