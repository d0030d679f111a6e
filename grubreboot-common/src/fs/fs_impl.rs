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
    collections::HashSet,
    env,
    ffi::OsStr,
    fs::{File, FileType, Metadata, ReadDir},
    io,
    os::unix::fs::MetadataExt,
    path::{Component, Path, PathBuf},
};

use log::trace;

trait RewriteError {
    fn rewrite_err(self, err_msg: String) -> Self;
}

impl<T> RewriteError for io::Result<T> {
    #[inline]
    fn rewrite_err(self, err_msg: String) -> Self {
        self.map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("{}, {}", err_msg, e.to_string().to_lowercase()),
            )
        })
    }
}

/* std::fs functions */
#[inline]
pub fn metadata<P: AsRef<Path>>(path: P) -> io::Result<Metadata> {
    std::fs::metadata(&path).rewrite_err(format!("Cannot access {}", path.as_ref().display()))
}

#[inline]
pub fn symlink_metadata<P: AsRef<Path>>(path: P) -> io::Result<Metadata> {
    std::fs::symlink_metadata(&path)
        .rewrite_err(format!("Cannot access {}", path.as_ref().display()))
}

#[inline]
pub fn read_dir<P: AsRef<Path>>(path: P) -> io::Result<ReadDir> {
    std::fs::read_dir(&path)
        .rewrite_err(format!("Cannot read directory {}", path.as_ref().display()))
}

/* Extended functions */
pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::open(&path).rewrite_err(format!("Cannot open file {}", path.as_ref().display()))
}

/// Returns the file type of `path` without following a trailing symlink.
pub fn file_type<P: AsRef<Path>>(path: P) -> io::Result<FileType> {
    self::symlink_metadata(path).map(|metadata| metadata.file_type())
}

pub fn is_dir<P: AsRef<Path>>(path: P) -> bool {
    self::file_type(path)
        .map(|file_type| file_type.is_dir())
        .unwrap_or(false)
}

pub fn is_symlink<P: AsRef<Path>>(path: P) -> bool {
    self::file_type(path)
        .map(|file_type| file_type.is_symlink())
        .unwrap_or(false)
}

pub fn normalize<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let mut new_path = PathBuf::new();

    let orig_path = path.as_ref();
    if orig_path.as_os_str().is_empty() {
        return Ok(new_path);
    }

    if orig_path.is_relative() {
        new_path.push(env::current_dir()?);
    }

    for component in orig_path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                new_path.pop();
                if !new_path.has_root() {
                    new_path.push(Component::RootDir);
                }
            }
            _ => {
                new_path.push(component);
            }
        }
    }

    Ok(new_path)
}

#[derive(Clone, Copy)]
pub struct FindOptions {
    pub recursive: bool,
}

/// Depth-first search in directory enumeration order.
///
/// A subdirectory is descended into as soon as it is enumerated, and the
/// first path accepted by `predicate` ends the whole walk. Symlinks are
/// followed, each directory is entered at most once. Entries which cannot be
/// resolved and subdirectories which cannot be read are skipped.
pub fn find<P, F>(directory: P, options: FindOptions, predicate: F) -> io::Result<Option<PathBuf>>
where
    P: AsRef<Path>,
    F: Fn(&FileType, &Path) -> bool + Copy,
{
    let mut visited = HashSet::new();
    if let Ok(metadata) = self::metadata(&directory) {
        visited.insert((metadata.dev(), metadata.ino()));
    }

    find_impl(directory.as_ref(), options, predicate, &mut visited)
}

fn find_impl<F>(
    directory: &Path,
    options: FindOptions,
    predicate: F,
    visited: &mut HashSet<(u64, u64)>,
) -> io::Result<Option<PathBuf>>
where
    F: Fn(&FileType, &Path) -> bool + Copy,
{
    for dir_entry in read_dir(directory)?.flatten() {
        let file_path = dir_entry.path();
        let metadata = match self::metadata(&file_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!("Skipped {}", e);
                continue;
            }
        };
        let file_type = metadata.file_type();

        if predicate(&file_type, &file_path) {
            return Ok(Some(file_path));
        }
        if !options.recursive || !file_type.is_dir() {
            continue;
        }
        if !visited.insert((metadata.dev(), metadata.ino())) {
            trace!("Skipped {}, already visited", file_path.display());
            continue;
        }
        match find_impl(&file_path, options, predicate, visited) {
            Ok(Some(path)) => return Ok(Some(path)),
            Ok(None) => {}
            Err(e) => trace!("Skipped {}, {}", file_path.display(), e),
        }
    }

    Ok(None)
}

pub fn find_file<P, S>(directory: P, name: S, options: FindOptions) -> io::Result<PathBuf>
where
    P: AsRef<Path>,
    S: AsRef<OsStr>,
{
    let result = find(&directory, options, |file_type, file_path| -> bool {
        if !file_type.is_file() {
            return false;
        }
        file_path
            .file_name()
            .map(|file_name| file_name == name.as_ref())
            .unwrap_or(false)
    })?;

    result.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "Cannot find file {} from {}",
                name.as_ref().to_string_lossy(),
                directory.as_ref().display()
            ),
        )
    })
}

#[cfg(test)]
mod test {
    use std::{
        fs::{create_dir_all, write},
        os::unix::fs::symlink,
    };

    use super::*;

    const FIND_OPTIONS: FindOptions = FindOptions { recursive: true };

    #[test]
    fn test_find_file_nested() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let nested = root.path().join("EFI").join("fedora");
        create_dir_all(&nested).expect("Failed to create dirs");
        write(nested.join("grub.cfg"), "menuentry 'Fedora' {\n}\n").expect("Failed to write");

        let result = find_file(root.path(), "grub.cfg", FIND_OPTIONS).expect("Not found");
        assert_eq!(result, nested.join("grub.cfg"));
    }

    #[test]
    fn test_find_file_not_recursive() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let nested = root.path().join("EFI");
        create_dir_all(&nested).expect("Failed to create dirs");
        write(nested.join("grub.cfg"), "").expect("Failed to write");

        let error = find_file(root.path(), "grub.cfg", FindOptions { recursive: false })
            .expect_err("Should not descend");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_find_file_ignores_directories_with_same_name() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        create_dir_all(root.path().join("grub.cfg")).expect("Failed to create dirs");

        let error = find_file(root.path(), "grub.cfg", FIND_OPTIONS).expect_err("Should miss");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_find_file_requires_exact_name() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        write(root.path().join("grub.cfg.bak"), "").expect("Failed to write");
        write(root.path().join("old-grub.cfg"), "").expect("Failed to write");

        assert!(find_file(root.path(), "grub.cfg", FIND_OPTIONS).is_err());
    }

    #[test]
    fn test_find_file_through_symlinks() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let real_dir = root.path().join("real").join("fedora");
        create_dir_all(&real_dir).expect("Failed to create dirs");
        write(real_dir.join("grub.cfg"), "").expect("Failed to write");

        let efi_root = root.path().join("efi");
        create_dir_all(&efi_root).expect("Failed to create dirs");
        symlink(root.path().join("real"), efi_root.join("EFI")).expect("Failed to link");

        let result = find_file(&efi_root, "grub.cfg", FIND_OPTIONS).expect("Not found");
        assert_eq!(result, efi_root.join("EFI").join("fedora").join("grub.cfg"));

        let linked_root = root.path().join("linked");
        create_dir_all(&linked_root).expect("Failed to create dirs");
        symlink(real_dir.join("grub.cfg"), linked_root.join("grub.cfg")).expect("Failed to link");

        let result = find_file(&linked_root, "grub.cfg", FIND_OPTIONS).expect("Not found");
        assert_eq!(result, linked_root.join("grub.cfg"));
    }

    #[test]
    fn test_find_file_symlink_loop() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let nested = root.path().join("EFI");
        create_dir_all(&nested).expect("Failed to create dirs");
        symlink(root.path(), nested.join("loop")).expect("Failed to link");
        symlink(root.path().join("missing"), nested.join("dangling")).expect("Failed to link");

        let error = find_file(root.path(), "grub.cfg", FIND_OPTIONS).expect_err("Should miss");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);

        write(nested.join("grub.cfg"), "").expect("Failed to write");
        let result = find_file(root.path(), "grub.cfg", FIND_OPTIONS).expect("Not found");
        assert_eq!(result.file_name(), Some(OsStr::new("grub.cfg")));
    }

    #[test]
    fn test_find_missing_root() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let missing = root.path().join("missing");

        let error = find(&missing, FIND_OPTIONS, |_, _| true).expect_err("Should fail");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(error.to_string().contains("Cannot read directory"));
    }

    #[test]
    fn test_find_stops_at_first_match() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        write(root.path().join("a"), "").expect("Failed to write");
        write(root.path().join("b"), "").expect("Failed to write");

        let visited = std::cell::Cell::new(0);
        let result = find(root.path(), FIND_OPTIONS, |_, _| {
            visited.set(visited.get() + 1);
            true
        })
        .expect("Failed to find");

        assert!(result.is_some());
        assert_eq!(visited.get(), 1);
    }

    #[test]
    fn test_file_type_checks() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let target = root.path().join("grub.cfg");
        let link = root.path().join("grub2-efi.cfg");
        write(&target, "").expect("Failed to write");
        symlink(&target, &link).expect("Failed to link");

        assert!(is_dir(root.path()));
        assert!(!is_dir(&target));
        assert!(is_symlink(&link));
        assert!(!is_symlink(&target));
        assert!(!is_symlink(root.path().join("missing")));
    }

    #[test]
    fn test_open_file_error_message() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let missing = root.path().join("grub.cfg");

        let error = open_file(&missing).expect_err("Should fail");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(error.to_string().starts_with("Cannot open file"));
    }

    #[test]
    fn test_normalize() {
        let path = normalize("/boot/efi/../grub/./grub.cfg").expect("Failed to normalize");
        assert_eq!(path, PathBuf::from("/boot/grub/grub.cfg"));
    }
}
