//! Unpacking the WordPress core tarball into a web root

use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;

use super::action::set_mode;
use crate::error::{Error, Result};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// Top-level directory of the release tarball
const ARCHIVE_ROOT: &str = "wordpress";

/// Unpack a `.tar.gz` release into `web_root`.
///
/// The archive is extracted into a staging directory inside the web root,
/// then its top-level entries are moved into place. Nothing is moved if any
/// of them would overwrite an existing path. Returns the moved entries so
/// they can be removed again.
pub fn unpack_core(archive: &[u8], web_root: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(web_root)
        .map_err(|e| Error::io(format!("cannot create {}", web_root.display()), e))?;

    let staging = tempfile::Builder::new()
        .prefix(".wordpress-")
        .tempdir_in(web_root)
        .map_err(|e| Error::io(format!("cannot stage files in {}", web_root.display()), e))?;

    Archive::new(GzDecoder::new(archive))
        .unpack(staging.path())
        .map_err(|e| Error::io("cannot unpack WordPress archive", e))?;

    let source = staging.path().join(ARCHIVE_ROOT);
    let source = if source.is_dir() {
        source
    } else {
        staging.path().to_path_buf()
    };

    let names = fs::read_dir(&source)
        .map_err(|e| Error::io(format!("cannot read {}", source.display()), e))?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<std::io::Result<BTreeSet<_>>>()
        .map_err(|e| Error::io(format!("cannot read {}", source.display()), e))?;

    let collisions: Vec<String> = names
        .iter()
        .filter(|name| fs::symlink_metadata(web_root.join(name)).is_ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    if !collisions.is_empty() {
        return Err(Error::StateConflict(format!(
            "{} already contains {} (remove them or install into an empty web root)",
            web_root.display(),
            collisions.join(", ")
        )));
    }

    let mut moved = Vec::new();
    for name in &names {
        let target = web_root.join(name);
        let result = fs::rename(source.join(name), &target)
            .map_err(|e| Error::io(format!("cannot move {} into place", target.display()), e))
            .and_then(|()| {
                moved.push(target.clone());
                normalize_modes(&target)
            });
        if let Err(e) = result {
            if let Err(cleanup) = remove_unpacked(&moved) {
                log::warn!("Could not clean up partial WordPress install: {cleanup}");
            }
            return Err(e);
        }
    }

    log::debug!(
        "Unpacked {} entries into {}",
        moved.len(),
        web_root.display()
    );
    Ok(moved)
}

/// Directories 0755, files 0644, symlinks untouched
fn normalize_modes(path: &Path) -> Result<()> {
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| {
            let context = format!("cannot walk {}", path.display());
            match e.into_io_error() {
                Some(io) => Error::io(context, io),
                None => Error::io(context, std::io::Error::other("filesystem loop")),
            }
        })?;
        let kind = entry.file_type();
        if kind.is_dir() {
            set_mode(entry.path(), DIR_MODE)?;
        } else if kind.is_file() {
            set_mode(entry.path(), FILE_MODE)?;
        }
    }
    Ok(())
}

/// Remove entries created by [`unpack_core`]; missing ones are skipped
pub fn remove_unpacked(paths: &[PathBuf]) -> Result<()> {
    for path in paths.iter().rev() {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(format!("cannot remove {}", path.display()), e)),
        }
    }
    Ok(())
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    /// A tiny release tarball laid out like the real one, with tight modes
    pub fn release_tarball() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));

        let mut dir = |path: &str| {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o700);
            header.set_size(0);
            builder
                .append_data(&mut header, path, std::io::empty())
                .unwrap();
        };
        dir("wordpress/");
        dir("wordpress/wp-includes/");
        dir("wordpress/wp-admin/");

        for (path, body) in [
            ("wordpress/index.php", "<?php require __DIR__ . '/wp-blog-header.php';\n"),
            ("wordpress/wp-config-sample.php", "<?php // sample\n"),
            ("wordpress/wp-includes/version.php", "<?php $wp_version = '6.6';\n"),
            ("wordpress/wp-admin/index.php", "<?php // admin\n"),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_mode(0o600);
            header.set_size(body.len() as u64);
            builder
                .append_data(&mut header, path, body.as_bytes())
                .unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_unpack_strips_top_directory_and_normalizes_modes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("a.com");

        let moved = unpack_core(&release_tarball(), &root).unwrap();

        assert_eq!(moved.len(), 4);
        assert!(root.join("index.php").is_file());
        assert!(root.join("wp-includes/version.php").is_file());
        assert!(!root.join("wordpress").exists());
        // Only the unpacked entries are left behind
        assert_eq!(fs::read_dir(&root).unwrap().count(), 4);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode(&root.join("wp-includes")), 0o755);
            assert_eq!(mode(&root.join("wp-includes/version.php")), 0o644);
            assert_eq!(mode(&root.join("index.php")), 0o644);
        }

        remove_unpacked(&moved).unwrap();
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_unpack_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join("index.php"), "<?php echo 'mine';\n").unwrap();

        let err = unpack_core(&release_tarball(), &root).unwrap_err();

        assert!(matches!(err, Error::StateConflict(_)));
        assert_eq!(
            fs::read_to_string(root.join("index.php")).unwrap(),
            "<?php echo 'mine';\n"
        );
        assert!(!root.join("wp-includes").exists());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = unpack_core(b"not a tarball", dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
