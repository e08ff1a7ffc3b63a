//! Small filesystem helpers shared by the stock, free-list and checkpoint
//! layers: atomic file replacement and directory/file permission setup.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use nix::sys::stat;
use nix::unistd;

use crate::error::StockError;

/// Default mode for data files written by this crate (`0600`).
pub fn data_file_mode() -> stat::Mode {
    stat::Mode::S_IRUSR | stat::Mode::S_IWUSR
}

/// Default mode for directories created by this crate (`0700`).
pub fn data_dir_mode() -> stat::Mode {
    stat::Mode::S_IRUSR | stat::Mode::S_IWUSR | stat::Mode::S_IXUSR
}

/// Atomically replace the contents of `path` with `data`.
///
/// Writes to a temporary file in the same directory (so the final rename is
/// on the same filesystem) and renames it into place. Either the old or the
/// new content is observable afterwards, never a partial write.
pub fn atomic_write<P: AsRef<Path>>(path: P, data: &[u8], mode: stat::Mode) -> Result<(), StockError> {
    let path = path.as_ref();

    let mut template = path.to_owned();
    let mut ext = template
        .extension()
        .map(|e| e.to_os_string())
        .unwrap_or_default();
    if !ext.is_empty() {
        ext.push(".");
    }
    ext.push("tmp_XXXXXX");
    template.set_extension(ext);

    let (fd, tmp_path) = unistd::mkstemp(&template)
        .map_err(|err| StockError::other(format!("mkstemp {:?} failed: {}", template, err)))?;

    let result = (|| -> Result<(), StockError> {
        stat::fchmod(fd, mode)
            .map_err(|err| StockError::other(format!("fchmod {:?} failed: {}", tmp_path, err)))?;

        use std::os::unix::io::FromRawFd;
        let mut file = unsafe { File::from_raw_fd(fd) };
        file.write_all(data)?;
        file.sync_all()?;

        std::fs::rename(&tmp_path, path).map_err(|err| {
            StockError::other(format!("atomic rename failed for {:?}: {}", path, err))
        })
    })();

    if result.is_err() {
        let _ = unistd::unlink(tmp_path.as_path());
    }

    result
}

/// Create `dir` (mode `0700`) if it does not already exist.
pub fn create_dir_secure<P: AsRef<Path>>(dir: P) -> Result<(), StockError> {
    let dir = dir.as_ref();
    match std::fs::create_dir(dir) {
        Ok(()) => {
            let c_path = std::ffi::CString::new(dir.as_os_str().to_str().unwrap_or_default())
                .map_err(|e| StockError::other(e.to_string()))?;
            stat::fchmodat(
                None,
                c_path.as_c_str(),
                data_dir_mode(),
                stat::FchmodatFlags::FollowSymlink,
            )
            .map_err(|err| StockError::other(format!("chmod {:?} failed: {}", dir, err)))?;
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Verify that `dir` is writable by creating and immediately removing a probe
/// file named `.write-probe`. Fails fast on read-only directories instead of
/// discovering the problem deep inside a later write.
pub fn probe_writable<P: AsRef<Path>>(dir: P) -> Result<(), StockError> {
    probe_writable_named(dir, ".write-probe")
}

/// As [`probe_writable`] but with an explicit probe file name, for callers
/// (the checkpoint coordinator) whose on-disk format names the probe file.
pub fn probe_writable_named<P: AsRef<Path>>(dir: P, name: &str) -> Result<(), StockError> {
    let probe = dir.as_ref().join(name);
    atomic_write(&probe, b"", data_file_mode())?;
    std::fs::remove_file(&probe).or_else(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Ok(())
        } else {
            Err(StockError::from(err))
        }
    })
}
