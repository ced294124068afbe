//! Shell-script stand-ins for ffmpeg (unix only)
//!
//! Each script receives the real encoder arguments; the output path is the
//! last one. Tests that execute these scripts run `#[serial]`: a script
//! still open for writing in one thread cannot be exec'd from another.

use std::path::{Path, PathBuf};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

/// Copies the input (third argument) to the output
pub fn copying_encoder(dir: &Path) -> PathBuf {
    write_script(dir, "fake-ffmpeg-ok", r#"for last; do :; done
cp "$3" "$last""#)
}

/// Writes diagnostics to stderr and exits 1
pub fn failing_encoder(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-ffmpeg-fail",
        r#"echo "Invalid data found when processing input" >&2
exit 1"#,
    )
}

/// Never finishes on its own
pub fn hanging_encoder(dir: &Path) -> PathBuf {
    write_script(dir, "fake-ffmpeg-hang", "exec sleep 30")
}

/// Exits 0 without writing anything
pub fn silent_encoder(dir: &Path) -> PathBuf {
    write_script(dir, "fake-ffmpeg-silent", "exit 0")
}
