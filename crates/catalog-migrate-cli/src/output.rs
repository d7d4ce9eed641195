//! Writing generated artifacts to disk.

use std::io;
use std::path::{Component, Path, PathBuf};

use catalog_migrate::{GeneratedFile, Result};
use tracing::info;

/// Remove `dir` and everything below it, if present.
pub fn clean_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
        info!("Cleaned output directory: {}", dir.display());
    }
    Ok(())
}

/// Write every file into `dir`, creating it first. Returns the written paths.
///
/// File names embed catalog table names, so each must be a single plain path
/// component; anything else is rejected before writing.
pub fn write_files(dir: &Path, files: &[GeneratedFile]) -> Result<Vec<PathBuf>> {
    for file in files {
        check_file_name(&file.file_name)?;
    }
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.file_name);
        std::fs::write(&path, &file.content)?;
        info!("Created: {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn check_file_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("generated file name {:?} is not a plain file name", name),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_files_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sequelize");
        let files = vec![
            GeneratedFile::new("a.js", "module.exports = {};"),
            GeneratedFile::new("b.js", ""),
        ];

        let written = write_files(&out, &files).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(out.join("a.js")).unwrap(),
            "module.exports = {};"
        );
    }

    #[test]
    fn test_clean_dir_removes_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("typeorm");
        write_files(&out, &[GeneratedFile::new("old.ts", "x")]).unwrap();

        clean_dir(&out).unwrap();
        assert!(!out.exists());
        clean_dir(&out).unwrap();
    }

    #[test]
    fn test_write_files_rejects_paths_outside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sequelize");

        for name in [
            "20240115103000000001-create-../../escape.js",
            "20240115103000000001-create-a/b.js",
            "..",
            "/tmp/abs.js",
            "a\\b.js",
        ] {
            let err = write_files(&out, &[GeneratedFile::new(name, "x")]).unwrap_err();
            assert!(matches!(err, catalog_migrate::MigrateError::Io(_)), "{name}");
        }
        assert!(!out.exists());
        assert!(!dir.path().join("escape.js").exists());
    }
}
