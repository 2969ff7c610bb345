use std::path::Path;

use tempfile::{Builder, NamedTempFile, TempDir};

use crate::config::Config;
use crate::error::{IoContext, Result};

/// Scratch directory of one sort job. It is removed with everything in it when dropped.
pub(crate) struct ScratchDir {
    dir: TempDir,
    run_prefix: String,
    run_suffix: String,
}

impl ScratchDir {
    pub(crate) fn new(config: &Config) -> Result<ScratchDir> {
        let dir = Builder::new()
            .prefix(config.tmp_prefix())
            .tempdir_in(config.tmp())
            .at_path(config.tmp())?;
        log::info!("Using {} as scratch directory", dir.path().display());
        Ok(
            ScratchDir {
                dir,
                run_prefix: config.run_prefix().to_string(),
                run_suffix: config.run_suffix().to_string(),
            }
        )
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// New, uniquely named, empty run file. It is deleted on drop unless persisted.
    pub(crate) fn create_run_file(&self) -> Result<NamedTempFile> {
        Builder::new()
            .prefix(&self.run_prefix)
            .suffix(&self.run_suffix)
            .tempfile_in(self.dir.path())
            .at_path(self.dir.path())
    }

    /// Remove the directory now. Failures are logged only, cleanup is best effort.
    pub(crate) fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::info!("Removed scratch directory {}", path.display()),
            Err(e) => log::warn!("Failed to remove scratch directory {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::scratch::ScratchDir;
    use crate::sort::Sort;

    #[test]
    fn test_scratch_dir_lifecycle() -> Result<(), anyhow::Error> {
        let tmp = tempfile::tempdir()?;
        let mut sort = Sort::new(vec![], tmp.path().join("out.txt"));
        sort.with_tmp_dir(tmp.path().to_path_buf());
        let config = sort.create_config()?;

        let scratch = ScratchDir::new(&config)?;
        let path = scratch.path().to_path_buf();
        assert!(path.starts_with(tmp.path()));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("_external_sorter_"));

        let mut first = scratch.create_run_file()?;
        let second = scratch.create_run_file()?;
        assert_ne!(first.path(), second.path());
        assert!(first.path().to_string_lossy().ends_with(".sorted"));
        first.write_all(b"line\n")?;
        let kept = first.into_temp_path();

        scratch.close();
        assert!(!path.exists());
        assert!(!kept.exists());
        drop(kept);
        drop(second);
        Ok(())
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() -> Result<(), anyhow::Error> {
        let tmp = tempfile::tempdir()?;
        let mut sort = Sort::new(vec![], tmp.path().join("out.txt"));
        sort.with_tmp_dir(tmp.path().to_path_buf());
        let config = sort.create_config()?;

        let scratch = ScratchDir::new(&config)?;
        let path = scratch.path().to_path_buf();
        let _run = scratch.create_run_file()?.into_temp_path();
        drop(scratch);
        assert!(!path.exists());
        Ok(())
    }
}
