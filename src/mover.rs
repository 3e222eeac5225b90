//! Placing organized bundles on disk
//!
//! Every action is logged before it is performed. In dry-run mode the log
//! lines are identical but the filesystem is left alone.

use crate::bundle::Bundle;
use crate::config::{Config, FileOperation};
use crate::error::{Error, Result};
use crate::organize::DirectoryBuckets;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Buffer size for file copies
const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// One logged filesystem action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A destination directory was (or would be) created
    CreateDir(PathBuf),
    /// A bundle was (or would be) moved or copied into a directory
    Transfer {
        operation: FileOperation,
        bundle: String,
        destination: PathBuf,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateDir(path) => write!(f, "Creating {}", path.display()),
            Action::Transfer {
                operation,
                bundle,
                destination,
            } => write!(
                f,
                "{} {} to {}",
                operation.action(),
                bundle,
                destination.display()
            ),
        }
    }
}

/// Moves or copies bucketed bundles into the destination tree
#[derive(Debug, Clone)]
pub struct FileMover {
    dest_dir: PathBuf,
    operation: FileOperation,
    dry_run: bool,
}

impl FileMover {
    pub fn new(dest_dir: impl Into<PathBuf>, operation: FileOperation, dry_run: bool) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            operation,
            dry_run,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dest_dir.clone(), config.operation, config.dry_run)
    }

    /// Directory a bucket maps to; the catch-all bucket is the destination itself
    pub fn directory_for(&self, bucket: &str) -> PathBuf {
        if bucket.is_empty() {
            self.dest_dir.clone()
        } else {
            self.dest_dir.join(bucket)
        }
    }

    /// Realize every bucket, in order
    pub fn execute(&self, buckets: &DirectoryBuckets) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        for (name, bundles) in buckets.iter() {
            actions.extend(self.place_bucket(name, bundles)?);
        }
        Ok(actions)
    }

    /// Create the bucket's directory if needed, then transfer its bundles
    pub fn place_bucket(&self, bucket: &str, bundles: &[Bundle]) -> Result<Vec<Action>> {
        let directory = self.directory_for(bucket);
        let mut actions = Vec::with_capacity(bundles.len() + 1);

        if let Some(action) = self.ensure_dir(&directory)? {
            actions.push(action);
        }

        for bundle in bundles {
            let action = Action::Transfer {
                operation: self.operation,
                bundle: bundle.to_string(),
                destination: directory.clone(),
            };
            info!("{}", action);
            if !self.dry_run {
                bundle.transfer_to(&directory, self.operation)?;
            }
            actions.push(action);
        }

        Ok(actions)
    }

    fn ensure_dir(&self, directory: &Path) -> Result<Option<Action>> {
        if directory.is_dir() {
            return Ok(None);
        }

        let action = Action::CreateDir(directory.to_path_buf());
        info!("{}", action);
        if !self.dry_run {
            fs::create_dir_all(directory)?;
        }
        Ok(Some(action))
    }
}

/// Move a file, falling back to copy and delete across filesystems
pub fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if let Err(e) = fs::rename(source, dest) {
        debug!(?source, ?dest, error = %e, "Rename failed, copying instead");
        copy_file(source, dest)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

/// Copy a file with buffered I/O, keeping its modification time
///
/// Fails with [`Error::SameFile`] when `dest` already is `source`, since
/// creating the destination would truncate the only copy.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if is_same_file(source, dest) {
        return Err(Error::SameFile {
            path: source.to_path_buf(),
        });
    }

    let src_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }
    writer.flush()?;

    if let Ok(metadata) = fs::metadata(source)
        && let Ok(mtime) = metadata.modified()
    {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }

    Ok(())
}

/// Both paths exist and resolve to the same file
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleGrouper;
    use crate::organize::CATCH_ALL;
    use filetime::FileTime;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output for assertions
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn write_files(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    fn single_bucket(name: &str, dir: &Path, files: &[&str]) -> (String, Vec<Bundle>) {
        let bundles = BundleGrouper::new(dir, files.iter().copied()).collect();
        (name.to_string(), bundles)
    }

    #[test]
    fn test_action_display() {
        let create = Action::CreateDir(PathBuf::from("/out/2020-01-01"));
        assert_eq!(create.to_string(), "Creating /out/2020-01-01");

        let transfer = Action::Transfer {
            operation: FileOperation::Move,
            bundle: "/in/IMG.[cr2,jpg]".into(),
            destination: PathBuf::from("/out/2020-01-01"),
        };
        assert_eq!(
            transfer.to_string(),
            "Moving /in/IMG.[cr2,jpg] to /out/2020-01-01"
        );
    }

    #[test]
    fn test_catch_all_maps_to_destination_root() {
        let mover = FileMover::new("/out", FileOperation::Copy, true);
        assert_eq!(mover.directory_for(CATCH_ALL), PathBuf::from("/out"));
        assert_eq!(
            mover.directory_for("2020-01-01 - Paris"),
            PathBuf::from("/out/2020-01-01 - Paris")
        );
    }

    #[test]
    fn test_dry_run_touches_nothing_but_logs() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_files(src.path(), &["IMG_001.CR2", "IMG_001.JPG"]);

        let (name, bundles) = single_bucket("2020-01-01", src.path(), &["IMG_001.CR2", "IMG_001.JPG"]);
        let before: Vec<PathBuf> = bundles[0].paths().to_vec();

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mover = FileMover::new(dest.path(), FileOperation::Move, true);
        let actions = tracing::subscriber::with_default(subscriber, || {
            mover.place_bucket(&name, &bundles).unwrap()
        });

        assert_eq!(bundles[0].paths(), before.as_slice());
        assert!(before.iter().all(|p| p.exists()));
        assert!(!dest.path().join("2020-01-01").exists());

        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            Action::CreateDir(dest.path().join("2020-01-01"))
        );
        let output = logs.contents();
        assert!(output.contains("Creating"), "log was: {}", output);
        assert!(output.contains("Moving"), "log was: {}", output);
        assert!(output.contains("IMG_001.[cr2,jpg]"), "log was: {}", output);
    }

    #[test]
    fn test_move_bucket() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_files(src.path(), &["a.jpg", "a.xmp", "b.mp4"]);

        let (name, bundles) = single_bucket("2021-06-01", src.path(), &["a.jpg", "a.xmp", "b.mp4"]);
        let mover = FileMover::new(dest.path(), FileOperation::Move, false);
        let actions = mover.place_bucket(&name, &bundles).unwrap();

        let target = dest.path().join("2021-06-01");
        assert_eq!(actions.len(), 3);
        for file in ["a.jpg", "a.xmp", "b.mp4"] {
            assert!(target.join(file).exists());
            assert!(!src.path().join(file).exists());
        }

        // directory now exists, so no second creation
        let again = mover.place_bucket(&name, &[]).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_copy_into_root_keeps_mtime() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_files(src.path(), &["c.jpg"]);
        let mtime = FileTime::from_unix_time(1_400_000_000, 0);
        filetime::set_file_mtime(src.path().join("c.jpg"), mtime).unwrap();

        let (_, bundles) = single_bucket(CATCH_ALL, src.path(), &["c.jpg"]);
        let mover = FileMover::new(dest.path(), FileOperation::Copy, false);
        let actions = mover.place_bucket(CATCH_ALL, &bundles).unwrap();

        assert_eq!(actions.len(), 1);
        assert!(src.path().join("c.jpg").exists());
        let copied = dest.path().join("c.jpg");
        assert_eq!(fs::read(&copied).unwrap(), b"c.jpg");
        let copied_mtime = FileTime::from_last_modification_time(&fs::metadata(&copied).unwrap());
        assert_eq!(copied_mtime.unix_seconds(), 1_400_000_000);
    }

    #[test]
    fn test_copy_onto_itself_keeps_contents() {
        let src = tempfile::tempdir().unwrap();
        write_files(src.path(), &["a.jpg"]);
        let photo = src.path().join("a.jpg");

        assert!(matches!(
            copy_file(&photo, &photo),
            Err(Error::SameFile { .. })
        ));
        // same file reached through a different spelling
        let dotted = src.path().join(".").join("a.jpg");
        assert!(copy_file(&photo, &dotted).is_err());
        assert_eq!(fs::read(&photo).unwrap(), b"a.jpg");

        move_file(&photo, &photo).unwrap();
        assert_eq!(fs::read(&photo).unwrap(), b"a.jpg");

        let (_, bundles) = single_bucket(CATCH_ALL, src.path(), &["a.jpg"]);
        let mover = FileMover::new(src.path(), FileOperation::Copy, false);
        assert!(mover.place_bucket(CATCH_ALL, &bundles).is_err());
        assert_eq!(fs::read(&photo).unwrap(), b"a.jpg");
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        let (name, bundles) = single_bucket("x", src.path(), &["ghost.jpg"]);
        let mover = FileMover::new(dest.path(), FileOperation::Move, false);
        assert!(mover.place_bucket(&name, &bundles).is_err());
    }
}
