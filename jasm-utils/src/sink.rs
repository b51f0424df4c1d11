//! Output destinations for the daemon loggers
//!
//! [`LogHandle`] is an append-only log file whose owner decides when it is
//! closed. [`Tee`] duplicates every write to two destinations and
//! [`SharedWriter`] serializes whole lines from concurrent callers.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// File mode for newly created log files, before umask
#[cfg(unix)]
const LOG_FILE_MODE: u32 = 0o666;

/// An open, append-only log file
///
/// Clones share the same descriptor. Closing any clone closes it for all of
/// them; writes after that fail with [`io::ErrorKind::BrokenPipe`].
#[derive(Debug, Clone)]
pub struct LogHandle {
    path: PathBuf,
    file: Arc<Mutex<Option<File>>>,
}

impl LogHandle {
    /// Open `path` for appending, creating it if absent
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(LOG_FILE_MODE);
        }

        let file = options.open(path)?;
        tracing::debug!(path = %path.display(), "log file opened");
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(Some(file))),
        })
    }

    /// Path the file was opened at
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is still open
    pub fn is_open(&self) -> bool {
        self.file.lock().is_some()
    }

    /// Close the file. Closing twice is a no-op.
    pub fn close(&self) -> io::Result<()> {
        match self.file.lock().take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Write for LogHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.lock().as_mut() {
            Some(file) => file.write(buf),
            None => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock().as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "log file is closed")
}

/// Writer that duplicates each write to two destinations
///
/// Both destinations are always attempted. The first error is reported.
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let first = self.first.write_all(buf);
        let second = self.second.write_all(buf);
        first.and(second).map(|()| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let first = self.first.flush();
        let second = self.second.flush();
        first.and(second)
    }
}

type BoxedWriter = Box<dyn Write + Send>;

/// Line-serializing writer shared by every logger of one registry
///
/// A discarding writer holds no destination at all, so callers can skip
/// rendering entirely.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Option<Arc<Mutex<BoxedWriter>>>,
}

impl SharedWriter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(Box::new(writer)))),
        }
    }

    /// A writer that drops everything
    pub fn discard() -> Self {
        Self { inner: None }
    }

    pub fn is_discard(&self) -> bool {
        self.inner.is_none()
    }

    /// Write one complete line while holding the lock
    pub fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };
        let mut writer = inner.lock();
        writer.write_all(line)?;
        writer.flush()
    }
}

impl fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWriter")
            .field("discard", &self.is_discard())
            .finish()
    }
}

/// In-memory writer whose clones share one buffer
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct Capture(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Capture {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writer that always fails
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // ==================== LogHandle Tests ====================

    #[test]
    fn test_open_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("jasmd.log");

        let handle = LogHandle::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(handle.path(), path);
        assert!(handle.is_open());
    }

    #[test]
    fn test_open_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("jasmd.log");
        std::fs::write(&path, "existing\n").unwrap();

        let mut handle = LogHandle::open(&path).unwrap();
        handle.write_all(b"appended\n").unwrap();
        handle.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "existing\nappended\n");
    }

    #[test]
    fn test_open_missing_parent_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("jasmd.log");

        let err = LogHandle::open(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_close_is_shared_between_clones() {
        let temp = TempDir::new().unwrap();
        let handle = LogHandle::open(&temp.path().join("jasmd.log")).unwrap();
        let mut clone = handle.clone();

        handle.close().unwrap();
        assert!(!clone.is_open());

        let err = clone.write(b"late").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_close_twice() {
        let temp = TempDir::new().unwrap();
        let handle = LogHandle::open(&temp.path().join("jasmd.log")).unwrap();

        assert!(handle.close().is_ok());
        assert!(handle.close().is_ok());
    }

    // ==================== Tee Tests ====================

    #[test]
    fn test_tee_duplicates_bytes() {
        let a = Capture::default();
        let b = Capture::default();
        let mut tee = Tee::new(a.clone(), b.clone());

        tee.write_all(b"hello\n").unwrap();

        assert_eq!(a.contents(), "hello\n");
        assert_eq!(b.contents(), "hello\n");
    }

    #[test]
    fn test_tee_keeps_writing_after_first_error() {
        let b = Capture::default();
        let mut tee = Tee::new(Broken, b.clone());

        assert!(tee.write_all(b"line\n").is_err());
        assert_eq!(b.contents(), "line\n");
    }

    // ==================== SharedWriter Tests ====================

    #[test]
    fn test_shared_writer_write_line() {
        let capture = Capture::default();
        let writer = SharedWriter::new(capture.clone());

        writer.write_line(b"one\n").unwrap();
        writer.clone().write_line(b"two\n").unwrap();

        assert_eq!(capture.contents(), "one\ntwo\n");
    }

    #[test]
    fn test_shared_writer_discard() {
        let writer = SharedWriter::discard();
        assert!(writer.is_discard());
        assert!(writer.write_line(b"dropped\n").is_ok());
    }

    #[test]
    fn test_shared_writer_lines_do_not_interleave() {
        let capture = Capture::default();
        let writer = SharedWriter::new(capture.clone());

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let line = format!("thread-{t} line-{i} {}\n", "x".repeat(64));
                        writer.write_line(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let contents = capture.contents();
        assert_eq!(contents.lines().count(), 800);
        for line in contents.lines() {
            assert!(line.starts_with("thread-"), "Corrupted line: {:?}", line);
            assert!(line.ends_with(&"x".repeat(64)), "Corrupted line: {:?}", line);
        }
    }
}
