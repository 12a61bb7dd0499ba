use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// File system access used by the shader manager
/// This allows for dependency injection and testing against an in-memory tree
///
/// Modification times and `now` must come from the same clock: failure
/// timestamps taken from `now` are compared against file modification times.
pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Last modification time, `None` if the path is not a regular file
    fn modified(&self, path: &Path) -> Option<SystemTime>;

    fn exists(&self, path: &Path) -> bool {
        self.modified(path).is_some()
    }

    fn now(&self) -> SystemTime;
}

/// File system backed by `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        metadata.modified().ok()
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug, Clone)]
struct MockFile {
    contents: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MockState {
    files: FxHashMap<PathBuf, MockFile>,
    ticks: u64,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.ticks += 1;
        MockFileSystem::time_at(self.ticks)
    }
}

/// In-memory file system with a logical clock
///
/// Every write or touch advances the clock by one second, so modification
/// order is fully deterministic regardless of the host's timestamp precision.
#[derive(Debug, Default)]
pub struct MockFileSystem {
    state: Mutex<MockState>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// The clock value after `ticks` advances
    pub fn time_at(ticks: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(ticks)
    }

    /// Create or overwrite a file, stamping it with the next clock tick
    pub fn write_file(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> SystemTime {
        let mut state = self.state.lock().unwrap();
        let modified = state.tick();
        state.files.insert(
            path.into(),
            MockFile {
                contents: contents.into(),
                modified,
            },
        );
        modified
    }

    /// Bump a file's modification time without changing its contents
    pub fn touch(&self, path: &Path) -> Option<SystemTime> {
        let mut state = self.state.lock().unwrap();
        let modified = state.tick();
        let file = state.files.get_mut(path)?;
        file.modified = modified;
        Some(modified)
    }

    pub fn set_modified(&self, path: &Path, modified: SystemTime) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.files.get_mut(path) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    pub fn remove_file(&self, path: &Path) -> bool {
        self.state.lock().unwrap().files.remove(path).is_some()
    }

    /// Advance the clock without touching any file
    pub fn advance(&self) -> SystemTime {
        self.state.lock().unwrap().tick()
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                )
            })
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| f.modified)
    }

    fn now(&self) -> SystemTime {
        Self::time_at(self.state.lock().unwrap().ticks)
    }
}
