//! Host-facing plugin surface.
//!
//! [`Plugin`] wraps any [`ImageAdapter`] in the calling convention image
//! plugin hosts expect: boolean/optional results, a last-error message slot,
//! and integer handles for streaming sessions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::adapter::{ImageAdapter, ScanlineSession};
use crate::pixel::Components;
use crate::{AdapterError, DecodedImage, ImageView};

/// Each session has its own lock so reads on different handles run in
/// parallel; the arena lock is only held for lookups.
type SharedSession = Arc<Mutex<Box<dyn ScanlineSession>>>;

/// Opaque id of an open streaming session. Ids are never reused by a plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Result of [`Plugin::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenSession {
    pub handle: SessionHandle,
    pub width: u32,
    pub height: u32,
    pub components: Components,
}

/// An adapter plus the per-plugin state hosts rely on.
///
/// Every failing call stores its message in the error slot, replacing any
/// earlier one. Successful calls leave the slot alone and `identify` never
/// touches it.
pub struct Plugin<A: ImageAdapter> {
    adapter: A,
    last_error: Mutex<Option<String>>,
    sessions: Mutex<HashMap<u64, SharedSession>>,
    next_handle: AtomicU64,
}

impl<A: ImageAdapter> Plugin<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            last_error: Mutex::new(None),
            sessions: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<u64, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, err: AdapterError) {
        log::debug!("{}: {err}", self.adapter.name());
        *self.slot() = Some(err.to_string());
    }

    fn record<T>(&self, result: Result<T, AdapterError>) -> Option<T> {
        result.map_err(|e| self.fail(e)).ok()
    }

    /// Whether the adapter can read `filename`, judged from `header`.
    pub fn identify(&self, filename: &Path, header: &[u8]) -> bool {
        self.adapter.identify(filename, header)
    }

    /// Decode the whole file, or `None` with the reason in the error slot.
    pub fn load(&self, filename: &Path) -> Option<DecodedImage> {
        self.record(self.adapter.load(filename))
    }

    /// Encode `bytes` (`width * height * numcomponents` samples) to `filename`.
    pub fn save(
        &self,
        filename: &Path,
        bytes: &[u8],
        width: i32,
        height: i32,
        numcomponents: i32,
        ext: &str,
    ) -> bool {
        let result = ImageView::from_raw(bytes, width, height, numcomponents)
            .and_then(|view| self.adapter.save(filename, &view, ext));
        self.record(result).is_some()
    }

    /// Comma-separated saver extensions.
    pub fn get_savers(&self) -> &'static str {
        self.adapter.savers()
    }

    /// Copy the last error message into `buf`, truncated at a character
    /// boundary. Returns the number of bytes written; 0 when no error has
    /// been recorded.
    pub fn error(&self, buf: &mut [u8]) -> usize {
        let slot = self.slot();
        let Some(message) = slot.as_deref() else {
            return 0;
        };
        let mut len = message.len().min(buf.len());
        while !message.is_char_boundary(len) {
            len -= 1;
        }
        buf[..len].copy_from_slice(&message.as_bytes()[..len]);
        len
    }

    /// The last error message, if any failure has been recorded.
    pub fn last_error(&self) -> Option<String> {
        self.slot().clone()
    }

    /// Begin streaming `filename`.
    pub fn open(&self, filename: &Path) -> Option<OpenSession> {
        let session = self.record(self.adapter.open(filename))?;
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let opened = OpenSession {
            handle: SessionHandle(id),
            width: session.width(),
            height: session.height(),
            components: session.components(),
        };
        log::debug!(
            "{}: opened session {id} for {}",
            self.adapter.name(),
            filename.display()
        );
        self.sessions().insert(id, Arc::new(Mutex::new(session)));
        Some(opened)
    }

    /// Decode row `y` of an open session into `buf`.
    pub fn read_line(&self, handle: SessionHandle, y: u32, buf: &mut [u8]) -> bool {
        let session = self.sessions().get(&handle.0).cloned();
        let result = match session {
            Some(session) => session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .read_line(y, buf),
            None => Err(AdapterError::SessionClosed(handle.0)),
        };
        self.record(result).is_some()
    }

    /// Release a session. Unknown or already-closed handles only record an
    /// error. A read still running on another thread finishes first; the
    /// session is then dropped when that read returns.
    pub fn close(&self, handle: SessionHandle) {
        let removed = self.sessions().remove(&handle.0);
        match removed.map(Arc::try_unwrap) {
            Some(Ok(session)) => session
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .close(),
            Some(Err(_in_use)) => {
                log::debug!("{}: session {} closed during a read", self.adapter.name(), handle.0);
            }
            None => self.fail(AdapterError::SessionClosed(handle.0)),
        }
    }

    /// Number of sessions not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions().len()
    }
}

impl<A: ImageAdapter> Drop for Plugin<A> {
    fn drop(&mut self) {
        let open = self.open_sessions();
        if open > 0 {
            log::debug!("{}: dropping {open} unclosed sessions", self.adapter.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::session::BufferedSession;
    use crate::AdapterConfig;

    /// Serves a fixed 2x2 gray image for any `.mem` path.
    struct Memory;

    impl ImageAdapter for Memory {
        fn name(&self) -> &'static str {
            "memory"
        }
        fn identify(&self, path: &Path, _: &[u8]) -> bool {
            path.extension().is_some_and(|e| e == "mem")
        }
        fn load(&self, path: &Path) -> Result<DecodedImage, AdapterError> {
            if !self.identify(path, &[]) {
                return Err(AdapterError::UnrecognizedFormat);
            }
            DecodedImage::from_library(
                vec![1, 2, 3, 4],
                2,
                2,
                Components::Gray,
                None,
                &AdapterConfig::default(),
            )
        }
        fn open(&self, path: &Path) -> Result<Box<dyn ScanlineSession>, AdapterError> {
            Ok(Box::new(BufferedSession::new(self.load(path)?)))
        }
        fn save(&self, _: &Path, _: &ImageView<'_>, ext: &str) -> Result<(), AdapterError> {
            Err(AdapterError::NoSaver(ext.to_string()))
        }
        fn savers(&self) -> &'static str {
            ""
        }
    }

    #[test]
    fn error_slot_persists_across_success() {
        let plugin = Plugin::new(Memory);
        assert_eq!(plugin.last_error(), None);
        assert!(plugin.load(Path::new("x.bin")).is_none());
        let first = plugin.last_error().unwrap();

        assert!(plugin.load(Path::new("x.mem")).is_some());
        assert!(!plugin.identify(Path::new("y.bin"), b"junk"));
        assert_eq!(plugin.last_error().as_deref(), Some(first.as_str()));
    }

    #[test]
    fn error_copy_truncates_at_char_boundary() {
        let plugin = Plugin::new(Memory);
        *plugin.slot() = Some("é!".to_string());
        let mut buf = [0u8; 1];
        assert_eq!(plugin.error(&mut buf), 0);
        let mut buf = [0u8; 8];
        assert_eq!(plugin.error(&mut buf), 3);
        assert_eq!(&buf[..3], "é!".as_bytes());
    }

    #[test]
    fn handles_are_unique_and_close_is_idempotent() {
        let plugin = Plugin::new(Memory);
        let a = plugin.open(Path::new("a.mem")).unwrap();
        let b = plugin.open(Path::new("b.mem")).unwrap();
        assert_ne!(a.handle, b.handle);
        assert_eq!((a.width, a.height, a.components), (2, 2, Components::Gray));

        let mut row = [0u8; 2];
        assert!(plugin.read_line(a.handle, 1, &mut row));
        assert_eq!(row, [3, 4]);

        plugin.close(a.handle);
        assert_eq!(plugin.open_sessions(), 1);
        plugin.close(a.handle);
        assert!(plugin.last_error().unwrap().contains("no open streaming session"));
        assert!(!plugin.read_line(a.handle, 0, &mut row));

        let c = plugin.open(Path::new("c.mem")).unwrap();
        assert!(c.handle.id() > b.handle.id());
    }

    /// Row reads on a `.slow` file block until released.
    struct Gated {
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    struct SlowSession {
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl ScanlineSession for SlowSession {
        fn width(&self) -> u32 {
            1
        }
        fn height(&self) -> u32 {
            1
        }
        fn components(&self) -> Components {
            Components::Gray
        }
        fn read_line(&mut self, _: u32, buf: &mut [u8]) -> Result<(), AdapterError> {
            self.entered.send(()).unwrap();
            self.release.recv().unwrap();
            buf[0] = 9;
            Ok(())
        }
        fn close(self: Box<Self>) {}
    }

    impl ImageAdapter for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }
        fn identify(&self, _: &Path, _: &[u8]) -> bool {
            true
        }
        fn load(&self, path: &Path) -> Result<DecodedImage, AdapterError> {
            Memory.load(path)
        }
        fn open(&self, path: &Path) -> Result<Box<dyn ScanlineSession>, AdapterError> {
            if path.extension().is_some_and(|e| e == "slow") {
                let (entered, release) = self.gate.lock().unwrap().take().unwrap();
                return Ok(Box::new(SlowSession { entered, release }));
            }
            Memory.open(path)
        }
        fn save(&self, _: &Path, _: &ImageView<'_>, ext: &str) -> Result<(), AdapterError> {
            Err(AdapterError::NoSaver(ext.to_string()))
        }
        fn savers(&self) -> &'static str {
            ""
        }
    }

    #[test]
    fn blocked_read_does_not_stall_other_sessions() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let plugin = Plugin::new(Gated {
            gate: Mutex::new(Some((entered_tx, release_rx))),
        });
        let slow = plugin.open(Path::new("a.slow")).unwrap();
        let fast = plugin.open(Path::new("b.mem")).unwrap();

        std::thread::scope(|scope| {
            let reader = scope.spawn(|| {
                let mut row = [0u8; 1];
                assert!(plugin.read_line(slow.handle, 0, &mut row));
                row[0]
            });
            entered_rx.recv().unwrap();

            // the slow read is parked inside its session
            let mut row = [0u8; 2];
            assert!(plugin.read_line(fast.handle, 0, &mut row));
            assert_eq!(row, [1, 2]);
            plugin.close(fast.handle);
            assert_eq!(plugin.open_sessions(), 1);

            release_tx.send(()).unwrap();
            assert_eq!(reader.join().unwrap(), 9);
        });
        plugin.close(slow.handle);
        assert_eq!(plugin.open_sessions(), 0);
    }

    #[test]
    fn save_rejects_bad_arguments() {
        let plugin = Plugin::new(Memory);
        assert!(!plugin.save(Path::new("o.png"), &[0; 4], 2, 2, 7, "png"));
        assert!(plugin.last_error().unwrap().contains("component count"));
        assert!(!plugin.save(Path::new("o.png"), &[0; 4], 2, 2, 1, "png"));
        assert!(plugin.last_error().unwrap().contains("png"));
    }
}
