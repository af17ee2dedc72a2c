use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Result, ViewerError};
use crate::files::Identity;
use crate::session::{Notify, Wake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Move,
    Copy,
}

impl TransferMode {
    pub fn toggled(self) -> Self {
        match self {
            TransferMode::Move => TransferMode::Copy,
            TransferMode::Copy => TransferMode::Move,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransferMode::Move => "MOVE",
            TransferMode::Copy => "COPY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Transfer { bucket: u32, mode: TransferMode },
    Delete,
}

impl FileAction {
    /// Whether success takes the file out of the viewed folder.
    pub fn removes_source(self) -> bool {
        !matches!(
            self,
            FileAction::Transfer {
                mode: TransferMode::Copy,
                ..
            }
        )
    }
}

#[derive(Debug)]
pub enum OpStatus {
    Queued,
    InProgress,
    Done,
    Failed(ViewerError),
}

/// A file operation bound to one identity. Moves into the worker on submit and
/// comes back through the completion channel in a terminal state.
#[derive(Debug)]
pub struct PendingOp {
    pub id: u64,
    pub identity: Identity,
    pub action: FileAction,
    pub status: OpStatus,
    pub destination: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Filesystem primitives
// ---------------------------------------------------------------------------

pub fn bucket_dir(folder: &Path, bucket: u32) -> PathBuf {
    folder.join(bucket.to_string())
}

/// Move or copy `source` into `<folder>/<bucket>/`, creating the bucket on
/// demand. Never overwrites, even if the destination appears between the
/// check and the transfer. On failure the source is untouched and no partial
/// destination is left behind.
pub fn transfer(folder: &Path, source: &Path, bucket: u32, mode: TransferMode) -> Result<PathBuf> {
    let dir = bucket_dir(folder, bucket);
    match fs::metadata(&dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(ViewerError::io(
                &dir,
                io::Error::other("bucket path exists and is not a directory"),
            ));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(&dir).map_err(|e| ViewerError::io(&dir, e))?;
        }
        Err(e) => return Err(ViewerError::io(&dir, e)),
    }

    let name = source.file_name().ok_or_else(|| {
        ViewerError::io(source, io::Error::new(io::ErrorKind::InvalidInput, "no file name"))
    })?;
    let dest = dir.join(name);
    if fs::symlink_metadata(&dest).is_ok() {
        return Err(ViewerError::Destination { path: dest });
    }

    match mode {
        TransferMode::Move => move_no_clobber(source, &dest)?,
        TransferMode::Copy => copy_no_clobber(source, &dest)?,
    }
    Ok(dest)
}

/// `rename` replaces an existing target on Unix, so link first (which fails
/// with `AlreadyExists`) and unlink the source afterwards. Filesystems without
/// hard links fall back to copy + remove.
fn move_no_clobber(source: &Path, dest: &Path) -> Result<()> {
    match fs::hard_link(source, dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ViewerError::Destination {
                path: dest.to_path_buf(),
            });
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ViewerError::io(source, e)),
        Err(e) => {
            log::debug!("[fileops] hard link failed ({}), copying instead", e);
            copy_no_clobber(source, dest)?;
        }
    }
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(dest);
        return Err(ViewerError::io(source, e));
    }
    Ok(())
}

/// Copy contents, permissions and modification time. `create_new` makes the
/// existence check and the create one step.
fn copy_no_clobber(source: &Path, dest: &Path) -> Result<()> {
    let mut src = File::open(source).map_err(|e| ViewerError::io(source, e))?;
    let meta = src.metadata().map_err(|e| ViewerError::io(source, e))?;
    let mut dst = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ViewerError::Destination {
                path: dest.to_path_buf(),
            });
        }
        Err(e) => return Err(ViewerError::io(dest, e)),
    };

    let copied = io::copy(&mut src, &mut dst)
        .and_then(|_| dst.set_permissions(meta.permissions()))
        .and_then(|_| match meta.modified() {
            Ok(t) => dst.set_modified(t),
            Err(_) => Ok(()),
        });

    if let Err(e) = copied {
        drop(dst);
        let _ = fs::remove_file(dest);
        return Err(ViewerError::io(dest, e));
    }
    Ok(())
}

pub fn delete_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| ViewerError::io(path, e))
}

// ---------------------------------------------------------------------------
// Background worker
// ---------------------------------------------------------------------------

pub struct FileOps {
    tx: Option<Sender<PendingOp>>,
    done: Receiver<PendingOp>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
}

impl FileOps {
    /// Start the worker for files under `folder`. The worker only touches the
    /// filesystem; applying a result to the session is left to whoever
    /// receives the completion.
    pub fn spawn(folder: PathBuf, notify: Option<Notify>) -> Result<Self> {
        let (tx, rx) = unbounded::<PendingOp>();
        let (done_tx, done) = unbounded::<PendingOp>();
        let worker = thread::Builder::new()
            .name("fileops".into())
            .spawn(move || fileops_worker(folder, rx, done_tx, notify))
            .map_err(|e| ViewerError::io("fileops worker", e))?;
        Ok(Self {
            tx: Some(tx),
            done,
            worker: Some(worker),
            next_id: 1,
        })
    }

    /// Queue `action` for `identity`. Returns the operation id.
    pub fn submit(&mut self, identity: Identity, action: FileAction) -> Result<u64> {
        let id = self.next_id;
        self.next_id += 1;
        let op = PendingOp {
            id,
            identity,
            action,
            status: OpStatus::Queued,
            destination: None,
        };
        let tx = self.tx.as_ref().ok_or_else(worker_gone)?;
        tx.send(op).map_err(|_| worker_gone())?;
        Ok(id)
    }

    pub fn try_completion(&self) -> Option<PendingOp> {
        self.done.try_recv().ok()
    }

    pub fn wait_completion(&self, timeout: Duration) -> Option<PendingOp> {
        match self.done.recv_timeout(timeout) {
            Ok(op) => Some(op),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn worker_gone() -> ViewerError {
    ViewerError::io(
        "fileops worker",
        io::Error::new(io::ErrorKind::BrokenPipe, "file operation worker stopped"),
    )
}

impl Drop for FileOps {
    fn drop(&mut self) {
        // closing the channel ends the worker loop once queued ops are done
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn fileops_worker(
    folder: PathBuf,
    rx: Receiver<PendingOp>,
    done_tx: Sender<PendingOp>,
    notify: Option<Notify>,
) {
    for mut op in rx.iter() {
        op.status = OpStatus::InProgress;
        log::info!("[fileops] #{} {:?} {}", op.id, op.action, op.identity.file_name());

        let source = op.identity.path();
        let result = match op.action {
            FileAction::Transfer { bucket, mode } => {
                transfer(&folder, source, bucket, mode).map(Some)
            }
            FileAction::Delete => delete_file(source).map(|_| None),
        };

        match result {
            Ok(destination) => {
                log::info!("[fileops] #{} done", op.id);
                op.destination = destination;
                op.status = OpStatus::Done;
            }
            Err(e) => {
                log::error!("[fileops] #{} failed: {}", op.id, e);
                op.status = OpStatus::Failed(e);
            }
        }

        if done_tx.send(op).is_err() {
            break;
        }
        if let Some(notify) = &notify {
            notify(Wake::FileOpFinished);
        }
    }
}
