//! Two-phase checkpoint coordinator: drives an ordered list
//! of participants through `prepare`/`commit`/`abort`, with an atomic
//! `prepare -> committed` rename as the linearization point, and healing of
//! a half-finished commit on the next `open`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StockError;

const COMMITTED_FILENAME: &str = "committed";
const PREPARE_FILENAME: &str = "prepare";
const PROBE_FILENAME: &str = "test";

/// A component that can be driven through a coordinated two-phase commit.
///
/// Implementors own whatever state a "checkpoint" means to them (an
/// immutable snapshot, a WAL position, ...); the coordinator only ever
/// hands them checkpoint numbers.
pub trait Participant {
    /// Creates a new checkpoint tentatively numbered `n`. Must not replace
    /// whatever the participant currently considers its committed state.
    fn prepare(&mut self, n: u32) -> Result<(), StockError>;

    /// Promotes the checkpoint prepared as `n` into the new committed
    /// state; older checkpoints may be discarded. Called only after the
    /// coordinator's decision file already names `n`, so failing here is
    /// unrecoverable within this call — the participant must still be able
    /// to reach `n` when [`guarantee_checkpoint`](Self::guarantee_checkpoint)
    /// is called again on the next `open`.
    fn commit(&mut self, n: u32) -> Result<(), StockError>;

    /// Discards the checkpoint tentatively prepared as `n`, retaining
    /// whatever was committed before.
    fn abort(&mut self, n: u32) -> Result<(), StockError>;

    /// Called once at coordinator `open` with the durable `lastCheckpoint`.
    /// Heals whatever a crash mid-commit left behind: a prepared-but-not-
    /// committed checkpoint equal to `n` must be committed; one strictly
    /// greater than `n` must be discarded; otherwise the participant must
    /// already be able to reach `n` or return an error.
    fn guarantee_checkpoint(&mut self, n: u32) -> Result<(), StockError>;
}

/// Capability for reverting state to a specific checkpoint, kept separate
/// from [`Participant`] because restoring is a different caller concern
/// from participating in the creation of new checkpoints.
pub trait Restorer {
    fn restore(&mut self, n: u32) -> Result<(), StockError>;
}

/// Coordinates [`Participant`]s through `createCheckpoint`, tracking the
/// last durably committed checkpoint number in a directory of its own.
pub struct CheckpointCoordinator {
    dir: PathBuf,
    last_checkpoint: u32,
}

impl CheckpointCoordinator {
    /// Creates `dir` (mode `0700`) if absent, probes it for write access,
    /// reads the durable checkpoint number (0 if `committed` is absent),
    /// and calls `guarantee_checkpoint` on every participant so a crash
    /// between the decision-file rename and the final `commit` calls of a
    /// prior run is healed before this coordinator is used.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        participants: &mut [&mut dyn Participant],
    ) -> Result<Self, StockError> {
        let dir = dir.as_ref().to_owned();
        crate::fs::create_dir_secure(&dir)?;
        crate::fs::probe_writable_named(&dir, PROBE_FILENAME)?;

        let committed_path = dir.join(COMMITTED_FILENAME);
        let last_checkpoint = if committed_path.exists() {
            read_checkpoint_number(&committed_path)?
        } else {
            0
        };

        let results: Vec<Result<(), StockError>> = participants
            .iter_mut()
            .map(|p| p.guarantee_checkpoint(last_checkpoint))
            .collect();
        StockError::join(results)?;

        log::debug!(
            "checkpoint coordinator at {:?} opened at checkpoint {}",
            dir, last_checkpoint
        );

        Ok(CheckpointCoordinator {
            dir,
            last_checkpoint,
        })
    }

    pub fn last_checkpoint(&self) -> u32 {
        self.last_checkpoint
    }

    /// Runs the full two-phase commit:
    /// `prepare` every participant in order, write and atomically rename
    /// the decision file, then `commit` every participant. Returns the new
    /// checkpoint number.
    pub fn create_checkpoint(
        &mut self,
        participants: &mut [&mut dyn Participant],
    ) -> Result<u32, StockError> {
        let m = self.last_checkpoint + 1;

        let mut prepared = 0;
        let mut prepare_err = None;
        for p in participants.iter_mut() {
            match p.prepare(m) {
                Ok(()) => prepared += 1,
                Err(e) => {
                    prepare_err = Some(e);
                    break;
                }
            }
        }

        if let Some(err) = prepare_err {
            let mut errors = vec![err];
            for p in participants.iter_mut().take(prepared) {
                if let Err(e) = p.abort(m) {
                    errors.push(e);
                }
            }
            log::warn!(
                "checkpoint {} failed to prepare, aborted {} participant(s)",
                m, prepared
            );
            return Err(StockError::join_errors(errors));
        }

        let prepare_path = self.dir.join(PREPARE_FILENAME);
        crate::fs::atomic_write(&prepare_path, &m.to_be_bytes(), crate::fs::data_file_mode())?;

        // The linearization point: once this rename lands, every
        // participant is obligated to eventually reach checkpoint `m`,
        // whether or not the `commit` calls below complete in this process.
        let committed_path = self.dir.join(COMMITTED_FILENAME);
        fs::rename(&prepare_path, &committed_path)?;
        self.last_checkpoint = m;

        let commit_results: Vec<Result<(), StockError>> =
            participants.iter_mut().map(|p| p.commit(m)).collect();
        match StockError::join(commit_results) {
            Ok(_) => {
                log::info!("checkpoint {} committed", m);
                Ok(m)
            }
            Err(e) => {
                log::warn!("checkpoint {} committed but participant commit() failed: {}", m, e);
                Err(e)
            }
        }
    }
}

/// Reads the durable `committed` checkpoint number and calls `restore(n)`
/// on every restorer, joining any errors.
pub fn restore<P: AsRef<Path>>(
    dir: P,
    restorers: &mut [&mut dyn Restorer],
) -> Result<u32, StockError> {
    let committed_path = dir.as_ref().join(COMMITTED_FILENAME);
    if !committed_path.exists() {
        return Err(StockError::other(format!(
            "no committed checkpoint in {:?}",
            dir.as_ref()
        )));
    }
    let n = read_checkpoint_number(&committed_path)?;
    let results: Vec<Result<(), StockError>> = restorers.iter_mut().map(|r| r.restore(n)).collect();
    StockError::join(results).map(|_: Vec<()>| n)
}

fn read_checkpoint_number(path: &Path) -> Result<u32, StockError> {
    let data = fs::read(path)?;
    if data.len() != 4 {
        return Err(StockError::other(format!(
            "checkpoint file {:?} must be exactly 4 bytes, got {}",
            path,
            data.len()
        )));
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data);
    Ok(u32::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    struct MockParticipant {
        name: &'static str,
        committed: AtomicU32,
        prepared: Option<u32>,
        fail_prepare: bool,
        guarantee_calls: Vec<u32>,
    }

    impl MockParticipant {
        fn new(name: &'static str) -> Self {
            MockParticipant {
                name,
                committed: AtomicU32::new(0),
                prepared: None,
                fail_prepare: false,
                guarantee_calls: Vec::new(),
            }
        }
    }

    impl Participant for MockParticipant {
        fn prepare(&mut self, n: u32) -> Result<(), StockError> {
            if self.fail_prepare {
                return Err(StockError::other(format!("{} refuses to prepare", self.name)));
            }
            self.prepared = Some(n);
            Ok(())
        }

        fn commit(&mut self, n: u32) -> Result<(), StockError> {
            assert_eq!(self.prepared, Some(n));
            self.committed.store(n, Ordering::SeqCst);
            Ok(())
        }

        fn abort(&mut self, n: u32) -> Result<(), StockError> {
            assert_eq!(self.prepared, Some(n));
            self.prepared = None;
            Ok(())
        }

        fn guarantee_checkpoint(&mut self, n: u32) -> Result<(), StockError> {
            self.guarantee_calls.push(n);
            if self.prepared == Some(n) {
                self.committed.store(n, Ordering::SeqCst);
            } else if let Some(p) = self.prepared {
                if p > n {
                    self.prepared = None;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn create_checkpoint_advances_by_one_each_time() {
        crate::test_util::trace_init();
        let dir = tempdir().unwrap();
        let mut a = MockParticipant::new("a");
        let mut b = MockParticipant::new("b");
        let mut coord = {
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            CheckpointCoordinator::open(dir.path(), &mut participants).unwrap()
        };

        let n1 = {
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            coord.create_checkpoint(&mut participants).unwrap()
        };
        assert_eq!(n1, 1);

        let n2 = {
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            coord.create_checkpoint(&mut participants).unwrap()
        };
        assert_eq!(n2, 2);
    }

    #[test]
    fn reopen_recovers_via_guarantee_checkpoint() {
        let dir = tempdir().unwrap();
        let mut a = MockParticipant::new("a");
        let mut b = MockParticipant::new("b");
        {
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            let mut coord = CheckpointCoordinator::open(dir.path(), &mut participants).unwrap();
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            coord.create_checkpoint(&mut participants).unwrap();
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            coord.create_checkpoint(&mut participants).unwrap();
        }

        a.guarantee_calls.clear();
        b.guarantee_calls.clear();

        let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
        let coord = CheckpointCoordinator::open(dir.path(), &mut participants).unwrap();
        assert_eq!(coord.last_checkpoint(), 2);
        assert_eq!(a.guarantee_calls, vec![2]);
        assert_eq!(b.guarantee_calls, vec![2]);
    }

    #[test]
    fn abort_propagates_on_prepare_failure() {
        crate::test_util::trace_init();
        let dir = tempdir().unwrap();
        let mut a = MockParticipant::new("a");
        let mut b = MockParticipant::new("b");
        b.fail_prepare = true;

        let mut coord = {
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            CheckpointCoordinator::open(dir.path(), &mut participants).unwrap()
        };

        let err = {
            let mut participants: Vec<&mut dyn Participant> = vec![&mut a, &mut b];
            coord.create_checkpoint(&mut participants).unwrap_err()
        };
        assert!(err.to_string().contains("refuses to prepare"));
        assert_eq!(a.prepared, None, "a's prepared checkpoint must have been aborted");
        assert_eq!(coord.last_checkpoint(), 0);
    }
}
