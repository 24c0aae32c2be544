//! Ordered action/compensation runner for cross-service workflows.
//!
//! Each successful step registers its compensation. When a later step
//! fails, the registered compensations run in reverse order of completion,
//! so only a strict prefix of completed work is ever unwound.

use std::future::Future;

use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use crate::error::LicenseError;

type Compensation<'a> = BoxFuture<'a, Result<(), LicenseError>>;

/// One in-flight workflow.
///
/// Compensations are stored as unpolled futures; they only execute if the
/// saga is aborted.
pub struct Saga<'a> {
    name: &'static str,
    completed: Vec<(String, Compensation<'a>)>,
}

impl<'a> Saga<'a> {
    /// Starts an empty saga.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            completed: Vec::new(),
        }
    }

    /// Workflow name used in logs and failures.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Steps completed so far, in order.
    pub fn completed_steps(&self) -> Vec<&str> {
        self.completed.iter().map(|(step, _)| step.as_str()).collect()
    }

    /// Runs `action`; on success registers `compensate(&value)` as its undo.
    ///
    /// On failure the saga is aborted and the returned error is the
    /// aborted saga's error.
    pub async fn step<T, A, C, CF>(
        &mut self,
        step: impl Into<String>,
        action: A,
        compensate: C,
    ) -> Result<T, LicenseError>
    where
        A: Future<Output = Result<T, LicenseError>>,
        C: FnOnce(&T) -> CF,
        CF: Future<Output = Result<(), LicenseError>> + Send + 'a,
    {
        let step = step.into();
        match action.await {
            Ok(value) => {
                debug!(saga = self.name, step = %step, "Saga step completed");
                self.completed.push((step, Box::pin(compensate(&value))));
                Ok(value)
            }
            Err(cause) => Err(self.abort(step, cause).await),
        }
    }

    /// Runs a step that needs no undo, typically the last one.
    pub async fn run<T, A>(&mut self, step: impl Into<String>, action: A) -> Result<T, LicenseError>
    where
        A: Future<Output = Result<T, LicenseError>>,
    {
        let step = step.into();
        match action.await {
            Ok(value) => Ok(value),
            Err(cause) => Err(self.abort(step, cause).await),
        }
    }

    /// Unwinds every completed step in reverse order.
    ///
    /// Returns `cause` unchanged when nothing had completed, otherwise a
    /// [`LicenseError::PartialFailure`] wrapping it. A compensation that
    /// fails is logged and counted as unreconciled; the unwind continues.
    pub async fn abort(&mut self, step: impl Into<String>, cause: LicenseError) -> LicenseError {
        let step = step.into();
        if self.completed.is_empty() {
            debug!(saga = self.name, step = %step, error = %cause, "Saga failed before any step completed");
            return cause;
        }

        warn!(
            saga = self.name,
            step = %step,
            completed = self.completed.len(),
            error = %cause,
            "Saga step failed, compensating"
        );

        let mut compensated = 0;
        let mut unreconciled = 0;
        while let Some((done, compensation)) = self.completed.pop() {
            match compensation.await {
                Ok(()) => {
                    compensated += 1;
                    debug!(saga = self.name, step = %done, "Compensated");
                }
                Err(e) => {
                    unreconciled += 1;
                    error!(
                        saga = self.name,
                        step = %done,
                        error = %e,
                        "Compensation failed; manual reconciliation required"
                    );
                }
            }
        }

        LicenseError::PartialFailure {
            saga: self.name,
            step,
            compensated,
            unreconciled,
            source: Box::new(cause),
        }
    }

    /// Completes the saga, discarding the registered compensations.
    pub fn finish(self) -> usize {
        let steps = self.completed.len();
        debug!(saga = self.name, steps, "Saga completed");
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use seatkeeper_entity::license::Product;

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn undo(log: &Arc<Mutex<Vec<String>>>, entry: &str) -> BoxFuture<'static, Result<(), LicenseError>> {
        let log = log.clone();
        let entry = entry.to_string();
        Box::pin(async move {
            log.lock().unwrap().push(entry);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_compensates_in_reverse_order() {
        let log = journal();
        let mut saga = Saga::new("test");

        saga.step("a", async { Ok(1) }, |_| undo(&log, "undo a"))
            .await
            .unwrap();
        saga.step("b", async { Ok(2) }, |_| undo(&log, "undo b"))
            .await
            .unwrap();
        let err = saga
            .step(
                "c",
                async {
                    Err::<(), _>(LicenseError::NoSeatAvailable {
                        product: Product::Drive,
                    })
                },
                |_| undo(&log, "undo c"),
            )
            .await
            .unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec!["undo b", "undo a"]);
        match err {
            LicenseError::PartialFailure {
                step,
                compensated,
                unreconciled,
                source,
                ..
            } => {
                assert_eq!(step, "c");
                assert_eq!(compensated, 2);
                assert_eq!(unreconciled, 0);
                assert!(matches!(*source, LicenseError::NoSeatAvailable { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_step_failure_is_returned_bare() {
        let mut saga: Saga<'_> = Saga::new("test");
        let err = saga
            .run("only", async {
                Err::<(), _>(LicenseError::NoLicenseSelected)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LicenseError::NoLicenseSelected));
    }

    #[tokio::test]
    async fn test_failed_compensation_is_counted_and_unwind_continues() {
        let log = journal();
        let mut saga = Saga::new("test");

        saga.step("a", async { Ok(()) }, |_| undo(&log, "undo a"))
            .await
            .unwrap();
        saga.step("b", async { Ok(()) }, |_| async {
            Err(LicenseError::InviteNotFound)
        })
        .await
        .unwrap();

        let err = saga.abort("c", LicenseError::NoLicenseSelected).await;
        assert_eq!(*log.lock().unwrap(), vec!["undo a"]);
        assert!(matches!(
            err,
            LicenseError::PartialFailure {
                compensated: 1,
                unreconciled: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_finish_never_runs_compensations() {
        let log = journal();
        let mut saga = Saga::new("test");
        saga.step("a", async { Ok(()) }, |_| undo(&log, "undo a"))
            .await
            .unwrap();
        assert_eq!(saga.completed_steps(), vec!["a"]);
        assert_eq!(saga.finish(), 1);
        assert!(log.lock().unwrap().is_empty());
    }
}
