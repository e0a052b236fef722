//! Layout reconciliation engine
//!
//! Drives the live folder windows toward a saved [`Layout`]:
//!
//! 1. enumerate live windows (abort here if the provider fails, nothing changed yet)
//! 2. push the live set onto the undo stack
//! 3. diff live vs desired by normalized path
//! 4. close `extra`, then launch `missing` (path only)
//! 5. settle: wait for launched windows to register
//! 6. re-enumerate, bind fresh handles by path and move/resize every desired window
//!
//! Handles are never carried across a mutating step; everything after step 4
//! uses handles read in step 6.

pub mod diff;

pub use diff::LayoutDiff;

use std::collections::HashMap;
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::settle;
use crate::platform::{WindowController, WindowSnapshotProvider};
use crate::types::{Layout, PathKey, WindowDescriptor, WindowHandle};
use crate::undo::UndoStack;

/// How long to wait for launched windows before repositioning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Sleep once, then re-query once
    Fixed { delay: Duration },
    /// Re-query every `interval` until all launched windows are live or attempts run out
    Poll { interval: Duration, max_attempts: u32 },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::Poll {
            interval: Duration::from_millis(settle::DEFAULT_INTERVAL_MS),
            max_attempts: settle::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Initial enumeration failed; no window was touched
    #[error("could not enumerate live windows, nothing was changed")]
    ProviderUnavailable(#[source] anyhow::Error),

    /// Every enumeration after close/launch failed; requests were already issued
    #[error("could not re-read live windows after issuing changes")]
    RequeryFailed(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Close,
    Launch,
    MoveResize,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Close => "close",
            Operation::Launch => "launch",
            Operation::MoveResize => "move/resize",
        })
    }
}

/// A controller request the host refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub operation: Operation,
    pub path: String,
    pub message: String,
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Close requests delivered for `extra` windows
    pub closed: usize,
    /// Launch requests delivered for `missing` windows
    pub launched: usize,
    /// Move/resize requests delivered after binding fresh handles
    pub repositioned: usize,
    /// Desired windows that were already live
    pub matched: usize,
    /// Desired paths with no live window after settling
    pub unresolved: Vec<String>,
    pub failures: Vec<OperationFailure>,
}

impl ReconcileReport {
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    pub fn is_converged(&self) -> bool {
        self.unresolved.is_empty() && self.failures.is_empty()
    }

    fn record_failure(&mut self, operation: Operation, path: &str, error: anyhow::Error) {
        warn!(%operation, path = %path, error = %error, "Window request failed");
        self.failures.push(OperationFailure {
            operation,
            path: path.to_string(),
            message: format!("{error:#}"),
        });
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "closed {}, launched {}, repositioned {}, unresolved {}",
            self.closed,
            self.launched,
            self.repositioned,
            self.unresolved_count()
        )?;
        if !self.failures.is_empty() {
            write!(f, ", failed requests {}", self.failures.len())?;
        }
        Ok(())
    }
}

/// Reconciles live windows toward layouts
///
/// Holds borrowed collaborators only; one instance can serve any number of
/// sequential runs. Runs are assumed not to overlap.
pub struct Reconciler<'a> {
    provider: &'a dyn WindowSnapshotProvider,
    controller: &'a dyn WindowController,
    undo: &'a UndoStack,
    settle: SettlePolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        provider: &'a dyn WindowSnapshotProvider,
        controller: &'a dyn WindowController,
        undo: &'a UndoStack,
        settle: SettlePolicy,
    ) -> Self {
        Self {
            provider,
            controller,
            undo,
            settle,
        }
    }

    /// Make the live folder windows match `desired`
    pub fn reconcile(&self, desired: &Layout) -> Result<ReconcileReport, ReconcileError> {
        info!(layout = %desired.name, windows = desired.windows.len(), "Restoring layout");
        self.run(&desired.windows, true)
    }

    /// Return to the arrangement observed before the most recent run
    ///
    /// `Ok(None)` when the undo stack is empty. Undo runs do not push, so
    /// repeated calls walk further back.
    pub fn undo(&self) -> Result<Option<ReconcileReport>, ReconcileError> {
        let Some(entry) = self.undo.pop() else {
            info!("Nothing to undo");
            return Ok(None);
        };
        info!(
            captured_at = %entry.captured_at,
            windows = entry.windows.len(),
            "Undoing to previous arrangement"
        );
        match self.run(&entry.windows, false) {
            Ok(report) => Ok(Some(report)),
            Err(err @ ReconcileError::ProviderUnavailable(_)) => {
                // Nothing was touched, keep the entry for another attempt
                self.undo.push_entry(entry);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn run(
        &self,
        desired: &[WindowDescriptor],
        record_undo: bool,
    ) -> Result<ReconcileReport, ReconcileError> {
        let live = self
            .provider
            .list_live_windows()
            .map_err(ReconcileError::ProviderUnavailable)?;
        debug!(live = live.len(), "Enumerated live windows");

        if record_undo {
            self.undo.push(live.clone());
        }

        let diff = LayoutDiff::compute(&live, desired);
        info!(
            extra = diff.extra.len(),
            missing = diff.missing.len(),
            matched = diff.matched.len(),
            "Computed layout diff"
        );

        if diff.is_empty() {
            debug!("Live folder set already matches, only repositioning");
        }

        let mut report = ReconcileReport {
            matched: diff.matched.len(),
            ..Default::default()
        };

        for window in &diff.extra {
            match self.controller.close(window.handle) {
                Ok(()) => {
                    debug!(path = %window.path, handle = %window.handle, "Requested close");
                    report.closed += 1;
                }
                Err(e) => report.record_failure(Operation::Close, &window.path, e),
            }
        }

        let mut awaited: HashMap<PathKey, usize> = HashMap::new();
        for window in &diff.missing {
            match self.controller.launch(&window.path) {
                Ok(()) => {
                    debug!(path = %window.path, "Requested launch");
                    report.launched += 1;
                    *awaited.entry(window.key()).or_default() += 1;
                }
                Err(e) => report.record_failure(Operation::Launch, &window.path, e),
            }
        }

        let fresh = self.settle(&awaited)?;
        self.reposition(desired, &fresh, &mut report);

        info!(
            closed = report.closed,
            launched = report.launched,
            repositioned = report.repositioned,
            unresolved = report.unresolved_count(),
            failed = report.failures.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// Wait according to policy and return the freshest live window set
    fn settle(
        &self,
        awaited: &HashMap<PathKey, usize>,
    ) -> Result<Vec<WindowDescriptor>, ReconcileError> {
        if awaited.is_empty() {
            return self
                .provider
                .list_live_windows()
                .map_err(ReconcileError::RequeryFailed);
        }

        match self.settle {
            SettlePolicy::Fixed { delay } => {
                debug!(delay_ms = delay.as_millis() as u64, "Settling before re-query");
                thread::sleep(delay);
                self.provider
                    .list_live_windows()
                    .map_err(ReconcileError::RequeryFailed)
            }
            SettlePolicy::Poll {
                interval,
                max_attempts,
            } => {
                let mut last_ok = None;
                let mut last_err = None;
                for attempt in 1..=max_attempts.max(1) {
                    thread::sleep(interval);
                    match self.provider.list_live_windows() {
                        Ok(windows) => {
                            let pending = pending_launches(awaited, &windows);
                            if pending == 0 {
                                debug!(attempt, "All launched windows registered");
                                return Ok(windows);
                            }
                            debug!(attempt, pending, "Waiting for launched windows");
                            last_ok = Some(windows);
                        }
                        Err(e) => {
                            warn!(attempt, error = %e, "Re-query failed while settling");
                            last_err = Some(e);
                        }
                    }
                }
                match last_ok {
                    Some(windows) => Ok(windows),
                    None => Err(ReconcileError::RequeryFailed(last_err.unwrap_or_else(|| {
                        anyhow::anyhow!("no re-query was attempted")
                    }))),
                }
            }
        }
    }

    /// Bind each desired window to a live handle by path and apply its geometry
    fn reposition(
        &self,
        desired: &[WindowDescriptor],
        live: &[WindowDescriptor],
        report: &mut ReconcileReport,
    ) {
        // path -> (live handles in enumeration order, next unused index)
        let mut by_path: HashMap<PathKey, (Vec<WindowHandle>, usize)> = HashMap::new();
        for window in live {
            by_path.entry(window.key()).or_default().0.push(window.handle);
        }

        for target in desired {
            let bound = by_path.get_mut(&target.key()).and_then(|(handles, next)| {
                let handle = handles.get(*next).or_else(|| handles.first()).copied();
                *next += 1;
                handle
            });

            let Some(handle) = bound else {
                warn!(path = %target.path, "Window did not appear, leaving unresolved");
                report.unresolved.push(target.path.clone());
                continue;
            };

            match self.controller.move_resize(handle, target.rect) {
                Ok(()) => {
                    debug!(path = %target.path, %handle, rect = %target.rect, "Requested move/resize");
                    report.repositioned += 1;
                }
                Err(e) => report.record_failure(Operation::MoveResize, &target.path, e),
            }
        }
    }
}

/// Launched windows not yet visible in `live`
fn pending_launches(awaited: &HashMap<PathKey, usize>, live: &[WindowDescriptor]) -> usize {
    let mut present: HashMap<PathKey, usize> = HashMap::new();
    for window in live {
        *present.entry(window.key()).or_default() += 1;
    }
    awaited
        .iter()
        .map(|(key, wanted)| wanted.saturating_sub(present.get(key).copied().unwrap_or(0)))
        .sum()
}
