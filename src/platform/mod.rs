//! Host windowing seams
//!
//! The reconciler only talks to the desktop through these two traits, so the
//! engine runs unchanged against the X11 backend or the in-memory fake used by
//! tests.

#[cfg(test)]
pub mod fake;
pub mod x11;

use anyhow::Result;

use crate::types::{Rect, WindowDescriptor, WindowHandle};

/// Read-only view of the live folder-browser windows
pub trait WindowSnapshotProvider {
    /// One-shot enumeration. Windows whose properties cannot be read are
    /// skipped; an `Err` means the enumeration itself failed.
    fn list_live_windows(&self) -> Result<Vec<WindowDescriptor>>;
}

/// Fire-and-forget window requests
///
/// None of these wait for the host to apply the change. `Ok` means the request
/// was delivered, not that the window has changed state.
pub trait WindowController {
    fn close(&self, handle: WindowHandle) -> Result<()>;
    fn move_resize(&self, handle: WindowHandle, rect: Rect) -> Result<()>;
    fn launch(&self, path: &str) -> Result<()>;
}
