//! In-memory desktop for tests
//!
//! Applies requests synchronously except launches, which can be delayed by a
//! number of enumerations or suppressed entirely to model slow or failed
//! process start.

use anyhow::{bail, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use super::{WindowController, WindowSnapshotProvider};
use crate::types::{PathKey, Rect, WindowDescriptor, WindowHandle};

/// Geometry given to freshly launched windows
pub const LAUNCH_RECT: Rect = Rect {
    left: 0,
    top: 0,
    width: 640,
    height: 480,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Close(WindowHandle),
    MoveResize(WindowHandle, Rect),
    Launch(String),
}

#[derive(Default)]
pub struct FakeDesktop {
    live: RefCell<Vec<WindowDescriptor>>,
    pending: RefCell<Vec<(usize, WindowDescriptor)>>,
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u64>,
    list_calls: Cell<usize>,
    /// Enumerations with index >= this value fail
    fail_list_from: Cell<Option<usize>>,
    /// Enumerations a launched window stays invisible for
    launch_delay: Cell<usize>,
    never_register: RefCell<HashSet<PathKey>>,
    refuse_launch: RefCell<HashSet<PathKey>>,
    refuse_close: RefCell<HashSet<WindowHandle>>,
}

impl FakeDesktop {
    pub fn new() -> Self {
        let desktop = Self::default();
        desktop.next_handle.set(0x1000);
        desktop
    }

    pub fn with_windows(paths: &[&str]) -> Self {
        let desktop = Self::new();
        for path in paths {
            desktop.open(path, LAUNCH_RECT);
        }
        desktop
    }

    fn allocate_handle(&self) -> WindowHandle {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        WindowHandle(handle)
    }

    /// Open a window directly, as if the user did it
    pub fn open(&self, path: &str, rect: Rect) -> WindowHandle {
        let handle = self.allocate_handle();
        self.live
            .borrow_mut()
            .push(WindowDescriptor::new(path, handle, rect));
        handle
    }

    pub fn window(&self, path: &str) -> Option<WindowDescriptor> {
        let key = PathKey::new(path);
        self.live.borrow().iter().find(|w| w.key() == key).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn fail_listing_from(&self, index: usize) {
        self.fail_list_from.set(Some(index));
    }

    pub fn set_launch_delay(&self, enumerations: usize) {
        self.launch_delay.set(enumerations);
    }

    pub fn never_register(&self, path: &str) {
        self.never_register.borrow_mut().insert(PathKey::new(path));
    }

    pub fn refuse_launch(&self, path: &str) {
        self.refuse_launch.borrow_mut().insert(PathKey::new(path));
    }

    pub fn refuse_close(&self, handle: WindowHandle) {
        self.refuse_close.borrow_mut().insert(handle);
    }

    fn promote_pending(&self) {
        let mut pending = self.pending.borrow_mut();
        let mut live = self.live.borrow_mut();
        pending.retain_mut(|(remaining, window)| {
            if *remaining == 0 {
                live.push(window.clone());
                false
            } else {
                *remaining -= 1;
                true
            }
        });
    }
}

impl WindowSnapshotProvider for FakeDesktop {
    fn list_live_windows(&self) -> Result<Vec<WindowDescriptor>> {
        let index = self.list_calls.get();
        self.list_calls.set(index + 1);
        if self.fail_list_from.get().is_some_and(|from| index >= from) {
            bail!("window enumeration unavailable (call {index})");
        }
        self.promote_pending();
        Ok(self.live.borrow().clone())
    }
}

impl WindowController for FakeDesktop {
    fn close(&self, handle: WindowHandle) -> Result<()> {
        self.calls.borrow_mut().push(Call::Close(handle));
        if self.refuse_close.borrow().contains(&handle) {
            bail!("close refused for {handle}");
        }
        self.live.borrow_mut().retain(|w| w.handle != handle);
        Ok(())
    }

    fn move_resize(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        self.calls.borrow_mut().push(Call::MoveResize(handle, rect));
        let mut live = self.live.borrow_mut();
        match live.iter_mut().find(|w| w.handle == handle) {
            Some(window) => {
                window.rect = rect;
                Ok(())
            }
            None => bail!("no window with handle {handle}"),
        }
    }

    fn launch(&self, path: &str) -> Result<()> {
        self.calls.borrow_mut().push(Call::Launch(path.to_string()));
        let key = PathKey::new(path);
        if self.refuse_launch.borrow().contains(&key) {
            bail!("could not start file manager for {path}");
        }
        if self.never_register.borrow().contains(&key) {
            return Ok(());
        }
        let window = WindowDescriptor::new(path, self.allocate_handle(), LAUNCH_RECT);
        self.pending
            .borrow_mut()
            .push((self.launch_delay.get(), window));
        Ok(())
    }
}
