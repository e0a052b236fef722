//! X11 / EWMH backend for file-manager windows
//!
//! Folder windows are recognized by `WM_CLASS` and their folder is read from
//! the window title, so the file manager must be set to show the full path in
//! its title bar.
//!
//! Stored geometry is the frame origin plus the client size. A `ConfigureWindow`
//! on the client is placed by a reparenting window manager with the default
//! NorthWest gravity, which positions the frame at the requested point, so the
//! same numbers round-trip.

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use super::{WindowController, WindowSnapshotProvider};
use crate::config::FileManagerSettings;
use crate::constants::x11;
use crate::types::{Rect, WindowDescriptor, WindowHandle};

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub net_client_list: Atom,
    pub net_wm_name: Atom,
    pub net_close_window: Atom,
    pub net_frame_extents: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            net_client_list: intern(conn, b"_NET_CLIENT_LIST")?,
            net_wm_name: intern(conn, b"_NET_WM_NAME")?,
            net_close_window: intern(conn, b"_NET_CLOSE_WINDOW")?,
            net_frame_extents: intern(conn, b"_NET_FRAME_EXTENTS")?,
        })
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom> {
    let label = String::from_utf8_lossy(name);
    Ok(conn
        .intern_atom(false, name)
        .with_context(|| format!("Failed to intern {} atom", label))?
        .reply()
        .with_context(|| format!("Failed to get reply for {} atom", label))?
        .atom)
}

/// Left and top decoration sizes from `_NET_FRAME_EXTENTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameExtents {
    pub left: u32,
    pub top: u32,
}

impl FrameExtents {
    /// Property is CARDINAL[4] left, right, top, bottom; anything shorter means undecorated
    pub fn from_property(values: &[u32]) -> Self {
        match values {
            [left, _right, top, _bottom, ..] => Self {
                left: *left,
                top: *top,
            },
            _ => Self::default(),
        }
    }

    /// Frame origin for a client whose origin is at (`client_x`, `client_y`) in root coordinates
    pub fn frame_rect(&self, client_x: i32, client_y: i32, width: i32, height: i32) -> Rect {
        Rect::new(
            client_x.saturating_sub(self.left as i32),
            client_y.saturating_sub(self.top as i32),
            width,
            height,
        )
    }
}

/// Outcome of inspecting one client window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Described {
    Folder(WindowDescriptor),
    /// File manager window whose title does not carry a path
    NotPath(String),
    Other,
}

/// Folder windows from one enumeration, plus file-manager titles that could not be read as paths
#[derive(Debug, Default)]
pub struct WindowScan {
    pub folders: Vec<WindowDescriptor>,
    pub non_path_titles: Vec<String>,
}

/// Inspect every window, skipping those whose properties cannot be read
pub fn collect_described<I, F>(windows: I, mut describe: F) -> WindowScan
where
    I: IntoIterator<Item = Window>,
    F: FnMut(Window) -> Result<Described>,
{
    let mut scan = WindowScan::default();
    for window in windows {
        match describe(window) {
            Ok(Described::Folder(descriptor)) => scan.folders.push(descriptor),
            Ok(Described::NotPath(title)) => scan.non_path_titles.push(title),
            Ok(Described::Other) => {}
            Err(e) => {
                // Usually a window that closed mid-scan
                warn!(window, error = %e, "Could not read window properties, skipping");
            }
        }
    }
    scan
}

/// Drop finished children from `children`, returning how many are still running
pub fn reap_exited(children: &mut Vec<Child>) -> usize {
    children.retain_mut(|child| match child.try_wait() {
        Ok(Some(status)) => {
            debug!(pid = child.id(), exit = ?status.code(), "File manager process exited");
            false
        }
        Ok(None) => true,
        Err(e) => {
            warn!(pid = child.id(), error = %e, "Failed to poll file manager process");
            false
        }
    });
    children.len()
}

/// Live desktop reached through an X11 connection
pub struct X11Desktop {
    conn: RustConnection,
    root: Window,
    atoms: CachedAtoms,
    file_manager: FileManagerSettings,
    /// Launched file managers not yet reaped
    children: Mutex<Vec<Child>>,
}

impl X11Desktop {
    pub fn connect(file_manager: FileManagerSettings) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11 display")?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| anyhow!("X11 screen {} not found", screen_num))?;
        let atoms = CachedAtoms::new(&conn)?;
        info!(screen = screen_num, "Connected to X11");
        Ok(Self {
            conn,
            root,
            atoms,
            file_manager,
            children: Mutex::new(Vec::new()),
        })
    }

    fn children(&self) -> MutexGuard<'_, Vec<Child>> {
        self.children.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enumerate client windows, keeping titles that were not paths for diagnostics
    pub fn scan(&self) -> Result<WindowScan> {
        let scan = collect_described(self.client_list()?, |window| self.describe(window));
        debug!(
            count = scan.folders.len(),
            non_path = scan.non_path_titles.len(),
            "Enumerated folder windows"
        );
        Ok(scan)
    }

    fn client_list(&self) -> Result<Vec<Window>> {
        let prop = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_client_list,
                AtomEnum::WINDOW,
                0,
                u32::MAX,
            )
            .context("Failed to query _NET_CLIENT_LIST property")?
            .reply()
            .context("Failed to get window list from X11 server")?;
        Ok(prop
            .value32()
            .ok_or_else(|| anyhow!("Invalid return from _NET_CLIENT_LIST"))?
            .collect())
    }

    fn string_property(&self, window: Window, property: impl Into<Atom>) -> Result<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, x11::MAX_PROPERTY_LENGTH)
            .with_context(|| format!("Failed to query property for window {}", window))?
            .reply()
            .with_context(|| format!("Failed to get property reply for window {}", window))?;
        Ok(reply.value)
    }

    fn title(&self, window: Window) -> Result<String> {
        let mut raw = self.string_property(window, self.atoms.net_wm_name)?;
        if raw.is_empty() {
            raw = self.string_property(window, AtomEnum::WM_NAME)?;
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn frame_extents(&self, window: Window) -> Result<FrameExtents> {
        let reply = self
            .conn
            .get_property(false, window, self.atoms.net_frame_extents, AtomEnum::CARDINAL, 0, 4)
            .with_context(|| format!("Failed to query _NET_FRAME_EXTENTS for window {}", window))?
            .reply()
            .with_context(|| format!("Failed to get _NET_FRAME_EXTENTS reply for window {}", window))?;
        let values: Vec<u32> = reply.value32().map(|values| values.collect()).unwrap_or_default();
        Ok(FrameExtents::from_property(&values))
    }

    /// Frame origin in root coordinates plus client size
    fn geometry(&self, window: Window) -> Result<Rect> {
        let geom = self
            .conn
            .get_geometry(window)
            .with_context(|| format!("Failed to query geometry for window {}", window))?
            .reply()
            .with_context(|| format!("Failed to get geometry reply for window {}", window))?;
        let origin = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)
            .with_context(|| format!("Failed to translate coordinates for window {}", window))?
            .reply()
            .with_context(|| format!("Failed to get coordinates reply for window {}", window))?;
        let extents = self.frame_extents(window)?;
        Ok(extents.frame_rect(
            origin.dst_x.into(),
            origin.dst_y.into(),
            geom.width.into(),
            geom.height.into(),
        ))
    }

    fn describe(&self, window: Window) -> Result<Described> {
        let class = self.string_property(window, AtomEnum::WM_CLASS)?;
        if !matches_class(&class, &self.file_manager.window_classes) {
            return Ok(Described::Other);
        }

        let title = self.title(window)?;
        let Some(path) = path_from_title(&title, &self.file_manager.title_suffixes) else {
            debug!(window, title = %title, "File manager title is not a path, skipping");
            return Ok(Described::NotPath(title));
        };

        let rect = self.geometry(window)?;
        Ok(Described::Folder(WindowDescriptor::new(
            path,
            WindowHandle(window.into()),
            rect,
        )))
    }
}

fn x11_window(handle: WindowHandle) -> Result<Window> {
    Window::try_from(handle.0).with_context(|| format!("Handle {} is not an X11 window id", handle))
}

impl WindowSnapshotProvider for X11Desktop {
    fn list_live_windows(&self) -> Result<Vec<WindowDescriptor>> {
        Ok(self.scan()?.folders)
    }
}

impl WindowController for X11Desktop {
    fn close(&self, handle: WindowHandle) -> Result<()> {
        let window = x11_window(handle)?;
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.net_close_window,
            [x11rb::CURRENT_TIME, x11::SOURCE_INDICATION_PAGER, 0, 0, 0],
        );
        self.conn
            .send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                &event,
            )
            .with_context(|| format!("Failed to send _NET_CLOSE_WINDOW for window {}", window))?;
        self.conn
            .flush()
            .context("Failed to flush X11 connection after close request")?;
        Ok(())
    }

    fn move_resize(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        let window = x11_window(handle)?;
        self.conn
            .configure_window(
                window,
                &ConfigureWindowAux::new()
                    .x(rect.left)
                    .y(rect.top)
                    .width(rect.width.max(1) as u32)
                    .height(rect.height.max(1) as u32),
            )
            .with_context(|| format!("Failed to configure window {}", window))?;
        self.conn
            .flush()
            .context("Failed to flush X11 connection after move/resize")?;
        Ok(())
    }

    fn launch(&self, path: &str) -> Result<()> {
        let program = &self.file_manager.launch_program;
        let mut children = self.children();
        reap_exited(&mut children);

        let child = Command::new(program)
            .args(&self.file_manager.launch_args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start '{}' for {}", program, path))?;
        debug!(pid = child.id(), program = %program, path = %path, "Spawned file manager");
        children.push(child);
        Ok(())
    }
}

/// `WM_CLASS` is "instance\0class\0"; either part may match
pub fn matches_class(wm_class: &[u8], classes: &[String]) -> bool {
    wm_class
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(String::from_utf8_lossy)
        .any(|part| classes.iter().any(|class| class.eq_ignore_ascii_case(&part)))
}

/// Folder path shown in a window title, if the title is one
pub fn path_from_title(title: &str, suffixes: &[String]) -> Option<String> {
    let mut text = title.trim();
    for suffix in suffixes {
        if let Some(stripped) = text.strip_suffix(suffix.as_str()) {
            text = stripped.trim_end();
            break;
        }
    }

    if text == "~" || text.starts_with("~/") {
        let home = dirs::home_dir()?;
        return Some(format!("{}{}", home.display(), &text[1..]));
    }

    Path::new(text).is_absolute().then(|| text.to_string())
}
