//! Core data model: window descriptors, layouts, and path identity

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a live window
///
/// Only meaningful for the lifetime of the window it was read from; a closed and
/// relaunched window gets a new handle. Never use as a key across mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Screen-space window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.left, self.top)
    }
}

/// Normalized identity of a folder path
///
/// Comparison is case-insensitive and ignores surrounding whitespace and
/// trailing separators, except that a root (`/`, `C:\`) keeps its separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    pub fn new(path: &str) -> Self {
        let lowered = path.trim().to_lowercase();
        let mut key = lowered.as_str();
        while key.len() > 1 && key.ends_with(['/', '\\']) {
            let shorter = &key[..key.len() - 1];
            // "c:\" stays a root, "c:" alone would be a drive-relative path
            if shorter.ends_with(':') {
                break;
            }
            key = shorter;
        }
        Self(key.to_string())
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One live or saved folder-browser window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    /// Folder shown by the window; the only stable identity
    pub path: String,
    #[serde(default)]
    pub handle: WindowHandle,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub location_url: String,
    #[serde(flatten)]
    pub rect: Rect,
}

impl WindowDescriptor {
    pub fn new(path: impl Into<String>, handle: WindowHandle, rect: Rect) -> Self {
        let path = path.into();
        let display_name = display_name_for(&path);
        let location_url = location_url_for(&path);
        Self {
            path,
            handle,
            display_name,
            location_url,
            rect,
        }
    }

    /// Identity of the logical window, independent of its handle
    pub fn key(&self) -> PathKey {
        PathKey::new(&self.path)
    }
}

/// Final path component, or the whole path for roots
pub fn display_name_for(path: &str) -> String {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// `file://` URL for a folder path
pub fn location_url_for(path: &str) -> String {
    let forward = path.replace('\\', "/");
    if forward.starts_with('/') {
        format!("file://{forward}")
    } else {
        format!("file:///{forward}")
    }
}

/// Reserved: non-browser application to restore alongside windows
///
/// Persisted so files carrying it round-trip, but nothing populates or
/// consumes it yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationInfo {
    pub executable_path: String,
    pub arguments: String,
    pub working_directory: String,
    pub launch_maximized: bool,
}

/// Named, timestamped window arrangement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub saved_at: DateTime<Local>,
    #[serde(default)]
    pub windows: Vec<WindowDescriptor>,
    #[serde(default)]
    pub applications: Vec<ApplicationInfo>,
}

impl Layout {
    pub fn new(name: impl Into<String>, windows: Vec<WindowDescriptor>) -> Self {
        Self {
            name: name.into(),
            saved_at: Local::now(),
            windows,
            applications: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_key_case_insensitive() {
        assert_eq!(PathKey::new(r"C:\Users\Me"), PathKey::new(r"c:\USERS\me"));
        assert_eq!(PathKey::new("/Home/Docs"), PathKey::new("/home/docs"));
    }

    #[test]
    fn test_path_key_trailing_separators() {
        assert_eq!(PathKey::new(r"C:\A\"), PathKey::new(r"C:\A"));
        assert_eq!(PathKey::new("/srv/data//"), PathKey::new("/srv/data"));
        assert_eq!(PathKey::new("  /srv/data "), PathKey::new("/srv/data"));
    }

    #[test]
    fn test_path_key_roots_keep_separator() {
        assert_eq!(PathKey::new("/").to_string(), "/");
        assert_eq!(PathKey::new(r"C:\").to_string(), r"c:\");
        assert_ne!(PathKey::new(r"C:\"), PathKey::new("C:"));
    }

    #[test]
    fn test_identity_ignores_handle() {
        let a = WindowDescriptor::new(r"C:\Projects", WindowHandle(1), Rect::new(0, 0, 10, 10));
        let b = WindowDescriptor::new(r"c:\projects", WindowHandle(99), Rect::new(5, 5, 20, 20));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_display_name_and_url() {
        assert_eq!(display_name_for("/home/me/Music"), "Music");
        assert_eq!(display_name_for(r"C:\Users\Me\"), "Me");
        assert_eq!(display_name_for("/"), "/");
        assert_eq!(location_url_for("/home/me"), "file:///home/me");
        assert_eq!(location_url_for(r"C:\Users"), "file:///C:/Users");
    }

    #[test]
    fn test_application_fields_all_optional() {
        let app: ApplicationInfo = serde_json::from_str(r#"{"arguments": "--new"}"#).unwrap();
        assert_eq!(app.executable_path, "");
        assert_eq!(app.arguments, "--new");
        assert!(!app.launch_maximized);

        let layout: Layout = serde_json::from_str(
            r#"{"name": "x", "saved_at": "2024-05-01T10:00:00+00:00", "applications": [{}]}"#,
        )
        .unwrap();
        assert_eq!(layout.applications, vec![ApplicationInfo::default()]);
    }

    #[test]
    fn test_rect_display() {
        let rect = Rect::new(100, -50, 400, 300);
        assert_eq!(rect.to_string(), "400x300+100+-50");
    }

    #[test]
    fn test_layout_json_shape() {
        let layout = Layout::new(
            "work",
            vec![WindowDescriptor::new("/home/me", WindowHandle(7), Rect::new(1, 2, 3, 4))],
        );
        let json = serde_json::to_value(&layout).unwrap();
        let window = &json["windows"][0];
        assert_eq!(window["path"], "/home/me");
        assert_eq!(window["handle"], 7);
        assert_eq!(window["left"], 1);
        assert_eq!(window["height"], 4);
        assert_eq!(json["applications"].as_array().unwrap().len(), 0);

        let back: Layout = serde_json::from_value(json).unwrap();
        assert_eq!(back, layout);
    }
}
