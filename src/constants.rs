//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Config and storage locations
pub mod paths {
    /// Directory name under the platform config/data dirs
    pub const APP_DIR: &str = "folder-layout";

    /// Configuration filename
    pub const CONFIG_FILENAME: &str = "config.json";

    /// Saved layouts filename
    pub const LAYOUTS_FILENAME: &str = "layouts.json";
}

/// Settle wait defaults (time allowed for launched windows to appear)
pub mod settle {
    /// Fixed mode delay in milliseconds
    pub const DEFAULT_DELAY_MS: u64 = 1000;

    /// Poll mode interval between re-queries in milliseconds
    pub const DEFAULT_INTERVAL_MS: u64 = 250;

    /// Poll mode re-query attempts before giving up on missing windows
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

    pub const MAX_DELAY_MS: u64 = 30_000;
    pub const MIN_INTERVAL_MS: u64 = 10;
    pub const MAX_INTERVAL_MS: u64 = 10_000;
    pub const MIN_ATTEMPTS: u32 = 1;
    pub const MAX_ATTEMPTS: u32 = 100;
}

/// Undo stack bounds
pub mod undo {
    pub const DEFAULT_DEPTH: usize = 20;
    pub const MIN_DEPTH: usize = 1;
    pub const MAX_DEPTH: usize = 500;
}

/// File manager recognition defaults
pub mod file_manager {
    /// WM_CLASS values treated as folder-browser windows
    pub const DEFAULT_WINDOW_CLASSES: &[&str] = &["Thunar", "Pcmanfm", "Nemo", "Caja"];

    /// Title suffixes stripped before the title is read as a path
    pub const DEFAULT_TITLE_SUFFIXES: &[&str] = &[" - Thunar", " - File Manager"];

    /// Program launched to open a folder window
    pub const DEFAULT_LAUNCH_PROGRAM: &str = "thunar";
}

/// X11 / EWMH protocol constants
pub mod x11 {
    /// Source indication for EWMH client messages (2 = pager/direct user action)
    pub const SOURCE_INDICATION_PAGER: u32 = 2;

    /// Upper bound (in 32-bit units) when reading string properties
    pub const MAX_PROPERTY_LENGTH: u32 = 1024;
}
