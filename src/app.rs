use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Whether an application ships with the system or was installed by the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppOrigin {
    User,
    System,
}

impl AppOrigin {
    pub fn from_system_flag(is_system_app: bool) -> Self {
        if is_system_app {
            AppOrigin::System
        } else {
            AppOrigin::User
        }
    }
}

impl fmt::Display for AppOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppOrigin::User => write!(f, "user"),
            AppOrigin::System => write!(f, "system"),
        }
    }
}

/// Opaque icon reference as reported by a directory source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum IconHandle {
    #[default]
    None,
    /// Themed icon name, e.g. `firefox`.
    Name(String),
    /// Absolute path to an image file.
    Path(PathBuf),
}

impl IconHandle {
    /// Interpret the raw `Icon=` value of a desktop entry.
    pub fn from_entry_value(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            IconHandle::None
        } else if value.starts_with('/') {
            IconHandle::Path(PathBuf::from(value))
        } else {
            IconHandle::Name(value.to_string())
        }
    }
}

/// A fixed-size icon image produced by an icon materializer.
///
/// `file` is the resolved image backing the icon; `None` means the
/// presentation layer should draw its generic placeholder at `size_px`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterImage {
    pub size_px: u32,
    pub file: Option<PathBuf>,
}

impl RasterImage {
    pub fn placeholder(size_px: u32) -> Self {
        Self {
            size_px,
            file: None,
        }
    }
}

/// An application as enumerated by a directory source, before its icon is
/// materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAppEntry {
    pub name: String,
    pub package_id: String,
    pub icon: IconHandle,
    pub is_system_app: bool,
    pub install_time_millis: i64,
}

/// A fully resolved, immutable application record. Keyed by `package_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub name: String,
    pub package_id: String,
    pub icon: RasterImage,
    pub is_system_app: bool,
    pub install_time_millis: i64,
}

impl ApplicationRecord {
    pub fn origin(&self) -> AppOrigin {
        AppOrigin::from_system_flag(self.is_system_app)
    }

    /// Install time rendered as a local date, or `-` when the source had none.
    pub fn installed_display(&self) -> String {
        if self.install_time_millis <= 0 {
            return "-".to_string();
        }
        match chrono::DateTime::from_timestamp_millis(self.install_time_millis) {
            Some(utc) => utc
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            None => "-".to_string(),
        }
    }
}
