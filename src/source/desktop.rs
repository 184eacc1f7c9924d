use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use configparser::ini::Ini;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::app::{IconHandle, RawAppEntry};
use crate::source::{DirectorySource, SourceError};

/// An `applications/` directory and whether its entries count as system apps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDir {
    pub path: PathBuf,
    pub system: bool,
}

/// Directory source backed by XDG desktop entries.
///
/// Directories are searched in order and the first one holding a desktop-file
/// ID wins, so user entries shadow system ones.
pub struct DesktopSource {
    dirs: Vec<AppDir>,
}

impl DesktopSource {
    pub fn new(dirs: Vec<AppDir>) -> Self {
        let mut unique: Vec<AppDir> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !unique.iter().any(|d| d.path == dir.path) {
                unique.push(dir);
            }
        }
        Self { dirs: unique }
    }

    /// Build a source from explicit directories, falling back to the XDG
    /// defaults for whichever side is left empty.
    pub fn from_overrides(user_dirs: Vec<PathBuf>, system_dirs: Vec<PathBuf>) -> Self {
        let user_dirs = if user_dirs.is_empty() {
            Self::default_user_dirs()
        } else {
            user_dirs
        };
        let system_dirs = if system_dirs.is_empty() {
            Self::default_system_dirs()
        } else {
            system_dirs
        };

        let dirs = user_dirs
            .into_iter()
            .map(|path| AppDir {
                path,
                system: false,
            })
            .chain(system_dirs.into_iter().map(|path| AppDir { path, system: true }))
            .collect();
        Self::new(dirs)
    }

    pub fn dirs(&self) -> &[AppDir] {
        &self.dirs
    }

    /// `$XDG_DATA_HOME/applications/` plus the per-user flatpak exports.
    pub fn default_user_dirs() -> Vec<PathBuf> {
        let data_home = std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")));

        match data_home {
            Some(data_home) => vec![
                data_home.join("applications"),
                data_home.join("flatpak/exports/share/applications"),
            ],
            None => Vec::new(),
        }
    }

    /// `$XDG_DATA_DIRS/*/applications/` plus system-wide flatpak and snap exports.
    pub fn default_system_dirs() -> Vec<PathBuf> {
        let data_dirs = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());

        let mut dirs: Vec<PathBuf> = data_dirs
            .split(':')
            .filter(|d| !d.is_empty())
            .map(|d| PathBuf::from(d).join("applications"))
            .collect();
        dirs.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));
        dirs.push(PathBuf::from("/var/lib/snapd/desktop/applications"));
        dirs
    }

    fn load_entry(
        path: &Path,
        package_id: &str,
        is_system_app: bool,
    ) -> Result<Option<RawAppEntry>, SourceError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                SourceError::PermissionDenied(path.display().to_string())
            }
            _ => SourceError::Io(e),
        })?;

        let entry = Self::parse_desktop_content(&content, package_id, is_system_app)
            .map_err(|e| match e {
                SourceError::ParseError(msg) => {
                    SourceError::ParseError(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;

        Ok(entry.map(|mut entry| {
            entry.install_time_millis = install_time_millis(path);
            entry
        }))
    }

    /// Parse desktop entry content. Entries that should not be listed yield
    /// `Ok(None)`. The install time is left at zero.
    pub fn parse_desktop_content(
        content: &str,
        package_id: &str,
        is_system_app: bool,
    ) -> Result<Option<RawAppEntry>, SourceError> {
        let mut config = Ini::new_cs();
        config.set_comment_symbols(&['#']);
        config
            .read(content.to_string())
            .map_err(SourceError::ParseError)?;

        let section = "Desktop Entry";

        let entry_type = config.get(section, "Type").unwrap_or_default();
        if entry_type.to_lowercase() != "application" {
            return Ok(None);
        }

        let no_display = config.get(section, "NoDisplay").unwrap_or_default();
        if no_display.to_lowercase() == "true" {
            return Ok(None);
        }

        let hidden = config.get(section, "Hidden").unwrap_or_default();
        if hidden.to_lowercase() == "true" {
            return Ok(None);
        }

        let name = match config.get(section, "Name") {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => return Ok(None),
        };

        // Entries without a command cannot be launched and are not listed.
        match config.get(section, "Exec") {
            Some(e) if !e.trim().is_empty() => {}
            _ => return Ok(None),
        }

        let icon = config
            .get(section, "Icon")
            .map(|v| IconHandle::from_entry_value(&v))
            .unwrap_or_default();

        Ok(Some(RawAppEntry {
            name,
            package_id: package_id.to_string(),
            icon,
            is_system_app,
            install_time_millis: 0,
        }))
    }
}

/// Desktop-file ID of `path` relative to its `applications/` root, e.g.
/// `kde4/okular.desktop` becomes `kde4-okular`.
pub fn desktop_file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.to_str()?;
    let stem = relative.strip_suffix(".desktop")?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('/', "-"))
}

fn is_valid_package_id(package_id: &str) -> bool {
    !package_id.is_empty()
        && !package_id.contains('/')
        && !package_id.contains('\\')
        && package_id != "."
        && package_id != ".."
}

/// Desktop files under `root` in walk order. A root that cannot be read, or
/// any permission failure below it, fails the walk. Dangling links and loops
/// are skipped.
fn desktop_files(root: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .max_depth(3)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 || is_permission_denied(&e) => {
                return Err(walk_error(root, e));
            }
            Err(e) => {
                warn!("skipping {}: {}", e.path().unwrap_or(root).display(), e);
                continue;
            }
        };
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("desktop")
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == ErrorKind::PermissionDenied)
}

fn walk_error(root: &Path, err: walkdir::Error) -> SourceError {
    let path = err.path().unwrap_or(root).display().to_string();
    if is_permission_denied(&err) {
        SourceError::PermissionDenied(path)
    } else {
        SourceError::Io(err.into())
    }
}

/// Creation time of the entry file, falling back to its modification time.
fn install_time_millis(path: &Path) -> i64 {
    let Ok(metadata) = fs::metadata(path) else {
        return 0;
    };
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl DirectorySource for DesktopSource {
    fn name(&self) -> &str {
        "desktop"
    }

    fn enumerate_all(&self) -> Result<Vec<RawAppEntry>, SourceError> {
        let mut entries = Vec::new();
        let mut seen_ids = HashSet::new();

        for dir in &self.dirs {
            if !dir.path.is_dir() {
                continue;
            }

            for path in desktop_files(&dir.path)? {
                let Some(id) = desktop_file_id(&dir.path, &path) else {
                    continue;
                };

                // A hidden user entry still shadows the system one.
                if !seen_ids.insert(id.clone()) {
                    debug!("{} shadowed by an earlier directory", path.display());
                    continue;
                }

                match Self::load_entry(&path, &id, dir.system) {
                    Ok(Some(entry)) => entries.push(entry),
                    Ok(None) => {}
                    Err(e @ SourceError::PermissionDenied(_)) => return Err(e),
                    Err(e) => warn!("{}: {}", path.display(), e),
                }
            }
        }

        Ok(entries)
    }

    fn resolve_one(&self, package_id: &str) -> Result<RawAppEntry, SourceError> {
        if !is_valid_package_id(package_id) {
            return Err(SourceError::NotFound(package_id.to_string()));
        }

        for dir in &self.dirs {
            if !dir.path.is_dir() {
                continue;
            }

            // Same walk order as `enumerate_all`, so both pick the same file
            // when a flat and a nested entry share an id.
            let found = desktop_files(&dir.path)?
                .into_iter()
                .find(|p| desktop_file_id(&dir.path, p).as_deref() == Some(package_id));

            if let Some(path) = found {
                return match Self::load_entry(&path, package_id, dir.system) {
                    Ok(Some(entry)) => Ok(entry),
                    Ok(None) => Err(SourceError::NotFound(package_id.to_string())),
                    Err(SourceError::ParseError(msg)) => {
                        warn!("{}", msg);
                        Err(SourceError::NotFound(package_id.to_string()))
                    }
                    Err(e) => Err(e),
                };
            }
        }

        Err(SourceError::NotFound(package_id.to_string()))
    }
}
