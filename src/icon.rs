//! Icon lookup across XDG icon directories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;
use walkdir::WalkDir;

use crate::app::{IconHandle, RasterImage};

/// Icon edge length used when nothing else is configured.
pub const DEFAULT_ICON_SIZE_PX: u32 = 40;

/// Turns an icon handle into a fixed-size image. Must be deterministic.
pub trait IconMaterializer: Send + Sync {
    fn materialize(&self, handle: &IconHandle, target_size_px: u32) -> RasterImage;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IconSize {
    Fixed(u32),
    Scalable,
    Unknown,
}

#[derive(Debug, Clone)]
struct IconFile {
    path: PathBuf,
    size: IconSize,
}

/// Resolves themed icon names against an index of the icon directories.
///
/// The index is built on first use, so constructing the materializer is cheap.
pub struct ThemeIconMaterializer {
    base_dirs: Vec<PathBuf>,
    index: OnceLock<HashMap<String, Vec<IconFile>>>,
}

impl ThemeIconMaterializer {
    pub fn new(base_dirs: Vec<PathBuf>) -> Self {
        Self {
            base_dirs,
            index: OnceLock::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(Self::default_icon_dirs())
    }

    /// User icons first, then `$XDG_DATA_DIRS`, pixmaps and app-format exports.
    pub fn default_icon_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        let home = dirs::home_dir();

        let data_home = std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| home.as_ref().map(|h| h.join(".local/share")));
        if let Some(data_home) = &data_home {
            dirs.push(data_home.join("icons"));
        }
        if let Some(home) = &home {
            dirs.push(home.join(".icons"));
        }

        let data_dirs = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
        for data_dir in data_dirs.split(':').filter(|d| !d.is_empty()) {
            dirs.push(PathBuf::from(data_dir).join("icons"));
            dirs.push(PathBuf::from(data_dir).join("pixmaps"));
        }

        dirs.push(PathBuf::from("/var/lib/flatpak/exports/share/icons"));
        if let Some(data_home) = &data_home {
            dirs.push(data_home.join("flatpak/exports/share/icons"));
        }
        dirs.push(PathBuf::from("/var/lib/snapd/desktop/icons"));

        dirs.dedup();
        dirs
    }

    fn index(&self) -> &HashMap<String, Vec<IconFile>> {
        self.index.get_or_init(|| build_index(&self.base_dirs))
    }

    fn resolve_name(&self, name: &str, target_size_px: u32) -> Option<PathBuf> {
        let index = self.index();
        let lower = name.to_lowercase();

        // Some entries carry the extension in the icon name.
        let stripped = [".png", ".svg", ".xpm"]
            .iter()
            .find_map(|ext| lower.strip_suffix(ext))
            .unwrap_or(&lower)
            .to_string();

        let variants = [
            lower.clone(),
            stripped,
            lower.replace(' ', "-"),
            lower.replace('_', "-"),
        ];

        variants
            .iter()
            .find_map(|variant| index.get(variant))
            .and_then(|candidates| pick_best(candidates, target_size_px))
    }
}

impl IconMaterializer for ThemeIconMaterializer {
    fn materialize(&self, handle: &IconHandle, target_size_px: u32) -> RasterImage {
        let file = match handle {
            IconHandle::None => None,
            IconHandle::Path(path) if path.is_file() => Some(path.clone()),
            IconHandle::Path(path) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| self.resolve_name(stem, target_size_px)),
            IconHandle::Name(name) => self.resolve_name(name, target_size_px),
        };

        if file.is_none() && *handle != IconHandle::None {
            debug!("no icon found for {:?}, using placeholder", handle);
        }

        RasterImage {
            size_px: target_size_px,
            file,
        }
    }
}

fn build_index(dirs: &[PathBuf]) -> HashMap<String, Vec<IconFile>> {
    let mut index: HashMap<String, Vec<IconFile>> = HashMap::new();
    let allowed_extensions = ["png", "svg", "xpm", "webp"];

    debug!("Scanning {} icon directories...", dirs.len());

    for dir in dirs {
        if !dir.exists() {
            continue;
        }

        let walker = WalkDir::new(dir)
            .follow_links(true)
            .max_depth(10)
            .sort_by_file_name();

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let ext = match path.extension().and_then(|e| e.to_str()) {
                Some(e) => e.to_lowercase(),
                None => continue,
            };
            if !allowed_extensions.contains(&ext.as_str()) {
                continue;
            }

            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_lowercase(),
                None => continue,
            };

            let size = if ext == "svg" {
                IconSize::Scalable
            } else {
                nominal_size(path)
            };

            index.entry(stem).or_default().push(IconFile {
                path: path.to_path_buf(),
                size,
            });
        }
    }

    debug!("Indexed {} icon names", index.len());
    index
}

/// Read the theme size directory (`48x48`, `256x256@2`, `scalable`) from a path.
fn nominal_size(path: &Path) -> IconSize {
    for component in path.components().rev() {
        let Some(part) = component.as_os_str().to_str() else {
            continue;
        };
        if part == "scalable" {
            return IconSize::Scalable;
        }

        let (dims, scale) = match part.split_once('@') {
            Some((dims, scale)) => (dims, scale.parse::<u32>().unwrap_or(1)),
            None => (part, 1),
        };
        if let Some((w, h)) = dims.split_once('x') {
            if let (Ok(w), Ok(_)) = (w.parse::<u32>(), h.parse::<u32>()) {
                return IconSize::Fixed(w.saturating_mul(scale));
            }
        }
    }
    IconSize::Unknown
}

/// Prefer the smallest icon at least as large as the target, then scalable
/// art, then the largest smaller bitmap.
fn pick_best(candidates: &[IconFile], target_size_px: u32) -> Option<PathBuf> {
    candidates
        .iter()
        .min_by_key(|icon| match icon.size {
            IconSize::Fixed(n) if n >= target_size_px => (0, n - target_size_px),
            IconSize::Scalable => (1, 0),
            IconSize::Fixed(n) => (2, target_size_px - n),
            IconSize::Unknown => (3, 0),
        })
        .map(|icon| icon.path.clone())
}
