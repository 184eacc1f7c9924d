use std::fs;
use std::path::Path;
use std::sync::Arc;

use appshelf::catalog::{CatalogCache, CatalogConfig};
use appshelf::error::CatalogError;
use appshelf::icon::ThemeIconMaterializer;
use appshelf::query::{self, FilterSpec, SortSpec};
use appshelf::source::desktop::{AppDir, DesktopSource};
use appshelf::source::DirectorySource;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn entry(name: &str, icon: Option<&str>) -> String {
    let mut content = format!(
        "[Desktop Entry]\nType=Application\nName={}\nExec={}\n",
        name,
        name.to_lowercase()
    );
    if let Some(icon) = icon {
        content.push_str(&format!("Icon={}\n", icon));
    }
    content
}

struct Roots {
    user: TempDir,
    system: TempDir,
    icons: TempDir,
}

fn roots() -> Roots {
    let roots = Roots {
        user: tempfile::tempdir().unwrap(),
        system: tempfile::tempdir().unwrap(),
        icons: tempfile::tempdir().unwrap(),
    };
    write(roots.system.path(), "firefox.desktop", &entry("Firefox", Some("firefox")));
    write(roots.system.path(), "kde4/okular.desktop", &entry("Okular", None));
    write(roots.system.path(), "xterm.desktop", &entry("XTerm", Some("utilities-terminal")));
    write(roots.user.path(), "notes.desktop", &entry("notes", None));
    write(
        roots.user.path(),
        "xterm.desktop",
        "[Desktop Entry]\nType=Application\nName=XTerm\nExec=xterm\nHidden=true\n",
    );
    write(
        roots.user.path(),
        "daemon.desktop",
        "[Desktop Entry]\nType=Service\nName=Daemon\nExec=daemon\n",
    );
    write(roots.icons.path(), "hicolor/32x32/apps/firefox.png", "png");
    write(roots.icons.path(), "hicolor/64x64/apps/firefox.png", "png");
    write(roots.icons.path(), "hicolor/scalable/apps/firefox.svg", "svg");
    roots
}

fn source(roots: &Roots) -> DesktopSource {
    DesktopSource::new(vec![
        AppDir {
            path: roots.user.path().to_path_buf(),
            system: false,
        },
        AppDir {
            path: roots.system.path().to_path_buf(),
            system: true,
        },
    ])
}

fn cache(roots: &Roots, config: CatalogConfig) -> CatalogCache {
    CatalogCache::new(
        Arc::new(source(roots)),
        Arc::new(ThemeIconMaterializer::new(vec![roots.icons.path().to_path_buf()])),
        config,
    )
}

#[test]
fn test_enumerate_applies_shadowing_and_visibility() {
    let roots = roots();
    let mut ids: Vec<String> = source(&roots)
        .enumerate_all()
        .unwrap()
        .into_iter()
        .map(|e| e.package_id)
        .collect();
    ids.sort();
    // The hidden user xterm shadows the system one; the service entry is skipped.
    assert_eq!(ids, vec!["firefox", "kde4-okular", "notes"]);
}

#[test]
fn test_resolve_nested_entry() {
    let roots = roots();
    let entry = source(&roots).resolve_one("kde4-okular").unwrap();
    assert_eq!(entry.name, "Okular");
    assert!(entry.is_system_app);
    assert!(entry.install_time_millis > 0);
}

#[tokio::test]
async fn test_catalog_over_directories() {
    let roots = roots();
    let cache = cache(&roots, CatalogConfig::default());

    let catalog = cache.get_all(false).await.unwrap();
    assert_eq!(catalog.len(), 3);

    let firefox = catalog.get("firefox").unwrap();
    assert_eq!(firefox.icon.size_px, 40);
    assert!(firefox
        .icon
        .file
        .as_ref()
        .unwrap()
        .ends_with("hicolor/64x64/apps/firefox.png"));
    assert!(catalog.get("notes").unwrap().icon.file.is_none());

    let names: Vec<String> = query::apply(&catalog, FilterSpec::All, SortSpec::NameDesc)
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Okular", "notes", "Firefox"]);

    let user = query::apply(&catalog, FilterSpec::UserOnly, SortSpec::NameAsc);
    assert_eq!(user.len(), 1);
    assert_eq!(user[0].package_id, "notes");
}

#[tokio::test]
async fn test_forced_refresh_sees_new_entries() {
    let roots = roots();
    let cache = cache(&roots, CatalogConfig::default());

    assert_eq!(cache.get_all(false).await.unwrap().len(), 3);
    write(roots.user.path(), "todo.desktop", &entry("Todo", None));

    assert_eq!(cache.get_all(false).await.unwrap().len(), 3);
    let refreshed = cache.get_all(true).await.unwrap();
    assert!(refreshed.contains("todo"));
    assert_eq!(cache.generation(), 2);
}

#[tokio::test]
async fn test_get_one_excludes_own_package() {
    let roots = roots();
    let config = CatalogConfig {
        self_package: Some("notes".to_string()),
        ..CatalogConfig::default()
    };
    let cache = cache(&roots, config);

    assert_eq!(
        cache.get_one("notes").await.unwrap_err(),
        CatalogError::NotFound("notes".to_string())
    );
    assert!(!cache.get_all(false).await.unwrap().contains("notes"));
    assert_eq!(cache.get_one("firefox").await.unwrap().name, "Firefox");
}

#[tokio::test]
async fn test_get_one_of_hidden_entry_is_not_found() {
    let roots = roots();
    let cache = cache(&roots, CatalogConfig::default());
    assert_eq!(
        cache.get_one("xterm").await.unwrap_err(),
        CatalogError::NotFound("xterm".to_string())
    );
    assert_eq!(
        cache.get_one("../etc/passwd").await.unwrap_err(),
        CatalogError::NotFound("../etc/passwd".to_string())
    );
}

#[tokio::test]
async fn test_custom_icon_size_prefers_scalable_over_smaller() {
    let roots = roots();
    let config = CatalogConfig {
        icon_size_px: 128,
        ..CatalogConfig::default()
    };
    let cache = cache(&roots, config);
    let firefox = cache.get_one("firefox").await.unwrap();
    assert_eq!(firefox.icon.size_px, 128);
    assert!(firefox
        .icon
        .file
        .as_ref()
        .unwrap()
        .ends_with("hicolor/scalable/apps/firefox.svg"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_directory_keeps_previous_catalog() {
    use std::os::unix::fs::PermissionsExt;

    let roots = roots();
    let cache = cache(&roots, CatalogConfig::default());
    let before = cache.get_all(false).await.unwrap();

    fs::set_permissions(roots.system.path(), fs::Permissions::from_mode(0o000)).unwrap();
    let readable = fs::read_dir(roots.system.path()).is_ok();
    let refreshed = cache.get_all(true).await;
    fs::set_permissions(roots.system.path(), fs::Permissions::from_mode(0o755)).unwrap();
    if readable {
        // Running with privileges that ignore mode bits.
        return;
    }

    assert!(matches!(refreshed, Err(CatalogError::SourceUnavailable(_))));
    assert!(Arc::ptr_eq(&before, &cache.snapshot().unwrap()));
    assert_eq!(cache.generation(), 1);
}
