use comfy_table::{Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;

use appshelf::app::{AppOrigin, ApplicationRecord};

pub fn format_table(
    records: &[ApplicationRecord],
    w: &mut dyn std::io::Write,
    no_color: bool,
) -> anyhow::Result<()> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Package", "Origin", "Installed"]);

    for record in records {
        let origin_str = record.origin().to_string();
        let origin_display = if no_color {
            origin_str
        } else {
            match record.origin() {
                AppOrigin::User => origin_str.green().to_string(),
                AppOrigin::System => origin_str.yellow().to_string(),
            }
        };

        table.add_row(vec![
            Cell::new(&record.name),
            Cell::new(&record.package_id),
            Cell::new(origin_display),
            Cell::new(record.installed_display()),
        ]);
    }

    writeln!(w, "{}", table)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use appshelf::app::RasterImage;

    fn make_record(name: &str, system: bool) -> ApplicationRecord {
        ApplicationRecord {
            name: name.to_string(),
            package_id: format!("org.example.{}", name.to_lowercase()),
            icon: RasterImage::placeholder(40),
            is_system_app: system,
            install_time_millis: 0,
        }
    }

    #[test]
    fn test_table_empty() {
        let records: Vec<ApplicationRecord> = vec![];
        let mut buf = Vec::new();
        format_table(&records, &mut buf, true).unwrap();
        let output = String::from_utf8(buf).unwrap();
        // Should still have header
        assert!(output.contains("Name"));
        assert!(output.contains("Package"));
    }

    #[test]
    fn test_table_no_color() {
        let records = vec![make_record("Firefox", true), make_record("Notes", false)];
        let mut buf = Vec::new();
        format_table(&records, &mut buf, true).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("Firefox"));
        assert!(output.contains("org.example.notes"));
        assert!(output.contains("system"));
        assert!(output.contains("user"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_table_with_color() {
        let records = vec![make_record("Firefox", true)];
        let mut buf = Vec::new();
        format_table(&records, &mut buf, false).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("Firefox"));
        assert!(output.contains("\x1b["));
    }
}
