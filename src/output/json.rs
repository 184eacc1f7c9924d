use appshelf::app::ApplicationRecord;

pub fn format_json_list(
    records: &[ApplicationRecord],
    w: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    writeln!(w, "{}", json)?;
    Ok(())
}

pub fn format_json_single(
    record: &ApplicationRecord,
    w: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    writeln!(w, "{}", json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use appshelf::app::RasterImage;

    fn make_record(name: &str) -> ApplicationRecord {
        ApplicationRecord {
            name: name.to_string(),
            package_id: format!("org.example.{}", name.to_lowercase()),
            icon: RasterImage {
                size_px: 40,
                file: Some(format!("/usr/share/icons/{}.png", name.to_lowercase()).into()),
            },
            is_system_app: true,
            install_time_millis: 1700000000000,
        }
    }

    fn parse(buf: Vec<u8>) -> serde_json::Value {
        let output = String::from_utf8(buf).unwrap();
        serde_json::from_str(output.trim()).unwrap()
    }

    #[test]
    fn test_json_list_empty() {
        let records: Vec<ApplicationRecord> = vec![];
        let mut buf = Vec::new();
        format_json_list(&records, &mut buf).unwrap();
        let parsed = parse(buf);
        assert!(parsed.is_array());
        assert_eq!(parsed.as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_json_list_multiple() {
        let records = vec![make_record("Firefox"), make_record("GIMP"), make_record("VLC")];
        let mut buf = Vec::new();
        format_json_list(&records, &mut buf).unwrap();
        let parsed = parse(buf);
        assert_eq!(parsed.as_array().unwrap().len(), 3);
        assert_eq!(parsed[1]["name"], "GIMP");
    }

    #[test]
    fn test_json_correct_fields() {
        let mut buf = Vec::new();
        format_json_single(&make_record("Firefox"), &mut buf).unwrap();
        let parsed = parse(buf);
        assert_eq!(parsed["name"], "Firefox");
        assert_eq!(parsed["package_id"], "org.example.firefox");
        assert_eq!(parsed["is_system_app"], true);
        assert_eq!(parsed["install_time_millis"], 1700000000000i64);
        assert_eq!(parsed["icon"]["size_px"], 40);
        assert_eq!(parsed["icon"]["file"], "/usr/share/icons/firefox.png");
    }
}
