pub mod ids;
pub mod json;
pub mod names;
pub mod table;
pub mod tsv;

use appshelf::app::ApplicationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Tsv,
    Names,
    Ids,
}

pub struct Formatter {
    format: OutputFormat,
    no_color: bool,
}

impl Formatter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        Self { format, no_color }
    }

    pub fn format_list(
        &self,
        records: &[ApplicationRecord],
        w: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Table => table::format_table(records, w, self.no_color),
            OutputFormat::Json => json::format_json_list(records, w),
            OutputFormat::Tsv => tsv::format_tsv(records, w),
            OutputFormat::Names => names::format_names(records, w),
            OutputFormat::Ids => ids::format_ids(records, w),
        }
    }

    pub fn format_info(
        &self,
        record: &ApplicationRecord,
        w: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => json::format_json_single(record, w),
            _ => {
                writeln!(w, "Name:        {}", record.name)?;
                writeln!(w, "Package:     {}", record.package_id)?;
                writeln!(w, "Origin:      {}", record.origin())?;
                writeln!(w, "Installed:   {}", record.installed_display())?;
                writeln!(
                    w,
                    "Icon:        {}",
                    record
                        .icon
                        .file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "-".to_string())
                )?;
                writeln!(w, "Icon size:   {}px", record.icon.size_px)?;
                Ok(())
            }
        }
    }

    pub fn format_has(
        &self,
        record: &ApplicationRecord,
        w: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            let obj = serde_json::json!({
                "found": true,
                "package_id": record.package_id,
                "name": record.name,
                "origin": record.origin(),
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&obj)?)?;
        }
        // Silent for non-JSON formats (exit code only)
        Ok(())
    }

    pub fn format_has_not_found(
        &self,
        package_id: &str,
        w: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            let obj = serde_json::json!({
                "found": false,
                "package_id": package_id,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&obj)?)?;
        }
        Ok(())
    }
}
