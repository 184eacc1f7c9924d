use appshelf::app::ApplicationRecord;

pub fn format_names(
    records: &[ApplicationRecord],
    w: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    for record in records {
        writeln!(w, "{}", record.name)?;
    }
    Ok(())
}
