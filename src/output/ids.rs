use appshelf::app::ApplicationRecord;

pub fn format_ids(
    records: &[ApplicationRecord],
    w: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    for record in records {
        writeln!(w, "{}", record.package_id)?;
    }
    Ok(())
}
