use appshelf::app::ApplicationRecord;

pub fn format_tsv(
    records: &[ApplicationRecord],
    w: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    writeln!(w, "name\tpackage\torigin\tinstalled_ms")?;
    for record in records {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            record.name,
            record.package_id,
            record.origin(),
            record.install_time_millis
        )?;
    }
    Ok(())
}
