use std::fs;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};

use crate::error::Result;
use crate::models::{PaperFlagsWide, Report, SubthemeCount, SubthemeMatch};

pub const COUNTS_FILE: &str = "subtheme_counts.csv";
pub const HITS_FILE: &str = "subtheme_hits_long.csv";
pub const FLAGS_FILE: &str = "paper_level_flags_wide.csv";

const PARTIAL_SUFFIX: &str = "partial";
const BACKUP_SUFFIX: &str = "previous";

/// Writes the three report tables as CSV into one directory.
///
/// Tables are first written next to their targets with a `.partial`
/// extension and only renamed into place once all three are complete, so a
/// failed run leaves no half-written report behind. Tables from an earlier
/// run are moved aside while the new ones go in and restored if any rename
/// fails, so the directory never mixes tables from two runs.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn write(&self, report: &Report) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;

        let targets = [COUNTS_FILE, HITS_FILE, FLAGS_FILE].map(|name| self.output_dir.join(name));
        let partials = targets.clone().map(|path| path.with_extension(PARTIAL_SUFFIX));

        let written = write_counts(&partials[0], &report.counts)
            .and_then(|_| write_hits(&partials[1], &report.hits))
            .and_then(|_| write_flags(&partials[2], &report.flags));

        if let Err(e) = written {
            discard(&partials);
            return Err(e);
        }

        commit(&partials, &targets)?;

        for path in &targets {
            tracing::info!("Wrote {}", path.display());
        }
        Ok(targets.to_vec())
    }
}

/// Renames every partial onto its target, all or none.
fn commit(partials: &[PathBuf], targets: &[PathBuf]) -> Result<()> {
    let backups: Vec<PathBuf> = targets
        .iter()
        .map(|path| path.with_extension(BACKUP_SUFFIX))
        .collect();

    let mut moved = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        if !target.exists() {
            continue;
        }
        if let Err(e) = fs::rename(target, &backups[i]) {
            restore(targets, &backups, &moved, 0);
            discard(partials);
            return Err(e.into());
        }
        moved.push(i);
    }

    for (placed, (partial, target)) in partials.iter().zip(targets).enumerate() {
        if let Err(e) = fs::rename(partial, target) {
            restore(targets, &backups, &moved, placed);
            discard(partials);
            return Err(e.into());
        }
    }

    let stale: Vec<PathBuf> = moved.iter().map(|&i| backups[i].clone()).collect();
    discard(&stale);
    Ok(())
}

/// Undoes a partial commit: drops the first `placed` new tables and moves
/// the backed-up ones back.
fn restore(targets: &[PathBuf], backups: &[PathBuf], moved: &[usize], placed: usize) {
    discard(&targets[..placed]);
    for &i in moved {
        if let Err(e) = fs::rename(&backups[i], &targets[i]) {
            tracing::warn!(
                "Could not restore {} from {}: {}",
                targets[i].display(),
                backups[i].display(),
                e
            );
        }
    }
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        if path.exists() {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

fn open(path: &Path) -> Result<Writer<fs::File>> {
    Ok(WriterBuilder::new().has_headers(false).from_path(path)?)
}

pub fn write_counts(path: &Path, counts: &[SubthemeCount]) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(["theme", "sub_theme", "paper_count", "keyword_count"])?;
    for count in counts {
        writer.serialize(count)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_hits(path: &Path, hits: &[SubthemeMatch]) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(["paper_id", "theme", "sub_theme", "keyword"])?;
    for hit in hits {
        writer.serialize(hit)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_flags(path: &Path, flags: &PaperFlagsWide) -> Result<()> {
    let mut writer = open(path)?;

    let mut header = Vec::with_capacity(flags.columns.len() + 1);
    header.push("paper_id");
    header.extend(flags.columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in &flags.rows {
        let mut record = Vec::with_capacity(row.flags.len() + 1);
        record.push(row.paper_id.as_str());
        record.extend(row.flags.iter().map(|f| if *f { "true" } else { "false" }));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
