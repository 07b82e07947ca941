use std::path::{Path, PathBuf};

use csv::Writer;
use tempfile::NamedTempFile;
use tracing::info;

use crate::engineer::{AnalysisTable, ModelTable};
use crate::error::{PipelineError, Result};

/// A fully written table sitting in a temporary file next to its target.
/// Nothing appears at the target until [`StagedTable::persist`]; dropping it
/// removes the temporary file.
#[derive(Debug)]
pub struct StagedTable {
    file: NamedTempFile,
    target: PathBuf,
    rows: usize,
}

impl StagedTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Moves the table into place and returns its row count.
    pub fn persist(self) -> Result<usize> {
        let target = self.target;
        self.file
            .persist(&target)
            .map_err(|e| PipelineError::io(&target, e.error))?;
        info!("wrote {} rows to {}", self.rows, target.display());
        Ok(self.rows)
    }
}

fn stage_rows<P, I, R>(path: P, headers: &[String], rows: I) -> Result<StagedTable>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(path, e))?;

    let mut n = 0;
    {
        let mut writer = Writer::from_writer(&mut file);
        writer
            .write_record(headers)
            .map_err(|e| PipelineError::csv(path, e))?;
        for row in rows {
            writer.write_record(row).map_err(|e| PipelineError::csv(path, e))?;
            n += 1;
        }
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
    }

    Ok(StagedTable {
        file,
        target: path.to_owned(),
        rows: n,
    })
}

pub fn stage_analysis<P: AsRef<Path>>(path: P, table: &AnalysisTable) -> Result<StagedTable> {
    let rows = table
        .records()
        .map(|cells| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    stage_rows(path, &table.headers(), rows)
}

pub fn stage_model<P: AsRef<Path>>(path: P, table: &ModelTable) -> Result<StagedTable> {
    let rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(|x| x.to_string()).collect::<Vec<_>>());
    stage_rows(path, &table.headers, rows)
}
