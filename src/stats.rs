use std::path::PathBuf;

use crate::IterationRecord;

/// Writes one small text file per pass, named `loop<index>`, into a
/// directory. Failing to write is logged and otherwise ignored, statistics
/// never abort a relaxation.
pub(crate) struct StatsWriter {
    dir: PathBuf,
}

impl StatsWriter {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub(crate) fn write(&self, record: &IterationRecord) {
        let path = self.dir.join(format!("loop{}", record.index));

        let contents = format!(
            "Last Energy : {}\nEnergy : {}\nRatio : {}\n\n",
            record.previous_energy, record.energy, record.ratio
        );

        if let Err(err) = std::fs::write(&path, contents) {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to write iteration statistics"
            );
        }
    }
}
