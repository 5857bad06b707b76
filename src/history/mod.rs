// src/history/mod.rs

pub mod stage;

pub use stage::Stage;

use anyhow::{Context, Result};
use arrow::array::{StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use glob::glob;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::HashSet,
    fs,
    fs::File,
    path::PathBuf,
    sync::Arc,
};

/// A simple history ledger backed by Parquet files. Each event writes one
/// single-row file; reruns consult the ledger to skip completed work.
pub struct History {
    history_dir: PathBuf,
}

impl History {
    /// Construct a History at `history_dir`, creating the directory if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {:?}", &history_dir))?;
        Ok(Self { history_dir })
    }

    /// Record that `workbook` passed `stage`, with the record count produced
    /// (0 for a bare download). Writes `<workbook>_<stage>_<ts>.parquet`.
    pub fn record_event(&self, workbook: &str, stage: Stage, rows: u64) -> Result<()> {
        let ts = Utc::now().timestamp_micros();
        let filename = format!("{}_{}_{}.parquet", workbook, stage.as_str(), ts);
        let path = self.history_dir.join(filename);

        let schema = Schema::new(vec![
            Field::new("workbook", DataType::Utf8, false),
            Field::new("stage", DataType::Utf8, false),
            Field::new("rows", DataType::UInt64, false),
            Field::new(
                "event_time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ]);

        let arr_workbook =
            Arc::new(StringArray::from(vec![workbook.to_string()])) as Arc<dyn arrow::array::Array>;
        let arr_stage = Arc::new(StringArray::from(vec![stage.as_str().to_string()]))
            as Arc<dyn arrow::array::Array>;
        let arr_rows = Arc::new(UInt64Array::from(vec![rows])) as Arc<dyn arrow::array::Array>;
        let arr_time = Arc::new(TimestampMicrosecondArray::from_iter_values(vec![ts]))
            as Arc<dyn arrow::array::Array>;

        let batch = RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![arr_workbook, arr_stage, arr_rows, arr_time],
        )
        .context("building history record batch")?;
        let file =
            File::create(&path).with_context(|| format!("creating history file {:?}", &path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, Arc::new(schema), Some(props))
            .context("creating Arrow writer for history")?;
        writer.write(&batch).context("writing history batch")?;
        writer.close().context("closing history writer")?;
        Ok(())
    }

    /// Load all distinct workbook names recorded for `stage` by scanning
    /// filenames matching `<workbook>_<stage>_*.parquet`.
    pub fn load_stage_names(&self, stage: Stage) -> Result<HashSet<String>> {
        let mut set = HashSet::new();
        let pattern = format!(
            "{}/**/*_{}_*.parquet",
            self.history_dir.display(),
            stage.as_str()
        );
        for entry in glob(&pattern)? {
            if let Ok(path) = entry {
                if let Some(fname) = path.file_stem().and_then(|s| s.to_str()) {
                    // fname = "<workbook>_<stage>_<ts>"
                    if let Some(idx) = fname.rfind(&format!("_{}_", stage.as_str())) {
                        let workbook = &fname[..idx];
                        set.insert(workbook.to_string());
                    }
                }
            }
        }
        Ok(set)
    }
}
