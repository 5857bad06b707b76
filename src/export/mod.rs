// src/export/mod.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use rayon::prelude::*;
use std::{
    fs::{self, File},
    path::Path,
    sync::Arc,
};
use tracing::{info, instrument};

use crate::catalog::DatasetSpec;
use crate::normalize::{normalize, NormalizedRecord};
use crate::sheet::{load_workbook, RawSheet};

fn tidy_schema() -> Schema {
    Schema::new(vec![
        Field::new("dataset", DataType::Utf8, false),
        Field::new("row_key", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("sub_level", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
        Field::new("count", DataType::Int64, true),
    ])
}

/// Pack tidy records into one Arrow batch, tagged with the dataset name so
/// downstream readers can concatenate tables across datasets.
pub fn records_to_batch(dataset: &str, records: &[NormalizedRecord]) -> Result<RecordBatch> {
    let mut dataset_b = StringBuilder::new();
    let mut row_key_b = StringBuilder::new();
    let mut category_b = StringBuilder::new();
    let mut sub_level_b = StringBuilder::new();
    let mut value_b = Float64Builder::new();
    let mut count_b = Int64Builder::new();

    for record in records {
        dataset_b.append_value(dataset);
        row_key_b.append_value(&record.row_key);
        category_b.append_value(&record.category);
        sub_level_b.append_value(&record.sub_level);
        value_b.append_option(record.value);
        count_b.append_option(record.count);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(dataset_b.finish()),
        Arc::new(row_key_b.finish()),
        Arc::new(category_b.finish()),
        Arc::new(sub_level_b.finish()),
        Arc::new(value_b.finish()),
        Arc::new(count_b.finish()),
    ];
    RecordBatch::try_new(Arc::new(tidy_schema()), columns).context("building tidy record batch")
}

/// Write one dataset's records to `path` as Brotli-compressed Parquet.
pub fn write_records(path: &Path, dataset: &str, records: &[NormalizedRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let batch = records_to_batch(dataset, records)?;
    let file =
        File::create(path).with_context(|| format!("creating parquet file {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(&batch).context("writing tidy batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Normalize every configured sheet of one dataset's workbook and write each
/// to `<out_dir>/<dataset>/<sheet-slug>.parquet`. Sheets run in parallel;
/// returns the total record count across them.
#[instrument(level = "debug", skip_all, fields(dataset = %spec.name))]
pub fn export_dataset(
    spec: &DatasetSpec,
    workbooks_dir: &Path,
    out_dir: &Path,
) -> Result<u64> {
    let workbook_path = workbooks_dir.join(&spec.workbook);
    let sheets = load_workbook(&workbook_path)?;

    let selected: Vec<&RawSheet> = match &spec.sheet {
        Some(name) => match sheets.get(name) {
            Some(sheet) => vec![sheet],
            None => bail!(
                "workbook {} has no sheet {:?}",
                workbook_path.display(),
                name
            ),
        },
        None => sheets.values().collect(),
    };

    let dataset_dir = out_dir.join(&spec.name);
    let counts: Vec<u64> = selected
        .par_iter()
        .map(|&sheet| {
            let records = normalize(
                sheet,
                &spec.sub_levels,
                spec.header_data_row_offset,
                spec.default_category.as_deref(),
            )
            .with_context(|| format!("normalizing sheet {:?} of {}", sheet.name, spec.name))?;
            let path = dataset_dir.join(format!("{}.parquet", slug(&sheet.name)));
            write_records(&path, &spec.name, &records)?;
            Ok(records.len() as u64)
        })
        .collect::<Result<_>>()?;

    let total = counts.iter().sum();
    info!(dataset = %spec.name, sheets = counts.len(), records = total, "exported dataset");
    Ok(total)
}

/// Filesystem-safe lowercase sheet name.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
