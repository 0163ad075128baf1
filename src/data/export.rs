use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value as JsonValue};

use super::model::CandidateArchive;

// ---------------------------------------------------------------------------
// CandidateTable – flat, named view of one archive
// ---------------------------------------------------------------------------

/// Candidates flattened into named columns: every location axis, the absolute
/// time, then every feature.
#[derive(Debug, Clone)]
pub struct CandidateTable {
    pub location_names: Vec<String>,
    pub feature_names: Vec<String>,
    pub locations: Vec<Vec<i64>>,
    /// Absolute time (s); `None` when the archive lacks timing metadata.
    pub times: Option<Vec<f64>>,
    pub features: Vec<Vec<f64>>,
}

impl CandidateTable {
    pub fn new(archive: &CandidateArchive, times: Option<Vec<f64>>) -> Self {
        Self {
            location_names: archive.state.locations.names().to_vec(),
            feature_names: archive.state.features.names().to_vec(),
            locations: archive.candidates.locations.clone(),
            times,
            features: archive.candidates.features.clone(),
        }
    }

    fn headers(&self) -> Vec<String> {
        let mut headers = self.location_names.clone();
        if self.times.is_some() {
            headers.push("time".to_string());
        }
        headers.extend(self.feature_names.iter().cloned());
        headers
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Write `table` to `path`. Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one Int64 column per location axis, Float64 otherwise
/// * `.json`    – `[{ "segment": 0, "int": 12, …, "snr1": 7.1 }, ...]`
/// * `.csv`     – header row then one row per candidate
pub fn export_table(table: &CandidateTable, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => write_parquet(table, path),
        "json" => write_json(table, path),
        "csv" => write_csv(table, path),
        other => bail!("Unsupported export extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

fn write_csv(table: &CandidateTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer
        .write_record(table.headers())
        .context("writing CSV header")?;

    for row in 0..table.len() {
        let mut record: Vec<String> = table.locations[row].iter().map(|v| v.to_string()).collect();
        if let Some(times) = &table.times {
            record.push(times[row].to_string());
        }
        record.extend(table.features[row].iter().map(|v| v.to_string()));
        writer
            .write_record(&record)
            .with_context(|| format!("writing CSV row {row}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON writer
// ---------------------------------------------------------------------------

/// Records-oriented layout, one object per candidate.
fn write_json(table: &CandidateTable, path: &Path) -> Result<()> {
    let records: Vec<JsonValue> = (0..table.len())
        .map(|row| {
            let mut obj = Map::new();
            for (name, v) in table.location_names.iter().zip(&table.locations[row]) {
                obj.insert(name.clone(), JsonValue::from(*v));
            }
            if let Some(times) = &table.times {
                obj.insert("time".to_string(), JsonValue::from(times[row]));
            }
            for (name, v) in table.feature_names.iter().zip(&table.features[row]) {
                // NaN and infinities have no JSON form and become null.
                obj.insert(name.clone(), JsonValue::from(*v));
            }
            JsonValue::Object(obj)
        })
        .collect();

    let text = serde_json::to_string_pretty(&records).context("encoding JSON")?;
    std::fs::write(path, text).context("writing JSON file")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

fn write_parquet(table: &CandidateTable, path: &Path) -> Result<()> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for (i, name) in table.location_names.iter().enumerate() {
        fields.push(Field::new(name, DataType::Int64, false));
        let values: Vec<i64> = table.locations.iter().map(|row| row[i]).collect();
        columns.push(Arc::new(Int64Array::from(values)));
    }
    if let Some(times) = &table.times {
        fields.push(Field::new("time", DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(times.clone())));
    }
    for (i, name) in table.feature_names.iter().enumerate() {
        fields.push(Field::new(name, DataType::Float64, false));
        let values: Vec<f64> = table.features.iter().map(|row| row[i]).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table() -> CandidateTable {
        CandidateTable {
            location_names: vec!["segment".into(), "int".into()],
            feature_names: vec!["snr1".into()],
            locations: vec![vec![0, 1], vec![0, 4]],
            times: Some(vec![10.0, 10.5]),
            features: vec![vec![6.5], vec![-7.25]],
        }
    }

    #[test]
    fn test_export_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cands.csv");
        export_table(&table(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "segment,int,time,snr1");
        assert_eq!(lines[2], "0,4,10.5,-7.25");
    }

    #[test]
    fn test_export_json_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cands.json");
        export_table(&table(), &path).unwrap();

        let root: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let records = root.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["int"], 1);
        assert_eq!(records[1]["snr1"], -7.25);
    }

    #[test]
    fn test_export_parquet_row_count() {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let dir = tempdir().unwrap();
        let path = dir.path().join("cands.parquet");
        export_table(&table(), &path).unwrap();

        let reader = SerializedFileReader::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
        assert_eq!(
            reader.metadata().file_metadata().schema_descr().num_columns(),
            4
        );
    }

    #[test]
    fn test_export_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        assert!(export_table(&table(), &dir.path().join("cands.xlsx")).is_err());
    }
}
