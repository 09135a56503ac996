use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bert_runner::label::Prediction;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

const JSON_INDENT: &[u8] = b"    ";

/// Header columns for a classification CSV with the given label set.
pub fn classification_header(labels: &[String]) -> Vec<String> {
    let mut header = vec!["sentence".to_string(), "predicted_class".to_string()];
    header.extend(labels.iter().cloned());
    header
}

/// Writes one row per prediction and returns the absolute path of the file.
pub fn write_classification_csv(
    path: &Path,
    labels: &[String],
    predictions: &[Prediction],
) -> Result<PathBuf> {
    create_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;

    writer
        .write_record(classification_header(labels))
        .context("Failed to write CSV header")?;

    for prediction in predictions {
        let mut row = Vec::with_capacity(2 + labels.len());
        row.push(prediction.sentence.clone());
        row.push(prediction.label.clone());
        row.extend(prediction.probabilities.iter().map(|p| p.to_string()));
        writer
            .write_record(&row)
            .with_context(|| format!("Failed to write row for: {}", prediction.sentence))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    absolute(path)
}

/// Pretty-prints `value` with four-space indentation.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    create_parent_dir(path)?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(JSON_INDENT));
    value
        .serialize(&mut serializer)
        .context("Failed to serialize results")?;
    out.flush().context("Failed to flush JSON writer")?;

    absolute(path)
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn labels() -> Vec<String> {
        vec!["KILL".into(), "ARREST".into()]
    }

    #[test]
    fn writes_header_and_quoted_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("results.csv");

        let predictions = vec![
            Prediction {
                sentence: "After a chase, the police arrested the driver.".into(),
                label: "ARREST".into(),
                index: 1,
                probabilities: vec![0.25, 0.75],
            },
            Prediction {
                sentence: "A man was shot.".into(),
                label: "KILL".into(),
                index: 0,
                probabilities: vec![0.5, 0.5],
            },
        ];

        let written = write_classification_csv(&path, &labels(), &predictions)?;
        assert!(written.is_absolute());

        let text = fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "sentence,predicted_class,KILL,ARREST",
                "\"After a chase, the police arrested the driver.\",ARREST,0.25,0.75",
                "A man was shot.,KILL,0.5,0.5",
            ]
        );
        Ok(())
    }

    #[test]
    fn empty_predictions_still_get_a_header() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.csv");

        write_classification_csv(&path, &labels(), &[])?;
        assert_eq!(fs::read_to_string(&path)?, "sentence,predicted_class,KILL,ARREST\n");
        Ok(())
    }

    #[test]
    fn json_uses_four_space_indent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.json");

        let mut value = BTreeMap::new();
        value.insert("a", 1);
        write_json(&path, &value)?;

        assert_eq!(fs::read_to_string(&path)?, "{\n    \"a\": 1\n}");
        Ok(())
    }
}
