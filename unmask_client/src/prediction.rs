use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::UnmaskError;

/// The filled-in token for one masked sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskPrediction {
    pub label: String,
    pub confidences: Confidences,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Confidence {
    pub label: String,
    pub confidence: f64,
}

/// Candidate tokens, highest confidence first. Serializes as a `label -> probability` object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Confidences(Vec<Confidence>);

impl Confidences {
    /// A label listed more than once keeps its highest confidence.
    pub fn new(mut entries: Vec<Confidence>) -> Self {
        entries.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut seen = HashSet::new();
        entries.retain(|c| seen.insert(c.label.clone()));
        Self(entries)
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|c| c.label == label).map(|c| c.confidence)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Confidence> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Confidences {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|c| (&c.label, c.confidence)))
    }
}

impl<'de> Deserialize<'de> for Confidences {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Gradio's Label component sends a list; saved reports use an object.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<Confidence>),
            Map(BTreeMap<String, f64>),
        }

        let entries = match Repr::deserialize(deserializer)? {
            Repr::List(list) => list,
            Repr::Map(map) => map
                .into_iter()
                .map(|(label, confidence)| Confidence { label, confidence })
                .collect(),
        };
        Ok(Self::new(entries))
    }
}

/// Location of a prediction the app stored as a file instead of returning inline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Inline(MaskPrediction),
    File(FileRef),
}

impl Output {
    pub fn from_value(value: Value) -> Result<Self, UnmaskError> {
        if let Value::String(path) = &value {
            return Ok(Self::File(FileRef {
                path: Some(path.clone()),
                url: None,
            }));
        }

        let fields = match value.as_object() {
            Some(fields) => fields,
            None => return Err(UnmaskError::UnexpectedOutput(value.to_string())),
        };

        if fields.contains_key("label") {
            Ok(Self::Inline(serde_json::from_value(value)?))
        } else if fields.contains_key("url") || fields.contains_key("path") {
            Ok(Self::File(serde_json::from_value(value)?))
        } else {
            Err(UnmaskError::UnexpectedOutput(value.to_string()))
        }
    }
}
