use anyhow::{bail, Result};

use crate::label::Prediction;

/// Numerically stable softmax. Returns an empty vector for empty input.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value. Ties resolve to the lowest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

pub fn prediction_from_logits(sentence: &str, labels: &[String], logits: &[f32]) -> Result<Prediction> {
    if logits.len() != labels.len() {
        bail!(
            "model produced {} logits for {} labels",
            logits.len(),
            labels.len()
        );
    }

    if let Some(bad) = logits.iter().find(|l| !l.is_finite()) {
        bail!("model produced a non-finite logit ({bad}) for sentence: {sentence}");
    }

    let index = match argmax(logits) {
        Some(i) => i,
        None => bail!("no logits for sentence: {sentence}"),
    };

    Ok(Prediction {
        sentence: sentence.to_string(),
        label: labels[index].clone(),
        index,
        probabilities: softmax(logits),
    })
}
