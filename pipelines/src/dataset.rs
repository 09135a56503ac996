use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct SentenceEntry {
    pub sentence: String,
    /// Hand-assigned class, when known.
    pub expected: Option<String>,
}

impl SentenceEntry {
    pub fn new(sentence: impl Into<String>, expected: Option<String>) -> Self {
        Self {
            sentence: sentence.into(),
            expected,
        }
    }
}

pub const POLICE_EVENT_SENTENCES: [(&str, &str); 15] = [
    ("The police shot the man, leading to his immediate death.", "KILL"),
    ("Officers arrested five individuals who were suspected of theft.", "ARREST"),
    ("Despite the ongoing theft, the police just stood by and watched without intervening.", "FAIL"),
    ("The police used pepper spray and batons to control the unruly crowd.", "FORCE"),
    ("The officers patrolled the area and interacted with the local residents.", "ANY_ACTION"),
    ("A woman was killed in the crossfire between the police and the criminals.", "KILL"),
    ("The police detained several individuals for questioning.", "ARREST"),
    ("Even as the violence escalated, the police failed to take any action.", "FAIL"),
    ("Riot police used shields and rubber bullets to push back the protestors.", "FORCE"),
    ("The police carried out a search operation in the neighborhood.", "ANY_ACTION"),
    ("During the raid, two suspects were fatally shot by the police.", "KILL"),
    ("After a high-speed chase, the police arrested the driver.", "ARREST"),
    ("The police were criticized for not doing anything during the major heist.", "FAIL"),
    ("Officers used tear gas to disperse the mob that was gathering.", "FORCE"),
    ("The police set up checkpoints throughout the city after the terror alert.", "ANY_ACTION"),
];

pub const MASKED_SENTENCES: [&str; 15] = [
    "Russian forces attacked [MASK] last night.",
    "The [MASK] of the country voiced concerns over the recent events.",
    "International organizations called for a [MASK] to the ongoing conflicts.",
    "The peace treaty was signed in [MASK].",
    "Many civilians fled to [MASK] to escape the violence.",
    "The president announced new measures to ensure [MASK].",
    "Military bases in [MASK] were put on high alert.",
    "The international community was surprised by the sudden [MASK].",
    "Negotiations took place in [MASK] last week.",
    "The prime minister emphasized the importance of [MASK].",
    "The city of [MASK] witnessed heavy artillery fire yesterday.",
    "Humanitarian aid was sent to [MASK] regions affected by the war.",
    "Journalists from around the world gathered in [MASK] for a press conference.",
    "The [MASK] resolution was vetoed by major powers.",
    "Diplomats are working tirelessly in [MASK] to broker a deal.",
];

pub fn police_event_fixture() -> Vec<SentenceEntry> {
    POLICE_EVENT_SENTENCES
        .iter()
        .map(|(sentence, label)| SentenceEntry::new(*sentence, Some(label.to_string())))
        .collect()
}

pub fn masked_fixture() -> Vec<String> {
    MASKED_SENTENCES.iter().map(|s| s.to_string()).collect()
}

/// The sentence file if one is given, otherwise the built-in police event sentences.
pub fn classification_entries(path: Option<&Path>) -> Result<Vec<SentenceEntry>> {
    match path {
        Some(path) => load_entries(path),
        None => Ok(police_event_fixture()),
    }
}

pub fn masked_sentences(path: Option<&Path>) -> Result<Vec<String>> {
    match path {
        Some(path) => Ok(load_entries(path)?.into_iter().map(|e| e.sentence).collect()),
        None => Ok(masked_fixture()),
    }
}

/// `.csv` files need a `sentence` column and may have an `expected` column.
/// Anything else is read as one sentence per non-empty line.
pub fn load_entries(path: &Path) -> Result<Vec<SentenceEntry>> {
    let is_csv = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));

    let entries = if is_csv {
        read_csv(path)?
    } else {
        read_lines(path)?
    };

    if entries.is_empty() {
        bail!("No sentences found in {}", path.display());
    }

    info!("Loaded {} sentences from {}", entries.len(), path.display());
    Ok(entries)
}

fn read_lines(path: &Path) -> Result<Vec<SentenceEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sentence file {}", path.display()))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| SentenceEntry::new(line, None))
        .collect())
}

fn read_csv(path: &Path) -> Result<Vec<SentenceEntry>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open sentence file {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let sentence_col = headers
        .iter()
        .position(|h| h == "sentence")
        .context("Missing sentence column")?;
    let expected_col = headers.iter().position(|h| h == "expected");

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let sentence = record
            .get(sentence_col)
            .context("Missing sentence field")?;
        if sentence.is_empty() {
            continue;
        }
        let expected = expected_col
            .and_then(|col| record.get(col))
            .filter(|label| !label.is_empty())
            .map(str::to_string);
        entries.push(SentenceEntry::new(sentence, expected));
    }
    Ok(entries)
}
