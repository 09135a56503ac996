use std::path::Path;

use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{AddedToken, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::debug;

use crate::config::{RunnerConfig, TokenizerSource};
use crate::error::LoadError;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const MASK_TOKEN: &str = "[MASK]";

/// Build a tokenizer that truncates to `config.max_length` and pads to the longest input.
pub fn load_tokenizer(
    source: &TokenizerSource,
    config: &RunnerConfig,
    fallback_pad_id: u32,
) -> Result<Tokenizer, LoadError> {
    let path = source.path();
    let mut tokenizer = match source {
        TokenizerSource::Json(p) => Tokenizer::from_file(p).map_err(|e| LoadError::Tokenizer {
            path: p.clone(),
            reason: e.to_string(),
        })?,
        TokenizerSource::Vocab(p) => from_vocab(p, config.lowercase)?,
    };

    let pad_id = tokenizer.token_to_id(PAD_TOKEN).unwrap_or(fallback_pad_id);
    tokenizer
        .with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }))
        .with_truncation(Some(TruncationParams {
            max_length: config.max_length,
            ..Default::default()
        }))
        .map_err(|e| LoadError::Tokenizer {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(
        "Tokenizer ready: vocab size {}, pad id {}",
        tokenizer.get_vocab_size(true),
        pad_id
    );
    Ok(tokenizer)
}

/// Cased or uncased BERT WordPiece tokenizer from a plain `vocab.txt`.
fn from_vocab(path: &Path, lowercase: bool) -> Result<Tokenizer, LoadError> {
    let tokenizer_err = |reason: String| LoadError::Tokenizer {
        path: path.to_path_buf(),
        reason,
    };

    let vocab = path
        .to_str()
        .ok_or_else(|| tokenizer_err("vocabulary path is not valid UTF-8".to_string()))?;
    let wordpiece = WordPiece::from_file(vocab)
        .unk_token(UNK_TOKEN.to_string())
        .build()
        .map_err(|e| tokenizer_err(e.to_string()))?;

    let mut tokenizer = Tokenizer::new(wordpiece);

    let special_id = |token: &'static str| {
        tokenizer
            .token_to_id(token)
            .ok_or_else(|| LoadError::MissingSpecialToken {
                token,
                path: path.to_path_buf(),
            })
    };
    let cls_id = special_id(CLS_TOKEN)?;
    let sep_id = special_id(SEP_TOKEN)?;
    special_id(PAD_TOKEN)?;
    special_id(UNK_TOKEN)?;

    tokenizer
        .with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_post_processor(Some(BertProcessing::new(
            (SEP_TOKEN.to_string(), sep_id),
            (CLS_TOKEN.to_string(), cls_id),
        )));

    let specials: Vec<AddedToken> = [PAD_TOKEN, UNK_TOKEN, CLS_TOKEN, SEP_TOKEN, MASK_TOKEN]
        .iter()
        .filter(|t| tokenizer.token_to_id(t).is_some())
        .map(|t| AddedToken::from(t.to_string(), true))
        .collect();
    tokenizer.add_special_tokens(&specials);

    Ok(tokenizer)
}
