//! Confidence scoring and strategy selection.
//!
//! The deterministic path is pure and fully ranks candidates on its own; the
//! AI path is an enhancement layered on top of it and silently degrades back
//! to the deterministic ranking on any provider failure.

use std::sync::Arc;

use crate::config::SplitConfig;
use crate::core::{RationaleSource, ScoredCandidate, SplitCandidate};
use crate::errors::{Result, SplitError};
use crate::learning::{FileSignature, LearningMemory, NEUTRAL_BIAS};

pub mod provider;

pub use provider::{complete_with_timeout, CompletionProvider, ProviderError};

/// How far a bias must deviate from the neutral prior before the selection
/// is attributed to learned history.
const BIAS_ATTRIBUTION_EPSILON: f64 = 0.05;

/// How many top candidates are summarized for the AI judgment.
const AI_CANDIDATE_WINDOW: usize = 3;

/// Pick the best candidate.
///
/// Deterministic ranking: score descending, ties broken by the fixed
/// strategy preference order. With AI enabled, one bounded completion call
/// may re-rank within the top candidates and blend its confidence in; every
/// failure mode of that call falls back to the deterministic ranking, and
/// the fallback is observable through the rationale source.
pub fn select(
    candidates: &[SplitCandidate],
    config: &SplitConfig,
    learning: &LearningMemory,
    signature: &FileSignature,
    provider: Option<Arc<dyn CompletionProvider>>,
) -> Result<ScoredCandidate> {
    if candidates.is_empty() {
        return Err(SplitError::NoViableCandidate(
            "candidate generation produced an empty sequence".to_string(),
        ));
    }

    let mut ranked: Vec<&SplitCandidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.strategy.cmp(&b.strategy))
    });

    if config.use_ai_analysis {
        if let Some(provider) = provider {
            let top = &ranked[..ranked.len().min(AI_CANDIDATE_WINDOW)];
            match ai_judgment(top, config, provider) {
                Some((choice, ai_confidence)) => {
                    let chosen = top[choice];
                    let blend = config.weights.ai_blend;
                    let confidence =
                        ((1.0 - blend) * chosen.score + blend * ai_confidence).clamp(0.0, 1.0);
                    if confidence >= config.confidence_threshold {
                        return Ok(ScoredCandidate {
                            candidate: chosen.clone(),
                            confidence,
                            rationale: RationaleSource::Ai,
                        });
                    }
                    log::debug!(
                        "ai-blended confidence {confidence:.2} below threshold {:.2}, \
                         using deterministic fallback",
                        config.confidence_threshold
                    );
                }
                None => {
                    log::warn!("ai scoring unavailable, falling back to heuristic ranking");
                }
            }
        } else {
            log::warn!("use_ai_analysis set but no completion provider configured");
        }
    }

    let best = ranked[0];
    let bias = learning.get_bias(signature, best.strategy);
    let rationale =
        if config.enable_learning && (bias - NEUTRAL_BIAS).abs() > BIAS_ATTRIBUTION_EPSILON {
            RationaleSource::LearnedBias
        } else {
            RationaleSource::Heuristic
        };
    Ok(ScoredCandidate {
        candidate: best.clone(),
        confidence: best.score,
        rationale,
    })
}

/// One bounded AI call over a compact candidate summary. `None` on any
/// provider failure or unparsable reply.
fn ai_judgment(
    top: &[&SplitCandidate],
    config: &SplitConfig,
    provider: Arc<dyn CompletionProvider>,
) -> Option<(usize, f64)> {
    let prompt = build_prompt(top);
    let response = match complete_with_timeout(provider, prompt, config.ai_timeout()) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("completion provider failed: {e}");
            return None;
        }
    };
    parse_response(&response, top.len())
}

/// Compact textual summary of the top candidates; never includes source.
fn build_prompt(top: &[&SplitCandidate]) -> String {
    let mut prompt = String::from(
        "Rank these candidate partitionings of one oversized source file.\n",
    );
    for (index, candidate) in top.iter().enumerate() {
        let lines: Vec<String> = candidate
            .components
            .iter()
            .map(|c| c.line_count.to_string())
            .collect();
        prompt.push_str(&format!(
            "candidate {}: strategy={} components={} lines=[{}] score={:.2}\n",
            index + 1,
            candidate.strategy.tag(),
            candidate.components.len(),
            lines.join(", "),
            candidate.score,
        ));
    }
    prompt.push_str(
        "Reply with `choice=<candidate number> confidence=<0.0-1.0>` for the best candidate.\n",
    );
    prompt
}

/// Lenient parse of `choice=<n> confidence=<x>`; returns a zero-based index.
fn parse_response(text: &str, top_len: usize) -> Option<(usize, f64)> {
    let choice = number_after(text, "choice")? as usize;
    let confidence = number_after(text, "confidence")?;
    if choice == 0 || choice > top_len || !(0.0..=1.0).contains(&confidence) {
        return None;
    }
    Some((choice - 1, confidence))
}

fn number_after(text: &str, key: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    let at = lower.find(key)? + key.len();
    let rest = &lower[at..];
    let start = rest.find(|c: char| c.is_ascii_digit())?;
    let digits: String = rest[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}
