//! Model Selector
//!
//! Ranks generative-text model identifiers with a heuristic that prefers
//! thinking models, then newer versions, then higher tiers:
//!
//! ```text
//! score = thinking * 10000 + major * 1000 + minor * 100
//!       + tier (ultra 500, pro 400, flash 300)
//!       + experimental 200
//!       + 500 if major >= 4
//!       + 200 if major >= 3
//! ```
//!
//! Capability parsing is a pure string function so it can be tested without
//! network access.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

const THINKING_BONUS: u64 = 10_000;
const MAJOR_WEIGHT: u64 = 1_000;
const MINOR_WEIGHT: u64 = 100;
const EXPERIMENTAL_BONUS: u64 = 200;
const FUTURE_MAJOR_BONUS: u64 = 500;
const NEXTGEN_BONUS: u64 = 200;

/// Model tier, detected by substring (first match wins)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Ultra,
    Pro,
    Flash,
    None,
}

impl Tier {
    #[must_use]
    pub fn bonus(self) -> u64 {
        match self {
            Self::Ultra => 500,
            Self::Pro => 400,
            Self::Flash => 300,
            Self::None => 0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ultra => "ultra",
            Self::Pro => "pro",
            Self::Flash => "flash",
            Self::None => "none",
        }
    }
}

/// Capabilities parsed out of a model identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub major: u64,
    pub minor: u64,
    pub thinking: bool,
    pub experimental: bool,
    pub tier: Tier,
}

/// A scored model identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub identifier: String,
    pub capabilities: ModelCapabilities,
    pub score: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No model candidates available for selection")]
    NoCandidates,
}

/// Parse version, tier and capability flags out of a model identifier
#[must_use]
pub fn parse_capabilities(identifier: &str) -> ModelCapabilities {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let version = VERSION.get_or_init(|| Regex::new(r"(\d+)\.(\d+)").expect("version pattern is valid"));

    let name = identifier.to_lowercase();

    let (major, minor) = version
        .captures(&name)
        .map(|caps| {
            let number = |idx: usize| {
                // Digits only, so a parse failure means the number is too large
                caps.get(idx)
                    .map_or(0, |m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
            };
            (number(1), number(2))
        })
        .unwrap_or((0, 0));

    let tier = if name.contains("ultra") {
        Tier::Ultra
    } else if name.contains("pro") {
        Tier::Pro
    } else if name.contains("flash") {
        Tier::Flash
    } else {
        Tier::None
    };

    ModelCapabilities {
        major,
        minor,
        thinking: name.contains("thinking"),
        experimental: name.contains("exp"),
        tier,
    }
}

/// Heuristic score for a capability record
#[must_use]
pub fn score(capabilities: &ModelCapabilities) -> u64 {
    let bonuses = [
        (true, capabilities.tier.bonus()),
        (capabilities.thinking, THINKING_BONUS),
        (capabilities.experimental, EXPERIMENTAL_BONUS),
        (capabilities.major >= 4, FUTURE_MAJOR_BONUS),
        (capabilities.major >= 3, NEXTGEN_BONUS),
    ];

    // Every term saturates, versions are free-form
    bonuses
        .iter()
        .filter(|(applies, _)| *applies)
        .fold(
            capabilities
                .major
                .saturating_mul(MAJOR_WEIGHT)
                .saturating_add(capabilities.minor.saturating_mul(MINOR_WEIGHT)),
            |score, (_, bonus)| score.saturating_add(*bonus),
        )
}

impl ModelCandidate {
    #[must_use]
    pub fn new(identifier: &str) -> Self {
        let capabilities = parse_capabilities(identifier);
        Self {
            identifier: identifier.to_string(),
            score: score(&capabilities),
            capabilities,
        }
    }

    /// Best-first ordering: higher score, then lexicographically later identifier
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.identifier.cmp(&self.identifier))
    }
}

/// Score every identifier and return candidates best-first
#[must_use]
pub fn rank<S: AsRef<str>>(identifiers: &[S]) -> Vec<ModelCandidate> {
    let mut candidates: Vec<ModelCandidate> = identifiers
        .iter()
        .map(|id| ModelCandidate::new(id.as_ref()))
        .collect();
    candidates.sort_by(ModelCandidate::rank_cmp);
    candidates
}

/// Select the highest scoring identifier
///
/// # Errors
///
/// Returns `SelectionError::NoCandidates` if `identifiers` is empty
pub fn select_best<S: AsRef<str>>(identifiers: &[S]) -> Result<ModelCandidate, SelectionError> {
    let best = identifiers
        .iter()
        .map(|id| ModelCandidate::new(id.as_ref()))
        .min_by(ModelCandidate::rank_cmp)
        .ok_or(SelectionError::NoCandidates)?;

    log::info!(
        "Selected model {} (score {}{})",
        best.identifier,
        best.score,
        if best.capabilities.thinking { ", thinking" } else { "" }
    );
    Ok(best)
}
