//! Metered feature and authority models.

use serde::{Deserialize, Serialize};

/// A billed capability of the brand assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    BrandAnalysis,
    CaptionGeneration,
    ImageGeneration,
}

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::BrandAnalysis => "brand_analysis",
            Feature::CaptionGeneration => "caption_generation",
            Feature::ImageGeneration => "image_generation",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which counter is authoritative for a feature
///
/// The local ledger and the external tracker are never assumed to agree, so a
/// feature is charged against exactly one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterAuthority {
    #[default]
    Ledger,
    External,
}

impl std::str::FromStr for MeterAuthority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ledger" => Ok(MeterAuthority::Ledger),
            "external" => Ok(MeterAuthority::External),
            other => Err(format!("unknown meter authority '{}'", other)),
        }
    }
}

/// Authority assignment for every feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeteringPolicy {
    brand_analysis: MeterAuthority,
    caption_generation: MeterAuthority,
    image_generation: MeterAuthority,
}

impl MeteringPolicy {
    /// Every feature gated by the local ledger
    pub fn ledger_only() -> Self {
        Self {
            brand_analysis: MeterAuthority::Ledger,
            caption_generation: MeterAuthority::Ledger,
            image_generation: MeterAuthority::Ledger,
        }
    }

    pub fn with_image_generation(mut self, authority: MeterAuthority) -> Self {
        self.image_generation = authority;
        self
    }

    pub fn authority_for(&self, feature: Feature) -> MeterAuthority {
        match feature {
            Feature::BrandAnalysis => self.brand_analysis,
            Feature::CaptionGeneration => self.caption_generation,
            Feature::ImageGeneration => self.image_generation,
        }
    }

    /// True if any feature needs the external tracker
    pub fn uses_external(&self) -> bool {
        [
            self.brand_analysis,
            self.caption_generation,
            self.image_generation,
        ]
        .contains(&MeterAuthority::External)
    }
}

impl Default for MeteringPolicy {
    fn default() -> Self {
        Self::ledger_only()
    }
}

/// What a metered operation reports back on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeteredOutcome<T> {
    pub value: T,
    /// Billable units that actually completed
    pub units_completed: i32,
}

impl<T> MeteredOutcome<T> {
    pub fn new(value: T, units_completed: i32) -> Self {
        Self {
            value,
            units_completed,
        }
    }
}
