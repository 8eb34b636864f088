use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Feature vocabulary shared between the training artifacts and the
/// inference-time windower.
///
/// The *order* of features fed to the model must match the order the
/// scaler was fitted with. That order is carried as metadata in the
/// model manifest and scaler artifact and verified eagerly at load time,
/// so a misordered configuration fails before the first inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Close,
    Rsi,
    MacdHist,
    BbWidth,
}

impl Feature {
    pub const ALL: &'static [Feature] = &[
        Feature::Close,
        Feature::Rsi,
        Feature::MacdHist,
        Feature::BbWidth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::Close => "close",
            Feature::Rsi => "rsi",
            Feature::MacdHist => "macd_hist",
            Feature::BbWidth => "bb_width",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| anyhow::anyhow!("unknown feature '{}'", s))
    }
}
