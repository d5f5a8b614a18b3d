use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

/// What to do when the round bound is reached without a clearing matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum StallPolicy {
    /// Return `AuctionError::NonTermination`.
    #[default]
    Fail,
    /// Return the last assignment with status `Stalled`.
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct AuctionConfig {
    /// Most rounds evaluated before giving up. Values below 1 act as 1.
    pub max_rounds: u32,
    pub on_stall: StallPolicy,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10_000,
            on_stall: StallPolicy::Fail,
        }
    }
}

impl AuctionConfig {
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_stall_policy(mut self, on_stall: StallPolicy) -> Self {
        self.on_stall = on_stall;
        self
    }

    pub(crate) fn round_limit(&self) -> u32 {
        self.max_rounds.max(1)
    }
}
