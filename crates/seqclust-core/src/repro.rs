// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Floating-point summation policy used by the default vector math.
///
/// `Strict` switches accumulations (means, path lengths) to Kahan-compensated
/// sums. `Balanced` and `Fast` use plain left-to-right summation; both are
/// deterministic for a fixed input order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReproMode {
    Strict,
    #[default]
    Balanced,
    Fast,
}

impl ReproMode {
    pub fn compensated(self) -> bool {
        matches!(self, Self::Strict)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Fast => "fast",
        }
    }
}
