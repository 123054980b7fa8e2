//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{StainError, StainMatrix, StainResult};

pub use crate::normalizer::{
    MacenkoNormalizer, Normalizer, RuifrokNormalizer, StainEstimator, StainNormalizer,
    TargetStains, VahadaneNormalizer,
};
pub use crate::normalizer::{Macenko, MacenkoParams, Reinhard, Ruifrok, Vahadane, VahadaneParams};

pub use crate::lasso::{get_concentrations, LassoParams, NonNegLasso, SparseSolver};

pub use crate::od::{od_to_rgb, rgb_to_od, standardize_brightness};

pub use crate::consts::{DEFAULT_LAMBDA, EOSIN, HEMATOXYLIN};
