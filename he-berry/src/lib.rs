#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 H&E 染色病理图像的染色标准化 (stain normalization)
//! 以及苏木精 (hematoxylin) 通道提取.
//!
//! 所有图像均以 `(H, W, 3)` 的 `u8` 数组表示, 通道顺序为 RGB.
//!
//! # 注意
//!
//! 1. 该 crate 不负责图像文件的读写. 需要读写时请使用 `ablations/utils`
//!   或自行转换为 `ndarray` 数组.
//! 2. 该 crate 在非期望输入下不会 panic, 而是返回
//!   [`StainError`].
//!
//! # 模块一览
//!
//! ### 光密度 (optical density) 转换 ✅
//!
//! RGB 与 OD 空间互转, 亮度标准化, 非白色 (组织) 掩码.
//!
//! 实现位于 `he-berry/src/od.rs`.
//!
//! ### 非负 Lasso 求解器 ✅
//!
//! 求解 `min ½‖x − Dα‖² + λ‖α‖₁, α ≥ 0`, 以此从光密度恢复每个像素的染色浓度.
//! 求解器藏在 `SparseSolver` trait 之后, 可替换.
//!
//! 实现位于 `he-berry/src/lasso`.
//!
//! ### 染色矩阵估计 ✅
//!
//! 1. Macenko (PCA 平面角度百分位);
//! 2. Vahadane (非负稀疏字典学习);
//! 3. Ruifrok (固定参考向量).
//!
//! 实现位于 `he-berry/src/normalizer`.
//!
//! ### Reinhard 颜色迁移 ✅
//!
//! 在 L\*a\*b\* 空间匹配均值和标准差.
//!
//! 实现位于 `he-berry/src/normalizer/reinhard.rs`.

pub mod colorspace;
pub mod consts;
mod error;
pub mod lasso;
pub mod linalg;
pub mod normalizer;
pub mod od;
pub mod prelude;
mod stain;
pub mod stats;

pub use error::{StainError, StainResult};
pub use stain::StainMatrix;

pub use lasso::{
    get_concentrations, get_concentrations_with, LassoParams, NonNegLasso, SparseSolver,
};
pub use normalizer::{
    LabStats, Macenko, MacenkoNormalizer, MacenkoParams, Normalizer, Reinhard, Ruifrok,
    RuifrokNormalizer, StainEstimator, StainNormalizer, TargetStains, Vahadane,
    VahadaneNormalizer, VahadaneParams,
};
