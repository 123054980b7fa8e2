//! 运行时错误.

use thiserror::Error;

/// 染色估计、浓度恢复和标准化过程中的运行时错误.
#[derive(Debug, Error)]
pub enum StainError {
    /// 在 `fit` 之前调用了依赖目标状态的操作.
    #[error("fit must be called first")]
    NotFitted,

    /// 图像不是非空的 `(H, W, 3)` 数组.
    #[error("invalid image shape {shape:?}: expected non-empty (H, W, 3)")]
    InvalidImage {
        /// 实际形状.
        shape: Vec<usize>,
    },

    /// 染色矩阵不是 `2 x 3`.
    #[error("invalid stain matrix shape {shape:?}: expected [2, 3]")]
    InvalidStainMatrix {
        /// 实际形状.
        shape: Vec<usize>,
    },

    /// 染色矩阵中存在 NaN 或 inf (例如对零向量做了归一化).
    #[error("stain matrix contains non-finite values")]
    NonFiniteStainMatrix,

    /// 求解器的数据矩阵与字典矩阵行数不一致.
    ///
    /// 第一个参数为数据矩阵形状, 第二个参数为字典矩阵形状.
    #[error("dimension mismatch: data {0:?} vs dictionary {1:?}")]
    DimensionMismatch([usize; 2], [usize; 2]),

    /// L1 惩罚项权重不是非负有限数.
    #[error("invalid lambda {0}: expected a finite value >= 0")]
    InvalidLambda(f64),

    /// 可用于估计的组织像素不足.
    ///
    /// `found` 为目前已有的像素数, `required` 为实际估计需要的最少像素数.
    #[error("not enough tissue pixels: found {found}, required at least {required}")]
    NotEnoughTissue {
        /// 已有像素数.
        found: usize,
        /// 最少像素数.
        required: usize,
    },

    /// `ndarray` 的形状错误.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// 目标状态序列化/反序列化失败.
    #[cfg(feature = "serde")]
    #[error("persist error: {0}")]
    Persist(#[from] bincode::Error),
}

/// 染色相关运算的返回类型.
pub type StainResult<T> = Result<T, StainError>;
