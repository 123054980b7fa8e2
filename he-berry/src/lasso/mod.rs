//! 染色浓度恢复.
//!
//! 对每个像素的 OD 向量 `od`, 求非负浓度 `c` 使
//! `½‖od − Sᵀc‖² + λ‖c‖₁` 最小, 其中 `S` 为 `2 x 3` 染色矩阵.
//! 实际的优化交给 [`SparseSolver`], 本模块只负责输入输出的形状变换.

mod coord;

use crate::od::{flatten_pixels, rgb_to_od};
use crate::{StainMatrix, StainResult};
use ndarray::{Array2, ArrayView2, ArrayView3};

pub use coord::NonNegLasso;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// L1 正则化最小二乘求解器.
///
/// 给定 `m x n` 数据矩阵 `data` (每列一个样本) 和 `m x k` 字典 `dictionary`
/// (每列一个原子), 返回 `k x n` 系数矩阵.
///
/// 任何满足该约定的求解器都可以替换默认的 [`NonNegLasso`].
pub trait SparseSolver {
    /// 求解系数矩阵. `lambda` 为 L1 惩罚项权重.
    fn solve(
        &self,
        data: ArrayView2<f64>,
        dictionary: ArrayView2<f64>,
        lambda: f64,
    ) -> StainResult<Array2<f64>>;
}

/// 坐标下降求解器参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LassoParams {
    /// 每个样本最多迭代的轮数 (每轮更新全部系数一次).
    pub max_iter: u32,

    /// 一轮内系数的最大变化量低于该值时视为收敛.
    pub tol: f64,

    /// 是否约束系数非负.
    pub positive: bool,
}

impl Default for LassoParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-10,
            positive: true,
        }
    }
}

/// 获得浓度矩阵.
///
/// `image` 为 `(H, W, 3)` RGB 图像, `stain_matrix` 第 0 行为苏木精, 第 1 行为伊红.
/// 返回 `(H * W, 2)` 的非负浓度矩阵, 每行依次为该像素的苏木精和伊红浓度.
///
/// `lambda` 越大, 浓度越趋近于 0, 背景像素 (难以由 H&E 基表示) 越接近白色.
/// 常用值为 [`DEFAULT_LAMBDA`](crate::consts::DEFAULT_LAMBDA).
#[inline]
pub fn get_concentrations(
    image: ArrayView3<u8>,
    stain_matrix: &StainMatrix,
    lambda: f64,
) -> StainResult<Array2<f64>> {
    get_concentrations_with(&NonNegLasso::default(), image, stain_matrix, lambda)
}

/// 同 [`get_concentrations`], 但使用指定的求解器.
pub fn get_concentrations_with<S: SparseSolver + ?Sized>(
    solver: &S,
    image: ArrayView3<u8>,
    stain_matrix: &StainMatrix,
    lambda: f64,
) -> StainResult<Array2<f64>> {
    // (H * W) x 3
    let od = flatten_pixels(rgb_to_od(image)?)?;
    // 3 x N 数据, 3 x 2 字典 -> 2 x N 系数.
    let coeffs = solver.solve(od.t(), stain_matrix.view().t(), lambda)?;
    Ok(coeffs.t().as_standard_layout().into_owned())
}
