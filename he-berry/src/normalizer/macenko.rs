//! Macenko 染色估计.
//!
//! 参考: Macenko et al., "A method for normalizing histology slides for
//! quantitative analysis", ISBI 2009.
//!
//! 1. 去除 OD 过低 (近乎透明) 的像素;
//! 2. 取 OD 协方差的前两个主成分张成的平面, 并将像素投影到该平面;
//! 3. 求投影的极角, 取两端百分位对应的方向作为两种染色向量.

use super::StainEstimator;
use crate::consts::macenko::{ALPHA, BETA};
use crate::linalg::{covariance, symmetric_eigen};
use crate::od::{flatten_pixels, rgb_to_od};
use crate::stats::percentile;
use crate::{StainError, StainMatrix, StainResult};
use itertools::Itertools;
use ndarray::{array, stack, Array1, Array2, ArrayView3, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Macenko 方法参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MacenkoParams {
    /// 任一通道 OD 大于该值的像素才参与估计.
    pub beta: f64,

    /// 取极角分布的第 `alpha` 和第 `100 - alpha` 百分位.
    pub alpha: f64,
}

impl Default for MacenkoParams {
    fn default() -> Self {
        Self {
            beta: BETA,
            alpha: ALPHA,
        }
    }
}

/// Macenko 染色估计算法.
#[derive(Copy, Clone, Debug, Default)]
pub struct Macenko {
    params: MacenkoParams,
}

impl Macenko {
    /// 以给定参数构建.
    #[inline]
    pub fn new(params: MacenkoParams) -> Self {
        Self { params }
    }

    /// 算法参数.
    #[inline]
    pub fn params(&self) -> &MacenkoParams {
        &self.params
    }
}

impl StainEstimator for Macenko {
    fn stain_matrix(&self, image: ArrayView3<u8>) -> StainResult<StainMatrix> {
        let MacenkoParams { beta, alpha } = self.params;
        let od = flatten_pixels(rgb_to_od(image)?)?;

        let tissue: Vec<usize> = od
            .rows()
            .into_iter()
            .positions(|px| px.iter().any(|&v| v > beta))
            .collect();
        let not_enough = StainError::NotEnoughTissue {
            found: tissue.len(),
            required: 2,
        };
        let od = od.select(Axis(0), &tissue);
        let cov = covariance(od.view()).ok_or(not_enough)?;

        // 最大的两个特征值对应的特征向量, 3 x 2.
        let (_, vecs) = symmetric_eigen(cov.view());
        let mut plane = vecs.select(Axis(1), &[2, 1]);
        for mut v in plane.columns_mut() {
            if v[0] < 0.0 {
                v.mapv_inplace(|x| -x);
            }
        }

        let proj = od.dot(&plane);
        let phi: Vec<f64> = proj.rows().into_iter().map(|p| p[1].atan2(p[0])).collect();
        let (min_phi, max_phi) = angle_range(&phi, alpha)?;

        let to_od = |angle: f64| -> Array1<f64> { plane.dot(&array![angle.cos(), angle.sin()]) };
        let (v1, v2) = (to_od(min_phi), to_od(max_phi));

        // 红色通道 OD 较大的是苏木精.
        let (h, e) = if v1[0] > v2[0] { (v1, v2) } else { (v2, v1) };
        let he: Array2<f64> = stack(Axis(0), &[h.view(), e.view()])?;
        log::trace!("macenko: {} tissue pixels, angles [{min_phi}, {max_phi}]", od.nrows());
        StainMatrix::normalized(he)
    }
}

/// 极角分布的第 `alpha` 和第 `100 - alpha` 百分位.
///
/// 有效 (非 NaN) 角度少于 2 个时返回 `NotEnoughTissue`.
fn angle_range(phi: &[f64], alpha: f64) -> StainResult<(f64, f64)> {
    let valid = phi.iter().filter(|v| !v.is_nan()).count();
    let not_enough = StainError::NotEnoughTissue {
        found: valid,
        required: 2,
    };
    if valid < 2 {
        return Err(not_enough);
    }
    match (
        percentile(phi.iter().copied(), alpha),
        percentile(phi.iter().copied(), 100.0 - alpha),
    ) {
        (Some(lo), Some(hi)) => Ok((lo, hi)),
        _ => Err(not_enough),
    }
}
