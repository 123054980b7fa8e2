//! Vahadane 染色估计.
//!
//! 参考: Vahadane et al., "Structure-preserving color normalization and sparse
//! stain separation for histological images", IEEE TMI 2016.
//!
//! 在组织像素的 OD 上学习一个非负, 稀疏的 2-原子字典, 字典的两个原子即染色向量.

use super::StainEstimator;
use crate::consts::vahadane::{ITERATIONS, LAMBDA, THRESHOLD};
use crate::lasso::{NonNegLasso, SparseSolver};
use crate::od::{flatten_pixels, normalize_rows, notwhite_mask, rgb_to_od};
use crate::{StainError, StainMatrix, StainResult};
use itertools::Itertools;
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Vahadane 方法参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VahadaneParams {
    /// 亮度 `L* / 100` 低于该值的像素视为组织.
    pub threshold: f64,

    /// 字典学习中稀疏编码的 L1 权重.
    pub lambda: f64,

    /// 编码 / 字典更新的交替轮数.
    pub iterations: u32,
}

impl Default for VahadaneParams {
    fn default() -> Self {
        Self {
            threshold: THRESHOLD,
            lambda: LAMBDA,
            iterations: ITERATIONS,
        }
    }
}

/// Vahadane 染色估计算法.
#[derive(Copy, Clone, Debug, Default)]
pub struct Vahadane {
    params: VahadaneParams,
    solver: NonNegLasso,
}

impl Vahadane {
    /// 以给定参数构建.
    #[inline]
    pub fn new(params: VahadaneParams) -> Self {
        Self {
            params,
            solver: NonNegLasso::default(),
        }
    }

    /// 算法参数.
    #[inline]
    pub fn params(&self) -> &VahadaneParams {
        &self.params
    }
}

impl StainEstimator for Vahadane {
    fn stain_matrix(&self, image: ArrayView3<u8>) -> StainResult<StainMatrix> {
        let mask = notwhite_mask(image, self.params.threshold)?;
        let od = flatten_pixels(rgb_to_od(image)?)?;
        let tissue: Vec<usize> = mask.iter().positions(|&m| m).collect();
        if tissue.len() < 2 {
            return Err(StainError::NotEnoughTissue {
                found: tissue.len(),
                required: 2,
            });
        }

        // 3 x N, 每列一个像素.
        let x = od.select(Axis(0), &tissue).reversed_axes();
        let dictionary = learn_dictionary(&self.solver, x.view(), &self.params)?;

        // 2 x 3, 红色通道 OD 较大的原子作为苏木精.
        let mut he = dictionary.t().to_owned();
        if he[[0, 0]] < he[[1, 0]] {
            he = he.select(Axis(0), &[1, 0]);
        }
        log::trace!("vahadane: {} tissue pixels, dictionary {he:?}", tissue.len());
        StainMatrix::normalized(he)
    }
}

/// 非负字典学习. `x` 为 `3 x N` 数据, 返回 `3 x 2` 字典, 每列一个单位范数原子.
///
/// 交替进行: (1) 固定字典求非负稀疏编码; (2) 固定编码, 对每个原子做一次块坐标
/// 下降, 然后投影到非负象限及单位球内.
/// 以参考 H&E 矩阵作为初值, 保证结果确定.
fn learn_dictionary<S: SparseSolver>(
    solver: &S,
    x: ArrayView2<f64>,
    params: &VahadaneParams,
) -> StainResult<Array2<f64>> {
    let mut d = normalize_rows(&StainMatrix::ruifrok().view()).reversed_axes();

    for _ in 0..params.iterations {
        // 2 x N
        let a = solver.solve(x, d.view(), params.lambda)?;
        let aat = a.dot(&a.t());
        let xat = x.dot(&a.t());

        for j in 0..d.ncols() {
            let cjj = aat[[j, j]];
            if cjj <= f64::EPSILON {
                // 本轮没有像素使用该原子, 保持不变.
                continue;
            }
            let mut u = (&xat.column(j) - &d.dot(&aat.column(j))) / cjj + d.column(j);
            u.mapv_inplace(|v| v.max(0.0));
            let norm = u.dot(&u).sqrt().max(1.0);
            d.column_mut(j).assign(&(u / norm));
        }
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::RUIFROK_HE;
    use crate::normalizer::tests::{cosine, synthetic_he};
    use ndarray::Array3;

    #[test]
    fn test_vahadane_recovers_stains() {
        let s = Vahadane::default().stain_matrix(synthetic_he().view()).unwrap();
        assert_eq!(s.view().dim(), (2, 3));

        let truth = normalize_rows(&*RUIFROK_HE);
        assert!(cosine(s.hematoxylin(), truth.row(0)) > 0.95, "{s:?}");
        assert!(cosine(s.eosin(), truth.row(1)) > 0.95, "{s:?}");
        assert!(s.view().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_vahadane_blank_image() {
        let white = Array3::from_elem((4, 4, 3), 250u8);
        assert!(matches!(
            Vahadane::default().stain_matrix(white.view()),
            Err(StainError::NotEnoughTissue { found: 0, .. })
        ));
    }

    #[test]
    fn test_vahadane_zero_iterations_is_reference() {
        let v = Vahadane::new(VahadaneParams {
            iterations: 0,
            ..VahadaneParams::default()
        });
        let s = v.stain_matrix(synthetic_he().view()).unwrap();
        let truth = normalize_rows(&*RUIFROK_HE);
        for (a, b) in s.view().iter().zip(truth.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
