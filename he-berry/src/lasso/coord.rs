//! 坐标下降法求解 (非负) Lasso.

use super::{LassoParams, SparseSolver};
use crate::{StainError, StainResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Zip};

/// 基于坐标下降的 Lasso 求解器.
///
/// 每个样本独立求解 `min ½‖x − Dα‖² + λ‖α‖₁` (可选 `α ≥ 0`).
/// 预先计算 Gram 矩阵 `DᵀD` 和 `Dᵀx`, 因此每轮迭代的开销只与原子数 `k` 有关.
#[derive(Copy, Clone, Debug, Default)]
pub struct NonNegLasso {
    params: LassoParams,
}

impl NonNegLasso {
    /// 以给定参数构建求解器.
    #[inline]
    pub fn new(params: LassoParams) -> Self {
        Self { params }
    }

    /// 求解器参数.
    #[inline]
    pub fn params(&self) -> &LassoParams {
        &self.params
    }

    /// 求解单个样本. `b = Dᵀx`. 返回是否在迭代上限内收敛.
    fn solve_one(
        &self,
        gram: &Array2<f64>,
        b: ArrayView1<f64>,
        lambda: f64,
        mut alpha: ArrayViewMut1<f64>,
    ) -> bool {
        let k = b.len();
        alpha.fill(0.0);

        for _ in 0..self.params.max_iter {
            let mut max_delta = 0.0_f64;
            for j in 0..k {
                let gjj = gram[[j, j]];
                if gjj <= 0.0 {
                    // 零原子对目标函数没有贡献.
                    continue;
                }
                let mut rho = b[j];
                for l in (0..k).filter(|&l| l != j) {
                    rho -= gram[[j, l]] * alpha[l];
                }
                let next = if self.params.positive {
                    ((rho - lambda) / gjj).max(0.0)
                } else {
                    soft_threshold(rho, lambda) / gjj
                };
                max_delta = max_delta.max((next - alpha[j]).abs());
                alpha[j] = next;
            }
            if max_delta <= self.params.tol {
                return true;
            }
        }
        false
    }
}

#[inline]
fn soft_threshold(x: f64, lambda: f64) -> f64 {
    x.signum() * (x.abs() - lambda).max(0.0)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        macro_rules! zip_for_each {
            ($zip: expr, $f: expr) => { $zip.par_for_each($f) };
        }

        #[inline]
        fn workers() -> usize {
            rayon::current_num_threads()
        }
    } else {
        macro_rules! zip_for_each {
            ($zip: expr, $f: expr) => { $zip.for_each($f) };
        }

        #[inline]
        fn workers() -> usize {
            1
        }
    }
}

impl SparseSolver for NonNegLasso {
    fn solve(
        &self,
        data: ArrayView2<f64>,
        dictionary: ArrayView2<f64>,
        lambda: f64,
    ) -> StainResult<Array2<f64>> {
        if data.nrows() != dictionary.nrows() {
            return Err(StainError::DimensionMismatch(
                [data.nrows(), data.ncols()],
                [dictionary.nrows(), dictionary.ncols()],
            ));
        }
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(StainError::InvalidLambda(lambda));
        }

        let (k, n) = (dictionary.ncols(), data.ncols());
        let gram = dictionary.t().dot(&dictionary);
        let b = dictionary.t().dot(&data);

        let mut alpha = Array2::<f64>::zeros((k, n));
        let mut converged = Array1::from_elem(n, true);
        zip_for_each!(
            Zip::from(alpha.columns_mut())
                .and(b.columns())
                .and(&mut converged),
            |a, bj, ok| *ok = self.solve_one(&gram, bj, lambda, a)
        );

        let failed = converged.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            log::warn!(
                "lasso: {failed}/{n} samples hit max_iter = {}",
                self.params.max_iter
            );
        }
        log::trace!(
            "lasso: solved {n} samples with {k} atoms on {} threads, lambda = {lambda}",
            workers()
        );
        Ok(alpha)
    }
}
