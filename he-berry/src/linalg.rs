//! 小规模线性代数.
//!
//! 染色估计只需要 3x3 协方差矩阵的特征分解, 交给 `nalgebra`, 不依赖 LAPACK.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// 样本协方差矩阵. `m` 的每一行是一个观测, 每一列是一个变量
/// (即 numpy 中 `np.cov(m, rowvar=False)`).
///
/// 观测数少于 2 时返回 `None`.
pub fn covariance(m: ArrayView2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n < 2 {
        return None;
    }
    let mean = m.mean_axis(Axis(0))?;
    let centered = &m - &mean;
    Some(centered.t().dot(&centered) / (n - 1) as f64)
}

/// 对称矩阵的特征分解.
///
/// 返回 `(特征值, 特征向量)`, 特征值升序排列, 第 `i` 列特征向量对应第 `i` 个特征值
/// (与 numpy 的 `eigh` 一致). 调用方须保证 `a` 是对称方阵.
pub fn symmetric_eigen(a: ArrayView2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());
    let eig = SymmetricEigen::new(DMatrix::from_fn(n, n, |i, j| a[[i, j]]));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));

    let values = Array1::from_iter(order.iter().map(|&i| eig.eigenvalues[i]));
    let vectors = Array2::from_shape_fn((n, n), |(r, c)| eig.eigenvectors[(r, order[c])]);
    (values, vectors)
}
