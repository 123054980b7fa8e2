//! 染色标准化器.
//!
//! - [`Normalizer`]: 最基本的 `fit` / `transform` 能力.
//! - [`StainEstimator`]: 从图像估计 `2 x 3` 染色矩阵的算法. 不同算法是不同的类型.
//! - [`StainNormalizer`]: 基于某个 `StainEstimator` 的标准化器, 额外提供
//!   `stain_matrix`, `target_stains` 和 `hematoxylin`.

mod macenko;
mod reinhard;
mod ruifrok;
mod vahadane;

pub use macenko::{Macenko, MacenkoParams};
pub use reinhard::{LabStats, Reinhard};
pub use ruifrok::Ruifrok;
pub use vahadane::{Vahadane, VahadaneParams};

use crate::consts::{DEFAULT_LAMBDA, HEMATOXYLIN, MAX_CONCENTRATION_PERCENTILE, N_STAINS};
use crate::lasso::{get_concentrations_with, NonNegLasso, SparseSolver};
use crate::od::{od_to_rgb, standardize_brightness};
use crate::stats::percentile;
use crate::{StainError, StainMatrix, StainResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 颜色标准化器.
pub trait Normalizer {
    /// 以 `target` 的颜色外观作为目标. 每次调用都会完全替换之前的状态.
    fn fit(&mut self, target: ArrayView3<u8>) -> StainResult<()>;

    /// 将 `image` 重新着色, 使之匹配最近一次 `fit` 的目标.
    ///
    /// 从未 `fit` 过时返回 [`StainError::NotFitted`].
    fn transform(&self, image: ArrayView3<u8>) -> StainResult<Array3<u8>>;
}

/// 染色矩阵估计算法.
///
/// 算法自身的参数 (如 Macenko 的 `beta`, `alpha`) 在构建时给定.
pub trait StainEstimator {
    /// 估计 `image` 的 `2 x 3` 染色矩阵.
    fn stain_matrix(&self, image: ArrayView3<u8>) -> StainResult<StainMatrix>;
}

impl<T: StainEstimator + ?Sized> StainEstimator for &T {
    #[inline]
    fn stain_matrix(&self, image: ArrayView3<u8>) -> StainResult<StainMatrix> {
        (**self).stain_matrix(image)
    }
}

impl<T: StainEstimator + ?Sized> StainEstimator for Box<T> {
    #[inline]
    fn stain_matrix(&self, image: ArrayView3<u8>) -> StainResult<StainMatrix> {
        (**self).stain_matrix(image)
    }
}

/// `fit` 得到的目标状态.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetStains {
    /// 目标图像的染色矩阵.
    stain_matrix: StainMatrix,

    /// 目标图像每种染色浓度的第 99 百分位, 依次为苏木精和伊红.
    max_concentrations: [f64; N_STAINS],
}

impl TargetStains {
    /// 由染色矩阵和对应的 `(N, 2)` 浓度矩阵构建.
    pub fn new(stain_matrix: StainMatrix, concentrations: ArrayView2<f64>) -> Self {
        Self {
            stain_matrix,
            max_concentrations: max_concentrations(concentrations),
        }
    }

    /// 目标染色矩阵.
    #[inline]
    pub fn stain_matrix(&self) -> &StainMatrix {
        &self.stain_matrix
    }

    /// 目标浓度的第 99 百分位.
    #[inline]
    pub fn max_concentrations(&self) -> [f64; N_STAINS] {
        self.max_concentrations
    }
}

#[cfg(feature = "serde")]
impl TargetStains {
    /// 使用 `bincode` 编码.
    pub fn to_bytes(&self) -> StainResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// 从 `to_bytes` 的结果恢复. 染色矩阵的形状会被重新检查.
    pub fn from_bytes(bytes: &[u8]) -> StainResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// 按列求浓度的第 99 百分位. 空列视为 0.
fn max_concentrations(c: ArrayView2<f64>) -> [f64; N_STAINS] {
    let mut ans = [0.0; N_STAINS];
    for (slot, col) in ans.iter_mut().zip(c.axis_iter(Axis(1))) {
        *slot = percentile(col.iter().copied(), MAX_CONCENTRATION_PERCENTILE).unwrap_or(0.0);
    }
    ans
}

/// 基于染色分离的标准化器.
///
/// `E` 决定如何估计染色矩阵, `S` 决定如何由染色矩阵恢复浓度.
#[derive(Clone, Debug)]
pub struct StainNormalizer<E, S = NonNegLasso> {
    estimator: E,
    solver: S,
    lambda: f64,
    target: Option<TargetStains>,
}

/// Macenko 标准化器.
pub type MacenkoNormalizer = StainNormalizer<Macenko>;

/// Vahadane 标准化器.
pub type VahadaneNormalizer = StainNormalizer<Vahadane>;

/// 使用固定参考染色矩阵的标准化器.
pub type RuifrokNormalizer = StainNormalizer<Ruifrok>;

impl<E: StainEstimator> StainNormalizer<E> {
    /// 使用默认求解器和 `λ = 0.01` 构建.
    #[inline]
    pub fn new(estimator: E) -> Self {
        Self::with_solver(estimator, NonNegLasso::default())
    }
}

impl<E: StainEstimator, S: SparseSolver> StainNormalizer<E, S> {
    /// 使用指定的求解器构建.
    pub fn with_solver(estimator: E, solver: S) -> Self {
        Self {
            estimator,
            solver,
            lambda: DEFAULT_LAMBDA,
            target: None,
        }
    }

    /// 设置浓度恢复时的 `λ`.
    #[inline]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// 浓度恢复时的 `λ`.
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// 染色估计算法.
    #[inline]
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// 目标状态. 未 `fit` 时为 `None`.
    #[inline]
    pub fn target(&self) -> Option<&TargetStains> {
        self.target.as_ref()
    }

    /// 直接设置目标状态, 例如从磁盘恢复之前的 `fit` 结果.
    #[inline]
    pub fn set_target(&mut self, target: TargetStains) {
        self.target = Some(target);
    }

    /// 估计 `image` 的染色矩阵.
    #[inline]
    pub fn stain_matrix(&self, image: ArrayView3<u8>) -> StainResult<StainMatrix> {
        self.estimator.stain_matrix(image)
    }

    /// 以当前求解器和 `λ` 求 `image` 在 `stain_matrix` 下的 `(H * W, 2)` 浓度矩阵.
    #[inline]
    pub fn concentrations(
        &self,
        image: ArrayView3<u8>,
        stain_matrix: &StainMatrix,
    ) -> StainResult<Array2<f64>> {
        get_concentrations_with(&self.solver, image, stain_matrix, self.lambda)
    }

    /// 以 RGB 形式获得目标染色. 返回 `2 x 3` 矩阵, 每行一种染色.
    ///
    /// 未 `fit` 时返回 [`StainError::NotFitted`].
    pub fn target_stains(&self) -> StainResult<Array2<u8>> {
        let target = self.target.as_ref().ok_or(StainError::NotFitted)?;
        Ok(od_to_rgb(&target.stain_matrix.view()))
    }

    /// 苏木精通道.
    ///
    /// 使用 `image` 自身 (而非目标) 的染色矩阵分离浓度, 返回 `(H, W)` 数组,
    /// 值为 `exp(-浓度)`, 位于 `(0, 1]`: 无苏木精处为 1 (白), 越深越接近 0.
    pub fn hematoxylin(&self, image: ArrayView3<u8>) -> StainResult<Array2<f64>> {
        let image = standardize_brightness(image)?;
        let (h, w, _) = image.dim();
        let stains = self.stain_matrix(image.view())?;
        let c = self.concentrations(image.view(), &stains)?;
        let hema = c.column(HEMATOXYLIN).mapv(|x| (-x).exp());
        Ok(hema.into_shape((h, w))?)
    }
}

impl<E: StainEstimator, S: SparseSolver> Normalizer for StainNormalizer<E, S> {
    fn fit(&mut self, target: ArrayView3<u8>) -> StainResult<()> {
        let target = standardize_brightness(target)?;
        let stains = self.stain_matrix(target.view())?;
        let c = self.concentrations(target.view(), &stains)?;
        let state = TargetStains::new(stains, c.view());
        log::debug!(
            "fit: image {:?}, stain matrix {:?}, max concentrations {:?}",
            target.shape(),
            state.stain_matrix.view(),
            state.max_concentrations
        );
        self.target = Some(state);
        Ok(())
    }

    fn transform(&self, image: ArrayView3<u8>) -> StainResult<Array3<u8>> {
        let target = self.target.as_ref().ok_or(StainError::NotFitted)?;
        let image = standardize_brightness(image)?;
        let (h, w, c) = image.dim();

        let source = self.stain_matrix(image.view())?;
        let mut conc = self.concentrations(image.view(), &source)?;
        let max_source = max_concentrations(conc.view());
        for (j, mut col) in conc.axis_iter_mut(Axis(1)).enumerate() {
            // 源图像几乎不含该染色时不做缩放.
            if max_source[j] > f64::EPSILON {
                let scale = target.max_concentrations[j] / max_source[j];
                col.mapv_inplace(|v| v * scale);
            }
        }
        log::debug!(
            "transform: image {:?}, source stain matrix {:?}, max concentrations {:?}",
            image.shape(),
            source.view(),
            max_source
        );

        let od = conc.dot(&target.stain_matrix.view());
        Ok(od_to_rgb(&od).into_shape((h, w, c))?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::consts::RUIFROK_HE;
    use crate::od::{normalize_rows, od_to_rgb};
    use ndarray::{array, Array3};

    /// 由 H&E 参考向量的线性组合构造的 8x8 合成图像.
    ///
    /// 第 `i` 个像素的苏木精浓度为 `0.2 * (i % 8)`, 伊红浓度为 `0.2 * (i / 8)`.
    /// 因此第一个像素为白色, 第一行为纯苏木精, 第一列为纯伊红.
    pub(crate) fn synthetic_he() -> Array3<u8> {
        let stains = normalize_rows(&*RUIFROK_HE);
        let mut img = Array3::<u8>::zeros((8, 8, 3));
        for ((h, w), mut px) in img
            .lanes_mut(Axis(2))
            .into_iter()
            .enumerate()
            .map(|(i, px)| ((i / 8, i % 8), px))
        {
            let (a, b) = (0.2 * w as f64, 0.2 * h as f64);
            let od = &stains.row(0) * a + &stains.row(1) * b;
            px.assign(&od_to_rgb(&od));
        }
        img
    }

    pub(crate) fn cosine(a: ndarray::ArrayView1<f64>, b: ndarray::ArrayView1<f64>) -> f64 {
        a.dot(&b) / (a.dot(&a).sqrt() * b.dot(&b).sqrt())
    }

    #[test]
    fn test_not_fitted() {
        let n = StainNormalizer::new(Ruifrok::new());
        assert!(matches!(n.target_stains(), Err(StainError::NotFitted)));
        let img = Array3::from_elem((2, 2, 3), 128u8);
        assert!(matches!(n.transform(img.view()), Err(StainError::NotFitted)));
        assert_eq!(StainError::NotFitted.to_string(), "fit must be called first");
    }

    #[test]
    fn test_gray_scenario() {
        let img = Array3::from_elem((4, 4, 3), 200u8);
        let n = StainNormalizer::new(Ruifrok::new());
        let stains = n.stain_matrix(img.view()).unwrap();
        assert_eq!(stains.view(), array![[0.65, 0.70, 0.29], [0.07, 0.99, 0.11]]);

        let c = n.concentrations(img.view(), &stains).unwrap();
        assert_eq!(c.dim(), (16, 2));
        assert!(c.iter().all(|&v| v >= 0.0));

        let hema = n.hematoxylin(img.view()).unwrap();
        assert_eq!(hema.dim(), (4, 4));
        assert!(hema.iter().all(|&v| v > 0.0 && v <= 1.0));
    }

    #[test]
    fn test_hematoxylin_range() {
        let img = synthetic_he();
        for n in [
            StainNormalizer::new(Box::new(Ruifrok::normalized()) as Box<dyn StainEstimator>),
            StainNormalizer::new(Box::new(Macenko::default()) as Box<dyn StainEstimator>),
            StainNormalizer::new(Box::new(Vahadane::default()) as Box<dyn StainEstimator>),
        ] {
            let hema = n.hematoxylin(img.view()).unwrap();
            assert_eq!(hema.dim(), (8, 8));
            assert!(hema.iter().all(|&v| v > 0.0 && v <= 1.0));
            // 白色像素没有苏木精.
            assert!((hema[[0, 0]] - 1.0).abs() < 1e-12);
            // 纯苏木精比纯伊红更暗.
            assert!(hema[[0, 7]] < hema[[7, 0]]);
        }
    }

    #[test]
    fn test_fit_idempotent() {
        let img = synthetic_he();
        let mut once = MacenkoNormalizer::new(Macenko::default());
        once.fit(img.view()).unwrap();

        let mut twice = MacenkoNormalizer::new(Macenko::default());
        twice.fit(img.view()).unwrap();
        twice.fit(img.view()).unwrap();

        assert_eq!(once.target_stains().unwrap(), twice.target_stains().unwrap());
        assert_eq!(once.target(), twice.target());
    }

    #[test]
    fn test_fit_replaces_target() {
        let mut n = RuifrokNormalizer::new(Ruifrok::new());
        n.fit(synthetic_he().view()).unwrap();
        let first = n.target().cloned().unwrap();
        n.fit(Array3::from_elem((3, 3, 3), 255u8).view()).unwrap();
        let second = n.target().cloned().unwrap();
        assert_eq!(first.stain_matrix(), second.stain_matrix());
        assert_ne!(first.max_concentrations(), second.max_concentrations());
        assert_eq!(second.max_concentrations(), [0.0, 0.0]);
    }

    #[test]
    fn test_target_stains_rgb() {
        let mut n = RuifrokNormalizer::new(Ruifrok::new());
        n.fit(synthetic_he().view()).unwrap();
        let rgb = n.target_stains().unwrap();
        assert_eq!(rgb, od_to_rgb(&*RUIFROK_HE));
    }

    #[test]
    fn test_transform_shape_and_white() {
        let target = synthetic_he();
        let mut source = synthetic_he();
        source.mapv_inplace(|v| v.saturating_sub(20));
        source.slice_mut(ndarray::s![0, 0, ..]).fill(255);

        let mut n = MacenkoNormalizer::new(Macenko::default());
        n.fit(target.view()).unwrap();
        let out = n.transform(source.view()).unwrap();
        assert_eq!(out.dim(), source.dim());
        assert_eq!(out.slice(ndarray::s![0, 0, ..]), array![255u8, 255, 255]);
    }

    #[test]
    fn test_invalid_input_propagates() {
        let mut n = StainNormalizer::new(Ruifrok::new());
        let bad = Array3::<u8>::zeros((2, 2, 4));
        assert!(matches!(n.fit(bad.view()), Err(StainError::InvalidImage { .. })));
        assert!(n.target().is_none());
        assert!(n.hematoxylin(bad.view()).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_target_persist() {
        let mut n = MacenkoNormalizer::new(Macenko::default());
        n.fit(synthetic_he().view()).unwrap();
        let bytes = n.target().unwrap().to_bytes().unwrap();

        let mut restored = MacenkoNormalizer::new(Macenko::default());
        restored.set_target(TargetStains::from_bytes(&bytes).unwrap());
        assert_eq!(restored.target(), n.target());
        assert!(TargetStains::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
