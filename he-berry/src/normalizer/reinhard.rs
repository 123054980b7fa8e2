//! Reinhard 颜色迁移.
//!
//! 参考: Reinhard et al., "Color transfer between images", 2001.
//! 在 L\*a\*b\* 空间中, 将每个通道的均值和标准差匹配到目标图像.
//! 不做染色分离, 因此只实现 [`Normalizer`].

use super::Normalizer;
use crate::colorspace::{image_to_lab, lab_to_image};
use crate::consts::N_CHANNELS;
use crate::od::standardize_brightness;
use crate::{StainError, StainResult};
use ndarray::{Array3, ArrayView3, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// L\*a\*b\* 各通道的均值与 (总体) 标准差.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabStats {
    /// 均值, 依次为 L\*, a\*, b\*.
    pub means: [f64; N_CHANNELS],

    /// 标准差, 依次为 L\*, a\*, b\*.
    pub stds: [f64; N_CHANNELS],
}

impl LabStats {
    /// 统计 `(H, W, 3)` L\*a\*b\* 图像.
    fn of(lab: &Array3<f64>) -> Self {
        let mut means = [0.0; N_CHANNELS];
        let mut stds = [0.0; N_CHANNELS];
        for (c, channel) in lab.axis_iter(Axis(2)).enumerate() {
            means[c] = channel.mean().unwrap_or(0.0);
            stds[c] = channel.std(0.0);
        }
        Self { means, stds }
    }
}

/// Reinhard 标准化器.
#[derive(Clone, Debug, Default)]
pub struct Reinhard {
    target: Option<LabStats>,
}

impl Reinhard {
    /// 创建一个未 `fit` 的实例.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 目标统计量. 未 `fit` 时为 `None`.
    #[inline]
    pub fn target(&self) -> Option<&LabStats> {
        self.target.as_ref()
    }
}

impl Normalizer for Reinhard {
    fn fit(&mut self, target: ArrayView3<u8>) -> StainResult<()> {
        let target = standardize_brightness(target)?;
        let stats = LabStats::of(&image_to_lab(target.view())?);
        log::debug!("reinhard fit: {stats:?}");
        self.target = Some(stats);
        Ok(())
    }

    fn transform(&self, image: ArrayView3<u8>) -> StainResult<Array3<u8>> {
        let target = self.target.ok_or(StainError::NotFitted)?;
        let image = standardize_brightness(image)?;
        let mut lab = image_to_lab(image.view())?;
        let source = LabStats::of(&lab);

        for (c, mut channel) in lab.axis_iter_mut(Axis(2)).enumerate() {
            // 常数通道只平移, 不缩放.
            let scale = if source.stds[c] > f64::EPSILON {
                target.stds[c] / source.stds[c]
            } else {
                1.0
            };
            let (ms, mt) = (source.means[c], target.means[c]);
            channel.mapv_inplace(|v| (v - ms) * scale + mt);
        }
        Ok(lab_to_image(lab.view()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::tests::synthetic_he;

    #[test]
    fn test_reinhard_not_fitted() {
        let img = Array3::from_elem((2, 2, 3), 100u8);
        assert!(matches!(
            Reinhard::new().transform(img.view()),
            Err(StainError::NotFitted)
        ));
    }

    #[test]
    fn test_reinhard_matches_target_stats() {
        let target = synthetic_he();
        let mut source = synthetic_he();
        source.mapv_inplace(|v| v / 2 + 60);

        let mut n = Reinhard::new();
        n.fit(target.view()).unwrap();
        let out = n.transform(source.view()).unwrap();
        assert_eq!(out.dim(), source.dim());

        let t = n.target().copied().unwrap();
        let got = LabStats::of(&image_to_lab(out.view()).unwrap());
        // 量化和截断会带来误差, 但 L* 均值应当接近.
        assert!((got.means[0] - t.means[0]).abs() < 5.0, "{got:?} vs {t:?}");
    }

    #[test]
    fn test_reinhard_self_transform() {
        let img = synthetic_he();
        let mut n = Reinhard::new();
        n.fit(img.view()).unwrap();
        let out = n.transform(img.view()).unwrap();
        let expected = standardize_brightness(img.view()).unwrap();
        for (a, b) in out.iter().zip(expected.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_reinhard_constant_channel() {
        let mut n = Reinhard::new();
        n.fit(synthetic_he().view()).unwrap();
        let flat = Array3::from_elem((3, 3, 3), 128u8);
        let out = n.transform(flat.view()).unwrap();
        assert_eq!(out.dim(), (3, 3, 3));
    }
}
