//! 固定参考染色矩阵.

use super::StainEstimator;
use crate::od::check_image;
use crate::{StainMatrix, StainResult};
use ndarray::ArrayView3;

/// 不看图像内容, 总是返回 Ruifrok & Johnston 的 H&E 参考矩阵.
///
/// 可作为基线, 也便于得到确定的结果.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ruifrok {
    normalize: bool,
}

impl Ruifrok {
    /// 返回原始 (未归一化) 参考矩阵.
    #[inline]
    pub fn new() -> Self {
        Self { normalize: false }
    }

    /// 返回逐行归一化后的参考矩阵.
    #[inline]
    pub fn normalized() -> Self {
        Self { normalize: true }
    }
}

impl StainEstimator for Ruifrok {
    fn stain_matrix(&self, image: ArrayView3<u8>) -> StainResult<StainMatrix> {
        check_image(image)?;
        let m = StainMatrix::ruifrok();
        if self.normalize {
            StainMatrix::normalized(m.into_inner())
        } else {
            Ok(m)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_ruifrok_fixed() {
        let a = Array3::from_elem((2, 2, 3), 10u8);
        let b = Array3::from_elem((3, 1, 3), 240u8);
        let r = Ruifrok::new();
        assert_eq!(r.stain_matrix(a.view()).unwrap(), r.stain_matrix(b.view()).unwrap());
        assert_eq!(r.stain_matrix(a.view()).unwrap(), StainMatrix::ruifrok());

        let n = Ruifrok::normalized().stain_matrix(a.view()).unwrap();
        let h = n.hematoxylin();
        assert!((h.dot(&h) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ruifrok_checks_image() {
        let bad = Array3::<u8>::zeros((2, 2, 1));
        assert!(Ruifrok::new().stain_matrix(bad.view()).is_err());
    }
}
