//! 染色矩阵.

use crate::consts::{EOSIN, HEMATOXYLIN, N_CHANNELS, N_STAINS, RUIFROK_HE};
use crate::od::{normalize_rows, od_to_rgb};
use crate::{StainError, StainResult};
use ndarray::{Array2, ArrayView1, ArrayView2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `2 x 3` 的染色矩阵, 位于 OD-RGB 空间.
///
/// 第 0 行为苏木精 (hematoxylin) 染色向量, 第 1 行为伊红 (eosin) 染色向量.
/// 构造时会检查形状和有限性, 因此任何 `StainMatrix` 都满足该约束.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Array2<f64>", into = "Array2<f64>"))]
pub struct StainMatrix(Array2<f64>);

/// 反序列化时同样经过 `StainMatrix::new` 的检查.
impl TryFrom<Array2<f64>> for StainMatrix {
    type Error = StainError;

    #[inline]
    fn try_from(m: Array2<f64>) -> StainResult<Self> {
        Self::new(m)
    }
}

impl From<StainMatrix> for Array2<f64> {
    #[inline]
    fn from(s: StainMatrix) -> Self {
        s.0
    }
}

impl StainMatrix {
    /// 从 `2 x 3` 矩阵构建.
    ///
    /// 形状不符返回 `InvalidStainMatrix`, 存在 NaN/inf 返回 `NonFiniteStainMatrix`.
    pub fn new(m: Array2<f64>) -> StainResult<Self> {
        if m.dim() != (N_STAINS, N_CHANNELS) {
            return Err(StainError::InvalidStainMatrix {
                shape: m.shape().to_vec(),
            });
        }
        if !m.iter().all(|v| v.is_finite()) {
            return Err(StainError::NonFiniteStainMatrix);
        }
        Ok(Self(m))
    }

    /// 同 `new`, 但先对每一行做 L2 归一化.
    #[inline]
    pub fn normalized(m: Array2<f64>) -> StainResult<Self> {
        // 先检查形状, 避免对任意形状做归一化.
        Self::new(m).and_then(|s| Self::new(normalize_rows(&s.0)))
    }

    /// Ruifrok & Johnston 给出的 H&E 参考染色矩阵 (未归一化).
    #[inline]
    pub fn ruifrok() -> Self {
        Self(RUIFROK_HE.clone())
    }

    /// 获得底层矩阵视图.
    #[inline]
    pub fn view(&self) -> ArrayView2<f64> {
        self.0.view()
    }

    /// 消费自我, 获得底层矩阵.
    #[inline]
    pub fn into_inner(self) -> Array2<f64> {
        self.0
    }

    /// 苏木精染色向量.
    #[inline]
    pub fn hematoxylin(&self) -> ArrayView1<f64> {
        self.0.row(HEMATOXYLIN)
    }

    /// 伊红染色向量.
    #[inline]
    pub fn eosin(&self) -> ArrayView1<f64> {
        self.0.row(EOSIN)
    }

    /// 将染色向量转换为 RGB 颜色. 返回 `2 x 3` 的 `u8` 矩阵.
    #[inline]
    pub fn to_rgb(&self) -> Array2<u8> {
        od_to_rgb(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_stain_matrix_shape() {
        assert!(StainMatrix::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).is_ok());
        assert!(matches!(
            StainMatrix::new(array![[1.0, 2.0], [3.0, 4.0]]),
            Err(StainError::InvalidStainMatrix { .. })
        ));
        assert!(matches!(
            StainMatrix::new(Array2::zeros((3, 3))),
            Err(StainError::InvalidStainMatrix { .. })
        ));
    }

    #[test]
    fn test_stain_matrix_non_finite() {
        assert!(matches!(
            StainMatrix::new(array![[f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0]]),
            Err(StainError::NonFiniteStainMatrix)
        ));
        // 零向量归一化后为 NaN.
        assert!(matches!(
            StainMatrix::normalized(array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]),
            Err(StainError::NonFiniteStainMatrix)
        ));
    }

    #[test]
    fn test_stain_matrix_rows() {
        let s = StainMatrix::normalized(RUIFROK_HE.clone()).unwrap();
        for row in [s.hematoxylin(), s.eosin()] {
            assert!((row.dot(&row) - 1.0).abs() < 1e-12);
        }
        assert!(s.hematoxylin()[0] > s.eosin()[0]);
        assert_eq!(s.to_rgb().dim(), (2, 3));
    }
}
