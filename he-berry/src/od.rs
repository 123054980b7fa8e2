//! 光密度 (optical density, OD) 相关的基础操作.
//!
//! 根据 Beer-Lambert 定律, `OD = -ln(I / 255)` 使各染色的吸光度线性可加.

use crate::colorspace::rgb_to_lab;
use crate::consts::{BRIGHTNESS_PERCENTILE, MAX_INTENSITY, N_CHANNELS};
use crate::stats::percentile_u8;
use crate::{StainError, StainResult};
use ndarray::{Array, Array2, Array3, ArrayBase, ArrayView3, Axis, Data, Dimension, Ix2, Zip};

/// 检查 `image` 是否为非空的 `(H, W, 3)` 图像.
pub fn check_image<T>(image: ArrayView3<T>) -> StainResult<()> {
    let (h, w, c) = image.dim();
    if h == 0 || w == 0 || c != N_CHANNELS {
        Err(StainError::InvalidImage {
            shape: image.shape().to_vec(),
        })
    } else {
        Ok(())
    }
}

/// 将 RGB 图像转换为 OD 空间. 返回与输入同形状的数组.
///
/// 强度为 0 的像素先被视为 1, 以免对 0 取对数.
pub fn rgb_to_od(image: ArrayView3<u8>) -> StainResult<Array3<f64>> {
    check_image(image)?;
    Ok(image.mapv(|v| -((v.max(1) as f64) / MAX_INTENSITY).ln()))
}

/// 将 OD 数组转换回 RGB 强度 (`255 * exp(-od)`), 四舍五入并截断到 `[0, 255]`.
///
/// 形状不限, 例如既可以是 `(H, W, 3)` 图像, 也可以是 `2 x 3` 染色矩阵.
pub fn od_to_rgb<S, D>(od: &ArrayBase<S, D>) -> Array<u8, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    od.mapv(|x| (MAX_INTENSITY * (-x).exp()).round().clamp(0.0, MAX_INTENSITY) as u8)
}

/// 亮度标准化.
///
/// 以所有像素值的第 90 百分位 `p` 为参考, 把强度线性拉伸为 `I * 255 / p`
/// 并截断到 `[0, 255]`. 全黑图像 (`p == 0`) 原样返回.
pub fn standardize_brightness(image: ArrayView3<u8>) -> StainResult<Array3<u8>> {
    check_image(image)?;
    // 非空图像的百分位一定存在.
    let p = percentile_u8(image.iter(), BRIGHTNESS_PERCENTILE).unwrap_or(0.0);
    if p <= 0.0 {
        log::debug!("standardize_brightness: all-black image, left unchanged");
        return Ok(image.to_owned());
    }
    Ok(image.mapv(|v| (v as f64 * MAX_INTENSITY / p).clamp(0.0, MAX_INTENSITY) as u8))
}

/// 将矩阵的每一行除以其 L2 范数.
///
/// 零向量行会得到 NaN, 由调用方 (如 [`StainMatrix::new`](crate::StainMatrix::new)) 负责拒绝.
pub fn normalize_rows<S: Data<Elem = f64>>(m: &ArrayBase<S, Ix2>) -> Array2<f64> {
    let mut out = m.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        row.mapv_inplace(|v| v / norm);
    }
    out
}

/// 非白色 (即组织) 像素掩码.
///
/// 像素的亮度 `L* / 100` 严格小于 `thresh` 时为 `true`.
pub fn notwhite_mask(image: ArrayView3<u8>, thresh: f64) -> StainResult<Array2<bool>> {
    check_image(image)?;
    let (h, w, _) = image.dim();
    let mut mask = Array2::from_elem((h, w), false);
    Zip::from(&mut mask)
        .and(image.lanes(Axis(2)))
        .for_each(|m, p| {
            let lab = rgb_to_lab([p[0], p[1], p[2]]);
            *m = lab[0] / 100.0 < thresh;
        });
    Ok(mask)
}

/// 将 `(H, W, 3)` 的 OD 图像展平为 `(H * W, 3)` 的矩阵.
pub fn flatten_pixels(od: Array3<f64>) -> StainResult<Array2<f64>> {
    let (h, w, c) = od.dim();
    let od = if od.is_standard_layout() {
        od
    } else {
        od.as_standard_layout().into_owned()
    };
    Ok(od.into_shape((h * w, c))?)
}
