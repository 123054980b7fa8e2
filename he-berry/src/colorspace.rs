//! sRGB 与 CIE L\*a\*b\* 颜色空间互转.
//!
//! 采用 D65 白点, CIE 1931 2° 标准观察者, 以及 sRGB gamma 曲线.

use crate::od::check_image;
use crate::StainResult;
use ndarray::{Array3, ArrayView3, Axis, Zip};
use palette::white_point::D65;
use palette::{FromColor, IntoColor, LinSrgb, Srgb};

/// 一个 L\*a\*b\* 像素. `L*` 位于 `[0, 100]`.
pub type Lab = [f64; 3];

/// 将一个 8-bit RGB 像素转换为 L\*a\*b\*.
pub fn rgb_to_lab([r, g, b]: [u8; 3]) -> Lab {
    let lin: LinSrgb<f64> = Srgb::new(r, g, b).into_format::<f64>().into_linear();
    let lab = palette::Lab::<D65, f64>::from_color(lin);
    [lab.l, lab.a, lab.b]
}

/// 将一个 L\*a\*b\* 像素转换回 8-bit RGB. 超出 sRGB 色域的分量会被截断.
pub fn lab_to_rgb([l, a, b]: Lab) -> [u8; 3] {
    let lin: LinSrgb<f64> = palette::Lab::<D65, f64>::new(l, a, b).into_color();
    let srgb: Srgb<f64> = Srgb::from_linear(lin);
    [srgb.red, srgb.green, srgb.blue].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// 将 `(H, W, 3)` RGB 图像逐像素转换为 L\*a\*b\* 图像.
pub fn image_to_lab(image: ArrayView3<u8>) -> StainResult<Array3<f64>> {
    check_image(image)?;
    let mut out = Array3::<f64>::zeros(image.raw_dim());
    Zip::from(out.lanes_mut(Axis(2)))
        .and(image.lanes(Axis(2)))
        .for_each(|mut o, p| {
            let lab = rgb_to_lab([p[0], p[1], p[2]]);
            o[0] = lab[0];
            o[1] = lab[1];
            o[2] = lab[2];
        });
    Ok(out)
}

/// 将 `(H, W, 3)` L\*a\*b\* 图像逐像素转换回 RGB 图像.
pub fn lab_to_image(lab: ArrayView3<f64>) -> Array3<u8> {
    let mut out = Array3::<u8>::zeros(lab.raw_dim());
    Zip::from(out.lanes_mut(Axis(2)))
        .and(lab.lanes(Axis(2)))
        .for_each(|mut o, p| {
            let rgb = lab_to_rgb([p[0], p[1], p[2]]);
            o[0] = rgb[0];
            o[1] = rgb[1];
            o[2] = rgb[2];
        });
    out
}
