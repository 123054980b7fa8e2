//! 数据集路径配置与图像读写. 提供更直接的数据集加载器.

use image::error::{ParameterError, ParameterErrorKind};
use image::{GrayImage, ImageError, ImageResult, Luma, RgbImage};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 可以被加载的图像文件扩展名 (小写).
const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 读取环境变量 `var`, 为空或不存在时回退到 `$HOME/dataset/{rest..}`.
fn env_or_home<const N: usize>(var: &str, rest: [&str; N]) -> PathBuf {
    match env::var(var) {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => home_dataset_dir_with(rest).unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// 获取待标准化图像所在目录.
///
/// 1. 若环境变量 `$STAIN_IMAGE_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/stain/images`.
pub fn image_dir_from_env_or_home() -> PathBuf {
    env_or_home("STAIN_IMAGE_DIR", ["stain", "images"])
}

/// 获取目标 (参考) 图像路径.
///
/// 1. 若环境变量 `$STAIN_TARGET` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/stain/target.png`.
pub fn target_path_from_env_or_home() -> PathBuf {
    env_or_home("STAIN_TARGET", ["stain", "target.png"])
}

/// 获取输出目录.
///
/// 1. 若环境变量 `$STAIN_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/stain/output`.
pub fn output_dir_from_env_or_home() -> PathBuf {
    env_or_home("STAIN_OUTPUT_DIR", ["stain", "output"])
}

/// 判断 `path` 是否为受支持的图像文件.
fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// 将 `path` 处的图像读取为 `(H, W, 3)` RGB 数组.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> ImageResult<Array3<u8>> {
    let img = image::open(path)?.into_rgb8();
    let (w, h) = img.dimensions();
    let raw = img.into_raw();
    // `RgbImage` 按行优先, 每像素 3 字节存储, 与 `(H, W, 3)` 标准布局一致.
    Array3::from_shape_vec((h as usize, w as usize, 3), raw).map_err(|_| {
        ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        ))
    })
}

/// 将 `(H, W, 3)` RGB 数组保存到 `path`. 格式由扩展名决定.
pub fn save_rgb<P: AsRef<Path>>(image: ArrayView3<u8>, path: P) -> ImageResult<()> {
    let (h, w, _) = image.dim();
    let mut buf = RgbImage::new(w as u32, h as u32);
    for ((y, x, c), &v) in image.indexed_iter() {
        buf.get_pixel_mut(x as u32, y as u32).0[c] = v;
    }
    buf.save(path)
}

/// 将 `(H, W)` 灰度数组保存到 `path`.
pub fn save_gray<P: AsRef<Path>>(image: ArrayView2<u8>, path: P) -> ImageResult<()> {
    let (h, w) = image.dim();
    let mut buf = GrayImage::new(w as u32, h as u32);
    for ((y, x), &v) in image.indexed_iter() {
        buf.put_pixel(x as u32, y as u32, Luma([v]));
    }
    buf.save(path)
}

/// 按原样将 `f64` 矩阵保存为 `.npy` 文件.
pub fn save_npy<P: AsRef<Path>>(data: ArrayView2<f64>, path: P) -> io::Result<()> {
    ndarray_npy::write_npy(path, &data)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

/// 图像目录加载器. 按文件名排序, 逐个产出 `(文件主名, 图像)`.
pub struct ImageLoader {
    paths: std::vec::IntoIter<PathBuf>,
}

impl ImageLoader {
    /// 扫描 `dir` 下的全部图像文件 (不递归).
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        paths.sort_unstable();
        Ok(Self {
            paths: paths.into_iter(),
        })
    }

    /// 剩余图像个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// 是否已经没有剩余图像.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for ImageLoader {
    type Item = (String, ImageResult<Array3<u8>>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some((name, load_rgb(&path)))
    }
}

/// 苏木精通道 `(H, W)` 转为便于查看的灰度数组 (0 为无染色, 255 为最深).
pub fn hematoxylin_to_gray(h: ArrayView2<f64>) -> Array2<u8> {
    h.mapv(|v| ((1.0 - v) * 255.0).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_dataset_dir_with() {
        if let Some(p) = home_dataset_dir_with(["stain", "images"]) {
            assert!(p.ends_with("dataset/stain/images"));
        }
    }

    #[test]
    fn test_is_image() {
        assert!(!is_image(Path::new("/definitely/not/here.png")));
    }

    #[test]
    fn test_hematoxylin_to_gray() {
        let h = ndarray::array![[1.0, 0.0], [0.5, 2.0]];
        let g = hematoxylin_to_gray(h.view());
        assert_eq!(g, ndarray::array![[0u8, 255], [128, 0]]);

        let dir = env::temp_dir().join("stain-utils-gray");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("h.png");
        save_gray(g.view(), &path).unwrap();
        let back = image::open(&path).unwrap().into_luma8();
        assert_eq!(back.dimensions(), (2, 2));
        assert_eq!(back.get_pixel(1, 0).0, [255]);
    }

    #[test]
    fn test_save_and_load_rgb() {
        let dir = env::temp_dir().join("stain-utils-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tile.png");

        let img = Array3::from_shape_fn((3, 5, 3), |(y, x, c)| (y * 50 + x * 10 + c) as u8);
        save_rgb(img.view(), &path).unwrap();
        assert_eq!(load_rgb(&path).unwrap(), img);

        let loader = ImageLoader::new(&dir).unwrap();
        assert!(!loader.is_empty());
        assert!(loader.map(|(name, _)| name).any(|n| n == "tile"));
    }
}
