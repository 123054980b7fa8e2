mod profile;

use he_berry::prelude::*;
use ndarray::{Array2, Array3, ArrayView3};
use std::fs;
use std::path::{Path, PathBuf};
use utils::loader::{self, ImageLoader};

pub use profile::Profile;

/// 各方法共享的实验输入.
pub struct Setup {
    /// 待标准化图像目录.
    pub image_dir: PathBuf,

    /// 目标图像.
    pub target: Array3<u8>,

    /// 输出根目录. 每个方法写入其下的同名子目录.
    pub output_dir: PathBuf,
}

/// 能额外给出苏木精通道的标准化器.
trait Separating: Normalizer {
    /// 不支持染色分离时返回 `None`.
    fn separate(&self, _image: ArrayView3<u8>) -> Option<StainResult<Array2<f64>>> {
        None
    }
}

impl<E: StainEstimator, S: SparseSolver> Separating for StainNormalizer<E, S> {
    fn separate(&self, image: ArrayView3<u8>) -> Option<StainResult<Array2<f64>>> {
        Some(self.hematoxylin(image))
    }
}

impl Separating for Reinhard {}

/// 在目标图像上 `fit`, 然后标准化 `setup.image_dir` 下的所有图像.
fn normalize_all<N: Separating>(name: &str, mut normalizer: N, setup: &Setup) -> Profile {
    let mut profile = Profile::new();
    let out = setup.output_dir.join(name);
    if let Err(e) = fs::create_dir_all(&out) {
        log::error!("{name}: cannot create {out:?}: {e}");
        return profile.finish();
    }

    profile.fit_start();
    let fitted = normalizer.fit(setup.target.view());
    profile.fit_elapsed(fitted.is_ok());
    if let Err(e) = fitted {
        log::error!("{name}: fit failed: {e}");
        return profile.finish();
    }

    let loader = match ImageLoader::new(&setup.image_dir) {
        Ok(l) => l,
        Err(e) => {
            log::error!("{name}: cannot list {:?}: {e}", setup.image_dir);
            return profile.finish();
        }
    };
    for (stem, image) in loader {
        log::info!("{name}: file {stem}...");
        let image = match image {
            Ok(img) => img,
            Err(e) => {
                log::warn!("{name}: {stem}: {e}");
                profile.count_failed();
                continue;
            }
        };

        profile.target_start();
        match normalizer.transform(image.view()) {
            Ok(normalized) => {
                let (h, w, _) = normalized.dim();
                profile.target_elapsed(h * w);
                save_outputs(&normalizer, &out, &stem, image.view(), &normalized);
            }
            Err(e) => {
                log::warn!("{name}: {stem}: {e}");
                profile.count_failed();
            }
        }
    }
    profile.finish()
}

/// 写出标准化结果, 以及 (若支持) 苏木精通道的 `.npy` 和灰度图. 写文件失败仅记录日志.
fn save_outputs<N: Separating>(
    normalizer: &N,
    out: &Path,
    stem: &str,
    source: ArrayView3<u8>,
    normalized: &Array3<u8>,
) {
    if let Err(e) = loader::save_rgb(normalized.view(), out.join(format!("{stem}.png"))) {
        log::warn!("{stem}: {e}");
    }
    match normalizer.separate(source) {
        Some(Ok(h)) => {
            if let Err(e) = loader::save_npy(h.view(), out.join(format!("{stem}_h.npy"))) {
                log::warn!("{stem}: {e}");
            }
            let gray = loader::hematoxylin_to_gray(h.view());
            if let Err(e) = loader::save_gray(gray.view(), out.join(format!("{stem}_h.png"))) {
                log::warn!("{stem}: {e}");
            }
        }
        Some(Err(e)) => log::warn!("{stem}: hematoxylin: {e}"),
        None => {}
    }
}

pub fn macenko(setup: &Setup) -> Profile {
    normalize_all("macenko", StainNormalizer::new(Macenko::default()), setup)
}

pub fn vahadane(setup: &Setup) -> Profile {
    normalize_all("vahadane", StainNormalizer::new(Vahadane::default()), setup)
}

pub fn ruifrok(setup: &Setup) -> Profile {
    normalize_all("ruifrok", StainNormalizer::new(Ruifrok::normalized()), setup)
}

pub fn reinhard(setup: &Setup) -> Profile {
    normalize_all("reinhard", Reinhard::new(), setup)
}
