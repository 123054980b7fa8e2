//! 通用常量.

use ndarray::{array, Array2};
use once_cell::sync::Lazy;

/// 浓度恢复时 L1 惩罚项的默认权重 λ.
pub const DEFAULT_LAMBDA: f64 = 0.01;

/// 亮度标准化所参考的百分位.
pub const BRIGHTNESS_PERCENTILE: f64 = 90.0;

/// 标准化时, 衡量 "最大浓度" 所用的百分位.
pub const MAX_CONCENTRATION_PERCENTILE: f64 = 99.0;

/// 8-bit 图像的最大强度.
pub const MAX_INTENSITY: f64 = 255.0;

/// 染色个数 (苏木精, 伊红).
pub const N_STAINS: usize = 2;

/// 颜色通道个数.
pub const N_CHANNELS: usize = 3;

/// 染色矩阵中苏木精所在的行.
pub const HEMATOXYLIN: usize = 0;

/// 染色矩阵中伊红所在的行.
pub const EOSIN: usize = 1;

/// Ruifrok & Johnston (2001) 给出的 H&E 参考染色向量 (OD 空间, 未归一化).
///
/// 第一行为苏木精, 第二行为伊红.
pub static RUIFROK_HE: Lazy<Array2<f64>> =
    Lazy::new(|| array![[0.65, 0.70, 0.29], [0.07, 0.99, 0.11]]);

/// Macenko 方法默认参数.
pub mod macenko {
    /// OD 阈值. 三个通道 OD 均不超过该值的像素视为透明背景.
    pub const BETA: f64 = 0.15;

    /// 角度分布两端截取的百分位.
    pub const ALPHA: f64 = 1.0;
}

/// Vahadane 方法默认参数.
pub mod vahadane {
    /// 亮度 (L\*/100) 低于该阈值的像素视为组织.
    pub const THRESHOLD: f64 = 0.8;

    /// 字典学习时的 L1 惩罚项权重.
    pub const LAMBDA: f64 = 0.1;

    /// 字典学习交替迭代的轮数.
    pub const ITERATIONS: u32 = 30;
}
