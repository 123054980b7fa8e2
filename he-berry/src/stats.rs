//! 简单统计量.

use ordered_float::NotNan;

/// 求 `values` 的第 `q` 百分位数 (`0 <= q <= 100`).
///
/// 采用线性插值 (与 numpy 默认的 `linear` 方式一致).
/// 如果 `values` 为空, 或包含 NaN, 或 `q` 越界, 则返回 `None`.
pub fn percentile<I: IntoIterator<Item = f64>>(values: I, q: f64) -> Option<f64> {
    if !(0.0..=100.0).contains(&q) {
        return None;
    }
    let mut sorted = values
        .into_iter()
        .map(NotNan::new)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable();
    Some(interpolate(&sorted, q))
}

/// 在已排序的 `sorted` 上按 `q` 百分位线性插值. `sorted` 必须非空.
fn interpolate(sorted: &[NotNan<f64>], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    let (a, b) = (sorted[lo].into_inner(), sorted[hi].into_inner());
    a + (b - a) * frac
}

/// 对 `u8` 数据求第 `q` 百分位数. 借助直方图, 不需要排序.
///
/// 结果与 [`percentile`] 相同. 如果 `values` 为空或 `q` 越界, 则返回 `None`.
pub fn percentile_u8<'a, I: IntoIterator<Item = &'a u8>>(values: I, q: f64) -> Option<f64> {
    if !(0.0..=100.0).contains(&q) {
        return None;
    }
    let mut hist = [0usize; 256];
    let mut n = 0usize;
    for &v in values {
        hist[v as usize] += 1;
        n += 1;
    }
    if n == 0 {
        return None;
    }

    let rank = q / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    let (a, b) = (kth(&hist, lo), kth(&hist, hi));
    Some(a + (b - a) * frac)
}

/// 直方图中排序后第 `k` 个 (从 0 开始) 元素的值.
fn kth(hist: &[usize; 256], k: usize) -> f64 {
    let mut acc = 0;
    for (value, &count) in hist.iter().enumerate() {
        acc += count;
        if acc > k {
            return value as f64;
        }
    }
    255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_percentile_linear() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!(float_eq(percentile(v, 0.0).unwrap(), 1.0));
        assert!(float_eq(percentile(v, 100.0).unwrap(), 4.0));
        assert!(float_eq(percentile(v, 50.0).unwrap(), 2.5));
        // rank = 0.9 * 3 = 2.7
        assert!(float_eq(percentile(v, 90.0).unwrap(), 3.7));
        // 顺序无关
        assert!(float_eq(percentile([4.0, 1.0, 3.0, 2.0], 90.0).unwrap(), 3.7));
    }

    #[test]
    fn test_percentile_invalid() {
        assert_eq!(percentile(Vec::<f64>::new(), 50.0), None);
        assert_eq!(percentile([1.0, f64::NAN], 50.0), None);
        assert_eq!(percentile([1.0], 101.0), None);
        assert_eq!(percentile([1.0], -1.0), None);
    }

    #[test]
    fn test_percentile_u8_agrees() {
        let data: Vec<u8> = vec![0, 7, 7, 200, 13, 255, 99, 1, 1, 42, 180];
        for q in [0.0, 1.0, 33.3, 50.0, 90.0, 99.0, 100.0] {
            let a = percentile_u8(data.iter(), q).unwrap();
            let b = percentile(data.iter().map(|&v| v as f64), q).unwrap();
            assert!(float_eq(a, b), "q = {q}: {a} != {b}");
        }
        assert_eq!(percentile_u8(std::iter::empty(), 50.0), None);
    }
}
