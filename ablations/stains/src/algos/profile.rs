//! 算法运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 累计时间 (微秒).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// ablation/benchmark 数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 是否成功在目标图像上 `fit`.
    fitted: bool,

    /// 读取或标准化失败的图像个数.
    failed: u64,

    /// 成功标准化的图像个数.
    target: u64,

    /// 总像素个数 (仅统计成功标准化的图像).
    pixels: u64,

    /// `fit` 花费的时间.
    fit_time: AccTimer,

    /// 标准化图像花费的总时间 (不含读写文件).
    target_time: AccTimer,

    /// 整个任务花费的总时间 (包括读写文件).
    real_time: AccTimer,

    /// 标准化单张图像最耗时的一次.
    most: Option<Duration>,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            fitted: false,
            failed: 0,
            target: 0,
            pixels: 0,
            fit_time: AccTimer::default(),
            target_time: AccTimer::default(),
            real_time: AccTimer::default(),
            most: None,
        }
    }

    /// 开始 `fit` 计时.
    #[inline]
    pub fn fit_start(&mut self) {
        self.fit_time.start();
    }

    /// 结束 `fit` 计时, 记录是否成功.
    #[inline]
    pub fn fit_elapsed(&mut self, ok: bool) {
        self.fit_time.elapsed();
        self.fitted = ok;
    }

    /// 记录一张失败图像.
    #[inline]
    pub fn count_failed(&mut self) {
        self.failed += 1;
    }

    /// 开始一次图像标准化计时.
    #[inline]
    pub fn target_start(&mut self) {
        self.target_time.start();
    }

    /// 结束一次图像标准化计时, 并记录一张含 `pixels` 个像素的成功图像.
    #[inline]
    pub fn target_elapsed(&mut self, pixels: usize) {
        let d = self.target_time.elapsed();
        self.target += 1;
        self.pixels += pixels as u64;
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 是否成功 `fit`.
    #[inline]
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// 获得失败图像个数.
    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 获得成功标准化图像个数.
    #[inline]
    pub fn get_target(&self) -> u64 {
        self.target
    }

    /// 获得成功标准化的总像素个数.
    #[inline]
    pub fn get_pixels(&self) -> u64 {
        self.pixels
    }

    /// 以微秒为单位获得 `fit` 时间.
    #[inline]
    pub fn get_fit_time_us(&self) -> u64 {
        self.fit_time.get_total_us()
    }

    /// 以微秒为单位获得标准化图像的总时间.
    #[inline]
    pub fn get_target_time_us(&self) -> u64 {
        self.target_time.get_total_us()
    }

    /// 以微秒为单位获得算法运行到目前的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得标准化单张图像的平均时间.
    #[inline]
    pub fn get_avg_target_time_us(&self) -> Option<f64> {
        match self.target {
            0 => None,
            target => Some(self.get_target_time_us() as f64 / target as f64),
        }
    }

    /// 每微秒处理的像素个数.
    #[inline]
    pub fn get_throughput(&self) -> Option<f64> {
        match self.get_target_time_us() {
            0 => None,
            us => Some(self.pixels as f64 / us as f64),
        }
    }

    /// 获取标准化单张图像最耗时的一次任务所消耗的时间.
    ///
    /// 如果不存在任务, 则返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
