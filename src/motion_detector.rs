use anyhow::Result;
use image::GrayImage;
use tracing::warn;

use crate::preprocess::{preprocess_frame, DenoiseParams};
use crate::sampler::AnalysisWindow;
use crate::video_reader::FrameSource;

/// SSIM 计算使用的滑动窗口边长
pub const SSIM_WINDOW: u32 = 7;
/// SSIM 稳定项系数
pub const SSIM_K1: f64 = 0.01;
pub const SSIM_K2: f64 = 0.03;
/// 8 位灰度图的动态范围
pub const SSIM_DATA_RANGE: f64 = 255.0;

/// 运动检测器：对窗口内的相邻帧做结构相似度打分
pub struct MotionDetector {
    /// SSIM 低于该值认为出现了运动
    threshold: f64,
    /// 帧预处理使用的去噪参数
    denoise: DenoiseParams,
}

impl MotionDetector {
    pub fn new(threshold: f64, denoise: DenoiseParams) -> Self {
        Self { threshold, denoise }
    }

    /// 得分是否指示运动。严格小于阈值，恰好等于阈值不算运动
    pub fn indicates_motion(&self, score: f64) -> bool {
        score < self.threshold
    }

    /// 为一个窗口打分
    ///
    /// 定位到窗口起点，顺序读取 frame_budget + 1 帧，每一帧先做
    /// 预处理，再和它的前一帧（滑动比较，不是都和第一帧比）计算
    /// SSIM，最后取所有比较的算术平均作为窗口得分。
    ///
    /// 流中途结束或读帧失败时用已经拿到的得分继续；一个得分都
    /// 没有拿到时返回错误，绝不触发除零
    pub fn score_window<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        window: &AnalysisWindow,
    ) -> Result<f64> {
        source.seek_to_frame(window.start)?;

        let mut previous: Option<GrayImage> = None;
        let mut scores: Vec<f64> = Vec::new();

        for offset in 0..=window.frame_budget {
            match source.read_frame() {
                Ok(Some(frame)) => {
                    let processed = preprocess_frame(&frame, &self.denoise);
                    if let Some(prev) = previous.take() {
                        scores.push(calculate_ssim(&prev, &processed));
                    }
                    previous = Some(processed);
                }
                Ok(None) => {
                    // 流在窗口内提前结束，用已收集的得分
                    break;
                }
                Err(e) => {
                    warn!("读取第 {} 帧失败: {:#}", window.start + offset, e);
                    break;
                }
            }
        }

        if scores.is_empty() {
            anyhow::bail!("窗口（起点 {}）内没有得到任何一次帧比较", window.start);
        }

        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// 计算两幅灰度图的结构相似度（SSIM），取值范围 [-1, 1]
///
/// 在 7x7 滑动窗口内计算局部均值、方差和协方差，得到局部 SSIM，
/// 再对所有窗口位置取平均。图像小于标准窗口时退化为整幅图像一个窗口
pub fn calculate_ssim(img1: &GrayImage, img2: &GrayImage) -> f64 {
    if img1.width() != img2.width() || img1.height() != img2.height() {
        // 尺寸不同的帧视为完全不相似
        return 0.0;
    }

    let width = img1.width();
    let height = img1.height();
    let win_w = SSIM_WINDOW.min(width);
    let win_h = SSIM_WINDOW.min(height);
    let n = (win_w * win_h) as f64;
    // 样本方差归一化；单像素窗口退化为 1
    let norm = if n > 1.0 { n - 1.0 } else { 1.0 };

    let c1 = (SSIM_K1 * SSIM_DATA_RANGE).powi(2);
    let c2 = (SSIM_K2 * SSIM_DATA_RANGE).powi(2);

    let mut ssim_sum = 0.0;
    let mut window_count = 0u64;

    for wy in 0..=(height - win_h) {
        for wx in 0..=(width - win_w) {
            // 窗口内均值
            let mut sum1 = 0.0;
            let mut sum2 = 0.0;
            for y in wy..(wy + win_h) {
                for x in wx..(wx + win_w) {
                    sum1 += img1.get_pixel(x, y)[0] as f64;
                    sum2 += img2.get_pixel(x, y)[0] as f64;
                }
            }
            let mean1 = sum1 / n;
            let mean2 = sum2 / n;

            // 窗口内方差和协方差
            let mut var1 = 0.0;
            let mut var2 = 0.0;
            let mut covar = 0.0;
            for y in wy..(wy + win_h) {
                for x in wx..(wx + win_w) {
                    let d1 = img1.get_pixel(x, y)[0] as f64 - mean1;
                    let d2 = img2.get_pixel(x, y)[0] as f64 - mean2;
                    var1 += d1 * d1;
                    var2 += d2 * d2;
                    covar += d1 * d2;
                }
            }
            var1 /= norm;
            var2 /= norm;
            covar /= norm;

            let numerator = (2.0 * mean1 * mean2 + c1) * (2.0 * covar + c2);
            let denominator = (mean1 * mean1 + mean2 * mean2 + c1) * (var1 + var2 + c2);

            ssim_sum += numerator / denominator;
            window_count += 1;
        }
    }

    ssim_sum / window_count as f64
}
