use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

/// 去噪参数。三个值都是经验调出的固定配置，直接影响分类灵敏度，
/// 保持为具名参数以便独立调整和测试
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoiseParams {
    /// 滤波强度，越大抹掉的噪声越多
    pub strength: f64,
    /// 块相似度比较使用的模板窗口边长（奇数）
    pub template_window: u32,
    /// 搜索相似块的窗口边长（奇数）
    pub search_window: u32,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            strength: 20.0,
            template_window: 7,
            search_window: 11,
        }
    }
}

/// 帧预处理：转灰度，再做固定参数的去噪
///
/// 纯函数，不携带任何跨帧状态。所有帧在参与相似度比较之前都必须
/// 经过完全相同的预处理，原始帧和预处理后的帧不允许混用比较
pub fn preprocess_frame(frame: &DynamicImage, params: &DenoiseParams) -> GrayImage {
    let gray = frame.to_luma8();
    denoise(&gray, params)
}

/// 非局部均值风格的去噪
///
/// 对每个像素，在搜索窗口内逐个比较以候选像素为中心的模板块与
/// 以当前像素为中心的模板块，按块间均方差的指数衰减加权平均。
/// 用于压掉传感器颗粒噪声和压缩噪声，同时保留真实的运动边缘
pub fn denoise(img: &GrayImage, params: &DenoiseParams) -> GrayImage {
    let width = img.width();
    let height = img.height();
    let t_radius = (params.template_window / 2) as i64;
    let s_radius = (params.search_window / 2) as i64;
    let h2 = params.strength * params.strength;

    // 越界坐标取最近的图像内像素
    let pixel_at = |x: i64, y: i64| -> f64 {
        let cx = x.clamp(0, width as i64 - 1) as u32;
        let cy = y.clamp(0, height as i64 - 1) as u32;
        img.get_pixel(cx, cy)[0] as f64
    };

    ImageBuffer::from_fn(width, height, |px, py| {
        let x = px as i64;
        let y = py as i64;
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for dy in -s_radius..=s_radius {
            for dx in -s_radius..=s_radius {
                // 两个模板块之间的均方差
                let mut diff_sum = 0.0;
                let mut count = 0u32;
                for ty in -t_radius..=t_radius {
                    for tx in -t_radius..=t_radius {
                        let a = pixel_at(x + tx, y + ty);
                        let b = pixel_at(x + dx + tx, y + dy + ty);
                        diff_sum += (a - b) * (a - b);
                        count += 1;
                    }
                }
                let dist2 = diff_sum / count as f64;

                let weight = (-dist2 / h2).exp();
                weighted_sum += weight * pixel_at(x + dx, y + dy);
                weight_total += weight;
            }
        }

        Luma([(weighted_sum / weight_total).round().clamp(0.0, 255.0) as u8])
    })
}
