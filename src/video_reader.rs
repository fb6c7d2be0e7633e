use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use image::DynamicImage;
use std::path::Path;

/// 帧来源抽象：报告总帧数、按帧号定位、从定位点顺序读出帧。
/// 分析引擎只依赖这个接口，测试中用合成帧序列实现同一接口来驱动它
pub trait FrameSource {
    /// 视频总帧数
    fn total_frames(&self) -> u64;

    /// 定位到指定帧号，下一次 read_frame 从该帧开始返回
    fn seek_to_frame(&mut self, frame_index: u64) -> Result<()>;

    /// 顺序读出下一帧；流结束时返回 Ok(None)
    fn read_frame(&mut self) -> Result<Option<DynamicImage>>;
}

/// 视频读取器，负责打开视频容器、定位和解码帧
pub struct VideoReader {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    time_base: ffmpeg::Rational,
    fps: f64,
    total_frames: u64,
    /// seek 之后预读出的目标帧，留给下一次 read_frame 返回
    pending: Option<ffmpeg::frame::Video>,
    eof_sent: bool,
}

impl VideoReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        ffmpeg::init().context("初始化 FFmpeg 失败")?;

        // 设置 FFmpeg 日志级别为 ERROR，抑制警告和信息消息
        unsafe {
            ffmpeg::sys::av_log_set_level(ffmpeg::sys::AV_LOG_ERROR as i32);
        }

        let path_str = path.as_ref().to_string_lossy().to_string();
        let ictx = ffmpeg::format::input(&path_str).context("无法打开视频文件")?;

        // 先收集流信息，结束对 ictx 的借用
        let (stream_index, time_base, fps, reported_frames, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg::media::Type::Video)
                .context("未找到视频流")?;

            let avg = stream.avg_frame_rate();
            let fps = if avg.denominator() > 0 {
                avg.numerator() as f64 / avg.denominator() as f64
            } else {
                30.0 // 默认值
            };

            (
                stream.index(),
                stream.time_base(),
                fps,
                stream.frames(),
                stream.parameters(),
            )
        };

        let decoder_context = ffmpeg::codec::context::Context::from_parameters(parameters)
            .context("无法创建解码器上下文")?;

        let decoder = decoder_context
            .decoder()
            .video()
            .context("无法创建视频解码器")?;

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .context("无法创建缩放器")?;

        // 容器没有记录帧数时按时长和帧率估算
        let total_frames = if reported_frames > 0 {
            reported_frames as u64
        } else {
            let duration = ictx.duration();
            if duration > 0 {
                let secs = duration as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
                (secs * fps).round() as u64
            } else {
                0
            }
        };

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            fps,
            total_frames,
            pending: None,
            eof_sent: false,
        })
    }

    /// 帧的显示时间（秒），由 pts 和流的 time_base 换算
    fn frame_time(&self, frame: &ffmpeg::frame::Video) -> f64 {
        frame
            .timestamp()
            .map(|ts| {
                let tb_num = self.time_base.numerator() as f64;
                let tb_den = self.time_base.denominator() as f64;
                ts as f64 * tb_num / tb_den
            })
            .unwrap_or(0.0)
    }

    /// 解码出下一帧（未缩放）。流结束时返回 Ok(None)
    fn next_raw(&mut self) -> Result<Option<ffmpeg::frame::Video>> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }

        loop {
            let mut decoded = ffmpeg::frame::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }

            // 送入下一个视频包；个别坏包直接跳过
            let mut sent = false;
            for (stream, packet) in self.ictx.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                if self.decoder.send_packet(&packet).is_err() {
                    continue;
                }
                sent = true;
                break;
            }

            // 没有更多数据包时发送 EOF，冲出解码器缓冲的帧
            if !sent {
                self.decoder.send_eof().ok();
                self.eof_sent = true;
            }
        }
    }

    /// 将 FFmpeg 帧转换为 DynamicImage
    fn frame_to_image(&self, frame: &ffmpeg::frame::Video) -> Result<DynamicImage> {
        let width = frame.width();
        let height = frame.height();
        let data = frame.data(0);

        // RGB24 格式：每个像素 3 字节
        let mut img_buf = image::RgbImage::new(width, height);

        for y in 0..height {
            for x in 0..width {
                let idx = ((y * frame.stride(0) as u32) + (x * 3)) as usize;
                if idx + 2 < data.len() {
                    let r = data[idx];
                    let g = data[idx + 1];
                    let b = data[idx + 2];
                    img_buf.put_pixel(x, y, image::Rgb([r, g, b]));
                }
            }
        }

        Ok(DynamicImage::ImageRgb8(img_buf))
    }
}

impl FrameSource for VideoReader {
    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// 帧精确定位：先 seek 到目标之前最近的 keyframe，
    /// 再向前解码丢弃帧，停在目标帧号对应的时间点上
    fn seek_to_frame(&mut self, frame_index: u64) -> Result<()> {
        let target_time = frame_index as f64 / self.fps;
        let timestamp = (target_time * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;

        // Seek 到目标时间点（向后查找最近的 keyframe）
        unsafe {
            let ret = ffmpeg::sys::av_seek_frame(
                self.ictx.as_mut_ptr(),
                -1, // 对所有流 seek
                timestamp,
                ffmpeg::sys::AVSEEK_FLAG_BACKWARD as i32,
            );
            if ret < 0 {
                anyhow::bail!("定位到第 {} 帧失败", frame_index);
            }
        }

        // 刷新解码器缓冲区
        self.decoder.flush();
        self.eof_sent = false;
        self.pending = None;

        // 从 keyframe 向前解码，丢弃目标帧之前的帧
        let half_frame = 0.5 / self.fps;
        loop {
            match self.next_raw()? {
                Some(frame) => {
                    if self.frame_time(&frame) + half_frame >= target_time {
                        // 到达目标帧，留给下一次 read_frame 返回
                        self.pending = Some(frame);
                        return Ok(());
                    }
                }
                // 流在目标帧之前就结束了，后续 read_frame 返回 None
                None => return Ok(()),
            }
        }
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        match self.next_raw()? {
            Some(frame) => {
                let mut rgb_frame = ffmpeg::frame::Video::empty();
                self.scaler
                    .run(&frame, &mut rgb_frame)
                    .context("缩放帧失败")?;
                Ok(Some(self.frame_to_image(&rgb_frame)?))
            }
            None => Ok(None),
        }
    }
}
