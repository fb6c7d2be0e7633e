use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

use crate::preprocess::DenoiseParams;

/// 视频分析配置
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// 视频帧率
    pub fps: u32,
    /// 从视频开头跳过的帧数
    pub skip_frames: u32,
    /// 参与分析的总时长（秒），平分到三个窗口
    pub secs_consider: f64,
    /// SSIM 低于该值判定为运动
    pub threshold: f64,
    /// 帧预处理的去噪参数
    pub denoise: DenoiseParams,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            fps: 24,
            skip_frames: 12,
            secs_consider: 3.0,
            threshold: 0.997,
            denoise: DenoiseParams::default(),
        }
    }
}

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从多个源加载配置，优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    pub fn load_config(
        config_file: Option<&Path>,
        fps: Option<u32>,
        skip_frames: Option<u32>,
        secs_consider: Option<f64>,
        threshold: Option<f64>,
    ) -> Result<TriageConfig> {
        // 1. 先加载配置文件（如果存在）
        let file_config = if let Some(config_path) = config_file {
            Self::load_from_file(config_path).ok()
        } else {
            // 尝试从默认位置加载
            Self::load_from_default_locations().ok()
        };

        // 2. 加载环境变量
        let (env_fps, env_skip, env_secs, env_threshold) = Self::load_from_env();

        // 3. 合并配置（优先级：命令行 > 环境变量 > 配置文件 > 默认值）
        let defaults = TriageConfig::default();
        Ok(TriageConfig {
            fps: fps
                .or(env_fps)
                .or(file_config.as_ref().map(|c| c.fps))
                .unwrap_or(defaults.fps),
            skip_frames: skip_frames
                .or(env_skip)
                .or(file_config.as_ref().map(|c| c.skip_frames))
                .unwrap_or(defaults.skip_frames),
            secs_consider: secs_consider
                .or(env_secs)
                .or(file_config.as_ref().map(|c| c.secs_consider))
                .unwrap_or(defaults.secs_consider),
            threshold: threshold
                .or(env_threshold)
                .or(file_config.as_ref().map(|c| c.threshold))
                .unwrap_or(defaults.threshold),
            denoise: defaults.denoise,
        })
    }

    /// 从环境变量加载配置（返回 Option 值，表示是否从环境变量中读取到）
    fn load_from_env() -> (Option<u32>, Option<u32>, Option<f64>, Option<f64>) {
        (
            env::var("MOTION_TRIAGE_FPS")
                .ok()
                .and_then(|v| v.parse().ok()),
            env::var("MOTION_TRIAGE_SKIP_FRAMES")
                .ok()
                .and_then(|v| v.parse().ok()),
            env::var("MOTION_TRIAGE_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok()),
            env::var("MOTION_TRIAGE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok()),
        )
    }

    /// 从 INI 配置文件加载配置
    fn load_from_file(config_path: &Path) -> Result<TriageConfig> {
        if !config_path.exists() {
            return Err(anyhow::anyhow!(
                "配置文件不存在: {}",
                config_path.display()
            ));
        }

        let mut config_parser = configparser::ini::Ini::new();
        config_parser.load(config_path).map_err(|e| {
            anyhow::anyhow!("读取配置文件失败: {}: {}", config_path.display(), e)
        })?;

        // 尝试从 [motion_triage] 节读取，如果没有则使用 [DEFAULT] 节
        let fps = config_parser
            .get("motion_triage", "fps")
            .or_else(|| config_parser.get("DEFAULT", "fps"))
            .and_then(|v| v.parse().ok());

        let skip_frames = config_parser
            .get("motion_triage", "skip_frames")
            .or_else(|| config_parser.get("DEFAULT", "skip_frames"))
            .and_then(|v| v.parse().ok());

        let secs_consider = config_parser
            .get("motion_triage", "length")
            .or_else(|| config_parser.get("DEFAULT", "length"))
            .and_then(|v| v.parse().ok());

        let threshold = config_parser
            .get("motion_triage", "threshold")
            .or_else(|| config_parser.get("DEFAULT", "threshold"))
            .and_then(|v| v.parse().ok());

        let defaults = TriageConfig::default();
        Ok(TriageConfig {
            fps: fps.unwrap_or(defaults.fps),
            skip_frames: skip_frames.unwrap_or(defaults.skip_frames),
            secs_consider: secs_consider.unwrap_or(defaults.secs_consider),
            threshold: threshold.unwrap_or(defaults.threshold),
            denoise: defaults.denoise,
        })
    }

    /// 从默认位置加载配置文件
    fn load_from_default_locations() -> Result<TriageConfig> {
        // 1. 当前目录的 motion-triage.ini
        let current_dir_config = PathBuf::from("motion-triage.ini");
        if current_dir_config.exists() {
            return Self::load_from_file(&current_dir_config);
        }

        // 2. 当前目录的 .motion-triage.ini
        let hidden_config = PathBuf::from(".motion-triage.ini");
        if hidden_config.exists() {
            return Self::load_from_file(&hidden_config);
        }

        // 3. 用户主目录的 .motion-triage.ini
        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home).join(".motion-triage.ini");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        // 4. /etc/motion-triage.ini (Linux/macOS)
        let etc_config = PathBuf::from("/etc/motion-triage.ini");
        if etc_config.exists() {
            return Self::load_from_file(&etc_config);
        }

        Err(anyhow::anyhow!("未找到配置文件"))
    }

    /// 创建默认配置文件
    pub fn create_default_config(config_path: &Path) -> Result<()> {
        let defaults = TriageConfig::default();
        let mut config_parser = configparser::ini::Ini::new();
        config_parser.set("motion_triage", "fps", Some(defaults.fps.to_string()));
        config_parser.set(
            "motion_triage",
            "skip_frames",
            Some(defaults.skip_frames.to_string()),
        );
        config_parser.set(
            "motion_triage",
            "length",
            Some(defaults.secs_consider.to_string()),
        );
        config_parser.set(
            "motion_triage",
            "threshold",
            Some(defaults.threshold.to_string()),
        );

        config_parser.write(config_path).map_err(|e| {
            anyhow::anyhow!("写入配置文件失败: {}: {}", config_path.display(), e)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TriageConfig::default();
        assert_eq!(config.fps, 24);
        assert_eq!(config.skip_frames, 12);
        assert_eq!(config.secs_consider, 3.0);
        assert_eq!(config.threshold, 0.997);
    }

    #[test]
    fn test_cli_arguments_win() {
        // 命令行参数的优先级最高
        let config =
            ConfigLoader::load_config(None, Some(30), Some(0), Some(6.0), Some(0.95)).unwrap();
        assert_eq!(config.fps, 30);
        assert_eq!(config.skip_frames, 0);
        assert_eq!(config.secs_consider, 6.0);
        assert_eq!(config.threshold, 0.95);
    }
}
