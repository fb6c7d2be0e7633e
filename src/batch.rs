use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::analyzer::analyze_video;
use crate::config::TriageConfig;
use crate::record::{ResultMap, ResultRow};

/// 遍历目录中的所有条目，逐个分析并收集结果
///
/// 单个视频的任何问题只会让它以跳过状态记入结果，
/// 不会中断整个批次；读取目录本身失败才是致命错误
pub fn run_batch(dir: &Path, config: &TriageConfig) -> Result<ResultMap> {
    let mut entries: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("读取目录失败: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    // 排序保证结果文件和日志顺序稳定
    entries.sort();

    info!("📂 目录 {} 中共有 {} 个条目", dir.display(), entries.len());

    let mut results = ResultMap::new();
    for name in &entries {
        let outcome = analyze_video(name, dir, config);
        results.insert(name.clone(), ResultRow::from_outcome(name, &outcome));
    }

    Ok(results)
}

/// 把整个批次的结果一次性写入 JSON 文件
///
/// 只在全部视频处理完之后调用一次；写入失败是致命错误，
/// 由调用方终止整个运行
pub fn write_results(path: &Path, results: &ResultMap) -> Result<()> {
    let json = serde_json::to_string_pretty(results).context("序列化结果失败")?;
    fs::write(path, json)
        .with_context(|| format!("写入结果文件失败: {}", path.display()))?;
    info!("💾 结果已写入: {}", path.display());
    Ok(())
}

/// 读回持久化的结果文件
pub fn load_results(path: &Path) -> Result<ResultMap> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("读取结果文件失败: {}", path.display()))?;
    let results = serde_json::from_str(&data)
        .with_context(|| format!("解析结果文件失败: {}", path.display()))?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SkipReason, VideoOutcome};

    #[test]
    fn test_results_file_roundtrip() {
        let mut map = ResultMap::new();
        map.insert(
            "a.mp4".to_string(),
            ResultRow::from_outcome(
                "a.mp4",
                &VideoOutcome::Verdict {
                    motion_detected: true,
                    average_score: 0.9,
                    elapsed_seconds: 2.5,
                },
            ),
        );
        map.insert(
            "b.txt".to_string(),
            ResultRow::from_outcome(
                "b.txt",
                &VideoOutcome::Skipped {
                    reason: SkipReason::UnsupportedFormat,
                },
            ),
        );

        let path = std::env::temp_dir().join(format!(
            "motion_triage_results_{}.json",
            std::process::id()
        ));
        write_results(&path, &map).unwrap();
        let back = load_results(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(back, map);
        assert_eq!(back.len(), 2);
        assert!(back["b.txt"].verdict().is_none());
    }

    #[test]
    fn test_non_video_entries_recorded_as_skipped() {
        // 目录里的非视频文件也要在结果里留下哨兵行
        let dir = std::env::temp_dir().join(format!("motion_triage_batch_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("notes.txt"), "not a video").unwrap();

        let results = run_batch(&dir, &TriageConfig::default()).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(results.len(), 1);
        assert!(results["notes.txt"].verdict().is_none());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let missing = Path::new("/nonexistent/motion-triage-batch");
        assert!(run_batch(missing, &TriageConfig::default()).is_err());
    }
}
