use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::BufRead;
use std::path::Path;

use crate::counter::{FrameResult, RepCounter, RepCounterState};
use crate::detection::{decode_detections, Detection, LabelMap, ViewTransform};
use crate::error::CounterError;
use crate::geometry::{Point2, Rect};
use crate::pose::{Keypoint, KeypointIndex, Pose};

// --- 入力 ---

/// JSON Lines の1行 = 1フレーム
///
/// `joints` は関節名→`{x, y, confidence}`。`confidence` は必須で、省略した関節は
/// 読み込みエラーになる。記録に含まれない関節は無効扱い。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    #[serde(default)]
    pub joints: HashMap<KeypointIndex, Keypoint>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// 検出器の生出力 (class_id, score, xmin, xmax, ymin, ymax)*
    #[serde(default)]
    pub raw_detections: Vec<f32>,
}

impl FrameRecord {
    pub fn pose(&self) -> Pose {
        Pose::from_joints(&self.joints)
    }

    /// `detections` と生出力のデコード結果を連結
    pub fn all_detections(
        &self,
        labels: &LabelMap,
        transform: &ViewTransform,
    ) -> Result<Vec<Detection>, CounterError> {
        let mut all = self.detections.clone();
        all.extend(decode_detections(&self.raw_detections, labels, transform)?);
        Ok(all)
    }
}

/// JSON Lines を読み込む。空行は無視
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<FrameRecord>> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FrameRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid frame record on line {}", i + 1))?;
        frames.push(record);
    }
    Ok(frames)
}

pub fn load_frames<P: AsRef<Path>>(path: P) -> Result<Vec<FrameRecord>> {
    let path = path.as_ref();
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open frame file {}", path.display()))?;
    read_frames(std::io::BufReader::new(file))
}

// --- 再生 ---

/// リプレイの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub frames: usize,
    /// スキップしたフレーム数（`malformed` を含む）
    pub skipped: usize,
    /// 生検出バッファが壊れていたフレーム数
    pub malformed: usize,
}

/// フレームを順にカウンターへ流す
///
/// 生検出バッファが壊れたフレームはスキップ扱いにして続行する。
/// `on_result` には0始まりのフレーム番号と処理結果が渡る。
pub fn replay_frames<F>(
    counter: &mut RepCounter,
    frames: &[FrameRecord],
    labels: &LabelMap,
    transform: &ViewTransform,
    mut on_result: F,
) -> ReplayStats
where
    F: FnMut(usize, &FrameResult),
{
    let mut stats = ReplayStats::default();
    for (i, frame) in frames.iter().enumerate() {
        stats.frames += 1;
        let detections = match frame.all_detections(labels, transform) {
            Ok(detections) => detections,
            Err(e) => {
                tracing::debug!(frame = i + 1, error = %e, "skipping frame");
                stats.skipped += 1;
                stats.malformed += 1;
                continue;
            }
        };
        let result = counter.process_frame(&frame.pose(), &detections);
        if result.skipped.is_some() {
            stats.skipped += 1;
        }
        on_result(i, &result);
    }
    stats
}

// --- Summary ---

/// セッション結果（保存用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub reps_completed: u32,
    pub tracked_points: BTreeMap<u32, Vec<Point2>>,
    pub largest_box_seen: Option<Rect>,
    pub average_tracked_x: Option<f32>,
}

impl SessionSummary {
    pub fn from_state(state: &RepCounterState) -> Self {
        Self {
            reps_completed: state.reps_completed,
            tracked_points: state.tracked_points.clone(),
            largest_box_seen: state.largest_box_seen,
            average_tracked_x: state.average_tracked_x(),
        }
    }
}

pub fn save_summary<P: AsRef<Path>>(path: P, summary: &SessionSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path.as_ref(), json).context("Failed to write summary file")?;
    Ok(())
}

pub fn load_summary<P: AsRef<Path>>(path: P) -> Result<SessionSummary> {
    let content = fs::read_to_string(path.as_ref()).context("Failed to read summary file")?;
    let summary: SessionSummary = serde_json::from_str(&content)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_frames_skips_blank_lines() {
        let input = r#"{"joints": {"left_hip": {"x": 0.1, "y": 0.2, "confidence": 0.9}}}

{"detections": [{"label": "person", "score": 0.8, "rect": {"x": 0, "y": 0, "width": 10, "height": 20}}]}
"#;
        let frames = read_frames(input.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);

        let pose = frames[0].pose();
        assert_eq!(pose.get(KeypointIndex::LeftHip).y, 0.2);
        assert_eq!(pose.get(KeypointIndex::RightHip).confidence, 0.0);
        assert_eq!(frames[1].detections[0].rect.height, 20.0);
    }

    #[test]
    fn test_read_frames_reports_line() {
        let input = "{}\n{\"joints\": 3}\n";
        let err = read_frames(input.as_bytes()).unwrap_err();
        assert!(format!("{err}").contains("line 2"), "{err}");
    }

    #[test]
    fn test_unknown_joint_name_rejected() {
        let input = r#"{"joints": {"tail": {"x": 0.0, "y": 0.0}}}"#;
        assert!(read_frames(input.as_bytes()).is_err());
    }

    #[test]
    fn test_all_detections_decodes_raw() {
        let record = FrameRecord {
            detections: vec![Detection::new("person", 0.7, Rect::new(0.0, 0.0, 1.0, 1.0))],
            raw_detections: vec![0.0, 0.9, 0.0, 10.0, 0.0, 10.0],
            ..Default::default()
        };
        let labels = LabelMap::parse("person");
        let all = record.all_detections(&labels, &ViewTransform::identity()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].label, "person");
        assert_eq!(all[1].rect.area(), 100.0);
    }

    #[test]
    fn test_all_detections_malformed_raw() {
        let record = FrameRecord {
            raw_detections: vec![0.0, 0.9, 1.0],
            ..Default::default()
        };
        let result = record.all_detections(&LabelMap::default(), &ViewTransform::identity());
        assert_eq!(result.unwrap_err(), CounterError::MalformedDetections { len: 3 });
    }

    #[test]
    fn test_joint_without_confidence_rejected() {
        let input = r#"{"joints": {"left_knee": {"x": 0.4, "y": 0.7}}}"#;
        let err = read_frames(input.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("confidence"), "{err:#}");
    }

    #[test]
    fn test_replay_skips_malformed_frame() {
        use crate::counter::rep_counter::tests::pose_with_angle;
        use crate::pose::KeypointIndex as K;

        let frame = |deg: f32, raw: Vec<f32>| {
            let pose = pose_with_angle(deg);
            let joints = [
                K::LeftHip, K::LeftKnee, K::LeftAnkle, K::RightHip, K::RightKnee, K::RightAnkle,
            ]
            .into_iter()
            .map(|k| (k, *pose.get(k)))
            .collect();
            FrameRecord { joints, raw_detections: raw, ..Default::default() }
        };
        let person = vec![0.0, 0.9, 0.0, 10.0, 0.0, 10.0];
        let frames = vec![
            frame(90.0, person.clone()),
            // 6の倍数でないバッファ
            frame(180.0, vec![0.0, 0.9, 0.0, 10.0]),
            frame(180.0, person.clone()),
        ];

        let mut counter = RepCounter::default();
        let mut seen = Vec::new();
        let stats = replay_frames(
            &mut counter,
            &frames,
            &LabelMap::parse("person"),
            &ViewTransform::identity(),
            |i, result| seen.push((i, result.reps_completed)),
        );

        assert_eq!(stats, ReplayStats { frames: 3, skipped: 1, malformed: 1 });
        assert_eq!(seen, vec![(0, 0), (2, 1)]);
        assert_eq!(counter.state().reps_completed, 1);
    }

    #[test]
    fn test_summary_from_state() {
        let mut state = RepCounterState::new();
        state.reps_completed = 2;
        state.tracked_points.insert(1, vec![Point2::new(2.0, 0.0), Point2::new(4.0, 0.0)]);
        let summary = SessionSummary::from_state(&state);
        assert_eq!(summary.reps_completed, 2);
        assert_eq!(summary.average_tracked_x, Some(3.0));
    }
}
