use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geometry::{Point2, Rect};

/// カウントセッションの状態
///
/// 呼び出し側が所有し、`RepCounter` に渡して更新する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepCounterState {
    /// しゃがみ中か
    pub is_squatting: bool,
    /// 完了したレップ数。減ることはない
    pub reps_completed: u32,
    /// レップ番号 → しゃがみ中に記録した被写体中心
    pub tracked_points: BTreeMap<u32, Vec<Point2>>,
    /// セッション中で最大の人物BBox
    pub largest_box_seen: Option<Rect>,
}

impl RepCounterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 進行中のレップ番号（1始まり）
    pub fn current_rep(&self) -> u32 {
        self.reps_completed + 1
    }

    /// 進行中のレップで記録した点
    pub fn current_tracked_points(&self) -> &[Point2] {
        self.tracked_points
            .get(&self.current_rep())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 全レップの記録点のX座標平均。点がなければNone
    pub fn average_tracked_x(&self) -> Option<f32> {
        let (sum, count) = self
            .tracked_points
            .values()
            .flatten()
            .fold((0.0f32, 0usize), |(sum, count), p| (sum + p.x, count + 1));
        (count > 0).then(|| sum / count as f32)
    }
}
