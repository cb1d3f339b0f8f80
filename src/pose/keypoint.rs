use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::geometry::Point2;

/// 17キーポイントのインデックス（COCO / PoseNet 共通の並び）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;
}

/// 脚の左右
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// (腰, 膝, 足首)
    pub fn leg(self) -> [KeypointIndex; 3] {
        match self {
            Side::Left => [
                KeypointIndex::LeftHip,
                KeypointIndex::LeftKnee,
                KeypointIndex::LeftAnkle,
            ],
            Side::Right => [
                KeypointIndex::RightHip,
                KeypointIndex::RightKnee,
                KeypointIndex::RightAnkle,
            ],
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)。省略不可
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

/// 1フレーム分の姿勢
#[derive(Debug, Clone)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl Pose {
    /// 名前→キーポイントのマップから作成。含まれない関節は信頼度0（無効）
    pub fn from_joints(joints: &HashMap<KeypointIndex, Keypoint>) -> Self {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for (&index, &kp) in joints {
            keypoints[index as usize] = kp;
        }
        Self { keypoints }
    }

    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    pub fn set(&mut self, index: KeypointIndex, keypoint: Keypoint) {
        self.keypoints[index as usize] = keypoint;
    }

    /// 片脚の3関節がすべて有効なら (腰, 膝, 足首) の座標を返す
    pub fn leg(&self, side: Side, threshold: f32) -> Option<(Point2, Point2, Point2)> {
        let [hip, knee, ankle] = side.leg().map(|index| self.get(index));
        if hip.is_valid(threshold) && knee.is_valid(threshold) && ankle.is_valid(threshold) {
            Some((hip.position(), knee.position(), ankle.position()))
        } else {
            None
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); KeypointIndex::COUNT],
        }
    }
}
