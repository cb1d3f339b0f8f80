use crate::config::LegFallback;
use crate::error::CounterError;
use crate::pose::{Pose, Side};

use super::angle::knee_angle;

/// 左右の膝角度から1フレームの代表角度を決める
#[derive(Debug, Clone, Copy)]
pub struct BilateralAngle {
    joint_confidence: f32,
    fallback: LegFallback,
}

impl BilateralAngle {
    pub fn new(joint_confidence: f32, fallback: LegFallback) -> Self {
        Self {
            joint_confidence,
            fallback,
        }
    }

    /// 片脚の膝角度。3関節のどれかが無効ならNone
    fn leg_angle(&self, pose: &Pose, side: Side) -> Option<Result<f32, CounterError>> {
        pose.leg(side, self.joint_confidence)
            .map(|(hip, knee, ankle)| knee_angle(hip, knee, ankle))
    }

    /// 代表角度（度）
    ///
    /// 両脚有効なら平均。片脚のみのときは `fallback` に従う。
    /// 有効な脚の座標が縮退していれば `InvalidGeometry`。
    pub fn compute(&self, pose: &Pose) -> Result<f32, CounterError> {
        let left = self.leg_angle(pose, Side::Left).transpose()?;
        let right = self.leg_angle(pose, Side::Right).transpose()?;

        match (left, right, self.fallback) {
            (Some(l), Some(r), _) => Ok((l + r) / 2.0),
            (Some(angle), None, LegFallback::SingleLeg)
            | (None, Some(angle), LegFallback::SingleLeg) => Ok(angle),
            _ => Err(CounterError::MissingJoints),
        }
    }
}
