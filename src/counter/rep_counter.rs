use serde::Serialize;

use crate::config::Config;
use crate::detection::Detection;
use crate::error::CounterError;
use crate::geometry::Point2;
use crate::pose::Pose;

use super::aggregate::BilateralAngle;
use super::phase::{SquatStateMachine, Transition};
use super::state::RepCounterState;
use super::subject::SubjectTracker;

/// 1フレーム処理後の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub reps_completed: u32,
    pub is_squatting: bool,
    /// 進行中のレップで記録した点
    pub current_tracked_points: Vec<Point2>,
    /// このフレームの代表膝角度（スキップ時はNone）
    pub knee_angle: Option<f32>,
    pub transition: Option<Transition>,
    /// フレームをスキップした理由
    #[serde(skip)]
    pub skipped: Option<CounterError>,
}

/// スクワットのレップカウンター
///
/// 角度 → 左右統合 → 状態遷移 → 被写体追跡 の順に1フレームずつ処理する。
/// 内部で同期しないので、複数スレッドから使うときは `CounterSession` を通す。
#[derive(Debug, Clone)]
pub struct RepCounter {
    angle: BilateralAngle,
    machine: SquatStateMachine,
    subject: SubjectTracker,
    state: RepCounterState,
}

impl RepCounter {
    pub fn new(config: &Config) -> Self {
        Self::from_state(config, RepCounterState::new())
    }

    /// 既存の状態から再開
    pub fn from_state(config: &Config, state: RepCounterState) -> Self {
        Self {
            angle: BilateralAngle::new(config.counter.joint_confidence, config.counter.leg_fallback),
            machine: SquatStateMachine::from_config(&config.counter),
            subject: SubjectTracker::from_config(&config.subject),
            state,
        }
    }

    pub fn state(&self) -> &RepCounterState {
        &self.state
    }

    pub fn into_state(self) -> RepCounterState {
        self.state
    }

    /// 1フレームを処理
    ///
    /// 角度が求まらないフレームは状態を一切変更せずにスキップする。
    pub fn process_frame(&mut self, pose: &Pose, detections: &[Detection]) -> FrameResult {
        match self.angle.compute(pose) {
            Ok(angle) => {
                let transition = self.machine.step(&mut self.state, angle);
                match transition {
                    Some(Transition::Descended { rep }) => {
                        tracing::info!(rep, angle, "squat started");
                    }
                    Some(Transition::Completed { rep }) => {
                        tracing::info!(rep, angle, "squat completed");
                    }
                    None => {}
                }
                self.subject.observe(&mut self.state, detections);
                self.result(Some(angle), transition, None)
            }
            Err(e) => {
                tracing::debug!(error = %e, "frame skipped");
                self.result(None, None, Some(e))
            }
        }
    }

    /// セッションを初期状態に戻す
    pub fn reset_session(&mut self) {
        tracing::info!(reps = self.state.reps_completed, "session reset");
        self.state = RepCounterState::new();
    }

    fn result(
        &self,
        knee_angle: Option<f32>,
        transition: Option<Transition>,
        skipped: Option<CounterError>,
    ) -> FrameResult {
        FrameResult {
            reps_completed: self.state.reps_completed,
            is_squatting: self.state.is_squatting,
            current_tracked_points: self.state.current_tracked_points().to_vec(),
            knee_angle,
            transition,
            skipped,
        }
    }
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
