use serde::Serialize;

use crate::config::CounterConfig;

use super::state::RepCounterState;

/// 状態遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Standing → Squatting。`rep` は開始したレップ番号
    Descended { rep: u32 },
    /// Squatting → Standing。`rep` は完了したレップ番号
    Completed { rep: u32 },
}

/// しゃがみ/立ち上がりのヒステリシス判定
///
/// 目標角度±許容幅に入ったらしゃがみ開始、`stand_angle` 以上で立ち上がり。
/// 2つの閾値の間は不感帯で、状態は変わらない。
#[derive(Debug, Clone, Copy)]
pub struct SquatStateMachine {
    target_angle: f32,
    tolerance: f32,
    stand_angle: f32,
}

impl SquatStateMachine {
    pub fn new(target_angle: f32, tolerance: f32, stand_angle: f32) -> Self {
        Self {
            target_angle,
            tolerance,
            stand_angle,
        }
    }

    pub fn from_config(config: &CounterConfig) -> Self {
        Self::new(config.target_angle, config.tolerance, config.stand_angle)
    }

    fn in_squat_band(&self, angle: f32) -> bool {
        (angle - self.target_angle).abs() <= self.tolerance
    }

    /// 1フレーム分の代表角度で状態を更新
    pub fn step(&self, state: &mut RepCounterState, angle: f32) -> Option<Transition> {
        if !state.is_squatting && self.in_squat_band(angle) {
            state.is_squatting = true;
            let rep = state.current_rep();
            state.tracked_points.insert(rep, Vec::new());
            Some(Transition::Descended { rep })
        } else if state.is_squatting && angle >= self.stand_angle {
            state.is_squatting = false;
            state.reps_completed += 1;
            Some(Transition::Completed {
                rep: state.reps_completed,
            })
        } else {
            None
        }
    }
}

impl Default for SquatStateMachine {
    fn default() -> Self {
        Self::from_config(&CounterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;

    fn run(machine: &SquatStateMachine, state: &mut RepCounterState, angles: &[f32]) -> Vec<Option<Transition>> {
        angles.iter().map(|&a| machine.step(state, a)).collect()
    }

    #[test]
    fn test_single_rep() {
        let machine = SquatStateMachine::default();
        let mut state = RepCounterState::new();
        let transitions = run(&machine, &mut state, &[180.0, 90.0, 90.0, 90.0, 180.0]);

        assert_eq!(
            transitions,
            vec![
                None,
                Some(Transition::Descended { rep: 1 }),
                None,
                None,
                Some(Transition::Completed { rep: 1 }),
            ]
        );
        assert_eq!(state.reps_completed, 1);
        assert!(!state.is_squatting);
    }

    #[test]
    fn test_deadband_oscillation_while_squatting() {
        let machine = SquatStateMachine::default();
        let mut state = RepCounterState::new();
        machine.step(&mut state, 90.0);
        assert!(state.is_squatting);

        let transitions = run(&machine, &mut state, &[91.0, 89.0, 92.0, 88.0]);
        assert!(transitions.iter().all(Option::is_none));
        assert_eq!(state.reps_completed, 0);
        assert!(state.is_squatting);
    }

    #[test]
    fn test_deadband_does_not_complete() {
        let machine = SquatStateMachine::default();
        let mut state = RepCounterState::new();
        run(&machine, &mut state, &[90.0, 120.0, 139.9, 101.0]);
        assert_eq!(state.reps_completed, 0);
        assert!(state.is_squatting);
    }

    #[test]
    fn test_band_edges_inclusive() {
        let machine = SquatStateMachine::default();

        let mut state = RepCounterState::new();
        assert!(machine.step(&mut state, 100.0).is_some());

        let mut state = RepCounterState::new();
        assert!(machine.step(&mut state, 80.0).is_some());

        let mut state = RepCounterState::new();
        assert!(machine.step(&mut state, 100.5).is_none());

        let mut state = RepCounterState::new();
        machine.step(&mut state, 90.0);
        assert_eq!(machine.step(&mut state, 140.0), Some(Transition::Completed { rep: 1 }));
    }

    #[test]
    fn test_standing_ignores_stand_angle() {
        let machine = SquatStateMachine::default();
        let mut state = RepCounterState::new();
        let transitions = run(&machine, &mut state, &[170.0, 150.0, 180.0]);
        assert!(transitions.iter().all(Option::is_none));
        assert_eq!(state.reps_completed, 0);
    }

    #[test]
    fn test_descend_opens_fresh_bucket() {
        let machine = SquatStateMachine::default();
        let mut state = RepCounterState::new();
        state.tracked_points.insert(1, vec![Point2::new(1.0, 1.0)]);

        machine.step(&mut state, 90.0);
        assert!(state.tracked_points[&1].is_empty());
    }

    #[test]
    fn test_reps_non_decreasing() {
        let machine = SquatStateMachine::default();
        let mut state = RepCounterState::new();
        let angles = [180.0, 85.0, 150.0, 95.0, 60.0, 145.0, 90.0, 130.0, 90.0, 170.0, 0.0];
        let mut prev = 0;
        for &a in &angles {
            machine.step(&mut state, a);
            assert!(state.reps_completed >= prev);
            prev = state.reps_completed;
        }
        assert_eq!(state.reps_completed, 3);
    }
}
