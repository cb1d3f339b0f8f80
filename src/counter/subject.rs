use crate::config::SubjectConfig;
use crate::detection::Detection;
use crate::geometry::Rect;

use super::state::RepCounterState;

/// 最大の人物BBoxを保持し、しゃがみ中はその中心を記録する
#[derive(Debug, Clone)]
pub struct SubjectTracker {
    label: String,
    min_score: f32,
}

impl SubjectTracker {
    pub fn new(label: impl Into<String>, min_score: f32) -> Self {
        Self {
            label: label.into(),
            min_score,
        }
    }

    pub fn from_config(config: &SubjectConfig) -> Self {
        Self::new(config.label.clone(), config.min_score)
    }

    /// フレーム内で面積最大の候補。同面積なら先に現れたもの
    pub fn largest_candidate(&self, detections: &[Detection]) -> Option<Rect> {
        detections
            .iter()
            .filter(|d| d.label == self.label && d.score >= self.min_score)
            .map(|d| d.rect)
            .fold(None, |best: Option<Rect>, rect| match best {
                Some(b) if b.area() >= rect.area() => Some(b),
                _ => Some(rect),
            })
    }

    /// 1フレーム分の検出で状態を更新。BBoxが更新されたらtrue
    pub fn observe(&self, state: &mut RepCounterState, detections: &[Detection]) -> bool {
        let Some(candidate) = self.largest_candidate(detections) else {
            return false;
        };

        let grew = match state.largest_box_seen {
            Some(current) => candidate.area() > current.area(),
            None => true,
        };
        if grew {
            tracing::debug!(
                width = candidate.width,
                height = candidate.height,
                area = candidate.area(),
                "largest subject box updated"
            );
            state.largest_box_seen = Some(candidate);
        }

        if state.is_squatting {
            if let Some(largest) = state.largest_box_seen {
                let rep = state.current_rep();
                state
                    .tracked_points
                    .entry(rep)
                    .or_default()
                    .push(largest.center());
            }
        }
        grew
    }
}

impl Default for SubjectTracker {
    fn default() -> Self {
        Self::from_config(&SubjectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;

    fn person(score: f32, w: f32, h: f32) -> Detection {
        Detection::new("person", score, Rect::new(0.0, 0.0, w, h))
    }

    #[test]
    fn test_largest_box_monotonic() {
        let tracker = SubjectTracker::default();
        let mut state = RepCounterState::new();

        assert!(tracker.observe(&mut state, &[person(0.9, 10.0, 10.0)]));
        assert!(!tracker.observe(&mut state, &[person(0.9, 5.0, 10.0)]));
        assert!(tracker.observe(&mut state, &[person(0.9, 10.0, 20.0)]));
        assert_eq!(state.largest_box_seen, Some(Rect::new(0.0, 0.0, 10.0, 20.0)));

        assert!(!tracker.observe(&mut state, &[person(0.9, 10.0, 15.0)]));
        assert_eq!(state.largest_box_seen, Some(Rect::new(0.0, 0.0, 10.0, 20.0)));
    }

    #[test]
    fn test_equal_area_does_not_replace() {
        let tracker = SubjectTracker::default();
        let mut state = RepCounterState::new();
        tracker.observe(&mut state, &[person(0.9, 10.0, 10.0)]);

        let same_area = Detection::new("person", 0.9, Rect::new(50.0, 50.0, 20.0, 5.0));
        assert!(!tracker.observe(&mut state, &[same_area]));
        assert_eq!(state.largest_box_seen, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_candidates_filtered() {
        let tracker = SubjectTracker::default();
        let mut state = RepCounterState::new();
        let detections = [
            person(0.59, 100.0, 100.0),
            Detection::new("chair", 0.99, Rect::new(0.0, 0.0, 100.0, 100.0)),
        ];
        assert!(!tracker.observe(&mut state, &detections));
        assert!(state.largest_box_seen.is_none());

        assert!(tracker.observe(&mut state, &[person(0.6, 1.0, 1.0)]));
    }

    #[test]
    fn test_per_frame_reduction_tie_keeps_first() {
        let tracker = SubjectTracker::default();
        let a = Detection::new("person", 0.9, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = Detection::new("person", 0.9, Rect::new(100.0, 0.0, 10.0, 10.0));
        let c = Detection::new("person", 0.9, Rect::new(200.0, 0.0, 5.0, 5.0));
        assert_eq!(tracker.largest_candidate(&[c.clone(), a.clone(), b.clone()]), Some(a.rect));
        assert_eq!(tracker.largest_candidate(&[b.clone(), a]), Some(b.rect));
    }

    #[test]
    fn test_records_center_only_while_squatting() {
        let tracker = SubjectTracker::default();
        let mut state = RepCounterState::new();

        tracker.observe(&mut state, &[person(0.9, 10.0, 20.0)]);
        assert!(state.tracked_points.is_empty());

        state.is_squatting = true;
        tracker.observe(&mut state, &[person(0.9, 4.0, 4.0)]);
        tracker.observe(&mut state, &[person(0.9, 4.0, 4.0)]);
        // 小さいBBoxでも記録されるのは最大BBoxの中心
        assert_eq!(state.tracked_points[&1], vec![Point2::new(5.0, 10.0); 2]);
    }

    #[test]
    fn test_no_person_no_change() {
        let tracker = SubjectTracker::default();
        let mut state = RepCounterState::new();
        state.is_squatting = true;
        tracker.observe(&mut state, &[person(0.9, 10.0, 10.0)]);
        let before = state.clone();

        assert!(!tracker.observe(&mut state, &[]));
        assert_eq!(state, before);
    }
}
