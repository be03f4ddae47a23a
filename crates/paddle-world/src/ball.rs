use image::{GrayImage, RgbImage};
use nalgebra::{Vector2, Vector4};
use paddle_core::{BallSighting, Detection, Intersection, TrackerSettings};
use paddle_vision::{ColorSegmenter, ShapeDetector};
use serde::Serialize;

use crate::{
    aim::{aim_paddle, PaddleTarget},
    filter::{EstimatorState, Kalman, KalmanBuilder},
    history::PositionHistory,
    trajectory::{FitError, TrajectoryModel, TrajectoryPredictor},
};

/// Everything the tracker worked out for one frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameReport {
    pub sighting: Option<BallSighting>,
    pub intersection: Option<Intersection>,
    pub target: Option<PaddleTarget>,
}

/// Tracker for the ball.
///
/// Owns the whole per-ball pipeline: segmentation, detection, the Kalman filter, the
/// position history and the trajectory fit. Track several balls with several trackers.
pub struct BallTracker {
    segmenter: ColorSegmenter,
    detector: ShapeDetector,
    filter: Kalman<2, 4>,
    /// Filter state, laid out as (x, vx, y, vy). `None` until the ball is first detected.
    state: Option<EstimatorState<4>>,
    /// Radius of the last ball actually seen in a frame
    last_radius: Option<i32>,
    history: PositionHistory,
    predictor: TrajectoryPredictor,
    /// Width of the last processed frame
    frame_width: Option<i32>,
    settings: TrackerSettings,
}

impl BallTracker {
    /// Create a new BallTracker.
    pub fn new(settings: &TrackerSettings) -> BallTracker {
        BallTracker {
            segmenter: ColorSegmenter::new(settings),
            detector: ShapeDetector::new(settings),
            filter: Self::filter_builder(settings).build_2d(),
            state: None,
            last_radius: None,
            history: PositionHistory::new(settings.history_capacity),
            predictor: TrajectoryPredictor::new(settings.min_fit_points),
            frame_width: None,
            settings: settings.clone(),
        }
    }

    fn filter_builder(settings: &TrackerSettings) -> KalmanBuilder {
        KalmanBuilder::new(
            settings.init_var,
            settings.measurement_var,
            settings.unit_transition_var,
        )
    }

    pub fn update_settings(&mut self, settings: &TrackerSettings) {
        self.segmenter.update_settings(settings);
        self.detector.update_settings(settings);
        Self::filter_builder(settings).update(&mut self.filter);
        self.history.set_capacity(settings.history_capacity);
        self.predictor.set_min_points(settings.min_fit_points);
        self.settings = settings.clone();
    }

    /// Whether the ball has been detected at least once
    pub fn is_init(&self) -> bool {
        self.state.is_some()
    }

    /// Forget the ball: the filter, the history and the fitted trajectory.
    pub fn reset(&mut self) {
        self.state = None;
        self.last_radius = None;
        self.history.clear();
        self.predictor = TrajectoryPredictor::new(self.settings.min_fit_points);
    }

    /// Update the tracker with a new frame.
    ///
    /// The full-frame detector sees the blurred mask, the re-acquisition window the
    /// unblurred one.
    pub fn update(&mut self, frame: &RgbImage) -> Option<BallSighting> {
        let cleaned = self.segmenter.clean(frame);
        let smoothed = self.segmenter.smooth(&cleaned);
        self.track(&smoothed, &cleaned)
    }

    /// Update the tracker with an already segmented frame.
    pub fn update_with_mask(&mut self, mask: &GrayImage) -> Option<BallSighting> {
        self.track(mask, mask)
    }

    fn track(&mut self, detect_mask: &GrayImage, roi_mask: &GrayImage) -> Option<BallSighting> {
        self.frame_width = Some(detect_mask.width() as i32);

        let measured = self.detector.detect(detect_mask);
        let sighting = self.step(roi_mask, measured);
        if let Some(sighting) = &sighting {
            self.history.push(sighting.detection().position());
        }
        sighting
    }

    fn step(
        &mut self,
        roi_mask: &GrayImage,
        measured: Option<Detection>,
    ) -> Option<BallSighting> {
        let sighting = match (self.state.take(), measured) {
            (None, None) => return None,
            (None, Some(detection)) => {
                log::debug!("Ball tracker received first detection");
                let state = self.filter.init(Vector4::new(
                    detection.x as f64,
                    0.0,
                    detection.y as f64,
                    0.0,
                ));
                self.state = Some(self.correct(state, &detection));
                self.last_radius = Some(detection.radius);
                BallSighting::Measured(detection)
            }
            (Some(state), Some(detection)) => {
                let predicted = self.filter.predict(state, 1.0);
                self.state = Some(self.correct(predicted, &detection));
                self.last_radius = Some(detection.radius);
                BallSighting::Measured(detection)
            }
            (Some(state), None) => {
                let predicted = self.filter.predict(state, 1.0);
                let position = self.filter.observe(&predicted);
                match self.detector.search_roi(roi_mask, (position.x, position.y)) {
                    Some(detection) => {
                        log::debug!(
                            "Ball re-acquired near ({:.0}, {:.0})",
                            position.x,
                            position.y
                        );
                        self.state = Some(self.correct(predicted, &detection));
                        self.last_radius = Some(detection.radius);
                        BallSighting::Recovered(detection)
                    }
                    None => {
                        self.state = Some(predicted);
                        BallSighting::Predicted(Detection::new(
                            position.x.round() as i32,
                            position.y.round() as i32,
                            self.last_radius.unwrap_or(self.settings.default_radius),
                        ))
                    }
                }
            }
        };

        if self.state.as_ref().is_some_and(|s| s.is_finite()) {
            Some(sighting)
        } else {
            log::warn!("Ball filter diverged, dropping track");
            self.reset();
            None
        }
    }

    fn correct(&self, state: EstimatorState<4>, detection: &Detection) -> EstimatorState<4> {
        let z = Vector2::new(detection.x as f64, detection.y as f64);
        match self.filter.correct(&state, z) {
            Some(corrected) => corrected,
            None => {
                log::warn!("Singular innovation covariance, keeping prediction");
                state
            }
        }
    }

    /// Recent positions, oldest first.
    pub fn positions(&self) -> Vec<(i32, i32)> {
        self.history.positions()
    }

    /// Filtered position, if the ball is being tracked.
    pub fn position(&self) -> Option<Vector2<f64>> {
        self.state.as_ref().map(|s| Vector2::new(s.x[0], s.x[2]))
    }

    /// Filtered velocity in px/frame, if the ball is being tracked.
    pub fn velocity(&self) -> Option<Vector2<f64>> {
        self.state.as_ref().map(|s| Vector2::new(s.x[1], s.x[3]))
    }

    /// Fit a trajectory to the current history.
    pub fn fit_trajectory(&mut self) -> Result<&TrajectoryModel, FitError> {
        self.predictor.fit_trajectory(&self.history.positions())
    }

    /// Where the last fitted trajectory crosses `y_level`.
    pub fn predict_intersection(&self, y_level: f64) -> Option<Intersection> {
        self.predictor.predict_intersection(y_level, self.clamp_width())
    }

    pub fn predict_position(&self, steps_ahead: f64) -> Option<(i32, i32)> {
        self.predictor.predict_position(steps_ahead)
    }

    fn clamp_width(&self) -> i32 {
        self.frame_width.unwrap_or(self.settings.clamp_width)
    }

    /// Run a full cycle on `frame` and decide where the paddle at `paddle_y` should go.
    pub fn process(&mut self, frame: &RgbImage, paddle_y: f64) -> FrameReport {
        let sighting = self.update(frame);
        self.report(sighting, paddle_y)
    }

    /// Same as [`BallTracker::process`] for an already segmented frame.
    pub fn process_mask(&mut self, mask: &GrayImage, paddle_y: f64) -> FrameReport {
        let sighting = self.update_with_mask(mask);
        self.report(sighting, paddle_y)
    }

    fn report(&mut self, sighting: Option<BallSighting>, paddle_y: f64) -> FrameReport {
        let Some(sighting) = sighting else {
            return FrameReport::default();
        };

        let intersection = match self.fit_trajectory() {
            Ok(_) => self.predict_intersection(paddle_y),
            Err(_) => None,
        };
        let target = aim_paddle(
            sighting.detection().x,
            intersection.as_ref(),
            self.clamp_width(),
            self.settings.max_lead_frames,
        );

        FrameReport {
            sighting: Some(sighting),
            intersection,
            target: Some(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use image::{Luma, Rgb};
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    use super::*;

    const ON: Luma<u8> = Luma([255]);

    fn mask_with_ball(x: i32, y: i32, radius: i32) -> GrayImage {
        let mut mask = GrayImage::new(640, 480);
        draw_filled_circle_mut(&mut mask, (x, y), radius, ON);
        mask
    }

    fn empty_mask() -> GrayImage {
        GrayImage::new(640, 480)
    }

    #[test]
    fn test_no_ball() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        assert!(tracker.update_with_mask(&empty_mask()).is_none());
        assert!(!tracker.is_init());
        assert!(tracker.positions().is_empty());
    }

    #[test]
    fn test_first_detection_initializes() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        let sighting = tracker.update_with_mask(&mask_with_ball(100, 120, 12)).unwrap();

        assert!(matches!(sighting, BallSighting::Measured(_)));
        assert!(tracker.is_init());
        let d = sighting.detection();
        assert!((d.x - 100).abs() <= 1 && (d.y - 120).abs() <= 1);
        assert_eq!(tracker.velocity().unwrap(), Vector2::zeros());
        assert_eq!(tracker.positions(), vec![d.position()]);
    }

    #[test]
    fn test_extrapolates_through_missed_frames() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for i in 0..5 {
            let sighting = tracker.update_with_mask(&mask_with_ball(100 + 10 * i, 100, 12));
            assert!(matches!(sighting, Some(BallSighting::Measured(_))));
        }

        let first = tracker.update_with_mask(&empty_mask()).unwrap();
        let second = tracker.update_with_mask(&empty_mask()).unwrap();

        let BallSighting::Predicted(first) = first else {
            panic!("expected a prediction, got {:?}", first);
        };
        let BallSighting::Predicted(second) = second else {
            panic!("expected a prediction, got {:?}", second);
        };
        assert!((first.x - 150).abs() <= 2, "x {}", first.x);
        assert!((first.y - 100).abs() <= 2, "y {}", first.y);
        assert!((second.x - 160).abs() <= 2, "x {}", second.x);
        assert!((second.y - 100).abs() <= 2, "y {}", second.y);
        assert!((first.radius - 12).abs() <= 1);

        let positions = tracker.positions();
        assert_eq!(positions.len(), 7);
        assert_eq!(positions[5], first.position());
        assert_eq!(positions[6], second.position());
    }

    #[test]
    fn test_recovers_irregular_blob_near_prediction() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for i in 0..5 {
            tracker.update_with_mask(&mask_with_ball(200 + 10 * i, 200, 12));
        }

        // A smeared ball that fails the roundness check
        let mut mask = empty_mask();
        draw_filled_rect_mut(&mut mask, Rect::at(236, 198).of_size(28, 5), ON);
        let sighting = tracker.update_with_mask(&mask).unwrap();
        let BallSighting::Recovered(d) = sighting else {
            panic!("expected a recovery, got {:?}", sighting);
        };
        assert!((d.x - 249).abs() <= 1);
        assert!((d.y - 200).abs() <= 1);
    }

    #[test]
    fn test_ignores_blob_outside_search_window() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for i in 0..5 {
            tracker.update_with_mask(&mask_with_ball(200 + 10 * i, 200, 12));
        }

        let mut mask = empty_mask();
        draw_filled_rect_mut(&mut mask, Rect::at(500, 400).of_size(28, 5), ON);
        let sighting = tracker.update_with_mask(&mask).unwrap();
        assert!(matches!(sighting, BallSighting::Predicted(_)));
    }

    #[test]
    fn test_default_radius_without_measurement() {
        let settings = TrackerSettings {
            default_radius: 7,
            ..Default::default()
        };
        let mut tracker = BallTracker::new(&settings);
        assert_eq!(tracker.last_radius, None);
        tracker.state = Some(tracker.filter.init(Vector4::new(50.0, 1.0, 60.0, 0.0)));

        let sighting = tracker.update_with_mask(&empty_mask()).unwrap();
        assert_eq!(sighting, BallSighting::Predicted(Detection::new(51, 60, 7)));
    }

    #[test]
    fn test_history_is_capped() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for i in 0..15 {
            tracker.update_with_mask(&mask_with_ball(50 + 10 * i, 100, 12));
        }
        let positions = tracker.positions();
        assert_eq!(positions.len(), 10);
        assert!((positions[0].0 - 100).abs() <= 1);
    }

    #[test]
    fn test_reset() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        tracker.update_with_mask(&mask_with_ball(100, 100, 12));
        tracker.reset();
        assert!(!tracker.is_init());
        assert!(tracker.positions().is_empty());
        assert!(tracker.update_with_mask(&empty_mask()).is_none());
    }

    #[test]
    fn test_fit_needs_history() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for i in 0..4 {
            tracker.update_with_mask(&mask_with_ball(100 + 10 * i, 100, 12));
        }
        assert!(matches!(
            tracker.fit_trajectory(),
            Err(FitError::InsufficientPoints { got: 4, .. })
        ));
        assert!(tracker.predict_intersection(400.0).is_none());
    }

    #[test]
    fn test_process_predicts_crossing() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        let mut report = FrameReport::default();
        for t in 0..6 {
            let y = 100 + 20 * t + 2 * t * t;
            report = tracker.process_mask(&mask_with_ball(300 + 5 * t, y, 12), 400.0);
        }

        let hit = report.intersection.expect("no intersection");
        // 2t² + 20t + 100 = 400 at t ≈ 8.23, now = 5
        assert_abs_diff_eq!(hit.time_to_intersect, 3.23, epsilon = 0.2);
        assert!((hit.x - 341).abs() <= 2, "x {}", hit.x);
        assert_eq!(report.target, Some(PaddleTarget::Intercept(hit.x)));
    }

    #[test]
    fn test_process_follows_without_fit() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        let report = tracker.process_mask(&mask_with_ball(300, 100, 12), 400.0);
        assert!(report.intersection.is_none());
        let x = report.sighting.unwrap().detection().x;
        assert_eq!(report.target, Some(PaddleTarget::Follow(x)));

        let report = tracker.process_mask(&empty_mask(), 400.0);
        assert!(report.sighting.is_some());
    }

    #[test]
    fn test_process_color_frame() {
        let mut frame = RgbImage::from_pixel(320, 240, Rgb([30, 30, 160]));
        draw_filled_circle_mut(&mut frame, (160, 120), 15, Rgb([255, 210, 0]));

        let mut tracker = BallTracker::new(&TrackerSettings::default());
        let report = tracker.process(&frame, 200.0);
        let d = *report.sighting.expect("ball not found").detection();
        assert!((d.x - 160).abs() <= 2);
        assert!((d.y - 120).abs() <= 2);
        // Dilation and blur widen the blob by a few pixels
        assert!((15..=20).contains(&d.radius), "r {}", d.radius);
    }

    #[test]
    fn test_roi_search_uses_unblurred_mask() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for i in 0..5 {
            tracker.update_with_mask(&mask_with_ball(200 + 10 * i, 200, 12));
        }

        let mut smeared = empty_mask();
        draw_filled_rect_mut(&mut smeared, Rect::at(236, 198).of_size(28, 5), ON);
        let sighting = tracker.track(&smeared, &empty_mask()).unwrap();
        assert!(matches!(sighting, BallSighting::Predicted(_)));

        let sighting = tracker.track(&empty_mask(), &smeared).unwrap();
        assert!(matches!(sighting, BallSighting::Recovered(_)));
    }

    #[test]
    fn test_diverged_filter_drops_track() {
        let settings = TrackerSettings {
            init_var: 1e308,
            ..Default::default()
        };
        let mut tracker = BallTracker::new(&settings);

        let mut dropped = false;
        for i in 0..3 {
            if tracker.update_with_mask(&mask_with_ball(100 + 10 * i, 100, 12)).is_none() {
                dropped = true;
                break;
            }
        }
        assert!(dropped, "covariance never overflowed");
        assert!(!tracker.is_init());
        assert!(tracker.positions().is_empty());
        assert!(tracker.position().is_none());
    }

    #[test]
    fn test_singular_innovation_keeps_prediction() {
        let settings = TrackerSettings {
            init_var: 0.0,
            measurement_var: 0.0,
            unit_transition_var: 0.0,
            ..Default::default()
        };
        let mut tracker = BallTracker::new(&settings);

        let first = tracker.update_with_mask(&mask_with_ball(100, 100, 12)).unwrap();
        assert!(matches!(first, BallSighting::Measured(_)));
        let d = *first.detection();
        assert_eq!(tracker.position(), Some(Vector2::new(d.x as f64, d.y as f64)));

        // Zero velocity and zero covariance: the prediction stays put and wins
        let second = tracker.update_with_mask(&mask_with_ball(130, 110, 12)).unwrap();
        assert!(matches!(second, BallSighting::Measured(_)));
        assert!((second.detection().x - 130).abs() <= 1);
        assert_eq!(tracker.position(), Some(Vector2::new(d.x as f64, d.y as f64)));
        assert_eq!(tracker.velocity(), Some(Vector2::zeros()));
        assert_eq!(tracker.positions().len(), 2);
    }

    #[test]
    fn test_update_settings() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for i in 0..6 {
            tracker.update_with_mask(&mask_with_ball(100 + 10 * i, 100, 12));
        }
        assert_eq!(tracker.positions().len(), 6);

        let settings = TrackerSettings {
            history_capacity: 3,
            max_radius: 8.0,
            ..Default::default()
        };
        tracker.update_settings(&settings);
        let positions = tracker.positions();
        assert_eq!(positions.len(), 3);
        assert!((positions[0].0 - 130).abs() <= 1);

        // Too large for the full-frame check now, still found by the window search
        let sighting = tracker.update_with_mask(&mask_with_ball(160, 100, 12)).unwrap();
        assert!(matches!(sighting, BallSighting::Recovered(_)));
        assert_eq!(tracker.positions().len(), 3);
    }

    #[test]
    fn test_predict_position() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        assert!(tracker.predict_position(1.0).is_none());
        for t in 0..5 {
            tracker.update_with_mask(&mask_with_ball(100 + 10 * t, 50 + 20 * t, 12));
        }
        tracker.fit_trajectory().unwrap();

        let (x, y) = tracker.predict_position(1.0).unwrap();
        assert!((x - 150).abs() <= 2, "x {}", x);
        assert!((y - 150).abs() <= 2, "y {}", y);
    }

    #[test]
    fn test_intersection_clamped_to_frame_width() {
        let mut tracker = BallTracker::new(&TrackerSettings::default());
        for t in 0..5 {
            let mut mask = GrayImage::new(320, 480);
            draw_filled_circle_mut(&mut mask, (200 + 25 * t, 100 + 30 * t + 5 * t * t), 12, ON);
            tracker.update_with_mask(&mask);
        }
        tracker.fit_trajectory().unwrap();
        let hit = tracker.predict_intersection(470.0).unwrap();
        assert!((0..=320).contains(&hit.x));
    }
}
