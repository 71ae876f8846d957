//! Property tests over limits, filtering, gating and pattern bounds.

use proptest::prelude::*;
use turret_common::control_unit::config::TurretConfig;
use turret_common::control_unit::state::ScanMode;
use turret_common::types::{AxisId, Classification, Detection};
use turret_control_unit::motion::MotionController;
use turret_control_unit::safety::{InterlockError, SafetyInterlock};
use turret_control_unit::scan::{ScanParams, ScanState};
use turret_control_unit::tracking::{ScoreWeights, best_candidate};

fn angle_outside(min: f64, max: f64) -> impl Strategy<Value = f64> {
    prop_oneof![(min - 1000.0)..(min - 0.001), (max + 0.001)..(max + 1000.0)]
}

proptest! {
    #[test]
    fn out_of_range_commands_rejected_and_target_kept(angle in angle_outside(0.0, 300.0)) {
        let cfg = TurretConfig::default();
        let mut interlock = SafetyInterlock::new(&cfg, 0.0);
        let mut motion = MotionController::new(&cfg, MotionController::home(&cfg));
        let before = motion.target();

        let result = interlock.validate_target(AxisId::Pan, angle);
        let rejected = matches!(result, Err(InterlockError::OutOfRange { .. }));
        prop_assert!(rejected);
        prop_assert_eq!(motion.target(), before);

        // The autonomous path clamps instead.
        motion.set_target(AxisId::Pan, angle, 10.0).unwrap();
        let t = motion.target().pan_angle;
        prop_assert!((0.0..=300.0).contains(&t));
    }

    #[test]
    fn jitter_within_tolerance_and_interval_ignored(
        deltas in prop::collection::vec(-0.5f64..0.5, 1..20),
    ) {
        let cfg = TurretConfig::default();
        let mut motion = MotionController::new(&cfg, MotionController::home(&cfg));
        motion.set_target(AxisId::Tilt, 30.0, 0.0).unwrap();
        // Spaced 4 ms apart, all inside the 100 ms minimum interval.
        for (i, d) in deltas.iter().enumerate() {
            let accepted = motion
                .set_target(AxisId::Tilt, 30.0 + d, 0.004 * (i + 1) as f64)
                .unwrap();
            prop_assert!(!accepted);
            prop_assert_eq!(motion.target().tilt_angle, 30.0);
        }
    }

    #[test]
    fn fire_always_off_inside_no_fire_zone(
        lo in 0.0f64..250.0,
        width in 0.0f64..50.0,
        frac in 0.0f64..=1.0,
    ) {
        let mut cfg = TurretConfig::default();
        let hi = lo + width;
        cfg.safety.no_fire_zone = Some([lo, hi]);
        let mut interlock = SafetyInterlock::new(&cfg, 0.0);
        let pan = lo + frac * width;
        prop_assert!(!interlock.gate_fire(true, pan));
    }

    #[test]
    fn spiral_never_leaves_limits(ticks in 1usize..5000) {
        let params = ScanParams::from(&TurretConfig::default());
        let mut state = ScanState::initial(ScanMode::Spiral, &params).unwrap();
        let mut radius_before = 0.0;
        for _ in 0..ticks {
            let (pose, completed) = state.step(0.01, &params);
            prop_assert!(params.pan.contains(pose.pan_angle));
            prop_assert!(params.tilt.contains(pose.tilt_angle));
            let ScanState::Spiral { radius, .. } = state else { unreachable!() };
            prop_assert!(radius <= params.spiral_max_radius);
            if completed {
                prop_assert_eq!(radius, 0.0);
            } else {
                prop_assert!(radius >= radius_before);
            }
            radius_before = radius;
        }
    }

    #[test]
    fn selection_is_deterministic_and_enemy_only(
        dets in prop::collection::vec(
            (0u32..50, 0u8..3, 0.0f64..640.0, 0.0f64..480.0, 0.0f64..1.0),
            0..20,
        ),
    ) {
        let dets: Vec<Detection> = dets
            .into_iter()
            .map(|(id, class, x, y, size)| {
                let classification = match class {
                    0 => Classification::Enemy,
                    1 => Classification::Friendly,
                    _ => Classification::Unknown,
                };
                Detection::new(id, classification, x, y, size)
            })
            .collect();
        let weights = ScoreWeights::from(&TurretConfig::default());

        let first = best_candidate(&dets, &weights).map(|(d, s)| (d.id, s));
        let mut reversed = dets.clone();
        reversed.reverse();
        let second = best_candidate(&reversed, &weights).map(|(d, s)| (d.id, s));

        prop_assert_eq!(first.map(|(_, s)| s), second.map(|(_, s)| s));
        if let Some((id, _)) = first {
            let best = dets.iter().find(|d| d.id == id && d.is_enemy());
            prop_assert!(best.is_some());
        } else {
            prop_assert!(dets.iter().all(|d| !d.is_enemy()));
        }
    }
}
