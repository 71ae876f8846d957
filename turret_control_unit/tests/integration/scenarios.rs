//! End-to-end scenarios: selection, loss and resume, binary frames, engagement.

use turret_common::control_unit::error::InterlockFlags;
use turret_common::control_unit::state::{ControlAuthority, ScanMode};
use turret_common::types::{Classification, Detection, Pose};
use turret_control_unit::scan::ScanState;

use super::harness::{DT, Rig, enemy, enemy_at_distance, quiet_config};

#[test]
fn larger_target_wins_over_centered_one() {
    let mut rig = Rig::quiet();
    rig.ticks(10);
    rig.publish(&[enemy_at_distance(2, 0.3, 0.0), enemy_at_distance(1, 0.8, 0.1)]);
    rig.tick();

    let lock = rig.runner.tracker().lock().expect("locked");
    assert_eq!(lock.detection_id, 1);
    assert!((lock.score - 0.83).abs() < 1e-9);
    assert_eq!(rig.runner.scan().mode(), ScanMode::Tracking);
}

#[test]
fn friendly_and_unknown_never_tracked() {
    let mut rig = Rig::quiet();
    let dets = [
        Detection::new(1, Classification::Friendly, 320.0, 240.0, 0.9),
        Detection::new(2, Classification::Unknown, 320.0, 240.0, 0.9),
    ];
    rig.track_for(&dets, 300);
    assert!(rig.runner.tracker().lock().is_none());
    assert_eq!(rig.runner.scan().mode(), ScanMode::Sweep);
    assert_eq!(rig.sim.snapshot().laser_on_frames, 0);
}

#[test]
fn lost_target_resumes_scan_at_saved_phase() {
    let mut rig = Rig::quiet();
    rig.ticks(300);
    let saved = *rig.runner.scan().phase();
    let ScanState::Sweep {
        position: saved_pos,
        ..
    } = saved
    else {
        panic!("expected sweep phase, got {saved:?}");
    };

    rig.publish(&[enemy(7, 500.0, 100.0, 0.4)]);
    rig.tick();
    assert_eq!(rig.runner.scan().mode(), ScanMode::Tracking);

    // Coast, then expire after target_lost_timeout (3 s).
    let mut resumed_after = None;
    for i in 0..400 {
        rig.tick();
        if rig.runner.scan().mode() == ScanMode::Sweep {
            resumed_after = Some(i);
            break;
        }
        assert_eq!(*rig.runner.scan().phase(), saved, "phase frozen while tracking");
    }
    let ticks = resumed_after.expect("scan resumed");
    assert!((295..=305).contains(&ticks), "resumed after {ticks} ticks");
    assert!(rig.runner.tracker().lock().is_none());

    // The resume tick emitted the saved pose and advanced one step.
    let ScanState::Sweep { position, .. } = *rig.runner.scan().phase() else {
        panic!("expected sweep phase");
    };
    let step = rig.runner.config().scan.scan_speed * DT;
    assert!((position - (saved_pos + step)).abs() < 1e-6);
}

#[test]
fn binary_stepper_frame_sets_pan_target() {
    let mut rig = Rig::quiet();
    rig.peer.send(&[0xAA, 0x02, 200, 0x55]);
    rig.tick();
    assert!(rig.peer.take_replies().is_empty());
    assert_eq!(rig.runner.motion().target().pan_angle, 200.0);
    assert_eq!(rig.runner.authority(), ControlAuthority::Manual);

    rig.ticks(600);
    let pan = rig.sim.pan_angle().expect("initialized");
    assert!((pan - 200.0).abs() <= 1.8, "simulated pan {pan}");
}

#[test]
fn binary_frame_split_across_ticks() {
    let mut rig = Rig::quiet();
    rig.peer.send(&[0xAA, 0x01]);
    rig.tick();
    rig.peer.send(&[45, 0x55]);
    rig.tick();
    assert_eq!(rig.runner.motion().target().tilt_angle, 45.0);
}

#[test]
fn engages_after_dwell_when_settled() {
    let mut rig = Rig::quiet();
    let target = [enemy(3, 320.0, 240.0, 0.5)];
    rig.track_for(&target, 100);
    assert!(!rig.runner.last_frame().fire, "dwell not elapsed");

    rig.track_for(&target, 700);
    let t = rig.runner.telemetry();
    assert_eq!(t.locked_target, Some(3));
    assert!((t.pan_angle - 150.0).abs() <= 0.5);
    assert!((t.tilt_angle - 30.0).abs() <= 0.5);
    assert!(t.fire_output);
    assert!(rig.sim.snapshot().laser);
}

#[test]
fn no_fire_zone_suppresses_engagement() {
    let mut cfg = quiet_config();
    cfg.safety.no_fire_zone = Some([140.0, 160.0]);
    let mut rig = Rig::new(cfg);
    rig.track_for(&[enemy(3, 320.0, 240.0, 0.5)], 800);

    let t = rig.runner.telemetry();
    assert!(t.fire_requested);
    assert!(!t.fire_output);
    assert!(rig.runner.interlock().flags().contains(InterlockFlags::FIRE_INHIBITED));
    assert_eq!(rig.sim.snapshot().laser_on_frames, 0);
}

#[test]
fn manual_control_pauses_scan_and_tracking_steering() {
    let mut rig = Rig::quiet();
    rig.ticks(50);
    assert_eq!(rig.command("YAW:250"), vec!["YAW_OK:250.0"]);
    let phase = *rig.runner.scan().phase();
    rig.track_for(&[enemy(1, 0.0, 0.0, 0.5)], 100);
    // Lock is kept, but the operator target stands.
    assert!(rig.runner.tracker().lock().is_some());
    assert_eq!(rig.runner.motion().target().pan_angle, 250.0);
    assert!(!rig.runner.last_frame().fire);

    assert_eq!(rig.command("MODE:AUTO"), vec!["MODE_OK:AUTO"]);
    rig.track_for(&[enemy(1, 0.0, 0.0, 0.5)], 5);
    assert_eq!(rig.runner.motion().target(), Pose::new(0.0, 60.0));
    assert_eq!(*rig.runner.scan().phase(), phase);
}

#[test]
fn spiral_mode_selected_over_protocol() {
    let mut rig = Rig::quiet();
    assert_eq!(rig.command("MODE:SPIRAL"), vec!["MODE_OK:SPIRAL"]);
    rig.ticks(240 * 3);
    let t = rig.runner.telemetry();
    assert_eq!(t.scan_mode, ScanMode::Spiral);
    assert!(t.scan_progress > 0.0);
    assert!(rig.runner.config().pan.limits().contains(t.pan_target));
    assert!(rig.runner.config().tilt.limits().contains(t.tilt_target));
}
