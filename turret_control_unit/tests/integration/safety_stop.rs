//! Integration test: emergency stop, staleness fail-safe and recovery.

use turret_common::control_unit::error::InterlockFlags;
use turret_common::control_unit::state::ScanMode;
use turret_common::hal::types::{ActuationFrame, ServoOutput};
use turret_common::types::AxisId;

use super::harness::{Rig, enemy, quiet_config};

#[test]
fn estop_zeroes_velocity_and_fire_within_one_tick() {
    let mut rig = Rig::quiet();
    rig.command("YAW:200");
    rig.command("FIRE:1");
    rig.ticks(50);
    assert!(rig.runner.motion().axis(AxisId::Pan).state().current_velocity > 0.0);
    assert!(rig.sim.snapshot().laser);

    assert_eq!(rig.command("ESTOP"), vec!["ESTOP"]);
    let pan = rig.runner.motion().axis(AxisId::Pan).state();
    assert_eq!(pan.current_velocity, 0.0);
    assert_eq!(*rig.runner.last_frame(), ActuationFrame::HALTED);
    let hw = rig.sim.snapshot();
    assert!(!hw.laser);
    assert!(!hw.stepper_enabled);
    assert_eq!(hw.servo_pulse_us, None);
}

#[test]
fn all_but_reset_status_estop_rejected_while_latched() {
    let mut rig = Rig::quiet();
    rig.command("ESTOP");
    for line in ["YAW:10", "PITCH:10", "FIRE:1", "MODE:SWEEP", "S10", "M10", "a", "p"] {
        assert_eq!(rig.command(line), vec!["ERR:ESTOP_ACTIVE"], "{line}");
    }
    rig.peer.send(&[0xAA, 0x03, 1, 0x55]);
    rig.tick();
    assert_eq!(rig.peer.take_replies(), vec!["ERR:ESTOP_ACTIVE"]);

    assert_eq!(rig.command("ESTOP"), vec!["ESTOP"]);
    assert_eq!(rig.runner.interlock().estop_count(), 1);
    assert_eq!(rig.command("RESET"), vec!["RESET OK"]);
    assert!(!rig.runner.motion().is_halted());
    assert_eq!(rig.command("PITCH:10"), vec!["PITCH_OK:10"]);
}

#[test]
fn autonomous_motion_frozen_while_latched() {
    let mut rig = Rig::quiet();
    rig.ticks(100);
    rig.command("ESTOP");
    let pose = rig.runner.motion().pose();
    let phase = *rig.runner.scan().phase();
    rig.track_for(&[enemy(1, 320.0, 240.0, 0.9)], 300);
    assert_eq!(rig.runner.motion().pose(), pose);
    assert_eq!(*rig.runner.scan().phase(), phase);
    assert_eq!(rig.sim.snapshot().laser_on_frames, 0);
}

#[test]
fn reset_resumes_from_current_pose() {
    let mut rig = Rig::quiet();
    rig.command("YAW:100");
    rig.ticks(30);
    rig.command("ESTOP");
    let halted_at = rig.runner.motion().pose();
    rig.command("RESET");
    assert_eq!(rig.runner.motion().target(), halted_at);
    assert!(matches!(rig.runner.last_frame().tilt, ServoOutput::Pulse(_)));
    assert!(rig.runner.last_frame().pan_enabled);
}

#[test]
fn silence_beyond_threshold_is_estop() {
    let mut cfg = quiet_config();
    cfg.safety.comm_stale_threshold = 1.0;
    let mut rig = Rig::new(cfg);

    // Commands keep the link alive.
    for _ in 0..5 {
        rig.command("STATUS");
        rig.ticks(50);
    }
    assert!(!rig.runner.interlock().is_estopped());

    rig.ticks(110);
    assert!(rig.runner.interlock().is_estopped());
    assert!(rig.runner.interlock().flags().contains(InterlockFlags::COMM_STALE));
    assert!(rig.runner.interlock().flags().has_critical());
    let status = rig.command("STATUS");
    assert_eq!(status.len(), 1);
    assert!(status[0].ends_with(";ESTOP:1"), "{status:?}");

    // RESET clears the latch and restarts the clock.
    rig.command("RESET");
    assert!(!rig.runner.interlock().is_estopped());
    assert!(rig.runner.interlock().flags().is_empty());
}

#[test]
fn malformed_commands_do_not_feed_the_watchdog() {
    let mut cfg = quiet_config();
    cfg.safety.comm_stale_threshold = 0.5;
    let mut rig = Rig::new(cfg);
    for _ in 0..10 {
        rig.command("BOGUS");
        rig.ticks(9);
    }
    assert!(rig.runner.interlock().is_estopped());
}

#[test]
fn operator_fire_gated_by_no_fire_zone() {
    let mut cfg = quiet_config();
    cfg.safety.no_fire_zone = Some([0.0, 20.0]);
    let mut rig = Rig::new(cfg);
    rig.command("M10");
    assert_eq!(rig.command("FIRE:1"), vec!["FIRE_OK:1"]);
    assert!(!rig.runner.last_frame().fire);
    let status = rig.command("STATUS");
    assert!(status[0].ends_with(";FIRE:0;ESTOP:0"), "{status:?}");

    rig.command("M100");
    rig.ticks(400);
    assert!(rig.runner.last_frame().fire);
    assert!(!rig.runner.interlock().flags().contains(InterlockFlags::FIRE_INHIBITED));
}

#[test]
fn reset_drops_target_lock_and_resumes_scan() {
    let mut rig = Rig::quiet();
    rig.publish(&[enemy(3, 320.0, 240.0, 0.5)]);
    rig.tick();
    assert_eq!(rig.runner.scan().mode(), ScanMode::Tracking);

    rig.command("ESTOP");
    assert_eq!(rig.command("RESET"), vec!["RESET OK"]);
    assert!(rig.runner.tracker().lock().is_none());
    assert_eq!(rig.runner.scan().mode(), ScanMode::Sweep);

    // A fresh frame is needed to lock again.
    rig.ticks(5);
    assert!(rig.runner.tracker().lock().is_none());
    rig.publish(&[enemy(3, 320.0, 240.0, 0.5)]);
    rig.tick();
    assert_eq!(rig.runner.tracker().lock().map(|l| l.detection_id), Some(3));
}
