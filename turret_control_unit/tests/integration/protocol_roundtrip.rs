//! Protocol round-trips through the running cycle.

use turret_common::control_unit::state::ScanMode;
use turret_control_unit::protocol::binary::encode_frame;
use turret_control_unit::protocol::binary::{CMD_LASER, CMD_SERVO};

use super::harness::Rig;

#[test]
fn reply_table() {
    let mut rig = Rig::quiet();
    assert_eq!(rig.command("YAW:12.34"), vec!["YAW_OK:12.3"]);
    assert_eq!(rig.command("PITCH:20"), vec!["PITCH_OK:20"]);
    assert_eq!(rig.command("FIRE:1"), vec!["FIRE_OK:1"]);
    assert_eq!(rig.command("FIRE:0"), vec!["FIRE_OK:0"]);
    assert_eq!(rig.command("MODE:SECTOR"), vec!["MODE_OK:SECTOR"]);
    assert_eq!(rig.command("ESTOP"), vec!["ESTOP"]);
    assert_eq!(rig.command("RESET"), vec!["RESET OK"]);
    assert_eq!(rig.command("FIRE:7"), vec!["ERR:BAD_ARG"]);
    assert_eq!(rig.command("MODE:TRACKING"), vec!["ERR:BAD_ARG"]);
    assert_eq!(rig.command("HELLO"), vec!["ERR:UNKNOWN_CMD"]);
}

#[test]
fn legacy_commands_are_silent() {
    let mut rig = Rig::quiet();
    assert!(rig.command("S30").is_empty());
    assert!(rig.command("M90").is_empty());
    assert!(rig.command("a").is_empty());
    assert!(rig.command("p").is_empty());
    let target = rig.runner.motion().target();
    assert_eq!(target.pan_angle, 90.0);
    assert_eq!(target.tilt_angle, 30.0);
}

#[test]
fn several_commands_in_one_read() {
    let mut rig = Rig::quiet();
    rig.peer.send(b"YAW:10\r\nPITCH:5\nSTATUS\n");
    rig.tick();
    let replies = rig.peer.take_replies();
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0], "YAW_OK:10.0");
    assert_eq!(replies[1], "PITCH_OK:5");
    assert!(replies[2].starts_with("YAW:"));
}

#[test]
fn text_line_split_across_ticks() {
    let mut rig = Rig::quiet();
    rig.peer.send(b"MODE:SP");
    rig.tick();
    assert!(rig.peer.take_replies().is_empty());
    rig.peer.send(b"IRAL\n");
    rig.tick();
    assert_eq!(rig.peer.take_replies(), vec!["MODE_OK:SPIRAL"]);
    assert_eq!(rig.runner.scan().mode(), ScanMode::Spiral);
}

#[test]
fn interleaved_binary_and_text() {
    let mut rig = Rig::quiet();
    let mut bytes = encode_frame(CMD_SERVO, 40).to_vec();
    bytes.extend_from_slice(b"STATUS\n");
    bytes.extend_from_slice(&encode_frame(CMD_LASER, 1));
    rig.peer.send(&bytes);
    rig.tick();
    assert_eq!(rig.peer.take_replies().len(), 1);
    assert_eq!(rig.runner.motion().target().tilt_angle, 40.0);
    assert!(rig.runner.last_frame().fire);
}

#[test]
fn noise_between_frames_is_ignored() {
    let mut rig = Rig::quiet();
    rig.peer.send(&[0x00, 0x1B, b'\n', 0xFF, b' ', b'\r']);
    rig.peer.send(b"PITCH:15\n");
    rig.tick();
    assert_eq!(rig.peer.take_replies(), vec!["PITCH_OK:15"]);
    assert_eq!(rig.runner.decoder().stats().commands, 1);
}

#[test]
fn overlong_line_dropped_without_reply() {
    let mut rig = Rig::quiet();
    let long = format!("YAW:{}\n", "1".repeat(40));
    rig.peer.send(long.as_bytes());
    rig.peer.send(b"PITCH:3\n");
    rig.tick();
    assert_eq!(rig.peer.take_replies(), vec!["PITCH_OK:3"]);
    assert_eq!(rig.runner.decoder().stats().framing_errors, 1);
}
