//! Raw event log: blocks for each batch and prints one line per event.
//! No snapshot, no dirty tracking.

use crate::joystick::Joystick;
use crate::state::snapshot::JoyEvent;
use anyhow::Result;
use log::warn;

pub fn run_event_log(joy: &mut Joystick, joy_idx: i32) -> Result<()> {
    println!("Entering joystick event loop, press Ctrl-C to exit");
    loop {
        for event in joy.wait_events()? {
            match event {
                JoyEvent::Quit => {
                    println!("Received quit, exiting");
                    return Ok(());
                }
                JoyEvent::Unknown { kind, code } => {
                    warn!("unhandled input event type {kind} (code {code})");
                }
                other => println!("{}", format_event(joy_idx, &other)),
            }
        }
    }
}

pub fn format_event(joy_idx: i32, event: &JoyEvent) -> String {
    match *event {
        JoyEvent::Axis { axis, value } => {
            format!("AXIS_MOTION: joystick: {joy_idx} axis: {axis} value: {value}")
        }
        JoyEvent::Button { button, pressed } => {
            let state = if pressed { "BUTTON_DOWN" } else { "BUTTON_UP" };
            format!("{state}: joystick: {joy_idx} button: {button}")
        }
        JoyEvent::Hat { hat, mask } => {
            format!("HAT_MOTION: joystick: {joy_idx} hat: {hat} value: {mask}")
        }
        JoyEvent::Ball { ball, dx, dy } => {
            format!("BALL_MOTION: joystick: {joy_idx} ball: {ball} x: {dx} y: {dy}")
        }
        JoyEvent::Quit => format!("QUIT: joystick: {joy_idx}"),
        JoyEvent::Unknown { kind, code } => {
            format!("UNKNOWN: joystick: {joy_idx} type: {kind} code: {code}")
        }
    }
}
