//! Last-known state of one joystick, updated event by event.

use anyhow::{ensure, Result};
use log::warn;

pub const HAT_UP: u8 = 0x01;
pub const HAT_RIGHT: u8 = 0x02;
pub const HAT_DOWN: u8 = 0x04;
pub const HAT_LEFT: u8 = 0x08;

/// Per-dimension slot counts reported by the device at open time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    pub axes: usize,
    pub buttons: usize,
    pub hats: usize,
    pub balls: usize,
}

/// One decoded joystick event. Indices refer to the slot layout fixed at
/// open time; `Quit` covers both device disconnect and user interrupt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JoyEvent {
    Axis { axis: usize, value: i16 },
    Button { button: usize, pressed: bool },
    Hat { hat: usize, mask: u8 },
    Ball { ball: usize, dx: i16, dy: i16 },
    Quit,
    Unknown { kind: u16, code: u16 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Continue,
    Quit,
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub axes: Vec<i16>,
    pub buttons: Vec<u8>,
    pub hats: Vec<u8>,
    pub balls: Vec<(i16, i16)>,
    dirty: bool,
}

impl Snapshot {
    /// Zero-initialized, sized once from the device capabilities. Starts
    /// dirty so the first frame draws before any event arrives.
    pub fn new(caps: &Capabilities) -> Self {
        Self {
            axes: vec![0; caps.axes],
            buttons: vec![0; caps.buttons],
            hats: vec![0; caps.hats],
            balls: vec![(0, 0); caps.balls],
            dirty: true,
        }
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Cleared only after a completed render.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Applies one event. An index at or past the matching capability count
    /// is a driver-contract fault and fails the whole action; it is never
    /// clamped.
    pub fn apply(&mut self, event: &JoyEvent) -> Result<Outcome> {
        match *event {
            JoyEvent::Axis { axis, value } => {
                ensure!(
                    axis < self.axes.len(),
                    "axis index {} out of range (device reports {} axes)",
                    axis,
                    self.axes.len()
                );
                self.axes[axis] = value;
                self.dirty = true;
            }
            JoyEvent::Button { button, pressed } => {
                ensure!(
                    button < self.buttons.len(),
                    "button index {} out of range (device reports {} buttons)",
                    button,
                    self.buttons.len()
                );
                self.buttons[button] = u8::from(pressed);
                self.dirty = true;
            }
            JoyEvent::Hat { hat, mask } => {
                ensure!(
                    hat < self.hats.len(),
                    "hat index {} out of range (device reports {} hats)",
                    hat,
                    self.hats.len()
                );
                self.hats[hat] = mask;
                self.dirty = true;
            }
            JoyEvent::Ball { ball, dx, dy } => {
                ensure!(
                    ball < self.balls.len(),
                    "ball index {} out of range (device reports {} balls)",
                    ball,
                    self.balls.len()
                );
                // Last reported delta, not an accumulated position.
                self.balls[ball] = (dx, dy);
                self.dirty = true;
            }
            JoyEvent::Quit => return Ok(Outcome::Quit),
            JoyEvent::Unknown { kind, code } => {
                warn!("unhandled input event type {kind} (code {code})");
            }
        }
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> Capabilities {
        Capabilities {
            axes: 2,
            buttons: 3,
            hats: 1,
            balls: 1,
        }
    }

    #[test]
    fn starts_zeroed_and_dirty() {
        let snapshot = Snapshot::new(&caps());
        assert_eq!(snapshot.axes, vec![0, 0]);
        assert_eq!(snapshot.buttons, vec![0, 0, 0]);
        assert_eq!(snapshot.hats, vec![0]);
        assert_eq!(snapshot.balls, vec![(0, 0)]);
        assert!(snapshot.dirty());
    }

    #[test]
    fn axis_event_sets_value_and_dirty() {
        let mut snapshot = Snapshot::new(&caps());
        snapshot.clear_dirty();
        let outcome = snapshot
            .apply(&JoyEvent::Axis {
                axis: 1,
                value: -12345,
            })
            .unwrap();
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(snapshot.axes[1], -12345);
        assert!(snapshot.dirty());
        snapshot.clear_dirty();
        assert!(!snapshot.dirty());
    }

    #[test]
    fn button_and_hat_events_overwrite_slots() {
        let mut snapshot = Snapshot::new(&caps());
        snapshot
            .apply(&JoyEvent::Button {
                button: 2,
                pressed: true,
            })
            .unwrap();
        assert_eq!(snapshot.buttons, vec![0, 0, 1]);
        snapshot
            .apply(&JoyEvent::Button {
                button: 2,
                pressed: false,
            })
            .unwrap();
        assert_eq!(snapshot.buttons, vec![0, 0, 0]);
        snapshot
            .apply(&JoyEvent::Hat {
                hat: 0,
                mask: HAT_UP | HAT_LEFT,
            })
            .unwrap();
        assert_eq!(snapshot.hats[0], HAT_UP | HAT_LEFT);
    }

    #[test]
    fn ball_deltas_overwrite_not_accumulate() {
        let mut snapshot = Snapshot::new(&caps());
        snapshot
            .apply(&JoyEvent::Ball {
                ball: 0,
                dx: 5,
                dy: -3,
            })
            .unwrap();
        snapshot
            .apply(&JoyEvent::Ball {
                ball: 0,
                dx: 2,
                dy: 7,
            })
            .unwrap();
        assert_eq!(snapshot.balls[0], (2, 7));
    }

    #[test]
    fn out_of_range_index_fails_without_mutation() {
        let mut snapshot = Snapshot::new(&caps());
        snapshot.clear_dirty();
        let before = snapshot.clone();
        assert!(snapshot
            .apply(&JoyEvent::Axis {
                axis: 2,
                value: 100
            })
            .is_err());
        assert!(snapshot
            .apply(&JoyEvent::Button {
                button: 3,
                pressed: true
            })
            .is_err());
        assert!(snapshot.apply(&JoyEvent::Hat { hat: 1, mask: 1 }).is_err());
        assert!(snapshot
            .apply(&JoyEvent::Ball {
                ball: 1,
                dx: 1,
                dy: 1
            })
            .is_err());
        assert_eq!(snapshot.axes, before.axes);
        assert_eq!(snapshot.buttons, before.buttons);
        assert_eq!(snapshot.hats, before.hats);
        assert_eq!(snapshot.balls, before.balls);
        assert!(!snapshot.dirty());
    }

    #[test]
    fn quit_and_unknown_do_not_touch_state() {
        let mut snapshot = Snapshot::new(&caps());
        snapshot.clear_dirty();
        assert_eq!(snapshot.apply(&JoyEvent::Quit).unwrap(), Outcome::Quit);
        assert!(!snapshot.dirty());
        assert_eq!(
            snapshot
                .apply(&JoyEvent::Unknown { kind: 5, code: 9 })
                .unwrap(),
            Outcome::Continue
        );
        assert!(!snapshot.dirty());
    }
}
