//! Maps raw evdev events onto indexed joystick slots.
//!
//! evdev reports capability bitmaps rather than slot counts, so a fixed
//! layout is computed once at open time: absolute axes (minus the hat
//! range) become axes, key codes become buttons by rank, `ABS_HATnX/Y`
//! pairs become hats, and relative X/Y pairs become balls.

use crate::state::snapshot::{Capabilities, JoyEvent, HAT_DOWN, HAT_LEFT, HAT_RIGHT, HAT_UP};
use anyhow::{Context, Result};
use evdev::{Device, EventType, InputEvent, Key, RelativeAxisType};

const HAT_AXIS_FIRST: u16 = 0x10; // ABS_HAT0X
const HAT_AXIS_LAST: u16 = 0x17; // ABS_HAT3Y

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AxisSpec {
    pub code: u16,
    pub min: i32,
    pub max: i32,
}

/// Slot layout of one device, fixed for the session.
#[derive(Clone, Debug, Default)]
pub struct DeviceLayout {
    pub axes: Vec<AxisSpec>,
    /// Key codes sorted ascending; a button's index is its rank here.
    pub buttons: Vec<u16>,
    /// X-axis code of each hat pair, sorted ascending.
    pub hats: Vec<u16>,
    /// (x, y) relative axis code pairs.
    pub balls: Vec<(u16, u16)>,
}

impl DeviceLayout {
    pub fn probe(device: &Device) -> Result<Self> {
        let mut layout = DeviceLayout::default();

        if let Some(abs) = device.supported_absolute_axes() {
            let mut codes: Vec<u16> = abs.iter().map(|axis| axis.0).collect();
            codes.sort_unstable();
            let abs_state = device
                .get_abs_state()
                .context("absolute axis state query failed")?;
            for code in codes {
                if (HAT_AXIS_FIRST..=HAT_AXIS_LAST).contains(&code) {
                    if (code - HAT_AXIS_FIRST) % 2 == 0 {
                        layout.hats.push(code);
                    }
                    continue;
                }
                let (min, max) = match abs_state.get(code as usize) {
                    Some(info) => (info.minimum, info.maximum),
                    None => (0, 0),
                };
                layout.axes.push(AxisSpec { code, min, max });
            }
        }

        if let Some(keys) = device.supported_keys() {
            layout.buttons = keys.iter().map(|key| key.code()).collect();
            layout.buttons.sort_unstable();
        }

        if let Some(rel) = device.supported_relative_axes() {
            let pairs = [
                (RelativeAxisType::REL_X, RelativeAxisType::REL_Y),
                (RelativeAxisType::REL_RX, RelativeAxisType::REL_RY),
            ];
            for (x, y) in pairs {
                if rel.contains(x) && rel.contains(y) {
                    layout.balls.push((x.0, y.0));
                }
            }
        }

        Ok(layout)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            axes: self.axes.len(),
            buttons: self.buttons.len(),
            hats: self.hats.len(),
            balls: self.balls.len(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct PendingBall {
    dx: i32,
    dy: i32,
    seen: bool,
}

pub struct Decoder {
    layout: DeviceLayout,
    hat_masks: Vec<u8>,
    ball_pending: Vec<PendingBall>,
}

impl Decoder {
    pub fn new(layout: DeviceLayout) -> Self {
        let hat_masks = vec![0; layout.hats.len()];
        let ball_pending = vec![PendingBall::default(); layout.balls.len()];
        Self {
            layout,
            hat_masks,
            ball_pending,
        }
    }

    /// Decodes one evdev event. Ball deltas accumulate until the report's
    /// `SYN_REPORT`, everything else maps one to one.
    pub fn decode(&mut self, event: InputEvent) -> Vec<JoyEvent> {
        match event.event_type() {
            EventType::ABSOLUTE => {
                let code = event.code();
                if (HAT_AXIS_FIRST..=HAT_AXIS_LAST).contains(&code) {
                    return self.hat_event(code, event.value());
                }
                match self.layout.axes.iter().position(|spec| spec.code == code) {
                    Some(index) => {
                        let spec = self.layout.axes[index];
                        vec![JoyEvent::Axis {
                            axis: index,
                            value: rescale(event.value(), spec.min, spec.max),
                        }]
                    }
                    None => vec![unknown(&event)],
                }
            }
            EventType::KEY => match self.layout.buttons.binary_search(&event.code()) {
                Ok(index) => vec![JoyEvent::Button {
                    button: index,
                    pressed: event.value() != 0,
                }],
                Err(_) => vec![unknown(&event)],
            },
            EventType::RELATIVE => {
                let code = event.code();
                for (index, &(x, y)) in self.layout.balls.iter().enumerate() {
                    if code == x || code == y {
                        let pending = &mut self.ball_pending[index];
                        if code == x {
                            pending.dx += event.value();
                        } else {
                            pending.dy += event.value();
                        }
                        pending.seen = true;
                        return Vec::new();
                    }
                }
                vec![unknown(&event)]
            }
            EventType::SYNCHRONIZATION => self.flush_balls(),
            // Scan codes accompany every key report; not joystick state.
            EventType::MISC => Vec::new(),
            _ => vec![unknown(&event)],
        }
    }

    fn hat_event(&mut self, code: u16, value: i32) -> Vec<JoyEvent> {
        let offset = code - HAT_AXIS_FIRST;
        let x_code = HAT_AXIS_FIRST + (offset & !1);
        let index = match self.layout.hats.iter().position(|&hat| hat == x_code) {
            Some(index) => index,
            None => {
                return vec![JoyEvent::Unknown {
                    kind: EventType::ABSOLUTE.0,
                    code,
                }]
            }
        };

        let mask = &mut self.hat_masks[index];
        if offset % 2 == 0 {
            *mask &= !(HAT_LEFT | HAT_RIGHT);
            if value < 0 {
                *mask |= HAT_LEFT;
            } else if value > 0 {
                *mask |= HAT_RIGHT;
            }
        } else {
            // Negative Y points up in evdev.
            *mask &= !(HAT_UP | HAT_DOWN);
            if value < 0 {
                *mask |= HAT_UP;
            } else if value > 0 {
                *mask |= HAT_DOWN;
            }
        }
        vec![JoyEvent::Hat {
            hat: index,
            mask: *mask,
        }]
    }

    fn flush_balls(&mut self) -> Vec<JoyEvent> {
        let mut events = Vec::new();
        for (index, pending) in self.ball_pending.iter_mut().enumerate() {
            if !pending.seen {
                continue;
            }
            events.push(JoyEvent::Ball {
                ball: index,
                dx: clamp16(pending.dx),
                dy: clamp16(pending.dy),
            });
            *pending = PendingBall::default();
        }
        events
    }
}

/// Rescales a raw axis value from its device range onto [-32768, 32767].
pub fn rescale(value: i32, min: i32, max: i32) -> i16 {
    if min >= max {
        return clamp16(value);
    }
    // Widen before subtracting; (max - min) can exceed i32 range.
    let span = max as i64 - min as i64;
    let scaled = (value as i64 - min as i64) * 65535 / span - 32768;
    scaled.clamp(-32768, 32767) as i16
}

fn clamp16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn unknown(event: &InputEvent) -> JoyEvent {
    JoyEvent::Unknown {
        kind: event.event_type().0,
        code: event.code(),
    }
}

/// True when the device exposes any button in the joystick/gamepad range
/// (BTN_TRIGGER through BTN_THUMBR).
pub fn looks_like_joystick(device: &Device) -> bool {
    let range = Key::BTN_TRIGGER.code()..=Key::BTN_THUMBR.code();
    device
        .supported_keys()
        .map(|keys| keys.iter().any(|key| range.contains(&key.code())))
        .unwrap_or(false)
}
