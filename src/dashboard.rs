//! Live joystick dashboard: a polling loop that redraws the terminal only
//! when the snapshot changed.

use crate::joystick::Joystick;
use crate::state::snapshot::{JoyEvent, Outcome, Snapshot, HAT_DOWN, HAT_LEFT, HAT_RIGHT, HAT_UP};
use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, MoveToNextLine, Show};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{ExecutableCommand, QueueableCommand};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const GAUGE_MARGIN: usize = 20;
const MIN_GAUGE_WIDTH: usize = 2;

pub fn run_dashboard(joy: &mut Joystick, joy_idx: i32) -> Result<()> {
    let caps = joy.capabilities();
    let name = joy.name().to_string();
    let mut snapshot = Snapshot::new(&caps);
    let mut tui = Tui::setup().context("terminal setup failed")?;

    loop {
        let events = joy.poll_events(POLL_INTERVAL)?;
        if dispatch_batch(&mut snapshot, &events)? == Outcome::Quit {
            break;
        }
        match tui.drain_input()? {
            TermSignal::Quit => break,
            TermSignal::Redraw => snapshot.mark_dirty(),
            TermSignal::None => {}
        }
        if snapshot.dirty() {
            let frame = render_frame(&name, joy_idx, &snapshot, tui.width()? as usize);
            tui.draw(&frame)?;
            snapshot.clear_dirty();
        }
    }
    Ok(())
}

/// Feeds one drained batch to the reducer. A quit outcome stops the batch
/// immediately; later events are not applied.
pub fn dispatch_batch(snapshot: &mut Snapshot, events: &[JoyEvent]) -> Result<Outcome> {
    for event in events {
        if snapshot.apply(event)? == Outcome::Quit {
            return Ok(Outcome::Quit);
        }
    }
    Ok(Outcome::Continue)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TermSignal {
    None,
    Quit,
    Redraw,
}

/// Raw-mode terminal session. Drop restores cursor, echo, and screen on
/// every exit path, error propagation included.
struct Tui {
    stdout: io::Stdout,
}

impl Tui {
    fn setup() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        // Guard exists from here on; a failure below still leaves raw
        // mode through Drop.
        let mut tui = Self {
            stdout: io::stdout(),
        };
        tui.stdout.execute(EnterAlternateScreen)?;
        tui.stdout.execute(Hide)?;
        Ok(tui)
    }

    fn width(&self) -> io::Result<u16> {
        Ok(terminal::size()?.0)
    }

    fn drain_input(&self) -> io::Result<TermSignal> {
        let mut signal = TermSignal::None;
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) => {
                    let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                        || (key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL));
                    if quit {
                        return Ok(TermSignal::Quit);
                    }
                }
                Event::Resize(_, _) => signal = TermSignal::Redraw,
                _ => {}
            }
        }
        Ok(signal)
    }

    fn draw(&mut self, frame: &str) -> io::Result<()> {
        self.stdout.queue(MoveTo(0, 0))?;
        self.stdout.queue(Clear(ClearType::All))?;
        for line in frame.lines() {
            self.stdout.queue(Print(line))?;
            self.stdout.queue(MoveToNextLine(1))?;
        }
        self.stdout.flush()
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.stdout.execute(Show);
        let _ = self.stdout.execute(LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }
}

/// Formats the whole dashboard as one frame. Pure so it can be tested
/// without a terminal.
pub fn render_frame(name: &str, joy_idx: i32, snapshot: &Snapshot, term_width: usize) -> String {
    let gauge_width = term_width.saturating_sub(GAUGE_MARGIN).max(MIN_GAUGE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "Joystick Name:   '{name}'");
    let _ = writeln!(out, "Joystick Number: {joy_idx}");
    out.push('\n');

    let _ = writeln!(out, "Axes {:2}:", snapshot.axes.len());
    for (i, &value) in snapshot.axes.iter().enumerate() {
        let _ = writeln!(out, "  {i:2}: {value:6}  {}", gauge(value, gauge_width));
    }
    out.push('\n');

    let _ = writeln!(out, "Buttons {:2}:", snapshot.buttons.len());
    for (i, &state) in snapshot.buttons.iter().enumerate() {
        let glyph = if state != 0 { "[#]" } else { "[ ]" };
        let _ = writeln!(out, "  {i:2}: {state}  {glyph}");
    }
    out.push('\n');

    let _ = writeln!(out, "Hats {:2}:", snapshot.hats.len());
    for (i, &mask) in snapshot.hats.iter().enumerate() {
        let grid = hat_grid(mask);
        let _ = writeln!(out, "  {i:2}: value: {mask}");
        let _ = writeln!(out, "  +-----+  up:    {}", bit(mask, HAT_UP));
        let _ = writeln!(
            out,
            "  |{} {} {}|  down:  {}",
            grid[0][0],
            grid[0][1],
            grid[0][2],
            bit(mask, HAT_DOWN)
        );
        let _ = writeln!(
            out,
            "  |{} {} {}|  left:  {}",
            grid[1][0],
            grid[1][1],
            grid[1][2],
            bit(mask, HAT_LEFT)
        );
        let _ = writeln!(
            out,
            "  |{} {} {}|  right: {}",
            grid[2][0],
            grid[2][1],
            grid[2][2],
            bit(mask, HAT_RIGHT)
        );
        let _ = writeln!(out, "  +-----+");
    }
    out.push('\n');

    let _ = writeln!(out, "Balls {:2}:", snapshot.balls.len());
    for (i, &(dx, dy)) in snapshot.balls.iter().enumerate() {
        let _ = writeln!(out, "  {i:2}: {dx:6} {dy:6}");
    }
    out.push('\n');

    out.push_str("Press q or Ctrl-C to exit\n");
    out
}

/// Marker column for a signed axis value within a gauge of `width` cells.
pub fn gauge_marker(value: i16, width: usize) -> usize {
    let span = width.max(MIN_GAUGE_WIDTH) as i64;
    let pos = (value as i64 + 32768) * (span - 1) / 65535;
    pos.clamp(0, span - 1) as usize
}

fn gauge(value: i16, width: usize) -> String {
    let width = width.max(MIN_GAUGE_WIDTH);
    let marker = gauge_marker(value, width);
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    for i in 0..width {
        bar.push(if i == marker { '#' } else { ' ' });
    }
    bar.push(']');
    bar
}

fn bit(mask: u8, flag: u8) -> char {
    if mask & flag != 0 {
        '1'
    } else {
        '0'
    }
}

/// 3x3 hat glyph grid: blank center, single directions on the edges,
/// diagonals in the corners. Each cell gates only on the bits that could
/// contradict it, so an impossible mask still lights its plain edges.
fn hat_grid(mask: u8) -> [[char; 3]; 3] {
    let up = mask & HAT_UP != 0;
    let down = mask & HAT_DOWN != 0;
    let left = mask & HAT_LEFT != 0;
    let right = mask & HAT_RIGHT != 0;
    let cell = |on: bool| if on { 'O' } else { ' ' };
    [
        [
            cell(up && left),
            cell(up && !left && !right),
            cell(up && right),
        ],
        [
            cell(!up && !down && left),
            ' ',
            cell(!up && !down && right),
        ],
        [
            cell(down && left),
            cell(down && !left && !right),
            cell(down && right),
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::snapshot::Capabilities;

    #[test]
    fn gauge_marker_hits_both_ends() {
        for width in [2, 3, 10, 60, 200] {
            assert_eq!(gauge_marker(i16::MIN, width), 0);
            assert_eq!(gauge_marker(i16::MAX, width), width - 1);
        }
    }

    #[test]
    fn gauge_marker_is_monotonic() {
        let width = 40;
        let mut last = 0;
        for value in (i16::MIN..=i16::MAX).step_by(257) {
            let pos = gauge_marker(value, width);
            assert!(pos >= last);
            assert!(pos < width);
            last = pos;
        }
    }

    #[test]
    fn gauge_enforces_minimum_width() {
        // A tiny terminal must not underflow the bar.
        let bar = gauge(0, 0);
        assert_eq!(bar.len(), MIN_GAUGE_WIDTH + 2);
        assert!(bar.starts_with('['));
        assert!(bar.ends_with(']'));
    }

    #[test]
    fn hat_grid_singles_and_diagonals() {
        assert_eq!(hat_grid(HAT_UP)[0][1], 'O');
        assert_eq!(hat_grid(HAT_DOWN)[2][1], 'O');
        assert_eq!(hat_grid(HAT_LEFT)[1][0], 'O');
        assert_eq!(hat_grid(HAT_RIGHT)[1][2], 'O');
        assert_eq!(hat_grid(HAT_UP | HAT_LEFT)[0][0], 'O');
        assert_eq!(hat_grid(HAT_DOWN | HAT_RIGHT)[2][2], 'O');
        // Center stays blank, even at rest.
        assert_eq!(hat_grid(0)[1][1], ' ');
        assert_eq!(hat_grid(HAT_UP)[1][1], ' ');
    }

    #[test]
    fn hat_grid_tolerates_contradictory_masks() {
        // Up and down each still light their own edge cell; the corners
        // need a left/right bit and stay blank.
        let grid = hat_grid(HAT_UP | HAT_DOWN);
        assert_eq!(grid[0][1], 'O');
        assert_eq!(grid[2][1], 'O');
        let lit: usize = grid
            .iter()
            .flatten()
            .filter(|&&cell| cell == 'O')
            .count();
        assert_eq!(lit, 2);
    }

    #[test]
    fn frame_shows_applied_events() {
        let caps = Capabilities {
            axes: 1,
            buttons: 1,
            hats: 0,
            balls: 0,
        };
        let mut snapshot = Snapshot::new(&caps);
        snapshot
            .apply(&JoyEvent::Axis { axis: 0, value: 0 })
            .unwrap();
        snapshot
            .apply(&JoyEvent::Button {
                button: 0,
                pressed: true,
            })
            .unwrap();
        assert!(snapshot.dirty());

        let frame = render_frame("Test Pad", 0, &snapshot, 40);
        assert!(frame.contains("Joystick Name:   'Test Pad'"));
        assert!(frame.contains("Joystick Number: 0"));
        assert!(frame.contains("[#]"));
        // Gauge width 20, value 0 sits near the middle.
        let marker = gauge_marker(0, 20);
        assert!((9..=10).contains(&marker));
        assert!(frame.contains(&gauge(0, 20)));
        assert!(frame.contains("Press q or Ctrl-C to exit"));
    }

    #[test]
    fn rendering_is_deterministic_for_a_given_snapshot() {
        let caps = Capabilities {
            axes: 2,
            buttons: 2,
            hats: 1,
            balls: 1,
        };
        let snapshot = Snapshot::new(&caps);
        assert_eq!(
            render_frame("Pad", 1, &snapshot, 72),
            render_frame("Pad", 1, &snapshot, 72)
        );
    }

    #[test]
    fn quit_mid_batch_stops_applying_events() {
        let caps = Capabilities {
            axes: 1,
            buttons: 0,
            hats: 0,
            balls: 0,
        };
        let mut snapshot = Snapshot::new(&caps);
        let batch = [
            JoyEvent::Axis {
                axis: 0,
                value: 111,
            },
            JoyEvent::Quit,
            JoyEvent::Axis {
                axis: 0,
                value: 222,
            },
        ];
        assert_eq!(dispatch_batch(&mut snapshot, &batch).unwrap(), Outcome::Quit);
        assert_eq!(snapshot.axes[0], 111);
    }

    #[test]
    fn out_of_range_event_fails_the_batch() {
        let caps = Capabilities {
            axes: 1,
            buttons: 0,
            hats: 0,
            balls: 0,
        };
        let mut snapshot = Snapshot::new(&caps);
        let batch = [JoyEvent::Axis {
            axis: 5,
            value: 1,
        }];
        assert!(dispatch_batch(&mut snapshot, &batch).is_err());
    }
}
