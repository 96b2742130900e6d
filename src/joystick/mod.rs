//! Joystick discovery and access over the Linux evdev interface.

mod decode;
mod discover;

use crate::state::snapshot::{Capabilities, JoyEvent};
use anyhow::{Context, Result};
use decode::{Decoder, DeviceLayout};
use log::info;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::os::unix::io::{AsRawFd, BorrowedFd};
use std::path::PathBuf;
use std::time::Duration;

pub use discover::{discover_joysticks, sources_from_env};

/// One discovered joystick device node.
#[derive(Clone, Debug)]
pub struct JoystickSource {
    pub path: PathBuf,
    pub name: String,
}

/// An opened joystick: the device node plus its fixed slot layout.
pub struct Joystick {
    source: JoystickSource,
    device: evdev::Device,
    decoder: Decoder,
    caps: Capabilities,
}

impl Joystick {
    pub fn open(source: JoystickSource) -> Result<Self> {
        let device = evdev::Device::open(&source.path)
            .with_context(|| format!("failed to open {}", source.path.display()))?;
        // drain() reads until WouldBlock, so the fd must be non-blocking.
        let fd = unsafe { BorrowedFd::borrow_raw(device.as_raw_fd()) };
        fcntl(fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .with_context(|| format!("failed to set {} non-blocking", source.path.display()))?;

        let layout = DeviceLayout::probe(&device)
            .with_context(|| format!("capability query failed for {}", source.path.display()))?;
        let caps = layout.capabilities();
        info!(
            "Opened {} ({}): {} axes, {} buttons, {} hats, {} balls",
            source.name,
            source.path.display(),
            caps.axes,
            caps.buttons,
            caps.hats,
            caps.balls
        );

        Ok(Self {
            source,
            device,
            decoder: Decoder::new(layout),
            caps,
        })
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Waits up to `timeout` for input, then drains whatever is queued.
    /// Returns an empty batch on timeout; never blocks past the timeout.
    pub fn poll_events(&mut self, timeout: Duration) -> Result<Vec<JoyEvent>> {
        let timeout = PollTimeout::from(timeout.as_millis().min(u16::MAX as u128) as u16);
        if self.wait_readable(timeout)? {
            self.drain()
        } else {
            Ok(Vec::new())
        }
    }

    /// Blocks until at least one event arrives. The one suspension point
    /// of the event-log variant.
    pub fn wait_events(&mut self) -> Result<Vec<JoyEvent>> {
        loop {
            self.wait_readable(PollTimeout::NONE)?;
            let events = self.drain()?;
            if !events.is_empty() {
                return Ok(events);
            }
        }
    }

    fn wait_readable(&self, timeout: PollTimeout) -> Result<bool> {
        // The device owns the fd and outlives this borrow.
        let fd = unsafe { BorrowedFd::borrow_raw(self.device.as_raw_fd()) };
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, timeout) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(fds[0]
                .revents()
                .unwrap_or(PollFlags::empty())
                .intersects(PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP)),
            Err(Errno::EINTR) => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("poll failed for {}", self.source.name))
            }
        }
    }

    fn drain(&mut self) -> Result<Vec<JoyEvent>> {
        let mut out = Vec::new();
        loop {
            match self.device.fetch_events() {
                Ok(events) => {
                    let mut any = false;
                    for event in events {
                        any = true;
                        out.extend(self.decoder.decode(event));
                    }
                    if !any {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.raw_os_error() == Some(Errno::ENODEV as i32) => {
                    info!("{} disconnected", self.source.name);
                    out.push(JoyEvent::Quit);
                    break;
                }
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("event read failed for {}", self.source.path.display())
                    })
                }
            }
        }
        Ok(out)
    }
}
