//! Edge-notified button line.

use linux_embedded_hal::gpio_cdev::{EventType, LineEventHandle};
use std::io;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use crate::input::EdgeSource;
use crate::{Error, Result};

/// Input line requested for both-edge events.
pub struct CdevEdges {
    events: LineEventHandle,
    line: u32,
}

impl CdevEdges {
    pub fn new(events: LineEventHandle, line: u32) -> Self {
        Self { events, line }
    }

    fn gpio_error(&self, e: impl std::fmt::Display) -> Error {
        Error::PinClaimFailed {
            line: self.line,
            label: "whisplay-button",
            reason: e.to_string(),
        }
    }
}

impl EdgeSource for CdevEdges {
    fn wait_edge(&mut self, timeout: Duration) -> Result<Option<bool>> {
        let mut fd = libc::pollfd {
            fd: self.events.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `fd` is a single valid pollfd that outlives the call.
        let ready = unsafe { libc::poll(&mut fd, 1, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(err.into());
        }
        if ready == 0 {
            return Ok(None);
        }

        let event = self.events.get_event().map_err(|e| self.gpio_error(e))?;
        Ok(Some(event.event_type() == EventType::RisingEdge))
    }

    fn is_high(&mut self) -> Result<bool> {
        self.events
            .get_value()
            .map(|value| value != 0)
            .map_err(|e| self.gpio_error(e))
    }
}
