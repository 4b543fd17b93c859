//! Scripted virtual serial device
//!
//! A [`VirtualDevice`] is the test-side view of a simulated port. Handles
//! opened on it ([`VirtualPort`]) share its state, so a test can keep the
//! device and inspect what the code under test did with its handles.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use com_link::{Channel, Direction, LinkConfiguration};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct DeviceState {
    name: String,
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    applied: Vec<(Direction, LinkConfiguration)>,
    timeout: Option<Duration>,
    opens: usize,
    closes: usize,
    busy: bool,
    reject: Option<Direction>,
    fail_clone: bool,
    fail_writes: bool,
    read_errors: usize,
    stop_when_drained: Option<Arc<AtomicBool>>,
}

/// Simulated serial device
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    state: Rc<RefCell<DeviceState>>,
}

impl VirtualDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(DeviceState {
                name: name.into(),
                ..Default::default()
            })),
        }
    }

    /// Queue bytes the device will deliver to readers
    pub fn with_input(self, data: &[u8]) -> Self {
        self.state.borrow_mut().incoming.extend(data.iter().copied());
        self
    }

    /// Refuse to open, as if another process held the port
    pub fn busy(self) -> Self {
        self.state.borrow_mut().busy = true;
        self
    }

    /// Reject configuration of handles in `direction`
    pub fn reject_configuration(self, direction: Direction) -> Self {
        self.state.borrow_mut().reject = Some(direction);
        self
    }

    /// Fail to provide a second handle
    pub fn fail_clone(self) -> Self {
        self.state.borrow_mut().fail_clone = true;
        self
    }

    /// Fail every write
    pub fn fail_writes(self) -> Self {
        self.state.borrow_mut().fail_writes = true;
        self
    }

    /// Fail the next `count` reads with an I/O error
    pub fn with_read_errors(self, count: usize) -> Self {
        self.state.borrow_mut().read_errors = count;
        self
    }

    /// Raise `flag` once a read finds no input left
    ///
    /// Lets a test end an otherwise unbounded poll loop when the script is
    /// exhausted.
    pub fn stop_when_drained(self, flag: Arc<AtomicBool>) -> Self {
        self.state.borrow_mut().stop_when_drained = Some(flag);
        self
    }

    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    /// Open a new handle
    pub fn open(&self) -> VirtualPort {
        let mut state = self.state.borrow_mut();
        state.opens += 1;
        debug!("Virtual device {} opened ({} open)", state.name, state.opens - state.closes);
        VirtualPort {
            name: state.name.clone(),
            state: self.state.clone(),
        }
    }

    /// Everything written to any handle, in order
    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    /// Configurations applied to handles, in order
    pub fn applied(&self) -> Vec<(Direction, LinkConfiguration)> {
        self.state.borrow().applied.clone()
    }

    /// Timeout currently in effect on the device
    ///
    /// Like Windows comm timeouts this is device-wide: whichever handle was
    /// configured last decides it.
    pub fn timeout(&self) -> Option<Duration> {
        self.state.borrow().timeout
    }

    pub fn opens(&self) -> usize {
        self.state.borrow().opens
    }

    pub fn closes(&self) -> usize {
        self.state.borrow().closes
    }

    /// Handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        let state = self.state.borrow();
        state.opens - state.closes
    }

    pub fn remaining_input(&self) -> usize {
        self.state.borrow().incoming.len()
    }
}

/// One open handle to a [`VirtualDevice`]
#[derive(Debug)]
pub struct VirtualPort {
    name: String,
    state: Rc<RefCell<DeviceState>>,
}

impl Channel for VirtualPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();

        if state.read_errors > 0 {
            state.read_errors -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated read failure"));
        }

        let mut n = 0;
        while n < buf.len() {
            match state.incoming.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }

        if n == 0 {
            if let Some(flag) = &state.stop_when_drained {
                flag.store(true, Ordering::SeqCst);
            }
        }
        trace!("Virtual read {} byte(s)", n);
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "simulated write timeout"));
        }
        state.written.extend_from_slice(data);
        Ok(())
    }

    fn configure(&mut self, config: &LinkConfiguration, direction: Direction) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.reject == Some(direction) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "simulated parameter rejection",
            ));
        }
        state.applied.push((direction, *config));
        state.timeout = Some(config.handle_timeout(direction));
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Self> {
        let mut state = self.state.borrow_mut();
        if state.fail_clone {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated exclusive open",
            ));
        }
        state.opens += 1;
        Ok(Self {
            name: self.name.clone(),
            state: self.state.clone(),
        })
    }
}

impl Drop for VirtualPort {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.closes += 1;
        debug!("Virtual device {} closed ({} open)", state.name, state.opens - state.closes);
    }
}
