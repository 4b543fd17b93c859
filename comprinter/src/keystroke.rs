//! Synthetic keystroke forwarding
//!
//! Only a small set of characters have a key mapping: letters (sent as their
//! upper-case key), digits, space, comma, period, backspace, tab and newline.
//! Everything else is silently skipped.

use thiserror::Error;
#[cfg(not(windows))]
use tracing::debug;

/// A key the forwarder knows how to press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualKey {
    /// `0`-`9` or `A`-`Z`; the virtual-key code equals the ASCII code
    Alphanumeric(u8),
    Space,
    Comma,
    Period,
    Backspace,
    Tab,
    Return,
}

impl VirtualKey {
    /// Key for a decoded byte, if it has one
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte.to_ascii_uppercase() {
            b @ (b'0'..=b'9' | b'A'..=b'Z') => Some(VirtualKey::Alphanumeric(b)),
            b' ' => Some(VirtualKey::Space),
            b',' => Some(VirtualKey::Comma),
            b'.' => Some(VirtualKey::Period),
            0x08 => Some(VirtualKey::Backspace),
            b'\t' => Some(VirtualKey::Tab),
            b'\n' => Some(VirtualKey::Return),
            _ => None,
        }
    }

    /// Windows virtual-key code
    pub fn code(&self) -> u16 {
        match self {
            VirtualKey::Alphanumeric(b) => u16::from(*b),
            VirtualKey::Space => 0x20,
            VirtualKey::Comma => 0xBC,
            VirtualKey::Period => 0xBE,
            VirtualKey::Backspace => 0x08,
            VirtualKey::Tab => 0x09,
            VirtualKey::Return => 0x0D,
        }
    }
}

/// Keystroke injection failure
#[derive(Debug, Error)]
pub enum KeystrokeError {
    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("input injection rejected ({sent} of {expected} events accepted)")]
    Rejected { sent: u32, expected: u32 },
}

/// Destination for synthetic key presses
pub trait KeystrokeSink {
    /// Press and release `key`
    fn send(&mut self, key: VirtualKey) -> Result<(), KeystrokeError>;
}

/// Keystrokes delivered to the operating system's input queue
///
/// On platforms without an injection API the keys are only logged.
#[derive(Debug, Default)]
pub struct SystemKeystrokes;

impl SystemKeystrokes {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl KeystrokeSink for SystemKeystrokes {
    fn send(&mut self, key: VirtualKey) -> Result<(), KeystrokeError> {
        use std::mem::size_of;
        use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
            SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
            KEYEVENTF_KEYUP,
        };

        let event = |flags: KEYBD_EVENT_FLAGS| INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: key.code(),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let inputs = [event(0), event(KEYEVENTF_KEYUP)];

        // SAFETY: `inputs` is a valid, initialized array of INPUT structs and
        // the size argument matches its element type.
        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                size_of::<INPUT>() as i32,
            )
        };

        if sent as usize == inputs.len() {
            Ok(())
        } else {
            Err(KeystrokeError::Rejected {
                sent,
                expected: inputs.len() as u32,
            })
        }
    }
}

#[cfg(not(windows))]
impl KeystrokeSink for SystemKeystrokes {
    fn send(&mut self, key: VirtualKey) -> Result<(), KeystrokeError> {
        debug!("Keystroke {:?} (0x{:02X})", key, key.code());
        Ok(())
    }
}
