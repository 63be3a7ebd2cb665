use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Состояние клавиши (значение evdev: 1/0/2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    Pressed,
    Released,
    Repeat,
}

impl KeyState {
    /// Преобразовать значение evdev-события в состояние клавиши
    pub fn from_event_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Released),
            1 => Some(KeyState::Pressed),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }
}

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

/// Событие клавиатуры: один физический переход, неизменяемое
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub state: KeyState,
    pub timestamp: Instant,
}

impl KeyEvent {
    pub fn new(code: KeyCode, state: KeyState, timestamp: Instant) -> Self {
        Self {
            code,
            state,
            timestamp,
        }
    }

    pub fn pressed(code: KeyCode, timestamp: Instant) -> Self {
        Self::new(code, KeyState::Pressed, timestamp)
    }

    pub fn released(code: KeyCode, timestamp: Instant) -> Self {
        Self::new(code, KeyState::Released, timestamp)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} ({}ms)",
            self.code,
            self.state,
            self.timestamp.elapsed().as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state_from_event_value() {
        assert_eq!(KeyState::from_event_value(0), Some(KeyState::Released));
        assert_eq!(KeyState::from_event_value(1), Some(KeyState::Pressed));
        assert_eq!(KeyState::from_event_value(2), Some(KeyState::Repeat));
        assert_eq!(KeyState::from_event_value(3), None);
        assert_eq!(KeyState::from_event_value(-1), None);
    }

    #[test]
    fn test_key_event_constructors() {
        let now = Instant::now();
        let press = KeyEvent::pressed(KeyCode::new(29), now);
        let release = KeyEvent::released(KeyCode::new(29), now);

        assert_eq!(press.state, KeyState::Pressed);
        assert_eq!(release.state, KeyState::Released);
        assert_eq!(press.code, release.code);
        assert_eq!(press.code.value(), 29);
    }
}
