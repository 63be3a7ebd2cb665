//! Контракт шины между привилегированным демоном и непривилегированным
//! приложением. Обе стороны используют только этот модуль: имена интерфейса
//! фиксированы и версионированы, полезная нагрузка описана одним типом.

use serde::{Deserialize, Serialize};
use zbus::zvariant::Type;

use crate::error::{DaemonError, Result};

/// Well-known имя демона на сессионной шине
pub const BUS_NAME: &str = "org.dtap.Daemon";
/// Путь объекта демона
pub const OBJECT_PATH: &str = "/org/dtap/Daemon";
/// Версионированное имя интерфейса
pub const INTERFACE_NAME: &str = "org.dtap.Daemon1";
/// Имя широковещательного сигнала; сам факт сигнала — всё сообщение
pub const SIGNAL_NAME: &str = "DoubleTapped";

/// Верхняя граница длины запроса инъекции
pub const MAX_SEQUENCE_LEN: usize = 64;
/// Максимальный код клавиши evdev (KEY_MAX)
pub const MAX_KEY_CODE: u16 = 0x2ff;

// Коды клавиш канонической последовательности вставки
const KEY_LEFTCTRL: u16 = 29;
const KEY_V: u16 = 47;

/// Одно действие запроса инъекции. Сигнатура на шине: `(qb)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct KeyAction {
    pub code: u16,
    pub press: bool,
}

impl KeyAction {
    pub fn down(code: u16) -> Self {
        Self { code, press: true }
    }

    pub fn up(code: u16) -> Self {
        Self { code, press: false }
    }
}

/// Каноническая последовательность «вставить»: Ctrl-down, V-down, V-up, Ctrl-up
pub fn paste_sequence() -> Vec<KeyAction> {
    vec![
        KeyAction::down(KEY_LEFTCTRL),
        KeyAction::down(KEY_V),
        KeyAction::up(KEY_V),
        KeyAction::up(KEY_LEFTCTRL),
    ]
}

/// Проверить запрос инъекции до каких-либо записей в устройство
pub fn validate_request(actions: &[KeyAction]) -> Result<()> {
    if actions.is_empty() {
        return Err(DaemonError::MalformedRequest(
            "пустая последовательность действий".to_string(),
        ));
    }

    if actions.len() > MAX_SEQUENCE_LEN {
        return Err(DaemonError::MalformedRequest(format!(
            "последовательность длиннее {} действий: {}",
            MAX_SEQUENCE_LEN,
            actions.len()
        )));
    }

    for action in actions {
        if action.code == 0 || action.code > MAX_KEY_CODE {
            return Err(DaemonError::MalformedRequest(format!(
                "код клавиши вне диапазона evdev: {}",
                action.code
            )));
        }
    }

    Ok(())
}

/// Структурированные ошибки метода инъекции на шине
#[derive(Debug, zbus::DBusError)]
#[zbus(prefix = "org.dtap.Daemon")]
pub enum BusError {
    #[zbus(error)]
    ZBus(zbus::Error),
    InjectionUnavailable(String),
    MalformedRequest(String),
}

/// Клиентская сторона контракта: прокси для непривилегированного процесса
#[zbus::proxy(
    interface = "org.dtap.Daemon1",
    default_service = "org.dtap.Daemon",
    default_path = "/org/dtap/Daemon"
)]
pub trait Daemon1 {
    /// Синхронная (с точки зрения вызывающего) инъекция последовательности клавиш
    fn inject_keys(&self, actions: &[KeyAction]) -> zbus::Result<()>;

    /// Широковещательный сигнал детектора, без полезной нагрузки
    #[zbus(signal)]
    fn double_tapped(&self) -> zbus::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_action_wire_signature() {
        assert_eq!(KeyAction::SIGNATURE.to_string(), "(qb)");
        assert_eq!(<Vec<KeyAction>>::SIGNATURE.to_string(), "a(qb)");
    }

    #[test]
    fn test_paste_sequence_order() {
        let seq = paste_sequence();
        assert_eq!(
            seq,
            vec![
                KeyAction::down(29),
                KeyAction::down(47),
                KeyAction::up(47),
                KeyAction::up(29),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_empty_request() {
        let result = validate_request(&[]);
        assert!(matches!(result, Err(DaemonError::MalformedRequest(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_request() {
        let actions = vec![KeyAction::down(30); MAX_SEQUENCE_LEN + 1];
        let result = validate_request(&actions);
        assert!(matches!(result, Err(DaemonError::MalformedRequest(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_code() {
        let result = validate_request(&[KeyAction::down(0)]);
        assert!(matches!(result, Err(DaemonError::MalformedRequest(_))));

        let result = validate_request(&[KeyAction::down(MAX_KEY_CODE + 1)]);
        assert!(matches!(result, Err(DaemonError::MalformedRequest(_))));
    }

    #[test]
    fn test_validate_accepts_paste_sequence() {
        assert!(validate_request(&paste_sequence()).is_ok());
    }
}
