use thiserror::Error;

/// Коды выхода процесса: внешний супервизор перезапускает демон
/// при потере устройства или шины, но не при ошибке прав доступа.
pub const EXIT_PERMISSION: i32 = 2;
pub const EXIT_DEVICE_LOST: i32 = 3;
pub const EXIT_BUS: i32 = 4;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка uinput: {0}")]
    Uinput(#[from] uinput::Error),

    #[error("Ошибка D-Bus: {0}")]
    Bus(#[from] zbus::Error),

    #[error("Устройство недоступно: {0}")]
    DeviceUnavailable(String),

    #[error("Устройство отключено: {0}")]
    DeviceDisconnected(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Инъекция недоступна: {0}")]
    InjectionUnavailable(String),

    #[error("Некорректный запрос инъекции: {0}")]
    MalformedRequest(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl DaemonError {
    pub fn device_unavailable<T>(msg: impl Into<String>) -> Result<T> {
        Err(DaemonError::DeviceUnavailable(msg.into()))
    }

    /// Код завершения процесса для данной ошибки.
    /// Права доступа — фатально без перезапуска; потеря устройства или
    /// шины — фатально, перезапуск на усмотрение service manager.
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::DeviceUnavailable(_) | DaemonError::Permission(_) => EXIT_PERMISSION,
            DaemonError::DeviceDisconnected(_) => EXIT_DEVICE_LOST,
            DaemonError::Bus(_) => EXIT_BUS,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let permission = DaemonError::Permission("нет группы input".to_string());
        let lost = DaemonError::DeviceDisconnected("устройство извлечено".to_string());
        let bus = DaemonError::Bus(zbus::Error::InvalidReply);

        assert_eq!(permission.exit_code(), EXIT_PERMISSION);
        assert_eq!(lost.exit_code(), EXIT_DEVICE_LOST);
        assert_eq!(bus.exit_code(), EXIT_BUS);
        assert_ne!(EXIT_PERMISSION, EXIT_DEVICE_LOST);
        assert_ne!(EXIT_DEVICE_LOST, EXIT_BUS);
    }

    #[test]
    fn test_internal_error_is_generic_failure() {
        let err = DaemonError::Internal("что-то пошло не так".to_string());
        assert_eq!(err.exit_code(), 1);
    }
}
