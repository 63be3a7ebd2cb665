use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Instant;

use evdev::{Device, EventStream, EventType};
use tracing::{error, info, warn};

use crate::error::{DaemonError, Result};
use crate::events::{KeyCode, KeyEvent, KeyState};
use crate::utils::DeviceFinder;

/// Читатель сырого клавиатурного устройства.
///
/// Открывает устройство с эксклюзивным захватом и отдаёт ленивую,
/// бесконечную, неперезапускаемую последовательность переходов клавиш.
/// Ошибки открытия не ретраятся на этом уровне — решение о повторных
/// попытках принимает супервизор.
pub struct DeviceReader {
    stream: EventStream,
    device_name: String,
}

impl DeviceReader {
    /// Открыть устройство по пути из конфигурации ("auto" — первая
    /// найденная клавиатура). Отсутствие пути или отказ в доступе —
    /// DeviceUnavailable, без повторов.
    pub fn open(device_path: &str) -> Result<Self> {
        let path = DeviceFinder::find_keyboard_device(device_path)?;

        let mut device = Device::open(&path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => DaemonError::DeviceUnavailable(format!(
                "Нет доступа к {:?}: {}. Добавьте пользователя в группу 'input'",
                path, e
            )),
            _ => DaemonError::DeviceUnavailable(format!(
                "Не удалось открыть устройство {:?}: {}",
                path, e
            )),
        })?;

        let device_name = device.name().unwrap_or("Unknown").to_string();

        match device.grab() {
            Ok(_) => Self::log_grabbed_device(&device),
            Err(e) => {
                Self::log_grab_error(&path, &e);
                return Err(DaemonError::DeviceUnavailable(format!(
                    "Не удалось захватить устройство эксклюзивно: {}",
                    e
                )));
            }
        }

        let stream = device.into_event_stream().map_err(|e| {
            DaemonError::DeviceUnavailable(format!(
                "Не удалось создать поток событий для {:?}: {}",
                path, e
            ))
        })?;

        Ok(Self {
            stream,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Вытянуть следующее событие. Не-клавиатурные события отдаются как
    /// None: их нужно вычитывать, чтобы не блокировать поток, но детектору
    /// они не интересны. ENODEV означает физическое отключение устройства
    /// и отличается от преходящей ошибки чтения.
    pub async fn next_key_event(&mut self) -> Result<Option<KeyEvent>> {
        let event = self.stream.next_event().await.map_err(|e| {
            if e.raw_os_error() == Some(libc::ENODEV) {
                DaemonError::DeviceDisconnected(format!(
                    "Устройство '{}' отключено: {}",
                    self.device_name, e
                ))
            } else {
                DaemonError::Io(e)
            }
        })?;

        if event.event_type() != EventType::KEY {
            return Ok(None);
        }

        let state = match KeyState::from_event_value(event.value()) {
            Some(state) => state,
            None => {
                warn!("Неизвестное значение события: {}", event.value());
                return Ok(None);
            }
        };

        Ok(Some(KeyEvent::new(
            KeyCode::new(event.code()),
            state,
            Instant::now(),
        )))
    }

    fn log_grabbed_device(device: &Device) {
        info!("Устройство: {}", device.name().unwrap_or("Unknown"));
        info!("Физический путь: {:?}", device.physical_path());
        info!("Устройство захвачено эксклюзивно");
    }

    fn log_grab_error(device_path: &PathBuf, e: &std::io::Error) {
        warn!(
            "Не удалось захватить устройство {}: {}",
            device_path.display(),
            e
        );
        warn!("Попробуйте:");
        warn!("1. Добавить пользователя в группу input: sudo usermod -a -G input $USER");
        warn!("2. Перезайти в систему после добавления в группу");
    }
}

impl Drop for DeviceReader {
    fn drop(&mut self) {
        info!("Освобождение захваченного устройства '{}'", self.device_name);
        if let Err(e) = self.stream.device_mut().ungrab() {
            error!("Не удалось освободить устройство: {}", e);
        }
    }
}
