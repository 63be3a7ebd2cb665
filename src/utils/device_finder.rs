use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{DaemonError, Result};

/// Поиск клавиатурного устройства в /dev/input.
///
/// Политика выбора — «первая перечисленная клавиатура побеждает».
/// Известное ограничение исходного дизайна: при нескольких клавиатурах
/// выбор неоднозначен; поведение сохранено намеренно, переопределяйте
/// устройство явным путём в конфигурации.
pub struct DeviceFinder;

impl DeviceFinder {
    /// Найти подходящее клавиатурное устройство
    pub fn find_keyboard_device(device_path: &str) -> Result<PathBuf> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            return if path.exists() {
                info!("Используется указанное устройство: {:?}", path);
                Ok(path)
            } else {
                DaemonError::device_unavailable(format!(
                    "Указанное устройство не найдено: {:?}",
                    path
                ))
            };
        }

        Self::find_first_keyboard()
    }

    /// Первое event-устройство с возможностями клавиатуры (EV_KEY)
    fn find_first_keyboard() -> Result<PathBuf> {
        info!("Автопоиск клавиатурного устройства...");

        let input_dir = Path::new("/dev/input");

        let entries = fs::read_dir(input_dir).map_err(|e| {
            DaemonError::Permission(format!("Нет доступа к /dev/input: {}", e))
        })?;

        let mut event_devices = Vec::new();

        for entry in entries {
            let entry = entry.map_err(DaemonError::Io)?;
            let path = entry.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

            if name.starts_with("event") {
                event_devices.push(path);
            }
        }

        // Сортируем по номеру: «первое перечисленное» должно быть стабильным
        event_devices.sort();

        for device_path in event_devices {
            debug!("Проверяем устройство: {:?}", device_path);

            if Self::is_keyboard_device(&device_path)? && Self::is_device_accessible(&device_path)
            {
                info!("Найдена клавиатура: {:?}", device_path);
                return Ok(device_path);
            }
        }

        DaemonError::device_unavailable(
            "Не удалось найти клавиатурное устройство. \
             Убедитесь, что пользователь добавлен в группу 'input'",
        )
    }

    /// Проба возможностей: у клавиатуры есть базовые клавиши и их много
    fn is_keyboard_device(device_path: &Path) -> Result<bool> {
        match evdev::Device::open(device_path) {
            Ok(device) => {
                let has_keys = device.supported_keys().map_or(false, |keys| {
                    let basic_keys = keys.contains(evdev::KeyCode::KEY_A)
                        && keys.contains(evdev::KeyCode::KEY_SPACE)
                        && keys.contains(evdev::KeyCode::KEY_ENTER);

                    let key_count = keys.iter().count();

                    basic_keys && key_count > 20
                });

                if has_keys {
                    debug!(
                        "Устройство {:?} подходит как клавиатура (имя: {:?})",
                        device_path,
                        device.name()
                    );
                } else {
                    debug!("Устройство {:?} не подходит как клавиатура", device_path);
                }

                Ok(has_keys)
            }
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                Ok(false)
            }
        }
    }

    fn is_device_accessible(device_path: &Path) -> bool {
        match fs::File::open(device_path) {
            Ok(_) => true,
            Err(e) => {
                debug!("Устройство {:?} недоступно: {}", device_path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_keyboard_device_with_missing_path() {
        let result = DeviceFinder::find_keyboard_device("/non/existent/path");
        assert!(matches!(result, Err(DaemonError::DeviceUnavailable(_))));
    }
}
