use tracing::{debug, info};

use crate::error::{DaemonError, Result};
use crate::protocol::KeyAction;

/// Шов для пути записи: реальное uinput-устройство в демоне,
/// записывающая заглушка в тестах сервиса инъекции.
pub trait KeyWriter: Send {
    /// Записать одно действие (нажатие или отпускание) в устройство
    fn write_action(&mut self, action: &KeyAction) -> Result<()>;
}

pub struct VirtualDevice {
    device: Option<uinput::Device>,
    device_name: String,
    dry_run: bool,
}

impl VirtualDevice {
    pub fn new(device_name: &str, dry_run: bool) -> Result<Self> {
        info!(
            "Инициализация VirtualDevice '{}' (dry_run: {})",
            device_name, dry_run
        );

        let device = if dry_run {
            None
        } else {
            Some(Self::create_virtual_device(device_name)?)
        };

        Ok(Self {
            device,
            device_name: device_name.to_string(),
            dry_run,
        })
    }

    fn create_virtual_device(device_name: &str) -> Result<uinput::Device> {
        info!(
            "Создание виртуального устройства uinput '{}' для инъекции клавиш",
            device_name
        );

        let virtual_device = uinput::default()?
            .name(device_name)
            .map_err(|e| {
                DaemonError::Internal(format!(
                    "Не удалось задать имя виртуального устройства '{}': {}",
                    device_name, e
                ))
            })?
            .event(uinput::event::Keyboard::All)
            .map_err(|e| {
                DaemonError::Internal(format!(
                    "Не удалось объявить клавиатурные события: {}",
                    e
                ))
            })?
            .create()
            .map_err(|e| {
                DaemonError::Internal(format!(
                    "Не удалось создать виртуальное устройство '{}': {}",
                    device_name, e
                ))
            })?;

        info!("Виртуальное устройство '{}' создано успешно", device_name);
        Ok(virtual_device)
    }
}

impl KeyWriter for VirtualDevice {
    fn write_action(&mut self, action: &KeyAction) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Действие инъекции: {:?}", action);
            return Ok(());
        }

        let device = self.device.as_mut().ok_or_else(|| {
            DaemonError::InjectionUnavailable("Виртуальное устройство недоступно".to_string())
        })?;

        let keycode = action.code as i32;
        let value = if action.press { 1 } else { 0 };

        // Событие клавиши (EV_KEY = 1)
        if let Err(e) = device.write(1, keycode, value) {
            return Err(DaemonError::Internal(format!(
                "Не удалось отправить событие клавиши {}: {}",
                keycode, e
            )));
        }

        // Синхронизация (EV_SYN), чтобы ядро доставило событие немедленно
        if let Err(e) = device.write(0, 0, 0) {
            return Err(DaemonError::Internal(format!(
                "Не удалось синхронизировать события: {}",
                e
            )));
        }

        debug!("Действие {:?} записано в виртуальное устройство", action);
        Ok(())
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if !self.dry_run {
            info!("Закрытие виртуального устройства '{}'", self.device_name);
        }
    }
}
