use std::fs;
use std::os::unix::fs::PermissionsExt;
use tracing::{info, warn};

use crate::error::{DaemonError, Result};

/// Проверить права доступа к необходимым ресурсам
pub fn check_permissions() -> Result<()> {
    info!("Проверка прав доступа...");

    // Доступ к /dev/input/ — источник событий клавиатуры
    check_input_devices_access()?;

    // Доступ к /dev/uinput — виртуальное устройство инъекции
    check_uinput_access();

    // Демон не должен работать от root (рекомендация безопасности)
    check_not_root();

    info!("Проверка прав доступа завершена успешно");
    Ok(())
}

fn check_input_devices_access() -> Result<()> {
    let input_dir = "/dev/input";

    if !std::path::Path::new(input_dir).exists() {
        return Err(DaemonError::Permission(format!(
            "Директория {} не существует",
            input_dir
        )));
    }

    match fs::read_dir(input_dir) {
        Ok(_) => {
            info!("Доступ к {} подтвержден", input_dir);
            Ok(())
        }
        Err(e) => Err(DaemonError::Permission(format!(
            "Нет доступа к {}: {}. Добавьте пользователя в группу 'input'",
            input_dir, e
        ))),
    }
}

/// Недоступность uinput не фатальна: без него деградирует только
/// инъекция (каждый вызов ответит ошибкой), детекция продолжит работать
fn check_uinput_access() {
    let uinput_device = "/dev/uinput";

    if !std::path::Path::new(uinput_device).exists() {
        warn!(
            "{} не существует, возможно модуль uinput не загружен",
            uinput_device
        );
        return;
    }

    match fs::metadata(uinput_device) {
        Ok(metadata) => {
            let permissions = metadata.permissions();
            let mode = permissions.mode();

            if mode & 0o006 == 0 && mode & 0o060 == 0 {
                warn!(
                    "Нет прав доступа к {}. Инъекция будет недоступна. \
                     Добавьте пользователя в группу 'uinput' или 'input'",
                    uinput_device
                );
            } else {
                info!("Доступ к {} подтвержден", uinput_device);
            }
        }
        Err(e) => {
            warn!(
                "Не удалось проверить права доступа к {}: {}",
                uinput_device, e
            );
        }
    }
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Демон запущен от имени root!");
            warn!("   Рекомендуется добавить пользователя в группы 'input' и 'uinput'");
            warn!("   и запускать демон от имени обычного пользователя:");
            warn!("   sudo usermod -a -G input,uinput $USER");
            warn!("   sudo modprobe uinput");
            warn!("   (затем перезайдите в систему)");
        }
        Ok(user) => {
            info!("Демон запущен от имени пользователя: {}", user);
        }
        Err(_) => {
            warn!("Не удалось определить пользователя");
        }
    }
}
