use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info, warn};
use zbus::Connection;

use crate::config::{Config, ReconnectConfig};
use crate::error::{DaemonError, Result};
use crate::events::KeyCode;
use crate::protocol;
use crate::services::injector::{InjectionService, SharedWriter};
use crate::services::virtual_device::{KeyWriter, VirtualDevice};
use crate::services::{DeviceReader, DoubleTapDetector, SignalEmitter};

/// Супервизор демона: владеет процесс-глобальными ресурсами (соединение
/// с шиной, хэндл виртуального устройства, читатель клавиатуры) и
/// жизненным циклом. Компоненты получают ресурсы по ссылке или через
/// разделяемый хэндл — амбиентных синглтонов нет.
pub struct Supervisor {
    config: Arc<Config>,
    connection: Connection,
}

impl Supervisor {
    /// Создать ресурсы процесса. Отказ шины фатален (демон без шины
    /// бесполезен). Отказ создания uinput-устройства деградирует только
    /// инъекцию: writer остаётся пустым, каждый вызов InjectKeys будет
    /// отвечать InjectionUnavailable, детекция продолжает работать.
    pub async fn new(config: Arc<Config>, dry_run: bool) -> Result<Self> {
        info!("Инициализация супервизора (dry_run: {})", dry_run);

        let writer: SharedWriter =
            match VirtualDevice::new("DTap Virtual Device", dry_run) {
                Ok(device) => Arc::new(Mutex::new(Some(
                    Box::new(device) as Box<dyn KeyWriter + Send>
                ))),
                Err(e) => {
                    warn!("Виртуальное устройство не создано: {}", e);
                    warn!("Инъекция будет недоступна до перезапуска демона");
                    Arc::new(Mutex::new(None))
                }
            };

        let injector =
            InjectionService::new(Arc::clone(&writer), config.injection.write_timeout());

        let connection = zbus::connection::Builder::session()?
            .name(protocol::BUS_NAME)?
            .serve_at(protocol::OBJECT_PATH, injector)?
            .build()
            .await?;

        info!(
            "Шина подключена: имя {}, объект {}",
            protocol::BUS_NAME,
            protocol::OBJECT_PATH
        );

        Ok(Self { config, connection })
    }

    /// Контур детекции: чтение → детектор → эмиссия сигнала, всё
    /// последовательно (работа на событие — O(1), отдельный воркер не
    /// нужен). Работает до конца жизни демона; выходит только с ошибкой.
    pub async fn run(self) -> Result<()> {
        let target_code = self.config.detector.target_code()?;
        let mut detector =
            DoubleTapDetector::new(KeyCode::new(target_code), self.config.detector.window());
        let emitter = SignalEmitter::new(&self.connection);

        // Стартовое открытие: DeviceUnavailable здесь фатальна без повторов —
        // обычно это отсутствие членства в группе, а не преходящее состояние
        let mut reader = DeviceReader::open(&self.config.input.device_path)?;
        info!(
            "Контур детекции запущен: устройство '{}', клавиша {}, окно {}мс",
            reader.device_name(),
            self.config.detector.key,
            self.config.detector.window_ms
        );

        loop {
            match reader.next_key_event().await {
                Ok(Some(event)) => {
                    if let Some(trigger) = detector.process(&event) {
                        emitter.emit_trigger(trigger).await?;
                    }
                }
                Ok(None) => {}
                Err(DaemonError::DeviceDisconnected(msg)) => {
                    warn!("{}", msg);
                    drop(reader);
                    reader = Self::reacquire(&self.config.reconnect, || {
                        DeviceReader::open(&self.config.input.device_path)
                    })
                    .await?;
                    // Состояние детекции не переживает перезапуск чтения
                    detector.reset();
                    info!("Устройство переоткрыто: '{}'", reader.device_name());
                }
                Err(e) => {
                    error!("Ошибка чтения событий: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Ограниченное переоткрытие устройства с экспоненциальным backoff.
    /// Исчерпание попыток — фатально: процесс выходит с кодом потери
    /// устройства, перезапуск демона целиком решает service manager.
    async fn reacquire<T, F>(policy: &ReconnectConfig, mut open: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        for attempt in 1..=policy.max_attempts {
            let delay = policy.backoff_delay(attempt);
            info!(
                "Попытка переоткрытия {}/{} через {}мс",
                attempt,
                policy.max_attempts,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;

            match open() {
                Ok(value) => return Ok(value),
                Err(e) => warn!("Попытка {} не удалась: {}", attempt, e),
            }
        }

        Err(DaemonError::DeviceDisconnected(format!(
            "устройство не вернулось после {} попыток",
            policy.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_DEVICE_LOST;

    fn fast_policy(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts,
            backoff_base_ms: 1,
            backoff_max_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_reacquire_is_bounded() {
        let policy = fast_policy(3);
        let mut attempts = 0u32;

        let result: Result<()> = Supervisor::reacquire(&policy, || {
            attempts += 1;
            Err(DaemonError::DeviceDisconnected("нет устройства".to_string()))
        })
        .await;

        assert_eq!(attempts, 3);
        let err = result.unwrap_err();
        assert!(matches!(err, DaemonError::DeviceDisconnected(_)));
        assert_eq!(err.exit_code(), EXIT_DEVICE_LOST);
    }

    #[tokio::test]
    async fn test_reacquire_succeeds_mid_retry() {
        let policy = fast_policy(5);
        let mut attempts = 0u32;

        let result = Supervisor::reacquire(&policy, || {
            attempts += 1;
            if attempts < 3 {
                Err(DaemonError::DeviceDisconnected("ещё нет".to_string()))
            } else {
                Ok(42u32)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }
}
