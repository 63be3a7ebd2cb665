use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DaemonError, Result};
use crate::protocol::{self, BusError, KeyAction};
use crate::services::virtual_device::KeyWriter;

/// Разделяемый хэндл пути записи. None — виртуальное устройство не
/// открыто, каждая попытка инъекции отвечает InjectionUnavailable.
pub type SharedWriter = Arc<Mutex<Option<Box<dyn KeyWriter + Send>>>>;

/// Сервис инъекции: единственный метод шины, принимающий упорядоченную
/// последовательность действий и пишущий её в виртуальное устройство.
///
/// Обработчики вызываются на потоках рантайма шины и могут выполняться
/// конкурентно; мьютекс вокруг writer гарантирует, что пара
/// нажатие/отпускание одного вызова не перемежается с парой другого.
/// Путь детекции этот мьютекс не трогает.
pub struct InjectionService {
    writer: SharedWriter,
    write_timeout: Duration,
}

impl InjectionService {
    pub fn new(writer: SharedWriter, write_timeout: Duration) -> Self {
        Self {
            writer,
            write_timeout,
        }
    }

    /// Выполнить запрос: валидация до каких-либо записей, затем записи
    /// строго в порядке запроса, без переупорядочивания и склейки.
    /// Запись идёт на блокирующем потоке под таймаутом, чтобы зависшее
    /// устройство не заклинило обработчики шины.
    pub async fn inject(&self, actions: Vec<KeyAction>) -> Result<()> {
        protocol::validate_request(&actions)?;

        debug!("Запрос инъекции: {} действий", actions.len());

        let writer = Arc::clone(&self.writer);
        let write_task = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut guard = writer.lock();
            let writer = guard.as_mut().ok_or_else(|| {
                DaemonError::InjectionUnavailable(
                    "виртуальное устройство не открыто".to_string(),
                )
            })?;

            for action in &actions {
                writer.write_action(action)?;
            }

            Ok(())
        });

        match tokio::time::timeout(self.write_timeout, write_task).await {
            Err(_) => {
                warn!(
                    "Таймаут записи инъекции ({}мс)",
                    self.write_timeout.as_millis()
                );
                Err(DaemonError::InjectionUnavailable(format!(
                    "таймаут записи {}мс",
                    self.write_timeout.as_millis()
                )))
            }
            Ok(Err(e)) => Err(DaemonError::Internal(format!(
                "задача записи прервана: {}",
                e
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

#[zbus::interface(name = "org.dtap.Daemon1")]
impl InjectionService {
    /// InjectKeys(a(qb)) -> (). Синхронный с точки зрения вызывающего:
    /// успешный ответ означает, что записи сброшены в устройство.
    async fn inject_keys(&self, actions: Vec<KeyAction>) -> std::result::Result<(), BusError> {
        info!("InjectKeys: {} действий", actions.len());

        self.inject(actions).await.map_err(|e| match e {
            DaemonError::MalformedRequest(msg) => BusError::MalformedRequest(msg),
            DaemonError::InjectionUnavailable(msg) => BusError::InjectionUnavailable(msg),
            other => BusError::InjectionUnavailable(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::paste_sequence;

    /// Записывающая заглушка: фиксирует действия в порядке записи
    struct RecordingWriter {
        log: Arc<Mutex<Vec<KeyAction>>>,
    }

    impl KeyWriter for RecordingWriter {
        fn write_action(&mut self, action: &KeyAction) -> Result<()> {
            self.log.lock().push(*action);
            Ok(())
        }
    }

    /// Заглушка с медленной записью для проверки таймаута
    struct SlowWriter;

    impl KeyWriter for SlowWriter {
        fn write_action(&mut self, _action: &KeyAction) -> Result<()> {
            std::thread::sleep(Duration::from_millis(100));
            Ok(())
        }
    }

    fn open_writer() -> (SharedWriter, Arc<Mutex<Vec<KeyAction>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer: SharedWriter = Arc::new(Mutex::new(Some(Box::new(RecordingWriter {
            log: Arc::clone(&log),
        }) as Box<dyn KeyWriter + Send>)));
        (writer, log)
    }

    fn closed_writer() -> SharedWriter {
        Arc::new(Mutex::new(None))
    }

    #[tokio::test]
    async fn test_paste_request_writes_all_actions_in_order() {
        let (writer, log) = open_writer();
        let service = InjectionService::new(writer, Duration::from_millis(500));

        service.inject(paste_sequence()).await.unwrap();

        assert_eq!(*log.lock(), paste_sequence());
    }

    #[tokio::test]
    async fn test_closed_device_returns_unavailable() {
        let service = InjectionService::new(closed_writer(), Duration::from_millis(500));

        let result = service.inject(paste_sequence()).await;
        assert!(matches!(
            result,
            Err(DaemonError::InjectionUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_request_rejected_before_any_write() {
        let (writer, log) = open_writer();
        let service = InjectionService::new(writer, Duration::from_millis(500));

        let result = service.inject(Vec::new()).await;
        assert!(matches!(result, Err(DaemonError::MalformedRequest(_))));
        assert!(log.lock().is_empty());

        let result = service.inject(vec![KeyAction::down(0)]).await;
        assert!(matches!(result, Err(DaemonError::MalformedRequest(_))));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_write_timeout_surfaces_as_unavailable() {
        let writer: SharedWriter = Arc::new(Mutex::new(Some(
            Box::new(SlowWriter) as Box<dyn KeyWriter + Send>
        )));
        let service = InjectionService::new(writer, Duration::from_millis(20));

        let result = service.inject(paste_sequence()).await;
        assert!(matches!(
            result,
            Err(DaemonError::InjectionUnavailable(_))
        ));
    }
}
