use tracing::debug;
use zbus::Connection;

use crate::error::Result;
use crate::events::TriggerEvent;
use crate::protocol::{INTERFACE_NAME, OBJECT_PATH, SIGNAL_NAME};

/// Эмиттер широковещательного сигнала о двойном нажатии.
///
/// Доставка at-most-once без подтверждения: если слушателей нет, сигнал
/// просто теряется — UI-процесс присутствует тогда, когда переключение
/// имеет смысл, а пропущенный сигнал не оставляет висящего состояния.
/// Никаких повторов и буферизации; порядок эмиссии равен порядку детекции.
pub struct SignalEmitter {
    connection: Connection,
}

impl SignalEmitter {
    /// Соединение клонируется: zbus::Connection — разделяемый хэндл,
    /// владельцем остаётся супервизор.
    pub fn new(connection: &Connection) -> Self {
        Self {
            connection: connection.clone(),
        }
    }

    /// Опубликовать один триггер. Ошибка шины здесь фатальна для демона:
    /// без шины детекция бессмысленна, решение принимает супервизор.
    pub async fn emit_trigger(&self, _trigger: TriggerEvent) -> Result<()> {
        self.connection
            .emit_signal(
                None::<&str>,
                OBJECT_PATH,
                INTERFACE_NAME,
                SIGNAL_NAME,
                &(),
            )
            .await?;

        debug!("Сигнал {} опубликован", SIGNAL_NAME);
        Ok(())
    }
}
