use std::time::{Duration, Instant};

use tracing::debug;

use crate::debug_if_enabled;
use crate::events::{KeyCode, KeyEvent, KeyState, TriggerEvent};

/// Детектор двойного нажатия целевой клавиши.
///
/// Чистый конечный автомат с двумя состояниями: Idle и Armed(момент
/// первого нажатия). Детерминированная функция входной последовательности
/// событий и настроенного окна; несработавшая пара — не ошибка, а
/// нормальный исход.
pub struct DoubleTapDetector {
    target_code: KeyCode,
    window: Duration,
    /// Момент первого квалифицирующего нажатия; None — состояние Idle.
    /// Инвариант: взведён не более одного раза одновременно.
    armed_since: Option<Instant>,
}

impl DoubleTapDetector {
    pub fn new(target_code: KeyCode, window: Duration) -> Self {
        Self {
            target_code,
            window,
            armed_since: None,
        }
    }

    /// Обработать одно событие клавиатуры.
    ///
    /// Переходы выполняются только на нажатиях целевой клавиши; любое
    /// событие другой клавиши в состоянии Armed сбрасывает ожидание пары
    /// (защита от ложных срабатываний при чередующемся вводе). Отпускания
    /// и автоповторы целевой клавиши читаются и игнорируются.
    pub fn process(&mut self, event: &KeyEvent) -> Option<TriggerEvent> {
        if event.code != self.target_code {
            if self.armed_since.is_some() {
                debug_if_enabled!(
                    "Сброс ожидания пары: событие другой клавиши {}",
                    event.code
                );
                self.armed_since = None;
            }
            return None;
        }

        if event.state != KeyState::Pressed {
            return None;
        }

        match self.armed_since {
            None => {
                debug_if_enabled!("Детектор взведён: первое нажатие {}", event.code);
                self.armed_since = Some(event.timestamp);
                None
            }
            Some(since) => {
                let elapsed = event.timestamp.duration_since(since);
                if elapsed <= self.window {
                    debug!(
                        "Двойное нажатие {} за {}мс",
                        event.code,
                        elapsed.as_millis()
                    );
                    self.armed_since = None;
                    Some(TriggerEvent)
                } else {
                    // Просроченная пара: считаем это свежим первым нажатием
                    debug_if_enabled!(
                        "Окно истекло ({}мс), перевзвод от текущего нажатия",
                        elapsed.as_millis()
                    );
                    self.armed_since = Some(event.timestamp);
                    None
                }
            }
        }
    }

    /// Сбросить состояние (вызывается при переоткрытии устройства:
    /// состояние детекции не переживает перезапуск чтения)
    pub fn reset(&mut self) {
        self.armed_since = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.armed_since.is_some()
    }
}
