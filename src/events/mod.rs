pub mod keyboard;

pub use keyboard::{KeyCode, KeyEvent, KeyState};

/// Срабатывание детектора двойного нажатия.
/// Маркер без полезной нагрузки: эмитируется один раз на квалифицирующую
/// пару нажатий и сразу потребляется эмиттером сигнала, без буферизации.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent;
