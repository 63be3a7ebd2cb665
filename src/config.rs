use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::services::keycode_map::KeycodeMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub input: InputConfig,
    pub detector: DetectorConfig,
    pub injection: InjectionConfig,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// "auto" — первая найденная клавиатура, иначе явный путь к /dev/input/event*
    pub device_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectorConfig {
    /// Целевая клавиша по символьному имени ("ctrl", "shift", ...)
    pub key: String,
    /// Окно двойного нажатия в миллисекундах
    pub window_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InjectionConfig {
    /// Таймаут записи последовательности в виртуальное устройство
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectConfig {
    /// Максимум попыток переоткрытия устройства после отключения
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
                filter: "dtap_rust=info".to_string(),
            },
            input: InputConfig {
                device_path: "auto".to_string(),
            },
            detector: DetectorConfig {
                key: "ctrl".to_string(),
                window_ms: 300,
            },
            injection: InjectionConfig {
                write_timeout_ms: 250,
            },
            reconnect: ReconnectConfig {
                max_attempts: 5,
                backoff_base_ms: 200,
                backoff_max_ms: 5000,
            },
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        // Слои: значения по умолчанию <- TOML-файл <- переменные окружения
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("DTAP_"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация детектора: имя клавиши должно быть известно
        if KeycodeMap::get_keycode(&self.detector.key).is_err() {
            anyhow::bail!("Неизвестная целевая клавиша: {}", self.detector.key);
        }

        if self.detector.window_ms == 0 {
            anyhow::bail!("window_ms должно быть больше 0");
        }

        if self.injection.write_timeout_ms == 0 {
            anyhow::bail!("write_timeout_ms должно быть больше 0");
        }

        if self.reconnect.max_attempts == 0 {
            anyhow::bail!("max_attempts должно быть минимум 1");
        }

        Ok(())
    }
}

impl DetectorConfig {
    /// Код целевой клавиши; валидность имени проверена в validate()
    pub fn target_code(&self) -> Result<u16> {
        KeycodeMap::get_keycode(&self.key)
            .map_err(|e| anyhow::anyhow!("Неизвестная целевая клавиша: {}", e))
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl InjectionConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl ReconnectConfig {
    /// Задержка перед попыткой n (нумерация с 1): экспоненциальный backoff с потолком
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let delay_ms = self
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.backoff_max_ms);
        Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_window_is_300ms() {
        let config = Config::default();
        assert_eq!(config.detector.window(), Duration::from_millis(300));
    }

    #[test]
    fn test_target_code_resolution() {
        let config = Config::default();
        // "ctrl" -> KEY_LEFTCTRL
        assert_eq!(config.detector.target_code().unwrap(), 29);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut config = Config::default();
        config.detector.key = "hyper".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.detector.window_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = Config::default();
        config.reconnect.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let reconnect = ReconnectConfig {
            max_attempts: 5,
            backoff_base_ms: 200,
            backoff_max_ms: 5000,
        };

        assert_eq!(reconnect.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(reconnect.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(reconnect.backoff_delay(3), Duration::from_millis(800));
        // Потолок
        assert_eq!(reconnect.backoff_delay(10), Duration::from_millis(5000));
        assert_eq!(reconnect.backoff_delay(40), Duration::from_millis(5000));
    }
}
