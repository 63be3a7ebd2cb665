use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Маппинг между символьными именами клавиш и кодами evdev.
/// Используется при разборе конфигурации целевой клавиши детектора.
pub struct KeycodeMap;

static KEY_NAME_TO_CODE: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Модификаторы — основные кандидаты на целевую клавишу
    map.insert("ctrl", 29); // KEY_LEFTCTRL
    map.insert("rightctrl", 97); // KEY_RIGHTCTRL
    map.insert("shift", 42); // KEY_LEFTSHIFT
    map.insert("rightshift", 54); // KEY_RIGHTSHIFT
    map.insert("alt", 56); // KEY_LEFTALT
    map.insert("rightalt", 100); // KEY_RIGHTALT
    map.insert("super", 125); // KEY_LEFTMETA
    map.insert("capslock", 58); // KEY_CAPSLOCK

    // Прочие допустимые цели
    map.insert("escape", 1); // KEY_ESC
    map.insert("space", 57); // KEY_SPACE
    map.insert("f12", 88); // KEY_F12

    map
});

static CODE_TO_KEY_NAME: Lazy<HashMap<u16, &'static str>> =
    Lazy::new(|| KEY_NAME_TO_CODE.iter().map(|(&name, &code)| (code, name)).collect());

impl KeycodeMap {
    /// Получить код клавиши по её имени
    pub fn get_keycode(key_name: &str) -> Result<u16, String> {
        let normalized = key_name.to_lowercase();
        KEY_NAME_TO_CODE
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| format!("Unknown key: {}", key_name))
    }

    /// Получить имя клавиши по её коду (для диагностики)
    pub fn get_key_name(keycode: u16) -> Option<&'static str> {
        CODE_TO_KEY_NAME.get(&keycode).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_key_mapping() {
        assert_eq!(KeycodeMap::get_keycode("ctrl").unwrap(), 29);
        assert_eq!(KeycodeMap::get_keycode("shift").unwrap(), 42);
        assert_eq!(KeycodeMap::get_keycode("super").unwrap(), 125);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(KeycodeMap::get_keycode("Ctrl").unwrap(), 29);
        assert_eq!(KeycodeMap::get_keycode("CAPSLOCK").unwrap(), 58);
    }

    #[test]
    fn test_reverse_mapping() {
        assert_eq!(KeycodeMap::get_key_name(29), Some("ctrl"));
        assert_eq!(KeycodeMap::get_key_name(42), Some("shift"));
        assert_eq!(KeycodeMap::get_key_name(9999), None);
    }

    #[test]
    fn test_invalid_key() {
        assert!(KeycodeMap::get_keycode("invalid_key").is_err());
    }
}
