use crate::keyboard::Key;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Key(Key),
    /// Ctrl-C: quits regardless of bindings or typing state.
    Interrupt,
}

pub fn translate(event: KeyEvent) -> Option<Input> {
    if event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c') {
        return Some(Input::Interrupt);
    }

    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Esc => Key::Esc,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        _ => return None,
    };
    Some(Input::Key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        let press = |code, modifiers| translate(KeyEvent::new(code, modifiers));
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(Input::Interrupt));
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::NONE), Some(Input::Key(Key::Char('c'))));
        assert_eq!(press(KeyCode::Char('S'), KeyModifiers::SHIFT), Some(Input::Key(Key::Char('S'))));
        assert_eq!(press(KeyCode::PageDown, KeyModifiers::NONE), Some(Input::Key(Key::PageDown)));
        assert_eq!(press(KeyCode::F(5), KeyModifiers::NONE), None);
    }
}
