use std::fmt;

/// A single keystroke as the dispatcher sees it. Space is `Char(' ')`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

/// One or two keys. Longer sequences are never produced.
pub type KeySequence = Vec<Key>;

pub const MAX_SEQUENCE_LEN: usize = 2;

const TOKENS: &[(&str, Key)] = &[
    ("<enter>", Key::Enter),
    ("<space>", Key::Char(' ')),
    ("<backspace>", Key::Backspace),
    ("<esc>", Key::Esc),
    ("<up>", Key::Up),
    ("<down>", Key::Down),
    ("<left>", Key::Left),
    ("<right>", Key::Right),
    ("<home>", Key::Home),
    ("<end>", Key::End),
    ("<pgup>", Key::PageUp),
    ("<pgdn>", Key::PageDown),
];

impl Key {
    pub fn digit(&self) -> Option<u32> {
        match self {
            Key::Char(c) => c.to_digit(10),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((token, _)) = TOKENS.iter().find(|(_, key)| key == self) {
            return f.write_str(token);
        }
        match self {
            Key::Char(c) => write!(f, "{}", c),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Parses a key-mapping string such as `"dd"`, `"G"`, `"<enter>"` or `"g<end>"`.
///
/// A `<` that does not start a known token is the literal character, so
/// `"<"` and `"<<"` parse as expected. Digits are rejected: they always feed
/// the repeat counter and can never be part of a sequence.
pub fn parse_sequence(text: &str) -> Option<KeySequence> {
    let mut keys = Vec::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        let token = TOKENS
            .iter()
            .find(|(token, _)| rest.get(..token.len()).is_some_and(|head| head.eq_ignore_ascii_case(token)));

        match token {
            Some((token, key)) => {
                keys.push(*key);
                rest = &rest[token.len()..];
            }
            None => {
                if c.is_ascii_digit() {
                    return None;
                }
                keys.push(Key::Char(c));
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if keys.is_empty() || keys.len() > MAX_SEQUENCE_LEN {
        None
    } else {
        Some(keys)
    }
}

pub fn sequence_string(sequence: &[Key]) -> String {
    sequence.iter().map(Key::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_and_tokens() {
        assert_eq!(parse_sequence("p"), Some(vec![Key::Char('p')]));
        assert_eq!(parse_sequence("dd"), Some(vec![Key::Char('d'), Key::Char('d')]));
        assert_eq!(parse_sequence("<space>"), Some(vec![Key::Char(' ')]));
        assert_eq!(parse_sequence("<Enter>"), Some(vec![Key::Enter]));
        assert_eq!(parse_sequence("g<end>"), Some(vec![Key::Char('g'), Key::End]));
    }

    #[test]
    fn test_lone_angle_brackets_are_literal() {
        assert_eq!(parse_sequence("<"), Some(vec![Key::Char('<')]));
        assert_eq!(parse_sequence(">"), Some(vec![Key::Char('>')]));
        assert_eq!(parse_sequence("<<"), Some(vec![Key::Char('<'), Key::Char('<')]));
    }

    #[test]
    fn test_rejects_bad_sequences() {
        assert_eq!(parse_sequence(""), None);
        assert_eq!(parse_sequence("abc"), None);
        assert_eq!(parse_sequence("3d"), None);
        assert_eq!(parse_sequence("<up><up><up>"), None);
    }

    #[test]
    fn test_sequence_string_round_trips_tokens() {
        let keys = parse_sequence("g<end>").unwrap();
        assert_eq!(sequence_string(&keys), "g<end>");
    }
}
