use super::command::Command;
use super::key::{sequence_string, Key, KeySequence, MAX_SEQUENCE_LEN};
use super::keymap::KeyMap;
use super::View;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    OneKeyBuffered,
}

/// What a recognised sequence resolved to, plus the repeat counter as it
/// stood when the command fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub command: Command,
    pub count: u32,
}

impl Dispatch {
    /// How many times to repeat the action; 1 when no digits were typed.
    pub fn times(&self) -> u32 {
        self.count.max(1)
    }
}

/// Which text prompt the status line is collecting input for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Search,
    CreatePlaylist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Typed {
    Pending,
    Submitted(Prompt, String),
    Cancelled,
}

#[derive(Debug)]
struct LineInput {
    prompt: Prompt,
    line: String,
}

/// Turns raw keystrokes into commands for the focused view.
///
/// Holds at most one pending key. Digits never enter the buffer; they build
/// the repeat counter, which survives until a command fires.
#[derive(Debug)]
pub struct Dispatcher {
    keymap: KeyMap,
    buffer: KeySequence,
    count: u32,
    typing: Option<LineInput>,
}

impl Dispatcher {
    pub fn new(keymap: KeyMap) -> Self {
        Self {
            keymap,
            buffer: Vec::with_capacity(MAX_SEQUENCE_LEN),
            count: 0,
            typing: None,
        }
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn state(&self) -> DispatchState {
        if self.buffer.is_empty() {
            DispatchState::Idle
        } else {
            DispatchState::OneKeyBuffered
        }
    }

    pub fn repeat_count(&self) -> u32 {
        self.count
    }

    /// Feeds one keystroke. Calls `handler` at most once, and only when the
    /// buffered keys match a binding for `view`. Returns whether it fired.
    ///
    /// A two-key buffer that matches nothing is retried as its second key
    /// alone. A single key is only held if it can begin a two-key binding in
    /// this view; otherwise it is dropped and the dispatcher is idle again.
    pub fn key_pressed<F>(&mut self, view: View, key: Key, handler: F) -> bool
    where
        F: FnOnce(Dispatch),
    {
        if let Some(digit) = key.digit() {
            self.count = if self.count == 0 { digit } else { self.count.saturating_mul(10).saturating_add(digit) };
            trace!("Repeat counter now {}", self.count);
            return false;
        }

        self.buffer.push(key);

        if let Some(command) = self.keymap.lookup(view, &self.buffer) {
            self.buffer.clear();
            handler(Dispatch {
                command,
                count: self.count,
            });
            self.count = 0;
            return true;
        }

        if self.buffer.len() >= MAX_SEQUENCE_LEN {
            let second = self.buffer[1];
            trace!("{} is unbound in {:?}, retrying {}", sequence_string(&self.buffer), view, second);
            self.buffer.clear();
            return self.key_pressed(view, second, handler);
        }

        if !self.keymap.starts_sequence(view, key) {
            self.buffer.clear();
        }

        false
    }

    /// Drops any half-typed sequence and the repeat counter.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.count = 0;
    }

    pub fn start_typing(&mut self, prompt: Prompt) {
        self.reset();
        self.typing = Some(LineInput {
            prompt,
            line: String::new(),
        });
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    pub fn typed_line(&self) -> Option<(Prompt, &str)> {
        self.typing.as_ref().map(|input| (input.prompt, input.line.as_str()))
    }

    /// Feeds one keystroke to the line being typed. Enter submits the
    /// trimmed line (an empty line counts as cancelled), Esc cancels.
    pub fn type_key(&mut self, key: Key) -> Typed {
        let Some(input) = self.typing.as_mut() else {
            return Typed::Cancelled;
        };

        match key {
            Key::Char(c) => {
                input.line.push(c);
                Typed::Pending
            }
            Key::Backspace => {
                input.line.pop();
                Typed::Pending
            }
            Key::Enter => {
                let input = self.typing.take();
                match input {
                    Some(input) if !input.line.trim().is_empty() => {
                        Typed::Submitted(input.prompt, input.line.trim().to_string())
                    }
                    _ => Typed::Cancelled,
                }
            }
            Key::Esc => {
                self.typing = None;
                Typed::Cancelled
            }
            _ => Typed::Pending,
        }
    }
}
