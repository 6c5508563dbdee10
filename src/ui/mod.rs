// Terminal UI - playlists, tracks and queue side by side, status line below
// Raw mode and the alternate screen are restored on drop, panics included

pub mod app;
pub mod events;

pub use app::App;

use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Frame, Terminal};
use std::io;

/// Rows taken by borders and the status line around the list views.
const CHROME_ROWS: u16 = 5;

/// Owns the terminal for the lifetime of the UI.
pub struct TerminalManager {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    _restore: RestoreOnDrop,
}

struct RestoreOnDrop;

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
}

impl TerminalManager {
    pub fn new() -> Result<Self> {
        // A previous crash may have left raw mode on
        restore_terminal();

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            _restore: RestoreOnDrop,
        })
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    pub fn size(&self) -> Result<Rect> {
        let size = self.terminal.size()?;
        Ok(Rect::new(0, 0, size.width, size.height))
    }

    /// Lines visible in a list view; one page for PageUp/PageDown.
    pub fn list_height(&self) -> Result<usize> {
        Ok(usize::from(self.size()?.height.saturating_sub(CHROME_ROWS)).max(1))
    }
}

impl Drop for TerminalManager {
    fn drop(&mut self) {
        let _ = self.terminal.clear();
    }
}
