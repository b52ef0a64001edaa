//! Terminal host: a crossterm display adapter for text labels.
//!
//! The adapter keeps one view per user. Surfaces write into those views and
//! mark the screen dirty; the renderer draws the active user's view as a
//! boxed grid.
//!
//! # Layout
//!
//! ```text
//! row 0            title bar
//! GRID_Y           ┌─────────┬─────────┐
//! GRID_Y + 1 + r   │ label   │ label   │   one line per grid row
//! GRID_Y + 1 + R   └─────────┴─────────┘
//! last row         status bar
//! ```

use std::cell::{Cell as Counter, RefCell};
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::{Rc, Weak};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use unicode_width::UnicodeWidthChar;

use crate::config::ColorScheme;
use crate::core::{Contents, UserId};
use crate::ui::{DisplayAdapter, Surface, SurfaceId};
use crate::wm::{MenuType, Window};

/// Left edge of the grid
pub const GRID_X: u16 = 2;
/// Top border of the grid
pub const GRID_Y: u16 = 2;
/// Columns per slot, including the separator
pub const CELL_WIDTH: u16 = 11;

/// Text payload shown in a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    /// Drawn in the title colors (buttons, borders)
    pub accent: bool,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            accent: false,
        }
    }

    pub fn accent(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            accent: true,
        }
    }
}

/// What the host currently shows for one user
#[derive(Debug, Clone)]
pub struct View {
    pub surface: SurfaceId,
    pub title: String,
    pub rows: usize,
    pub columns: usize,
    pub labels: Vec<Option<Label>>,
}

#[derive(Default)]
struct Screen {
    views: HashMap<UserId, View>,
    dirty: bool,
}

/// Display adapter drawing every menu type as a text grid
pub struct TerminalAdapter {
    screen: Rc<RefCell<Screen>>,
    next_id: Counter<u64>,
}

impl Default for TerminalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalAdapter {
    pub fn new() -> Self {
        Self {
            screen: Rc::new(RefCell::new(Screen::default())),
            next_id: Counter::new(1),
        }
    }

    /// Copy of the view shown to `user`
    pub fn view(&self, user: UserId) -> Option<View> {
        self.screen.borrow().views.get(&user).cloned()
    }

    /// Surface id and slot index under a screen position
    pub fn hit(&self, user: UserId, x: u16, y: u16) -> Option<(SurfaceId, usize)> {
        let screen = self.screen.borrow();
        let view = screen.views.get(&user)?;
        slot_at(view.rows, view.columns, x, y).map(|slot| (view.surface, slot))
    }

    /// Forget the view of a user who left
    pub fn forget(&self, user: UserId) {
        let mut screen = self.screen.borrow_mut();
        screen.views.remove(&user);
        screen.dirty = true;
    }

    pub fn mark_dirty(&self) {
        self.screen.borrow_mut().dirty = true;
    }

    /// Whether anything changed since the last call
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.screen.borrow_mut().dirty)
    }
}

impl DisplayAdapter<Label> for TerminalAdapter {
    fn supports(&self, _kind: MenuType) -> bool {
        true
    }

    fn open(&self, window: &Window<Label>, user: UserId, contents: &Contents<Label>) -> anyhow::Result<Rc<dyn Surface<Label>>> {
        let id = SurfaceId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let view = View {
            surface: id,
            title: window.title().to_string(),
            rows: contents.rows(),
            columns: contents.columns(),
            labels: contents.payloads().map(|(_, label)| label.cloned()).collect(),
        };
        let mut screen = self.screen.borrow_mut();
        screen.views.insert(user, view);
        screen.dirty = true;

        let surface: Rc<dyn Surface<Label>> = Rc::new(TerminalSurface {
            id,
            user,
            screen: Rc::downgrade(&self.screen),
        });
        Ok(surface)
    }
}

/// A user's grid on the terminal
pub struct TerminalSurface {
    id: SurfaceId,
    user: UserId,
    screen: Weak<RefCell<Screen>>,
}

impl TerminalSurface {
    /// Run `f` on this surface's view if it's still the one on screen
    fn with_view(&self, f: impl FnOnce(&mut View)) {
        let Some(screen) = self.screen.upgrade() else {
            return;
        };
        let mut screen = screen.borrow_mut();
        if let Some(view) = screen.views.get_mut(&self.user).filter(|v| v.surface == self.id) {
            f(view);
            screen.dirty = true;
        }
    }
}

impl Surface<Label> for TerminalSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn set_slot(&self, index: usize, item: Option<&Label>) {
        self.with_view(|view| {
            if let Some(slot) = view.labels.get_mut(index) {
                *slot = item.cloned();
            }
        });
    }

    fn resync(&self) {
        // The view already holds the engine's state, a redraw is enough
        self.with_view(|_| {});
    }

    fn close(&self) {
        let Some(screen) = self.screen.upgrade() else {
            return;
        };
        let mut screen = screen.borrow_mut();
        if screen.views.get(&self.user).map_or(false, |v| v.surface == self.id) {
            screen.views.remove(&self.user);
            screen.dirty = true;
        }
    }
}

/// Slot index under a screen position, for a `rows × columns` grid
pub fn slot_at(rows: usize, columns: usize, x: u16, y: u16) -> Option<usize> {
    let row = usize::from(y.checked_sub(GRID_Y + 1)?);
    let dx = x.checked_sub(GRID_X + 1)?;
    let column = usize::from(dx / CELL_WIDTH);
    // The last column of each cell is the separator
    if row >= rows || column >= columns || dx % CELL_WIDTH == CELL_WIDTH - 1 {
        return None;
    }
    Some(row * columns + column)
}

/// Truncate `text` to `width` display columns and pad it to exactly that
pub fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.extend(std::iter::repeat(' ').take(width - used));
    out
}

/// Renderer for the terminal host
pub struct TerminalRenderer {
    initialized: bool,
    pub color_scheme: ColorScheme,
}

impl TerminalRenderer {
    pub fn with_color_scheme(color_scheme: ColorScheme) -> Self {
        Self {
            initialized: false,
            color_scheme,
        }
    }

    /// Initialize the terminal
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            crossterm::terminal::EnterAlternateScreen,
            crossterm::event::EnableMouseCapture,
            Clear(ClearType::All)
        )?;
        stdout.flush()?;

        self.initialized = true;
        Ok(())
    }

    /// Cleanup
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }

        let mut stdout = io::stdout();
        write!(stdout, "\x1b[?7h")?; // Enable autowrap
        write!(stdout, "\x1b[?2026l")?; // End synchronized update (if active)
        stdout.flush()?;

        execute!(
            stdout,
            Show,
            crossterm::event::DisableMouseCapture,
            crossterm::terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        self.initialized = false;
        Ok(())
    }

    /// Draw the view of `user` with a status line
    pub fn render(&mut self, adapter: &TerminalAdapter, user: UserId, status: &str) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        let view = adapter.view(user);

        let mut stdout = io::stdout();
        with_frame(&mut stdout, |out| {
            execute!(out, Clear(ClearType::All))?;
            match &view {
                Some(view) => {
                    self.render_title(out, &view.title, width)?;
                    self.render_grid(out, view)?;
                }
                None => {
                    self.render_title(out, "", width)?;
                    execute!(out, MoveTo(GRID_X, GRID_Y))?;
                    write!(out, "No menu open for {} (press o)", user)?;
                }
            }
            self.render_status_bar(out, user, status, width, height)
        })
    }

    fn render_title<W: Write>(&self, out: &mut W, title: &str, width: u16) -> io::Result<()> {
        let cs = &self.color_scheme;
        execute!(
            out,
            MoveTo(0, 0),
            SetBackgroundColor(cs.title_bg.to_crossterm()),
            SetForegroundColor(cs.title_fg.to_crossterm())
        )?;
        write!(out, "{}", fit(&format!(" {}", title), width as usize))?;
        execute!(out, ResetColor)?;
        Ok(())
    }

    fn render_grid<W: Write>(&self, out: &mut W, view: &View) -> io::Result<()> {
        let cs = &self.color_scheme;
        let inner = usize::from(CELL_WIDTH - 1);

        execute!(out, SetForegroundColor(cs.border.to_crossterm()))?;
        execute!(out, MoveTo(GRID_X, GRID_Y))?;
        write!(out, "{}", border_line('┌', '┬', '┐', view.columns, inner))?;

        for row in 0..view.rows {
            execute!(out, MoveTo(GRID_X, GRID_Y + 1 + row as u16))?;
            for column in 0..view.columns {
                execute!(out, SetBackgroundColor(cs.cell_bg.to_crossterm()), SetForegroundColor(cs.border.to_crossterm()))?;
                write!(out, "│")?;
                match view.labels.get(row * view.columns + column).and_then(Option::as_ref) {
                    Some(label) if label.accent => {
                        execute!(out, SetBackgroundColor(cs.title_bg.to_crossterm()), SetForegroundColor(cs.title_fg.to_crossterm()))?;
                        write!(out, "{}", fit(&format!(" {}", label.text), inner))?;
                    }
                    Some(label) => {
                        execute!(out, SetForegroundColor(cs.cell_fg.to_crossterm()))?;
                        write!(out, "{}", fit(&format!(" {}", label.text), inner))?;
                    }
                    None => {
                        execute!(out, SetForegroundColor(cs.empty_fg.to_crossterm()))?;
                        write!(out, "{}", fit(" ·", inner))?;
                    }
                }
            }
            execute!(out, SetBackgroundColor(cs.cell_bg.to_crossterm()), SetForegroundColor(cs.border.to_crossterm()))?;
            write!(out, "│")?;
            execute!(out, ResetColor)?;
        }

        execute!(out, SetForegroundColor(cs.border.to_crossterm()))?;
        execute!(out, MoveTo(GRID_X, GRID_Y + 1 + view.rows as u16))?;
        write!(out, "{}", border_line('└', '┴', '┘', view.columns, inner))?;
        execute!(out, ResetColor)?;
        Ok(())
    }

    fn render_status_bar<W: Write>(&self, out: &mut W, user: UserId, status: &str, width: u16, height: u16) -> io::Result<()> {
        let cs = &self.color_scheme;
        execute!(out, MoveTo(0, height.saturating_sub(1)))?;

        let badge = format!(" {} ", user);
        execute!(
            out,
            SetBackgroundColor(cs.status_user_bg.to_crossterm()),
            SetForegroundColor(cs.status_user_fg.to_crossterm())
        )?;
        write!(out, "{}", badge)?;

        execute!(
            out,
            SetBackgroundColor(cs.status_bar_bg.to_crossterm()),
            SetForegroundColor(cs.status_bar_fg.to_crossterm())
        )?;
        let shortcuts = "Tab: user  Esc: close  o: open  q: quit ";
        let rest = (width as usize).saturating_sub(badge.len());
        let left = rest.saturating_sub(shortcuts.len());
        write!(out, "{}{}", fit(&format!(" {}", status), left), fit(shortcuts, rest - left))?;

        execute!(out, ResetColor)?;
        Ok(())
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn border_line(left: char, joint: char, right: char, columns: usize, inner: usize) -> String {
    let segment: String = std::iter::repeat('─').take(inner).collect();
    let mut line = String::new();
    line.push(left);
    line.push_str(&vec![segment; columns].join(&joint.to_string()));
    line.push(right);
    line
}

/// Begin a render frame (synchronized update, hide cursor, disable autowrap)
fn begin_frame<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\x1b[?2026h")?; // Begin synchronized update
    write!(out, "\x1b[?7l")?; // Disable autowrap
    execute!(out, Hide)?;
    Ok(())
}

/// End a render frame (enable autowrap, end synchronized update, flush)
fn end_frame<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\x1b[?7h")?;
    write!(out, "\x1b[?2026l")?;
    out.flush()?;
    Ok(())
}

/// Execute a render operation with frame guards, ensuring cleanup on error
fn with_frame<W: Write, F, R>(out: &mut W, f: F) -> io::Result<R>
where
    F: FnOnce(&mut W) -> io::Result<R>,
{
    begin_frame(out)?;
    let result = f(out);
    let _ = end_frame(out);
    result
}
