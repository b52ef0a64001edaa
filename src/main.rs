//! slotmenu - terminal demo host for the grid menu engine
//!
//! Shows a paginated catalogue menu to two simulated users sharing one
//! terminal. Every interaction goes through the engine's event router, so
//! the status line shows which clicks the menu allowed and which it
//! cancelled.
//!
//! # Controls
//!
//! | Input | Action |
//! |-------|--------|
//! | Left click | Pick up |
//! | Right click | Pick up half |
//! | Shift + click | Move to other side (stars catalogue entries) |
//! | Double click | Collect to cursor (always cancelled) |
//! | Drag | Spread over slots |
//! | Tab | Switch user |
//! | Esc | Close the menu from the host side |
//! | o | Open the catalogue |
//! | x | Disconnect the current user |
//! | q | Shut down |

use std::env;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use slotmenu::config::{ColorScheme, Config};
use slotmenu::core::{Cell, Contents, IterOrder, Pattern, SlotPos, UserId};
use slotmenu::ui::{
    ClickAction, ClickEvent, CloseEvent, DragEvent, EventRouter, HostShutdown, Label, Modifiers, MouseButton,
    OpenEvent, TerminalAdapter, TerminalRenderer, UserLeft,
};
use slotmenu::wm::{ContentProvider, Listener, MenuManager, MenuType, Window};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Two clicks on the same slot within this window collect to cursor
const DOUBLE_CLICK: Duration = Duration::from_millis(300);

/// Number of catalogue entries
const CATALOGUE_SIZE: usize = 64;

fn print_help() {
    eprintln!("slotmenu {} - grid menu engine demo", VERSION);
    eprintln!();
    eprintln!("Usage: slotmenu [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --theme <NAME>    Color scheme ({})", ColorScheme::list().join(", "));
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Controls:");
    eprintln!("  Click                 Pick up (right: half, shift: move, double: collect)");
    eprintln!("  Tab                   Switch between the two demo users");
    eprintln!("  Esc                   Close the menu");
    eprintln!("  o                     Open the catalogue");
    eprintln!("  x                     Disconnect the current user");
    eprintln!("  q                     Quit");
    eprintln!();
    eprintln!("Configuration: ~/.slotmenu/config.toml");
    eprintln!("Log file:      ~/.slotmenu/slotmenu.log");
}

fn parse_args(config: &mut Config) -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                eprintln!("slotmenu {}", VERSION);
                std::process::exit(0);
            }
            "-t" | "--theme" => {
                i += 1;
                let name = args.get(i).ok_or("Missing theme argument")?;
                config.color_scheme = name.clone();
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }
    Ok(())
}

/// Log to `~/.slotmenu/slotmenu.log`, filtered by the configured level
fn init_logging(config: &Config) {
    let log_path = Config::data_dir()
        .map(|dir| dir.join("slotmenu.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("slotmenu.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Err(e) = parse_args(&mut config) {
        eprintln!("Error: {}", e);
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    }

    init_logging(&config);
    info!("slotmenu {} starting", VERSION);

    run(config)
}

fn run(config: Config) -> anyhow::Result<()> {
    let tick = Duration::from_millis(config.refresh_interval_ms.max(1));
    let mut renderer = TerminalRenderer::with_color_scheme(config.get_color_scheme());

    let manager = MenuManager::new(config);
    let adapter = Rc::new(TerminalAdapter::new());
    manager.register_adapter(adapter.clone());

    let catalogue = catalogue_window(&manager)?;
    let mut host = Host {
        router: EventRouter::new(manager.clone()),
        adapter: adapter.clone(),
        catalogue,
        users: [UserId(1), UserId(2)],
        active: 0,
        last_click: None,
        status: String::from("Welcome"),
    };
    for user in host.users {
        host.open_catalogue(user)?;
    }

    renderer.init().context("Failed to initialize terminal")?;
    let mut last_tick = Instant::now();

    loop {
        if adapter.take_dirty() {
            renderer.render(&adapter, host.user(), &host.status)?;
        }

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !host.on_key(key)? {
                        break;
                    }
                }
                Event::Mouse(mouse) => host.on_mouse(mouse),
                Event::Resize(..) => adapter.mark_dirty(),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick {
            manager.tick();
            last_tick = Instant::now();
        }
    }

    renderer.cleanup()?;
    info!("slotmenu exiting");
    Ok(())
}

/// Simulated host: two users sharing the terminal
struct Host {
    router: EventRouter<Label>,
    adapter: Rc<TerminalAdapter>,
    catalogue: Rc<Window<Label>>,
    users: [UserId; 2],
    active: usize,
    last_click: Option<(UserId, usize, Instant)>,
    status: String,
}

impl Host {
    fn user(&self) -> UserId {
        self.users[self.active]
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
        self.adapter.mark_dirty();
    }

    fn open_catalogue(&mut self, user: UserId) -> anyhow::Result<()> {
        if let Some(surface) = self.catalogue.open(user)? {
            self.router.on_open(&OpenEvent { user, surface });
        }
        Ok(())
    }

    /// Returns false when the host should exit
    fn on_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        let user = self.user();
        match key.code {
            KeyCode::Char('q') => {
                self.router.on_shutdown(&HostShutdown);
                return Ok(false);
            }
            KeyCode::Tab => {
                self.active = (self.active + 1) % self.users.len();
                self.set_status(format!("Switched to {}", self.user()));
            }
            KeyCode::Esc => {
                if let Some(view) = self.adapter.view(user) {
                    // The host takes its view down first, then reports it
                    self.adapter.forget(user);
                    self.router.on_close(&CloseEvent {
                        user,
                        surface: Some(view.surface),
                    });
                    self.set_status(format!("Closed menu of {}", user));
                }
            }
            KeyCode::Char('o') => {
                if self.router.manager().window(user).is_none() {
                    self.open_catalogue(user)?;
                    self.set_status(format!("Opened catalogue for {}", user));
                }
            }
            KeyCode::Char('x') => {
                self.router.on_user_left(&UserLeft { user });
                self.adapter.forget(user);
                self.set_status(format!("{} disconnected", user));
            }
            _ => {}
        }
        Ok(true)
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let user = self.user();
        let Some((surface, slot)) = self.adapter.hit(user, mouse.column, mouse.row) else {
            return;
        };

        match mouse.kind {
            MouseEventKind::Down(button) => {
                let modifiers = Modifiers::from(mouse.modifiers);
                let button = match button {
                    event::MouseButton::Left => MouseButton::Left,
                    event::MouseButton::Right => MouseButton::Right,
                    event::MouseButton::Middle => MouseButton::Middle,
                };
                let repeated = matches!(self.last_click, Some((u, s, at)) if u == user && s == slot && at.elapsed() < DOUBLE_CLICK);
                self.last_click = Some((user, slot, Instant::now()));

                let action = if repeated {
                    ClickAction::CollectToCursor
                } else if modifiers.contains(Modifiers::SHIFT) {
                    ClickAction::MoveToOther
                } else {
                    match button {
                        MouseButton::Left => ClickAction::Pickup,
                        MouseButton::Right => ClickAction::PickupHalf,
                        MouseButton::Middle => ClickAction::Nothing,
                    }
                };

                let mut click = ClickEvent::new(surface, user, slot, action)
                    .with_button(button)
                    .with_modifiers(modifiers);
                let status = match self.router.on_click(&mut click) {
                    Ok(_) => format!(
                        "{:?} on slot {}: {}",
                        action,
                        slot,
                        if click.is_cancelled() { "cancelled" } else { "allowed" }
                    ),
                    Err(e) => {
                        warn!("Click handler failed: {}", e);
                        format!("Error: {}", e)
                    }
                };
                self.set_status(status);
            }
            MouseEventKind::Drag(_) => {
                let mut drag = DragEvent::new(user, vec![slot]);
                self.router.on_drag(&mut drag);
                if drag.is_cancelled() {
                    self.set_status(format!("Drag over slot {} cancelled", slot));
                }
            }
            _ => {}
        }
    }
}

// ----------------------------------------------------------------------
// Demo menus
// ----------------------------------------------------------------------

/// Catalogue frame. `.` marks page slots, `i` the page indicator.
const FRAME: [&str; 6] = [
    "#########",
    "#.......#",
    "#.......#",
    "#.......#",
    "#.......#",
    "#<##i##>#",
];

fn catalogue_window(manager: &MenuManager<Label>) -> anyhow::Result<Rc<Window<Label>>> {
    let window = Window::builder()
        .id("catalogue")
        .title("Catalogue")
        .kind(MenuType::Chest)
        .size(FRAME.len(), FRAME[0].len())
        .provider(Catalogue::new()?)
        .listener(Listener::on_open(|event, _| info!("Catalogue shown to {} on {}", event.user, event.surface)))
        .listener(Listener::on_close(|event, _| info!("Catalogue closed for {}", event.user)))
        .manager(manager)
        .build()?;
    Ok(window)
}

struct Catalogue {
    frame: Pattern<Cell<Label>>,
}

impl Catalogue {
    fn new() -> anyhow::Result<Self> {
        let frame = Pattern::new(&FRAME)?
            .attach('#', Cell::display(Label::accent("")))
            .attach(
                '<',
                Cell::new(Label::accent("< Prev"), |ctx| {
                    ctx.contents.pagination_mut().previous();
                    show_page(ctx.contents)
                }),
            )
            .attach(
                '>',
                Cell::new(Label::accent("Next >"), |ctx| {
                    ctx.contents.pagination_mut().next();
                    show_page(ctx.contents)
                }),
            );
        Ok(Self { frame })
    }
}

impl ContentProvider<Label> for Catalogue {
    fn init(&self, contents: &mut Contents<Label>, _manager: &MenuManager<Label>) -> anyhow::Result<()> {
        contents.fill_pattern(&self.frame, (0, 0));
        if let Some(pos) = self.frame.find_key('i') {
            contents.set_property("indicator", pos);
        }

        let slots_per_page = self.frame.find_all_keys('.').len();
        contents
            .pagination_mut()
            .set_items_per_page(slots_per_page)
            .set_items((1..=CATALOGUE_SIZE).map(entry).collect());
        show_page(contents)
    }

    fn update(&self, contents: &mut Contents<Label>, _manager: &MenuManager<Label>) -> anyhow::Result<()> {
        let ticks = contents.property_or("ticks", 0u64) + 1;
        contents.set_property("ticks", ticks);
        if ticks % 10 == 0 {
            show_indicator(contents, ticks / 10);
        }
        Ok(())
    }
}

/// Place the current page into the frame's interior
fn show_page(contents: &mut Contents<Label>) -> anyhow::Result<()> {
    let mut iter = contents.new_iterator(None, IterOrder::RowMajor, (1, 1))?;
    iter.allow_override(true);
    for row in 1..contents.rows() - 1 {
        iter.blacklist((row, 0)).blacklist((row, contents.columns() - 1));
    }
    contents.add_page_to_iterator(&mut iter);
    let ticks = contents.property_or("ticks", 0u64);
    show_indicator(contents, ticks / 10);
    Ok(())
}

fn show_indicator(contents: &mut Contents<Label>, phase: u64) {
    let Some(pos) = contents.property::<SlotPos>("indicator").copied() else {
        return;
    };
    let spinner = ['|', '/', '-', '\\'][(phase % 4) as usize];
    let pagination = contents.pagination();
    let text = format!("{} {}/{}", spinner, pagination.current() + 1, pagination.page_count().max(1));
    contents.set(pos, Some(Cell::display(Label::accent(text))));
}

/// Catalogue entry opening its detail menu
fn entry(n: usize) -> Cell<Label> {
    let name = format!("Item {:02}", n);
    Cell::new(Label::new(name.clone()), move |ctx| {
        if ctx.event.modifiers.contains(Modifiers::SHIFT) {
            // Star it in place; the page keeps the plain label
            let starred = Cell::new(Label::new(format!("*{}", name)), |_| Ok(()));
            ctx.contents.set(ctx.slot, Some(starred));
            return Ok(());
        }

        let details = Window::builder()
            .id("details")
            .title(format!("{} details", name))
            .size(3, 9)
            .parent(ctx.contents.window().cloned())
            .provider(Details { name: name.clone() })
            .manager(ctx.manager)
            .build()?;
        details.open(ctx.user)?;
        Ok(())
    })
}

struct Details {
    name: String,
}

impl ContentProvider<Label> for Details {
    fn init(&self, contents: &mut Contents<Label>, _manager: &MenuManager<Label>) -> anyhow::Result<()> {
        contents.fill_borders(Cell::display(Label::accent("")));
        contents.set(
            (1, 1),
            Some(Cell::new(Label::accent("< Back"), |ctx| {
                ctx.manager.open_parent(ctx.user)?;
                Ok(())
            })),
        );
        contents.set((1, 3), Some(Cell::display(Label::new(self.name.clone()))));
        contents.set((1, 5), Some(Cell::display(Label::new(format!("for {}", contents.user())))));
        // Free slot the user may take things in and out of
        contents.set_editable((1, 7), true);
        Ok(())
    }
}
