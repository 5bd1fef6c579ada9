use anyhow::{Context, Result};
use bunnies_core::{
    Rect as RoomRect,
    config::{ChaseMode, GameConfig, WorldConfig},
    environment::{Game, GameEvent, GameState, Input},
    room::{ObstacleKind, Room, Theme},
    world::World,
};
use clap::{Parser, ValueEnum};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use serde::Deserialize;
use std::{
    collections::VecDeque,
    io::{self, Stdout},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[command(version, about = "Bunnies: collect carrots, dodge foxes", long_about = None)]
struct Args {
    /// TOML file with optional [world] and [game] tables
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seed for room generation; random if omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override how foxes chase the player
    #[arg(long, value_enum)]
    chase: Option<ChaseArg>,

    /// Minimum level shown in the log panel
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChaseArg {
    Direct,
    Path,
}

impl From<ChaseArg> for ChaseMode {
    fn from(arg: ChaseArg) -> Self {
        match arg {
            ChaseArg::Direct => ChaseMode::Direct,
            ChaseArg::Path => ChaseMode::Pathfinding,
        }
    }
}

/// On-disk configuration; every table and key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    world: WorldConfig,
    game: GameConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

const LOG_CAPACITY: usize = 200;

/// Keeps recent log records in memory for the log panel; stderr is unusable
/// while the alternate screen is active.
struct PanelLogger {
    level: log::LevelFilter,
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl log::Log for PanelLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut lines) = self.lines.lock() {
            if lines.len() == LOG_CAPACITY {
                lines.pop_front();
            }
            lines.push_back(format!("{:<5} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

fn init_logging(level: log::LevelFilter) -> Result<Arc<Mutex<VecDeque<String>>>> {
    let lines = Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY)));
    log::set_boxed_logger(Box::new(PanelLogger {
        level,
        lines: Arc::clone(&lines),
    }))
    .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))?;
    log::set_max_level(level);
    Ok(lines)
}

/// Terminals only report key presses, so a direction stays held for a short
/// window after each press (auto-repeat keeps refreshing it).
const HOLD_WINDOW: Duration = Duration::from_millis(160);

#[derive(Debug, Default)]
struct HeldKeys {
    x: i8,
    y: i8,
    x_until: Option<Instant>,
    y_until: Option<Instant>,
    dash: bool,
}

impl HeldKeys {
    fn press_x(&mut self, x: i8) {
        self.x = x;
        self.x_until = Some(Instant::now() + HOLD_WINDOW);
    }

    fn press_y(&mut self, y: i8) {
        self.y = y;
        self.y_until = Some(Instant::now() + HOLD_WINDOW);
    }

    /// Input for this tick; expired directions are released.
    fn take(&mut self) -> Input {
        let now = Instant::now();
        if self.x_until.is_some_and(|t| now > t) {
            self.x = 0;
            self.x_until = None;
        }
        if self.y_until.is_some_and(|t| now > t) {
            self.y = 0;
            self.y_until = None;
        }
        let mut input = Input::new(self.x, self.y);
        if std::mem::take(&mut self.dash) {
            input = input.with_dash();
        }
        input
    }
}

struct App {
    /// The running session.
    game: Game,
    keys: HeldKeys,
    log_lines: Arc<Mutex<VecDeque<String>>>,
    should_quit: bool,
}

impl App {
    fn new(args: &Args, log_lines: Arc<Mutex<VecDeque<String>>>) -> Result<Self> {
        let FileConfig { world, mut game } = load_config(args.config.as_ref())?;
        if let Some(chase) = args.chase {
            game.chase = chase.into();
        }
        let world = match args.seed {
            Some(seed) => World::from_seed(world, seed)?,
            None => World::from_entropy(world)?,
        };
        let game = Game::new(game, world)?;
        log::info!("Welcome to the {}", game.current_room().map_or("void", Room::name));
        Ok(App {
            game,
            keys: HeldKeys::default(),
            log_lines,
            should_quit: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self, dt: f32) -> Result<()> {
        let input = self.keys.take();
        for event in self.game.tick(input, dt)? {
            match event {
                GameEvent::CarrotCollected { score } => {
                    log::info!("Carrot! {score}/{}", self.game.config().target_score)
                }
                GameEvent::TrapTriggered { lives } => log::warn!("Ouch, a trap. Lives: {lives}"),
                GameEvent::CaughtByFox { lives, .. } => {
                    log::warn!("A fox got you. Lives: {lives}")
                }
                GameEvent::FoxSpawned { fox } => log::debug!("Fox {fox} joined the hunt"),
                GameEvent::Won => log::info!("YOU WON CHAMP"),
                GameEvent::Lost => log::info!("YOU LOST LIL BRO"),
                GameEvent::DashStarted | GameEvent::PortalTaken { .. } => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('p') => self.game.toggle_pause(),
            KeyCode::Enter => {
                if self.game.state != GameState::Playing {
                    self.game.restart()?;
                }
            }
            KeyCode::Left | KeyCode::Char('a') => self.keys.press_x(-1),
            KeyCode::Right | KeyCode::Char('d') => self.keys.press_x(1),
            KeyCode::Up | KeyCode::Char('w') => self.keys.press_y(-1),
            KeyCode::Down | KeyCode::Char('s') => self.keys.press_y(1),
            KeyCode::Char(' ') => self.keys.dash = true,
            _ => {}
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let log_lines = init_logging(args.log_level)?;

    // Build the game before touching the terminal so errors print normally
    let mut app = App::new(&args, log_lines)?;

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    app.handle_key(key.code)?;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed().as_secs_f32().min(0.1);
            app.tick(dt)?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Room
            Constraint::Length(3), // Status
            Constraint::Length(8), // Log
        ])
        .split(frame.area());

    if let Some(room) = app.game.current_room() {
        render_room(frame, main_layout[0], &app.game, room);
    }
    render_status(frame, main_layout[1], &app.game);
    render_log(frame, main_layout[2], &app.log_lines);
}

fn render_status(frame: &mut Frame, area: Rect, game: &Game) {
    let mut spans = vec![Span::raw(format!(
        "Lives: {} | Score: {}/{} | ",
        game.lives,
        game.score,
        game.config().target_score
    ))];
    if game.speed_boost() > 1.0 {
        spans.push(Span::styled(
            "SNEAKERS ACTIVE | ",
            Style::default().fg(Color::Green),
        ));
    }
    if game.timers.dash_cooldown <= 0.0 {
        spans.push(Span::raw("DASH READY (SPACE)"));
    } else {
        spans.push(Span::styled(
            format!("DASH COOLDOWN: {:.1}s", game.timers.dash_cooldown),
            Style::default().fg(Color::Gray),
        ));
    }
    let banner = match game.state {
        GameState::Playing => "q quit, Esc pause",
        GameState::Paused => "PAUSED: Esc resume, Enter reset game",
        GameState::Won => "YOU WON CHAMP: Enter to restart",
        GameState::Lost => "YOU LOST LIL BRO: Enter to restart",
    };
    spans.push(Span::styled(
        format!("   {banner}"),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    let status = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, area);
}

fn render_log(frame: &mut Frame, area: Rect, log_lines: &Mutex<VecDeque<String>>) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = match log_lines.lock() {
        Ok(lines) => lines
            .iter()
            .skip(lines.len().saturating_sub(visible))
            .map(|line| ListItem::new(line.as_str().to_owned()))
            .collect(),
        Err(_) => Vec::new(),
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Log"));
    frame.render_widget(list, area);
}

/// A character canvas over the room, scaled to fit the widget.
struct Canvas {
    cols: usize,
    rows: usize,
    px_per_col: f32,
    px_per_row: f32,
    cells: Vec<Span<'static>>,
}

impl Canvas {
    fn new(cols: usize, rows: usize, room_width: i32, room_height: i32, background: Color) -> Self {
        Canvas {
            cols,
            rows,
            px_per_col: room_width as f32 / cols.max(1) as f32,
            px_per_row: room_height as f32 / rows.max(1) as f32,
            cells: vec![Span::styled(" ", Style::default().bg(background)); cols * rows],
        }
    }

    /// Paints every character cell the rectangle touches, at least one.
    fn fill(&mut self, rect: &RoomRect, glyph: &'static str, style: Style) {
        if self.cols == 0 || self.rows == 0 {
            return;
        }
        let col_range = |lo: i32, hi: i32, per: f32, max: usize| {
            let first = ((lo as f32 / per).floor().max(0.0) as usize).min(max - 1);
            let last = (((hi as f32 / per).ceil() as usize).saturating_sub(1)).clamp(first, max - 1);
            first..=last
        };
        let cols = col_range(rect.left(), rect.right(), self.px_per_col, self.cols);
        let rows = col_range(rect.top(), rect.bottom(), self.px_per_row, self.rows);
        for row in rows {
            for col in cols.clone() {
                let cell = &mut self.cells[row * self.cols + col];
                *cell = Span::styled(glyph, cell.style.patch(style));
            }
        }
    }

    fn into_lines(self) -> Vec<Line<'static>> {
        let cols = self.cols.max(1);
        let mut cells = self.cells.into_iter();
        (0..self.rows)
            .map(|_| Line::from(cells.by_ref().take(cols).collect::<Vec<_>>()))
            .collect()
    }
}

/// Renders the current room onto the frame.
fn render_room(frame: &mut Frame, area: Rect, game: &Game, room: &Room) {
    let config = game.world().config();
    let layout = room.layout();
    let inner_cols = area.width.saturating_sub(2) as usize;
    let inner_rows = area.height.saturating_sub(2) as usize;
    let background = Color::Rgb(layout.color.0, layout.color.1, layout.color.2);
    let mut canvas = Canvas::new(
        inner_cols,
        inner_rows,
        config.room_width,
        config.room_height,
        background,
    );

    let (block_glyph, block_style) = match layout.theme {
        Theme::Trees => ("T", Style::default().fg(Color::Rgb(20, 100, 20))),
        Theme::Rocks => ("o", Style::default().fg(Color::Rgb(100, 100, 100))),
        Theme::Blocks => ("#", Style::default().fg(Color::Rgb(139, 69, 19))),
    };
    for decoration in &layout.decorations {
        canvas.fill(&decoration.sprite, ".", Style::default().fg(Color::DarkGray));
    }
    for (obstacle, kind) in layout.obstacles.iter().zip(&layout.obstacle_kinds) {
        match kind {
            ObstacleKind::Wall => {
                canvas.fill(obstacle, "█", Style::default().fg(Color::Rgb(30, 30, 30)))
            }
            _ => canvas.fill(obstacle, block_glyph, block_style),
        }
    }
    for portal in layout.portals.values() {
        canvas.fill(portal, "O", Style::default().fg(Color::Cyan).bold());
    }
    for trap in &layout.traps {
        canvas.fill(trap, "^", Style::default().fg(Color::Rgb(150, 0, 0)));
    }
    for carrot in &room.carrots {
        canvas.fill(carrot, "c", Style::default().fg(Color::Rgb(255, 165, 0)));
    }
    for enemy in &room.enemies {
        canvas.fill(&enemy.rect, "F", Style::default().fg(Color::Rgb(255, 50, 50)).bold());
    }
    // Blink while invincible.
    let blink_hidden = game.is_invincible() && (game.timers.invincibility * 10.0) as u32 % 2 == 0;
    if !blink_hidden {
        canvas.fill(&game.player, "@", Style::default().fg(Color::White).bold());
    }

    let title = format!(
        " {} ({}, {}) ",
        room.name(),
        room.coord.x,
        room.coord.y
    );
    let map_paragraph =
        Paragraph::new(canvas.into_lines()).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(map_paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let text = r#"
            [world]
            room_width = 1600
            enemy_count = { min = 2, max = 4 }

            [game]
            chase = "direct"
        "#;
        let config: FileConfig = toml::from_str(text).unwrap();
        assert_eq!(config.world.room_width, 1600);
        assert_eq!(config.world.room_height, WorldConfig::default().room_height);
        assert_eq!(config.world.enemy_count.as_range(), 2..=4);
        assert_eq!(config.game.chase, ChaseMode::Direct);
        assert_eq!(config.game.lives, GameConfig::default().lives);
    }

    #[test]
    fn empty_config_is_default() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.world, WorldConfig::default());
        assert_eq!(config.game, GameConfig::default());
    }

    #[test]
    fn dash_is_consumed_once() {
        let mut keys = HeldKeys::default();
        keys.press_x(1);
        keys.dash = true;
        let first = keys.take();
        assert_eq!((first.x, first.y, first.dash), (1, 0, true));
        let second = keys.take();
        assert!(!second.dash);
        assert_eq!(second.x, 1);
    }

    #[test]
    fn canvas_paints_small_rects_at_least_once() {
        let mut canvas = Canvas::new(64, 18, 1280, 720, Color::Black);
        let carrot = RoomRect::new(640, 360, 5, 5).unwrap();
        canvas.fill(&carrot, "c", Style::default());
        let painted = canvas.cells.iter().filter(|c| c.content == "c").count();
        assert_eq!(painted, 1);
    }
}
