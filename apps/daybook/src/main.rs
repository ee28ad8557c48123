//! Daybook - Calendar with daily todos, notes and a focus timer.

mod app;
mod config;
mod logging;
mod ui;

use anyhow::Context;
use app::App;
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use daybook_store::{DateKey, ExportScope, FileStorage, Priority, Stats, Store};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Calendar with daily todos, notes and a focus timer")]
struct Cli {
    /// Store data in this directory instead of the platform default
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an export file
    Export {
        path: PathBuf,

        /// Include notes and the theme, not only todos
        #[arg(long)]
        full: bool,
    },
    /// Import an export file, replacing the sections it contains
    Import { path: PathBuf },
    /// Print todo statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }

    let _logging = logging::init_logging(&config.log_dir(), &config.logging.level)?;
    info!(data_dir = %config.data_dir().display(), "daybook starting");

    match cli.command {
        None => run_tui(config),
        Some(Commands::Export { path, full }) => {
            let store = open_store(&config)?;
            let scope = if full { ExportScope::Full } else { ExportScope::TodosOnly };
            app::write_export(&store, &path, scope)?;
            println!("Exported to {}", path.display());
            Ok(())
        }
        Some(Commands::Import { path }) => {
            let mut store = open_store(&config)?;
            let summary = app::read_import(&mut store, &path)?;
            if let Some(e) = store.take_save_error() {
                return Err(e).context("imported data could not be saved");
            }
            println!("{}", summary);
            Ok(())
        }
        Some(Commands::Stats) => {
            let store = open_store(&config)?;
            let stats = store.stats(DateKey::today());
            write_stats(&mut io::stdout().lock(), &stats)?;
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<Store<FileStorage>> {
    let dir = config.data_dir();
    let storage =
        FileStorage::open(&dir).with_context(|| format!("opening data directory {}", dir.display()))?;
    Ok(Store::load(storage))
}

fn write_stats(out: &mut impl Write, stats: &Stats) -> io::Result<()> {
    writeln!(out, "Total todos:     {}", stats.total)?;
    writeln!(out, "Completed:       {}", stats.completed)?;
    writeln!(out, "Completion rate: {}%", stats.completion_rate)?;
    writeln!(out, "Active days:     {}", stats.active_days)?;
    writeln!(out, "By priority:")?;
    for priority in Priority::ALL {
        writeln!(out, "  {:<7} {}", priority.label(), stats.priorities.get(priority))?;
    }
    writeln!(out, "Last 7 days:")?;
    for (date, count) in &stats.recent {
        writeln!(out, "  {}  {}", date, count)?;
    }
    Ok(())
}

fn run_tui(config: Config) -> anyhow::Result<()> {
    let mut app = App::new(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = app.shutdown() {
        error!(error = %e, "final save failed");
        eprintln!("Warning: {:#}", e);
    }

    if let Err(err) = &result {
        error!(error = %err, "terminal loop failed");
    } else {
        info!("daybook exiting");
    }
    result
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    loop {
        if app.needs_redraw() {
            terminal.draw(|f| ui::draw(f, app))?;
            app.mark_drawn();
        }

        // Poll with timeout for timer updates
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if key.code == KeyCode::Char('q') && key.modifiers.is_empty() && app.can_quit() {
                        break;
                    }
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        break;
                    }
                    app.handle_key(key);
                }
                Event::Resize(_, _) => app.request_redraw(),
                _ => {}
            }
        }

        app.tick();

        if app.take_bell() {
            let mut out = io::stdout();
            write!(out, "\x07")?;
            out.flush()?;
        }
    }

    Ok(())
}
