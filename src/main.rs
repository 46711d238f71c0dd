mod app;
mod cli;
mod config;
mod encoder;
mod error;
mod locate;
mod output;
mod presets;
mod queue;
mod ui;
mod utils;

use app::{App, ConfirmAction, Screen};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;

fn main() -> io::Result<()> {
    let _log_guard = utils::init_logging();

    let cli = cli::Cli::parse();
    if !cli.args.is_empty() {
        std::process::exit(cli::run(cli));
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run
    let config = config::Config::load();
    let ffmpeg = locate::find_ffmpeg();
    let mut app = App::new(config, ffmpeg);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    loop {
        // Process any pending worker progress
        app.process_worker_messages();

        // Draw UI
        terminal.draw(|f| {
            match app.screen {
                Screen::Browsing => ui::render_browse(f, app),
                Screen::Explorer => ui::render_explorer(f, app),
                Screen::Compressing => ui::render_compress(f, app),
            }
            // Render confirmation dialog as overlay
            if app.confirm_dialog.is_some() {
                ui::render_confirm_dialog(f, app);
            }
        })?;

        // Handle input with timeout for progress updates
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(app, key.code);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyCode) {
    // Handle confirmation dialog
    if app.confirm_dialog.is_some() {
        handle_confirm_dialog_key(app, key);
        return;
    }

    match app.screen {
        Screen::Browsing => handle_browse_key(app, key),
        Screen::Explorer => handle_explorer_key(app, key),
        Screen::Compressing => handle_compress_key(app, key),
    }
}

fn handle_confirm_dialog_key(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(action) = app.confirm_dialog.take() {
                execute_confirm_action(app, action);
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.confirm_dialog = None;
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
            app.confirm_selection = !app.confirm_selection;
        }
        KeyCode::Enter => {
            if app.confirm_selection {
                // Yes
                if let Some(action) = app.confirm_dialog.take() {
                    execute_confirm_action(app, action);
                }
            } else {
                // No
                app.confirm_dialog = None;
            }
        }
        _ => {}
    }
}

fn execute_confirm_action(app: &mut App, action: ConfirmAction) {
    match action {
        ConfirmAction::CancelRun => {
            app.cancel_run();
        }
        ConfirmAction::Quit => {
            // Best-effort teardown of any in-flight subprocess
            app.cancel_run();
            app.quit();
        }
    }
}

fn handle_browse_key(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => {
            app.confirm_dialog = Some(ConfirmAction::Quit);
            app.confirm_selection = false; // Default to "No"
        }
        KeyCode::Char('a') => app.open_explorer(),
        KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => app.remove_selected(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left => app.cycle_preset_prev(),
        KeyCode::Right => app.cycle_preset_next(),
        KeyCode::Char('g') => app.toggle_accel(),
        KeyCode::Enter => app.start_run(),
        _ => {}
    }
}

fn handle_explorer_key(app: &mut App, key: KeyCode) {
    // Clear any banner when the user takes action
    app.clear_status();

    match key {
        KeyCode::Esc => app.close_explorer(),
        KeyCode::Up | KeyCode::Char('k') => app.explorer_move_up(),
        KeyCode::Down | KeyCode::Char('j') => app.explorer_move_down(),
        KeyCode::Enter => app.explorer_confirm(),
        KeyCode::Char(' ') => app.explorer_add_here(),
        _ => {}
    }
}

fn handle_compress_key(app: &mut App, key: KeyCode) {
    if key == KeyCode::Esc {
        app.confirm_dialog = Some(ConfirmAction::CancelRun);
        app.confirm_selection = false; // Default to "No"
    }
}
