use anyhow::Result;
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::io;
use std::path::PathBuf;

mod ui;
mod utils;

use crate::ui::{ChatUI, CrosstermBackend, Terminal, UiAction};
use educhat::{
    audio::FileRecorder,
    config::{self, ChatConfig},
    models::UserStatus,
    persistence::{JsonFileStore, MemoryStore, StatePersistence},
    ChatSession,
};

/// Command line arguments for EduChat
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "EduChat: a terminal chat with a simulated educational assistant.",
    long_about = "EduChat is a terminal chat client that talks to a scripted educational assistant.\n\n\
    Conversation state is saved after every change and restored on start.\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Path to a JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for the saved conversation and the log file
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Log file path (defaults to educhat.log in the data directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Keep the conversation in memory only
    #[arg(long)]
    no_persist: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(dir) = &args.data_dir {
        config::set_data_dir_override(dir.clone());
    }
    let data_dir = config::data_dir();

    let log_file_path = args
        .log_file
        .clone()
        .or_else(|| data_dir.as_ref().map(|dir| dir.join("educhat.log")))
        .unwrap_or_else(|| PathBuf::from("educhat.log"));
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    utils::setup_logging(log_file_path.to_str(), level)?;

    info!("EduChat starting up");
    info!("Logging to file: {}", log_file_path.display());

    let config = ChatConfig::load(args.config.as_deref())?;

    let persistence: Box<dyn StatePersistence> = match (&data_dir, args.no_persist) {
        (_, true) => {
            info!("Persistence disabled, conversation is kept in memory");
            Box::new(MemoryStore::new())
        }
        (Some(dir), false) => {
            let store = JsonFileStore::new(dir, &config.storage_key);
            info!("Conversation stored at {}", store.path().display());
            Box::new(store)
        }
        (None, false) => {
            warn!("No data directory available, conversation is kept in memory");
            Box::new(MemoryStore::new())
        }
    };

    let session = ChatSession::new(&config, persistence);
    let user_id = session.current_user_id();
    session.set_user_presence(&user_id, UserStatus::Online);

    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ChatUI::new();

    let result = run_main_loop(&mut chat_ui, &mut terminal, &session).await;

    // Pending timers cannot outlive the process
    session.cancel_all();
    session.set_user_presence(&user_id, UserStatus::Offline);

    ui::restore_terminal(terminal)?;
    info!("EduChat shut down");
    result
}

/// Run the main event loop
async fn run_main_loop(
    chat_ui: &mut ChatUI,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &ChatSession,
) -> Result<()> {
    loop {
        terminal.draw(|f| chat_ui.draw(f, session))?;

        // Clear notices after 5 seconds
        chat_ui.clean_notice(5);

        let action = chat_ui.handle_input(!session.is_sending())?;
        match action {
            Some(UiAction::Quit) => break,
            Some(UiAction::Send(text)) => {
                if let Err(e) = session.send_text(&text) {
                    warn!("Send failed: {}", e);
                    chat_ui.show_notice(&e.to_string());
                }
            }
            Some(UiAction::SendVoice(path)) => {
                let mut recorder = FileRecorder::new(path);
                if let Err(e) = session.record_and_send(&mut recorder).await {
                    error!("Voice message not sent: {}", e);
                    chat_ui.show_notice(&e.to_string());
                }
            }
            Some(UiAction::ToggleTheme) => {
                session.toggle_theme();
            }
            Some(UiAction::CancelPending) => {
                let count = session.cancel_all();
                chat_ui.show_notice(&format!("Cancelled {} pending update(s)", count));
            }
            None => {}
        }

        // Give spawned chains a chance to run between polls
        tokio::task::yield_now().await;
    }

    Ok(())
}
