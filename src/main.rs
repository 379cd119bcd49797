use anyhow::Result;
use btc_clock::clock::TICK_PERIOD;
use btc_clock::config::Args;
use btc_clock::retry::retry_with_schedule;
use btc_clock::ui::{self, App};
use btc_clock::{fetch_block_info, BlockPoller, ClockTicker, ExplorerClient};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Logs go to `--log-file` when given. Otherwise the dashboard drops them so
/// the screen is not corrupted, and `--once` writes them to stderr.
fn init_tracing(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "btc_clock=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if let Some(path) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else if args.once {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    } else {
        registry.init();
    }
    Ok(())
}

async fn run_once(args: &Args, client: &ExplorerClient) -> Result<()> {
    let config = args.poller_config();
    let info = retry_with_schedule(&config.retry, || {
        fetch_block_info(client, config.attempt_timeout)
    })
    .await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop(terminal: &mut Term, app: &mut App, ticker: &ClockTicker) -> Result<()> {
    let mut ticks = ticker.subscribe();
    let mut poll_updates = app.subscribe_poll();
    let mut events = EventStream::new();

    loop {
        app.set_now(*ticks.borrow_and_update());
        terminal.draw(|f| ui::draw(f, app))?;

        tokio::select! {
            changed = ticks.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = poll_updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if app.on_key(key.code) {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let selection = args.selection()?;
    let client = Arc::new(ExplorerClient::new(&args.api_base)?);

    if args.once {
        return run_once(&args, &client).await;
    }

    info!("Starting btc-clock dashboard in {}", selection.zone());

    let poller = BlockPoller::spawn(client, args.poller_config());
    let ticker = ClockTicker::spawn(TICK_PERIOD);
    let mut app = App::new(poller.subscribe(), poller.refresh_sender(), selection);

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app, &ticker).await;
    restore_terminal(&mut terminal)?;

    poller.shutdown().await;
    info!("btc-clock stopped");
    result
}
