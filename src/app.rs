use std::{
    io::{self, Write},
    sync::{mpsc, Arc},
};

use anyhow::Result;
use chrono::Local;

use crate::{
    backend::{self, BackendClient, BackgroundDispatcher},
    cli::{Cli, Command},
    domain::{self, message::Message},
    infra::{self, clock::SystemClock, error::AppError, session_files::FileSessionStore},
    ui,
    usecases::{
        self, bootstrap,
        context::AppContext,
        contracts::{ChatGateway, Clock, SessionStore},
        directory::BusinessDirectory,
        relay::{ConversationRelay, RelayPhase, TurnResolution},
        shell::DefaultShellOrchestrator,
        startup::{self, SessionLockGuard, SessionStoreHandle},
    },
};

pub fn run(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;

    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        backend = backend::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    match cli.command_or_default() {
        Command::Run => {
            let (relay, _lock_guard) = open_relay(&context)?;
            run_tui(&context, relay)?;
        }
        Command::Send { message } => {
            let (mut relay, _lock_guard) = open_relay(&context)?;
            let runtime = build_runtime()?;
            let client = BackendClient::new(&context.config.backend)?;
            runtime.block_on(send_message(
                &mut relay,
                &client,
                &message,
                &mut io::stdout(),
            ))?;
        }
        Command::Select { business_id, name } => {
            let (mut relay, _lock_guard) = open_relay(&context)?;
            let runtime = build_runtime()?;
            let client = BackendClient::new(&context.config.backend)?;
            let display_name = name.unwrap_or_else(|| business_id.clone());
            runtime.block_on(select_business(
                &mut relay,
                &client,
                &business_id,
                &display_name,
                &mut io::stdout(),
            ))?;
        }
        Command::Businesses { query } => {
            let runtime = build_runtime()?;
            let client = BackendClient::new(&context.config.backend)?;
            let mut directory = BusinessDirectory::default();
            runtime.block_on(directory.fetch_all(&client));
            print_businesses(&directory, query.as_deref(), &mut io::stdout())?;
        }
        Command::History => {
            let (relay, _lock_guard) = open_relay(&context)?;
            print_history(relay.messages(), &mut io::stdout())?;
        }
        Command::Reset => {
            let (mut relay, _lock_guard) = open_relay(&context)?;
            relay.reset_session();
            writeln!(
                io::stdout(),
                "Started a new chat session ({}).",
                relay.session_id()
            )?;
        }
    }

    Ok(())
}

/// Opens the stored session under the process-wide session lock. The lock is
/// held until the returned guard is dropped.
fn open_relay(
    context: &AppContext,
) -> Result<(ConversationRelay<FileSessionStore, SystemClock>, SessionLockGuard)> {
    let SessionStoreHandle { store, lock_guard } = startup::open_session_store(&context.layout)?;
    Ok((ConversationRelay::open(store, SystemClock), lock_guard))
}

fn run_tui<S, C>(context: &AppContext, relay: ConversationRelay<S, C>) -> Result<()>
where
    S: SessionStore,
    C: Clock,
{
    let runtime = build_runtime()?;
    let client = Arc::new(BackendClient::new(&context.config.backend)?);
    let (event_tx, event_rx) = mpsc::channel();

    let dispatcher = BackgroundDispatcher::new(runtime.handle().clone(), client, event_tx);
    let mut orchestrator = DefaultShellOrchestrator::new(relay, dispatcher);
    let mut event_source = ui::CrosstermEventSource::new(event_rx);

    ui::shell::start(context, &mut event_source, &mut orchestrator)
}

fn build_runtime() -> Result<tokio::runtime::Runtime, AppError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::RuntimeInit)
}

async fn send_message<S, C>(
    relay: &mut ConversationRelay<S, C>,
    gateway: &dyn ChatGateway,
    message: &str,
    out: &mut dyn Write,
) -> Result<()>
where
    S: SessionStore,
    C: Clock,
{
    let before = relay.messages().len();
    let resolution = relay.send_turn(gateway, message).await?;
    report_turn(relay, before, resolution, out)
}

async fn select_business<S, C>(
    relay: &mut ConversationRelay<S, C>,
    gateway: &dyn ChatGateway,
    business_id: &str,
    display_name: &str,
    out: &mut dyn Write,
) -> Result<()>
where
    S: SessionStore,
    C: Clock,
{
    let before = relay.messages().len();
    let resolution = relay
        .select_business(gateway, business_id, display_name)
        .await?;
    report_turn(relay, before, resolution, out)
}

/// Prints what the turn added after the user's own message.
fn report_turn<S, C>(
    relay: &ConversationRelay<S, C>,
    before: usize,
    resolution: TurnResolution,
    out: &mut dyn Write,
) -> Result<()>
where
    S: SessionStore,
    C: Clock,
{
    if resolution == TurnResolution::SessionReset {
        writeln!(
            out,
            "The assistant started a new chat session ({}).",
            relay.session_id()
        )?;
        return Ok(());
    }

    let added = relay.messages().get(before + 1..).unwrap_or_default();
    for message in added {
        writeln!(out, "{}", format_message(message))?;
    }

    if relay.phase() == RelayPhase::AwaitingBusinessSelection {
        writeln!(
            out,
            "Choose a business with `bizchat select <BUSINESS_ID>` (see `bizchat businesses`)."
        )?;
    }

    Ok(())
}

fn print_history(messages: &[Message], out: &mut dyn Write) -> Result<()> {
    if messages.is_empty() {
        writeln!(out, "No messages in the current session.")?;
        return Ok(());
    }

    for message in messages {
        writeln!(out, "{}", format_message(message))?;
    }

    Ok(())
}

fn print_businesses(
    directory: &BusinessDirectory,
    query: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let matches = directory.filter(query.unwrap_or_default());
    if matches.is_empty() {
        writeln!(out, "No businesses found.")?;
        return Ok(());
    }

    for business in matches {
        if business.description.is_empty() {
            writeln!(out, "{}\t{}", business.business_id, business.name)?;
        } else {
            writeln!(
                out,
                "{}\t{}\t{}",
                business.business_id, business.name, business.description
            )?;
        }
    }

    Ok(())
}

fn format_message(message: &Message) -> String {
    format!(
        "[{}] {}: {}",
        message.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        message.sender.display_label(),
        message.text
    )
}
