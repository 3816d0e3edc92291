use anyhow::Result;

use crate::usecases::{
    context::AppContext,
    contracts::{AppEventSource, ShellOrchestrator},
    shell::ChatView,
};

use super::{terminal::TerminalSession, view};

pub fn start(
    context: &AppContext,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<()> {
    tracing::info!(
        log_level = %context.config.logging.level,
        backend = %context.config.backend.base_url,
        "starting TUI shell"
    );

    let mut terminal = TerminalSession::new()?;
    run_loop(event_source, orchestrator, |chat_view| {
        terminal.draw(|frame| view::render(frame, chat_view))
    })?;

    tracing::info!("TUI shell stopped");
    Ok(())
}

fn run_loop<D>(
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
    mut draw: D,
) -> Result<()>
where
    D: FnMut(&ChatView<'_>) -> Result<()>,
{
    while orchestrator.is_running() {
        draw(&orchestrator.view())?;

        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
    }

    Ok(())
}
