use anyhow::Result;

use crate::domain::{
    business::BusinessSummary,
    composer_state::ComposerState,
    events::{AppEvent, KeyInput},
    message::Message,
    picker::BusinessPickerState,
    shell_state::ShellState,
    turn::TurnCompletion,
};

use super::{
    contracts::{Clock, SessionStore, ShellOrchestrator, TurnDispatcher},
    directory::BusinessDirectory,
    relay::{ConversationRelay, RelayPhase, TurnRejected, TurnResolution},
};

pub const QUICK_SUGGESTIONS: [&str; 3] =
    ["Help me get started", "What can you do?", "Tell me more"];

/// Everything the view needs for one frame.
#[derive(Debug)]
pub struct ChatView<'a> {
    pub messages: &'a [Message],
    pub business_name: Option<&'a str>,
    pub business_description: Option<&'a str>,
    pub phase: RelayPhase,
    pub picker: &'a BusinessPickerState,
    /// Directory rows matching the picker query.
    pub businesses: Vec<&'a BusinessSummary>,
    pub directory_loading: bool,
    pub composer: &'a ComposerState,
    pub notice: Option<&'a str>,
}

pub struct DefaultShellOrchestrator<S, C, D>
where
    S: SessionStore,
    C: Clock,
    D: TurnDispatcher,
{
    state: ShellState,
    relay: ConversationRelay<S, C>,
    directory: BusinessDirectory,
    dispatcher: D,
}

impl<S, C, D> DefaultShellOrchestrator<S, C, D>
where
    S: SessionStore,
    C: Clock,
    D: TurnDispatcher,
{
    /// Wraps an opened relay and starts the one-time directory fetch.
    pub fn new(relay: ConversationRelay<S, C>, dispatcher: D) -> Self {
        let mut orchestrator = Self {
            state: ShellState::default(),
            relay,
            directory: BusinessDirectory::default(),
            dispatcher,
        };
        orchestrator.ensure_directory();
        orchestrator
    }

    fn ensure_directory(&mut self) {
        if self.directory.begin_fetch() {
            self.dispatcher.dispatch_directory_fetch();
        }
    }

    fn handle_key(&mut self, key: KeyInput) {
        self.state.clear_notice();

        if key.ctrl {
            match key.key.as_str() {
                "n" => self.start_new_chat(),
                "r" if self.relay.picker().is_open() => {
                    if self.directory.begin_refresh() {
                        self.dispatcher.dispatch_directory_fetch();
                    }
                }
                _ => {}
            }
            return;
        }

        if self.relay.picker().is_open() {
            self.handle_picker_key(&key);
        } else {
            self.handle_composer_key(&key);
        }
    }

    fn handle_composer_key(&mut self, key: &KeyInput) {
        if let Some(ch) = key.as_char() {
            if !self.state.composer_mut().insert(ch) {
                self.state.set_notice("Message is too long");
            }
            return;
        }

        match key.key.as_str() {
            "esc" => self.state.stop(),
            "enter" => self.submit(),
            "tab" => {
                if self.relay.is_awaiting_business() {
                    self.relay.picker_mut().reopen();
                    self.ensure_directory();
                }
            }
            "backspace" => self.state.composer_mut().backspace(),
            "delete" => self.state.composer_mut().delete(),
            "left" => self.state.composer_mut().left(),
            "right" => self.state.composer_mut().right(),
            "home" => self.state.composer_mut().home(),
            "end" => self.state.composer_mut().end(),
            "f1" | "f2" | "f3" => {
                let index = match key.key.as_str() {
                    "f1" => 0,
                    "f2" => 1,
                    _ => 2,
                };
                self.state.composer_mut().replace(QUICK_SUGGESTIONS[index]);
            }
            _ => {}
        }
    }

    fn handle_picker_key(&mut self, key: &KeyInput) {
        if let Some(ch) = key.as_char() {
            self.relay.picker_mut().push_query_char(ch);
            return;
        }

        match key.key.as_str() {
            "esc" | "tab" => self.relay.picker_mut().close(),
            "backspace" => self.relay.picker_mut().pop_query_char(),
            "up" => self.relay.picker_mut().select_previous(),
            "down" => {
                let visible = self.directory.filter(self.relay.picker().query()).len();
                self.relay.picker_mut().select_next(visible);
            }
            "enter" => self.pick_highlighted_business(),
            _ => {}
        }
    }

    fn submit(&mut self) {
        if self.state.composer().is_blank() {
            return;
        }
        let text = self.state.composer().text();

        match self.relay.begin_turn(&text) {
            Ok(turn) => {
                self.state.composer_mut().take();
                self.dispatcher.dispatch_turn(turn);
            }
            Err(TurnRejected::TurnInFlight) => {
                self.state.set_notice("Still waiting for the previous reply");
            }
            Err(error) => tracing::debug!(%error, "composer input not sent"),
        }
    }

    fn pick_highlighted_business(&mut self) {
        let picker = self.relay.picker();
        let chosen = self
            .directory
            .filter(picker.query())
            .get(picker.selected_index())
            .map(|business| (business.business_id.clone(), business.name.clone()));

        let Some((business_id, name)) = chosen else {
            self.state.set_notice(if self.directory.is_loading() {
                "Businesses are still loading"
            } else {
                "No matching business"
            });
            return;
        };

        match self.relay.begin_business_selection(&business_id, &name) {
            Ok(turn) => self.dispatcher.dispatch_turn(turn),
            Err(TurnRejected::TurnInFlight) => {
                self.state.set_notice("Still waiting for the previous reply");
            }
            Err(rejected) => self.state.set_notice(rejected.to_string()),
        }
    }

    fn start_new_chat(&mut self) {
        self.relay.reset_session();
        self.state.composer_mut().take();
        self.state.set_notice("Started a new chat");
    }

    fn apply_completion(&mut self, completion: TurnCompletion) {
        match self.relay.complete_turn(completion) {
            TurnResolution::Answered {
                awaiting_business: true,
            } => self.ensure_directory(),
            TurnResolution::SessionReset => self.state.set_notice("Started a new chat"),
            TurnResolution::Answered { .. } | TurnResolution::Failed | TurnResolution::Stale => {}
        }
    }
}

impl<S, C, D> ShellOrchestrator for DefaultShellOrchestrator<S, C, D>
where
    S: SessionStore,
    C: Clock,
    D: TurnDispatcher,
{
    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn view(&self) -> ChatView<'_> {
        ChatView {
            messages: self.relay.messages(),
            business_name: self.relay.business_name(),
            business_description: self.relay.business_description(),
            phase: self.relay.phase(),
            picker: self.relay.picker(),
            businesses: self.directory.filter(self.relay.picker().query()),
            directory_loading: self.directory.is_loading(),
            composer: self.state.composer(),
            notice: self.state.notice(),
        }
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {}
            AppEvent::QuitRequested => self.state.stop(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::TurnCompleted(completion) => self.apply_completion(completion),
            AppEvent::DirectoryLoaded(outcome) => self.directory.apply_fetch(outcome),
        }

        Ok(())
    }
}
