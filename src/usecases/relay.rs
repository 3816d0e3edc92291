//! Conversation relay: owns the active session and drives chat turns.
//!
//! A turn is split into [`ConversationRelay::begin_turn`], which records the
//! user's message and hands back an [`OutboundTurn`] to send, and
//! [`ConversationRelay::complete_turn`], which applies the backend outcome.
//! Every outbound turn carries the session id it was started under; a
//! completion whose session is no longer active is dropped, so a reset while a
//! request is in flight can never leak the old conversation into the new one.

use thiserror::Error;

use crate::domain::{
    conversation::{BackendReply, ConversationState},
    message::Message,
    picker::BusinessPickerState,
    session::Session,
    turn::{OutboundTurn, TurnCompletion, TurnKind},
};

use super::{
    contracts::{ChatGateway, Clock, SessionStore, StoredSession},
    transcript::Transcript,
};

const SESSION_STORE_READ_FAILED: &str = "SESSION_STORE_READ_FAILED";
const SESSION_STORE_WRITE_FAILED: &str = "SESSION_STORE_WRITE_FAILED";
const CHAT_TURN_FAILED: &str = "CHAT_TURN_FAILED";
const STALE_TURN_IGNORED: &str = "STALE_TURN_IGNORED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    Sending,
    AwaitingBusinessSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnRejected {
    #[error("message is empty")]
    EmptyInput,
    #[error("business id is empty")]
    EmptyBusinessId,
    #[error("another message is still being sent")]
    TurnInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResolution {
    Answered { awaiting_business: bool },
    SessionReset,
    Failed,
    /// The completion belonged to a session or turn that is no longer active.
    Stale,
}

pub struct ConversationRelay<S, C>
where
    S: SessionStore,
    C: Clock,
{
    store: S,
    clock: C,
    session: Session,
    business_description: Option<String>,
    transcript: Transcript,
    picker: BusinessPickerState,
    awaiting_business: bool,
    in_flight: Option<OutboundTurn>,
    next_turn_id: u64,
    /// Set when the store could not be read at open. Nothing is written back
    /// for the rest of the run so unread data is left on disk.
    detached: bool,
}

impl<S, C> ConversationRelay<S, C>
where
    S: SessionStore,
    C: Clock,
{
    /// Restores the stored session if it is still valid, otherwise replaces
    /// it and everything that belonged to it with a fresh one.
    ///
    /// When the store cannot be read at all the fresh session stays in memory
    /// and the store is left untouched.
    pub fn open(store: S, clock: C) -> Self {
        let now = clock.now();
        let (stored, detached) = match store.load() {
            Ok(stored) => (stored, false),
            Err(error) => {
                tracing::warn!(
                    code = SESSION_STORE_READ_FAILED,
                    error = ?error,
                    "session store unreadable; this session will not be saved"
                );
                (StoredSession::default(), true)
            }
        };
        let StoredSession {
            session_id,
            created_at,
            transcript,
            business_name,
        } = stored;

        let restored = match (session_id, created_at) {
            (Some(session_id), Some(created_at)) => Some(Session {
                session_id,
                created_at,
                business_name: business_name.filter(|name| !name.trim().is_empty()),
            }),
            _ => None,
        }
        .filter(|session| session.is_valid_at(now));

        let mut relay = Self {
            store,
            clock,
            session: restored.clone().unwrap_or_else(|| Session::start(now)),
            business_description: None,
            transcript: Transcript::default(),
            picker: BusinessPickerState::default(),
            awaiting_business: false,
            in_flight: None,
            next_turn_id: 0,
            detached,
        };

        if restored.is_some() {
            relay.transcript = Transcript::hydrate(transcript.as_deref());
            tracing::info!(
                session_id = %relay.session.session_id,
                messages = relay.transcript.len(),
                "restored chat session"
            );
        } else {
            relay.persist_fresh_session();
            tracing::info!(
                session_id = %relay.session.session_id,
                "started new chat session"
            );
        }

        relay
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn business_name(&self) -> Option<&str> {
        self.session.business_name.as_deref()
    }

    /// Description that came with the last business name; not persisted.
    pub fn business_description(&self) -> Option<&str> {
        self.business_description.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn picker(&self) -> &BusinessPickerState {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut BusinessPickerState {
        &mut self.picker
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> RelayPhase {
        if self.in_flight.is_some() {
            RelayPhase::Sending
        } else if self.awaiting_business {
            RelayPhase::AwaitingBusinessSelection
        } else {
            RelayPhase::Idle
        }
    }

    pub fn is_awaiting_business(&self) -> bool {
        self.awaiting_business
    }

    pub fn begin_turn(&mut self, input: &str) -> Result<OutboundTurn, TurnRejected> {
        let text = input.trim();
        if text.is_empty() {
            return Err(TurnRejected::EmptyInput);
        }
        self.ensure_no_turn_in_flight()?;

        Ok(self.start_turn(text.to_owned(), text.to_owned(), TurnKind::Message))
    }

    /// Starts a turn whose backend payload is the business id while the
    /// transcript shows the business name as what the user said.
    pub fn begin_business_selection(
        &mut self,
        business_id: &str,
        display_name: &str,
    ) -> Result<OutboundTurn, TurnRejected> {
        let business_id = business_id.trim();
        if business_id.is_empty() {
            return Err(TurnRejected::EmptyBusinessId);
        }
        self.ensure_no_turn_in_flight()?;

        let shown = match display_name.trim() {
            "" => business_id,
            name => name,
        };

        Ok(self.start_turn(
            shown.to_owned(),
            business_id.to_owned(),
            TurnKind::BusinessSelection,
        ))
    }

    pub fn complete_turn(&mut self, completion: TurnCompletion) -> TurnResolution {
        let TurnCompletion { turn, outcome } = completion;

        let is_active = turn.session_id == self.session.session_id
            && self
                .in_flight
                .as_ref()
                .is_some_and(|pending| pending.turn_id == turn.turn_id);
        if !is_active {
            tracing::debug!(
                code = STALE_TURN_IGNORED,
                turn_id = turn.turn_id,
                "ignoring completion of a turn that no longer belongs to the active session"
            );
            return TurnResolution::Stale;
        }

        self.in_flight = None;

        let resolution = match outcome {
            Ok(BackendReply::Reset) => {
                tracing::info!(turn_id = turn.turn_id, "backend requested a session reset");
                self.reset_session();
                return TurnResolution::SessionReset;
            }
            Ok(BackendReply::Answer {
                answer,
                state,
                business_name,
                business_description,
            }) => {
                if let Some(name) = business_name.filter(|name| !name.trim().is_empty()) {
                    self.set_business(name, business_description);
                }

                let now = self.clock.now();
                self.append(Message::bot(answer, now));
                self.apply_conversation_state(state);

                TurnResolution::Answered {
                    awaiting_business: self.awaiting_business,
                }
            }
            Err(error) => {
                tracing::warn!(
                    code = CHAT_TURN_FAILED,
                    backend_code = error.code(),
                    turn_id = turn.turn_id,
                    error = %error,
                    "chat turn failed; showing apology"
                );
                let now = self.clock.now();
                self.append(Message::apology(now));
                TurnResolution::Failed
            }
        };

        if turn.kind == TurnKind::BusinessSelection {
            self.awaiting_business = false;
            self.picker.reset();
            if let TurnResolution::Answered { .. } = resolution {
                return TurnResolution::Answered {
                    awaiting_business: false,
                };
            }
        }

        resolution
    }

    pub async fn send_turn(
        &mut self,
        gateway: &dyn ChatGateway,
        input: &str,
    ) -> Result<TurnResolution, TurnRejected> {
        let turn = self.begin_turn(input)?;
        Ok(self.drive(gateway, turn).await)
    }

    pub async fn select_business(
        &mut self,
        gateway: &dyn ChatGateway,
        business_id: &str,
        display_name: &str,
    ) -> Result<TurnResolution, TurnRejected> {
        let turn = self.begin_business_selection(business_id, display_name)?;
        Ok(self.drive(gateway, turn).await)
    }

    /// Replaces the session with a fresh one and forgets everything tied to
    /// the old one, including any turn still in flight.
    pub fn reset_session(&mut self) {
        let fresh = Session::start(self.clock.now());
        let previous = std::mem::replace(&mut self.session, fresh);

        self.business_description = None;
        self.transcript.reset();
        self.awaiting_business = false;
        self.picker.reset();
        if let Some(turn) = self.in_flight.take() {
            tracing::debug!(
                turn_id = turn.turn_id,
                "in-flight turn abandoned by session reset"
            );
        }

        self.persist_fresh_session();
        tracing::info!(
            previous_session_id = %previous.session_id,
            session_id = %self.session.session_id,
            "chat session reset"
        );
    }

    async fn drive(&mut self, gateway: &dyn ChatGateway, turn: OutboundTurn) -> TurnResolution {
        let outcome = gateway.send_turn(&turn.payload, &turn.session_id).await;
        self.complete_turn(TurnCompletion { turn, outcome })
    }

    fn ensure_no_turn_in_flight(&self) -> Result<(), TurnRejected> {
        match self.in_flight {
            Some(_) => Err(TurnRejected::TurnInFlight),
            None => Ok(()),
        }
    }

    fn start_turn(&mut self, shown: String, payload: String, kind: TurnKind) -> OutboundTurn {
        let now = self.clock.now();
        self.append(Message::user(shown, now));

        self.next_turn_id += 1;
        let turn = OutboundTurn {
            turn_id: self.next_turn_id,
            session_id: self.session.session_id.clone(),
            payload,
            kind,
        };
        self.in_flight = Some(turn.clone());

        tracing::debug!(turn_id = turn.turn_id, kind = ?kind, "chat turn started");
        turn
    }

    fn apply_conversation_state(&mut self, state: ConversationState) {
        match state {
            ConversationState::AwaitingBusiness => {
                self.awaiting_business = true;
                self.picker.open_fresh();
            }
            ConversationState::Chat => {
                self.awaiting_business = false;
                self.picker.reset();
            }
        }
    }

    fn append(&mut self, message: Message) {
        if self.detached {
            self.transcript.push(message);
        } else {
            self.transcript.append(message, &mut self.store);
        }
    }

    fn set_business(&mut self, name: String, description: Option<String>) {
        let saved = if self.detached {
            Ok(())
        } else {
            self.store.save_business_name(Some(&name))
        };
        if let Err(error) = saved {
            tracing::warn!(
                code = SESSION_STORE_WRITE_FAILED,
                error = ?error,
                "business name could not be persisted"
            );
        }

        self.session.business_name = Some(name);
        self.business_description = description.filter(|text| !text.trim().is_empty());
    }

    fn persist_fresh_session(&mut self) {
        if self.detached {
            return;
        }

        let result = self.store.clear().and_then(|()| {
            self.store
                .save_session(&self.session.session_id, self.session.created_at)
        });

        if let Err(error) = result {
            tracing::warn!(
                code = SESSION_STORE_WRITE_FAILED,
                error = ?error,
                "new session could not be persisted; it will live only for this run"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        fs,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        domain::{
            message::{Sender, APOLOGY_TEXT},
            session::session_ttl,
            turn::{GatewayError, TurnOutcome},
        },
        infra::{
            session_files::FileSessionStore,
            stubs::{ManualClock, MemorySessionStore},
        },
    };

    /// Store whose reads always fail; records every write attempted on it.
    #[derive(Default)]
    struct UnreadableStore {
        writes: Arc<Mutex<Vec<&'static str>>>,
    }

    impl UnreadableStore {
        fn record(&self, call: &'static str) -> anyhow::Result<()> {
            self.writes.lock().expect("writes lock").push(call);
            Ok(())
        }
    }

    impl SessionStore for UnreadableStore {
        fn load(&self) -> anyhow::Result<StoredSession> {
            Err(anyhow::anyhow!("permission denied"))
        }

        fn save_session(&mut self, _: &str, _: DateTime<Utc>) -> anyhow::Result<()> {
            self.record("save_session")
        }

        fn save_transcript(&mut self, _: &str) -> anyhow::Result<()> {
            self.record("save_transcript")
        }

        fn save_business_name(&mut self, _: Option<&str>) -> anyhow::Result<()> {
            self.record("save_business_name")
        }

        fn clear(&mut self) -> anyhow::Result<()> {
            self.record("clear")
        }
    }

    struct ScriptedGateway {
        replies: Mutex<VecDeque<TurnOutcome>>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<TurnOutcome>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<(String, String)> {
            self.seen.lock().expect("seen lock").clone()
        }
    }

    #[async_trait]
    impl ChatGateway for ScriptedGateway {
        async fn send_turn(
            &self,
            message: &str,
            session_id: &str,
        ) -> Result<BackendReply, GatewayError> {
            self.seen
                .lock()
                .expect("seen lock")
                .push((message.to_owned(), session_id.to_owned()));
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .expect("missing scripted reply")
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0)
            .single()
            .expect("fixture time should be valid")
    }

    fn fresh_relay() -> ConversationRelay<MemorySessionStore, ManualClock> {
        ConversationRelay::open(MemorySessionStore::default(), ManualClock::at(start()))
    }

    fn awaiting_reply(answer: &str) -> BackendReply {
        BackendReply::Answer {
            answer: answer.to_owned(),
            state: ConversationState::AwaitingBusiness,
            business_name: None,
            business_description: None,
        }
    }

    #[test]
    fn open_on_empty_store_starts_and_persists_a_session() {
        let relay = fresh_relay();

        let stored = relay.store().load().expect("load");
        assert_eq!(stored.session_id.as_deref(), Some(relay.session_id()));
        assert_eq!(stored.created_at, Some(start()));
        assert!(relay.messages().is_empty());
        assert_eq!(relay.phase(), RelayPhase::Idle);
    }

    #[test]
    fn open_restores_valid_session_with_transcript_and_business() {
        let mut store = MemorySessionStore::with_session("s-1", start());
        let mut transcript = Transcript::default();
        transcript.append(Message::user("Hi", start()), &mut store);
        store
            .save_business_name(Some("Eko Bites"))
            .expect("save business");

        let clock = ManualClock::at(start() + Duration::hours(11));
        let relay = ConversationRelay::open(store, clock);

        assert_eq!(relay.session_id(), "s-1");
        assert_eq!(relay.business_name(), Some("Eko Bites"));
        assert_eq!(relay.messages().len(), 1);
        assert_eq!(relay.messages()[0].text, "Hi");
    }

    #[test]
    fn open_discards_session_at_exactly_twelve_hours() {
        let mut store = MemorySessionStore::with_session("s-1", start());
        Transcript::default().append(Message::user("Hi", start()), &mut store);
        store
            .save_business_name(Some("Eko Bites"))
            .expect("save business");

        let relay = ConversationRelay::open(store, ManualClock::at(start() + session_ttl()));

        assert_ne!(relay.session_id(), "s-1");
        assert!(relay.messages().is_empty());
        assert_eq!(relay.business_name(), None);

        let stored = relay.store().load().expect("load");
        assert_eq!(stored.transcript, None);
        assert_eq!(stored.business_name, None);
        assert_eq!(stored.created_at, Some(start() + session_ttl()));
    }

    #[test]
    fn reopening_after_the_ttl_replaces_a_session_used_earlier() {
        let clock = ManualClock::at(start());
        let mut relay = ConversationRelay::open(MemorySessionStore::default(), clock.clone());
        let turn = relay.begin_turn("hello").expect("turn");
        relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(BackendReply::answer("Hi!")),
        });
        let first_session = relay.session_id().to_owned();

        clock.advance(Duration::hours(6));
        let same_day = ConversationRelay::open(relay.store().clone(), clock.clone());
        assert_eq!(same_day.session_id(), first_session);
        assert_eq!(same_day.messages().len(), 2);

        clock.advance(Duration::hours(6));
        let next_day = ConversationRelay::open(relay.store().clone(), clock);
        assert_ne!(next_day.session_id(), first_session);
        assert!(next_day.messages().is_empty());
    }

    #[test]
    fn open_keeps_session_when_stored_transcript_is_corrupt() {
        let mut store = MemorySessionStore::with_session("s-1", start());
        store.save_transcript("[{broken").expect("save transcript");

        let relay = ConversationRelay::open(store, ManualClock::at(start()));

        assert_eq!(relay.session_id(), "s-1");
        assert!(relay.messages().is_empty());
    }

    #[test]
    fn open_keeps_file_session_when_transcript_bytes_are_not_utf8() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileSessionStore::new(temp_dir.path());
        store.save_session("s-keep", start()).expect("save session");
        let transcript_path = temp_dir.path().join("transcript.json");
        fs::write(&transcript_path, [0xff, 0xfe, b'[', b']']).expect("write transcript");

        let clock = ManualClock::at(start() + Duration::hours(1));
        let relay = ConversationRelay::open(FileSessionStore::new(temp_dir.path()), clock);

        assert_eq!(relay.session_id(), "s-keep");
        assert!(relay.messages().is_empty());
        let stored = FileSessionStore::new(temp_dir.path())
            .load()
            .expect("reload");
        assert_eq!(stored.session_id.as_deref(), Some("s-keep"));
    }

    #[tokio::test]
    async fn unreadable_store_is_never_written_to() {
        let store = UnreadableStore::default();
        let writes = Arc::clone(&store.writes);
        let mut relay = ConversationRelay::open(store, ManualClock::at(start()));
        let gateway = ScriptedGateway::new(vec![Ok(BackendReply::Answer {
            answer: "Welcome".to_owned(),
            state: ConversationState::Chat,
            business_name: Some("Eko Bites".to_owned()),
            business_description: None,
        })]);

        relay
            .send_turn(&gateway, "Hi")
            .await
            .expect("turn accepted");
        relay.reset_session();
        relay.begin_turn("again").expect("turn accepted");

        assert!(writes.lock().expect("writes lock").is_empty());
        assert_eq!(relay.messages().len(), 1);
        assert_eq!(relay.messages()[0].text, "again");
    }

    #[test]
    fn user_message_is_shown_before_the_request_completes() {
        let mut relay = fresh_relay();

        let turn = relay.begin_turn("  Hello there  ").expect("turn accepted");

        assert_eq!(turn.payload, "Hello there");
        assert_eq!(turn.session_id, relay.session_id());
        assert_eq!(relay.phase(), RelayPhase::Sending);
        assert_eq!(relay.messages().len(), 1);
        assert_eq!(relay.messages()[0].sender, Sender::User);
        assert_eq!(relay.messages()[0].text, "Hello there");
    }

    #[test]
    fn blank_input_is_rejected_without_side_effects() {
        let mut relay = fresh_relay();

        assert_eq!(relay.begin_turn(" \n\t"), Err(TurnRejected::EmptyInput));
        assert!(relay.messages().is_empty());
        assert_eq!(relay.phase(), RelayPhase::Idle);
    }

    #[test]
    fn second_submit_while_sending_is_rejected() {
        let mut relay = fresh_relay();
        relay.begin_turn("first").expect("first turn accepted");

        assert_eq!(relay.begin_turn("second"), Err(TurnRejected::TurnInFlight));
        assert_eq!(
            relay.begin_business_selection("b1", "Eko Bites"),
            Err(TurnRejected::TurnInFlight)
        );
        assert_eq!(relay.messages().len(), 1);
    }

    #[tokio::test]
    async fn answered_turn_appends_bot_message_and_returns_to_idle() {
        let mut relay = fresh_relay();
        let gateway = ScriptedGateway::new(vec![Ok(BackendReply::answer("Hi!"))]);

        let resolution = relay
            .send_turn(&gateway, "Hello")
            .await
            .expect("turn accepted");

        assert_eq!(
            resolution,
            TurnResolution::Answered {
                awaiting_business: false
            }
        );
        assert_eq!(relay.phase(), RelayPhase::Idle);
        assert_eq!(relay.messages()[1].sender, Sender::Bot);
        assert_eq!(relay.messages()[1].text, "Hi!");
        assert_eq!(
            gateway.seen(),
            vec![("Hello".to_owned(), relay.session_id().to_owned())]
        );
    }

    #[tokio::test]
    async fn failed_turn_appends_exactly_one_apology() {
        let mut relay = fresh_relay();
        let gateway = ScriptedGateway::new(vec![Err(GatewayError::Transport(
            "connection refused".to_owned(),
        ))]);
        let session_before = relay.session_id().to_owned();

        let resolution = relay
            .send_turn(&gateway, "Hello")
            .await
            .expect("turn accepted");

        assert_eq!(resolution, TurnResolution::Failed);
        assert_eq!(relay.phase(), RelayPhase::Idle);
        assert_eq!(relay.messages().len(), 2);
        assert_eq!(relay.messages()[1].sender, Sender::Bot);
        assert_eq!(relay.messages()[1].text, APOLOGY_TEXT);
        assert_eq!(relay.session_id(), session_before);
    }

    #[test]
    fn awaiting_business_reply_enters_selection_with_cleared_filter() {
        let mut relay = fresh_relay();
        relay.picker_mut().reopen();
        relay.picker_mut().push_query_char('z');
        let turn = relay.begin_turn("I want to order food").expect("turn");

        let resolution = relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(awaiting_reply("Hi!")),
        });

        assert_eq!(
            resolution,
            TurnResolution::Answered {
                awaiting_business: true
            }
        );
        assert_eq!(relay.phase(), RelayPhase::AwaitingBusinessSelection);
        assert_eq!(relay.messages().last().map(|m| m.text.as_str()), Some("Hi!"));
        assert!(relay.picker().is_open());
        assert_eq!(relay.picker().query(), "");
    }

    #[test]
    fn plain_chat_reply_leaves_the_selection_sub_flow() {
        let mut relay = fresh_relay();
        let turn = relay.begin_turn("order").expect("turn");
        relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(awaiting_reply("Which business?")),
        });

        let turn = relay.begin_turn("never mind").expect("turn");
        relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(BackendReply::answer("Sure.")),
        });

        assert_eq!(relay.phase(), RelayPhase::Idle);
        assert!(!relay.picker().is_open());
    }

    #[test]
    fn session_reset_reply_replaces_the_session_regardless_of_content() {
        let mut relay = fresh_relay();
        let turn = relay.begin_turn("hello").expect("turn");
        relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(BackendReply::Answer {
                answer: "Welcome".to_owned(),
                state: ConversationState::Chat,
                business_name: Some("Eko Bites".to_owned()),
                business_description: None,
            }),
        });
        let old_session = relay.session_id().to_owned();

        let turn = relay.begin_turn("start over").expect("turn");
        let resolution = relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(BackendReply::Reset),
        });

        assert_eq!(resolution, TurnResolution::SessionReset);
        assert_ne!(relay.session_id(), old_session);
        assert!(relay.messages().is_empty());
        assert_eq!(relay.business_name(), None);
        assert_eq!(relay.phase(), RelayPhase::Idle);
    }

    #[test]
    fn business_name_from_reply_is_kept_and_persisted() {
        let mut relay = fresh_relay();
        let turn = relay.begin_turn("hello").expect("turn");

        relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(BackendReply::Answer {
                answer: "You are chatting with Eko Bites".to_owned(),
                state: ConversationState::Chat,
                business_name: Some("Eko Bites".to_owned()),
                business_description: Some("Restaurant".to_owned()),
            }),
        });

        assert_eq!(relay.business_name(), Some("Eko Bites"));
        assert_eq!(relay.business_description(), Some("Restaurant"));
        let stored = relay.store().load().expect("load");
        assert_eq!(stored.business_name.as_deref(), Some("Eko Bites"));
    }

    #[test]
    fn completion_arriving_after_reset_is_ignored() {
        let mut relay = fresh_relay();
        let stale_turn = relay.begin_turn("hello").expect("turn");

        relay.reset_session();
        let resolution = relay.complete_turn(TurnCompletion {
            turn: stale_turn,
            outcome: Ok(BackendReply::Answer {
                answer: "old answer".to_owned(),
                state: ConversationState::AwaitingBusiness,
                business_name: Some("Old Business".to_owned()),
                business_description: None,
            }),
        });

        assert_eq!(resolution, TurnResolution::Stale);
        assert!(relay.messages().is_empty());
        assert_eq!(relay.business_name(), None);
        assert_eq!(relay.phase(), RelayPhase::Idle);
    }

    #[test]
    fn stale_completion_does_not_unblock_the_new_sessions_turn() {
        let mut relay = fresh_relay();
        let stale_turn = relay.begin_turn("hello").expect("turn");
        relay.reset_session();
        relay.begin_turn("fresh start").expect("turn in new session");

        relay.complete_turn(TurnCompletion {
            turn: stale_turn,
            outcome: Err(GatewayError::Status(500)),
        });

        assert_eq!(relay.phase(), RelayPhase::Sending);
        assert_eq!(relay.messages().len(), 1);
    }

    #[tokio::test]
    async fn business_selection_sends_id_and_shows_name() {
        let mut relay = fresh_relay();
        let gateway = ScriptedGateway::new(vec![
            Ok(awaiting_reply("Pick a business")),
            Ok(BackendReply::answer("Welcome to Eko Bites")),
        ]);
        relay
            .send_turn(&gateway, "I want food")
            .await
            .expect("turn accepted");
        assert_eq!(relay.phase(), RelayPhase::AwaitingBusinessSelection);

        let resolution = relay
            .select_business(&gateway, "b1", "Eko Bites")
            .await
            .expect("selection accepted");

        assert_eq!(
            resolution,
            TurnResolution::Answered {
                awaiting_business: false
            }
        );
        assert_eq!(gateway.seen()[1].0, "b1");
        assert_eq!(relay.messages()[2].text, "Eko Bites");
        assert_eq!(relay.messages()[2].sender, Sender::User);
        assert_eq!(relay.phase(), RelayPhase::Idle);
        assert!(!relay.picker().is_open());
    }

    #[tokio::test]
    async fn failed_business_selection_still_leaves_the_sub_flow() {
        let mut relay = fresh_relay();
        let gateway = ScriptedGateway::new(vec![
            Ok(awaiting_reply("Pick a business")),
            Err(GatewayError::InvalidResponse("missing answer".to_owned())),
        ]);
        relay.send_turn(&gateway, "food").await.expect("turn");

        let resolution = relay
            .select_business(&gateway, "b1", "Eko Bites")
            .await
            .expect("selection accepted");

        assert_eq!(resolution, TurnResolution::Failed);
        assert_eq!(relay.phase(), RelayPhase::Idle);
        assert!(!relay.picker().is_open());
        assert_eq!(
            relay.messages().last().map(|m| m.text.as_str()),
            Some(APOLOGY_TEXT)
        );
    }

    #[tokio::test]
    async fn selection_reply_asking_again_still_exits_the_sub_flow() {
        let mut relay = fresh_relay();
        let gateway = ScriptedGateway::new(vec![Ok(awaiting_reply("Try another one"))]);

        relay
            .select_business(&gateway, "b9", "Unknown")
            .await
            .expect("selection accepted");

        assert_eq!(relay.phase(), RelayPhase::Idle);
    }

    #[test]
    fn reset_produces_new_empty_session_and_persists_it() {
        let mut relay = fresh_relay();
        let turn = relay.begin_turn("hello").expect("turn");
        relay.complete_turn(TurnCompletion {
            turn,
            outcome: Ok(awaiting_reply("Pick one")),
        });
        relay.picker_mut().push_query_char('e');
        let old_session = relay.session_id().to_owned();

        relay.reset_session();

        assert_ne!(relay.session_id(), old_session);
        assert!(relay.messages().is_empty());
        assert_eq!(relay.business_name(), None);
        assert_eq!(relay.phase(), RelayPhase::Idle);
        assert!(!relay.picker().is_open());
        assert_eq!(relay.picker().query(), "");

        let stored = relay.store().load().expect("load");
        assert_eq!(stored.session_id.as_deref(), Some(relay.session_id()));
        assert_eq!(stored.transcript, None);
        assert_eq!(stored.business_name, None);
    }
}
