//! In-crate fakes for the messaging and generation ports.

use std::{
    collections::{HashSet, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    backoff::Sleeper,
    domain::{ChatId, MessageId, MessageRef, PollId, UserId},
    generation::TextGenerator,
    messaging::{
        port::{MessagingPort, UpdateSource},
        types::{
            CommandMessage, InboundEvent, MessagingCapabilities, Origin, PollAnswer,
            RepliedMessage, SentPoll, TextMessage, Update, UpdateKind,
        },
    },
    Error, Result,
};

#[derive(Clone, Debug)]
pub struct SentText {
    pub chat_id: ChatId,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

#[derive(Clone, Debug)]
pub struct SentPollRecord {
    pub chat_id: ChatId,
    pub poll_id: PollId,
    pub message_id: MessageId,
    pub question: String,
    pub choices: Vec<String>,
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    texts: Mutex<Vec<SentText>>,
    polls: Mutex<Vec<SentPollRecord>>,
    failing: Mutex<HashSet<ChatId>>,
    caps: Option<MessagingCapabilities>,
}

impl FakeMessenger {
    /// Default is polls supported, 4096 chars.
    pub fn with_capabilities(caps: MessagingCapabilities) -> Self {
        Self {
            caps: Some(caps),
            ..Default::default()
        }
    }

    /// Every send to `chat_id` fails from now on.
    pub fn fail_for(&self, chat_id: ChatId) {
        self.failing.lock().unwrap().insert(chat_id);
    }

    pub fn texts(&self) -> Vec<SentText> {
        self.texts.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<SentText> {
        self.texts()
            .into_iter()
            .filter(|t| t.chat_id == chat_id)
            .collect()
    }

    pub fn polls(&self) -> Vec<SentPollRecord> {
        self.polls.lock().unwrap().clone()
    }

    fn alloc(&self) -> i32 {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        *guard
    }

    fn check(&self, chat_id: ChatId) -> Result<()> {
        if self.failing.lock().unwrap().contains(&chat_id) {
            return Err(Error::External(format!("chat {} rejected send", chat_id.0)));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.caps.unwrap_or(MessagingCapabilities {
            supports_polls: true,
            max_message_len: 4096,
        })
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef> {
        self.check(chat_id)?;
        let id = self.alloc();
        self.texts.lock().unwrap().push(SentText {
            chat_id,
            text: text.to_string(),
            reply_to,
        });
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id),
        })
    }

    async fn send_poll(
        &self,
        chat_id: ChatId,
        question: &str,
        choices: &[String],
    ) -> Result<SentPoll> {
        self.check(chat_id)?;
        let id = self.alloc();
        let poll_id = PollId(format!("poll-{id}"));
        self.polls.lock().unwrap().push(SentPollRecord {
            chat_id,
            poll_id: poll_id.clone(),
            message_id: MessageId(id),
            question: question.to_string(),
            choices: choices.to_vec(),
        });
        Ok(SentPoll {
            message: MessageRef {
                chat_id,
                message_id: MessageId(id),
            },
            poll_id,
        })
    }
}

/// Scripted generator: replies are consumed in order, the last one repeats.
pub struct FakeGenerator {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeGenerator {
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|s| Ok(s.into())).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err("backend down".to_string())])),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_reply(&self) -> std::result::Result<String, String> {
        let mut q = self.replies.lock().unwrap();
        if q.len() > 1 {
            q.pop_front().unwrap_or_else(|| Err("no reply".to_string()))
        } else {
            q.front()
                .cloned()
                .unwrap_or_else(|| Err("no reply".to_string()))
        }
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        self.next_reply().map_err(Error::Generation)
    }
}

/// Scripted update source; an exhausted script yields empty batches.
#[derive(Default)]
pub struct FakeSource {
    script: Mutex<VecDeque<Result<Vec<Update>>>>,
    offsets: Mutex<Vec<i64>>,
    clears: Mutex<usize>,
}

impl FakeSource {
    pub fn push_batch(&self, batch: Vec<Update>) {
        self.script.lock().unwrap().push_back(Ok(batch));
    }

    pub fn push_conflict(&self) {
        self.script.lock().unwrap().push_back(Err(Error::Conflict(
            "terminated by other getUpdates request".to_string(),
        )));
    }

    pub fn push_error(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(Error::External("network unreachable".to_string())));
    }

    pub fn offsets(&self) -> Vec<i64> {
        self.offsets.lock().unwrap().clone()
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

#[async_trait]
impl UpdateSource for FakeSource {
    async fn fetch_updates(
        &self,
        offset: i64,
        _timeout: Duration,
        _allowed: &[UpdateKind],
    ) -> Result<Vec<Update>> {
        self.offsets.lock().unwrap().push(offset);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn clear_pending_subscription(&self) -> Result<()> {
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }
}

/// Records requested sleeps instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, dur: Duration) {
        self.slept.lock().unwrap().push(dur);
    }
}

// === Event builders ===

pub const BOT_ID: UserId = UserId(999);
pub const BOT_HANDLE: &str = "ChatBuddyBot";

pub fn command(update_id: i64, chat: i64, text: &str) -> Update {
    Update {
        update_id,
        event: InboundEvent::Command(CommandMessage {
            chat_id: ChatId(chat),
            message_id: MessageId(update_id as i32),
            origin: Origin::Chat,
            sender: Some(UserId(1)),
            text: text.to_string(),
        }),
    }
}

pub fn channel_command(update_id: i64, chat: i64, text: &str) -> Update {
    let mut u = command(update_id, chat, text);
    if let InboundEvent::Command(c) = &mut u.event {
        c.origin = Origin::Channel;
        c.sender = None;
    }
    u
}

pub fn text(update_id: i64, chat: i64, text: &str) -> Update {
    Update {
        update_id,
        event: InboundEvent::Message(TextMessage {
            chat_id: ChatId(chat),
            message_id: MessageId(update_id as i32),
            origin: Origin::Chat,
            sender: Some(UserId(1)),
            text: text.to_string(),
            reply_to: None,
        }),
    }
}

pub fn reply(update_id: i64, chat: i64, text: &str, to: UserId, quoted: &str) -> Update {
    let mut u = self::text(update_id, chat, text);
    if let InboundEvent::Message(m) = &mut u.event {
        m.reply_to = Some(RepliedMessage {
            sender: Some(to),
            text: Some(quoted.to_string()),
        });
    }
    u
}

pub fn answer(update_id: i64, poll_id: &PollId, option: usize) -> Update {
    Update {
        update_id,
        event: InboundEvent::PollAnswer(PollAnswer {
            poll_id: poll_id.clone(),
            voter: Some(UserId(1)),
            option_ids: vec![option],
        }),
    }
}

pub const QUIZ_JSON: &str =
    r#"{"question":"X","choices":["1","2","3","4"],"answer_index":0}"#;

// === Full wiring over fakes ===

pub fn config() -> crate::config::Config {
    crate::config::Config::from_lookup(|k| match k {
        "TELEGRAM_BOT_TOKEN" => Some("token".to_string()),
        "GEMINI_API_KEY" => Some("key".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub struct Harness {
    pub messenger: std::sync::Arc<FakeMessenger>,
    pub generator: std::sync::Arc<FakeGenerator>,
    pub source: std::sync::Arc<FakeSource>,
    pub sleeper: std::sync::Arc<RecordingSleeper>,
    pub polls: std::sync::Arc<crate::polls::PollRegistry>,
    pub destinations: std::sync::Arc<crate::destinations::DestinationSet>,
    pub broadcaster: std::sync::Arc<crate::broadcast::BroadcastScheduler>,
    pub dispatcher: std::sync::Arc<crate::dispatch::Dispatcher>,
    pub update_loop: crate::update_loop::UpdateLoop,
}

impl Harness {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_generator(FakeGenerator::replies(replies))
    }

    pub fn with_generator(generator: FakeGenerator) -> Self {
        Self::with_parts(FakeMessenger::default(), generator)
    }

    pub fn with_parts(messenger: FakeMessenger, generator: FakeGenerator) -> Self {
        use std::sync::Arc;

        let cfg = config();
        let messenger = Arc::new(messenger);
        let generator = Arc::new(generator);
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let polls = Arc::new(crate::polls::PollRegistry::new());
        let destinations = Arc::new(crate::destinations::DestinationSet::new());

        let broadcaster = Arc::new(crate::broadcast::BroadcastScheduler::new(
            generator.clone(),
            messenger.clone(),
            polls.clone(),
            destinations.clone(),
            (&cfg).into(),
        ));
        let dispatcher = Arc::new(crate::dispatch::Dispatcher::new(
            crate::domain::BotIdentity {
                user_id: BOT_ID,
                username: BOT_HANDLE.to_string(),
            },
            messenger.clone(),
            generator.clone(),
            polls.clone(),
            destinations.clone(),
            broadcaster.clone(),
            (&cfg).into(),
        ));
        let update_loop =
            crate::update_loop::UpdateLoop::new(source.clone(), dispatcher.clone(), (&cfg).into())
                .with_sleeper(sleeper.clone());

        Self {
            messenger,
            generator,
            source,
            sleeper,
            polls,
            destinations,
            broadcaster,
            dispatcher,
            update_loop,
        }
    }
}
