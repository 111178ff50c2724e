//! Common test fixtures: events, capabilities and recording listeners.

#![allow(dead_code)]

use anyhow::bail;
use blackboard::BlackboardError;
use blackboard::ErrorSink;
use blackboard::Event;
use blackboard::Notifier;
use blackboard::NotifierSlot;
use parking_lot::Mutex;

// EVENTS

#[derive(Default)]
pub struct GreetingEvent {
    pub text: String,
    notifier: NotifierSlot,
}

impl GreetingEvent {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            notifier: NotifierSlot::new(),
        }
    }
}

blackboard::event!(GreetingEvent);

#[derive(Default)]
pub struct FarewellEvent {
    pub text: String,
    notifier: NotifierSlot,
}

impl FarewellEvent {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            notifier: NotifierSlot::new(),
        }
    }
}

blackboard::event!(FarewellEvent);

/// Family shared by chat traffic events.
pub trait Chatter {}

#[derive(Default)]
pub struct ChatMessage {
    pub text: String,
    notifier: NotifierSlot,
}

impl ChatMessage {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            notifier: NotifierSlot::new(),
        }
    }
}

blackboard::event!(ChatMessage: dyn Chatter);

// CAPABILITIES

pub trait Greeter: Send + Sync {
    fn on_greeting(&self, event: &GreetingEvent) -> anyhow::Result<()>;
}

blackboard::contract!(dyn Greeter, builder => builder
    .handler("on_greeting", |g, e: &GreetingEvent| g.on_greeting(e))
    .pairs_with::<GreetingEvent>());

pub trait Farewell: Send + Sync {
    fn on_farewell(&self, event: &FarewellEvent) -> anyhow::Result<()>;
}

blackboard::contract!(dyn Farewell, builder => builder
    .handler("on_farewell", |f, e: &FarewellEvent| f.on_farewell(e)));

/// Receives greetings through the handler inherited from [`Greeter`].
pub trait PoliteGreeter: Greeter {
    fn bow(&self) -> &'static str;
}

blackboard::contract!(dyn PoliteGreeter, builder => builder
    .extends::<dyn Greeter, _>(|g| g));

// LISTENERS

/// Records every greeting it receives along with the notifier that sent it.
#[derive(Default)]
pub struct ConsoleGreeter {
    pub greetings: Mutex<Vec<String>>,
    pub notified_by: Mutex<Vec<String>>,
}

impl ConsoleGreeter {
    pub fn greetings(&self) -> Vec<String> {
        self.greetings.lock().clone()
    }
}

impl Greeter for ConsoleGreeter {
    fn on_greeting(&self, event: &GreetingEvent) -> anyhow::Result<()> {
        self.greetings.lock().push(event.text.clone());
        if let Some(notifier) = event.notifier() {
            self.notified_by.lock().push(notifier.notifier_name());
        }
        Ok(())
    }
}

blackboard::listener!(ConsoleGreeter: dyn Greeter);

/// Implements two unrelated capabilities.
#[derive(Default)]
pub struct Host {
    pub greetings: Mutex<Vec<String>>,
    pub farewells: Mutex<Vec<String>>,
}

impl Greeter for Host {
    fn on_greeting(&self, event: &GreetingEvent) -> anyhow::Result<()> {
        self.greetings.lock().push(event.text.clone());
        Ok(())
    }
}

impl Farewell for Host {
    fn on_farewell(&self, event: &FarewellEvent) -> anyhow::Result<()> {
        self.farewells.lock().push(event.text.clone());
        Ok(())
    }
}

blackboard::listener!(Host: dyn Greeter, dyn Farewell);

#[derive(Default)]
pub struct Leaver {
    pub farewells: Mutex<Vec<String>>,
}

impl Farewell for Leaver {
    fn on_farewell(&self, event: &FarewellEvent) -> anyhow::Result<()> {
        self.farewells.lock().push(event.text.clone());
        Ok(())
    }
}

blackboard::listener!(Leaver: dyn Farewell);

/// Declares only [`PoliteGreeter`].
#[derive(Default)]
pub struct Butler {
    pub greetings: Mutex<Vec<String>>,
}

impl Greeter for Butler {
    fn on_greeting(&self, event: &GreetingEvent) -> anyhow::Result<()> {
        self.greetings.lock().push(format!("{}, sir", event.text));
        Ok(())
    }
}

impl PoliteGreeter for Butler {
    fn bow(&self) -> &'static str {
        "*bows*"
    }
}

blackboard::listener!(Butler: dyn PoliteGreeter);

pub enum Mood {
    Failing,
    Panicking,
}

pub struct GrumpyGreeter {
    pub mood: Mood,
}

impl Greeter for GrumpyGreeter {
    fn on_greeting(&self, event: &GreetingEvent) -> anyhow::Result<()> {
        match self.mood {
            Mood::Failing => bail!("not in the mood for {:?}", event.text),
            Mood::Panicking => panic!("grumpy greeter panicked"),
        }
    }
}

blackboard::listener!(GrumpyGreeter: dyn Greeter);

// NOTIFIERS AND SINKS

pub struct Doorbell;

impl Notifier for Doorbell {
    fn notifier_name(&self) -> String {
        "doorbell".to_string()
    }
}

pub struct Intercom;

impl Notifier for Intercom {}

/// Collects reported handler failures as messages.
#[derive(Default)]
pub struct RecordingSink {
    pub failures: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, failure: &BlackboardError) {
        self.failures.lock().push(failure.to_string());
    }
}
