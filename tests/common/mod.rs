//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use kitchen_voice::recipes::{Recipe, RecipeCatalog};
use kitchen_voice::{
    Error, Kitchen, RecognitionEngine, Result, SpeechEngine, SpeechQueue, SpeechSettings,
};

/// Speech engine that records every utterance it is asked to speak
///
/// A gated engine blocks each utterance until [`release`](Self::release)
/// grants it a permit.
#[derive(Default)]
pub struct RecordingSpeechEngine {
    spoken: Mutex<Vec<String>>,
    cancels: AtomicUsize,
    gate: Option<Semaphore>,
}

impl RecordingSpeechEngine {
    /// Engine that finishes every utterance immediately
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Engine that holds every utterance until released
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    /// Let `n` more utterances finish
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Utterances started so far, in order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for RecordingSpeechEngine {
    async fn speak(&self, text: &str, _settings: &SpeechSettings) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());

        match &self.gate {
            Some(gate) => gate.acquire().await.unwrap().forget(),
            None => tokio::task::yield_now().await,
        }

        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Speech engine whose every utterance fails
pub struct FailingSpeechEngine;

#[async_trait]
impl SpeechEngine for FailingSpeechEngine {
    async fn speak(&self, text: &str, _settings: &SpeechSettings) -> Result<()> {
        Err(Error::Speech(format!("cannot say {text}")))
    }

    fn cancel(&self) {}
}

/// Recognition engine that only counts start and stop requests
#[derive(Default)]
pub struct ScriptedRecognitionEngine {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub unsupported: bool,
    pub fail_start: AtomicBool,
}

impl ScriptedRecognitionEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            unsupported: true,
            ..Self::default()
        })
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl RecognitionEngine for ScriptedRecognitionEngine {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn start(&self) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::Recognition("device busy".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Speech queue over `engine` with no pause between utterances
pub fn queue(engine: Arc<dyn SpeechEngine>) -> SpeechQueue {
    SpeechQueue::new(engine, SpeechSettings::default(), Duration::ZERO)
}

/// Kitchen with the built-in recipes speaking through `engine`
pub fn kitchen(engine: Arc<dyn SpeechEngine>) -> Arc<Kitchen> {
    Arc::new(Kitchen::new(RecipeCatalog::builtin(), queue(engine)))
}

/// Recipe with `steps` numbered steps
pub fn recipe_with_steps(steps: usize) -> Recipe {
    Recipe {
        id: "test".to_string(),
        name: "Test Curry".to_string(),
        cuisine: "Indian".to_string(),
        ingredients: vec!["Water".to_string()],
        steps: (1..=steps).map(|i| format!("Do thing {i}")).collect(),
        prep_time: 5,
        cook_time: 10,
        servings: 2,
        nutrition: kitchen_voice::recipes::Nutrition::default(),
    }
}

/// Yield until the queue has nothing left to say
pub async fn settle(queue: &SpeechQueue) {
    for _ in 0..1000 {
        if !queue.is_speaking() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("speech queue did not drain");
}
