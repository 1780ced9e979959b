//! Shared kitchen context
//!
//! [`Kitchen`] owns everything the voice pipeline and the UI observe:
//! active section, selected recipe, timers, pantry, shopping list and the
//! voice session status. Voice commands and direct calls go through the
//! same methods, so both input paths mutate state identically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::intent::Section;
use crate::recipes::{Recipe, RecipeCatalog};
use crate::speech::{Priority, SpeechQueue, SpeechTicket};

/// Channel capacity for notifications
const CHANNEL_CAPACITY: usize = 64;

/// Process-wide voice session status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSessionState {
    /// The user wants the microphone on
    pub is_listening: bool,
    /// Latest interim or final transcript
    pub transcript: String,
    /// Confidence of the latest final transcript
    pub confidence: f32,
    /// A command is being executed
    pub is_processing: bool,
    /// Speech output is playing or queued
    pub is_speaking: bool,
    /// Raw text of the last processed command
    pub last_command: String,
    /// Outcome of the last processed command
    pub last_command_success: Option<bool>,
    /// Free-text status label
    pub voice_status: String,
    /// Speech recognition is available
    pub is_supported: bool,
}

impl Default for VoiceSessionState {
    fn default() -> Self {
        Self {
            is_listening: false,
            transcript: String::new(),
            confidence: 0.0,
            is_processing: false,
            is_speaking: false,
            last_command: String::new(),
            last_command_success: None,
            voice_status: "Initializing...".to_string(),
            is_supported: false,
        }
    }
}

/// A countdown timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: String,
    pub name: String,
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub is_active: bool,
}

impl Timer {
    /// Advance one second; returns true when this tick completed the timer
    pub const fn tick(&mut self) -> bool {
        if !self.is_active || self.remaining_seconds == 0 {
            return false;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.is_active = false;
            return true;
        }
        false
    }

    /// Remaining time as `MM:SS`
    #[must_use]
    pub fn format_remaining(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    /// Remaining share of the duration, in percent
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration_seconds == 0 {
            return 0.0;
        }
        f64::from(self.remaining_seconds) / f64::from(self.duration_seconds) * 100.0
    }
}

/// An ingredient in stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
}

/// An entry on the shopping list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub checked: bool,
}

/// Everything UI observers can read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenState {
    pub active_section: Section,
    pub current_recipe: Option<Recipe>,
    pub timers: Vec<Timer>,
    pub pantry: Vec<PantryItem>,
    pub shopping_list: Vec<ShoppingItem>,
    pub session: VoiceSessionState,
}

impl Default for KitchenState {
    fn default() -> Self {
        Self {
            active_section: Section::Recipes,
            current_recipe: None,
            timers: Vec::new(),
            pantry: Vec::new(),
            shopping_list: Vec::new(),
            session: VoiceSessionState::default(),
        }
    }
}

impl KitchenState {
    /// Initial state with the starter pantry and shopping list
    #[must_use]
    pub fn seeded() -> Self {
        let pantry = [
            ("1", "Onions", 5.0, "pcs"),
            ("2", "Tomatoes", 3.0, "pcs"),
            ("3", "Chicken", 500.0, "g"),
            ("4", "Rice", 2.0, "kg"),
            ("5", "Garlic", 1.0, "head"),
        ]
        .into_iter()
        .map(|(id, name, quantity, unit)| PantryItem {
            id: id.to_string(),
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            expiry_date: None,
        })
        .collect();

        let shopping_list = [("1", "Milk"), ("2", "Eggs"), ("3", "Bread")]
            .into_iter()
            .map(|(id, name)| ShoppingItem {
                id: id.to_string(),
                name: name.to_string(),
                checked: false,
            })
            .collect();

        Self {
            pantry,
            shopping_list,
            ..Self::default()
        }
    }
}

/// Severity of a user-visible notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Destructive,
}

/// A toast-style message for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
}

impl Notification {
    /// Informational notification
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NotificationLevel::Info,
        }
    }

    /// Error notification
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NotificationLevel::Destructive,
        }
    }
}

/// Monotonic millisecond-based ids
#[derive(Debug, Default)]
struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    fn next(&self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// The shared kitchen context
pub struct Kitchen {
    state: Mutex<KitchenState>,
    speech: SpeechQueue,
    catalog: RecipeCatalog,
    ids: IdGenerator,
    /// Held for the duration of one command execution
    pub(crate) processing: tokio::sync::Mutex<()>,
    notifications: broadcast::Sender<Notification>,
}

impl std::fmt::Debug for Kitchen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kitchen")
            .field("speech", &self.speech)
            .field("recipes", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Kitchen {
    /// Create a kitchen with seeded state
    #[must_use]
    pub fn new(catalog: RecipeCatalog, speech: SpeechQueue) -> Self {
        Self::with_state(catalog, speech, KitchenState::seeded())
    }

    /// Create a kitchen starting from `state`
    #[must_use]
    pub fn with_state(catalog: RecipeCatalog, speech: SpeechQueue, state: KitchenState) -> Self {
        let (notifications, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(state),
            speech,
            catalog,
            ids: IdGenerator::default(),
            processing: tokio::sync::Mutex::new(()),
            notifications,
        }
    }

    fn lock(&self) -> MutexGuard<'_, KitchenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the full state
    #[must_use]
    pub fn snapshot(&self) -> KitchenState {
        let mut state = self.lock().clone();
        state.session.is_speaking = self.speech.is_speaking();
        state
    }

    /// Copy of the voice session status
    #[must_use]
    pub fn session(&self) -> VoiceSessionState {
        let mut session = self.lock().session.clone();
        session.is_speaking = self.speech.is_speaking();
        session
    }

    /// Mutate the voice session status
    pub fn update_session(&self, f: impl FnOnce(&mut VoiceSessionState)) {
        f(&mut self.lock().session);
    }

    /// The speech output queue
    #[must_use]
    pub const fn speech(&self) -> &SpeechQueue {
        &self.speech
    }

    /// The recipe catalog
    #[must_use]
    pub const fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    /// Queue `text` for speech
    pub fn speak(&self, text: impl Into<String>, priority: Priority) -> SpeechTicket {
        self.speech.enqueue(text, priority)
    }

    /// Queue `text` for speech without waiting
    pub fn say(&self, text: impl Into<String>, priority: Priority) {
        self.speech.say(text, priority);
    }

    /// Drop all queued and in-flight speech
    pub fn clear_speech_queue(&self) {
        self.speech.clear();
    }

    /// Subscribe to notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Publish a notification (ignored if nobody listens)
    pub fn notify(&self, notification: Notification) {
        tracing::debug!(title = %notification.title, "notification");
        let _ = self.notifications.send(notification);
    }

    #[must_use]
    pub fn active_section(&self) -> Section {
        self.lock().active_section
    }

    pub fn set_active_section(&self, section: Section) {
        tracing::info!(%section, "active section changed");
        self.lock().active_section = section;
    }

    #[must_use]
    pub fn current_recipe(&self) -> Option<Recipe> {
        self.lock().current_recipe.clone()
    }

    pub fn set_current_recipe(&self, recipe: Option<Recipe>) {
        tracing::info!(recipe = recipe.as_ref().map(|r| r.name.as_str()), "current recipe changed");
        self.lock().current_recipe = recipe;
    }

    #[must_use]
    pub fn timers(&self) -> Vec<Timer> {
        self.lock().timers.clone()
    }

    /// Timers still counting down
    #[must_use]
    pub fn active_timers(&self) -> Vec<Timer> {
        self.lock()
            .timers
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect()
    }

    /// Add a timer and return its id
    ///
    /// A zero-length timer is created already inactive.
    pub fn add_timer(&self, name: impl Into<String>, duration_seconds: u32) -> String {
        let timer = Timer {
            id: self.ids.next(),
            name: name.into(),
            duration_seconds,
            remaining_seconds: duration_seconds,
            is_active: duration_seconds > 0,
        };
        tracing::info!(id = %timer.id, name = %timer.name, duration_seconds, "timer added");

        let id = timer.id.clone();
        self.lock().timers.push(timer);
        id
    }

    /// Remove a timer; returns whether it existed
    pub fn remove_timer(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.timers.len();
        state.timers.retain(|t| t.id != id);
        before != state.timers.len()
    }

    /// Advance every active timer by one second
    ///
    /// Announces each timer that reaches zero and returns them.
    pub fn tick_timers(&self) -> Vec<Timer> {
        let completed: Vec<Timer> = self
            .lock()
            .timers
            .iter_mut()
            .filter_map(|t| t.tick().then(|| t.clone()))
            .collect();

        for timer in &completed {
            tracing::info!(id = %timer.id, name = %timer.name, "timer complete");
            self.say(
                format!("Timer complete! Your {} is done.", timer.name),
                Priority::High,
            );
            self.notify(Notification::info(
                "⏰ Timer Complete!",
                format!("Your {} is done.", timer.name),
            ));
        }

        completed
    }

    #[must_use]
    pub fn pantry(&self) -> Vec<PantryItem> {
        self.lock().pantry.clone()
    }

    /// Pantry items whose name contains `query`, ignoring case
    #[must_use]
    pub fn search_pantry(&self, query: &str) -> Vec<PantryItem> {
        let query = query.to_lowercase();
        self.lock()
            .pantry
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    /// Add a pantry item and return its id
    pub fn add_pantry_item(
        &self,
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        expiry_date: Option<NaiveDate>,
    ) -> String {
        let item = PantryItem {
            id: self.ids.next(),
            name: name.into(),
            quantity,
            unit: unit.into(),
            expiry_date,
        };
        let id = item.id.clone();
        self.lock().pantry.push(item);
        id
    }

    /// Remove a pantry item; returns whether it existed
    pub fn remove_pantry_item(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.pantry.len();
        state.pantry.retain(|item| item.id != id);
        before != state.pantry.len()
    }

    #[must_use]
    pub fn shopping_list(&self) -> Vec<ShoppingItem> {
        self.lock().shopping_list.clone()
    }

    /// Append an unchecked shopping item and return its id
    pub fn add_to_shopping_list(&self, name: impl Into<String>) -> String {
        let item = ShoppingItem {
            id: self.ids.next(),
            name: name.into(),
            checked: false,
        };
        tracing::info!(id = %item.id, name = %item.name, "shopping item added");

        let id = item.id.clone();
        self.lock().shopping_list.push(item);
        id
    }

    /// Remove a shopping item by id; returns whether it existed
    pub fn remove_from_shopping_list(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.shopping_list.len();
        state.shopping_list.retain(|item| item.id != id);
        before != state.shopping_list.len()
    }

    /// Remove every shopping item whose name contains `keyword`, ignoring case
    ///
    /// Returns how many were removed.
    pub fn remove_shopping_items_matching(&self, keyword: &str) -> usize {
        let keyword = keyword.to_lowercase();
        let mut state = self.lock();
        let before = state.shopping_list.len();
        state
            .shopping_list
            .retain(|item| !item.name.to_lowercase().contains(&keyword));
        let removed = before - state.shopping_list.len();
        tracing::info!(keyword = %keyword, removed, "shopping items removed");
        removed
    }

    /// Flip the checked flag; returns the new value, or `None` if not found
    pub fn toggle_shopping_item(&self, id: &str) -> Option<bool> {
        let mut state = self.lock();
        let item = state.shopping_list.iter_mut().find(|item| item.id == id)?;
        item.checked = !item.checked;
        Some(item.checked)
    }
}

/// Run the timer countdown every `period` until the kitchen is dropped
pub fn spawn_timer_countdown(kitchen: &Arc<Kitchen>, period: Duration) -> JoinHandle<()> {
    let kitchen: Weak<Kitchen> = Arc::downgrade(kitchen);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            interval.tick().await;
            let Some(kitchen) = kitchen.upgrade() else {
                tracing::debug!("kitchen dropped, stopping timer countdown");
                return;
            };
            kitchen.tick_timers();
        }
    })
}
