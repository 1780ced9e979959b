//! Command execution
//!
//! Applies a classified [`Intent`] to the shared [`Kitchen`] and speaks the
//! confirmations. Multi-sentence responses are awaited one utterance at a
//! time, so they play in order even when other speech is queued.

use std::sync::Arc;

use serde::Serialize;

use crate::intent::{self, Intent, ReadMode, Section};
use crate::kitchen::Kitchen;
use crate::recipes::Recipe;
use crate::speech::Priority;
use crate::Result;

/// Steps read aloud before summarizing the rest
const MAX_STEPS_READ: usize = 3;

/// Ingredients read aloud before summarizing the rest
const MAX_INGREDIENTS_READ: usize = 5;

const HELP_TEXT: &str = "I can help you with recipes, navigation, timers, and shopping lists. \
Try saying: show me butter chicken recipe, go to pantry, set timer for 5 minutes, \
or add milk to shopping list.";

const GREETING_TEXT: &str = "Hello! I'm Cook Master AI, your voice-controlled kitchen assistant. \
How can I help you cook today?";

const UNRECOGNIZED_TEXT: &str = "I didn't understand that command. Say 'help' to hear what I can do.";

const NO_RECIPE_TEXT: &str = "No recipe is currently selected. Please choose a recipe first.";

const ERROR_TEXT: &str = "Sorry, there was an error processing your command";

/// Name of timers created by voice
pub const VOICE_TIMER_NAME: &str = "Cooking Timer";

/// One utterance spoken while executing a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpokenResponse {
    pub text: String,
    pub priority: Priority,
}

/// Result of executing one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub intent: Intent,
    pub success: bool,
    /// Utterances in the order they were queued
    pub responses: Vec<SpokenResponse>,
}

/// Speaks through the kitchen and remembers what it said
struct Responder<'a> {
    kitchen: &'a Kitchen,
    spoken: Vec<SpokenResponse>,
}

impl<'a> Responder<'a> {
    const fn new(kitchen: &'a Kitchen) -> Self {
        Self {
            kitchen,
            spoken: Vec::new(),
        }
    }

    async fn say(&mut self, text: impl Into<String>, priority: Priority) {
        let text = text.into();
        self.spoken.push(SpokenResponse {
            text: text.clone(),
            priority,
        });
        self.kitchen.speak(text, priority).await;
    }
}

/// Resets `is_processing` however execution ends
struct ProcessingGuard<'a> {
    kitchen: &'a Kitchen,
}

impl<'a> ProcessingGuard<'a> {
    fn new(kitchen: &'a Kitchen) -> Self {
        kitchen.update_session(|s| s.is_processing = true);
        Self { kitchen }
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.kitchen.update_session(|s| s.is_processing = false);
    }
}

/// Executes intents against a shared kitchen
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    kitchen: Arc<Kitchen>,
}

impl CommandExecutor {
    #[must_use]
    pub const fn new(kitchen: Arc<Kitchen>) -> Self {
        Self { kitchen }
    }

    #[must_use]
    pub const fn kitchen(&self) -> &Arc<Kitchen> {
        &self.kitchen
    }

    /// Classify and execute one final transcript
    ///
    /// Commands run strictly one at a time; a caller arriving while another
    /// command executes waits its turn. Failures are spoken as an apology
    /// and reported with `success == false`.
    pub async fn process_command(&self, utterance: &str) -> CommandOutcome {
        let _turn = self.kitchen.processing.lock().await;
        let _processing = ProcessingGuard::new(&self.kitchen);

        let utterance = intent::normalize(utterance);
        self.kitchen.update_session(|s| {
            s.last_command.clone_from(&utterance);
            s.voice_status = "Processing command...".to_string();
        });

        let intent = intent::classify(&utterance);
        tracing::info!(command = %utterance, intent = intent.kind(), "processing voice command");

        let result = self.execute(&intent).await;
        match result {
            Ok(outcome) => {
                let status = if outcome.success {
                    "Command executed"
                } else {
                    "Command not recognized"
                };
                self.kitchen.update_session(|s| {
                    s.last_command_success = Some(outcome.success);
                    s.voice_status = status.to_string();
                });
                outcome
            }
            Err(e) => {
                tracing::error!(error = %e, command = %utterance, "command failed");
                let mut responder = Responder::new(&self.kitchen);
                responder.say(ERROR_TEXT, Priority::High).await;
                self.kitchen.update_session(|s| {
                    s.last_command_success = Some(false);
                    s.voice_status = "Error processing command".to_string();
                });
                CommandOutcome {
                    intent,
                    success: false,
                    responses: responder.spoken,
                }
            }
        }
    }

    /// Apply `intent` and speak its confirmations
    ///
    /// Does not take the processing lock; use [`process_command`](Self::process_command)
    /// for transcripts.
    ///
    /// # Errors
    ///
    /// Returns error if the intent refers to a recipe missing from the catalog
    pub async fn execute(&self, intent: &Intent) -> Result<CommandOutcome> {
        let kitchen = &*self.kitchen;
        let mut responder = Responder::new(kitchen);

        let success = match intent {
            Intent::Navigate { section } => {
                kitchen.set_active_section(*section);
                responder.say(section.confirmation(), Priority::High).await;
                true
            }
            Intent::FindRecipe { recipe } => {
                let recipe = kitchen.catalog().resolve(*recipe)?.clone();
                let text = format!("Found {} recipe. Opening now.", recipe.name);
                kitchen.set_current_recipe(Some(recipe));
                kitchen.set_active_section(Section::Recipes);
                responder.say(text, Priority::High).await;
                true
            }
            Intent::ReadRecipe { mode } => match kitchen.current_recipe() {
                Some(recipe) => {
                    read_recipe(&mut responder, &recipe, *mode).await;
                    true
                }
                None => {
                    responder.say(NO_RECIPE_TEXT, Priority::High).await;
                    false
                }
            },
            Intent::ShoppingAdd { item } => {
                kitchen.add_to_shopping_list(item.clone());
                responder
                    .say(format!("Added {item} to shopping list"), Priority::High)
                    .await;
                true
            }
            Intent::ShoppingRemove { item } => {
                kitchen.remove_shopping_items_matching(item);
                responder
                    .say(format!("Removed {item} from shopping list"), Priority::High)
                    .await;
                true
            }
            Intent::SetTimer { minutes } => {
                kitchen.add_timer(VOICE_TIMER_NAME, minutes.saturating_mul(60));
                responder
                    .say(format!("Timer set for {minutes} minutes"), Priority::High)
                    .await;
                true
            }
            Intent::Help => {
                responder.say(HELP_TEXT, Priority::High).await;
                true
            }
            Intent::Greeting => {
                responder.say(GREETING_TEXT, Priority::High).await;
                true
            }
            Intent::Stop => {
                kitchen.clear_speech_queue();
                kitchen.update_session(|s| s.is_listening = false);
                responder.say("Voice assistant stopped", Priority::High).await;
                true
            }
            Intent::Unrecognized => {
                responder.say(UNRECOGNIZED_TEXT, Priority::High).await;
                false
            }
        };

        tracing::debug!(intent = intent.kind(), success, "intent executed");

        Ok(CommandOutcome {
            intent: intent.clone(),
            success,
            responses: responder.spoken,
        })
    }
}

async fn read_recipe(responder: &mut Responder<'_>, recipe: &Recipe, mode: ReadMode) {
    match mode {
        ReadMode::Steps => {
            responder
                .say(
                    format!("Reading cooking steps for {}", recipe.name),
                    Priority::High,
                )
                .await;
            for (i, step) in recipe.steps.iter().take(MAX_STEPS_READ).enumerate() {
                responder
                    .say(format!("Step {}: {step}", i + 1), Priority::Normal)
                    .await;
            }
            if recipe.steps.len() > MAX_STEPS_READ {
                let remaining = recipe.steps.len() - MAX_STEPS_READ;
                responder
                    .say(
                        format!(
                            "And {remaining} more steps. Check the screen for complete recipe."
                        ),
                        Priority::Normal,
                    )
                    .await;
            }
        }
        ReadMode::Ingredients => {
            responder
                .say(
                    format!("Reading ingredients for {}", recipe.name),
                    Priority::High,
                )
                .await;
            for (i, ingredient) in recipe
                .ingredients
                .iter()
                .take(MAX_INGREDIENTS_READ)
                .enumerate()
            {
                responder
                    .say(format!("{}. {ingredient}", i + 1), Priority::Normal)
                    .await;
            }
            if recipe.ingredients.len() > MAX_INGREDIENTS_READ {
                let remaining = recipe.ingredients.len() - MAX_INGREDIENTS_READ;
                responder
                    .say(format!("And {remaining} more ingredients"), Priority::Normal)
                    .await;
            }
        }
    }
}
