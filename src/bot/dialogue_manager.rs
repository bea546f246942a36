//! Dialogue Manager module for handling dialogue state transitions

use chrono::NaiveDate;
use teloxide::utils::html;
use tracing::{debug, info};

use crate::dialogue::{advance, ConversationDialogue, ConversationState, FlowOutcome, Transition};
use crate::errors::AssistantError;
use crate::localization::{t_args_lang, t_lang};
use crate::models::{FitEntry, FitMetric, PlanEntry, UNSCHEDULED, WishlistEntry};
use crate::storage::Storage;

use super::ui_builder::{format_wishlist, Markup, Reply};

/// Enter a flow: store its first state and prompt for the first field.
/// Any previous flow of this chat, with its partial record, is replaced.
pub async fn start_flow(
    dialogue: &ConversationDialogue,
    state: ConversationState,
    language: &str,
) -> Result<Reply, AssistantError> {
    let reply = prompt_for(&state, language);
    dialogue.update(state).await?;
    Ok(reply)
}

/// Prompt asking for the input of `state`
pub fn prompt_for(state: &ConversationState, language: &str) -> Reply {
    let text = state
        .prompt_key()
        .map(|key| t_lang(key, language))
        .unwrap_or_default();
    let reply = Reply::text(text);
    match state {
        ConversationState::AwaitingPlanTime { .. } => {
            reply.with_markup(Markup::Choices(vec![UNSCHEDULED.to_string()]))
        }
        _ => reply,
    }
}

/// Handle free text while a flow is in progress
pub async fn handle_flow_input(
    storage: &dyn Storage,
    dialogue: &ConversationDialogue,
    state: ConversationState,
    user_id: i64,
    input: &str,
    language: &str,
    today: NaiveDate,
) -> Result<Reply, AssistantError> {
    match advance(&state, input, today) {
        Ok(Transition::Continue(next)) => {
            debug!(user_id, next_state = ?next, "Flow advanced");
            start_flow(dialogue, next, language).await
        }
        Ok(Transition::Complete(outcome)) => {
            // The flow ends whether or not applying the outcome succeeds.
            dialogue.exit().await?;
            apply_outcome(storage, user_id, outcome, language, today).await
        }
        Ok(Transition::Idle) => Ok(Reply::text(t_lang("not-understood", language)).with_markup(Markup::MainMenu)),
        Err(AssistantError::Validation(key)) => {
            // Keep the flow where it is so the user can retry
            let mut text = t_lang(key, language);
            if let Some(prompt_key) = state.prompt_key() {
                text.push('\n');
                text.push_str(&t_lang(prompt_key, language));
            }
            Ok(Reply::text(text))
        }
        Err(e) => Err(e),
    }
}

/// Persist or look up what a finished flow collected
async fn apply_outcome(
    storage: &dyn Storage,
    user_id: i64,
    outcome: FlowOutcome,
    language: &str,
    today: NaiveDate,
) -> Result<Reply, AssistantError> {
    match outcome {
        FlowOutcome::RecordFit(reading) => {
            storage
                .add_fit_entry(&FitEntry::from_reading(user_id, today, reading))
                .await?;
            info!(user_id, metric = ?reading.metric(), "Fit tracker value recorded");
            let key = match reading.metric() {
                FitMetric::Steps => "saved-steps",
                FitMetric::Calories => "saved-calories",
                FitMetric::Weight => "saved-weight",
            };
            Ok(Reply::text(t_lang(key, language)))
        }
        FlowOutcome::SavePlan { date, text, time } => {
            let plan = PlanEntry {
                user_id,
                date,
                text,
                time,
            };
            storage.add_plan(&plan).await?;
            info!(user_id, date = %date, "Plan saved");
            Ok(Reply::text(t_args_lang(
                "saved-plan",
                &[("date", &date.format("%d.%m.%Y").to_string())],
                language,
            ))
            .with_markup(Markup::MainMenu))
        }
        FlowOutcome::SaveWishlist {
            link,
            title,
            category,
        } => {
            let entry = WishlistEntry {
                user_id,
                link,
                title,
                category,
            };
            storage.add_wishlist_entry(&entry).await?;
            info!(user_id, category = %entry.category, "Wishlist entry saved");
            Ok(Reply::text(t_args_lang(
                "saved-wishlist",
                &[
                    ("title", &html::escape(&entry.title)),
                    ("category", &html::escape(&entry.category)),
                ],
                language,
            )))
        }
        FlowOutcome::ShowCategory(category) => {
            let entries = storage.wishlist_in_category(user_id, &category).await?;
            let shown = html::escape(&category);
            let text = if entries.is_empty() {
                t_args_lang("category-empty", &[("category", &shown)], language)
            } else {
                format!(
                    "{}\n{}",
                    t_args_lang("category-items", &[("category", &shown)], language),
                    format_wishlist(&entries, false)
                )
            };
            Ok(Reply::text(text).with_markup(Markup::MainMenu))
        }
    }
}
