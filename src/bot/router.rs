//! Menu router: maps commands and free text to replies.
//!
//! Recognized commands always take priority over an in-progress flow: the
//! flow is aborted and its partial record dropped before the command runs.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::dialogue::{ConversationDialogue, ConversationState};
use crate::errors::AssistantError;
use crate::localization::{detect_language, t_lang};
use crate::models::FitMetric;
use crate::stats::{aggregate, AveragePolicy, StatsPeriod};
use crate::storage::Storage;

use super::commands::MenuCommand;
use super::dialogue_manager::{handle_flow_input, start_flow};
use super::ui_builder::{format_plans, format_stats, format_wishlist, Markup, Reply};

/// Routes incoming events for every chat
#[derive(Clone)]
pub struct Router {
    storage: Arc<dyn Storage>,
    average_policy: AveragePolicy,
    default_language: &'static str,
}

impl Router {
    pub fn new(
        storage: Arc<dyn Storage>,
        average_policy: AveragePolicy,
        default_language: &'static str,
    ) -> Self {
        Self {
            storage,
            average_policy,
            default_language,
        }
    }

    /// Reply language for a Telegram `language_code`
    pub fn language_for(&self, language_code: Option<&str>) -> &'static str {
        detect_language(language_code, self.default_language)
    }

    /// Handle a text message
    pub async fn handle_text(
        &self,
        dialogue: &ConversationDialogue,
        user_id: i64,
        text: &str,
        language: &str,
        today: NaiveDate,
    ) -> Reply {
        let result = match MenuCommand::from_text(text) {
            Some(command) => self.run_command(dialogue, user_id, command, language, today).await,
            None => self.handle_free_text(dialogue, user_id, text, language, today).await,
        };
        self.recover(dialogue, user_id, result, language).await
    }

    /// Handle an inline button press
    pub async fn handle_callback(
        &self,
        dialogue: &ConversationDialogue,
        user_id: i64,
        data: &str,
        language: &str,
        today: NaiveDate,
    ) -> Reply {
        let result = match MenuCommand::from_callback_data(data) {
            Some(command) => self.run_command(dialogue, user_id, command, language, today).await,
            None => {
                warn!(user_id, data, "Unknown callback data");
                Ok(Reply::text(t_lang("not-understood", language)))
            }
        };
        self.recover(dialogue, user_id, result, language).await
    }

    async fn handle_free_text(
        &self,
        dialogue: &ConversationDialogue,
        user_id: i64,
        text: &str,
        language: &str,
        today: NaiveDate,
    ) -> Result<Reply, AssistantError> {
        match dialogue.get().await? {
            Some(state) if state.is_in_flow() => {
                handle_flow_input(self.storage.as_ref(), dialogue, state, user_id, text, language, today)
                    .await
            }
            _ => {
                debug!(user_id, "Unrecognized text outside of a flow");
                Ok(Reply::text(t_lang("not-understood", language)).with_markup(Markup::MainMenu))
            }
        }
    }

    /// Abort any flow in progress, then run `command`
    async fn run_command(
        &self,
        dialogue: &ConversationDialogue,
        user_id: i64,
        command: MenuCommand,
        language: &str,
        today: NaiveDate,
    ) -> Result<Reply, AssistantError> {
        if let Some(state) = dialogue.get().await? {
            if state.is_in_flow() {
                info!(user_id, aborted = ?state, command = ?command, "Navigation aborted flow");
                dialogue.exit().await?;
            }
        }

        self.dispatch(dialogue, user_id, command, language, today).await
    }

    async fn dispatch(
        &self,
        dialogue: &ConversationDialogue,
        user_id: i64,
        command: MenuCommand,
        language: &str,
        today: NaiveDate,
    ) -> Result<Reply, AssistantError> {
        debug!(user_id, command = ?command, "Dispatching command");

        match command {
            MenuCommand::Start => {
                Ok(Reply::text(t_lang("welcome", language)).with_markup(Markup::MainMenu))
            }
            MenuCommand::Help => Ok(Reply::text(t_lang("help", language)).with_markup(Markup::MainMenu)),
            MenuCommand::Cancel | MenuCommand::Back => {
                Ok(Reply::text(t_lang("main-menu", language)).with_markup(Markup::MainMenu))
            }
            MenuCommand::FitMenu => {
                Ok(Reply::text(t_lang("fit-menu-title", language)).with_markup(Markup::FitMenu))
            }
            MenuCommand::PlansMenu => {
                Ok(Reply::text(t_lang("plans-menu-title", language)).with_markup(Markup::PlansMenu))
            }
            MenuCommand::WishlistMenu => Ok(
                Reply::text(t_lang("wishlist-menu-title", language)).with_markup(Markup::WishlistMenu),
            ),
            MenuCommand::RecordSteps => self.start_fit_flow(dialogue, FitMetric::Steps, language).await,
            MenuCommand::RecordCalories => {
                self.start_fit_flow(dialogue, FitMetric::Calories, language).await
            }
            MenuCommand::RecordWeight => self.start_fit_flow(dialogue, FitMetric::Weight, language).await,
            MenuCommand::WeeklyStats => self.fit_stats(user_id, StatsPeriod::Week, language, today).await,
            MenuCommand::MonthlyStats => self.fit_stats(user_id, StatsPeriod::Month, language, today).await,
            MenuCommand::AddPlan => start_flow(dialogue, ConversationState::AwaitingPlanDate, language).await,
            MenuCommand::WeekPlans => self.plans(user_id, StatsPeriod::Week, language, today).await,
            MenuCommand::MonthPlans => self.plans(user_id, StatsPeriod::Month, language, today).await,
            MenuCommand::AddWishlist => start_flow(dialogue, ConversationState::AwaitingLink, language).await,
            MenuCommand::WishlistList => self.wishlist(user_id, language).await,
            MenuCommand::WishlistCategories => self.wishlist_categories(dialogue, user_id, language).await,
        }
    }

    async fn start_fit_flow(
        &self,
        dialogue: &ConversationDialogue,
        metric: FitMetric,
        language: &str,
    ) -> Result<Reply, AssistantError> {
        start_flow(dialogue, ConversationState::AwaitingFitValue { metric }, language).await
    }

    /// Weekly or monthly fit report; an empty period reads as "no data"
    pub async fn fit_stats(
        &self,
        user_id: i64,
        period: StatsPeriod,
        language: &str,
        today: NaiveDate,
    ) -> Result<Reply, AssistantError> {
        let (start, end) = period.range(today);
        let entries = self.storage.fit_entries_between(user_id, start, end).await?;

        match aggregate(&entries, self.average_policy) {
            Ok(stats) => Ok(Reply::text(format_stats(period, &stats, language))),
            Err(AssistantError::NotFound(reason)) => {
                debug!(user_id, reason = %reason, "No fit data for period");
                Ok(Reply::text(t_lang("stats-no-data", language)))
            }
            Err(e) => Err(e),
        }
    }

    async fn plans(
        &self,
        user_id: i64,
        period: StatsPeriod,
        language: &str,
        today: NaiveDate,
    ) -> Result<Reply, AssistantError> {
        let (start, end) = period.range(today);
        let plans = self.storage.plans_between(user_id, start, end).await?;

        if plans.is_empty() {
            return Ok(Reply::text(t_lang("plans-empty", language)));
        }

        let title = match period {
            StatsPeriod::Week => t_lang("plans-week-title", language),
            StatsPeriod::Month => t_lang("plans-month-title", language),
        };
        Ok(Reply::text(format!("{}\n\n{}", title, format_plans(&plans))))
    }

    async fn wishlist(&self, user_id: i64, language: &str) -> Result<Reply, AssistantError> {
        let entries = self.storage.wishlist(user_id).await?;

        if entries.is_empty() {
            return Ok(Reply::text(t_lang("wishlist-empty", language)));
        }

        Ok(Reply::text(format!(
            "{}\n{}",
            t_lang("wishlist-title", language),
            format_wishlist(&entries, true)
        )))
    }

    async fn wishlist_categories(
        &self,
        dialogue: &ConversationDialogue,
        user_id: i64,
        language: &str,
    ) -> Result<Reply, AssistantError> {
        let categories = self.storage.wishlist_categories(user_id).await?;

        if categories.is_empty() {
            return Ok(Reply::text(t_lang("wishlist-empty", language)));
        }

        let reply = start_flow(dialogue, ConversationState::AwaitingCategoryChoice, language).await?;
        Ok(reply.with_markup(Markup::Choices(categories)))
    }

    /// Turn a failed operation into a user-visible reply
    async fn recover(
        &self,
        dialogue: &ConversationDialogue,
        user_id: i64,
        result: Result<Reply, AssistantError>,
        language: &str,
    ) -> Reply {
        match result {
            Ok(reply) => reply,
            Err(e @ (AssistantError::Validation(_) | AssistantError::NotFound(_))) => {
                Reply::text(t_lang(e.message_key(), language))
            }
            Err(e) => {
                error!(user_id, error = %e, "Operation failed");
                if let Ok(Some(_)) = dialogue.get().await {
                    if let Err(exit_err) = dialogue.exit().await {
                        error!(user_id, error = %exit_err, "Failed to reset dialogue after error");
                    }
                }
                Reply::text(t_lang(e.message_key(), language)).with_markup(Markup::MainMenu)
            }
        }
    }
}
