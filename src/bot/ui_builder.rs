//! UI Builder module for creating keyboards and formatting messages

use chrono::NaiveDate;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};
use teloxide::utils::html;

use crate::localization::{t_args_lang, t_lang};
use crate::models::{PlanEntry, WishlistEntry};
use crate::stats::{FitStats, StatsPeriod};

use super::commands::MenuCommand;

/// Keyboard attached to an outgoing message
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    MainMenu,
    FitMenu,
    PlansMenu,
    WishlistMenu,
    /// One reply button per choice, plus a back button
    Choices(Vec<String>),
}

/// An outgoing HTML message
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub markup: Option<Markup>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }
}

/// Main menu shown as a persistent reply keyboard
pub fn main_menu_keyboard(language: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(t_lang("menu-fit", language)),
        KeyboardButton::new(t_lang("menu-plans", language)),
        KeyboardButton::new(t_lang("menu-wishlist", language)),
    ]])
    .resize_keyboard()
}

fn inline_menu(commands: &[MenuCommand], language: &str) -> InlineKeyboardMarkup {
    let rows = commands
        .iter()
        .filter_map(|command| {
            let key = command.label_key()?;
            Some(vec![InlineKeyboardButton::callback(
                t_lang(key, language),
                command.callback_data(),
            )])
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn fit_menu_keyboard(language: &str) -> InlineKeyboardMarkup {
    inline_menu(
        &[
            MenuCommand::RecordSteps,
            MenuCommand::RecordCalories,
            MenuCommand::RecordWeight,
            MenuCommand::WeeklyStats,
            MenuCommand::MonthlyStats,
            MenuCommand::Back,
        ],
        language,
    )
}

pub fn plans_menu_keyboard(language: &str) -> InlineKeyboardMarkup {
    inline_menu(
        &[
            MenuCommand::AddPlan,
            MenuCommand::WeekPlans,
            MenuCommand::MonthPlans,
            MenuCommand::Back,
        ],
        language,
    )
}

pub fn wishlist_menu_keyboard(language: &str) -> InlineKeyboardMarkup {
    inline_menu(
        &[
            MenuCommand::AddWishlist,
            MenuCommand::WishlistList,
            MenuCommand::WishlistCategories,
            MenuCommand::Back,
        ],
        language,
    )
}

/// Reply keyboard offering `choices`, two per row, and a back button
pub fn choices_keyboard(choices: &[String], language: &str) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = choices
        .chunks(2)
        .map(|row| row.iter().map(|choice| KeyboardButton::new(choice.clone())).collect())
        .collect();
    rows.push(vec![KeyboardButton::new(t_lang("menu-back", language))]);
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Telegram markup for `markup`
pub fn reply_markup(markup: &Markup, language: &str) -> ReplyMarkup {
    match markup {
        Markup::MainMenu => main_menu_keyboard(language).into(),
        Markup::FitMenu => fit_menu_keyboard(language).into(),
        Markup::PlansMenu => plans_menu_keyboard(language).into(),
        Markup::WishlistMenu => wishlist_menu_keyboard(language).into(),
        Markup::Choices(choices) => choices_keyboard(choices, language).into(),
    }
}

/// Escape text for use inside an HTML attribute value
fn escape_attribute(text: &str) -> String {
    html::escape(text).replace('"', "&quot;")
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn format_weight(weight: f64) -> String {
    let formatted = format!("{weight:.1}");
    formatted
        .strip_suffix(".0")
        .map(str::to_string)
        .unwrap_or(formatted)
}

/// Weekly or monthly fit report
pub fn format_stats(period: StatsPeriod, stats: &FitStats, language: &str) -> String {
    let period_name = match period {
        StatsPeriod::Week => t_lang("stats-period-week", language),
        StatsPeriod::Month => t_lang("stats-period-month", language),
    };
    let weight = stats
        .latest_weight
        .map(format_weight)
        .unwrap_or_else(|| t_lang("stats-weight-unspecified", language));

    t_args_lang(
        "stats-report",
        &[
            ("period", &period_name),
            ("weight", &weight),
            ("steps", &stats.average_steps.to_string()),
            ("calories", &stats.average_calories.to_string()),
        ],
        language,
    )
}

/// One plan: "08:30 — text", or just the text when unscheduled
pub fn format_plan_line(plan: &PlanEntry) -> String {
    if plan.time.is_scheduled() {
        format!("{} — {}", plan.time, html::escape(&plan.text))
    } else {
        html::escape(&plan.text)
    }
}

/// Plans grouped under bold date headings; `plans` is ordered by date
pub fn format_plans(plans: &[PlanEntry]) -> String {
    let mut result = String::new();
    let mut current_date = None;

    for plan in plans {
        if current_date != Some(plan.date) {
            if current_date.is_some() {
                result.push('\n');
            }
            result.push_str(&html::bold(&format_date(plan.date)));
            result.push('\n');
            current_date = Some(plan.date);
        }
        result.push_str(&format!("• {}\n", format_plan_line(plan)));
    }

    result
}

/// Daily reminder for one user: a header and one line per plan
pub fn format_reminder(plans: &[PlanEntry], language: &str) -> String {
    let mut lines = vec![html::bold(&t_lang("reminder-header", language))];
    lines.extend(plans.iter().map(format_plan_line));
    lines.join("\n")
}

/// Wishlist as linked titles; the category is shown when `with_category`
pub fn format_wishlist(entries: &[WishlistEntry], with_category: bool) -> String {
    entries
        .iter()
        .map(|entry| {
            let link = format!(
                "<a href=\"{}\">{}</a>",
                escape_attribute(&entry.link),
                html::escape(&entry.title)
            );
            if with_category {
                format!("• {} ({})", link, html::escape(&entry.category))
            } else {
                format!("• {}", link)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
