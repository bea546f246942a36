//! Conversation state for multi-step flows.
//!
//! Each chat has at most one in-flight flow. The partially built record
//! travels inside the state variant itself, so it exists exactly as long as
//! the flow does and is dropped when the dialogue exits.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::errors::AssistantError;
use crate::models::{FitMetric, FitReading, PlanTime};

/// Longest accepted free-text field
pub const MAX_FIELD_LENGTH: usize = 255;
pub const MAX_WEIGHT: f64 = 500.0;

static SHORT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[./](\d{1,2})(?:[./](\d{4}))?$").expect("valid date pattern")
});

/// Represents the conversation state of one chat
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ConversationState {
    #[default]
    Start,
    AwaitingFitValue {
        metric: FitMetric,
    },
    AwaitingPlanDate,
    AwaitingPlanText {
        date: NaiveDate,
    },
    AwaitingPlanTime {
        date: NaiveDate,
        text: String,
    },
    AwaitingLink,
    AwaitingTitle {
        link: String,
    },
    AwaitingCategory {
        link: String,
        title: String,
    },
    AwaitingCategoryChoice,
}

/// Type alias for the per-chat dialogue
pub type ConversationDialogue = Dialogue<ConversationState, InMemStorage<ConversationState>>;

impl ConversationState {
    pub fn is_in_flow(&self) -> bool {
        !matches!(self, ConversationState::Start)
    }

    /// Localization key of the prompt asking for this state's input
    pub fn prompt_key(&self) -> Option<&'static str> {
        match self {
            ConversationState::Start => None,
            ConversationState::AwaitingFitValue { metric } => Some(match metric {
                FitMetric::Steps => "prompt-steps",
                FitMetric::Calories => "prompt-calories",
                FitMetric::Weight => "prompt-weight",
            }),
            ConversationState::AwaitingPlanDate => Some("prompt-plan-date"),
            ConversationState::AwaitingPlanText { .. } => Some("prompt-plan-text"),
            ConversationState::AwaitingPlanTime { .. } => Some("prompt-plan-time"),
            ConversationState::AwaitingLink => Some("prompt-link"),
            ConversationState::AwaitingTitle { .. } => Some("prompt-title"),
            ConversationState::AwaitingCategory { .. } => Some("prompt-category"),
            ConversationState::AwaitingCategoryChoice => Some("prompt-category-choice"),
        }
    }
}

/// What a completed flow asks the caller to do
#[derive(Clone, Debug, PartialEq)]
pub enum FlowOutcome {
    RecordFit(FitReading),
    SavePlan {
        date: NaiveDate,
        text: String,
        time: PlanTime,
    },
    SaveWishlist {
        link: String,
        title: String,
        category: String,
    },
    ShowCategory(String),
}

/// Result of feeding one input to the state machine
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Flow continues; prompt for the new state's input
    Continue(ConversationState),
    /// Flow finished; apply the outcome and return to `Start`
    Complete(FlowOutcome),
    /// No flow is in progress
    Idle,
}

/// Feed `input` to the flow in `state`.
///
/// Validation failures leave the flow where it is: the caller reports the
/// error and keeps `state`.
pub fn advance(
    state: &ConversationState,
    input: &str,
    today: NaiveDate,
) -> Result<Transition, AssistantError> {
    let transition = match state {
        ConversationState::Start => Transition::Idle,
        ConversationState::AwaitingFitValue { metric } => {
            Transition::Complete(FlowOutcome::RecordFit(parse_fit_reading(*metric, input)?))
        }
        ConversationState::AwaitingPlanDate => Transition::Continue(ConversationState::AwaitingPlanText {
            date: parse_plan_date(input, today)?,
        }),
        ConversationState::AwaitingPlanText { date } => {
            Transition::Continue(ConversationState::AwaitingPlanTime {
                date: *date,
                text: validate_text_field(input)?,
            })
        }
        ConversationState::AwaitingPlanTime { date, text } => Transition::Complete(FlowOutcome::SavePlan {
            date: *date,
            text: text.clone(),
            time: parse_plan_time(input)?,
        }),
        ConversationState::AwaitingLink => Transition::Continue(ConversationState::AwaitingTitle {
            link: validate_text_field(input)?,
        }),
        ConversationState::AwaitingTitle { link } => {
            Transition::Continue(ConversationState::AwaitingCategory {
                link: link.clone(),
                title: validate_text_field(input)?,
            })
        }
        ConversationState::AwaitingCategory { link, title } => {
            Transition::Complete(FlowOutcome::SaveWishlist {
                link: link.clone(),
                title: title.clone(),
                category: validate_text_field(input)?,
            })
        }
        ConversationState::AwaitingCategoryChoice => {
            Transition::Complete(FlowOutcome::ShowCategory(validate_text_field(input)?))
        }
    };
    Ok(transition)
}

/// Validates a free-text field (link, title, category, plan text)
pub fn validate_text_field(input: &str) -> Result<String, AssistantError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(AssistantError::Validation("error-empty-input"));
    }

    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(AssistantError::Validation("error-too-long"));
    }

    Ok(trimmed.to_string())
}

/// Parse the value typed for a fit tracker prompt
pub fn parse_fit_reading(metric: FitMetric, input: &str) -> Result<FitReading, AssistantError> {
    match metric {
        FitMetric::Steps => parse_count(input).map(FitReading::Steps),
        FitMetric::Calories => parse_count(input).map(FitReading::Calories),
        FitMetric::Weight => parse_weight(input).map(FitReading::Weight),
    }
}

/// Non-negative whole number; inner spaces ("10 000") are allowed
fn parse_count(input: &str) -> Result<i64, AssistantError> {
    let digits: String = input.split_whitespace().collect();
    digits
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| AssistantError::Validation("error-invalid-number"))
}

/// Positive weight in kilograms, "72.5" or "72,5"
fn parse_weight(input: &str) -> Result<f64, AssistantError> {
    let weight = input
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| AssistantError::Validation("error-invalid-weight"))?;

    if !weight.is_finite() || weight <= 0.0 || weight > MAX_WEIGHT {
        return Err(AssistantError::Validation("error-invalid-weight"));
    }
    Ok(weight)
}

/// Plan date: "сегодня"/"today", "завтра"/"tomorrow", "DD.MM", "DD.MM.YYYY"
/// or "YYYY-MM-DD"
pub fn parse_plan_date(input: &str, today: NaiveDate) -> Result<NaiveDate, AssistantError> {
    let input = input.trim().to_lowercase();
    let invalid = || AssistantError::Validation("error-invalid-date");

    match input.as_str() {
        "сегодня" | "today" => return Ok(today),
        "завтра" | "tomorrow" => return Ok(today + Duration::days(1)),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&input, "%Y-%m-%d") {
        return Ok(date);
    }

    let captures = SHORT_DATE.captures(&input).ok_or_else(invalid)?;
    let day: u32 = captures[1].parse().map_err(|_| invalid())?;
    let month: u32 = captures[2].parse().map_err(|_| invalid())?;
    let year: i32 = match captures.get(3) {
        Some(year) => year.as_str().parse().map_err(|_| invalid())?,
        None => today.year(),
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Plan time: "HH:MM" or "-" for unscheduled
pub fn parse_plan_time(input: &str) -> Result<PlanTime, AssistantError> {
    input
        .parse::<PlanTime>()
        .map_err(|_| AssistantError::Validation("error-invalid-time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn test_wishlist_flow_transitions() {
        let step = advance(&ConversationState::AwaitingLink, " http://x ", today()).unwrap();
        let ConversationState::AwaitingTitle { link } = (match step {
            Transition::Continue(state) => state,
            other => panic!("unexpected transition {other:?}"),
        }) else {
            panic!("expected title step");
        };
        assert_eq!(link, "http://x");

        let step = advance(&ConversationState::AwaitingTitle { link }, "Lamp", today()).unwrap();
        let Transition::Continue(state) = step else {
            panic!("expected category step");
        };
        assert_eq!(
            state,
            ConversationState::AwaitingCategory {
                link: "http://x".to_string(),
                title: "Lamp".to_string()
            }
        );

        let step = advance(&state, "Home", today()).unwrap();
        assert_eq!(
            step,
            Transition::Complete(FlowOutcome::SaveWishlist {
                link: "http://x".to_string(),
                title: "Lamp".to_string(),
                category: "Home".to_string(),
            })
        );
    }

    #[test]
    fn test_start_state_is_idle() {
        assert_eq!(
            advance(&ConversationState::Start, "hello", today()).unwrap(),
            Transition::Idle
        );
        assert!(!ConversationState::Start.is_in_flow());
        assert!(ConversationState::AwaitingLink.is_in_flow());
        assert_eq!(ConversationState::default(), ConversationState::Start);
    }

    #[test]
    fn test_fit_value_validation() {
        let steps = ConversationState::AwaitingFitValue { metric: FitMetric::Steps };
        assert_eq!(
            advance(&steps, "10 000", today()).unwrap(),
            Transition::Complete(FlowOutcome::RecordFit(FitReading::Steps(10_000)))
        );
        assert_eq!(
            advance(&steps, "many", today()),
            Err(AssistantError::Validation("error-invalid-number"))
        );
        assert_eq!(
            advance(&steps, "-5", today()),
            Err(AssistantError::Validation("error-invalid-number"))
        );

        let weight = ConversationState::AwaitingFitValue { metric: FitMetric::Weight };
        assert_eq!(
            advance(&weight, "72,5", today()).unwrap(),
            Transition::Complete(FlowOutcome::RecordFit(FitReading::Weight(72.5)))
        );
        assert!(advance(&weight, "0", today()).is_err());
        assert!(advance(&weight, "NaN", today()).is_err());
        assert!(advance(&weight, "900", today()).is_err());
    }

    #[test]
    fn test_text_field_validation() {
        assert_eq!(
            validate_text_field("   "),
            Err(AssistantError::Validation("error-empty-input"))
        );
        assert_eq!(
            validate_text_field(&"я".repeat(256)),
            Err(AssistantError::Validation("error-too-long"))
        );
        assert_eq!(validate_text_field(&"я".repeat(255)).unwrap().chars().count(), 255);
    }

    #[test]
    fn test_plan_flow() {
        let Transition::Continue(state) =
            advance(&ConversationState::AwaitingPlanDate, "20.10", today()).unwrap()
        else {
            panic!("expected plan text step");
        };
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        assert_eq!(state, ConversationState::AwaitingPlanText { date });

        let Transition::Continue(state) = advance(&state, "Dentist", today()).unwrap() else {
            panic!("expected plan time step");
        };

        assert_eq!(
            advance(&state, "9:15", today()).unwrap(),
            Transition::Complete(FlowOutcome::SavePlan {
                date,
                text: "Dentist".to_string(),
                time: PlanTime::At(NaiveTime::from_hms_opt(9, 15, 0).unwrap()),
            })
        );
        assert_eq!(
            advance(&state, "later", today()),
            Err(AssistantError::Validation("error-invalid-time"))
        );
    }

    #[test]
    fn test_plan_date_formats() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(parse_plan_date("Сегодня", today()).unwrap(), today());
        assert_eq!(parse_plan_date("tomorrow", today()).unwrap(), d(2026, 10, 18));
        assert_eq!(parse_plan_date("01.01.2027", today()).unwrap(), d(2027, 1, 1));
        assert_eq!(parse_plan_date("2026-12-31", today()).unwrap(), d(2026, 12, 31));
        assert_eq!(parse_plan_date("5/11", today()).unwrap(), d(2026, 11, 5));
        assert!(parse_plan_date("31.02", today()).is_err());
        assert!(parse_plan_date("next week", today()).is_err());
    }

    #[test]
    fn test_prompt_keys() {
        assert_eq!(ConversationState::Start.prompt_key(), None);
        assert_eq!(ConversationState::AwaitingLink.prompt_key(), Some("prompt-link"));
        assert_eq!(
            ConversationState::AwaitingFitValue { metric: FitMetric::Calories }.prompt_key(),
            Some("prompt-calories")
        );
    }
}
