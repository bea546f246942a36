//! Command surface: callback ids of inline buttons and the texts of the
//! reply-keyboard buttons and slash commands that map onto them.

use crate::localization::{t_lang, SUPPORTED_LANGUAGES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Start,
    Help,
    Cancel,
    Back,
    FitMenu,
    RecordSteps,
    RecordCalories,
    RecordWeight,
    WeeklyStats,
    MonthlyStats,
    PlansMenu,
    AddPlan,
    WeekPlans,
    MonthPlans,
    WishlistMenu,
    AddWishlist,
    WishlistList,
    WishlistCategories,
}

impl MenuCommand {
    /// Every command reachable from an inline button
    pub const CALLBACKS: [MenuCommand; 16] = [
        MenuCommand::Start,
        MenuCommand::FitMenu,
        MenuCommand::RecordSteps,
        MenuCommand::RecordCalories,
        MenuCommand::RecordWeight,
        MenuCommand::WeeklyStats,
        MenuCommand::MonthlyStats,
        MenuCommand::PlansMenu,
        MenuCommand::AddPlan,
        MenuCommand::WeekPlans,
        MenuCommand::MonthPlans,
        MenuCommand::WishlistMenu,
        MenuCommand::AddWishlist,
        MenuCommand::WishlistList,
        MenuCommand::WishlistCategories,
        MenuCommand::Back,
    ];

    pub fn callback_data(&self) -> &'static str {
        match self {
            MenuCommand::Start => "start",
            MenuCommand::Help => "help",
            MenuCommand::Cancel => "cancel",
            MenuCommand::Back => "back",
            MenuCommand::FitMenu => "fit_menu",
            MenuCommand::RecordSteps => "record_steps",
            MenuCommand::RecordCalories => "record_calories",
            MenuCommand::RecordWeight => "record_weight",
            MenuCommand::WeeklyStats => "weekly_stats",
            MenuCommand::MonthlyStats => "monthly_stats",
            MenuCommand::PlansMenu => "plans_menu",
            MenuCommand::AddPlan => "add_plan",
            MenuCommand::WeekPlans => "week_plans",
            MenuCommand::MonthPlans => "month_plans",
            MenuCommand::WishlistMenu => "wishlist_menu",
            MenuCommand::AddWishlist => "add_wishlist",
            MenuCommand::WishlistList => "wishlist_list",
            MenuCommand::WishlistCategories => "wishlist_categories",
        }
    }

    /// Resolve an inline button's callback data
    pub fn from_callback_data(data: &str) -> Option<Self> {
        // Ids used by the first release's inline main menu
        match data {
            "fit_tracker" => return Some(MenuCommand::FitMenu),
            "my_plans" => return Some(MenuCommand::PlansMenu),
            "wishlist" => return Some(MenuCommand::WishlistMenu),
            _ => {}
        }
        Self::CALLBACKS
            .into_iter()
            .find(|command| command.callback_data() == data)
    }

    /// Resolve a slash command or the label of a reply-keyboard button in
    /// any supported language
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        let slash = text
            .strip_prefix('/')
            .map(|rest| rest.split(['@', ' ']).next().unwrap_or(rest).to_lowercase());
        if let Some(name) = slash {
            return match name.as_str() {
                "start" => Some(MenuCommand::Start),
                "help" => Some(MenuCommand::Help),
                "cancel" => Some(MenuCommand::Cancel),
                _ => None,
            };
        }

        const LABELLED: [MenuCommand; 4] = [
            MenuCommand::FitMenu,
            MenuCommand::PlansMenu,
            MenuCommand::WishlistMenu,
            MenuCommand::Back,
        ];
        LABELLED.into_iter().find(|command| {
            command.label_key().is_some_and(|key| {
                SUPPORTED_LANGUAGES
                    .iter()
                    .any(|language| t_lang(key, language) == text)
            })
        })
    }

    /// Localization key of the button label, for commands shown as buttons
    pub fn label_key(&self) -> Option<&'static str> {
        Some(match self {
            MenuCommand::Start | MenuCommand::Help | MenuCommand::Cancel => return None,
            MenuCommand::Back => "menu-back",
            MenuCommand::FitMenu => "menu-fit",
            MenuCommand::RecordSteps => "button-record-steps",
            MenuCommand::RecordCalories => "button-record-calories",
            MenuCommand::RecordWeight => "button-record-weight",
            MenuCommand::WeeklyStats => "button-weekly-stats",
            MenuCommand::MonthlyStats => "button-monthly-stats",
            MenuCommand::PlansMenu => "menu-plans",
            MenuCommand::AddPlan => "button-add-plan",
            MenuCommand::WeekPlans => "button-week-plans",
            MenuCommand::MonthPlans => "button-month-plans",
            MenuCommand::WishlistMenu => "menu-wishlist",
            MenuCommand::AddWishlist => "button-add-wishlist",
            MenuCommand::WishlistList => "button-wishlist-list",
            MenuCommand::WishlistCategories => "button-wishlist-categories",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_data_roundtrip() {
        for command in MenuCommand::CALLBACKS {
            assert_eq!(
                MenuCommand::from_callback_data(command.callback_data()),
                Some(command)
            );
        }
        assert_eq!(MenuCommand::from_callback_data("unknown"), None);
    }

    #[test]
    fn test_legacy_callback_ids() {
        assert_eq!(MenuCommand::from_callback_data("fit_tracker"), Some(MenuCommand::FitMenu));
        assert_eq!(MenuCommand::from_callback_data("my_plans"), Some(MenuCommand::PlansMenu));
        assert_eq!(MenuCommand::from_callback_data("wishlist"), Some(MenuCommand::WishlistMenu));
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(MenuCommand::from_text("/start"), Some(MenuCommand::Start));
        assert_eq!(MenuCommand::from_text("/start@withLilyBot"), Some(MenuCommand::Start));
        assert_eq!(MenuCommand::from_text("/help"), Some(MenuCommand::Help));
        assert_eq!(MenuCommand::from_text("/cancel"), Some(MenuCommand::Cancel));
        assert_eq!(MenuCommand::from_text("/unknown"), None);
    }

    #[test]
    fn test_main_menu_labels_in_every_language() {
        assert_eq!(MenuCommand::from_text("Fit трекер"), Some(MenuCommand::FitMenu));
        assert_eq!(MenuCommand::from_text("Мои планы"), Some(MenuCommand::PlansMenu));
        assert_eq!(MenuCommand::from_text("Мои хотелки"), Some(MenuCommand::WishlistMenu));
        assert_eq!(MenuCommand::from_text("My plans"), Some(MenuCommand::PlansMenu));
        assert_eq!(MenuCommand::from_text("http://x"), None);
        assert_eq!(MenuCommand::from_text("Lamp"), None);
    }
}
