//! Strategy tables for the assistant editor UI.
//!
//! The target application is an unstable contract: selectors here are ordered
//! most-specific-first, with generic placeholder/text matches as the graceful
//! degradation path when the page changes.

use crate::workflow::executor::{ActionStrategy, Locator};

/// Dialog heading shown after saving a brand-new assistant.
pub const SHARE_DIALOG_TEXT: &str = "Share GPT";
/// Dialog heading shown after saving an existing assistant.
pub const UPDATE_DIALOG_TEXT: &str = "GPT Updated";

/// Resource cards on the "my assistants" listing page.
pub const RESOURCE_CONTAINER_CSS: &str = "div[tabindex=\"0\"]";
/// Dedicated edit control inside a resource card.
pub const EDIT_BUTTON_CSS: &str = "button[class*=\"text-token-text-primary\"]";

/// Section headings inside the configure pane.
pub const SECTION_CSS: &str = "div.mb-6";
pub const STARTERS_SECTION_TEXT: &str = "conversation starters";
pub const ACTIONS_SECTION_TEXT: &str = "actions";
pub const CREATE_ACTION_TEXT: &str = "create new action";

pub fn login_button() -> Locator {
    Locator::css("button[data-testid=\"login-button\"]")
}

pub fn profile_marker() -> Locator {
    Locator::css("[data-testid=\"profile-button\"]")
}

pub fn starters_section() -> Locator {
    Locator::text(SECTION_CSS, STARTERS_SECTION_TEXT)
}

pub fn actions_section() -> Locator {
    Locator::text(SECTION_CSS, ACTIONS_SECTION_TEXT)
}

pub fn configure_tab() -> ActionStrategy {
    ActionStrategy::new(
        "configure tab",
        vec![
            Locator::css("button[data-testid=\"gizmo-editor-configure-button\"]"),
            Locator::text("button", "Configure"),
            Locator::text("[role=\"tab\"]", "Configure"),
            Locator::text("a", "Configure"),
        ],
    )
}

pub fn name_field() -> ActionStrategy {
    ActionStrategy::new(
        "name",
        vec![
            Locator::css("input[placeholder*=\"Name\"]"),
            Locator::css("input[placeholder*=\"name\"]"),
            Locator::css("textarea[placeholder*=\"Name\"]"),
        ],
    )
}

pub fn description_field() -> ActionStrategy {
    ActionStrategy::new(
        "description",
        vec![
            Locator::css("input[data-testid=\"gizmo-description-input\"]"),
            Locator::css("textarea[placeholder*=\"Description\"]"),
            Locator::css("input[placeholder*=\"Description\"]"),
            Locator::css("textarea[placeholder*=\"description\"]"),
        ],
    )
}

pub fn instructions_field() -> ActionStrategy {
    ActionStrategy::new(
        "instructions",
        vec![
            Locator::css("textarea[data-testid=\"gizmo-instructions-input\"]"),
            Locator::css("textarea[placeholder*=\"Instructions\"]"),
            Locator::css("textarea[placeholder*=\"instructions\"]"),
            Locator::css("div[contenteditable=\"true\"]"),
        ],
    )
}

pub fn schema_editor() -> ActionStrategy {
    ActionStrategy::new(
        "schema editor",
        vec![
            Locator::css("textarea[placeholder*=\"Enter your OpenAPI schema here\"]"),
            Locator::css("textarea[placeholder*=\"schema\"]"),
            Locator::css("textarea[placeholder*=\"OpenAPI\"]"),
            Locator::css("textarea[placeholder*=\"Schema\"]"),
            Locator::css("div[contenteditable=\"true\"]"),
        ],
    )
}

pub fn action_save_button() -> ActionStrategy {
    ActionStrategy::new(
        "integration save",
        vec![
            Locator::text("button", "Create"),
            Locator::text("button", "Save"),
            Locator::text("button", "Update"),
        ],
    )
}

pub fn save_button() -> ActionStrategy {
    ActionStrategy::new(
        "save",
        vec![
            Locator::text("button div", "Create"),
            Locator::text("button div", "Update"),
            Locator::text("button span", "Create"),
            Locator::text("button span", "Update"),
            Locator::text("button", "Create"),
            Locator::text("button", "Update"),
        ],
    )
}

pub fn visibility_only_me() -> ActionStrategy {
    ActionStrategy::new("visibility: only me", vec![Locator::text("button", "Only me")])
}

pub fn dialog_confirm() -> ActionStrategy {
    ActionStrategy::new("dialog confirm", vec![Locator::text("button", "Save")])
}

pub fn view_resource() -> ActionStrategy {
    ActionStrategy::new(
        "view resource",
        vec![
            Locator::text("a", "View GPT"),
            Locator::text("button", "View GPT"),
            Locator::text("div", "View GPT"),
        ],
    )
}
