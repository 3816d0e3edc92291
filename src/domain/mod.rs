//! Domain layer: core entities and business rules.

pub mod business;
pub mod composer_state;
pub mod conversation;
pub mod events;
pub mod message;
pub mod picker;
pub mod session;
pub mod shell_state;
pub mod turn;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
