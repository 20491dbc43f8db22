/// Router Module Index
///
/// Routes are grouped by the access level their handlers enforce. Access checks live in
/// the handlers and services (the guard runs on every call), so the grouping documents the
/// contract rather than adding a layer.

/// Routes accessible to anonymous visitors: landing, login/registration and public APIs.
pub mod public;

/// Routes requiring a logged-in user of any role.
pub mod authenticated;

/// Routes restricted to administrators: user management and content screens.
pub mod admin;
