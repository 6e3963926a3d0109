/// Router Module Index
///
/// Routes are split by the identity they require. Visibility and mutation
/// rights are still decided per resource inside the handlers.

/// Routes open to every caller. The actor may be anonymous.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Staff-only account administration, nested under `/admin`.
pub mod admin;
