/// Router Module Index
///
/// Routes are split by the gate in front of them, so access control is applied
/// once per module (via a route layer) rather than inside each handler.

/// Routes open to anonymous clients.
pub mod public;

/// Routes behind `require_account`.
pub mod authenticated;

/// Routes behind `require_admin` and `require_superadmin`.
pub mod admin;
