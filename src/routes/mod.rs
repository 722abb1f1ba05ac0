/// Router Module Index
///
/// Routes are split by access level. The authenticated router is wrapped in the auth
/// middleware in `create_router`, so nothing in it runs without a resolved identity.

/// Routes reachable without a token: signup, token exchange, health.
pub mod public;

/// Routes behind the `AuthUser` middleware layer.
pub mod authenticated;
