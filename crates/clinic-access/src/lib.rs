//! Role-based access control and unit scoping for the clinic.
//!
//! Permission checks are pure lookups over an immutable [`PermissionTable`]:
//! admin is always allowed, an explicit deny for a resource always wins, and
//! otherwise any matching `(resource, action, scope)` grant allows. Units scope
//! what a principal may operate on; the [`UnitSwitcher`] is the only way to
//! change a session's active unit.
//!
//! Identity, unit data and the selected-unit hint come from collaborators
//! behind [`IdentityProvider`], [`UnitStore`] and [`SelectedUnitStore`].

mod blocking_io;
pub mod error;
pub mod evaluator;
pub mod grant;
pub mod identity;
pub mod permission_table;
pub mod policy;
pub mod principal;
pub mod selected_unit;
pub mod session;
pub mod unit_store;
pub mod units;

pub use error::{AccessError, ParseRoleError, ParseScopeError, StoreError, StoreResult};
pub use evaluator::{evaluate_permission, has_permission, AccessGate, PermissionDecision};
pub use grant::{Grant, Scope, DENY_ACTION, WILDCARD};
pub use identity::{
    IdentityProvider, InMemoryIdentityProvider, JsonFileIdentityProvider, PRINCIPAL_PATH_ENV,
};
pub use permission_table::{default_permission_table, PermissionTable};
pub use policy::{
    default_permission_policy_path, load_permission_table, render_permission_policy,
    PERMISSION_POLICY_PATH_ENV,
};
pub use principal::{Principal, Role};
pub use selected_unit::{
    default_state_dir, FileSelectedUnitStore, InMemorySelectedUnitStore, SelectedUnitStore,
    STATE_DIR_ENV,
};
pub use session::{ActiveSession, UnitSwitcher};
pub use unit_store::{
    default_units_path, InMemoryUnitStore, JsonFileUnitStore, UnitStore, UNITS_PATH_ENV,
};
pub use units::{Unit, UnitDirectory, UnitSettings, WorkingHours};
