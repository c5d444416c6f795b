//! Service layer for the authorizer.
//!
//! External collaborators behind the protected routes.
//!
//! # Components
//!
//! - `counter_store` - named counter in Redis
//! - `role_manager` - member role grants through the management API

pub mod counter_store;
pub mod role_manager;

pub use counter_store::{CounterStore, CounterStoreError, RedisCounterStore};
pub use role_manager::{Auth0RoleManager, RoleManager, RoleManagerError};
// Mocks exposed for integration tests
#[allow(unused_imports)]
pub use counter_store::mock::MockCounterStore;
#[allow(unused_imports)]
pub use role_manager::mock::MockRoleManager;
