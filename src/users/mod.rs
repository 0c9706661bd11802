mod memory;
mod model;
mod repo;
mod store;

pub use memory::InMemoryUserStore;
pub use model::{Credentials, NewUser, Provider, Role, User, UserRow};
pub use repo::PgUserStore;
pub use store::{SortField, StoreError, UserListQuery, UserPage, UserSort, UserStore};
