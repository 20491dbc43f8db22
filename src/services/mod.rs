//! Resource CRUD services
//!
//! Every operation takes the acting session first and runs the access guard before it
//! touches the repository. Handlers may call the guard earlier as well; the services do
//! not rely on it.

pub mod content;
pub mod users;
