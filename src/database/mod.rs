//! Damecon database layer.
//!
//! Provides SQLite connection management and schema migrations for the
//! session cookie jar.
//!
//! # Usage
//!
//! ```no_run
//! use damecon::database::Database;
//!
//! // Open the persistent jar
//! let db = Database::open("cookies.db").expect("failed to open database");
//!
//! // Or use an in-memory jar for a throwaway session
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
