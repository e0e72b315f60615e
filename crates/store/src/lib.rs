//! Store gateway for the marketplace backend.
//!
//! The gateway exposes exactly what the underlying engine gives us:
//! single parameterized statements returning an affected-row count, one
//! row, or a row set. There is no multi-statement transaction primitive
//! here; callers that need atomicity across statements must emulate it
//! (see the `placement` crate).
//!
//! All values travel as bound parameters. Interpolating values into SQL
//! text is not supported by this interface on purpose.

pub mod error;
pub mod gateway;
pub mod script;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use gateway::{Row, StoreGateway, Value, placeholders};
pub use script::{RecordedCall, ScriptedGateway};
pub use sqlite::SqliteGateway;
