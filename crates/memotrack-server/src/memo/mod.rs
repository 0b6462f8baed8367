//! Memo domain: model, storage backends, and HTTP handlers.

pub mod handlers;
pub mod model;
pub mod store;

pub use model::{Memo, MemoStats, MemoStatus, NewMemo};
pub use store::{ActiveMemoSource, InMemoryMemoStore, MemoStore, PgMemoStore, PoolStats};
