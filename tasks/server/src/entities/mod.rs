//! `SeaORM` entities for the task store.

pub mod prelude;

pub mod todo;
