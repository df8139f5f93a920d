pub mod charts;
pub mod periods;
pub mod setup;
pub mod sources;
pub mod statement;
pub mod summary;
pub mod ui;
