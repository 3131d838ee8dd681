//! Observability for Parley: subscriber setup and trace export.

pub mod tracing_setup;
