//! Cross-crate behaviour tests for the `Store`; see `tests/`.
