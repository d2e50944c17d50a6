//! Property-based tests for the tiling pipeline.
