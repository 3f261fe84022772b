//! Unit tests for dataset file formats.
