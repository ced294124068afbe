//! Test Helper Utilities
//!
//! Shared utilities for testing thirdparty-arbiter

#![allow(dead_code)]

pub mod audio_generator;
pub mod db_utils;
pub mod fake_completion;
pub mod fake_encoder;
pub mod stub_server;

pub use audio_generator::{generate_test_wav, wav_bytes};
pub use db_utils::{create_test_db, create_test_orchestrator, file_count, test_config, wait_for_terminal};
pub use fake_completion::{verdict_reply, ScriptedCompletion};
pub use stub_server::{spawn_stub, StubServer};
