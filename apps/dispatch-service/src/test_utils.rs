//! テスト用ユーティリティ

mod dispatch_test_builder;

pub use dispatch_test_builder::{DispatchTestBuilder, DispatchTestSetup, send_input};
