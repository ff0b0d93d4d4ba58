#![allow(dead_code, unused_imports)]

pub use procsync_test_utils::{builders, fake_bus, fake_service, init_tracing, with_timeout};
