//! Requests used by the database tests.

use crate::context::Context;
use crate::resolvable::Resolvable;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracelens_core::{CaptureId, Error, Result};
use tracelens_log::{Atom, AtomLog, Call, Capture, INVOKE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) enum TestRequest {
    Constant(u64),
    Slow { key: u64, delay_ms: u64 },
    Fail(u64),
    DependsOn(u64),
    SelfRef,
    Ping(u64),
    Pong(u64),
    Sum(Vec<u64>),
    Outer { key: u64, delay_ms: u64 },
    CaptureLen(CaptureId),
    Panic,
    Labeled(u64),
    Twice(u64),
}

/// Number of times a `Labeled` request has been formatted for display
pub(crate) static LABELS: AtomicUsize = AtomicUsize::new(0);

impl fmt::Display for TestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Self::Labeled(_) = self {
            LABELS.fetch_add(1, Ordering::Relaxed);
        }
        write!(f, "{:?}", self)
    }
}

#[derive(Default)]
pub(crate) struct TestEnv {
    calls: Mutex<HashMap<String, usize>>,
}

impl TestEnv {
    fn record(&self, request: &TestRequest) {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(format!("{:?}", request))
            .or_default() += 1;
    }

    pub(crate) fn calls(&self, request: &TestRequest) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&format!("{:?}", request))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Resolvable for TestRequest {
    type Value = u64;
    type Env = TestEnv;

    async fn resolve(&self, ctx: &Context<Self>) -> Result<u64> {
        ctx.env().record(self);
        match self {
            Self::Constant(value) => Ok(*value),
            Self::Slow { key, delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(*key)
            }
            Self::Fail(key) => Err(Error::not_found(format!("key {}", key))),
            Self::DependsOn(key) => ctx.build(Self::Fail(*key)).await,
            Self::SelfRef => ctx.build(Self::SelfRef).await,
            Self::Ping(n) => Ok(ctx.build(Self::Pong(*n)).await? + 1),
            Self::Pong(n) => Ok(ctx.build(Self::Ping(*n)).await? + 1),
            Self::Sum(keys) => {
                let mut total = 0;
                for key in keys {
                    total += ctx.build(Self::Constant(*key)).await?;
                }
                Ok(total)
            }
            Self::Outer { key, delay_ms } => {
                let inner = Self::Slow {
                    key: *key,
                    delay_ms: *delay_ms,
                };
                Ok(ctx.build(inner).await? + 1)
            }
            Self::CaptureLen(id) => Ok(ctx.database().capture(id)?.log().len()),
            Self::Panic => panic!("resolver panicked"),
            Self::Labeled(key) => Ok(*key),
            Self::Twice(key) => {
                let first = ctx.build(Self::Labeled(*key)).await?;
                Ok(first + ctx.build(Self::Labeled(*key)).await?)
            }
        }
    }
}

pub(crate) fn capture(name: &str) -> Capture {
    let log = AtomLog::new(vec![Atom::Call(Call::new("glClear")), INVOKE.clone()]);
    Capture::new(name, log).unwrap()
}
