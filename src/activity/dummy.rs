//! Activity that only reports progress.

use std::time::Duration;

use async_trait::async_trait;

use super::{Activity, ActivityAbort, ActivityContext, ActivityOutputs, FailurePolicy};

/// Sleeps through `cycles` short cycles, reporting progress after each.
#[derive(Debug, Clone)]
pub struct DummyActivity {
    cycles: u32,
    cycle: Duration,
}

impl DummyActivity {
    /// Registry id.
    pub const ID: &'static str = "dummy";

    /// `cycles` cycles of `cycle` each.
    pub const fn new(cycles: u32, cycle: Duration) -> Self {
        Self { cycles, cycle }
    }
}

impl Default for DummyActivity {
    fn default() -> Self {
        Self::new(100, Duration::from_millis(50))
    }
}

#[async_trait]
impl Activity for DummyActivity {
    fn id(&self) -> &str {
        Self::ID
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::SingleOperation
    }

    #[allow(clippy::cast_precision_loss)]
    async fn run(&self, ctx: &mut ActivityContext<'_>) -> Result<ActivityOutputs, ActivityAbort> {
        for i in 0..self.cycles {
            tokio::time::sleep(self.cycle).await;
            ctx.report(1, "Dummy cycle", i as f32 / self.cycles as f32);
        }
        Ok(ActivityOutputs::new())
    }
}
