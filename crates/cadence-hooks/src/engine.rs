use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::error::{HookError, Result};
use crate::types::{HookAction, HookContext, HookDefinition, HookResult, HookTiming};

/// Immutable hook registry and dispatcher.
///
/// Hooks are fixed when the engine is built and shared as `Arc<HookEngine>`
/// by every component that emits events. Nothing is patched in afterwards.
pub struct HookEngine {
    /// Sorted by priority ascending.
    hooks: Vec<HookDefinition>,
}

/// Collects hook definitions before the engine is frozen.
#[derive(Default)]
pub struct HookEngineBuilder {
    hooks: Vec<HookDefinition>,
}

impl HookEngineBuilder {
    pub fn register(mut self, hook: HookDefinition) -> Result<Self> {
        if hook.name.trim().is_empty() {
            return Err(HookError::ConfigError("hook name must not be empty".into()));
        }
        if self.hooks.iter().any(|h| h.name == hook.name) {
            return Err(HookError::ConfigError(format!(
                "duplicate hook name: {}",
                hook.name
            )));
        }
        debug!(name = %hook.name, event = ?hook.event, "hook registered");
        self.hooks.push(hook);
        Ok(self)
    }

    pub fn build(mut self) -> Arc<HookEngine> {
        // Stable sort preserves registration order within a priority.
        self.hooks.sort_by_key(|h| h.priority);
        Arc::new(HookEngine { hooks: self.hooks })
    }
}

impl HookEngine {
    pub fn builder() -> HookEngineBuilder {
        HookEngineBuilder::default()
    }

    /// An engine with no hooks; every emit is a no-op.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self { hooks: Vec::new() })
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run Before hooks in priority order, stopping at the first Block.
    ///
    /// Modify replaces `ctx.payload` so later hooks see the new value.
    pub fn emit_before(&self, ctx: &mut HookContext) -> HookAction {
        for hook in self
            .hooks
            .iter()
            .filter(|h| h.event == ctx.event && h.timing == HookTiming::Before)
        {
            let started = Instant::now();
            let result = hook.handler.handle(ctx);
            debug!(
                hook = %hook.name,
                duration_ms = started.elapsed().as_millis() as u64,
                "before hook completed"
            );

            match result.action {
                HookAction::Block { ref reason } => {
                    warn!(hook = %hook.name, reason = %reason, "hook blocked event");
                    return result.action;
                }
                HookAction::Modify { payload } => ctx.payload = payload,
                HookAction::Allow => {}
            }
        }
        HookAction::Allow
    }

    /// Notify After hooks. Inside a Tokio runtime each hook runs on its own
    /// task; otherwise they run inline. Results are logged, never returned.
    pub fn emit_after(&self, ctx: HookContext) {
        let runtime = tokio::runtime::Handle::try_current().ok();

        for hook in self
            .hooks
            .iter()
            .filter(|h| h.event == ctx.event && h.timing == HookTiming::After)
        {
            let handler = Arc::clone(&hook.handler);
            let name = hook.name.clone();
            let ctx = ctx.clone();
            match runtime {
                Some(ref rt) => {
                    rt.spawn(async move { run_after(&name, handler.as_ref(), &ctx) });
                }
                None => run_after(&name, handler.as_ref(), &ctx),
            }
        }
    }

    /// Before hooks, then After hooks unless blocked.
    pub fn emit(&self, mut ctx: HookContext) -> HookResult {
        let started = Instant::now();
        let action = self.emit_before(&mut ctx);
        if !matches!(action, HookAction::Block { .. }) {
            self.emit_after(ctx);
        }
        HookResult {
            action,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn run_after(name: &str, handler: &dyn crate::types::HookHandler, ctx: &HookContext) {
    let started = Instant::now();
    let result = handler.handle(ctx);
    let duration_ms = started.elapsed().as_millis() as u64;
    if let HookAction::Block { reason } = result.action {
        error!(
            hook = %name,
            duration_ms,
            reason,
            "after hook returned Block, ignored"
        );
    } else {
        debug!(hook = %name, duration_ms, "after hook completed");
    }
}
