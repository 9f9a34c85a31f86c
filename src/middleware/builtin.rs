//! Built-in middlewares supplied alongside the framework.

use super::{Middleware, Next};
use crate::error::Result;
use crate::model::{Args, Context};
use std::sync::atomic::{AtomicU64, Ordering};

/// Logs the resolved command path before dispatch and the outcome after.
pub struct LoggingMiddleware {
    dispatched: AtomicU64,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self { dispatched: AtomicU64::new(0) }
    }
}

impl LoggingMiddleware {
    /// A fresh counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total dispatches observed since construction.
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn handle(&self, args: &mut Args, ctx: &Context<'_>, next: Next<'_>) -> Result<()> {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        ctx.logger.debug(&format!("dispatching {}", args.command.join(" ")));
        let result = next.call(args, ctx);
        match &result {
            Ok(()) => ctx.logger.debug("dispatch completed"),
            Err(err) => ctx.logger.debug(&format!("dispatch failed: {err}")),
        }
        result
    }
}

/// Rejects dispatch unless every token in `required_capabilities` is present
/// in `ctx.granted`. Distinct from per-command `permissions` (§4.1): this is
/// a blanket gate applied to every dispatch regardless of command.
pub struct CapabilityGateMiddleware {
    required_capabilities: Vec<String>,
}

impl CapabilityGateMiddleware {
    /// Require every capability in `required_capabilities` on every dispatch.
    pub fn new(required_capabilities: Vec<String>) -> Self {
        Self { required_capabilities }
    }
}

impl Middleware for CapabilityGateMiddleware {
    fn name(&self) -> &str {
        "capability-gate"
    }

    fn handle(&self, args: &mut Args, ctx: &Context<'_>, next: Next<'_>) -> Result<()> {
        for capability in &self.required_capabilities {
            if !ctx.granted.contains(capability) {
                return Err(crate::error::CliError::PermissionDenied { capability: capability.clone() });
            }
        }
        next.call(args, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::DefaultLogger;
    use crate::registry::CommandRegistry;
    use std::collections::HashSet;

    fn run_through(mw: &dyn Middleware, granted: &HashSet<String>) -> Result<()> {
        let registry = CommandRegistry::new();
        let logger = DefaultLogger::new();
        let translate: &dyn Fn(&str, &[(&str, &str)]) -> String = &|k, _| k.to_string();
        let ctx = Context { registry: &registry, granted, logger: &logger, translate, output: None, input: None };
        let mut args = Args { command: vec!["noop".into()], flags: Default::default() };
        let chain: Vec<Box<dyn Middleware>> = Vec::new();
        let next = super::Next { remaining: &chain, tail: &|_, _| Ok(()) };
        mw.handle(&mut args, &ctx, next)
    }

    #[test]
    fn logging_middleware_counts_dispatches_and_forwards_result() {
        let mw = LoggingMiddleware::new();
        let granted = HashSet::new();
        run_through(&mw, &granted).unwrap();
        assert_eq!(mw.dispatched_count(), 1);
    }

    #[test]
    fn capability_gate_blocks_missing_capability() {
        let mw = CapabilityGateMiddleware::new(vec!["admin".to_string()]);
        let granted = HashSet::new();
        let err = run_through(&mw, &granted).unwrap_err();
        assert!(matches!(err, crate::error::CliError::PermissionDenied { .. }));
    }

    #[test]
    fn capability_gate_allows_granted_capability() {
        let mw = CapabilityGateMiddleware::new(vec!["admin".to_string()]);
        let mut granted = HashSet::new();
        granted.insert("admin".to_string());
        assert!(run_through(&mw, &granted).is_ok());
    }
}
