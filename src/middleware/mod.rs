//! The Middleware Chain (§4.3): pre-action interceptors composed in
//! registration order, each able to continue, short-circuit, or abort.

pub mod builtin;

pub use builtin::LoggingMiddleware;

use crate::error::Result;
use crate::model::{Args, Context};

/// A single interceptor in the chain.
///
/// `handle` receives the mutable `Args` and must either call
/// `next.call(args, ctx)` to continue the chain, or return `Ok(())` without
/// calling it to short-circuit the dispatch (the action never runs).
/// Returning `Err` aborts the dispatch and propagates through the remaining
/// middlewares as a failed dispatch.
pub trait Middleware: Send + Sync {
    /// Identifies this middleware in diagnostics.
    fn name(&self) -> &str;

    /// Process the request, optionally delegating to `next`.
    fn handle(&self, args: &mut Args, ctx: &Context<'_>, next: Next<'_>) -> Result<()>;
}

/// The remaining chain, callable exactly once.
pub struct Next<'a> {
    remaining: &'a [Box<dyn Middleware>],
    tail: &'a (dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync),
}

impl<'a> Next<'a> {
    /// Invoke the next middleware, or the terminal action if the chain is
    /// exhausted.
    pub fn call(self, args: &mut Args, ctx: &Context<'_>) -> Result<()> {
        match self.remaining.split_first() {
            Some((head, rest)) => {
                let next = Next { remaining: rest, tail: self.tail };
                head.handle(args, ctx, next)
            }
            None => (self.tail)(args, ctx),
        }
    }
}

/// An ordered sequence of middlewares run once per dispatch.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self { middlewares: Vec::new() }
    }

    /// Append a middleware; runs after every previously-added one.
    pub fn add(&mut self, middleware: Box<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Run the chain, invoking `terminal` once the chain is exhausted (and
    /// every middleware called `next`).
    pub fn run(
        &self,
        args: &mut Args,
        ctx: &Context<'_>,
        terminal: &(dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync),
    ) -> Result<()> {
        let next = Next { remaining: &self.middlewares, tail: terminal };
        next.call(args, ctx)
    }

    /// Names of registered middlewares, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::DefaultLogger;
    use crate::registry::CommandRegistry;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    struct RecordingMiddleware {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        short_circuit: bool,
    }

    impl Middleware for RecordingMiddleware {
        fn name(&self) -> &str {
            self.label
        }

        fn handle(&self, args: &mut Args, ctx: &Context<'_>, next: Next<'_>) -> Result<()> {
            self.log.lock().unwrap().push(self.label);
            if self.short_circuit {
                Ok(())
            } else {
                next.call(args, ctx)
            }
        }
    }

    fn test_context<'a>(
        registry: &'a CommandRegistry,
        granted: &'a HashSet<String>,
        logger: &'a DefaultLogger,
        translate: &'a dyn Fn(&str, &[(&str, &str)]) -> String,
    ) -> Context<'a> {
        Context { registry, granted, logger, translate, output: None, input: None }
    }

    #[test]
    fn middlewares_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.add(Box::new(RecordingMiddleware { label: "first", log: log.clone(), short_circuit: false }));
        chain.add(Box::new(RecordingMiddleware { label: "second", log: log.clone(), short_circuit: false }));

        let registry = CommandRegistry::new();
        let granted = HashSet::new();
        let logger = DefaultLogger::new();
        let translate: &dyn Fn(&str, &[(&str, &str)]) -> String = &|k, _| k.to_string();
        let ctx = test_context(&registry, &granted, &logger, translate);
        let mut args = Args::default();

        let ran_terminal = Arc::new(Mutex::new(false));
        let ran_terminal_clone = ran_terminal.clone();
        let terminal: &(dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync) =
            &move |_, _| {
                *ran_terminal_clone.lock().unwrap() = true;
                Ok(())
            };

        chain.run(&mut args, &ctx, terminal).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert!(*ran_terminal.lock().unwrap());
    }

    #[test]
    fn short_circuit_middleware_skips_remainder_and_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.add(Box::new(RecordingMiddleware { label: "gate", log: log.clone(), short_circuit: true }));
        chain.add(Box::new(RecordingMiddleware { label: "never", log: log.clone(), short_circuit: false }));

        let registry = CommandRegistry::new();
        let granted = HashSet::new();
        let logger = DefaultLogger::new();
        let translate: &dyn Fn(&str, &[(&str, &str)]) -> String = &|k, _| k.to_string();
        let ctx = test_context(&registry, &granted, &logger, translate);
        let mut args = Args::default();

        let ran_terminal = Arc::new(Mutex::new(false));
        let ran_terminal_clone = ran_terminal.clone();
        let terminal: &(dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync) =
            &move |_, _| {
                *ran_terminal_clone.lock().unwrap() = true;
                Ok(())
            };

        chain.run(&mut args, &ctx, terminal).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["gate"]);
        assert!(!*ran_terminal.lock().unwrap());
    }
}
