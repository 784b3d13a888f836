//! Plugin hooks run at fixed points of request resolution.
//!
//! A [`Plugin`] implements any subset of the hook methods; unimplemented hooks
//! answer [`HandlerResult::Continue`]. A [`PluginChain`] calls the plugins of
//! one [`Hook`] in registration order and stops at the first result that is
//! not `Continue`.
//!
//! When a plugin answers `Suspend` the chain remembers its position in the
//! request context, so the next call for the same hook starts with that
//! plugin again and never re-runs the ones before it. A call for any other
//! hook forgets the position and starts from the first plugin.

use std::fmt;

use crate::protocol::{HandlerResult, RequestContext};

/// The extension points, in the order the pipeline visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Raw target is split and normalized; no config conditions applied yet.
    UriRaw,
    /// URI fields are final and the request config is resolved.
    UriClean,
    /// Must leave `physical.doc_root` set.
    DocRoot,
    /// `physical.path` is assembled and may be overridden.
    Physical,
    /// First chance for a handler to claim the request.
    SubrequestStart,
    /// Drives a claimed request to completion.
    Subrequest,
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle_uri_raw(&self, _ctx: &mut RequestContext) -> HandlerResult {
        HandlerResult::Continue
    }

    fn handle_uri_clean(&self, _ctx: &mut RequestContext) -> HandlerResult {
        HandlerResult::Continue
    }

    fn handle_docroot(&self, _ctx: &mut RequestContext) -> HandlerResult {
        HandlerResult::Continue
    }

    fn handle_physical(&self, _ctx: &mut RequestContext) -> HandlerResult {
        HandlerResult::Continue
    }

    fn handle_subrequest_start(&self, _ctx: &mut RequestContext) -> HandlerResult {
        HandlerResult::Continue
    }

    fn handle_subrequest(&self, _ctx: &mut RequestContext) -> HandlerResult {
        HandlerResult::Continue
    }
}

/// Ordered list of registered plugins.
#[derive(Default)]
pub struct PluginChain {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs every plugin for `hook`, resuming at a previously suspended one.
    pub fn call(&self, hook: Hook, ctx: &mut RequestContext) -> HandlerResult {
        let start = match ctx.suspended_hook.take() {
            Some((suspended, index)) if suspended == hook => index,
            _ => 0,
        };
        for (index, plugin) in self.plugins.iter().enumerate().skip(start) {
            let result = match hook {
                Hook::UriRaw => plugin.handle_uri_raw(ctx),
                Hook::UriClean => plugin.handle_uri_clean(ctx),
                Hook::DocRoot => plugin.handle_docroot(ctx),
                Hook::Physical => plugin.handle_physical(ctx),
                Hook::SubrequestStart => plugin.handle_subrequest_start(ctx),
                Hook::Subrequest => plugin.handle_subrequest(ctx),
            };

            match result {
                HandlerResult::Continue => {}
                HandlerResult::Suspend => {
                    ctx.suspended_hook = Some((hook, index));
                    return result;
                }
                HandlerResult::Finished | HandlerResult::Fault => return result,
            }
        }

        HandlerResult::Continue
    }
}

impl fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.plugins.iter().map(|plugin| plugin.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::config::RequestConfig;

    struct Counting {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        answers: Vec<HandlerResult>,
    }

    impl Counting {
        fn new(name: &'static str, answers: Vec<HandlerResult>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Self { name, calls: Arc::clone(&calls), answers }, calls)
        }
    }

    impl Plugin for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle_docroot(&self, _ctx: &mut RequestContext) -> HandlerResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers.get(call).copied().unwrap_or(HandlerResult::Continue)
        }
    }

    fn context() -> RequestContext {
        RequestContext::new("http", RequestConfig::default())
    }

    #[test]
    fn empty_chain_continues() {
        let chain = PluginChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.call(Hook::UriRaw, &mut context()), HandlerResult::Continue);
    }

    #[test]
    fn stops_at_first_decisive_plugin() {
        let (first, first_calls) = Counting::new("first", vec![HandlerResult::Finished]);
        let (second, second_calls) = Counting::new("second", vec![]);
        let mut chain = PluginChain::new();
        chain.register(first).register(second);

        assert_eq!(chain.call(Hook::DocRoot, &mut context()), HandlerResult::Finished);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn other_hooks_use_default_continue() {
        let (first, calls) = Counting::new("first", vec![HandlerResult::Fault]);
        let mut chain = PluginChain::new();
        chain.register(first);

        assert_eq!(chain.call(Hook::Physical, &mut context()), HandlerResult::Continue);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn resumes_at_suspended_plugin() {
        let (first, first_calls) = Counting::new("first", vec![]);
        let (second, second_calls) = Counting::new("second", vec![HandlerResult::Suspend, HandlerResult::Continue]);
        let (third, third_calls) = Counting::new("third", vec![]);
        let mut chain = PluginChain::new();
        chain.register(first).register(second).register(third);
        let mut ctx = context();

        assert_eq!(chain.call(Hook::DocRoot, &mut ctx), HandlerResult::Suspend);
        assert_eq!(ctx.suspended_hook, Some((Hook::DocRoot, 1)));
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);

        assert_eq!(chain.call(Hook::DocRoot, &mut ctx), HandlerResult::Continue);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 2);
        assert_eq!(third_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.suspended_hook, None);
    }

    #[test]
    fn debug_lists_plugin_names() {
        let (first, _) = Counting::new("first", vec![]);
        let mut chain = PluginChain::new();
        chain.register(first);
        assert_eq!(format!("{chain:?}"), r#"["first"]"#);
    }
}
