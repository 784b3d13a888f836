/// Outcome of a pipeline stage or plugin hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    /// Nothing decided yet, go on with the next hook or stage.
    Continue,
    /// The response is fully decided.
    Finished,
    /// Abort the request with a server error.
    Fault,
    /// Re-enter the same stage later, once an external dependency is ready.
    Suspend,
}

impl HandlerResult {
    #[inline]
    pub fn is_continue(self) -> bool {
        matches!(self, HandlerResult::Continue)
    }

    #[inline]
    pub fn is_suspend(self) -> bool {
        matches!(self, HandlerResult::Suspend)
    }
}
