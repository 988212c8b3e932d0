use super::context::SessionContext;

/// Predicates the host application supplies. The machine treats them as
/// opaque booleans evaluated against the current context.
pub trait Guards {
    fn is_authenticated(&self, context: &SessionContext) -> bool;

    fn is_not_authenticated(&self, context: &SessionContext) -> bool {
        !self.is_authenticated(context)
    }

    fn is_supported_network(&self, _context: &SessionContext) -> bool {
        true
    }
}

/// Reads authentication from the context flag; every network is supported.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextGuards;

impl Guards for ContextGuards {
    fn is_authenticated(&self, context: &SessionContext) -> bool {
        context.is_authenticated
    }
}
