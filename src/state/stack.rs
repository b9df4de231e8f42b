use crate::{
    foundation::error::{TrellisError, TrellisResult},
    state::draw_state::{DrawState, DrawStateOverride},
};

/// Scoped draw states. The bottom entry is the base state and is never popped.
#[derive(Clone, Debug)]
pub struct DrawStateStack {
    stack: Vec<DrawState>,
}

impl DrawStateStack {
    pub fn new(base: DrawState) -> Self {
        Self { stack: vec![base] }
    }

    /// State in effect for the next draw.
    pub fn top(&self) -> &DrawState {
        // The base entry is never removed.
        &self.stack[self.stack.len() - 1]
    }

    /// Number of open scopes above the base state.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn push(&mut self, ovr: &DrawStateOverride) {
        let next = ovr.apply(self.top());
        self.stack.push(next);
    }

    pub fn pop(&mut self) -> TrellisResult<()> {
        if self.stack.len() <= 1 {
            return Err(TrellisError::evaluation(
                "draw-state stack underflow: pop without matching push",
            ));
        }
        self.stack.pop();
        Ok(())
    }

    /// Drop every open scope, leaving only the base state.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }

    /// Run `f` with `ovr` pushed; the scope is closed on every exit path of `f`.
    pub fn scoped<R>(
        &mut self,
        ovr: &DrawStateOverride,
        f: impl FnOnce(&mut Self) -> TrellisResult<R>,
    ) -> TrellisResult<R> {
        Self::scoped_in(self, |s| s, ovr, f)
    }

    /// [`Self::scoped`] for a stack owned by `ctx`, so `f` gets the whole context.
    pub fn scoped_in<C: ?Sized, R>(
        ctx: &mut C,
        stack: impl Fn(&mut C) -> &mut Self,
        ovr: &DrawStateOverride,
        f: impl FnOnce(&mut C) -> TrellisResult<R>,
    ) -> TrellisResult<R> {
        let depth = stack(ctx).depth();
        stack(ctx).push(ovr);
        let out = f(ctx);
        let s = stack(ctx);
        let balanced = s.depth() == depth + 1;
        s.stack.truncate(depth + 1);
        if !balanced {
            return out.and_then(|_| {
                Err(TrellisError::evaluation(
                    "draw-state scope left unbalanced by its body",
                ))
            });
        }
        out
    }
}

impl Default for DrawStateStack {
    fn default() -> Self {
        Self::new(DrawState::default())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/stack.rs"]
mod tests;
