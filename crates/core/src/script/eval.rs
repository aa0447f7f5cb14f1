use super::{CompiledForm, Environment};

/// Runs every assignment of `form` in order, writing each result back into
/// `env` before the next statement is evaluated.
pub fn evaluate(form: &CompiledForm, env: &mut Environment) {
    for assignment in &form.assignments {
        let value = assignment.expr.eval(env);
        env.set(&assignment.target, value);
    }
}
