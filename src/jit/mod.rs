//! Native compilation of expressions.
//!
//! [`Expression::c_code`] renders the expression as a small C-like program.
//! A [`NativeCompiler`] turns that text into a [`Kernel`], and [`Compiled`]
//! pairs the kernel with the input sizes it was generated for so calls can be
//! checked before they reach native code.

use std::fmt;

use log::info;

use crate::error::SymResult;
use crate::eval::{Arity, Inputs};
use crate::expr::Expression;

mod codegen;
mod cranelift;
mod program;

pub use codegen::{ENTRY, SCRATCH_LEVELS};
pub use cranelift::CraneliftCompiler;

/// Compiles the source produced by [`Expression::c_code`].
pub trait NativeCompiler {
    /// # Errors
    /// Fails with [`SymError::CompileFailure`](crate::SymError::CompileFailure),
    /// [`SymError::RelocationFailure`](crate::SymError::RelocationFailure) or
    /// [`SymError::SymbolNotFound`](crate::SymError::SymbolNotFound).
    fn compile(&self, source: &str) -> SymResult<Box<dyn Kernel>>;
}

/// A compiled `evaluate` function.
pub trait Kernel {
    /// # Safety
    /// Every slot the program reads must lie inside the given slices.
    unsafe fn invoke(&self, bools: &[bool], ints: &[i64], reals: &[f64]) -> f64;
}

/// An expression compiled to native code.
pub struct Compiled {
    kernel: Box<dyn Kernel>,
    arity: Arity,
}

impl Compiled {
    #[must_use]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// # Errors
    /// Fails with [`SymError::IndexOutOfRange`](crate::SymError::IndexOutOfRange)
    /// if an input array is shorter than the expression needs.
    pub fn call(&self, inputs: &Inputs<'_>) -> SymResult<f64> {
        self.arity.check(inputs)?;
        // SAFETY: the arity check guarantees every slot the program reads.
        Ok(unsafe { self.kernel.invoke(inputs.bools, inputs.ints, inputs.reals) })
    }
}

impl fmt::Debug for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiled")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Expression {
    /// Compiles the expression with the default [`CraneliftCompiler`].
    ///
    /// # Errors
    /// See [`Expression::compile_with`].
    pub fn compile(&self) -> SymResult<Compiled> {
        self.compile_with(&CraneliftCompiler::default())
    }

    /// Compiles the expression with `compiler`. There is no interpreted
    /// fallback, a failing backend is reported as is.
    ///
    /// # Errors
    /// Fails like [`Expression::c_code`] or like the compiler.
    pub fn compile_with(&self, compiler: &impl NativeCompiler) -> SymResult<Compiled> {
        let arity = Arity::of(self)?;
        let source = self.c_code()?;
        let kernel = compiler.compile(&source)?;
        info!("Compiled expression with {} nodes", crate::utils::Tree::size(self));
        Ok(Compiled { kernel, arity })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::SymError;

    struct Recording {
        sources: RefCell<Vec<String>>,
    }

    struct Constant(f64);

    impl Kernel for Constant {
        unsafe fn invoke(&self, _: &[bool], _: &[i64], _: &[f64]) -> f64 {
            self.0
        }
    }

    impl NativeCompiler for Recording {
        fn compile(&self, source: &str) -> SymResult<Box<dyn Kernel>> {
            self.sources.borrow_mut().push(source.to_owned());
            Ok(Box::new(Constant(42.0)))
        }
    }

    struct Failing;

    impl NativeCompiler for Failing {
        fn compile(&self, _: &str) -> SymResult<Box<dyn Kernel>> {
            Err(SymError::CompileFailure("no backend".to_owned()))
        }
    }

    fn indexed(source: &str) -> Expression {
        let mut e: Expression = source.parse().unwrap();
        e.put_indexes();
        e
    }

    #[test]
    fn compiler_receives_generated_code() {
        let e = indexed("(+ x (* 2 y))");
        let compiler = Recording {
            sources: RefCell::new(Vec::new()),
        };
        let compiled = e.compile_with(&compiler).unwrap();
        assert_eq!(compiler.sources.borrow()[0], e.c_code().unwrap());
        assert_eq!(compiled.call(&Inputs::reals(&[1.0, 2.0])).unwrap(), 42.0);
    }

    #[test]
    fn short_inputs_never_reach_the_kernel() {
        let e = indexed("(+ x y)");
        let compiled = e.compile().unwrap();
        assert!(matches!(
            compiled.call(&Inputs::reals(&[1.0])),
            Err(SymError::IndexOutOfRange { slot: 1, len: 1, .. })
        ));
    }

    #[test]
    fn backend_errors_pass_through() {
        let e = indexed("(sin x)");
        assert!(matches!(e.compile_with(&Failing), Err(SymError::CompileFailure(_))));
        let unindexed: Expression = "(sin x)".parse().unwrap();
        assert!(matches!(unindexed.compile(), Err(SymError::UnassignedSlot(_))));
    }

    #[test]
    fn agrees_with_the_interpreters() {
        let e = indexed(
            "(+ (* 3 (pow x 2)) (- (sin y)) (cosh (* x y)) (log (abs y) 10) (ln 2) (< x y))",
        );
        let compiled = e.compile().unwrap();
        let lambdified = e.lambdify().unwrap();
        for (x, y) in [(0.5, -1.25), (2.0, 3.0), (-4.0, 0.125)] {
            let reals = [x, y];
            let inputs = Inputs::reals(&reals);
            let expected = e.evaluate(&inputs).unwrap();
            assert_eq!(compiled.call(&inputs).unwrap().to_bits(), expected.to_bits());
            assert_eq!(lambdified.call(&inputs).unwrap().to_bits(), expected.to_bits());
        }
    }
}
