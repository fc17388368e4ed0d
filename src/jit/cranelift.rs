//! Cranelift backend for the generated scalar programs.

use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use cranelift::codegen::ir::FuncRef;
use cranelift::codegen::isa::OwnedTargetIsa;
use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId, Linkage, Module};
use log::{debug, info};

use super::codegen::ENTRY;
use super::program::{self, Assign, AssignOp, BinOp, Expr, Program};
use super::{Kernel, NativeCompiler};
use crate::conf::JitConf;
use crate::error::{SymError, SymResult};
use crate::expr::VarKind;
use crate::HashMap;

// ============================================================================
// Host functions
// ============================================================================

extern "C" fn host_sin(x: f64) -> f64 {
    x.sin()
}

extern "C" fn host_cos(x: f64) -> f64 {
    x.cos()
}

extern "C" fn host_sinh(x: f64) -> f64 {
    x.sinh()
}

extern "C" fn host_cosh(x: f64) -> f64 {
    x.cosh()
}

extern "C" fn host_log(x: f64) -> f64 {
    x.ln()
}

extern "C" fn host_abs(x: f64) -> f64 {
    x.abs()
}

extern "C" fn host_pow(x: f64, y: f64) -> f64 {
    x.powf(y)
}

/// Symbols the generated code may import, with their number of arguments.
fn host_symbols() -> [(&'static str, *const u8, usize); 7] {
    [
        ("sin", host_sin as *const u8, 1),
        ("cos", host_cos as *const u8, 1),
        ("sinh", host_sinh as *const u8, 1),
        ("cosh", host_cosh as *const u8, 1),
        ("log", host_log as *const u8, 1),
        ("abs", host_abs as *const u8, 1),
        ("pow", host_pow as *const u8, 2),
    ]
}

// ============================================================================
// Module lifetime
// ============================================================================

/// Owns a JIT module and releases its code memory when dropped, also when
/// compilation bails out halfway.
struct ModuleGuard(ManuallyDrop<JITModule>);

impl ModuleGuard {
    fn new(module: JITModule) -> Self {
        ModuleGuard(ManuallyDrop::new(module))
    }
}

impl Deref for ModuleGuard {
    type Target = JITModule;

    fn deref(&self) -> &JITModule {
        &self.0
    }
}

impl DerefMut for ModuleGuard {
    fn deref_mut(&mut self) -> &mut JITModule {
        &mut self.0
    }
}

impl Drop for ModuleGuard {
    fn drop(&mut self) {
        debug!("Freeing JIT module");
        // SAFETY: the module is taken exactly once, and every function
        // pointer into it lives in the kernel that owns this guard.
        unsafe { ManuallyDrop::take(&mut self.0).free_memory() };
    }
}

type Entry = unsafe extern "C" fn(*const bool, *const i64, *const f64) -> f64;

/// Parameter kinds matching the signature of [`Entry`].
const ENTRY_LAYOUT: [VarKind; 3] = [VarKind::Bool, VarKind::Int, VarKind::Real];

struct CraneliftKernel {
    entry: Entry,
    _module: ModuleGuard,
}

impl Kernel for CraneliftKernel {
    unsafe fn invoke(&self, bools: &[bool], ints: &[i64], reals: &[f64]) -> f64 {
        (self.entry)(bools.as_ptr(), ints.as_ptr(), reals.as_ptr())
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles scalar programs to native code with Cranelift.
#[derive(Clone, Debug, Default)]
pub struct CraneliftCompiler {
    conf: JitConf,
}

fn compile_failure(e: impl std::fmt::Display) -> SymError {
    SymError::CompileFailure(e.to_string())
}

impl CraneliftCompiler {
    #[must_use]
    pub fn new(conf: JitConf) -> Self {
        CraneliftCompiler { conf }
    }

    #[must_use]
    pub fn conf(&self) -> &JitConf {
        &self.conf
    }

    fn isa(&self) -> SymResult<OwnedTargetIsa> {
        let mut flags = settings::builder();
        let opt_level = self.conf.opt_level.to_string();
        let verifier = if self.conf.verify { "true" } else { "false" };
        for (name, value) in [
            ("opt_level", opt_level.as_str()),
            ("enable_verifier", verifier),
            ("use_colocated_libcalls", "false"),
            ("is_pic", "false"),
        ] {
            flags
                .set(name, value)
                .map_err(|e| SymError::CompileFailure(format!("{name}={value}: {e}")))?;
        }
        let isa_builder = cranelift_native::builder().map_err(compile_failure)?;
        isa_builder
            .finish(settings::Flags::new(flags))
            .map_err(compile_failure)
    }

    fn jit_builder(&self, program: &Program) -> SymResult<JITBuilder> {
        let mut builder = JITBuilder::with_isa(self.isa()?, default_libcall_names());
        let hosts = host_symbols();
        for (name, arity) in &program.externs {
            let (_, ptr, host_arity) = hosts
                .iter()
                .find(|(host, ..)| host == name)
                .ok_or_else(|| SymError::SymbolNotFound(name.clone()))?;
            if host_arity != arity {
                return Err(SymError::CompileFailure(format!(
                    "{name} is declared with {arity} arguments but takes {host_arity}"
                )));
            }
            builder.symbol(name.as_str(), *ptr);
        }
        Ok(builder)
    }
}

impl NativeCompiler for CraneliftCompiler {
    fn compile(&self, source: &str) -> SymResult<Box<dyn Kernel>> {
        let program = program::parse(source).map_err(compile_failure)?;
        if program.name != ENTRY {
            return Err(SymError::SymbolNotFound(ENTRY.to_owned()));
        }
        let layout = program.params.iter().map(|(_, kind)| *kind);
        if !layout.eq(ENTRY_LAYOUT) {
            return Err(SymError::CompileFailure(format!(
                "{ENTRY} must take bool, int and real arrays in this order, found {:?}",
                program.params
            )));
        }
        debug!(
            "Lowering {} with {} statements at opt level {}",
            program.name,
            program.body.len(),
            self.conf.opt_level
        );

        let mut module = ModuleGuard::new(JITModule::new(self.jit_builder(&program)?));
        let id = define(&mut module, &program)?;
        module
            .finalize_definitions()
            .map_err(|e| SymError::RelocationFailure(e.to_string()))?;
        let ptr = module.get_finalized_function(id);
        if ptr.is_null() {
            return Err(SymError::SymbolNotFound(ENTRY.to_owned()));
        }
        // SAFETY: `ptr` is the finalized code of a function declared with the
        // signature of `Entry`, and it stays mapped as long as `module` lives.
        let entry = unsafe { std::mem::transmute::<*const u8, Entry>(ptr) };
        info!("Compiled {ENTRY} to native code");
        Ok(Box::new(CraneliftKernel {
            entry,
            _module: module,
        }))
    }
}

// ============================================================================
// Lowering
// ============================================================================

fn define(module: &mut JITModule, program: &Program) -> SymResult<FuncId> {
    let pointer = module.target_config().pointer_type();
    let mut sig = module.make_signature();
    for _ in &program.params {
        sig.params.push(AbiParam::new(pointer));
    }
    sig.returns.push(AbiParam::new(types::F64));
    let id = module
        .declare_function(&program.name, Linkage::Export, &sig)
        .map_err(compile_failure)?;

    let mut imports = Vec::with_capacity(program.externs.len());
    for (name, arity) in &program.externs {
        let mut import = module.make_signature();
        for _ in 0..*arity {
            import.params.push(AbiParam::new(types::F64));
        }
        import.returns.push(AbiParam::new(types::F64));
        let import_id = module
            .declare_function(name, Linkage::Import, &import)
            .map_err(compile_failure)?;
        imports.push((name.as_str(), import_id));
    }

    let mut ctx = module.make_context();
    ctx.func.signature = sig;
    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut builder_ctx);
        let functions = imports
            .into_iter()
            .map(|(name, import_id)| (name, module.declare_func_in_func(import_id, builder.func)))
            .collect();

        let block = builder.create_block();
        builder.append_block_params_for_function_params(block);
        builder.switch_to_block(block);
        builder.seal_block(block);
        let params = builder.block_params(block).to_vec();
        let inputs = program
            .params
            .iter()
            .zip(params)
            .map(|((_, kind), value)| (*kind, value))
            .collect();

        let mut lowering = Lowering {
            builder,
            functions,
            inputs,
            scratch: &program.scratch,
            cells: HashMap::new(),
        };
        for assign in &program.body {
            lowering.assign(assign)?;
        }
        let value = lowering.expr(&program.ret)?;
        lowering.builder.ins().return_(&[value]);
        lowering.builder.finalize();
    }

    module
        .define_function(id, &mut ctx)
        .map_err(compile_failure)?;
    module.clear_context(&mut ctx);
    Ok(id)
}

/// Turns the straight-line program into SSA values. Scratch cells are not
/// memory, each one just names the value last assigned to it.
struct Lowering<'a, 'b> {
    builder: FunctionBuilder<'b>,
    functions: HashMap<&'a str, FuncRef>,
    inputs: HashMap<VarKind, Value>,
    scratch: &'a [(String, usize)],
    cells: HashMap<(&'a str, usize), Value>,
}

impl<'a> Lowering<'a, '_> {
    fn cell(&self, array: &'a str, index: usize) -> SymResult<Value> {
        self.cells
            .get(&(array, index))
            .copied()
            .ok_or_else(|| SymError::CompileFailure(format!("{array}[{index}] is read before it is set")))
    }

    fn assign(&mut self, assign: &'a Assign) -> SymResult<()> {
        let len = self
            .scratch
            .iter()
            .find(|(name, _)| *name == assign.array)
            .map_or(0, |(_, len)| *len);
        if assign.index >= len {
            return Err(SymError::CompileFailure(format!(
                "{}[{}] is out of bounds",
                assign.array, assign.index
            )));
        }
        let value = self.expr(&assign.value)?;
        let value = match assign.op {
            AssignOp::Set => value,
            AssignOp::Add => {
                let current = self.cell(&assign.array, assign.index)?;
                self.builder.ins().fadd(current, value)
            }
            AssignOp::Mul => {
                let current = self.cell(&assign.array, assign.index)?;
                self.builder.ins().fmul(current, value)
            }
        };
        self.cells.insert((assign.array.as_str(), assign.index), value);
        Ok(())
    }

    fn input(&mut self, kind: VarKind, index: usize) -> SymResult<Value> {
        let base = *self
            .inputs
            .get(&kind)
            .ok_or_else(|| SymError::CompileFailure(format!("no {kind} input parameter")))?;
        let width = if kind == VarKind::Bool { 1 } else { 8 };
        let offset = index
            .checked_mul(width)
            .and_then(|o| i32::try_from(o).ok())
            .ok_or_else(|| SymError::CompileFailure(format!("{kind} slot {index} is too large")))?;
        let ins = self.builder.ins();
        Ok(match kind {
            VarKind::Bool => {
                let byte = ins.load(types::I8, MemFlags::trusted(), base, offset);
                let word = self.builder.ins().uextend(types::I32, byte);
                self.builder.ins().fcvt_from_uint(types::F64, word)
            }
            VarKind::Int => {
                let int = ins.load(types::I64, MemFlags::trusted(), base, offset);
                self.builder.ins().fcvt_from_sint(types::F64, int)
            }
            VarKind::Real => ins.load(types::F64, MemFlags::trusted(), base, offset),
        })
    }

    fn expr(&mut self, expr: &'a Expr) -> SymResult<Value> {
        Ok(match expr {
            Expr::Literal(v) => self.builder.ins().f64const(*v),
            Expr::Input(kind, index) => self.input(*kind, *index)?,
            Expr::Cell(array, index) => self.cell(array, *index)?,
            Expr::Neg(inner) => {
                let inner = self.expr(inner)?;
                self.builder.ins().fneg(inner)
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                let ins = self.builder.ins();
                match op {
                    BinOp::Add => ins.fadd(lhs, rhs),
                    BinOp::Sub => ins.fsub(lhs, rhs),
                    BinOp::Mul => ins.fmul(lhs, rhs),
                    BinOp::Div => ins.fdiv(lhs, rhs),
                }
            }
            Expr::Call(name, args) => {
                let func = *self
                    .functions
                    .get(name.as_str())
                    .ok_or_else(|| SymError::SymbolNotFound(name.clone()))?;
                let args = args
                    .iter()
                    .map(|a| self.expr(a))
                    .collect::<SymResult<Vec<_>>>()?;
                let call = self.builder.ins().call(func, &args);
                self.builder
                    .inst_results(call)
                    .first()
                    .copied()
                    .ok_or_else(|| SymError::CompileFailure(format!("{name} returns nothing")))?
            }
        })
    }
}
