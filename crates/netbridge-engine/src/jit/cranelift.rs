//! Cranelift trampoline backend
//!
//! Each trampoline gets its own `JITModule` so it can be freed on its own
//! when the owning call or callback is deleted.

use std::ffi::c_void;
use std::sync::Arc;

use cranelift_codegen::ir::{
    self, types, AbiParam, ArgumentPurpose, InstBuilder, MemFlags, StackSlotData, StackSlotKind,
    Type, Value,
};
use cranelift_codegen::isa::{CallConv, TargetIsa};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};
use netbridge_sdk::MethodDescriptor;
use target_lexicon::{Architecture, OperatingSystem};

use super::abi::{
    lower_signature, Extension, Lane, LoweredSignature, LoweredValue, PlatformAbi, ReturnLowering,
    TargetArch, RETURN_SLOT_SIZE, SLOT_SIZE,
};
use super::compiler::{CallbackHandler, CodeMemory, Trampoline, TrampolineCompiler};
use crate::config::OptLevel;
use crate::error::JitError;

/// Executable memory of one trampoline
pub struct JitMemory(Option<JITModule>);

impl Drop for JitMemory {
    fn drop(&mut self) {
        if let Some(module) = self.0.take() {
            // Safety: the owning trampoline is being dropped, so nothing
            // hands out its address any more.
            unsafe { module.free_memory() };
        }
    }
}

/// Cranelift-based trampoline compiler
pub struct CraneliftCompiler {
    isa: Arc<dyn TargetIsa>,
    abi: PlatformAbi,
}

impl CraneliftCompiler {
    /// Create a compiler targeting the host machine
    pub fn host(opt_level: OptLevel) -> Result<Self, JitError> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("opt_level", opt_level.as_flag())
            .map_err(|e| JitError::Backend(format!("Failed to set opt_level: {}", e)))?;
        flag_builder
            .set("is_pic", "false")
            .map_err(|e| JitError::Backend(format!("Failed to set is_pic: {}", e)))?;

        let flags = settings::Flags::new(flag_builder);

        let isa = cranelift_native::builder()
            .map_err(|e| JitError::Backend(format!("Failed to create native ISA builder: {}", e)))?
            .finish(flags)
            .map_err(|e| JitError::Backend(format!("Failed to finish ISA: {}", e)))?;

        Ok(Self::with_isa(isa))
    }

    /// Create a compiler with a specific ISA
    pub fn with_isa(isa: Arc<dyn TargetIsa>) -> Self {
        let triple = isa.triple();
        let arch = match triple.architecture {
            Architecture::Aarch64(_) => TargetArch::AArch64,
            _ => TargetArch::X86_64,
        };
        let windows = triple.operating_system == OperatingSystem::Windows;
        CraneliftCompiler {
            isa,
            abi: PlatformAbi { arch, windows },
        }
    }

    fn pointer_type(&self) -> Type {
        self.isa.pointer_type()
    }

    fn call_conv(&self) -> CallConv {
        self.isa.default_call_conv()
    }

    fn lane_type(&self, lane: Lane) -> Type {
        match lane {
            Lane::I8 => types::I8,
            Lane::I16 => types::I16,
            Lane::I32 => types::I32,
            Lane::I64 => types::I64,
            Lane::F32 => types::F32,
            Lane::F64 => types::F64,
            Lane::Ptr => self.pointer_type(),
        }
    }

    fn abi_param(&self, value: LoweredValue) -> AbiParam {
        let param = AbiParam::new(self.lane_type(value.lane));
        match value.extension {
            Extension::None => param,
            Extension::Signed => param.sext(),
            Extension::Unsigned => param.uext(),
        }
    }

    /// The real platform signature of a lowered descriptor
    fn platform_signature(&self, lowered: &LoweredSignature) -> ir::Signature {
        let ptr = self.pointer_type();
        let mut sig = ir::Signature::new(self.call_conv());
        match &lowered.ret {
            ReturnLowering::Hidden if self.abi.uses_struct_return_register() => {
                sig.params.push(AbiParam::special(ptr, ArgumentPurpose::StructReturn));
            }
            ReturnLowering::Hidden => {
                sig.params.push(AbiParam::new(ptr));
                sig.returns.push(AbiParam::new(ptr));
            }
            ReturnLowering::Lanes(lanes) => {
                sig.returns.extend(lanes.iter().map(|lane| self.abi_param(*lane)));
            }
            ReturnLowering::Void => {}
        }
        sig.params
            .extend(lowered.params.iter().map(|param| self.abi_param(*param)));
        sig
    }

    /// `extern "C" fn(args: *const u64, count: usize, ret: *mut u8)`
    fn thunk_signature(&self) -> ir::Signature {
        let ptr = self.pointer_type();
        let mut sig = ir::Signature::new(self.call_conv());
        sig.params.push(AbiParam::new(ptr));
        sig.params.push(AbiParam::new(ptr));
        sig.params.push(AbiParam::new(ptr));
        sig
    }

    fn handler_signature(&self) -> ir::Signature {
        let ptr = self.pointer_type();
        let mut sig = ir::Signature::new(self.call_conv());
        sig.params.extend(std::iter::repeat(AbiParam::new(ptr)).take(5));
        sig
    }

    /// Declare, define and finalize one function in a fresh module
    fn finish(
        &self,
        signature: ir::Signature,
        build: impl FnOnce(&mut FunctionBuilder<'_>),
    ) -> Result<Trampoline, JitError> {
        let builder = JITBuilder::with_isa(self.isa.clone(), cranelift_module::default_libcall_names());
        let mut jit_module = JITModule::new(builder);
        let defined = define(&mut jit_module, signature, build);
        let memory = JitMemory(Some(jit_module));
        let address = defined?;
        Ok(Trampoline::new(address, CodeMemory::Jit(memory)))
    }
}

fn define(
    jit_module: &mut JITModule,
    signature: ir::Signature,
    build: impl FnOnce(&mut FunctionBuilder<'_>),
) -> Result<*const c_void, JitError> {
    let func_id = jit_module
        .declare_function("trampoline", Linkage::Local, &signature)
        .map_err(|e| JitError::Module(format!("Declare: {}", e)))?;

    let mut ctx = jit_module.make_context();
    ctx.func.signature = signature;
    ctx.func.name = ir::UserFuncName::user(0, func_id.as_u32());

    let mut func_builder_ctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut func_builder_ctx);
        build(&mut builder);
        builder.finalize();
    }

    jit_module
        .define_function(func_id, &mut ctx)
        .map_err(|e| JitError::Module(format!("Define: {:?}", e)))?;
    jit_module
        .finalize_definitions()
        .map_err(|e| JitError::Module(format!("Finalize: {}", e)))?;
    Ok(jit_module.get_finalized_function(func_id) as *const c_void)
}

fn store_return_lanes(
    builder: &mut FunctionBuilder<'_>,
    lowered: &LoweredSignature,
    values: &[Value],
    ret: Value,
) {
    for ((_, offset), value) in lowered.return_offsets().into_iter().zip(values) {
        builder.ins().store(MemFlags::trusted(), *value, ret, offset);
    }
}

impl TrampolineCompiler for CraneliftCompiler {
    fn name(&self) -> &str {
        "cranelift"
    }

    fn abi(&self) -> PlatformAbi {
        self.abi
    }

    fn compile_call(
        &self,
        method: &MethodDescriptor,
        target: *const c_void,
    ) -> Result<Trampoline, JitError> {
        let lowered = lower_signature(self.abi, method)?;
        let target_sig = self.platform_signature(&lowered);
        let ptr = self.pointer_type();
        let hidden = lowered.has_hidden_return();

        tracing::debug!(method = %method.name, params = lowered.params.len(), hidden, "Compiling call thunk");

        self.finish(self.thunk_signature(), |builder| {
            let entry = builder.create_block();
            builder.append_block_params_for_function_params(entry);
            builder.switch_to_block(entry);
            builder.seal_block(entry);

            let params = builder.block_params(entry).to_vec();
            let (args, ret) = (params[0], params[2]);

            let mut call_args = Vec::with_capacity(lowered.slot_count());
            if hidden {
                call_args.push(ret);
            }
            for (index, param) in lowered.params.iter().enumerate() {
                let offset = (index * SLOT_SIZE) as i32;
                let ty = self.lane_type(param.lane);
                call_args.push(builder.ins().load(ty, MemFlags::trusted(), args, offset));
            }

            let sig_ref = builder.import_signature(target_sig);
            let callee = builder.ins().iconst(ptr, target as usize as i64);
            let call = builder.ins().call_indirect(sig_ref, callee, &call_args);

            if !hidden {
                let results = builder.inst_results(call).to_vec();
                store_return_lanes(builder, &lowered, &results, ret);
            }
            builder.ins().return_(&[]);
        })
    }

    fn compile_callback(
        &self,
        signature: &MethodDescriptor,
        handler: CallbackHandler,
        method: *const MethodDescriptor,
        data: *mut c_void,
    ) -> Result<Trampoline, JitError> {
        let lowered = lower_signature(self.abi, signature)?;
        let platform_sig = self.platform_signature(&lowered);
        let ptr = self.pointer_type();
        let count = lowered.slot_count();
        let hidden = lowered.has_hidden_return();

        tracing::debug!(method = %signature.name, slots = count, hidden, "Compiling callback");

        self.finish(platform_sig, |builder| {
            let entry = builder.create_block();
            builder.append_block_params_for_function_params(entry);
            builder.switch_to_block(entry);
            builder.seal_block(entry);

            let incoming = builder.block_params(entry).to_vec();

            let args_slot = builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                (count.max(1) * SLOT_SIZE) as u32,
                3,
            ));
            let ret_slot = builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                RETURN_SLOT_SIZE as u32,
                3,
            ));
            let args = builder.ins().stack_addr(ptr, args_slot, 0);
            let ret = builder.ins().stack_addr(ptr, ret_slot, 0);

            for (slot, value) in incoming.iter().enumerate() {
                let widened = match lowered_slot(&lowered, slot) {
                    Some(LoweredValue { lane, extension }) if lane.size() < 8 && !lane.is_float() => {
                        match extension {
                            Extension::Signed => builder.ins().sextend(types::I64, *value),
                            _ => builder.ins().uextend(types::I64, *value),
                        }
                    }
                    _ => *value,
                };
                builder
                    .ins()
                    .store(MemFlags::trusted(), widened, args, (slot * SLOT_SIZE) as i32);
            }

            let sig_ref = builder.import_signature(self.handler_signature());
            let callee = builder.ins().iconst(ptr, handler as usize as i64);
            let method_arg = builder.ins().iconst(ptr, method as usize as i64);
            let data_arg = builder.ins().iconst(ptr, data as usize as i64);
            let count_arg = builder.ins().iconst(ptr, count as i64);
            builder
                .ins()
                .call_indirect(sig_ref, callee, &[method_arg, data_arg, args, count_arg, ret]);

            match &lowered.ret {
                ReturnLowering::Void => {
                    builder.ins().return_(&[]);
                }
                ReturnLowering::Hidden if self.abi.uses_struct_return_register() => {
                    builder.ins().return_(&[]);
                }
                ReturnLowering::Hidden => {
                    builder.ins().return_(&[incoming[0]]);
                }
                ReturnLowering::Lanes(_) => {
                    let values: Vec<Value> = lowered
                        .return_offsets()
                        .into_iter()
                        .map(|(lane, offset)| {
                            let ty = self.lane_type(lane.lane);
                            builder.ins().load(ty, MemFlags::trusted(), ret, offset)
                        })
                        .collect();
                    builder.ins().return_(&values);
                }
            }
        })
    }
}

/// The lowered parameter carried by dispatch slot `slot`, `None` for the
/// hidden return pointer
fn lowered_slot(lowered: &LoweredSignature, slot: usize) -> Option<LoweredValue> {
    let first = usize::from(lowered.has_hidden_return());
    slot.checked_sub(first)
        .and_then(|index| lowered.params.get(index).copied())
}
