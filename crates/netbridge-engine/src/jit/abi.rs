//! Platform calling convention lowering
//!
//! Turns a method descriptor into register lanes for the target platform.
//! This is backend independent: the Cranelift compiler maps lanes to IR
//! types, the stub compiler only validates.
//!
//! The platform hidden-return rule is separate from the by-reference flag:
//! a by-reference parameter is always a plain pointer lane, while a hidden
//! return inserts an extra pointer and changes what the callee returns.

use netbridge_sdk::{MethodDescriptor, ParamDescriptor, ValueType};

use crate::error::JitError;

/// Maximum number of dispatch slots (the managed side counts in a byte)
pub const MAX_DISPATCH_SLOTS: usize = 255;

/// Size of one dispatch slot in bytes
pub const SLOT_SIZE: usize = 8;

/// Size of the return slot in bytes (large enough for every inline return)
pub const RETURN_SLOT_SIZE: usize = 16;

/// Target architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArch {
    /// x86-64 (System V or Windows x64)
    X86_64,
    /// AArch64 (AAPCS64)
    AArch64,
}

/// Architecture plus the OS detail that changes the calling convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformAbi {
    /// Instruction set
    pub arch: TargetArch,
    /// Windows x64 convention instead of System V
    pub windows: bool,
}

impl PlatformAbi {
    /// The convention of the running process
    pub fn host() -> Self {
        #[cfg(target_arch = "aarch64")]
        let arch = TargetArch::AArch64;
        #[cfg(not(target_arch = "aarch64"))]
        let arch = TargetArch::X86_64;

        PlatformAbi {
            arch,
            windows: cfg!(target_os = "windows"),
        }
    }

    /// System V x86-64
    pub const fn sysv_x64() -> Self {
        PlatformAbi { arch: TargetArch::X86_64, windows: false }
    }

    /// Windows x64
    pub const fn win_x64() -> Self {
        PlatformAbi { arch: TargetArch::X86_64, windows: true }
    }

    /// AAPCS64
    pub const fn aarch64() -> Self {
        PlatformAbi { arch: TargetArch::AArch64, windows: false }
    }

    /// `true` if a return of `vt` goes through caller-provided memory
    pub fn is_hidden_return(self, vt: ValueType) -> bool {
        match vt {
            _ if vt.is_object() => true,
            ValueType::Matrix4x4 => true,
            ValueType::Vector3 | ValueType::Vector4 => self.arch == TargetArch::X86_64 && self.windows,
            _ => false,
        }
    }

    /// `true` if a call returning `ret` takes a hidden return pointer
    pub fn returns_hidden(self, ret: &ParamDescriptor) -> bool {
        !ret.is_ref && self.is_hidden_return(ret.value_type)
    }

    /// The hidden pointer travels in a dedicated register (x8) instead of
    /// the first argument register, and is not returned
    pub fn uses_struct_return_register(self) -> bool {
        self.arch == TargetArch::AArch64
    }

    /// Register lanes of a struct returned by value
    fn struct_return_lanes(self, vt: ValueType) -> Vec<Lane> {
        match (self.arch, self.windows, vt) {
            (TargetArch::AArch64, _, ValueType::Vector2) => vec![Lane::F32; 2],
            (TargetArch::AArch64, _, ValueType::Vector3) => vec![Lane::F32; 3],
            (TargetArch::AArch64, _, ValueType::Vector4) => vec![Lane::F32; 4],
            (TargetArch::X86_64, true, ValueType::Vector2) => vec![Lane::I64],
            (TargetArch::X86_64, false, ValueType::Vector2) => vec![Lane::F64],
            (TargetArch::X86_64, false, ValueType::Vector3) => vec![Lane::F64, Lane::F32],
            (TargetArch::X86_64, false, ValueType::Vector4) => vec![Lane::F64, Lane::F64],
            _ => Vec::new(),
        }
    }
}

/// One machine value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// 8-bit integer
    I8,
    /// 16-bit integer
    I16,
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Pointer-sized integer
    Ptr,
}

impl Lane {
    /// Size in bytes on a 64-bit target
    pub fn size(self) -> usize {
        match self {
            Lane::I8 => 1,
            Lane::I16 => 2,
            Lane::I32 | Lane::F32 => 4,
            Lane::I64 | Lane::F64 | Lane::Ptr => 8,
        }
    }

    /// Floating-point lane
    pub fn is_float(self) -> bool {
        matches!(self, Lane::F32 | Lane::F64)
    }
}

/// How a narrow integer is widened to register width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// Already register width, a float or a pointer
    None,
    /// Sign-extend
    Signed,
    /// Zero-extend
    Unsigned,
}

/// A lane with its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoweredValue {
    /// Machine type
    pub lane: Lane,
    /// Widening rule
    pub extension: Extension,
}

/// How the platform returns a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLowering {
    /// Nothing
    Void,
    /// In registers; lanes are stored at consecutive offsets of the return slot
    Lanes(Vec<LoweredValue>),
    /// Through a caller-provided pointer
    Hidden,
}

/// A descriptor lowered to the platform convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredSignature {
    /// Convention the lowering was made for
    pub abi: PlatformAbi,
    /// Declared parameters, without any hidden pointer
    pub params: Vec<LoweredValue>,
    /// Return convention
    pub ret: ReturnLowering,
}

impl LoweredSignature {
    /// `true` if the callee expects a hidden return pointer
    pub fn has_hidden_return(&self) -> bool {
        self.ret == ReturnLowering::Hidden
    }

    /// Dispatch slots used: declared parameters plus the hidden pointer
    pub fn slot_count(&self) -> usize {
        self.params.len() + usize::from(self.has_hidden_return())
    }

    /// Byte offsets of the return lanes inside the return slot
    pub fn return_offsets(&self) -> Vec<(LoweredValue, i32)> {
        let mut offset = 0usize;
        match &self.ret {
            ReturnLowering::Lanes(lanes) => lanes
                .iter()
                .map(|lane| {
                    let at = offset;
                    offset += lane.lane.size();
                    (*lane, at as i32)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn scalar_lane(vt: ValueType) -> Option<LoweredValue> {
    let (lane, extension) = match vt {
        ValueType::Bool | ValueType::Char8 | ValueType::UInt8 => (Lane::I8, Extension::Unsigned),
        ValueType::Int8 => (Lane::I8, Extension::Signed),
        ValueType::Char16 | ValueType::UInt16 => (Lane::I16, Extension::Unsigned),
        ValueType::Int16 => (Lane::I16, Extension::Signed),
        ValueType::Int32 => (Lane::I32, Extension::Signed),
        ValueType::UInt32 => (Lane::I32, Extension::Unsigned),
        ValueType::Int64 | ValueType::UInt64 => (Lane::I64, Extension::None),
        ValueType::Pointer | ValueType::Function => (Lane::Ptr, Extension::None),
        ValueType::Float => (Lane::F32, Extension::None),
        ValueType::Double => (Lane::F64, Extension::None),
        _ => return None,
    };
    Some(LoweredValue { lane, extension })
}

const POINTER: LoweredValue = LoweredValue {
    lane: Lane::Ptr,
    extension: Extension::None,
};

fn lower_param(param: &ParamDescriptor) -> Result<LoweredValue, JitError> {
    let vt = param.value_type;
    if matches!(vt, ValueType::Invalid | ValueType::Void) {
        return Err(JitError::UnsupportedType {
            position: "param",
            value_type: vt.to_string(),
        });
    }
    if param.is_ref || vt.is_object() || vt.is_struct() {
        return Ok(POINTER);
    }
    scalar_lane(vt).ok_or_else(|| JitError::UnsupportedType {
        position: "param",
        value_type: vt.to_string(),
    })
}

fn lower_return(abi: PlatformAbi, ret: &ParamDescriptor) -> Result<ReturnLowering, JitError> {
    let vt = ret.value_type;
    if vt == ValueType::Void {
        return Ok(ReturnLowering::Void);
    }
    if abi.returns_hidden(ret) {
        return Ok(ReturnLowering::Hidden);
    }
    if ret.is_ref {
        return Ok(ReturnLowering::Lanes(vec![POINTER]));
    }
    if vt.is_struct() {
        let lanes = abi
            .struct_return_lanes(vt)
            .into_iter()
            .map(|lane| LoweredValue { lane, extension: Extension::None })
            .collect();
        return Ok(ReturnLowering::Lanes(lanes));
    }
    scalar_lane(vt)
        .map(|lane| ReturnLowering::Lanes(vec![lane]))
        .ok_or_else(|| JitError::UnsupportedType {
            position: "return",
            value_type: vt.to_string(),
        })
}

/// Lower a descriptor for `abi`
pub fn lower_signature(
    abi: PlatformAbi,
    method: &MethodDescriptor,
) -> Result<LoweredSignature, JitError> {
    let params = method
        .param_types
        .iter()
        .map(lower_param)
        .collect::<Result<Vec<_>, _>>()?;
    let ret = lower_return(abi, &method.ret_type)?;
    let lowered = LoweredSignature { abi, params, ret };
    if lowered.slot_count() > MAX_DISPATCH_SLOTS {
        return Err(JitError::TooManyParameters(lowered.slot_count()));
    }
    Ok(lowered)
}
