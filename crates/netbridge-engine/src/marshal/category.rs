//! How each value category crosses the dispatch boundary

use netbridge_sdk::{ParamDescriptor, ValueType};

/// Where the managed side finds a dispatch argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPassing {
    /// The slot holds the value itself; pass a pointer to the slot
    SlotAddress,
    /// The slot holds a pointer to the value; pass that pointer
    SlotValue,
}

/// Boundary class of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryClass {
    /// Fits a register or stack slot by value
    InlineScalar,
    /// Native-owned object reached through a pointer
    HiddenPointer,
    /// Fixed-size struct or function pointer, passed by address
    ByAddress,
}

/// Classify a category; `None` for `Invalid` and `Void`
pub fn classify(vt: ValueType) -> Option<BoundaryClass> {
    if vt.is_scalar() && vt != ValueType::Function {
        Some(BoundaryClass::InlineScalar)
    } else if vt.is_object() {
        Some(BoundaryClass::HiddenPointer)
    } else if vt.is_struct() || vt == ValueType::Function {
        Some(BoundaryClass::ByAddress)
    } else {
        None
    }
}

/// Passing rule for one declared parameter.
///
/// By-reference parameters always arrive as a pointer in the slot. `None`
/// means the category can never be a parameter.
pub fn arg_passing(param: &ParamDescriptor) -> Option<ArgPassing> {
    let class = classify(param.value_type)?;
    if param.is_ref {
        return Some(ArgPassing::SlotValue);
    }
    Some(match class {
        BoundaryClass::InlineScalar => ArgPassing::SlotAddress,
        BoundaryClass::HiddenPointer | BoundaryClass::ByAddress => ArgPassing::SlotValue,
    })
}
