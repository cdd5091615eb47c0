//! Native-origin method descriptors
//!
//! A descriptor is the signature a plugin publishes for an exported method:
//! parameter categories with by-reference flags, and a return category.
//! Function-typed parameters may carry a nested prototype describing the
//! callback shape. Descriptors drive trampoline generation; managed method
//! handles decide which managed code actually runs.

use serde::{Deserialize, Serialize};

use crate::abi::ManagedType;
use crate::error::{SdkError, SdkResult};
use crate::value_type::ValueType;

/// One parameter (or the return value) of a method descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Value category
    #[serde(rename = "type")]
    pub value_type: ValueType,

    /// Passed by reference
    #[serde(default, rename = "ref", skip_serializing_if = "std::ops::Not::not")]
    pub is_ref: bool,

    /// Optional parameter name, used in diagnostics only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Callback shape for `function` parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<Box<MethodDescriptor>>,
}

impl ParamDescriptor {
    /// A by-value parameter of `value_type`
    pub fn new(value_type: ValueType) -> Self {
        ParamDescriptor {
            value_type,
            is_ref: false,
            name: None,
            prototype: None,
        }
    }

    /// A by-reference parameter of `value_type`
    pub fn by_ref(value_type: ValueType) -> Self {
        ParamDescriptor {
            is_ref: true,
            ..ParamDescriptor::new(value_type)
        }
    }

    /// Attach a callback prototype
    pub fn with_prototype(mut self, prototype: MethodDescriptor) -> Self {
        self.prototype = Some(Box::new(prototype));
        self
    }

    /// The (category, by-ref) pair as exchanged with the runtime
    pub fn managed_type(&self) -> ManagedType {
        ManagedType::new(self.value_type, self.is_ref)
    }
}

impl Default for ParamDescriptor {
    fn default() -> Self {
        ParamDescriptor::new(ValueType::Void)
    }
}

/// Signature of an exported or callable function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    /// Export name seen by other plugins
    pub name: String,

    /// `Class.Method` or `Namespace.Class.Method` of the implementation
    #[serde(default)]
    pub func_name: String,

    /// Parameters in declaration order
    #[serde(default)]
    pub param_types: Vec<ParamDescriptor>,

    /// Return value
    #[serde(default)]
    pub ret_type: ParamDescriptor,
}

impl MethodDescriptor {
    /// A `void()` descriptor
    pub fn new(name: impl Into<String>, func_name: impl Into<String>) -> Self {
        MethodDescriptor {
            name: name.into(),
            func_name: func_name.into(),
            param_types: Vec::new(),
            ret_type: ParamDescriptor::default(),
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, param: ParamDescriptor) -> Self {
        self.param_types.push(param);
        self
    }

    /// Set the return value
    pub fn with_return(mut self, ret: ParamDescriptor) -> Self {
        self.ret_type = ret;
        self
    }

    /// Number of declared parameters
    pub fn param_count(&self) -> usize {
        self.param_types.len()
    }

    /// Find a callback prototype by name, searching nested prototypes depth first
    pub fn find_prototype(&self, name: &str) -> Option<&MethodDescriptor> {
        self.param_types
            .iter()
            .chain(std::iter::once(&self.ret_type))
            .filter_map(|param| param.prototype.as_deref())
            .find_map(|proto| {
                if proto.name == name {
                    Some(proto)
                } else {
                    proto.find_prototype(name)
                }
            })
    }

    /// Reject descriptors that can never be compiled or dispatched
    pub fn validate(&self) -> SdkResult<()> {
        if self.ret_type.value_type == ValueType::Invalid {
            return Err(SdkError::InvalidDescriptor(format!(
                "method '{}' has an invalid return type",
                self.name
            )));
        }
        for (index, param) in self.param_types.iter().enumerate() {
            if matches!(param.value_type, ValueType::Invalid | ValueType::Void) {
                return Err(SdkError::InvalidDescriptor(format!(
                    "method '{}' has invalid param type '{}' at index {}",
                    self.name, param.value_type, index
                )));
            }
        }
        Ok(())
    }
}
