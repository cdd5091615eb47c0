//! Export validation: declared descriptors against managed methods

use netbridge_sdk::MethodDescriptor;

use crate::error::ExportError;
use crate::reflect::{MethodInfo, Type};

/// Split `Namespace.Class.Method` into (class, method).
///
/// Empty segments are ignored. Two segments give `Class.Method`; three give
/// a namespaced class. Anything else is rejected.
pub fn split_function_name(func_name: &str) -> Result<(String, String), ExportError> {
    let parts: Vec<&str> = func_name.split('.').filter(|part| !part.is_empty()).collect();
    match parts.as_slice() {
        [class, method] => Ok((class.to_string(), method.to_string())),
        [namespace, class, method] => Ok((format!("{}.{}", namespace, class), method.to_string())),
        _ => Err(ExportError::InvalidFormat(func_name.to_string())),
    }
}

/// Compare a declared descriptor with the managed method it names.
///
/// Every mismatch is collected.
pub fn validate_signature(method: &MethodDescriptor, info: &MethodInfo) -> Vec<ExportError> {
    let mut errors = Vec::new();
    let name = &method.func_name;

    let expected_ret = info.return_type().managed_type().value_type();
    let got_ret = method.ret_type.value_type;
    if expected_ret != got_ret {
        errors.push(ExportError::ReturnMismatch {
            name: name.clone(),
            got: got_ret.to_string(),
            expected: expected_ret.to_string(),
        });
    }

    let params = info.parameter_types();
    if params.len() != method.param_count() {
        errors.push(ExportError::ParamCountMismatch {
            name: name.clone(),
            got: method.param_count(),
            expected: params.len(),
        });
        return errors;
    }

    for (index, (declared, actual)) in method.param_types.iter().zip(params).enumerate() {
        let expected = actual.managed_type().value_type();
        if declared.value_type != expected {
            errors.push(ExportError::ParamMismatch {
                name: name.clone(),
                got: declared.value_type.to_string(),
                index,
                expected: expected.to_string(),
            });
        }
    }
    errors
}

/// Resolve one export against the plugin's assembly types.
///
/// `find_type` looks a class up by full name.
pub fn resolve_export<'a>(
    method: &MethodDescriptor,
    find_type: impl Fn(&str) -> Option<&'a Type>,
) -> Result<(&'a Type, MethodInfo), Vec<ExportError>> {
    let (class, method_name) = split_function_name(&method.func_name).map_err(|e| vec![e])?;
    let ty = find_type(&class).ok_or_else(|| vec![ExportError::ClassNotFound(method.func_name.clone())])?;
    let info = ty.method(&method_name);
    if !info.is_valid() {
        return Err(vec![ExportError::MethodNotFound(method.func_name.clone())]);
    }
    let errors = validate_signature(method, &info);
    if errors.is_empty() {
        Ok((ty, info))
    } else {
        Err(errors)
    }
}
