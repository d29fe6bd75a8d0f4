//! Process-wide front-end configuration.
//!
//! Holds the ambient global type names every declaration document may refer
//! to without declaring or importing them. Built lazily on first use and
//! read-only afterwards; per-run state lives in
//! [`ResolutionContext`](crate::resolve::ResolutionContext).

use std::collections::HashSet;
use std::sync::OnceLock;

/// ES2015+ library types, utility types, and the DOM names that commonly
/// appear in published declaration files.
const BUILTIN_GLOBALS: &[&str] = &[
    // Core ECMAScript
    "Array", "ArrayLike", "ArrayBuffer", "ArrayBufferLike", "ArrayBufferView", "AsyncGenerator",
    "AsyncIterable", "AsyncIterableIterator", "AsyncIterator", "BigInt", "BigInt64Array",
    "BigUint64Array", "Boolean", "DataView", "Date", "Error", "EvalError", "Float32Array",
    "Float64Array", "Function", "Generator", "Int8Array", "Int16Array", "Int32Array", "Iterable",
    "IterableIterator", "Iterator", "IteratorResult", "JSON", "Map", "Math", "Number", "Object",
    "Promise", "PromiseLike", "PropertyDescriptor", "PropertyKey", "Proxy", "RangeError",
    "ReadonlyArray", "ReadonlyMap", "ReadonlySet", "ReferenceError", "RegExp", "Set", "String",
    "Symbol", "SyntaxError", "TemplateStringsArray", "TypeError", "Uint8Array",
    "Uint8ClampedArray", "Uint16Array", "Uint32Array", "URIError", "WeakMap", "WeakRef",
    "WeakSet", "CallableFunction", "NewableFunction", "IArguments", "ThisType",
    // Utility types
    "Awaited", "Capitalize", "ConstructorParameters", "Exclude", "Extract", "InstanceType",
    "Lowercase", "NonNullable", "Omit", "OmitThisParameter", "Parameters", "Partial", "Pick",
    "Readonly", "Record", "Required", "ReturnType", "ThisParameterType", "Uncapitalize",
    "Uppercase", "NoInfer",
    // DOM and host
    "AbortController", "AbortSignal", "Blob", "BodyInit", "CustomEvent", "Document", "Element",
    "Event", "EventListener", "EventTarget", "File", "FormData", "Headers", "HTMLElement",
    "HTMLInputElement", "KeyboardEvent", "MouseEvent", "Node", "NodeList", "ReadableStream",
    "Request", "RequestInit", "Response", "ResponseInit", "URL", "URLSearchParams", "Window",
    "WritableStream", "TextDecoder", "TextEncoder", "console", "globalThis",
];

/// Read-only front-end settings shared by every detection run.
#[derive(Debug)]
pub struct FrontEnd {
    globals: HashSet<&'static str>,
}

impl FrontEnd {
    /// The shared instance, built on first call.
    pub fn get() -> &'static FrontEnd {
        static FRONT_END: OnceLock<FrontEnd> = OnceLock::new();
        FRONT_END.get_or_init(|| FrontEnd {
            globals: BUILTIN_GLOBALS.iter().copied().collect(),
        })
    }

    /// True when `name` (or the first segment of a qualified name) is a
    /// builtin global.
    pub fn is_global(&self, name: &str) -> bool {
        let head = name.split('.').next().unwrap_or(name);
        self.globals.contains(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_instance_is_stable() {
        let a = FrontEnd::get() as *const FrontEnd;
        let b = FrontEnd::get() as *const FrontEnd;
        assert_eq!(a, b);
    }

    #[test]
    fn knows_common_globals() {
        let fe = FrontEnd::get();
        assert!(fe.is_global("Promise"));
        assert!(fe.is_global("Record"));
        assert!(fe.is_global("HTMLElement"));
        assert!(fe.is_global("JSON.stringify"));
        assert!(!fe.is_global("Invalid"));
    }
}
