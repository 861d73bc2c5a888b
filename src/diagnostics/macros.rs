//! Diagnostic macros.

/// Emit a predefined diagnostic by code.
///
/// # Example
///
/// ```rust,ignore
/// gm_emit!(GM302);
/// gm_emit!(GM001, format!("client {}", handle));
/// ```
#[macro_export]
macro_rules! gm_emit {
    ($code:ident) => {{
        $crate::diagnostics::emit::emit(&$crate::diagnostics::$code);
    }};
    ($code:ident, $context:expr) => {{
        let context: ::std::string::String = $context;
        $crate::diagnostics::emit::emit_with_context(
            &$crate::diagnostics::$code,
            ::std::option::Option::Some(context.as_str()),
        );
    }};
}

/// Assert a condition or emit a diagnostic.
///
/// # Example
///
/// ```rust,ignore
/// gm_assert!(granted <= ceiling, GM901);
/// ```
#[macro_export]
macro_rules! gm_assert {
    ($cond:expr, $code:ident) => {{
        if !$cond {
            $crate::gm_emit!($code);
        }
    }};
    ($cond:expr, $code:ident, $context:expr) => {{
        if !$cond {
            $crate::gm_emit!($code, $context);
        }
    }};
}
