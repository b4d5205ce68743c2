#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the preload infrastructure crates.
//!
//! The only macro today is [`macro@preload_error`], which turns a plain enum into
//! the error type used at every crate boundary of the workspace.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for crate-level error enums.
///
/// # Generated items
///
/// * `#[derive(Debug, thiserror::Error)]`, unless already derived.
/// * A `<Name>Ext<T>` trait with `.context(...)` for `Result<T, Name>` and, for every
///   variant holding a `source`, for `Result<T, Source>` as well.
/// * `From<Source>` for every variant holding a `source` field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * An inherent `context_ref()` accessor returning the attached context, if any.
/// * A module-private `format_context` helper meant for `#[error(...)]` strings.
///
/// # Requirements
///
/// Variants must use named fields. A variant with a `source` must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[preload_derive::preload_error]
/// pub enum StoreError {
///     #[error("Query failed{}: {message}", format_context(.context))]
///     Query { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("Internal error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn preload_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
