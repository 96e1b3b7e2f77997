//! Compile-time JMESPath expressions
//!
//! `jmespath!("foo.bar")` parses the expression while the crate is being
//! compiled and expands to code building the same `jmespath::Expression`
//! that `jmespath::compile` returns at runtime. Invalid expressions fail
//! the build with the parse error.

use jmespath_ast::{Ast, Comparator, KeyValuePair, Spanned};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{LitStr, parse_macro_input};

#[proc_macro]
pub fn jmespath(input: TokenStream) -> TokenStream {
    let literal = parse_macro_input!(input as LitStr);
    let expression = literal.value();

    let ast = match jmespath_parser::parse(&expression) {
        Ok(ast) => ast,
        Err(err) => {
            return syn::Error::new(literal.span(), err.to_string())
                .to_compile_error()
                .into();
        }
    };

    let ast = spanned_tokens(&ast);
    quote! {
        ::jmespath::Expression::new(#expression, #ast, &::jmespath::DEFAULT_RUNTIME)
    }
    .into()
}

fn spanned_tokens(spanned: &Spanned<Ast>) -> TokenStream2 {
    let start = spanned.span.start;
    let end = spanned.span.end;
    let node = ast_tokens(&spanned.node);
    quote! {
        ::jmespath::ast::Spanned::new(#node, ::jmespath::ast::Span::new(#start, #end))
    }
}

fn boxed(spanned: &Spanned<Ast>) -> TokenStream2 {
    let inner = spanned_tokens(spanned);
    quote! { ::std::boxed::Box::new(#inner) }
}

fn optional(value: Option<i32>) -> TokenStream2 {
    match value {
        Some(v) => quote! { ::std::option::Option::Some(#v) },
        None => quote! { ::std::option::Option::None },
    }
}

fn comparator_tokens(comparator: Comparator) -> TokenStream2 {
    match comparator {
        Comparator::Equal => quote! { ::jmespath::ast::Comparator::Equal },
        Comparator::NotEqual => quote! { ::jmespath::ast::Comparator::NotEqual },
        Comparator::LessThan => quote! { ::jmespath::ast::Comparator::LessThan },
        Comparator::LessThanEqual => quote! { ::jmespath::ast::Comparator::LessThanEqual },
        Comparator::GreaterThan => quote! { ::jmespath::ast::Comparator::GreaterThan },
        Comparator::GreaterThanEqual => quote! { ::jmespath::ast::Comparator::GreaterThanEqual },
    }
}

fn pair_tokens(pair: &KeyValuePair) -> TokenStream2 {
    let key = &pair.key;
    let value = spanned_tokens(&pair.value);
    quote! {
        ::jmespath::ast::KeyValuePair {
            key: ::std::string::String::from(#key),
            value: #value,
        }
    }
}

fn ast_tokens(ast: &Ast) -> TokenStream2 {
    match ast {
        Ast::Identity => quote! { ::jmespath::ast::Ast::Identity },
        Ast::Field { name } => quote! {
            ::jmespath::ast::Ast::Field { name: ::std::string::String::from(#name) }
        },
        Ast::Index { idx } => quote! { ::jmespath::ast::Ast::Index { idx: #idx } },
        Ast::Slice { start, stop, step } => {
            let start = optional(*start);
            let stop = optional(*stop);
            quote! {
                ::jmespath::ast::Ast::Slice { start: #start, stop: #stop, step: #step }
            }
        }
        Ast::Literal { value } => {
            // Literals are embedded as JSON text and decoded on first use
            let json = value.to_string();
            quote! {
                ::jmespath::ast::Ast::Literal {
                    value: ::jmespath::Rcvar::new(
                        ::jmespath::Variable::from_json(#json).unwrap_or_default()
                    ),
                }
            }
        }
        Ast::Subexpr { lhs, rhs } => {
            let (lhs, rhs) = (boxed(lhs), boxed(rhs));
            quote! { ::jmespath::ast::Ast::Subexpr { lhs: #lhs, rhs: #rhs } }
        }
        Ast::Projection { lhs, rhs } => {
            let (lhs, rhs) = (boxed(lhs), boxed(rhs));
            quote! { ::jmespath::ast::Ast::Projection { lhs: #lhs, rhs: #rhs } }
        }
        Ast::ObjectValues { node } => {
            let node = boxed(node);
            quote! { ::jmespath::ast::Ast::ObjectValues { node: #node } }
        }
        Ast::Flatten { node } => {
            let node = boxed(node);
            quote! { ::jmespath::ast::Ast::Flatten { node: #node } }
        }
        Ast::Condition { predicate, then } => {
            let (predicate, then) = (boxed(predicate), boxed(then));
            quote! { ::jmespath::ast::Ast::Condition { predicate: #predicate, then: #then } }
        }
        Ast::Comparison {
            comparator,
            lhs,
            rhs,
        } => {
            let comparator = comparator_tokens(*comparator);
            let (lhs, rhs) = (boxed(lhs), boxed(rhs));
            quote! {
                ::jmespath::ast::Ast::Comparison { comparator: #comparator, lhs: #lhs, rhs: #rhs }
            }
        }
        Ast::And { lhs, rhs } => {
            let (lhs, rhs) = (boxed(lhs), boxed(rhs));
            quote! { ::jmespath::ast::Ast::And { lhs: #lhs, rhs: #rhs } }
        }
        Ast::Or { lhs, rhs } => {
            let (lhs, rhs) = (boxed(lhs), boxed(rhs));
            quote! { ::jmespath::ast::Ast::Or { lhs: #lhs, rhs: #rhs } }
        }
        Ast::Not { node } => {
            let node = boxed(node);
            quote! { ::jmespath::ast::Ast::Not { node: #node } }
        }
        Ast::MultiList { elements } => {
            let elements = elements.iter().map(spanned_tokens);
            quote! { ::jmespath::ast::Ast::MultiList { elements: ::std::vec![#(#elements),*] } }
        }
        Ast::MultiHash { elements } => {
            let elements = elements.iter().map(pair_tokens);
            quote! { ::jmespath::ast::Ast::MultiHash { elements: ::std::vec![#(#elements),*] } }
        }
        Ast::Function { name, args } => {
            let args = args.iter().map(spanned_tokens);
            quote! {
                ::jmespath::ast::Ast::Function {
                    name: ::std::string::String::from(#name),
                    args: ::std::vec![#(#args),*],
                }
            }
        }
        Ast::Expref { ast } => {
            let ast = boxed(ast);
            quote! { ::jmespath::ast::Ast::Expref { ast: #ast } }
        }
    }
}
