use proc_macro2::{Span, TokenStream};
use quote::quote;
use std::env;
use std::fs;
use std::path::Path;
use syn::{Attribute, DeriveInput, Generics, Ident, Lit, Meta};

use abnf::Grammar;
use cstgen::{Node, NodeId, NodeKind, Origin, Schema, Terminal, VisitorContract};

use crate::error::{DeriveError, Result};

const ABNF_FILE_ATTR: &str = "abnf_file";
const ABNF_INLINE_ATTR: &str = "abnf_inline";
const ABNF_MODULE_ATTR: &str = "abnf_module";
const DEFAULT_MODULE: &str = "cst";

pub fn generate(ast: &DeriveInput) -> Result<TokenStream> {
    let grammar = grammar_from_ast(ast)?.with_core_rules()?;
    let module = module_from_ast(ast)?;
    let schema = cstgen::synthesize(&grammar)?;

    let generated_module = generate_module(&module, &schema);
    let generated_impl = generate_impl(&ast.ident, &ast.generics, &schema);

    Ok(quote! {
        #generated_module
        #generated_impl
    })
}

/// Load a grammar from a derive attribute.
///
/// There must be exactly 1 attribute specifying the grammar source. The source
/// may either be written inline, or a path to an abnf file relative to the
/// crate root.
fn grammar_from_ast(ast: &DeriveInput) -> Result<Grammar> {
    let sources: Vec<&Attribute> = ast
        .attrs
        .iter()
        .filter(|attr| match attr.parse_meta() {
            Ok(Meta::NameValue(val)) => {
                val.path.is_ident(ABNF_FILE_ATTR) || val.path.is_ident(ABNF_INLINE_ATTR)
            }
            _ => false,
        })
        .collect();

    let source_attr = match sources.len() {
        0 => return Err(DeriveError::MissingGrammarSource),
        1 => sources[0],
        _ => return Err(DeriveError::MultipleGrammarSources),
    };

    match source_attr.parse_meta()? {
        Meta::NameValue(val) => match val.lit {
            Lit::Str(s) => {
                let text = if val.path.is_ident(ABNF_FILE_ATTR) {
                    read_grammar_file(&s.value())?
                } else {
                    s.value()
                };
                Ok(text.parse()?)
            }
            _ => Err(DeriveError::InvalidAttribute(
                "grammar source not a string".to_owned(),
            )),
        },
        _ => Err(DeriveError::InvalidAttribute(
            "grammar source not a name value".to_owned(),
        )),
    }
}

fn read_grammar_file(file: &str) -> Result<String> {
    let root = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    let path = Path::new(&root).join(file);
    fs::read_to_string(&path).map_err(|e| DeriveError::ReadGrammarFile {
        path: path.to_string_lossy().into_owned(),
        message: e.to_string(),
    })
}

/// Name of the generated module, `cst` unless overridden.
fn module_from_ast(ast: &DeriveInput) -> Result<Ident> {
    for attr in &ast.attrs {
        if let Ok(Meta::NameValue(val)) = attr.parse_meta() {
            if !val.path.is_ident(ABNF_MODULE_ATTR) {
                continue;
            }
            return match val.lit {
                Lit::Str(s) => syn::parse_str::<Ident>(&s.value()).map_err(|_| {
                    DeriveError::InvalidAttribute(format!("'{}' is not a module name", s.value()))
                }),
                _ => Err(DeriveError::InvalidAttribute(
                    "module name not a string".to_owned(),
                )),
            };
        }
    }
    Ok(ident(DEFAULT_MODULE))
}

fn ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

/// Module a node's type is generated in.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Scope {
    Rules,
    Inners,
}

impl From<Origin> for Scope {
    fn from(origin: Origin) -> Scope {
        match origin {
            Origin::Rule => Scope::Rules,
            Origin::Inner => Scope::Inners,
        }
    }
}

/// Path to a node's type as seen from `scope`.
fn type_path(schema: &Schema, id: NodeId, scope: Scope) -> TokenStream {
    let node = schema.node(id);
    let name = ident(&node.name);
    match (Scope::from(node.origin), scope) {
        (Scope::Rules, Scope::Inners) => quote! { super::#name },
        (Scope::Inners, Scope::Rules) => quote! { inners::#name },
        _ => quote! { #name },
    }
}

/// Type of a field or variant payload. Rule types are boxed, every cycle in
/// a grammar goes through a rule reference.
fn member_type(schema: &Schema, id: NodeId, scope: Scope) -> TokenStream {
    let path = type_path(schema, id, scope);
    match schema.node(id).origin {
        Origin::Rule => quote! { ::std::boxed::Box<#path> },
        Origin::Inner => path,
    }
}

/// Generate the module holding every type of the schema.
///
/// Rule types live at the top of the module, anonymous types in a nested
/// `inners` module so they can't clash with rule names.
fn generate_module(module: &Ident, schema: &Schema) -> TokenStream {
    let rule_enum = generate_rule_enum(schema);

    let mut rule_items = Vec::new();
    let mut inner_items = Vec::new();
    for (id, node) in schema.nodes() {
        let item = generate_node(schema, node);
        match node.origin {
            Origin::Rule => rule_items.push(item),
            Origin::Inner => inner_items.push(item),
        }
        if let Some(contract) = schema.contract(id) {
            let visitor = generate_visitor(schema, contract);
            match node.origin {
                Origin::Rule => rule_items.push(visitor),
                Origin::Inner => inner_items.push(visitor),
            }
        }
    }

    quote! {
        #[allow(non_camel_case_types, non_snake_case, dead_code)]
        pub mod #module {
            #rule_enum

            #( #rule_items )*

            pub mod inners {
                #( #inner_items )*
            }
        }
    }
}

/// Generate enum variants for each rule.
fn generate_rule_enum(schema: &Schema) -> TokenStream {
    let variants: Vec<Ident> = schema
        .rules()
        .map(|(_, id)| ident(&schema.node(id).name))
        .collect();
    let names = schema.rules().map(|(name, _)| name.as_str());

    quote! {
        #[derive(Copy, Debug, Eq, Clone, PartialEq, Hash)]
        pub enum Rule {
            #( #variants ),*
        }

        impl Rule {
            pub fn name(self) -> &'static str {
                match self {
                    #( Rule::#variants => #names ),*
                }
            }
        }
    }
}

fn generate_node(schema: &Schema, node: &Node) -> TokenStream {
    let scope = Scope::from(node.origin);
    let name = ident(&node.name);
    match &node.kind {
        NodeKind::Sum(variants) => {
            let variants = variants.iter().map(|v| {
                let variant = ident(&v.name);
                let ty = member_type(schema, v.payload, scope);
                quote! { #variant(#ty) }
            });
            quote! {
                #[derive(Debug, Clone, PartialEq, Eq)]
                pub enum #name {
                    #( #variants ),*
                }
            }
        }
        NodeKind::Product(_) => generate_struct(schema, node, scope),
        NodeKind::Optional(inner) => {
            let ty = member_type(schema, *inner, scope);
            quote! {
                pub type #name = ::std::option::Option<#ty>;
            }
        }
        NodeKind::Sequence { inner, .. } => {
            let ty = member_type(schema, *inner, scope);
            quote! {
                pub type #name = ::std::vec::Vec<#ty>;
            }
        }
        NodeKind::Terminal(Terminal::Literal(text)) => quote! {
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct #name;

            impl #name {
                pub const LITERAL: &'static str = #text;
            }
        },
        NodeKind::Terminal(Terminal::Prose(text)) => quote! {
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct #name;

            impl #name {
                pub const PROSE: &'static str = #text;
            }
        },
        NodeKind::Terminal(Terminal::Digit(symbol)) => quote! {
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct #name;

            impl #name {
                pub const SYMBOL: char = #symbol;
            }
        },
        NodeKind::Terminal(Terminal::Value { value, .. }) => {
            let fields = generate_struct(schema, node, scope);
            quote! {
                #fields

                impl #name {
                    pub const VALUE: u32 = #value;
                }
            }
        }
    }
}

fn generate_struct(schema: &Schema, node: &Node, scope: Scope) -> TokenStream {
    let name = ident(&node.name);
    let fields = node.fields().iter().map(|f| {
        let field = ident(&f.name);
        let ty = member_type(schema, f.ty, scope);
        quote! { pub #field: #ty }
    });
    quote! {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct #name {
            #( #fields ),*
        }
    }
}

/// Generate the visitor trait of a sum and its dispatch method.
///
/// Dispatch is an exhaustive match, so a visitor must handle every variant.
fn generate_visitor(schema: &Schema, contract: &VisitorContract) -> TokenStream {
    let sum = schema.node(contract.sum);
    let scope = Scope::from(sum.origin);
    let sum_name = ident(&sum.name);
    let visitor = ident(&contract.visitor);
    let dispatch = ident(&contract.dispatch);

    let methods = contract.accepts.iter().map(|accept| {
        let method = ident(&accept.method);
        let ty = type_path(schema, accept.payload, scope);
        quote! {
            fn #method(&mut self, node: &#ty, context: TContext) -> TResult;
        }
    });
    let arms = contract.accepts.iter().map(|accept| {
        let method = ident(&accept.method);
        let variant = ident(&accept.variant);
        quote! {
            #sum_name::#variant(node) => visitor.#method(node, context)
        }
    });

    quote! {
        pub trait #visitor<TResult, TContext> {
            #( #methods )*
        }

        impl #sum_name {
            pub fn #dispatch<TResult, TContext, V>(
                &self,
                visitor: &mut V,
                context: TContext,
            ) -> TResult
            where
                V: #visitor<TResult, TContext> + ?Sized,
            {
                match self {
                    #( #arms ),*
                }
            }
        }
    }
}

/// Generate the impl exposing rule names on the derived type.
fn generate_impl(name: &Ident, generics: &Generics, schema: &Schema) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let rules = schema.rules().map(|(rule, _)| rule.as_str());
    quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            pub const RULES: &'static [&'static str] = &[ #( #rules ),* ];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_str;

    fn schema(text: &str) -> Schema {
        let g: Grammar = text.parse().unwrap();
        cstgen::synthesize(&g).unwrap()
    }

    #[test]
    fn generate_print() {
        let def = "
            #[derive(Cst)]
            #[abnf_inline = \"a = b / \\\"c\\\"\nb = 1*DIGIT\"]
            struct Dummy;
         ";
        let ast: DeriveInput = parse_str(def).unwrap();
        let ts = generate(&ast).unwrap();
        let generated = ts.to_string();
        println!("Generated:\n{}", generated);
        assert!(generated.contains("pub mod cst"));
        assert!(generated.contains("pub trait _aVisitor"));
        assert!(generated.contains("RULES"));
    }

    #[test]
    fn load_simple_inline_grammar() {
        let def = "
            #[abnf_inline = \"a = \\\"b\\\"\"]
            struct Dummy;
        ";
        let ast = parse_str(def).unwrap();
        let got = grammar_from_ast(&ast).unwrap();
        let expected: Grammar = "a = \"b\"\n".parse().unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn load_grammar_file() {
        let def = "
            #[abnf_file = \"../abnfcst/grammars/abnf.abnf\"]
            struct Dummy;
        ";
        let ast = parse_str(def).unwrap();
        let got = grammar_from_ast(&ast).unwrap();
        assert!(got.lookup("rulelist").is_some());
        assert!(got.lookup("ALPHA").is_none());
    }

    #[test]
    fn missing_grammar_file() {
        let def = "
            #[abnf_file = \"no/such/file.abnf\"]
            struct Dummy;
        ";
        let ast = parse_str(def).unwrap();
        let err = grammar_from_ast(&ast).unwrap_err();
        assert!(matches!(err, DeriveError::ReadGrammarFile { .. }));
    }

    #[test]
    fn missing_grammar_source() {
        let def = "
            struct Dummy;
        ";
        let ast = parse_str(def).unwrap();
        let err = grammar_from_ast(&ast).unwrap_err();
        assert_eq!(err, DeriveError::MissingGrammarSource);
    }

    #[test]
    fn multiple_grammar_sources() {
        let def = "
            #[abnf_inline = \"a = b\"]
            #[abnf_file = \"a.abnf\"]
            struct Dummy;
        ";
        let ast = parse_str(def).unwrap();
        let err = grammar_from_ast(&ast).unwrap_err();
        assert_eq!(err, DeriveError::MultipleGrammarSources);
    }

    #[test]
    fn invalid_grammar() {
        let def = "
            #[abnf_inline = \"a = \"]
            struct Dummy;
        ";
        let ast = parse_str(def).unwrap();
        let err = grammar_from_ast(&ast).unwrap_err();
        assert!(matches!(err, DeriveError::Grammar(_)));
    }

    #[test]
    fn module_names() {
        let ast = parse_str("struct Dummy;").unwrap();
        assert_eq!(module_from_ast(&ast).unwrap(), "cst");

        let ast = parse_str("#[abnf_module = \"meta\"] struct Dummy;").unwrap();
        assert_eq!(module_from_ast(&ast).unwrap(), "meta");

        let ast = parse_str("#[abnf_module = \"not a name\"] struct Dummy;").unwrap();
        assert!(matches!(
            module_from_ast(&ast).unwrap_err(),
            DeriveError::InvalidAttribute(_)
        ));
    }

    #[test]
    fn simple_rules_enum() {
        let s = schema("a = \"b\"\nc-d = a\n");
        let cd = ident("_cⲻd");
        let expected = quote! {
            #[derive(Copy, Debug, Eq, Clone, PartialEq, Hash)]
            pub enum Rule {
                _a,
                #cd
            }

            impl Rule {
                pub fn name(self) -> &'static str {
                    match self {
                        Rule::_a => "a",
                        Rule::#cd => "c-d"
                    }
                }
            }
        };
        let ts = generate_rule_enum(&s);
        assert_eq!(ts.to_string(), expected.to_string());
    }

    #[test]
    fn sum_and_visitor() {
        let s = schema("bit = \"0\" / \"1\"\n");
        let zero = ident("_ʺx30ʺ");
        let one = ident("_ʺx31ʺ");
        let accept_zero = ident("accept_ʺx30ʺ");
        let accept_one = ident("accept_ʺx31ʺ");

        let bit = s.rule("bit").unwrap();
        let expected = quote! {
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub enum _bit {
                #zero(inners::#zero),
                #one(inners::#one)
            }
        };
        assert_eq!(generate_node(&s, s.node(bit)).to_string(), expected.to_string());

        let expected = quote! {
            pub trait _bitVisitor<TResult, TContext> {
                fn #accept_zero(&mut self, node: &inners::#zero, context: TContext) -> TResult;
                fn #accept_one(&mut self, node: &inners::#one, context: TContext) -> TResult;
            }

            impl _bit {
                pub fn dispatch<TResult, TContext, V>(
                    &self,
                    visitor: &mut V,
                    context: TContext,
                ) -> TResult
                where
                    V: _bitVisitor<TResult, TContext> + ?Sized,
                {
                    match self {
                        _bit::#zero(node) => visitor.#accept_zero(node, context),
                        _bit::#one(node) => visitor.#accept_one(node, context)
                    }
                }
            }
        };
        let contract = s.contract(bit).unwrap();
        assert_eq!(generate_visitor(&s, contract).to_string(), expected.to_string());
    }

    #[test]
    fn rule_references_are_boxed() {
        let s = schema("list = \"x\" [list]\n");
        let x = ident("_ʺx78ʺ");
        let opt = ident("_ⳊlistↃ");

        let list = s.node(s.rule("list").unwrap());
        let expected = quote! {
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct _list {
                pub #x: inners::#x,
                pub #opt: inners::#opt
            }
        };
        assert_eq!(generate_node(&s, list).to_string(), expected.to_string());

        let optional = s.node(s.inner("_ⳊlistↃ").unwrap());
        let expected = quote! {
            pub type #opt = ::std::option::Option<::std::boxed::Box<super::_list> >;
        };
        assert_eq!(generate_node(&s, optional).to_string(), expected.to_string());
    }

    #[test]
    fn value_terminals() {
        let s = schema("a = %x41\n");
        let value = s.node(s.inner("_Ⰳx41").unwrap());
        let name = ident("_Ⰳx41");
        let expected = quote! {
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct #name {
                pub _4: _4,
                pub _1: _1
            }

            impl #name {
                pub const VALUE: u32 = 65u32;
            }
        };
        assert_eq!(generate_node(&s, value).to_string(), expected.to_string());
    }
}
