use std::collections::HashMap;

use darling::{
    util::{Flag, PathList},
    FromDeriveInput, FromField, FromMeta,
};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;

#[proc_macro_derive(MultiTable, attributes(multitable))]
pub fn multi_table_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    match impl_multi_table(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn impl_multi_table(ast: &syn::DeriveInput) -> syn::Result<TokenStream> {
    let options = match MultiTableOptions::from_derive_input(ast) {
        Ok(options) => options,
        Err(err) => return Ok(err.write_errors()),
    };

    let ident = &options.ident;
    let vis = &options.vis;
    let module = match &options.module {
        Some(expr) => expr_ident(expr)?,
        None => format_ident!("{}", snake_case(&ident.to_string())),
    };

    let fields = options
        .data
        .take_struct()
        .ok_or_else(|| syn::Error::new(ast.span(), "MultiTable requires a struct"))?;
    let mut field_types = HashMap::new();

    for field in fields {
        if let Some(field_ident) = field.ident {
            field_types.insert(field_ident, field.ty);
        }
    }

    let count = options.indices.len();
    let mut back_fields = Vec::new();
    let mut back_types = Vec::new();
    let mut row_keys = Vec::new();
    let mut index_defs = Vec::new();
    let mut getters = Vec::new();

    for (i, index) in options.indices.iter().enumerate() {
        let mut idents = Vec::new();
        let mut types = Vec::new();

        for path in index.fields.iter() {
            let Some(field) = path.get_ident() else {
                return Err(syn::Error::new(path.span(), "expected a field name"));
            };
            let Some(ty) = field_types.get(field) else {
                return Err(syn::Error::new(
                    field.span(),
                    format!("`{}` has no field `{}`", ident, field),
                ));
            };
            idents.push(field.clone());
            types.push(ty.clone());
        }

        if idents.is_empty() {
            return Err(syn::Error::new(ast.span(), "an index needs at least one field"));
        }

        let def = format_ident!("Index{}", i);
        let back_field = format_ident!("index_{}", i);
        let getter = match &index.getter {
            Some(expr) => expr_ident(expr)?,
            None => {
                let names: Vec<String> = idents.iter().map(|field| field.to_string()).collect();
                format_ident!("get_by_{}", names.join("_"))
            }
        };
        let name = getter.to_string();

        let (kind, back_type) = if index.unique.is_present() {
            (quote!(::multitable::Unique), quote!(usize))
        } else {
            (quote!(::multitable::NonUnique), quote!(::multitable::MultiIndex))
        };

        // A single field is hashed and compared as itself, several fields as a tuple of references.
        let (row_key, lookup_key, same_key, matches) = if idents.len() == 1 {
            let field = &idents[0];
            (
                quote!(&row.#field),
                quote!(#field),
                quote!(a.#field == b.#field),
                quote!(__row.#field == *#field),
            )
        } else {
            (
                quote!(&(#(&row.#idents),*)),
                quote!(&(#(#idents),*)),
                quote!((#(&a.#idents),*) == (#(&b.#idents),*)),
                quote!((#(&__row.#idents),*) == (#(#idents),*)),
            )
        };

        let rest = (0..i).map(|_| quote!(let indices = &indices.1;));

        index_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #def;

            impl ::multitable::IndexDef<Schema> for #def {
                type Kind = #kind;

                const NAME: &'static str = #name;

                #[inline]
                fn hash(hashes: &[u32; #count]) -> u32 {
                    hashes[#i]
                }

                #[inline]
                fn same_key(a: &#ident, b: &#ident) -> bool {
                    #same_key
                }

                #[inline]
                fn back(backs: &BackIndexes) -> &#back_type {
                    &backs.#back_field
                }

                #[inline]
                fn back_mut(backs: &mut BackIndexes) -> &mut #back_type {
                    &mut backs.#back_field
                }

                #[inline]
                fn index(
                    indices: &<Schema as ::multitable::Schema>::Indices,
                ) -> &::multitable::Index<Schema, Self> {
                    #(#rest)*
                    &indices.0
                }
            }
        });

        getters.push(if index.unique.is_present() {
            quote! {
                pub fn #getter(&self, #(#idents: &#types),*) -> ::std::option::Option<usize> {
                    let __hash = self.0.hash_key(#lookup_key);
                    self.0.find::<#def, _>(__hash, |__row| #matches)
                }
            }
        } else {
            quote! {
                pub fn #getter(&self, #(#idents: &#types),*) -> ::multitable::Chain<'_, Schema, #def> {
                    let __hash = self.0.hash_key(#lookup_key);
                    self.0.select::<#def, _>(__hash, |__row| #matches)
                }
            }
        });

        back_fields.push(back_field);
        back_types.push(back_type);
        row_keys.push(row_key);
    }

    let indices_type = (0..count).rev().fold(quote!(()), |rest, i| {
        let def = format_ident!("Index{}", i);
        quote!((::multitable::Index<Schema, #def>, #rest))
    });

    Ok(quote! {
        #vis mod #module {
            use super::*;

            #[derive(Clone, Copy, Debug, Default, PartialEq)]
            pub struct BackIndexes {
                #(pub #back_fields: #back_types),*
            }

            #[derive(Clone, Copy, Debug, Default)]
            pub struct Schema;

            impl ::multitable::Schema for Schema {
                type Row = #ident;
                type Hashes = [u32; #count];
                type Backs = BackIndexes;
                type Indices = #indices_type;

                fn hashes<H: ::std::hash::BuildHasher>(hasher: &H, row: &#ident) -> [u32; #count] {
                    [#(::multitable::hash32(hasher, #row_keys)),*]
                }
            }

            #(#index_defs)*

            pub struct Table<H = ::multitable::DefaultHashBuilder>(::multitable::Table<Schema, H>);

            impl Table {
                pub fn new() -> Self {
                    Self(::multitable::Table::new())
                }

                pub fn with_options(
                    options: ::multitable::TableOptions,
                ) -> ::multitable::Result<Self> {
                    ::multitable::Table::with_options(options).map(Self)
                }
            }

            impl<H: ::std::hash::BuildHasher> Table<H> {
                pub fn with_hasher(hasher: H) -> Self {
                    Self(::multitable::Table::with_hasher(hasher))
                }

                pub fn with_options_and_hasher(
                    options: ::multitable::TableOptions,
                    hasher: H,
                ) -> ::multitable::Result<Self> {
                    ::multitable::Table::with_options_and_hasher(options, hasher).map(Self)
                }

                #(#getters)*
            }

            impl ::std::default::Default for Table {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl<H> ::std::ops::Deref for Table<H> {
                type Target = ::multitable::Table<Schema, H>;

                fn deref(&self) -> &Self::Target {
                    &self.0
                }
            }

            impl<H> ::std::ops::DerefMut for Table<H> {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut self.0
                }
            }

            impl<H> ::std::clone::Clone for Table<H>
            where
                ::multitable::Table<Schema, H>: ::std::clone::Clone,
            {
                fn clone(&self) -> Self {
                    Self(self.0.clone())
                }
            }

            impl<H> ::std::fmt::Debug for Table<H>
            where
                ::multitable::Table<Schema, H>: ::std::fmt::Debug,
            {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    self.0.fmt(f)
                }
            }
        }
    })
}

/// Accepts `name` as well as `"name"`.
fn expr_ident(expr: &syn::Expr) -> syn::Result<syn::Ident> {
    match expr {
        syn::Expr::Path(path) => path
            .path
            .get_ident()
            .cloned()
            .ok_or_else(|| syn::Error::new(path.span(), "expected an identifier")),
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => lit.parse(),
        other => Err(syn::Error::new(other.span(), "expected an identifier")),
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(FromDeriveInput)]
#[darling(attributes(multitable), supports(struct_named))]
struct MultiTableOptions {
    ident: syn::Ident,
    vis: syn::Visibility,
    data: darling::ast::Data<(), FieldOptions>,
    #[darling(default)]
    module: Option<syn::Expr>,
    #[darling(default, multiple, rename = "index")]
    indices: Vec<IndexAttr>,
}

#[derive(FromMeta)]
struct IndexAttr {
    fields: PathList,
    #[darling(default)]
    getter: Option<syn::Expr>,
    #[darling(default)]
    unique: Flag,
}

#[derive(FromField)]
struct FieldOptions {
    ident: Option<syn::Ident>,
    ty: syn::Type,
}
