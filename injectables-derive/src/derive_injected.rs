use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::{Data, DeriveInput, Expr, Field, Fields, Meta, Path, Type, Visibility};

use crate::utils::{self, Category, Namespace, error_messages};

struct InjectedField {
    name: Ident,
    vis: Visibility,
    ty: Type,
    category: Option<Category>,
    args: Option<Expr>,
    transformer: Option<Path>,
}

impl InjectedField {
    fn from_field(field: &Field) -> syn::Result<Option<Self>> {
        let Some(attr) = utils::single_attribute(&field.attrs, "inject")? else {
            return Ok(None);
        };
        // named fields only, checked by the caller
        let Some(name) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, error_messages::NAMED_FIELDS_ONLY));
        };

        let mut injected = InjectedField {
            name,
            vis: field.vis.clone(),
            ty: utils::injected_type(&field.ty)?.clone(),
            category: None,
            args: None,
            transformer: None,
        };

        if !matches!(attr.meta, Meta::Path(_)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("category") {
                    injected.category = Some(Category::parse(meta.value()?)?);
                } else if meta.path.is_ident("args") {
                    injected.args = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("transformer") {
                    injected.transformer = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("expected one of `category`, `args` or `transformer`"));
                }
                Ok(())
            })?;
        }

        Ok(Some(injected))
    }

    /// The identity this property is resolved by: the explicit category, or the injected type.
    fn identity(&self) -> syn::Result<TokenStream> {
        if let Some(category) = &self.category {
            return Ok(quote!(#category));
        }
        match &self.ty {
            Type::Path(ty) if ty.qself.is_none() => {
                Ok(quote!(::injectables::Identity::of::<#ty>()))
            }
            other => Err(syn::Error::new_spanned(other, error_messages::UNKNOWN_TYPE)),
        }
    }
}

pub struct InjectedDeriveInputs {
    type_name: Ident,
    ns: Namespace,
    fields: Vec<InjectedField>,
}

impl InjectedDeriveInputs {
    pub fn from_input(input: proc_macro::TokenStream) -> syn::Result<Self> {
        let raw_input: DeriveInput = syn::parse(input)?;
        utils::reject_generics(&raw_input.generics)?;

        let type_name = raw_input.ident.clone();
        let ns = Namespace::from_type_name(&type_name);

        let Data::Struct(data) = &raw_input.data else {
            return Err(syn::Error::new_spanned(&raw_input, error_messages::NAMED_FIELDS_ONLY));
        };
        let fields = match &data.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .filter_map(|field| InjectedField::from_field(field).transpose())
                .collect::<syn::Result<Vec<_>>>()?,
            Fields::Unit => Vec::new(),
            Fields::Unnamed(fields) => {
                return Err(syn::Error::new_spanned(fields, error_messages::NAMED_FIELDS_ONLY));
            }
        };

        Ok(InjectedDeriveInputs {
            type_name,
            ns,
            fields,
        })
    }

    pub fn derive(self) -> syn::Result<proc_macro::TokenStream> {
        let type_name = &self.type_name;
        let accessors = self
            .fields
            .iter()
            .map(|field| self.get_accessor(field))
            .collect::<syn::Result<Vec<_>>>()?;
        let declare_fns = self
            .fields
            .iter()
            .map(|field| self.get_declare_fn(field))
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(quote! {
            impl ::injectables::Injected for #type_name {}

            impl #type_name {
                #(#accessors)*
            }

            #(#declare_fns)*
        }
        .into())
    }

    fn get_accessor(&self, field: &InjectedField) -> syn::Result<TokenStream> {
        let type_name = &self.type_name;
        let InjectedField {
            name,
            vis,
            ty,
            args,
            transformer,
            ..
        } = field;
        let property = name.to_string();
        let identity = field.identity()?;

        let args = args.as_ref().map(|args| quote!(.args(#args)));
        let transformer = transformer
            .as_ref()
            .map(|transformer| quote!(.transformer(::injectables::Transformer::new(#transformer))));

        let doc = format!("The injected `{property}`, resolved from the registry on first read.");
        Ok(quote! {
            #[doc = #doc]
            #vis fn #name(&self) -> ::injectables::Result<::std::sync::Arc<#ty>> {
                static BINDING: ::std::sync::LazyLock<::injectables::Result<::injectables::InjectionBinding>> =
                    ::std::sync::LazyLock::new(|| {
                        ::injectables::InjectionBinding::declare::<#type_name>(
                            #property,
                            ::injectables::InjectOptions::new()
                                .category(#identity)
                                #args
                                #transformer,
                        )
                    });
                let binding = ::injectables::derive_api::declared::<#type_name>(&BINDING, #property)?;
                self.#name.get_or_resolve(binding, self)
            }
        })
    }

    fn get_declare_fn(&self, field: &InjectedField) -> syn::Result<TokenStream> {
        let type_name = &self.type_name;
        let property = field.name.to_string();
        let identity = field.identity()?;
        let declare_fn_name = self.ns.name_of_inject_fn(&field.name);

        Ok(quote! {
            #[::injectables::derive_api::linkme::distributed_slice(::injectables::derive_api::INJECTION_REGISTRY)]
            #[linkme(crate = ::injectables::derive_api::linkme)]
            fn #declare_fn_name() -> ::injectables::derive_api::InjectionDecl {
                ::injectables::derive_api::InjectionDecl::of::<#type_name>(#property, #identity)
            }
        })
    }
}
