use proc_macro2::{Ident, TokenStream};
use quote::{ToTokens, quote};
use syn::{Attribute, DeriveInput, LitBool, Meta, Path};

use crate::utils::{self, Category, Namespace};

pub struct InjectableDeriveInputs {
    type_name: Ident,
    ns: Namespace,
    category: Option<Category>,
    singleton: bool,
    callback: Option<Path>,
    // If this is left as None, the type is built with its Default impl
    constructor: Option<Path>,
}

impl InjectableDeriveInputs {
    pub fn from_input(input: proc_macro::TokenStream) -> syn::Result<Self> {
        let raw_input: DeriveInput = syn::parse(input)?;
        utils::reject_generics(&raw_input.generics)?;

        let type_name = raw_input.ident.clone();
        let ns = Namespace::from_type_name(&type_name);
        let constructor = Self::get_constructor(&raw_input.attrs)?;

        let mut inputs = InjectableDeriveInputs {
            type_name,
            ns,
            category: None,
            singleton: true,
            callback: None,
            constructor,
        };
        if let Some(attr) = utils::single_attribute(&raw_input.attrs, "injectable")? {
            inputs.parse_options(attr)?;
        }
        Ok(inputs)
    }

    fn parse_options(&mut self, attr: &Attribute) -> syn::Result<()> {
        // a bare #[injectable] is the same as no attribute at all
        if let Meta::Path(_) = attr.meta {
            return Ok(());
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("category") {
                self.category = Some(Category::parse(meta.value()?)?);
            } else if meta.path.is_ident("singleton") {
                self.singleton = match meta.value() {
                    Ok(value) => value.parse::<LitBool>()?.value,
                    Err(_) => true,
                };
            } else if meta.path.is_ident("on_demand") {
                self.singleton = false;
            } else if meta.path.is_ident("callback") {
                self.callback = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error(
                    "expected one of `category`, `singleton`, `on_demand` or `callback`",
                ));
            }
            Ok(())
        })
    }

    fn get_constructor(attrs: &[Attribute]) -> syn::Result<Option<Path>> {
        let Some(attr) = utils::single_attribute(attrs, "constructor")? else {
            return Ok(None);
        };
        match &attr.meta {
            Meta::List(_) => Ok(Some(attr.parse_args()?)),
            other => Err(syn::Error::new_spanned(
                other,
                "#[constructor] takes the path of a constructor function, e.g. #[constructor(Self::new)]",
            )),
        }
    }

    pub fn derive(self) -> syn::Result<proc_macro::TokenStream> {
        let base_impl = self.get_base_impl();
        let declare_fn = self.get_declare_fn();

        Ok(quote! {
            #base_impl
            #declare_fn
        }
        .into())
    }

    fn get_base_impl(&self) -> TokenStream {
        let type_name = &self.type_name;

        let category = self.category.as_ref().map(|category| {
            quote! {
                fn category() -> ::std::option::Option<::injectables::Identity> {
                    ::std::option::Option::Some(#category)
                }
            }
        });

        let singleton = self.singleton;
        let callback = match &self.callback {
            Some(callback) => quote! {
                ::std::option::Option::Some(::injectables::InstanceCallback::new(#callback))
            },
            None => quote!(::std::option::Option::None),
        };

        let constructed = match &self.constructor {
            Some(constructor) => quote! {
                #constructor(args).map_err(::std::convert::Into::into)
            },
            None => quote! {
                let _ = args;
                ::std::result::Result::Ok(<Self as ::std::default::Default>::default())
            },
        };

        quote! {
            impl ::injectables::Injectable for #type_name {
                #category

                fn config() -> ::injectables::InjectableConfig {
                    ::injectables::InjectableConfig {
                        singleton: #singleton,
                        callback: #callback,
                    }
                }

                fn construct(
                    args: &::injectables::Args,
                ) -> ::std::result::Result<Self, ::injectables::BoxError> {
                    #constructed
                }
            }
        }
    }

    fn get_declare_fn(&self) -> TokenStream {
        let type_name = self.type_name.to_token_stream();
        let declare_fn_name = self.ns.name_of_declare_fn();

        quote! {
            #[::injectables::derive_api::linkme::distributed_slice(::injectables::derive_api::INJECTABLE_REGISTRY)]
            #[linkme(crate = ::injectables::derive_api::linkme)]
            fn #declare_fn_name() -> ::injectables::derive_api::InjectableDecl {
                ::injectables::derive_api::InjectableDecl::of::<#type_name>()
            }
        }
    }
}
