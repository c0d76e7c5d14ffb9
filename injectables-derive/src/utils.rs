use convert_case::{Case, Casing};
use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, quote};
use syn::{
    Attribute, GenericArgument, Generics, LitStr, PathArguments, Type, parse::ParseStream,
};

pub mod error_messages {
    pub const NO_GENERICS: &str = "Injectable and Injected types cannot be generic";
    pub const NEEDS_INJECT: &str = "#[inject] fields must have the type Inject<T>";
    pub const UNKNOWN_TYPE: &str =
        "could not get type from declaration, give the property a category";
    pub const EMPTY_CATEGORY: &str = "an empty category cannot be used as a key";
    pub const NAMED_FIELDS_ONLY: &str =
        "Injected can only be derived for structs with named fields";
}

pub struct Namespace {
    inner: String,
    references: Span,
}

impl Namespace {
    pub fn from_type_name(ident: &Ident) -> Self {
        let inner = ident
            .to_string()
            .from_case(Case::Pascal)
            .to_case(Case::Snake);
        let references = ident.span();
        Namespace { inner, references }
    }

    pub fn name_of_declare_fn(&self) -> Ident {
        Ident::new(
            &format!("__injectables_declare_{}", self.inner),
            self.references,
        )
    }

    pub fn name_of_inject_fn(&self, property: &Ident) -> Ident {
        Ident::new(
            &format!("__injectables_inject_{}_{}", self.inner, property),
            property.span(),
        )
    }
}

/// What an injectable is declared under or an injection point resolves.
pub enum Category {
    Name(LitStr),
    Type(Type),
}

impl Category {
    /// Parses the value of `category = ...`, which is either a string or a type.
    pub fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            let name: LitStr = input.parse()?;
            if name.value().is_empty() {
                return Err(syn::Error::new_spanned(name, error_messages::EMPTY_CATEGORY));
            }
            Ok(Category::Name(name))
        } else {
            Ok(Category::Type(input.parse()?))
        }
    }
}

impl ToTokens for Category {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(match self {
            Category::Name(name) => quote!(::injectables::Identity::from(#name)),
            Category::Type(ty) => quote!(::injectables::Identity::of::<#ty>()),
        });
    }
}

pub fn reject_generics(generics: &Generics) -> syn::Result<()> {
    match generics.params.first() {
        None => Ok(()),
        Some(param) => Err(syn::Error::new_spanned(param, error_messages::NO_GENERICS)),
    }
}

/// The attributes named `name`, rejecting more than one of them.
pub fn single_attribute<'a>(
    attrs: &'a [Attribute],
    name: &str,
) -> syn::Result<Option<&'a Attribute>> {
    let attrs = attrs
        .iter()
        .filter(|attr| attr.path().is_ident(name))
        .collect::<Vec<_>>();

    match attrs.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(single)),
        [_, second, ..] => Err(syn::Error::new_spanned(
            second,
            format!("Only one #[{name}] attribute is allowed"),
        )),
    }
}

/// `T` in `Inject<T>`.
pub fn injected_type(ty: &Type) -> syn::Result<&Type> {
    let Type::Path(path) = ty else {
        return Err(syn::Error::new_spanned(ty, error_messages::NEEDS_INJECT));
    };
    let Some(last) = path.path.segments.last().filter(|last| last.ident == "Inject") else {
        return Err(syn::Error::new_spanned(ty, error_messages::NEEDS_INJECT));
    };
    let PathArguments::AngleBracketed(generics) = &last.arguments else {
        return Err(syn::Error::new_spanned(ty, error_messages::NEEDS_INJECT));
    };

    let types = generics
        .args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect::<Vec<_>>();
    match types.as_slice() {
        [single] => Ok(single),
        _ => Err(syn::Error::new_spanned(generics, error_messages::NEEDS_INJECT)),
    }
}
