//! Implementation of the Hooks derive macro.
//!
//! The struct-level `#[hooks(...)]` attribute lists the capabilities the type
//! implements; each one must have a matching trait impl (`BeforeSave<S>`, ...).
//! Fields marked `#[hooks(embed)]` are embedded values whose capabilities are
//! promoted one level up.

use proc_macro2::{Literal, TokenStream};
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Error, Fields, Ident, Member, Result, Type, parse_quote};

/// Recognized capabilities as `(method name, capability name)`.
///
/// The capability name doubles as the trait name and the `Capability` variant.
const CAPABILITIES: [(&str, &str); 10] = [
    ("before_validate", "BeforeValidate"),
    ("before_save", "BeforeSave"),
    ("before_create", "BeforeCreate"),
    ("before_update", "BeforeUpdate"),
    ("before_destroy", "BeforeDestroy"),
    ("after_save", "AfterSave"),
    ("after_create", "AfterCreate"),
    ("after_update", "AfterUpdate"),
    ("after_destroy", "AfterDestroy"),
    ("after_find", "AfterFind"),
];

/// Parsed definition from a struct with `#[derive(Hooks)]`.
#[derive(Debug)]
pub struct HooksDef {
    /// The struct name.
    pub name: Ident,
    /// Generics from the struct.
    pub generics: syn::Generics,
    /// Capabilities implemented directly, in attribute order.
    pub capabilities: Vec<CapabilityDef>,
    /// Fields marked `#[hooks(embed)]`.
    pub embeds: Vec<EmbedDef>,
}

/// One capability listed in `#[hooks(...)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDef {
    /// Hook method, e.g. `before_save`.
    pub method: &'static str,
    /// Trait and variant name, e.g. `BeforeSave`.
    pub name: &'static str,
}

/// An embedded field.
#[derive(Debug)]
pub struct EmbedDef {
    /// Field name or tuple index.
    pub member: Member,
    /// The field type.
    pub ty: Type,
}

/// Parse a `DeriveInput` into a `HooksDef`.
pub fn parse_hooks(input: &DeriveInput) -> Result<HooksDef> {
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Hooks can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Hooks can only be derived for structs, not unions",
            ));
        }
    };

    let mut capabilities: Vec<CapabilityDef> = Vec::new();
    for attr in &input.attrs {
        if !attr.path().is_ident("hooks") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            let Some(cap) = path.get_ident().and_then(|ident| lookup_capability(ident)) else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown capability `{attr_name}`. Valid capabilities are: \
                         before_validate, before_save, before_create, before_update, \
                         before_destroy, after_save, after_create, after_update, \
                         after_destroy, after_find"
                    ),
                ));
            };
            if capabilities.contains(&cap) {
                return Err(Error::new_spanned(
                    path,
                    format!("capability `{}` is listed more than once", cap.method),
                ));
            }
            capabilities.push(cap);
            Ok(())
        })?;
    }

    Ok(HooksDef {
        name: input.ident.clone(),
        generics: input.generics.clone(),
        capabilities,
        embeds: parse_embeds(fields)?,
    })
}

/// Resolve `before_save` or `BeforeSave`.
fn lookup_capability(ident: &Ident) -> Option<CapabilityDef> {
    let text = ident.to_string();
    CAPABILITIES
        .iter()
        .find(|(method, name)| *method == text || *name == text)
        .map(|&(method, name)| CapabilityDef { method, name })
}

/// Collect fields marked `#[hooks(embed)]`.
fn parse_embeds(fields: &Fields) -> Result<Vec<EmbedDef>> {
    let mut embeds = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let mut embed = false;
        for attr in &field.attrs {
            if !attr.path().is_ident("hooks") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("embed") {
                    embed = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown field attribute, expected `embed`"))
                }
            })?;
        }
        if embed {
            let member = match &field.ident {
                Some(ident) => Member::Named(ident.clone()),
                None => Member::Unnamed(index.into()),
            };
            embeds.push(EmbedDef {
                member,
                ty: field.ty.clone(),
            });
        }
    }
    Ok(embeds)
}

/// Generate the `Entity` and `Hooks` implementations.
pub fn generate_hooks_impl(def: &HooksDef) -> TokenStream {
    let name = &def.name;
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    // The session type is a fresh parameter on the Hooks impl.
    let session = format_ident!("__S");
    let mut hooks_generics = def.generics.clone();
    hooks_generics.params.push(parse_quote!(#session: ?Sized));
    {
        let predicates = hooks_generics.make_where_clause();
        for cap in &def.capabilities {
            let trait_ident = format_ident!("{}", cap.name);
            predicates
                .predicates
                .push(parse_quote!(Self: ::modelhooks::#trait_ident<#session>));
        }
        for embed in &def.embeds {
            let ty = &embed.ty;
            predicates
                .predicates
                .push(parse_quote!(#ty: ::modelhooks::Hooks<#session>));
        }
    }
    let (hooks_impl_generics, _, hooks_where_clause) = hooks_generics.split_for_impl();

    let direct = generate_direct(def, &session);
    let embedded = generate_embedded(def, &session);

    quote! {
        impl #impl_generics ::modelhooks::Entity for #name #ty_generics #where_clause {}

        impl #hooks_impl_generics ::modelhooks::Hooks<#session> for #name #ty_generics
            #hooks_where_clause
        {
            #direct
            #embedded
        }
    }
}

/// `capabilities` and `call_hook`, omitted when nothing is listed.
fn generate_direct(def: &HooksDef, session: &Ident) -> TokenStream {
    if def.capabilities.is_empty() {
        return TokenStream::new();
    }

    let variants: Vec<Ident> = def
        .capabilities
        .iter()
        .map(|cap| format_ident!("{}", cap.name))
        .collect();
    let arms = def.capabilities.iter().map(|cap| {
        let variant = format_ident!("{}", cap.name);
        let method = format_ident!("{}", cap.method);
        quote! {
            ::modelhooks::Capability::#variant => {
                <Self as ::modelhooks::#variant<#session>>::#method(self, session)
            }
        }
    });

    quote! {
        fn capabilities(&self) -> ::modelhooks::CapabilitySet {
            ::modelhooks::CapabilitySet::EMPTY
                #(.with(::modelhooks::Capability::#variants))*
        }

        #[allow(unreachable_patterns)]
        fn call_hook(
            &mut self,
            capability: ::modelhooks::Capability,
            session: &#session,
        ) -> ::modelhooks::Result<()> {
            match capability {
                #(#arms)*
                _ => ::core::result::Result::Ok(()),
            }
        }
    }
}

/// `embedded`, omitted when no field is embedded.
///
/// A capability provided by more than one embedded field is ambiguous and is
/// not promoted.
fn generate_embedded(def: &HooksDef, session: &Ident) -> TokenStream {
    if def.embeds.is_empty() {
        return TokenStream::new();
    }

    let probes = def.embeds.iter().enumerate().map(|(i, embed)| {
        let member = &embed.member;
        let ty = &embed.ty;
        let idx = Literal::usize_unsuffixed(i);
        quote! {
            if <#ty as ::modelhooks::Hooks<#session>>::capabilities(&self.#member)
                .contains(capability)
            {
                if found.is_some() {
                    return ::core::option::Option::None;
                }
                found = ::core::option::Option::Some(#idx);
            }
        }
    });
    let arms = def.embeds.iter().enumerate().map(|(i, embed)| {
        let member = &embed.member;
        let idx = Literal::usize_unsuffixed(i);
        quote! {
            ::core::option::Option::Some(#idx) => ::core::option::Option::Some(&mut self.#member),
        }
    });

    quote! {
        fn embedded(
            &mut self,
            capability: ::modelhooks::Capability,
        ) -> ::core::option::Option<&mut dyn ::modelhooks::Hooks<#session>> {
            let mut found: ::core::option::Option<usize> = ::core::option::Option::None;
            #(#probes)*
            match found {
                #(#arms)*
                _ => ::core::option::Option::None,
            }
        }
    }
}
