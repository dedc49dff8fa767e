use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemFn, Meta};

use crate::Result;

pub(super) fn implement(item: ItemFn, args: &[Meta]) -> Result<TokenStream> {
	let path = match args
		.first()
		.expect("missing path to item to implement")
	{
		| Meta::Path(path) => path,
		| Meta::List(list) => &list.path,
		| Meta::NameValue(..) => panic!("invalid path to item for implement"),
	};

	let input = item;
	let out = quote! {
		impl #path {
			#input
		}
	};

	Ok(out.into())
}
