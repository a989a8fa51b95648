use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one, running against a
/// fresh in-memory store, and inject dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::store::Db`, the store behind that client.
///
/// `#[backend_test(member)]` and `#[backend_test(staff)]` log the client in
/// as the example member or staff user before the test runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Log in the client as a member/staff if needed.
    let role = parse_macro_input!(args as Option<Ident>);
    let example_user = match role {
        Some(arg) if arg == "member" => Some(quote! { example }),
        Some(arg) if arg == "staff" => Some(quote! { staff_example }),
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `member` or `staff`")
                .into_compile_error()
                .into();
        }
        None => None,
    };
    let maybe_login = example_user
        .map(|example| {
            quote! {
                db.insert_user(crate::model::db::user::NewUser::#example())
                    .await
                    .unwrap();

                // The response borrows the client, so drop it before handing the client over.
                {
                    let response = rocket_client
                        .post(uri!(crate::api::auth::login))
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::json!(crate::model::api::auth::LoginCredentials::#example()).to_string())
                        .dispatch()
                        .await;
                    assert_eq!(rocket::http::Status::Ok, response.status(), "test login failed");
                }
            }
        })
        .unwrap_or_default();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn __backend_test_setup() -> (rocket::local::asynchronous::Client, crate::store::Db) {
                let db = crate::store::Db::memory();
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_db(db.clone()))
                    .await
                    .unwrap();

                #maybe_login

                (rocket_client, db)
            }

            /// The test itself.
            #item_fn

            // Tests enter backend code, so enable logging.
            log4rs_test_utils::test_logging::init_logging_once_for(
                ["elections_backend"],
                None,
                None,
            );

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, db) = __backend_test_setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if type_ident == "Db" {
                            if has_db {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `Db`",
                                ));
                            }
                            has_db = true;
                            args.push(quote! { db });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `db_ident: Db`",
        ));
    }

    Ok(args)
}
